// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::path::Path;
use std::time::Instant;

use crate::update::UpdateReport;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    duration_secs: if self.start_time.is_some() {
                        Some(self.elapsed_secs())
                    } else {
                        None
                    },
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print a warning (suppressed in quiet mode).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "warning",
                    message,
                    duration_secs: None,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print the result of an update run.
    pub fn report(&self, report: &UpdateReport) {
        for warning in report.diagnostics.warnings() {
            self.warning(&warning.message);
        }

        if self.mode == OutputMode::Json {
            let history: Vec<&str> = report.history.iter().map(|s| s.as_str()).collect();
            let error = report.outcome.error().map(|e| e.to_string());
            let event = JsonReport {
                event: "update",
                site: report.service.as_str(),
                outcome: report.outcome.label(),
                exit_code: report.exit_code(),
                tree: report.tree.as_str(),
                history,
                error: error.as_deref(),
                retained_snapshot: report.retained_snapshot.as_deref(),
                cancel_deferred: report.cancel_deferred,
                duration_secs: self.start_time.map(|_| self.elapsed_secs()),
            };
            if let Ok(json) = serde_json::to_string(&event) {
                println!("{json}");
            }
            return;
        }

        match report.outcome.error() {
            None => self.success(&format!("Updated {}", report.service)),
            Some(e) if report.outcome.is_unrecoverable() => {
                self.error(&format!(
                    "update of {} failed and could not be recovered: {}",
                    report.service, e
                ));
                if let Some(path) = &report.retained_snapshot {
                    self.error(&format!("snapshot kept at {}", path.display()));
                }
            }
            Some(e) => {
                self.error(&format!(
                    "update of {} failed, site left {}: {}",
                    report.service, report.tree, e
                ));
                if let Some(path) = &report.retained_snapshot {
                    self.progress(&format!("  snapshot kept at {}", path.display()));
                }
            }
        }

        if report.cancel_deferred {
            self.progress("  cancellation arrived after the site was stopped and was ignored");
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: if self.start_time.is_some() {
                        Some(self.elapsed_secs())
                    } else {
                        None
                    },
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    event: &'a str,
    site: &'a str,
    outcome: &'a str,
    exit_code: i32,
    tree: &'a str,
    history: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retained_snapshot: Option<&'a Path>,
    cancel_deferred: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
