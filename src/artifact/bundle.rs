// ABOUTME: Decodes a fetched release bundle into ordered directory and file entries.
// ABOUTME: Accepts plain tar or gzip-compressed tar archives.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One entry of a release bundle, with a path relative to the site root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleEntry {
    Dir(PathBuf),
    File { path: PathBuf, contents: Vec<u8> },
}

impl BundleEntry {
    pub fn file(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        BundleEntry::File {
            path: path.into(),
            contents: contents.into(),
        }
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        BundleEntry::Dir(path.into())
    }

    pub fn path(&self) -> &Path {
        match self {
            BundleEntry::Dir(path) | BundleEntry::File { path, .. } => path,
        }
    }
}

/// Errors from decoding a bundle.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("malformed archive: {0}")]
    Malformed(#[from] std::io::Error),

    #[error("archive entry {} is {actual} bytes, header says {expected}", path.display())]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Links cannot be overlaid safely and dropping them would lose files.
    #[error("archive entry {} is a link, which is not supported", path.display())]
    Link { path: PathBuf },
}

/// A decoded release bundle, entries kept in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    entries: Vec<BundleEntry>,
}

impl Bundle {
    pub fn new(entries: Vec<BundleEntry>) -> Self {
        Self { entries }
    }

    /// Decode tar bytes, gunzipping first when the gzip magic is present.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BundleError> {
        if bytes.starts_with(&GZIP_MAGIC) {
            Self::read_tar(GzDecoder::new(bytes))
        } else {
            Self::read_tar(Cursor::new(bytes))
        }
    }

    fn read_tar<R: Read>(reader: R) -> Result<Self, BundleError> {
        let mut archive = tar::Archive::new(reader);
        let mut entries = Vec::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = entry.path()?.into_owned();
            let entry_type = entry.header().entry_type();

            if entry_type.is_dir() {
                entries.push(BundleEntry::Dir(path));
            } else if entry_type.is_file() {
                let size = entry.size();
                let mut contents = Vec::new();
                entry.read_to_end(&mut contents)?;
                if contents.len() as u64 != size {
                    return Err(BundleError::Truncated {
                        path,
                        expected: size,
                        actual: contents.len() as u64,
                    });
                }
                entries.push(BundleEntry::File { path, contents });
            } else if entry_type.is_hard_link() || entry_type.is_symlink() {
                return Err(BundleError::Link { path });
            } else {
                tracing::warn!(
                    "Skipping unsupported archive entry {} ({:?})",
                    path.display(),
                    entry_type
                );
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, BundleEntry::File { .. }))
            .count()
    }
}
