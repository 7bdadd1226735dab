// ABOUTME: In-process single-flight guard keyed by service name.
// ABOUTME: Runs for one service queue up; different services proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::ServiceName;

type Slots = Arc<parking_lot::Mutex<HashMap<ServiceName, Arc<Mutex<()>>>>>;

/// One async mutex per service name, dropped once nobody holds or awaits it.
#[derive(Debug, Clone, Default)]
pub struct UpdateGuard {
    slots: Slots,
}

impl UpdateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, service: &ServiceName) -> Arc<Mutex<()>> {
        self.slots
            .lock()
            .entry(service.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn permit(&self, service: &ServiceName, guard: OwnedMutexGuard<()>) -> ServicePermit {
        ServicePermit {
            guard: Some(guard),
            service: service.clone(),
            slots: self.slots.clone(),
        }
    }

    /// Wait until no other run holds `service`, then hold it.
    pub async fn acquire(&self, service: &ServiceName) -> ServicePermit {
        let guard = self.slot(service).lock_owned().await;
        self.permit(service, guard)
    }

    /// Hold `service` only if nobody else does.
    pub fn try_acquire(&self, service: &ServiceName) -> Option<ServicePermit> {
        let guard = self.slot(service).try_lock_owned().ok()?;
        Some(self.permit(service, guard))
    }

    /// Number of services with a live slot.
    pub fn tracked(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Exclusive hold on one service. Released on drop.
#[derive(Debug)]
pub struct ServicePermit {
    guard: Option<OwnedMutexGuard<()>>,
    service: ServiceName,
    slots: Slots,
}

impl Drop for ServicePermit {
    fn drop(&mut self) {
        self.guard.take();

        // Clones are only handed out under this lock, so a count of one
        // means no run holds or waits on the slot.
        let mut slots = self.slots.lock();
        if slots
            .get(&self.service)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.service);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_service_is_exclusive() {
        let guard = UpdateGuard::new();
        let app = ServiceName::new("app").unwrap();
        let blog = ServiceName::new("blog").unwrap();

        let held = guard.acquire(&app).await;
        assert!(guard.try_acquire(&app).is_none());
        assert!(guard.try_acquire(&blog).is_some());

        drop(held);
        assert!(guard.try_acquire(&app).is_some());
    }

    #[tokio::test]
    async fn released_slots_are_forgotten() {
        let guard = UpdateGuard::new();
        let app = ServiceName::new("app").unwrap();

        let held = guard.acquire(&app).await;
        assert_eq!(guard.tracked(), 1);
        drop(held);
        assert_eq!(guard.tracked(), 0);
    }

    #[tokio::test]
    async fn slot_survives_while_another_run_waits() {
        let guard = UpdateGuard::new();
        let app = ServiceName::new("app").unwrap();

        let held = guard.acquire(&app).await;
        let waiter = {
            let guard = guard.clone();
            let app = app.clone();
            tokio::spawn(async move {
                let _permit = guard.acquire(&app).await;
            })
        };
        tokio::task::yield_now().await;

        drop(held);
        assert_eq!(guard.tracked(), 1, "waiter still needs the slot");
        waiter.await.unwrap();
        assert_eq!(guard.tracked(), 0);
    }
}
