//! Scheduler shared between the render thread and event ingress
//!
//! One mutex guards the [`Scheduler`]; it is held only while an event is
//! applied, a tick is planned or a scroll state is stepped, never across
//! panel I/O or telemetry reads. Status changes are broadcast on a
//! [`tokio::sync::watch`] channel for publishing.

use crate::scheduler::{ControlEvent, EventError, FramePlan, Scheduler, ScrollSlot, Status};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::watch;

#[derive(Clone)]
pub struct SharedScheduler {
    inner: Arc<Mutex<Scheduler>>,
    status: Arc<watch::Sender<Status>>,
}

impl SharedScheduler {
    pub fn new(scheduler: Scheduler) -> Self {
        let (status, _) = watch::channel(scheduler.status());
        Self {
            inner: Arc::new(Mutex::new(scheduler)),
            status: Arc::new(status),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Scheduler> {
        // Every update is a set of independent field writes
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a control event and publish the new status if it changed
    pub fn handle_event(&self, event: ControlEvent) -> Result<bool, EventError> {
        let kind = event.kind();
        let (result, status) = {
            let mut scheduler = self.lock();
            let result = scheduler.handle_event(event);
            (result, scheduler.status())
        };

        match &result {
            Ok(true) => {
                tracing::debug!("{} event changed status", kind);
                self.publish(status);
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Ignoring {} event: {}", kind, e),
        }
        result
    }

    /// Plan the next frame
    pub fn tick(&self, now: Instant) -> FramePlan {
        let (plan, status) = {
            let mut scheduler = self.lock();
            let plan = scheduler.tick(now);
            (plan, scheduler.status())
        };
        if plan.rotated {
            self.publish(status);
        }
        plan
    }

    pub fn advance_scroll(&self, slot: ScrollSlot, content_height: u32, visible_height: u32) -> u32 {
        self.lock()
            .advance_scroll(slot, content_height, visible_height)
    }

    pub fn status(&self) -> Status {
        self.lock().status()
    }

    /// Receiver that sees every published status change
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// Read-only access for inspection
    pub fn with<R>(&self, f: impl FnOnce(&Scheduler) -> R) -> R {
        f(&self.lock())
    }

    fn publish(&self, status: Status) {
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
