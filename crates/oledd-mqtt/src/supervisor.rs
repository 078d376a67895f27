//! Restart loop for the ingress task

use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Liveness of a supervised task, shared with the main task
#[derive(Debug, Default)]
pub struct IngressHealth {
    alive: AtomicBool,
    restarts: AtomicU32,
}

impl IngressHealth {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn restarts(&self) -> u32 {
        self.restarts.load(Ordering::SeqCst)
    }
}

/// Keeps a task running until shutdown
///
/// Whenever the task returns or panics it is started again after a fixed
/// delay. A task is expected to watch the same shutdown channel and return
/// once it turns true.
pub struct Supervisor {
    name: &'static str,
    delay: Duration,
    health: Arc<IngressHealth>,
    shutdown: watch::Receiver<bool>,
}

impl Supervisor {
    pub fn new(name: &'static str, delay: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            name,
            delay,
            health: Arc::new(IngressHealth::default()),
            shutdown,
        }
    }

    pub fn health(&self) -> Arc<IngressHealth> {
        Arc::clone(&self.health)
    }

    /// Spawn the restart loop; `start` builds a fresh task each time
    pub fn spawn<F, Fut>(mut self, start: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        tokio::spawn(async move {
            while !*self.shutdown.borrow() {
                self.health.alive.store(true, Ordering::SeqCst);
                let outcome = tokio::spawn(start()).await;
                self.health.alive.store(false, Ordering::SeqCst);

                match outcome {
                    Ok(Ok(())) => tracing::info!("{} task exited", self.name),
                    Ok(Err(e)) => tracing::warn!("{} task failed: {}", self.name, e),
                    Err(e) if e.is_panic() => tracing::error!("{} task panicked", self.name),
                    Err(e) => {
                        tracing::warn!("{} task cancelled: {}", self.name, e);
                        break;
                    }
                }

                if *self.shutdown.borrow() {
                    break;
                }

                let restarts = self.health.restarts.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!(
                    "Restarting {} task in {}s (restart {})",
                    self.name,
                    self.delay.as_secs(),
                    restarts
                );
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    changed = self.shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("{} supervisor stopped", self.name);
        })
    }
}
