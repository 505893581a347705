//! Graceful shutdown handling with request draining.
//!
//! A shutdown signal (Ctrl+C, SIGTERM, SIGHUP) stops the listener, in-flight
//! requests get a drain timeout to finish, then the connection pool closes.

use crate::database::ConnectionPool;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Shutdown signal that can be awaited.
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for the shutdown signal.
    pub async fn recv(&mut self) {
        let _ = self.receiver.wait_for(|&v| v).await;
    }

    /// Check if shutdown has been signaled without blocking.
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Shutdown phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Shutdown has been initiated.
    Initiated,

    /// Listener closed; waiting for in-flight requests.
    DrainingRequests,

    /// Closing database connections.
    ClosingConnections,

    /// Final cleanup complete.
    Complete,
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownPhase::Initiated => write!(f, "initiated"),
            ShutdownPhase::DrainingRequests => write!(f, "draining_requests"),
            ShutdownPhase::ClosingConnections => write!(f, "closing_connections"),
            ShutdownPhase::Complete => write!(f, "complete"),
        }
    }
}

/// Controller for managing graceful shutdown.
pub struct ShutdownController {
    sender: watch::Sender<bool>,
    shutting_down: AtomicBool,
    phase_sender: broadcast::Sender<ShutdownPhase>,
    drain_timeout: Duration,
}

impl ShutdownController {
    /// Create a shutdown controller.
    pub fn new(drain_timeout: Duration) -> Self {
        let (sender, _) = watch::channel(false);
        let (phase_sender, _) = broadcast::channel(16);

        Self {
            sender,
            shutting_down: AtomicBool::new(false),
            phase_sender,
            drain_timeout,
        }
    }

    /// Get a shutdown signal receiver.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to shutdown phase notifications.
    pub fn subscribe_phases(&self) -> broadcast::Receiver<ShutdownPhase> {
        self.phase_sender.subscribe()
    }

    /// Check if shutdown is in progress.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Get the drain timeout.
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Initiate shutdown. Later calls are no-ops.
    pub fn shutdown(&self) {
        if self
            .shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Initiating graceful shutdown...");
            let _ = self.sender.send(true);
            let _ = self.phase_sender.send(ShutdownPhase::Initiated);
        }
    }

    fn notify_phase(&self, phase: ShutdownPhase) {
        info!("Shutdown phase: {}", phase);
        let _ = self.phase_sender.send(phase);
    }

    /// Wait for `task` to finish on its own, or for shutdown followed by
    /// at most the drain timeout. A task still running after that is aborted.
    ///
    /// Returns the task output, or `None` if it panicked or was aborted.
    pub async fn drain<T>(&self, mut task: JoinHandle<T>) -> Option<T> {
        let mut signal = self.signal();

        tokio::select! {
            result = &mut task => return joined(result),
            _ = signal.recv() => {}
        }

        self.notify_phase(ShutdownPhase::DrainingRequests);
        match tokio::time::timeout(self.drain_timeout, &mut task).await {
            Ok(result) => {
                info!("All requests drained");
                joined(result)
            }
            Err(_) => {
                warn!(
                    "Drain timeout of {:?} exceeded, aborting in-flight requests",
                    self.drain_timeout
                );
                task.abort();
                None
            }
        }
    }

    /// Close the pool and mark shutdown complete.
    pub async fn close(&self, pool: &ConnectionPool) {
        self.shutdown();
        self.notify_phase(ShutdownPhase::ClosingConnections);
        pool.close().await;
        self.notify_phase(ShutdownPhase::Complete);
        info!("Graceful shutdown complete");
    }
}

fn joined<T>(result: Result<T, tokio::task::JoinError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.is_cancelled() => None,
        Err(e) => {
            error!("Server task failed: {}", e);
            None
        }
    }
}

/// Shared shutdown controller type.
pub type SharedShutdownController = Arc<ShutdownController>;

/// Create a new shared shutdown controller.
pub fn new_shutdown_controller(drain_timeout: Duration) -> SharedShutdownController {
    Arc::new(ShutdownController::new(drain_timeout))
}

/// Install handlers for Ctrl+C, and on Unix SIGTERM and SIGHUP.
///
/// Whichever arrives first triggers the controller.
pub fn install_signal_handlers(controller: SharedShutdownController) {
    spawn_listener(controller.clone(), "Ctrl+C", async {
        tokio::signal::ctrl_c().await
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        for (name, kind) in [
            ("SIGTERM", SignalKind::terminate()),
            ("SIGHUP", SignalKind::hangup()),
        ] {
            spawn_listener(controller.clone(), name, async move {
                signal(kind)?.recv().await;
                Ok::<(), std::io::Error>(())
            });
        }
    }
}

fn spawn_listener<F>(controller: SharedShutdownController, name: &'static str, wait: F)
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match wait.await {
            Ok(()) => {
                info!("Received {}, initiating shutdown...", name);
                controller.shutdown();
            }
            Err(e) => error!("Failed to listen for {}: {}", name, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_controller_creation() {
        let controller = ShutdownController::new(Duration::from_secs(30));
        assert!(!controller.is_shutting_down());
        assert_eq!(controller.drain_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_shutdown_signal() {
        let controller = ShutdownController::new(Duration::from_secs(1));
        let signal = controller.signal();

        assert!(!signal.is_shutdown());

        controller.shutdown();
        assert!(controller.is_shutting_down());
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_shutdown_idempotent() {
        let controller = ShutdownController::new(Duration::from_secs(1));
        let mut phases = controller.subscribe_phases();

        controller.shutdown();
        controller.shutdown();

        assert!(controller.is_shutting_down());
        assert_eq!(phases.try_recv().ok(), Some(ShutdownPhase::Initiated));
        assert!(phases.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drain_returns_output_of_finished_task() {
        let controller = ShutdownController::new(Duration::from_secs(1));
        let task = tokio::spawn(async { 7 });

        assert_eq!(controller.drain(task).await, Some(7));
        assert!(!controller.is_shutting_down());
    }

    #[tokio::test]
    async fn test_drain_waits_for_task_after_shutdown() {
        let controller = new_shutdown_controller(Duration::from_secs(5));
        let mut signal = controller.signal();
        let task = tokio::spawn(async move {
            signal.recv().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            "drained"
        });

        controller.shutdown();
        assert_eq!(controller.drain(task).await, Some("drained"));
    }

    #[tokio::test]
    async fn test_drain_timeout_aborts_task() {
        let controller = new_shutdown_controller(Duration::from_millis(50));
        let mut phases = controller.subscribe_phases();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        controller.shutdown();
        assert_eq!(controller.drain(task).await, None);

        assert_eq!(phases.recv().await.ok(), Some(ShutdownPhase::Initiated));
        assert_eq!(
            phases.recv().await.ok(),
            Some(ShutdownPhase::DrainingRequests)
        );
    }

    #[test]
    fn test_shutdown_phase_display() {
        assert_eq!(ShutdownPhase::Initiated.to_string(), "initiated");
        assert_eq!(
            ShutdownPhase::DrainingRequests.to_string(),
            "draining_requests"
        );
        assert_eq!(
            ShutdownPhase::ClosingConnections.to_string(),
            "closing_connections"
        );
        assert_eq!(ShutdownPhase::Complete.to_string(), "complete");
    }
}
