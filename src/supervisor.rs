//! Task supervision
//!
//! The HTTP server and the event loop share one cancellation token. Both are
//! essential: the first one to fail, panic or return brings the other down,
//! and the supervisor then waits a bounded time for the rest to drain.

use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::defaults::SHUTDOWN_GRACE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskName {
    HttpServer,
    EventLoop,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpServer => write!(f, "HttpServer"),
            Self::EventLoop => write!(f, "EventLoop"),
        }
    }
}

/// Owns the long-running tasks and the token that stops them.
pub struct Supervisor {
    tasks: JoinSet<(TaskName, Result<()>)>,
    cancel: CancellationToken,
    grace: Duration,
}

impl Supervisor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            cancel,
            grace: SHUTDOWN_GRACE,
        }
    }

    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn spawn<F>(&mut self, name: TaskName, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tasks.spawn(async move {
            info!(task = %name, "Task starting");
            (name, task.await)
        });
    }

    /// Wait until shutdown is requested or a task ends, then cancel and
    /// drain. Returns the first failure, named after its task.
    pub async fn run(mut self) -> Result<()> {
        info!(tasks = self.tasks.len(), "Supervisor: monitoring");

        let outcome = tokio::select! {
            () = self.cancel.cancelled() => {
                info!("Supervisor: shutdown requested");
                Ok(())
            }
            joined = self.tasks.join_next() => match joined {
                Some(Ok((name, Ok(())))) => {
                    info!(task = %name, "Supervisor: task stopped, shutting down");
                    Ok(())
                }
                Some(Ok((name, Err(e)))) => {
                    error!(task = %name, error = %e, "Supervisor: task failed");
                    Err(e.context(format!("{name} task failed")))
                }
                Some(Err(e)) => {
                    error!(error = %e, "Supervisor: task panicked");
                    Err(anyhow!("task panicked: {e}"))
                }
                None => Ok(()),
            },
        };

        self.cancel.cancel();
        self.drain().await;
        outcome
    }

    async fn drain(&mut self) {
        let tasks = &mut self.tasks;
        let drained = tokio::time::timeout(self.grace, async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((name, Ok(()))) => info!(task = %name, "Supervisor: task stopped"),
                    Ok((name, Err(e))) => warn!(task = %name, error = %e, "Supervisor: task failed during shutdown"),
                    Err(e) => warn!(error = %e, "Supervisor: task panicked during shutdown"),
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = self.tasks.len(),
                "Supervisor: tasks still running after {:?}, aborting", self.grace
            );
            self.tasks.abort_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn until_cancelled(cancel: &CancellationToken) -> impl Future<Output = Result<()>> {
        let cancel = cancel.clone();
        async move {
            cancel.cancelled().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failure_cancels_siblings_and_names_task() {
        let cancel = CancellationToken::new();
        let mut supervisor = Supervisor::new(cancel.clone());
        supervisor.spawn(TaskName::HttpServer, until_cancelled(&cancel));
        supervisor.spawn(TaskName::EventLoop, async { Err(anyhow!("queue closed")) });

        let err = supervisor.run().await.unwrap_err();
        assert!(cancel.is_cancelled());
        assert_eq!(err.to_string(), "EventLoop task failed");
        assert!(format!("{err:#}").contains("queue closed"));
    }

    #[tokio::test]
    async fn test_task_returning_early_stops_the_rest() {
        let cancel = CancellationToken::new();
        let mut supervisor = Supervisor::new(cancel.clone());
        supervisor.spawn(TaskName::HttpServer, until_cancelled(&cancel));
        supervisor.spawn(TaskName::EventLoop, async { Ok(()) });

        supervisor.run().await.unwrap();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_request_drains_tasks() {
        let cancel = CancellationToken::new();
        let stopped = Arc::new(AtomicBool::new(false));
        let mut supervisor = Supervisor::new(cancel.clone());
        {
            let cancel = cancel.clone();
            let stopped = stopped.clone();
            supervisor.spawn(TaskName::HttpServer, async move {
                cancel.cancelled().await;
                tokio::task::yield_now().await;
                stopped.store(true, Ordering::SeqCst);
                Ok(())
            });
        }

        cancel.cancel();
        supervisor.run().await.unwrap();
        assert!(stopped.load(Ordering::SeqCst));
    }

    async fn explode() -> Result<()> {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let cancel = CancellationToken::new();
        let mut supervisor = Supervisor::new(cancel.clone());
        supervisor.spawn(TaskName::EventLoop, explode());

        let err = supervisor.run().await.unwrap_err();
        assert!(err.to_string().contains("panicked"));
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_task_is_aborted_after_grace() {
        let cancel = CancellationToken::new();
        let mut supervisor = Supervisor::new(cancel.clone()).with_grace(Duration::from_secs(1));
        supervisor.spawn(TaskName::HttpServer, std::future::pending::<Result<()>>());

        cancel.cancel();
        let started = tokio::time::Instant::now();
        supervisor.run().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
    }
}
