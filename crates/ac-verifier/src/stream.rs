//! # Stream Driver
//!
//! Owns the block acquisition loop. Tracks the last seen height, feeds each
//! block's events through the classifier and router, and restarts the stream
//! according to the restart policy when it ends.
//!
//! ```text
//! Idle ──start──→ Running ──stream ends──┬── restart disabled ─────→ Exited
//!                    ↑                   ├── not recoverable ──────→ Exited
//!                    │                   └── recoverable
//!                    │                             │
//!                    └──── sleep(delay) ←── Restarting
//! ```
//!
//! Restarts resume from the last tracked height, so the boundary block may
//! be delivered twice.

use shared_types::{BlockHeight, StreamBlock};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::domain::{ClassifiedEvent, RestartMode, RetryState};
use crate::events::DiagnosticEvent;
use crate::ports::{BlockStreamSource, StreamError};
use crate::queue::DiagnosticSender;
use crate::router::EventRouter;

/// Why the driver stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The stream ended and restarts are disabled.
    Completed,
    /// The stream failed and restarts are disabled.
    Failed(String),
    /// The stream failed in a way restarting cannot fix.
    Unrecoverable(String),
    /// The run was cancelled.
    Cancelled,
    /// The stream task was aborted before it could report.
    Aborted,
}

impl ExitReason {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            ExitReason::Completed => "completed",
            ExitReason::Failed(_) => "failed",
            ExitReason::Unrecoverable(_) => "unrecoverable",
            ExitReason::Cancelled => "cancelled",
            ExitReason::Aborted => "aborted",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ExitReason::Failed(error) | ExitReason::Unrecoverable(error) => Some(error),
            _ => None,
        }
    }
}

/// Final state of a stream run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamExit {
    /// Last height tracked before exiting.
    pub last_height: Option<BlockHeight>,
    pub reason: ExitReason,
}

/// Handle to a running stream task. Clones observe the same run.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    run_id: u64,
    exit: watch::Receiver<Option<StreamExit>>,
}

impl StreamHandle {
    pub(crate) fn new(run_id: u64, exit: watch::Receiver<Option<StreamExit>>) -> Self {
        Self { run_id, exit }
    }

    /// Identifier of the run, unique within one service.
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Whether the stream task has reported its exit.
    pub fn is_finished(&self) -> bool {
        self.exit.borrow().is_some()
    }

    /// Wait for the stream task to finish.
    pub async fn wait(&self) -> StreamExit {
        let mut exit = self.exit.clone();
        let reported = match exit.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        reported.unwrap_or(StreamExit {
            last_height: None,
            reason: ExitReason::Aborted,
        })
    }
}

enum RunEnd {
    Completed,
    Failed(StreamError),
    Cancelled,
}

/// Drives the block stream for one engine run at a time.
pub struct StreamDriver {
    source: Arc<dyn BlockStreamSource>,
    router: Arc<EventRouter>,
    restart: RestartMode,
    diagnostics: DiagnosticSender,
}

impl StreamDriver {
    pub fn new(
        source: Arc<dyn BlockStreamSource>,
        router: Arc<EventRouter>,
        restart: RestartMode,
        diagnostics: DiagnosticSender,
    ) -> Self {
        Self {
            source,
            router,
            restart,
            diagnostics,
        }
    }

    /// Run until the stream exits for good or `cancel` fires.
    pub async fn run(&self, from_height: Option<BlockHeight>, cancel: CancellationToken) -> StreamExit {
        let mut tracked = from_height;
        let mut retry = RetryState::default();

        loop {
            let end = self.run_once(&mut tracked, &cancel).await;

            let (error, recoverable) = match end {
                RunEnd::Cancelled => return self.exit(tracked, ExitReason::Cancelled),
                RunEnd::Completed => {
                    self.diagnostics
                        .publish(DiagnosticEvent::StreamCompleted { height: tracked });
                    (None, true)
                }
                RunEnd::Failed(e) => {
                    tracing::warn!(height = ?tracked, recoverable = e.is_recoverable(), "Block stream failed: {}", e.message);
                    (Some(e.message), e.recoverable)
                }
            };

            let policy = match self.restart {
                RestartMode::Disabled => {
                    let reason = match error {
                        Some(error) => ExitReason::Failed(error),
                        None => ExitReason::Completed,
                    };
                    return self.exit(tracked, reason);
                }
                RestartMode::Enabled(policy) => policy,
            };
            if !recoverable {
                let error = error.unwrap_or_default();
                return self.exit(tracked, ExitReason::Unrecoverable(error));
            }

            let attempt = retry.next_attempt(tracked);
            let delay = policy.delay(attempt);
            self.diagnostics.publish(DiagnosticEvent::StreamRestarting {
                height: tracked,
                attempt,
                delay,
                error,
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.exit(tracked, ExitReason::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            self.diagnostics.publish(DiagnosticEvent::StreamRestarted {
                height: tracked,
                attempt,
            });
        }
    }

    async fn run_once(&self, tracked: &mut Option<BlockHeight>, cancel: &CancellationToken) -> RunEnd {
        if tracked.is_none() {
            *tracked = self.resolve_start_height().await;
        }

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RunEnd::Cancelled,
            opened = self.source.start_from(*tracked) => opened,
        };
        let mut blocks = match opened {
            Ok(blocks) => blocks,
            Err(e) => return RunEnd::Failed(e),
        };
        tracing::info!(from = ?tracked, "Block stream started");

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return RunEnd::Cancelled,
                next = blocks.next() => next,
            };
            match next {
                Some(Ok(block)) => self.process_block(block, tracked).await,
                Some(Err(e)) => return RunEnd::Failed(e),
                None => return RunEnd::Completed,
            }
        }
    }

    async fn resolve_start_height(&self) -> Option<BlockHeight> {
        match self.source.current_height().await {
            Ok(height) => height,
            Err(e) => {
                tracing::warn!("Could not fetch current height, letting the source choose: {}", e);
                None
            }
        }
    }

    async fn process_block(&self, block: StreamBlock, tracked: &mut Option<BlockHeight>) {
        self.diagnostics.publish(DiagnosticEvent::BlockReceived {
            height: block.height,
            event_count: block.events.len(),
        });
        if tracked.map_or(true, |height| block.height >= height) {
            *tracked = Some(block.height);
            self.diagnostics
                .publish(DiagnosticEvent::HeightAdvanced { height: block.height });
        }

        for raw in &block.events {
            if let Some(event) = ClassifiedEvent::classify(raw) {
                self.router.route(event).await;
            }
        }
    }

    fn exit(&self, last_height: Option<BlockHeight>, reason: ExitReason) -> StreamExit {
        self.diagnostics.publish(DiagnosticEvent::StreamExited {
            height: last_height,
            reason: reason.clone(),
        });
        StreamExit {
            last_height,
            reason,
        }
    }
}
