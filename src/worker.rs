//! Message loop: one verification request per input line.
//!
//! Each request runs on the blocking pool (OCR calls and SQLite block) and a
//! semaphore caps how many are in flight at once.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::models::OutcomeStatus;
use crate::pipeline::VerificationPipeline;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("I/O error reading messages: {0}")]
    Io(#[from] std::io::Error),

    #[error("Concurrency limiter closed")]
    LimiterClosed,
}

/// Tally of handled messages, by outcome.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServeSummary {
    pub received: usize,
    pub completed: usize,
    pub partial: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl ServeSummary {
    fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Completed => self.completed += 1,
            OutcomeStatus::PartialSuccess => self.partial += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }
}

/// Read newline-delimited messages until EOF or `shutdown` resolves, then
/// wait for in-flight requests to finish.
pub async fn serve<R, S>(
    pipeline: Arc<VerificationPipeline>,
    input: R,
    max_concurrent: usize,
    shutdown: S,
) -> Result<ServeSummary, WorkerError>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let limiter = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();
    let mut summary = ServeSummary::default();
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    tracing::info!(max_concurrent, "Worker accepting verification requests");

    loop {
        let line = tokio::select! {
            biased;
            () = &mut shutdown => {
                tracing::info!("Shutdown requested, draining in-flight requests");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let permit = limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::LimiterClosed)?;
        summary.received += 1;

        let pipeline = pipeline.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            pipeline.handle_message(line.as_bytes()).status
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(status) => summary.record(status),
            Err(e) => {
                tracing::error!(error = %e, "Verification task panicked");
                summary.panicked += 1;
            }
        }
    }

    tracing::info!(
        received = summary.received,
        completed = summary.completed,
        partial = summary.partial,
        failed = summary.failed,
        "Worker stopped"
    );
    Ok(summary)
}
