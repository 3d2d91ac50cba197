//! Long-running-operation poller.
//!
//! Drives an [`Operation`] to a terminal state by re-fetching it at a fixed
//! interval. The poller never retries a failed fetch and never cancels the
//! remote job: on timeout the operation keeps running server-side.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::api::OperationSource;
use crate::error::{Error, Result};
use crate::models::Operation;

/// Default delay between status fetches.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
/// Default upper bound on total wait time.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 300_000;

/// Timing knobs for [`poll_operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollOptions {
    pub fn from_millis(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::from_millis(DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_MS)
    }
}

/// Waits until `operation` is done and returns its final form.
///
/// - Already-done operations return immediately with zero fetches.
/// - A done operation carrying an error yields [`Error::OperationFailed`]
///   with the payload untouched.
/// - When the next sleep would push the elapsed time past `timeout`, the
///   poller gives up with [`Error::OperationTimeout`] without fetching again.
/// - Fetch errors propagate as-is.
pub async fn poll_operation<S>(
    source: &S,
    operation: Operation,
    options: &PollOptions,
) -> Result<Operation>
where
    S: OperationSource + ?Sized,
{
    let started = Instant::now();
    let mut current = operation;
    let mut fetches = 0u32;

    while !current.done {
        if started.elapsed() + options.interval > options.timeout {
            warn!(operation = %current.name, fetches, "operation polling timed out");
            return Err(Error::OperationTimeout {
                name: current.name,
                timeout_ms: options.timeout.as_millis() as u64,
            });
        }

        sleep(options.interval).await;
        current = source.get_operation(&current.name).await?;
        fetches += 1;
        debug!(operation = %current.name, fetches, done = current.done, "polled operation");
    }

    if let Some(error) = current.error.take() {
        warn!(operation = %current.name, code = error.code, "operation failed");
        return Err(Error::OperationFailed {
            name: current.name,
            error,
        });
    }

    info!(operation = %current.name, fetches, "operation completed");
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::models::OperationStatus;

    /// Reports `done` on the `finish_on`-th fetch, optionally with an error.
    struct Scripted {
        finish_on: u32,
        error: Option<OperationStatus>,
        fetches: AtomicU32,
    }

    impl Scripted {
        fn new(finish_on: u32) -> Self {
            Self {
                finish_on,
                error: None,
                fetches: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl OperationSource for Scripted {
        async fn get_operation(&self, name: &str) -> Result<Operation> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            let done = n >= self.finish_on;
            Ok(Operation {
                name: name.to_string(),
                done,
                error: if done { self.error.clone() } else { None },
                ..Default::default()
            })
        }
    }

    fn pending(name: &str) -> Operation {
        Operation {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_operation_returns_without_fetching() {
        let source = Scripted::new(1);
        let op = Operation {
            name: "ops/1".to_string(),
            done: true,
            ..Default::default()
        };
        let started = Instant::now();

        let out = poll_operation(&source, op, &PollOptions::default())
            .await
            .unwrap();

        assert!(out.done);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_until_done() {
        let source = Scripted::new(3);
        let options = PollOptions::from_millis(100, 10_000);
        let started = Instant::now();

        let out = poll_operation(&source, pending("ops/2"), &options)
            .await
            .unwrap();

        assert!(out.done);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_stops_without_refetch() {
        let source = Scripted::new(u32::MAX);
        let options = PollOptions::from_millis(100, 250);

        let err = poll_operation(&source, pending("ops/slow"), &options)
            .await
            .unwrap_err();

        match err {
            Error::OperationTimeout { name, timeout_ms } => {
                assert_eq!(name, "ops/slow");
                assert_eq!(timeout_ms, 250);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // Two sleeps fit inside 250ms; a third would overshoot.
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_operation_carries_payload() {
        let status = OperationStatus {
            code: 3,
            message: "unsupported file type".to_string(),
            details: vec![serde_json::json!({"reason": "MIME"})],
        };
        let source = Scripted {
            finish_on: 1,
            error: Some(status.clone()),
            fetches: AtomicU32::new(0),
        };

        let err = poll_operation(&source, pending("ops/bad"), &PollOptions::from_millis(10, 1_000))
            .await
            .unwrap_err();

        match err {
            Error::OperationFailed { name, error } => {
                assert_eq!(name, "ops/bad");
                assert_eq!(error, status);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_propagates() {
        struct Broken;

        #[async_trait]
        impl OperationSource for Broken {
            async fn get_operation(&self, name: &str) -> Result<Operation> {
                Err(Error::NotFound(name.to_string()))
            }
        }

        let err = poll_operation(&Broken, pending("ops/gone"), &PollOptions::from_millis(10, 1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
