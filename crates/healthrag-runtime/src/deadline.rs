//! Per-call deadline and cancellation.

use std::future::Future;
use std::time::Duration;

use healthrag_core::{Error, Result};
use tokio_util::sync::CancellationToken;

/// Run one external call, bounded by `after` and abandoned on `cancel`.
pub(crate) async fn bounded<F, T>(
    operation: &str,
    after: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = tokio::time::timeout(after, fut) => match res {
            Ok(r) => r,
            Err(_) => Err(Error::Timeout {
                operation: operation.to_string(),
                after,
            }),
        },
    }
}
