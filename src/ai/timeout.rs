//! Timeout helpers for pipeline stages.
//!
//! Every external call (clone, planning, per-topic generation) is bounded.
//! An expired deadline surfaces as `DocError::Timeout` naming the operation.

use std::future::Future;
use std::time::Duration;

use crate::types::{DocError, Result};

/// Execute an async operation with a timeout
///
/// ```ignore
/// let plan = with_timeout(
///     options.plan_timeout,
///     agents.plan(&repo_path),
///     "planning",
/// ).await?;
/// ```
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(DocError::timeout(operation_name, timeout)),
    }
}
