//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls with a deadline
//! - Report elapsed deadlines as `BackendError::Timeout`
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The wrapped future is dropped on expiry, cancelling its I/O

use std::future::Future;
use std::time::Duration;

use crate::net::BackendError;

/// Run `fut` with a deadline of `after`. `op` names the operation in the
/// error.
pub async fn with_timeout<T, F>(
    op: &'static str,
    after: Duration,
    fut: F,
) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout { op, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expires() {
        let err = with_timeout("query", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, BackendError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, BackendError::Timeout { op: "query", .. }));
    }

    #[tokio::test]
    async fn passes_through() {
        let value = with_timeout("connect", Duration::from_secs(1), async {
            Ok::<_, BackendError>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }
}
