// Deadline wrapper for suspension points (wallet prompts, RPC round-trips).

use crate::error::{BridgeError, BridgeResult};
use futures_util::future::{select, Either};
use std::future::Future;
use std::pin::pin;
use std::time::Duration;

/// Race `fut` against the platform timer. `None` waits indefinitely, which is
/// the wallet-prompt default.
pub async fn with_timeout<F, T>(fut: F, limit: Option<Duration>, what: &str) -> BridgeResult<T>
where
    F: Future<Output = BridgeResult<T>>,
{
    let Some(limit) = limit else {
        return fut.await;
    };

    let fut = pin!(fut);
    let timer = pin!(sleep(limit));
    match select(fut, timer).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(BridgeError::Cancelled(format!(
            "{} timed out after {}ms",
            what,
            limit.as_millis()
        ))),
    }
}

#[cfg(feature = "native")]
async fn sleep(limit: Duration) {
    tokio::time::sleep(limit).await;
}

#[cfg(all(not(feature = "native"), feature = "wasm", target_arch = "wasm32"))]
async fn sleep(limit: Duration) {
    crate::wasm::utils::sleep_ms(limit.as_millis() as u64).await;
}

// No timer without a platform runtime; limits are ignored.
#[cfg(not(any(feature = "native", all(feature = "wasm", target_arch = "wasm32"))))]
async fn sleep(_limit: Duration) {
    futures_util::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_without_limit() {
        let out = with_timeout(async { Ok::<_, BridgeError>(7) }, None, "noop").await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn ready_future_beats_timer() {
        let out = with_timeout(async { Ok::<_, BridgeError>("ok") }, Some(Duration::from_secs(5)), "noop").await;
        assert_eq!(out.unwrap(), "ok");
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn hung_call_is_cancelled() {
        let hung = futures_util::future::pending::<BridgeResult<()>>();
        let err = with_timeout(hung, Some(Duration::from_millis(20)), "getBalance")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled(ref msg) if msg.contains("getBalance")));
        assert!(err.is_retryable());
    }
}
