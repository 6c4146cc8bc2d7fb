//! Transaction receipt polling.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
    /// `0x1` on success, `0x0` on revert. Pre-Byzantium receipts omit it.
    #[serde(default)]
    pub status: Option<String>,
}

impl TxReceipt {
    /// `null` means "not mined yet".
    pub fn from_value(value: Value) -> Result<Option<Self>, String> {
        serde_json::from_value(value).map_err(|e| format!("malformed receipt: {e}"))
    }

    pub fn reverted(&self) -> bool {
        matches!(self.status.as_deref(), Some("0x0") | Some("0x00"))
    }
}

/// Poll `fetch` until it yields a receipt or `timeout` elapses.
///
/// Returns `Ok(None)` on timeout. The first fetch error ends polling.
pub async fn wait_for_receipt<F, Fut, E>(
    mut fetch: F,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<Option<TxReceipt>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<TxReceipt>, E>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(receipt) = fetch().await? {
            return Ok(Some(receipt));
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn receipt(status: &str) -> TxReceipt {
        TxReceipt::from_value(json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": status
        }))
        .unwrap()
        .unwrap()
    }

    #[test]
    fn null_receipt_is_pending() {
        assert_eq!(TxReceipt::from_value(Value::Null).unwrap(), None);
    }

    #[test]
    fn status_zero_is_a_revert() {
        assert!(receipt("0x0").reverted());
        assert!(!receipt("0x1").reverted());
    }

    #[tokio::test]
    async fn polls_until_receipt_appears() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let found = wait_for_receipt(
            move || async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(if n < 2 { None } else { Some(receipt("0x1")) })
            },
            Duration::from_millis(5),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(found.unwrap().transaction_hash, "0xabc");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_timeout() {
        let found = wait_for_receipt(
            || async { Ok::<_, String>(None) },
            Duration::from_millis(5),
            Duration::from_millis(30),
        )
        .await
        .unwrap();
        assert!(found.is_none());
    }
}
