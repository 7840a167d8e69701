use std::time::Duration;

use alloy::primitives::TxHash;
use alloy::providers::Provider;
use alloy::rpc::types::TransactionReceipt;

use crate::chain::provider::HttpProvider;
use crate::error::MarketError;

/// Seconds between receipt polls.
pub const RECEIPT_POLL_INTERVAL_SECS: u64 = 1;

/// Maximum number of polls before giving up (~2 minutes).
pub const RECEIPT_MAX_ATTEMPTS: u32 = 120;

/// Poll the RPC provider until the transaction receipt is available.
///
/// Sleeps one interval before each attempt so a transaction submitted moments
/// ago has time to land. Fails with [`MarketError::ReceiptTimeout`] once the
/// attempt budget is spent.
pub async fn wait_for_receipt(
    provider: &HttpProvider,
    tx_hash: TxHash,
) -> Result<TransactionReceipt, MarketError> {
    for _ in 0..RECEIPT_MAX_ATTEMPTS {
        tokio::time::sleep(Duration::from_secs(RECEIPT_POLL_INTERVAL_SECS)).await;
        if let Some(receipt) = provider.get_transaction_receipt(tx_hash).await? {
            return Ok(receipt);
        }
    }
    Err(MarketError::ReceiptTimeout)
}

/// Parse a user-supplied transaction hash, rejecting malformed input before
/// any RPC round trip.
pub fn parse_tx_hash(raw: &str) -> Result<TxHash, MarketError> {
    raw.parse::<TxHash>().map_err(|_| MarketError::InvalidTxHash)
}
