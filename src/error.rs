use axum::http::StatusCode;

/// Errors surfaced by the marketplace indexing engine.
///
/// Undecodable receipt logs are never an error (receipts routinely carry
/// unrelated logs); they are skipped during decoding. Cache failures are
/// logged and degrade to a miss, so they never appear here either.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// The receipt did not appear within the polling budget (~2 minutes).
    #[error("timed out waiting for transaction receipt")]
    ReceiptTimeout,

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("invalid transaction hash")]
    InvalidTxHash,

    #[error("unsupported chain id {0}")]
    UnsupportedChain(i32),

    #[error("bad rpc endpoint: {0}")]
    RpcEndpoint(String),

    /// The receipt carried no log matching the requested operation, so the
    /// target is not in the expected state ("FID not listed", ...).
    #[error("{0}")]
    State(&'static str),

    #[error(transparent)]
    Rpc(#[from] alloy::transports::TransportError),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl MarketError {
    /// HTTP status the API layer maps this error to.
    pub fn status(&self) -> StatusCode {
        match self {
            MarketError::ReceiptTimeout => StatusCode::GATEWAY_TIMEOUT,
            MarketError::TransactionNotFound => StatusCode::NOT_FOUND,
            MarketError::InvalidTxHash | MarketError::UnsupportedChain(_) => {
                StatusCode::BAD_REQUEST
            }
            MarketError::State(_) => StatusCode::CONFLICT,
            MarketError::RpcEndpoint(_) | MarketError::Rpc(_) | MarketError::Db(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
