use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid instrument {symbol}: {reason}")]
    InvalidInstrument { symbol: String, reason: String },

    #[error("model error: {0}")]
    Model(String),

    #[error("history error ({symbol}): {msg}")]
    History { symbol: String, msg: String },

    #[error("order error: {0}")]
    Order(String),

    #[error("allocation cap exceeded: notional {notional:.2} > max {max:.2}")]
    AllocationCap { notional: f64, max: f64 },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn invalid_instrument(symbol: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInstrument {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}
