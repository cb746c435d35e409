use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl Tick {
    pub fn new(symbol: impl Into<String>, price: f64, timestamp_ms: u64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp_ms,
        }
    }

    /// Create a synthetic tick from a bar close (for window warm-up).
    pub fn from_price(symbol: &str, price: f64) -> Self {
        Self::new(symbol, price, 0)
    }
}
