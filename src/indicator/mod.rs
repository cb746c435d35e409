pub mod atr;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use engine::{label_rows, IndicatorEngine, StandardIndicators};
