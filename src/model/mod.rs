pub mod candle;
pub mod feature;
pub mod order;
pub mod signal;
pub mod tick;
