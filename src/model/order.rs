use std::fmt;

use serde::Serialize;

use crate::model::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl From<Signal> for OrderSide {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Buy => OrderSide::Buy,
            Signal::Sell => OrderSide::Sell,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Market order the decision loop wants placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderIntent {
    /// Globally unique ID for this intent.
    pub intent_id: String,
    pub symbol: String,
    pub signal: Signal,
    pub side: OrderSide,
    /// Whole shares, always >= 1.
    pub quantity: u64,
    /// Close the quantity was sized against.
    pub last_price: f64,
    pub created_at_ms: u64,
}

impl OrderIntent {
    pub fn new(symbol: &str, signal: Signal, quantity: u64, last_price: f64, now_ms: u64) -> Self {
        Self {
            intent_id: format!("int-{}", &uuid::Uuid::new_v4().simple().to_string()[..12]),
            symbol: symbol.to_string(),
            signal,
            side: OrderSide::from(signal),
            quantity,
            last_price,
            created_at_ms: now_ms,
        }
    }

    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.last_price
    }
}

/// Broker acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderAck {
    pub order_id: String,
    pub intent_id: String,
    pub accepted_at_ms: u64,
}
