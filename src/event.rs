use std::sync::Arc;

use crate::model::order::{OrderAck, OrderIntent};
use crate::model::signal::Signal;
use crate::portfolio::AllocationTable;
use crate::risk_module::ExitTrigger;

#[derive(Debug, Clone)]
pub enum AppEvent {
    SignalComputed {
        symbol: String,
        signal: Signal,
        price: f64,
        timestamp_ms: u64,
    },
    OrderPlaced {
        intent: OrderIntent,
        ack: OrderAck,
    },
    OrderFailed {
        intent: OrderIntent,
        reason_code: String,
        reason: String,
    },
    /// Candidate signal the risk gate did not let through.
    OrderBlocked {
        symbol: String,
        signal: Signal,
        reason_code: String,
        reason: String,
    },
    AllocationUpdated(Arc<AllocationTable>),
    ExitAdvice {
        symbol: String,
        trigger: ExitTrigger,
        entry_price: f64,
        price: f64,
        timestamp_ms: u64,
    },
    TickDropped {
        symbol: String,
    },
    Error(String),
}
