pub mod paper;

use std::future::Future;

use crate::error::AppError;
use crate::model::order::{OrderAck, OrderIntent};

pub use paper::PaperBroker;

/// Order execution collaborator. A failed submission leaves the caller's
/// state untouched; the next tick retries.
pub trait OrderSink: Send + Sync {
    fn submit(&self, intent: OrderIntent) -> impl Future<Output = Result<OrderAck, AppError>> + Send;
}
