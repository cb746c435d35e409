use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tracing::info;

use crate::broker::OrderSink;
use crate::error::AppError;
use crate::model::order::{OrderAck, OrderIntent};

/// In-memory order sink. Accepts every well-formed intent unless told to
/// fail, and keeps the accepted intents in arrival order.
#[derive(Debug, Default)]
pub struct PaperBroker {
    accepted: Mutex<Vec<(OrderIntent, OrderAck)>>,
    failures_pending: AtomicUsize,
    rejected_symbols: Mutex<HashSet<String>>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` submissions regardless of content.
    pub fn fail_next(&self, n: usize) {
        self.failures_pending.store(n, Ordering::SeqCst);
    }

    /// Reject every submission for `symbol` until [`PaperBroker::allow_symbol`].
    pub async fn reject_symbol(&self, symbol: &str) {
        self.rejected_symbols.lock().await.insert(symbol.to_string());
    }

    pub async fn allow_symbol(&self, symbol: &str) {
        self.rejected_symbols.lock().await.remove(symbol);
    }

    pub async fn accepted(&self) -> Vec<(OrderIntent, OrderAck)> {
        self.accepted.lock().await.clone()
    }

    pub async fn accepted_count(&self) -> usize {
        self.accepted.lock().await.len()
    }

    fn take_failure(&self) -> bool {
        self.failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl OrderSink for PaperBroker {
    async fn submit(&self, intent: OrderIntent) -> Result<OrderAck, AppError> {
        if intent.quantity == 0 {
            return Err(AppError::Order(format!(
                "{} {}: quantity must be >= 1",
                intent.side, intent.symbol
            )));
        }
        if self.take_failure() {
            return Err(AppError::Order(format!(
                "paper broker refused {} {} x{}",
                intent.side, intent.symbol, intent.quantity
            )));
        }
        if self.rejected_symbols.lock().await.contains(&intent.symbol) {
            return Err(AppError::Order(format!(
                "paper broker rejects symbol {}",
                intent.symbol
            )));
        }

        let ack = OrderAck {
            order_id: format!("paper-{}", uuid::Uuid::new_v4().simple()),
            intent_id: intent.intent_id.clone(),
            accepted_at_ms: intent.created_at_ms,
        };
        info!(
            order_id = %ack.order_id,
            symbol = %intent.symbol,
            side = %intent.side,
            qty = intent.quantity,
            price = intent.last_price,
            "paper order accepted"
        );
        self.accepted.lock().await.push((intent, ack.clone()));
        Ok(ack)
    }
}
