use std::collections::BTreeMap;

use tokio::sync::mpsc;

use crate::model::tick::Tick;
use crate::session::normalize_symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// Worker channel full or closed; the tick is gone.
    Dropped,
    /// No worker for the symbol.
    Unrouted,
}

/// Symbol-partitioned fan-out from the single ordered tick channel to
/// bounded per-instrument worker channels.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: BTreeMap<String, mpsc::Sender<Tick>>,
}

impl WorkerRegistry {
    /// Register (or replace) the worker for `symbol`.
    pub fn register(&mut self, symbol: impl AsRef<str>, tick_tx: mpsc::Sender<Tick>) {
        self.workers.insert(normalize_symbol(symbol.as_ref()), tick_tx);
    }

    pub fn unregister(&mut self, symbol: &str) -> bool {
        self.workers.remove(&normalize_symbol(symbol)).is_some()
    }

    /// Never blocks: a busy worker loses the tick rather than stalling the
    /// other instruments.
    pub fn dispatch_tick(&self, mut tick: Tick) -> DispatchOutcome {
        tick.symbol = normalize_symbol(&tick.symbol);
        let Some(tx) = self.workers.get(&tick.symbol) else {
            return DispatchOutcome::Unrouted;
        };
        match tx.try_send(tick) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(_) => DispatchOutcome::Dropped,
        }
    }

    /// Registered symbols in lexical order.
    pub fn symbols(&self) -> Vec<String> {
        self.workers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Drop every sender so workers see their channel close.
    pub fn close_all(&mut self) {
        self.workers.clear();
    }
}
