use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::decision::{self, Decision, DecisionContext, InstrumentState};
use crate::error::AppError;
use crate::model::order::OrderIntent;
use crate::model::signal::Signal;
use crate::portfolio::AllocationTable;
use crate::predictor::SignalSource;
use crate::risk_module::RiskGate;
use crate::window::WindowTracker;

/// Normalise a ticker the way the registry keys it.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Application context: the instrument registry plus the shared, immutable
/// collaborators every decision needs.
pub struct Session {
    tracker: WindowTracker,
    source: Arc<dyn SignalSource>,
    gate: RiskGate,
    instruments: HashMap<String, InstrumentState>,
    order: Vec<String>,
}

impl Session {
    /// Create one instrument entry per distinct ticker, in input order.
    pub fn init(
        tickers: &[String],
        window_capacity: usize,
        tracker: WindowTracker,
        source: Arc<dyn SignalSource>,
        gate: RiskGate,
    ) -> Result<Self, AppError> {
        if window_capacity == 0 {
            return Err(AppError::Config("window capacity must be > 0".to_string()));
        }
        let mut instruments = HashMap::new();
        let mut order = Vec::new();
        for raw in tickers {
            let symbol = normalize_symbol(raw);
            if symbol.is_empty() || instruments.contains_key(&symbol) {
                continue;
            }
            instruments.insert(symbol.clone(), InstrumentState::new(symbol.clone(), window_capacity));
            order.push(symbol);
        }
        if order.is_empty() {
            return Err(AppError::Config("no tickers to track".to_string()));
        }
        info!(
            instruments = order.len(),
            model = source.name(),
            window_capacity,
            "session initialised"
        );
        Ok(Self {
            tracker,
            source,
            gate,
            instruments,
            order,
        })
    }

    pub fn symbols(&self) -> &[String] {
        &self.order
    }

    pub fn tracked_count(&self) -> usize {
        self.order.len()
    }

    pub fn gate(&self) -> &RiskGate {
        &self.gate
    }

    pub fn tracker(&self) -> &WindowTracker {
        &self.tracker
    }

    pub fn source(&self) -> &Arc<dyn SignalSource> {
        &self.source
    }

    pub fn instrument(&self, symbol: &str) -> Option<&InstrumentState> {
        self.instruments.get(&normalize_symbol(symbol))
    }

    fn entry(&self, symbol: &str) -> Result<&InstrumentState, AppError> {
        self.instruments
            .get(&normalize_symbol(symbol))
            .ok_or_else(|| AppError::invalid_instrument(symbol, "not tracked by this session"))
    }

    fn entry_mut(&mut self, symbol: &str) -> Result<&mut InstrumentState, AppError> {
        self.instruments
            .get_mut(&normalize_symbol(symbol))
            .ok_or_else(|| AppError::invalid_instrument(symbol, "not tracked by this session"))
    }

    /// Feed one price; returns the fresh candidate signal, or `None` during warm-up.
    pub fn observe(&mut self, symbol: &str, price: f64) -> Result<Option<Signal>, AppError> {
        let state = self
            .instruments
            .get_mut(&normalize_symbol(symbol))
            .ok_or_else(|| AppError::invalid_instrument(symbol, "not tracked by this session"))?;
        state.observe(&self.tracker, self.source.as_ref(), price)
    }

    pub fn can_trade(&self, symbol: &str, now_ms: u64) -> Result<bool, AppError> {
        Ok(self.gate.can_trade(&self.entry(symbol)?.risk, now_ms))
    }

    pub fn record_trade(&mut self, symbol: &str, now_ms: u64) -> Result<(), AppError> {
        let gate = self.gate;
        gate.record_trade(&mut self.entry_mut(symbol)?.risk, now_ms);
        Ok(())
    }

    pub fn allow_order(&self, symbol: &str, signal: Signal) -> Result<bool, AppError> {
        Ok(self.gate.allow_order(&self.entry(symbol)?.risk, signal))
    }

    pub fn record_order(&mut self, symbol: &str, signal: Signal) -> Result<(), AppError> {
        let gate = self.gate;
        gate.record_order(&mut self.entry_mut(symbol)?.risk, signal);
        Ok(())
    }

    /// Run the full decision loop for one tick.
    pub fn decide(
        &mut self,
        symbol: &str,
        price: f64,
        allocations: &AllocationTable,
        now_ms: u64,
    ) -> Result<Decision, AppError> {
        let tracked_count = self.order.len();
        let state = self
            .instruments
            .get_mut(&normalize_symbol(symbol))
            .ok_or_else(|| AppError::invalid_instrument(symbol, "not tracked by this session"))?;
        let ctx = DecisionContext {
            tracker: &self.tracker,
            source: self.source.as_ref(),
            gate: &self.gate,
            allocations,
            tracked_count,
        };
        decision::decide(&ctx, state, price, now_ms)
    }

    pub fn confirm(&mut self, intent: &OrderIntent, now_ms: u64) -> Result<(), AppError> {
        let gate = self.gate;
        let state = self.entry_mut(&intent.symbol)?;
        decision::confirm(&gate, state, intent, now_ms);
        Ok(())
    }

    /// Hand every instrument to its own worker. The session keeps the shared
    /// collaborators only.
    pub fn take_instruments(&mut self) -> Vec<InstrumentState> {
        let mut out = Vec::with_capacity(self.order.len());
        for symbol in &self.order {
            if let Some(state) = self.instruments.remove(symbol) {
                out.push(state);
            }
        }
        out
    }

    /// Put instrument states returned by finished workers back.
    pub fn restore(&mut self, states: impl IntoIterator<Item = InstrumentState>) {
        for state in states {
            self.instruments.insert(state.symbol.clone(), state);
        }
    }

    /// Log the final per-instrument status and release the registry.
    pub fn teardown(mut self) -> Vec<InstrumentState> {
        let mut out = Vec::with_capacity(self.order.len());
        for symbol in &self.order {
            let Some(state) = self.instruments.remove(symbol) else {
                continue;
            };
            info!(
                symbol = %state.symbol,
                status = ?state.status,
                held = ?state.held_signal(),
                window_len = state.window.len(),
                last_trade_ms = ?state.risk.last_trade_ms,
                "instrument torn down"
            );
            out.push(state);
        }
        out
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("model", &self.source.name())
            .field("symbols", &self.order)
            .field("tracker", &self.tracker)
            .finish()
    }
}
