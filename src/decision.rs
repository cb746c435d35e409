use tracing::debug;

use crate::error::AppError;
use crate::model::order::OrderIntent;
use crate::model::signal::{Signal, TradeStatus};
use crate::portfolio::{share_count, AllocationTable};
use crate::predictor::SignalSource;
use crate::risk_module::{ExitTrigger, RejectionReasonCode, RiskGate, RiskState};
use crate::window::{RollingWindow, WindowTracker};

/// Everything the decision loop tracks for one instrument. Owned by exactly
/// one registry entry or worker.
#[derive(Debug, Clone)]
pub struct InstrumentState {
    pub symbol: String,
    pub live_price: Option<f64>,
    pub window: RollingWindow,
    pub status: TradeStatus,
    pub last_candidate: Option<Signal>,
    pub risk: RiskState,
    /// Close the current long was sized against.
    pub entry_price: Option<f64>,
    exit_advised: bool,
}

impl InstrumentState {
    pub fn new(symbol: impl Into<String>, window_capacity: usize) -> Self {
        Self {
            symbol: symbol.into(),
            live_price: None,
            window: RollingWindow::new(window_capacity),
            status: TradeStatus::NoSignal,
            last_candidate: None,
            risk: RiskState::default(),
            entry_price: None,
            exit_advised: false,
        }
    }

    pub fn held_signal(&self) -> Option<Signal> {
        self.status.held()
    }

    /// Feed one price and run the signal source over the refreshed window.
    ///
    /// `Ok(None)` while the window is warming up or the source lacks enough
    /// valid rows. Rejects non-positive prices without touching the window.
    pub fn observe<S: SignalSource + ?Sized>(
        &mut self,
        tracker: &WindowTracker,
        source: &S,
        price: f64,
    ) -> Result<Option<Signal>, AppError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(AppError::invalid_instrument(
                &self.symbol,
                format!("tick price {} is not a positive price", price),
            ));
        }
        self.live_price = Some(price);
        let Some(frame) = tracker.observe(&mut self.window, price) else {
            return Ok(None);
        };
        if frame.len() < source.lookback() {
            return Ok(None);
        }
        let candidate = source.predict(frame.rows())?;
        self.last_candidate = Some(candidate);
        if self.status == TradeStatus::NoSignal {
            self.status = TradeStatus::HasSignal;
        }
        Ok(Some(candidate))
    }

    /// Advisory stop-loss / take-profit check for a held long. Fires at most
    /// once per position.
    pub fn advise_exit(&mut self, gate: &RiskGate, price: f64) -> Option<ExitTrigger> {
        if self.exit_advised || self.status != TradeStatus::BuyHeld {
            return None;
        }
        let trigger = gate.exit_trigger(self.entry_price?, price)?;
        self.exit_advised = true;
        Some(trigger)
    }
}

/// Outcome of one tick for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No valid feature row yet.
    Warmup,
    /// Candidate equals the held signal.
    Unchanged(Signal),
    CoolingDown { signal: Signal, remaining_ms: u64 },
    /// Same signal as the last recorded order.
    Duplicate(Signal),
    OverAllocation { signal: Signal, notional: f64, max: f64 },
    Submit(OrderIntent),
}

impl Decision {
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Decision::Warmup => None,
            Decision::Unchanged(s) | Decision::Duplicate(s) => Some(*s),
            Decision::CoolingDown { signal, .. } | Decision::OverAllocation { signal, .. } => {
                Some(*signal)
            }
            Decision::Submit(intent) => Some(intent.signal),
        }
    }

    pub fn reason_code(&self) -> Option<RejectionReasonCode> {
        match self {
            Decision::CoolingDown { .. } => Some(RejectionReasonCode::RiskCooldownActive),
            Decision::Duplicate(_) => Some(RejectionReasonCode::RiskDuplicateSignal),
            Decision::OverAllocation { .. } => Some(RejectionReasonCode::RiskAllocationCap),
            Decision::Warmup | Decision::Unchanged(_) | Decision::Submit(_) => None,
        }
    }
}

/// Shared read-only inputs of the decision loop.
pub struct DecisionContext<'a, S: SignalSource + ?Sized> {
    pub tracker: &'a WindowTracker,
    pub source: &'a S,
    pub gate: &'a RiskGate,
    pub allocations: &'a AllocationTable,
    /// Instruments in the session; the fallback split is `capital / tracked_count`.
    pub tracked_count: usize,
}

impl<S: SignalSource + ?Sized> DecisionContext<'_, S> {
    /// Dollar budget for `symbol`: the published allocation if any, else an
    /// equal split, never above the gate ceiling.
    pub fn budget_for(&self, symbol: &str) -> f64 {
        let capital = self.gate.limits().capital;
        let allocation = self
            .allocations
            .allocation_for(symbol)
            .unwrap_or_else(|| capital / self.tracked_count.max(1) as f64);
        allocation.min(self.gate.max_allocation())
    }
}

/// Turn one tick into at most one order intent. Does not mutate gate state;
/// call [`confirm`] once the order sink accepts the intent.
pub fn decide<S: SignalSource + ?Sized>(
    ctx: &DecisionContext<'_, S>,
    state: &mut InstrumentState,
    price: f64,
    now_ms: u64,
) -> Result<Decision, AppError> {
    let Some(candidate) = state.observe(ctx.tracker, ctx.source, price)? else {
        return Ok(Decision::Warmup);
    };
    if state.held_signal() == Some(candidate) {
        return Ok(Decision::Unchanged(candidate));
    }
    if !ctx.gate.can_trade(&state.risk, now_ms) {
        let remaining_ms = ctx.gate.cooldown_remaining_ms(&state.risk, now_ms);
        debug!(symbol = %state.symbol, signal = %candidate, remaining_ms, "cooldown active");
        return Ok(Decision::CoolingDown {
            signal: candidate,
            remaining_ms,
        });
    }
    // `confirm` records the held status and order memory together, so this
    // only fires when the order memory was recorded directly on the gate.
    if !ctx.gate.allow_order(&state.risk, candidate) {
        return Ok(Decision::Duplicate(candidate));
    }

    let budget = ctx.budget_for(&state.symbol);
    let quantity = share_count(budget, price);
    let intent = OrderIntent::new(&state.symbol, candidate, quantity, price, now_ms);
    if let Err(AppError::AllocationCap { notional, max }) = ctx.gate.check_notional(intent.notional()) {
        return Ok(Decision::OverAllocation {
            signal: candidate,
            notional,
            max,
        });
    }
    Ok(Decision::Submit(intent))
}

/// Commit a placement the order sink accepted.
pub fn confirm(gate: &RiskGate, state: &mut InstrumentState, intent: &OrderIntent, now_ms: u64) {
    state.status = TradeStatus::holding(intent.signal);
    gate.record_order(&mut state.risk, intent.signal);
    gate.record_trade(&mut state.risk, now_ms);
    state.entry_price = intent.signal.is_buy().then_some(intent.last_price);
    state.exit_advised = false;
}
