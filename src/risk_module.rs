use crate::error::AppError;
use crate::model::signal::Signal;

pub const DEFAULT_COOLDOWN_MS: u64 = 3_600_000;
pub const DEFAULT_STOP_LOSS_PCT: f64 = 0.05;
pub const DEFAULT_TAKE_PROFIT_PCT: f64 = 0.10;
pub const DEFAULT_MAX_ALLOC_FRACTION: f64 = 0.2;
pub const DEFAULT_CAPITAL: f64 = 10_000.0;

/// Stable taxonomy for reasons a candidate signal did not become an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReasonCode {
    RiskCooldownActive,
    RiskDuplicateSignal,
    RiskAllocationCap,
    BrokerSubmitFailed,
}

impl RejectionReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RiskCooldownActive => "risk.cooldown_active",
            Self::RiskDuplicateSignal => "risk.duplicate_signal",
            Self::RiskAllocationCap => "risk.allocation_cap",
            Self::BrokerSubmitFailed => "broker.submit_failed",
        }
    }
}

/// Limits shared by every instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLimits {
    pub cooldown_ms: u64,
    /// Fractions, e.g. `0.05` for 5%.
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_alloc_fraction: f64,
    pub capital: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            stop_loss_pct: DEFAULT_STOP_LOSS_PCT,
            take_profit_pct: DEFAULT_TAKE_PROFIT_PCT,
            max_alloc_fraction: DEFAULT_MAX_ALLOC_FRACTION,
            capital: DEFAULT_CAPITAL,
        }
    }
}

/// Per-instrument gate memory. Only a confirmed placement mutates it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskState {
    pub last_trade_ms: Option<u64>,
    pub last_order_signal: Option<Signal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    StopLoss,
    TakeProfit,
}

impl ExitTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
        }
    }
}

/// Cooldown, duplicate suppression, and allocation ceiling checks.
///
/// The gate itself is stateless; callers hand in the instrument's
/// [`RiskState`] so each worker can own its state exclusively.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskGate {
    limits: RiskLimits,
}

impl RiskGate {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// `true` when the instrument never traded or the cooldown has strictly elapsed.
    pub fn can_trade(&self, state: &RiskState, now_ms: u64) -> bool {
        match state.last_trade_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.limits.cooldown_ms,
        }
    }

    /// Milliseconds until `can_trade` turns true; zero when it already is.
    pub fn cooldown_remaining_ms(&self, state: &RiskState, now_ms: u64) -> u64 {
        match state.last_trade_ms {
            None => 0,
            Some(last) => {
                let elapsed = now_ms.saturating_sub(last);
                if elapsed > self.limits.cooldown_ms {
                    0
                } else {
                    self.limits.cooldown_ms - elapsed + 1
                }
            }
        }
    }

    pub fn record_trade(&self, state: &mut RiskState, now_ms: u64) {
        state.last_trade_ms = Some(now_ms);
    }

    /// Pure duplicate check: `false` iff `signal` equals the last recorded order signal.
    pub fn allow_order(&self, state: &RiskState, signal: Signal) -> bool {
        state.last_order_signal != Some(signal)
    }

    pub fn record_order(&self, state: &mut RiskState, signal: Signal) {
        state.last_order_signal = Some(signal);
    }

    pub fn stop_loss_hit(&self, entry_price: f64, current_price: f64) -> bool {
        entry_price > 0.0 && (entry_price - current_price) / entry_price >= self.limits.stop_loss_pct
    }

    pub fn take_profit_hit(&self, entry_price: f64, current_price: f64) -> bool {
        entry_price > 0.0
            && (current_price - entry_price) / entry_price >= self.limits.take_profit_pct
    }

    /// Advisory exit evaluation for a held long. Stop-loss wins if both fire.
    pub fn exit_trigger(&self, entry_price: f64, current_price: f64) -> Option<ExitTrigger> {
        if self.stop_loss_hit(entry_price, current_price) {
            Some(ExitTrigger::StopLoss)
        } else if self.take_profit_hit(entry_price, current_price) {
            Some(ExitTrigger::TakeProfit)
        } else {
            None
        }
    }

    /// Dollar ceiling for a single order.
    pub fn max_allocation(&self) -> f64 {
        self.limits.capital * self.limits.max_alloc_fraction
    }

    /// Reject (never clamp) an order whose notional exceeds the ceiling.
    pub fn check_notional(&self, notional: f64) -> Result<(), AppError> {
        let max = self.max_allocation();
        if notional > max {
            return Err(AppError::AllocationCap { notional, max });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_cooldown_counts_down_to_zero() {
        let gate = RiskGate::new(RiskLimits {
            cooldown_ms: 1_000,
            ..RiskLimits::default()
        });
        let mut state = RiskState::default();
        assert_eq!(gate.cooldown_remaining_ms(&state, 5), 0);
        gate.record_trade(&mut state, 0);
        assert_eq!(gate.cooldown_remaining_ms(&state, 400), 601);
        assert_eq!(gate.cooldown_remaining_ms(&state, 1_001), 0);
    }

    #[test]
    fn reason_codes_are_dotted() {
        assert_eq!(RejectionReasonCode::RiskCooldownActive.as_str(), "risk.cooldown_active");
        assert_eq!(RejectionReasonCode::BrokerSubmitFailed.as_str(), "broker.submit_failed");
    }
}
