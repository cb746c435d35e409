use stock_autotrader::error::AppError;
use stock_autotrader::model::signal::Signal;
use stock_autotrader::risk_module::{ExitTrigger, RiskGate, RiskLimits, RiskState};

const SEC: u64 = 1_000;

fn gate() -> RiskGate {
    RiskGate::new(RiskLimits::default())
}

#[test]
/// Verifies the cooldown scenario with the default 3600 s window:
/// after a trade at t=0, trading is blocked at t=1800 and allowed at t=3601.
fn cooldown_blocks_then_releases() {
    let gate = gate();
    let mut state = RiskState::default();
    assert!(gate.can_trade(&state, 0));

    gate.record_trade(&mut state, 0);
    assert!(!gate.can_trade(&state, 0));
    assert!(!gate.can_trade(&state, 1_800 * SEC));
    assert!(!gate.can_trade(&state, 3_600 * SEC));
    assert!(gate.can_trade(&state, 3_601 * SEC));
}

#[test]
/// Verifies that a clock stepping backwards never unlocks the cooldown.
fn clock_going_backwards_stays_blocked() {
    let gate = gate();
    let mut state = RiskState::default();
    gate.record_trade(&mut state, 10_000 * SEC);
    assert!(!gate.can_trade(&state, 5 * SEC));
}

#[test]
/// Verifies duplicate suppression: two identical consecutive signals allow
/// only one order, while a reversal is allowed again.
fn duplicate_signal_is_suppressed() {
    let gate = gate();
    let mut state = RiskState::default();
    assert!(gate.allow_order(&state, Signal::Buy));
    gate.record_order(&mut state, Signal::Buy);
    assert!(!gate.allow_order(&state, Signal::Buy));
    assert!(gate.allow_order(&state, Signal::Sell));
}

#[test]
/// Verifies that allow_order is a pure check and never commits.
fn allow_order_does_not_record() {
    let gate = gate();
    let state = RiskState::default();
    assert!(gate.allow_order(&state, Signal::Sell));
    assert!(gate.allow_order(&state, Signal::Sell));
    assert_eq!(state.last_order_signal, None);
}

#[test]
/// Verifies stop-loss and take-profit thresholds at their exact boundaries.
fn stop_loss_and_take_profit_boundaries() {
    let gate = gate();
    assert!(gate.stop_loss_hit(100.0, 95.0));
    assert!(!gate.stop_loss_hit(100.0, 95.01));
    assert!(gate.take_profit_hit(100.0, 110.0));
    assert!(!gate.take_profit_hit(100.0, 109.99));
    assert_eq!(gate.exit_trigger(100.0, 90.0), Some(ExitTrigger::StopLoss));
    assert_eq!(gate.exit_trigger(100.0, 125.0), Some(ExitTrigger::TakeProfit));
    assert_eq!(gate.exit_trigger(100.0, 101.0), None);
    assert!(!gate.stop_loss_hit(0.0, 1.0));
}

#[test]
/// Verifies the allocation ceiling is reported as an error, never clamped.
fn notional_above_ceiling_is_rejected() {
    let gate = RiskGate::new(RiskLimits {
        capital: 10_000.0,
        max_alloc_fraction: 0.2,
        ..RiskLimits::default()
    });
    assert_eq!(gate.max_allocation(), 2_000.0);
    assert!(gate.check_notional(2_000.0).is_ok());
    match gate.check_notional(2_500.0) {
        Err(AppError::AllocationCap { notional, max }) => {
            assert_eq!(notional, 2_500.0);
            assert_eq!(max, 2_000.0);
        }
        other => panic!("expected allocation cap error, got {:?}", other),
    }
}
