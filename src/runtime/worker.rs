use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::broker::OrderSink;
use crate::decision::{self, Decision, DecisionContext, InstrumentState};
use crate::error::AppError;
use crate::event::AppEvent;
use crate::model::tick::Tick;
use crate::portfolio::AllocationTable;
use crate::predictor::SignalSource;
use crate::risk_module::{RejectionReasonCode, RiskGate};
use crate::window::WindowTracker;

/// Immutable collaborators shared by every instrument worker.
pub struct WorkerShared<S: SignalSource + ?Sized, O: OrderSink> {
    pub tracker: WindowTracker,
    pub source: Arc<S>,
    pub gate: RiskGate,
    pub sink: Arc<O>,
    pub tracked_count: usize,
}

impl<S: SignalSource + ?Sized, O: OrderSink> Clone for WorkerShared<S, O> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            source: Arc::clone(&self.source),
            gate: self.gate,
            sink: Arc::clone(&self.sink),
            tracked_count: self.tracked_count,
        }
    }
}

fn tick_time_ms(tick: &Tick) -> u64 {
    if tick.timestamp_ms > 0 {
        tick.timestamp_ms
    } else {
        chrono::Utc::now().timestamp_millis() as u64
    }
}

/// Run the decision loop for one tick of one instrument, submitting at most
/// one order. A rejected tick or source error is reported as an event and
/// returned; the state is only committed after the sink accepts the order.
pub async fn handle_tick<S, O>(
    shared: &WorkerShared<S, O>,
    state: &mut InstrumentState,
    allocations: &AllocationTable,
    tick: &Tick,
    app_tx: &mpsc::Sender<AppEvent>,
) -> Result<Decision, AppError>
where
    S: SignalSource + ?Sized,
    O: OrderSink,
{
    let now_ms = tick_time_ms(tick);
    let ctx = DecisionContext {
        tracker: &shared.tracker,
        source: shared.source.as_ref(),
        gate: &shared.gate,
        allocations,
        tracked_count: shared.tracked_count,
    };

    let decision = match decision::decide(&ctx, state, tick.price, now_ms) {
        Ok(d) => d,
        Err(e) => {
            warn!(symbol = %state.symbol, price = tick.price, error = %e, "tick rejected");
            let _ = app_tx
                .send(AppEvent::Error(format!("{}: {}", state.symbol, e)))
                .await;
            return Err(e);
        }
    };

    if let Some(signal) = decision.signal() {
        let _ = app_tx
            .send(AppEvent::SignalComputed {
                symbol: state.symbol.clone(),
                signal,
                price: tick.price,
                timestamp_ms: now_ms,
            })
            .await;
    }

    match &decision {
        Decision::Warmup | Decision::Unchanged(_) => {}
        Decision::CoolingDown {
            signal,
            remaining_ms,
        } => {
            let _ = app_tx
                .send(AppEvent::OrderBlocked {
                    symbol: state.symbol.clone(),
                    signal: *signal,
                    reason_code: RejectionReasonCode::RiskCooldownActive.as_str().to_string(),
                    reason: format!("cooldown active for another {} ms", remaining_ms),
                })
                .await;
        }
        Decision::Duplicate(signal) => {
            debug!(symbol = %state.symbol, signal = %signal, "duplicate order signal suppressed");
            let _ = app_tx
                .send(AppEvent::OrderBlocked {
                    symbol: state.symbol.clone(),
                    signal: *signal,
                    reason_code: RejectionReasonCode::RiskDuplicateSignal.as_str().to_string(),
                    reason: format!("last recorded order was already {}", signal),
                })
                .await;
        }
        Decision::OverAllocation {
            signal,
            notional,
            max,
        } => {
            warn!(symbol = %state.symbol, notional, max, "order above allocation ceiling");
            let _ = app_tx
                .send(AppEvent::OrderBlocked {
                    symbol: state.symbol.clone(),
                    signal: *signal,
                    reason_code: RejectionReasonCode::RiskAllocationCap.as_str().to_string(),
                    reason: format!("notional {:.2} exceeds ceiling {:.2}", notional, max),
                })
                .await;
        }
        Decision::Submit(intent) => match shared.sink.submit(intent.clone()).await {
            Ok(ack) => {
                decision::confirm(&shared.gate, state, intent, now_ms);
                info!(
                    symbol = %intent.symbol,
                    side = %intent.side,
                    qty = intent.quantity,
                    order_id = %ack.order_id,
                    "order placed"
                );
                let _ = app_tx
                    .send(AppEvent::OrderPlaced {
                        intent: intent.clone(),
                        ack,
                    })
                    .await;
            }
            Err(e) => {
                warn!(symbol = %intent.symbol, side = %intent.side, error = %e, "order submission failed");
                let _ = app_tx
                    .send(AppEvent::OrderFailed {
                        intent: intent.clone(),
                        reason_code: RejectionReasonCode::BrokerSubmitFailed.as_str().to_string(),
                        reason: e.to_string(),
                    })
                    .await;
            }
        },
    }

    if let Some(trigger) = state.advise_exit(&shared.gate, tick.price) {
        if let Some(entry_price) = state.entry_price {
            info!(symbol = %state.symbol, trigger = trigger.as_str(), entry_price, price = tick.price, "exit advised");
            let _ = app_tx
                .send(AppEvent::ExitAdvice {
                    symbol: state.symbol.clone(),
                    trigger,
                    entry_price,
                    price: tick.price,
                    timestamp_ms: now_ms,
                })
                .await;
        }
    }

    Ok(decision)
}

/// Worker owning one instrument's state. Returns the state when the tick
/// channel closes or shutdown is signalled.
pub async fn run_instrument_worker<S, O>(
    shared: WorkerShared<S, O>,
    mut state: InstrumentState,
    mut tick_rx: mpsc::Receiver<Tick>,
    allocations: watch::Receiver<Arc<AllocationTable>>,
    app_tx: mpsc::Sender<AppEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> InstrumentState
where
    S: SignalSource + ?Sized,
    O: OrderSink,
{
    debug!(symbol = %state.symbol, "instrument worker started");
    loop {
        tokio::select! {
            result = tick_rx.recv() => {
                let Some(tick) = result else {
                    debug!(symbol = %state.symbol, "tick channel closed, worker exiting");
                    break;
                };
                let snapshot = Arc::clone(&allocations.borrow());
                // Already logged and reported; the worker keeps going.
                let _ = handle_tick(&shared, &mut state, &snapshot, &tick, &app_tx).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    state
}
