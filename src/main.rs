use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use stock_autotrader::broker::PaperBroker;
use stock_autotrader::config::Config;
use stock_autotrader::decision::InstrumentState;
use stock_autotrader::event::AppEvent;
use stock_autotrader::feed::{read_tick_tape, replay_ticks};
use stock_autotrader::history::CsvHistorySource;
use stock_autotrader::indicator::{IndicatorEngine, StandardIndicators};
use stock_autotrader::model::tick::Tick;
use stock_autotrader::portfolio::AllocationTable;
use stock_autotrader::predictor::{PredictorModel, SignalSource, TrendForecaster};
use stock_autotrader::risk_module::RiskGate;
use stock_autotrader::runtime::{
    run_allocation_loop, run_allocation_pass, run_instrument_worker, AllocationPass,
    DispatchOutcome, WorkerRegistry, WorkerShared,
};
use stock_autotrader::session::Session;
use stock_autotrader::window::WindowTracker;

const APP_EVENT_CHANNEL_CAPACITY: usize = 256;

fn log_event(event: &AppEvent) {
    match event {
        AppEvent::SignalComputed {
            symbol,
            signal,
            price,
            ..
        } => tracing::debug!(symbol = %symbol, signal = %signal, price, "signal"),
        AppEvent::OrderPlaced { intent, ack } => tracing::info!(
            symbol = %intent.symbol,
            side = %intent.side,
            qty = intent.quantity,
            price = intent.last_price,
            order_id = %ack.order_id,
            "order placed"
        ),
        AppEvent::OrderFailed {
            intent,
            reason_code,
            reason,
        } => tracing::warn!(
            symbol = %intent.symbol,
            side = %intent.side,
            reason_code = %reason_code,
            reason = %reason,
            "order failed"
        ),
        AppEvent::OrderBlocked {
            symbol,
            signal,
            reason_code,
            reason,
        } => tracing::info!(
            symbol = %symbol,
            signal = %signal,
            reason_code = %reason_code,
            reason = %reason,
            "order blocked"
        ),
        AppEvent::AllocationUpdated(table) => tracing::info!(
            entries = table.entries().len(),
            total = table.total_allocated(),
            "allocation snapshot published"
        ),
        AppEvent::ExitAdvice {
            symbol,
            trigger,
            entry_price,
            price,
            ..
        } => tracing::warn!(
            symbol = %symbol,
            trigger = trigger.as_str(),
            entry_price,
            price,
            "exit advised"
        ),
        AppEvent::TickDropped { symbol } => {
            tracing::warn!(symbol = %symbol, "tick dropped, worker channel full")
        }
        AppEvent::Error(msg) => tracing::error!(error = %msg, "runtime error"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load config
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set AUTOTRADER_CONFIG or provide config/default.toml");
            std::process::exit(1);
        }
    };

    let log_file = std::fs::File::create(&config.logging.file)
        .with_context(|| format!("failed to create {}", config.logging.file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .json()
        .init();

    let symbols = config.trading.tradable_symbols();
    tracing::info!(
        tickers = ?symbols,
        capital = config.trading.capital,
        model = %config.model.path.display(),
        "Starting stock-autotrader"
    );

    let model = PredictorModel::load(&config.model.path)
        .with_context(|| format!("failed to load model {}", config.model.path.display()))?;
    let source: Arc<dyn SignalSource> = Arc::new(model);

    let engine: Arc<dyn IndicatorEngine> = Arc::new(StandardIndicators::default());
    let live_rows = config
        .window
        .capacity
        .saturating_sub(engine.warmup_bars());
    if source.lookback() > 1 && source.lookback() != config.model.sequence_len {
        tracing::warn!(
            model_time_steps = source.lookback(),
            configured = config.model.sequence_len,
            "model.sequence_len does not match the loaded model"
        );
    }
    if live_rows < source.lookback() {
        tracing::warn!(
            capacity = config.window.capacity,
            valid_rows = live_rows,
            lookback = source.lookback(),
            "window too small for the model lookback, live signals will never fire"
        );
    }

    let tracker = WindowTracker::new(Arc::clone(&engine), config.window.min_history);
    let gate = RiskGate::new(config.risk_limits());
    let mut session = Session::init(
        &symbols,
        config.window.capacity,
        tracker.clone(),
        Arc::clone(&source),
        gate,
    )?;

    // Channels
    let (app_tx, mut app_rx) = mpsc::channel::<AppEvent>(APP_EVENT_CHANNEL_CAPACITY);
    let (tick_tx, mut tick_rx) = mpsc::channel::<Tick>(config.feed.channel_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(AllocationTable::default()));

    // Allocation: one pass up front, then periodic refresh.
    let pass = AllocationPass {
        history: Arc::new(CsvHistorySource::new(&config.history.dir)),
        engine: Arc::clone(&engine),
        source: Arc::clone(&source),
        forecaster: TrendForecaster::default(),
        symbols: session.symbols().to_vec(),
        lookback_bars: config.history.lookback_bars,
        capital: config.trading.capital,
    };
    if let Err(e) = run_allocation_pass(&pass, &snapshot_tx, &app_tx).await {
        tracing::warn!(error = %e, "initial allocation pass failed, sizing falls back to equal split");
    }
    tokio::spawn(run_allocation_loop(
        pass,
        Duration::from_secs(config.allocation.refresh_secs),
        snapshot_tx,
        app_tx.clone(),
        shutdown_rx.clone(),
    ));

    // One worker per instrument, each owning its state.
    let shared = WorkerShared {
        tracker,
        source: Arc::clone(&source),
        gate,
        sink: Arc::new(PaperBroker::new()),
        tracked_count: session.tracked_count(),
    };
    let mut registry = WorkerRegistry::default();
    let mut workers: Vec<JoinHandle<InstrumentState>> = Vec::new();
    for state in session.take_instruments() {
        let (worker_tx, worker_rx) = mpsc::channel::<Tick>(config.feed.channel_capacity);
        registry.register(&state.symbol, worker_tx);
        workers.push(tokio::spawn(run_instrument_worker(
            shared.clone(),
            state,
            worker_rx,
            snapshot_rx.clone(),
            app_tx.clone(),
            shutdown_rx.clone(),
        )));
    }

    // Dispatcher: single ordered channel, partitioned by instrument.
    let dispatch_app_tx = app_tx.clone();
    let mut dispatch_shutdown = shutdown_rx.clone();
    let dispatcher = tokio::spawn(async move {
        loop {
            tokio::select! {
                result = tick_rx.recv() => {
                    let Some(tick) = result else {
                        tracing::info!("Tick channel closed, dispatcher exiting");
                        break;
                    };
                    let symbol = tick.symbol.clone();
                    match registry.dispatch_tick(tick) {
                        DispatchOutcome::Delivered => {}
                        DispatchOutcome::Dropped => {
                            let _ = dispatch_app_tx.send(AppEvent::TickDropped { symbol }).await;
                        }
                        DispatchOutcome::Unrouted => {
                            tracing::debug!(symbol = %symbol, "tick for untracked symbol ignored");
                        }
                    }
                }
                changed = dispatch_shutdown.changed() => {
                    if changed.is_err() || *dispatch_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        registry.close_all();
    });

    // Feed
    match &config.feed.replay_path {
        Some(path) => {
            let ticks = read_tick_tape(path)
                .with_context(|| format!("failed to read tick tape {}", path.display()))?;
            tracing::info!(ticks = ticks.len(), path = %path.display(), "replaying tick tape");
            tokio::spawn(replay_ticks(
                ticks,
                Duration::from_millis(config.feed.pace_ms),
                tick_tx,
                shutdown_rx.clone(),
            ));
        }
        None => {
            tracing::warn!("no feed.replay_path configured, waiting for Ctrl+C");
            // Keep the dispatcher alive until shutdown.
            let idle_shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                let _tick_tx = tick_tx;
                let mut idle_shutdown = idle_shutdown;
                while idle_shutdown.changed().await.is_ok() {
                    if *idle_shutdown.borrow() {
                        break;
                    }
                }
            });
        }
    }

    // Supervisor: once every worker has returned its state, stop the rest.
    let supervisor_shutdown = shutdown_tx.clone();
    let supervisor = tokio::spawn(async move {
        let _ = dispatcher.await;
        let mut states = Vec::with_capacity(workers.len());
        for handle in workers {
            match handle.await {
                Ok(state) => states.push(state),
                Err(e) => tracing::error!(error = %e, "instrument worker panicked"),
            }
        }
        let _ = supervisor_shutdown.send(true);
        states
    });

    // Ctrl+C handler
    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received");
        let _ = ctrl_c_shutdown.send(true);
    });

    drop(app_tx);
    let mut supervisor = supervisor;
    let mut events_open = true;
    let states = loop {
        tokio::select! {
            joined = &mut supervisor => break joined.context("supervisor task failed")?,
            event = app_rx.recv(), if events_open => match event {
                Some(event) => log_event(&event),
                None => events_open = false,
            },
        }
    };
    while let Ok(event) = app_rx.try_recv() {
        log_event(&event);
    }

    session.restore(states);
    let final_states = session.teardown();
    tracing::info!(instruments = final_states.len(), "Shutdown complete");
    Ok(())
}
