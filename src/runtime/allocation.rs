use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backtest;
use crate::error::AppError;
use crate::event::AppEvent;
use crate::history::HistorySource;
use crate::indicator::{label_rows, IndicatorEngine};
use crate::portfolio::{allocate, AllocationTable, Candidate};
use crate::predictor::{holdout_accuracy, SignalSource, TrendForecaster};

/// Inputs of one allocation pass. Everything is shared and read-only.
pub struct AllocationPass<S: SignalSource + ?Sized, H: HistorySource + ?Sized> {
    pub history: Arc<H>,
    pub engine: Arc<dyn IndicatorEngine>,
    pub source: Arc<S>,
    pub forecaster: TrendForecaster,
    pub symbols: Vec<String>,
    pub lookback_bars: usize,
    pub capital: f64,
}

impl<S: SignalSource + ?Sized, H: HistorySource + ?Sized> Clone for AllocationPass<S, H> {
    fn clone(&self) -> Self {
        Self {
            history: Arc::clone(&self.history),
            engine: Arc::clone(&self.engine),
            source: Arc::clone(&self.source),
            forecaster: self.forecaster,
            symbols: self.symbols.clone(),
            lookback_bars: self.lookback_bars,
            capital: self.capital,
        }
    }
}

impl<S: SignalSource + ?Sized, H: HistorySource + ?Sized> AllocationPass<S, H> {
    /// Score one instrument's history into an allocation candidate.
    pub fn candidate_for(&self, symbol: &str) -> Result<Candidate, AppError> {
        let bars = self.history.load_bars(symbol, self.lookback_bars)?;
        let last_close = bars
            .last()
            .map(|b| b.close)
            .ok_or_else(|| AppError::History {
                symbol: symbol.to_string(),
                msg: "no bars".to_string(),
            })?;
        let rows = self.engine.augment(&bars);
        let metrics = backtest::score(&rows, self.source.as_ref()).map_err(|e| match e {
            AppError::InvalidInstrument { reason, .. } => AppError::invalid_instrument(symbol, reason),
            other => other,
        })?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let trend_pct = self.forecaster.forecast_trend(&closes).map(|t| t * 100.0);

        if let Some(accuracy) = holdout_accuracy(self.source.as_ref(), &label_rows(&rows)) {
            debug!(symbol, accuracy, "holdout accuracy");
        }
        debug!(
            symbol,
            rows = rows.len(),
            total_return_pct = metrics.total_return_pct,
            win_rate_pct = metrics.win_rate_pct,
            cagr_pct = metrics.cagr_pct,
            max_drawdown_pct = metrics.max_drawdown_pct,
            "backtest scored"
        );

        let candidate = Candidate::new(symbol, last_close, metrics.total_return_pct).with_trend(trend_pct);
        candidate.validate()?;
        Ok(candidate)
    }

    /// Score every instrument and allocate capital across the ones that
    /// scored. Failing instruments are logged and left out.
    pub fn run(&self, now_ms: u64) -> Result<AllocationTable, AppError> {
        let mut candidates = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            match self.candidate_for(symbol) {
                Ok(c) => candidates.push(c),
                Err(e) => warn!(symbol = %symbol, error = %e, "instrument skipped by allocation pass"),
            }
        }
        let entries = allocate(&candidates, self.capital)?;
        Ok(AllocationTable::new(entries, now_ms))
    }
}

/// Run one pass on the blocking pool and swap the published snapshot.
pub async fn run_allocation_pass<S, H>(
    pass: &AllocationPass<S, H>,
    snapshot_tx: &watch::Sender<Arc<AllocationTable>>,
    app_tx: &mpsc::Sender<AppEvent>,
) -> Result<Arc<AllocationTable>, AppError>
where
    S: SignalSource + ?Sized + 'static,
    H: HistorySource + ?Sized + 'static,
{
    let now_ms = chrono::Utc::now().timestamp_millis() as u64;
    let pass = pass.clone();
    let table = Arc::new(tokio::task::spawn_blocking(move || pass.run(now_ms)).await??);
    for entry in table.entries() {
        info!(
            rank = entry.rank,
            symbol = %entry.symbol,
            predicted_return_pct = entry.predicted_return_pct,
            allocation = entry.allocation,
            shares = entry.shares,
            "allocation"
        );
    }
    snapshot_tx.send_replace(Arc::clone(&table));
    let _ = app_tx.send(AppEvent::AllocationUpdated(Arc::clone(&table))).await;
    Ok(table)
}

/// Re-run the allocation pass every `refresh` until shutdown. The first
/// pass is expected to have run already.
pub async fn run_allocation_loop<S, H>(
    pass: AllocationPass<S, H>,
    refresh: Duration,
    snapshot_tx: watch::Sender<Arc<AllocationTable>>,
    app_tx: mpsc::Sender<AppEvent>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: SignalSource + ?Sized + 'static,
    H: HistorySource + ?Sized + 'static,
{
    if refresh.is_zero() {
        return;
    }
    let mut ticker = tokio::time::interval(refresh);
    // The immediate first tick duplicates the startup pass.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_allocation_pass(&pass, &snapshot_tx, &app_tx).await {
                    warn!(error = %e, "allocation pass failed, keeping previous snapshot");
                    let _ = app_tx.send(AppEvent::Error(format!("allocation pass failed: {}", e))).await;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
