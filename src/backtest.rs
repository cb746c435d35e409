//! Replay of a signal source over ordered feature history.
//!
//! Long-or-flat: a BUY at step `i` earns the next close-to-close return, any
//! other answer earns zero. All metrics are reported in percent.

use serde::Serialize;

use crate::error::AppError;
use crate::model::feature::FeatureRow;
use crate::predictor::SignalSource;

/// Trading days per year used to annualise the mean step return.
pub const PERIODS_PER_YEAR: i32 = 252;

/// Symbol placeholder on errors raised before the caller attaches its ticker.
pub const SCORED_HISTORY: &str = "<history>";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BacktestMetrics {
    pub total_return_pct: f64,
    pub win_rate_pct: f64,
    pub cagr_pct: f64,
    pub max_drawdown_pct: f64,
    /// Number of recorded step returns.
    pub steps: usize,
}

impl BacktestMetrics {
    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }

    fn from_returns(returns: &[f64]) -> Self {
        if returns.is_empty() {
            return Self::default();
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        Self {
            total_return_pct: returns.iter().sum::<f64>() * 100.0,
            win_rate_pct: returns.iter().filter(|r| **r > 0.0).count() as f64 / n * 100.0,
            cagr_pct: ((1.0 + mean).powi(PERIODS_PER_YEAR) - 1.0) * 100.0,
            max_drawdown_pct: max_drawdown(returns) * 100.0,
            steps: returns.len(),
        }
    }
}

/// Score `source` over `rows` (chronological).
///
/// Scoring starts at the first row with enough history for the source's
/// lookback. Fewer than two rows yields zeroed metrics.
pub fn score<S: SignalSource + ?Sized>(
    rows: &[FeatureRow],
    source: &S,
) -> Result<BacktestMetrics, AppError> {
    Ok(BacktestMetrics::from_returns(&step_returns(rows, source)?))
}

/// Per-step strategy returns, one per scored pair `(i, i + 1)`.
///
/// Any scored close that is non-positive or not finite fails the whole
/// history with [`AppError::InvalidInstrument`].
pub fn step_returns<S: SignalSource + ?Sized>(
    rows: &[FeatureRow],
    source: &S,
) -> Result<Vec<f64>, AppError> {
    if rows.len() < 2 {
        return Ok(Vec::new());
    }
    let start = source.lookback().max(1) - 1;
    if let Some((i, bad)) = rows
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, r)| !r.close.is_finite() || r.close <= 0.0)
    {
        return Err(AppError::invalid_instrument(
            SCORED_HISTORY,
            format!("close {} at row {} cannot price a return", bad.close, i),
        ));
    }
    let mut returns = Vec::with_capacity(rows.len().saturating_sub(start + 1));
    for i in start..rows.len() - 1 {
        let signal = source.predict(&rows[..=i])?;
        let (now, next) = (rows[i].close, rows[i + 1].close);
        let r = if signal.is_buy() { (next - now) / now } else { 0.0 };
        returns.push(r);
    }
    Ok(returns)
}

/// Worst peak-to-trough of the compounded curve, as a fraction <= 0.
fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r;
        peak = peak.max(equity);
        worst = worst.min(equity / peak - 1.0);
    }
    worst
}
