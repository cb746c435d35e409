use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::error::AppError;

/// One instrument offered to the allocator.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub symbol: String,
    pub last_close: f64,
    /// Backtest total return of the signal source on this instrument, in percent.
    pub predicted_return_pct: f64,
    /// Auxiliary forecast trend in percent; reported, never used for ranking.
    pub trend_pct: Option<f64>,
}

impl Candidate {
    pub fn new(symbol: impl Into<String>, last_close: f64, predicted_return_pct: f64) -> Self {
        Self {
            symbol: symbol.into(),
            last_close,
            predicted_return_pct,
            trend_pct: None,
        }
    }

    pub fn with_trend(mut self, trend_pct: Option<f64>) -> Self {
        self.trend_pct = trend_pct;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !self.last_close.is_finite() || self.last_close <= 0.0 {
            return Err(AppError::invalid_instrument(
                &self.symbol,
                format!("last close {} is not a positive price", self.last_close),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationEntry {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub symbol: String,
    pub last_close: f64,
    pub predicted_return_pct: f64,
    pub trend_pct: Option<f64>,
    pub allocation: f64,
    pub shares: u64,
}

/// Whole shares affordable with `allocation`. At least one share for any
/// positive allocation, none for a zero one.
pub fn share_count(allocation: f64, price: f64) -> u64 {
    if allocation.is_nan() || allocation <= 0.0 {
        return 0;
    }
    let raw = (allocation / price).floor();
    if raw.is_finite() && raw >= 1.0 {
        raw as u64
    } else {
        1
    }
}

fn rank_key(c: &Candidate) -> f64 {
    if c.predicted_return_pct.is_nan() {
        f64::NEG_INFINITY
    } else {
        c.predicted_return_pct
    }
}

/// Rank candidates by predicted return (descending, ties keep input order)
/// and split `capital` equally between them.
pub fn allocate(candidates: &[Candidate], capital: f64) -> Result<Vec<AllocationEntry>, AppError> {
    if !capital.is_finite() || capital < 0.0 {
        return Err(AppError::Config(format!(
            "capital must be a finite non-negative amount, got {}",
            capital
        )));
    }
    for c in candidates {
        c.validate()?;
    }
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| rank_key(b).partial_cmp(&rank_key(a)).unwrap_or(Ordering::Equal));

    let allocation = capital / ranked.len() as f64;
    Ok(ranked
        .into_iter()
        .enumerate()
        .map(|(i, c)| AllocationEntry {
            rank: i + 1,
            symbol: c.symbol.clone(),
            last_close: c.last_close,
            predicted_return_pct: c.predicted_return_pct,
            trend_pct: c.trend_pct,
            allocation,
            shares: share_count(allocation, c.last_close),
        })
        .collect())
}

/// Published allocation snapshot. Replaced wholesale, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationTable {
    entries: Vec<AllocationEntry>,
    #[serde(skip)]
    by_symbol: HashMap<String, usize>,
    pub generated_at_ms: u64,
}

impl AllocationTable {
    pub fn new(entries: Vec<AllocationEntry>, generated_at_ms: u64) -> Self {
        let by_symbol = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.symbol.clone(), i))
            .collect();
        Self {
            entries,
            by_symbol,
            generated_at_ms,
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&AllocationEntry> {
        self.by_symbol.get(symbol).map(|&i| &self.entries[i])
    }

    pub fn allocation_for(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).map(|e| e.allocation)
    }

    pub fn entries(&self) -> &[AllocationEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_allocated(&self) -> f64 {
        self.entries.iter().map(|e| e.allocation).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_count_floors_and_keeps_one() {
        assert_eq!(share_count(5000.0, 50.0), 100);
        assert_eq!(share_count(99.0, 50.0), 1);
        assert_eq!(share_count(10.0, 500.0), 1);
        assert_eq!(share_count(0.0, 50.0), 0);
    }

    #[test]
    fn nan_return_ranks_last() {
        let out = allocate(
            &[Candidate::new("A", 10.0, f64::NAN), Candidate::new("B", 10.0, -3.0)],
            100.0,
        )
        .unwrap();
        assert_eq!(out[0].symbol, "B");
    }
}
