use std::collections::VecDeque;
use std::sync::Arc;

use crate::indicator::IndicatorEngine;
use crate::model::candle::Candle;
use crate::model::feature::FeatureRow;

pub const DEFAULT_WINDOW_CAPACITY: usize = 250;
pub const DEFAULT_MIN_HISTORY: usize = 50;

/// Bounded FIFO of recent prices for one instrument, oldest first.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    prices: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be > 0");
        Self {
            capacity,
            prices: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a price, evicting (and returning) the oldest one when full.
    pub fn push(&mut self, price: f64) -> Option<f64> {
        let evicted = if self.prices.len() == self.capacity {
            self.prices.pop_front()
        } else {
            None
        };
        self.prices.push_back(price);
        evicted
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.prices.iter().copied()
    }

    /// One flat bar per stored price.
    pub fn candles(&self) -> Vec<Candle> {
        self.prices.iter().map(|&p| Candle::flat(p)).collect()
    }
}

/// Valid feature rows derived from one window snapshot. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    fn from_rows(rows: Vec<FeatureRow>) -> Option<Self> {
        if rows.is_empty() {
            None
        } else {
            Some(Self { rows })
        }
    }

    pub fn latest(&self) -> &FeatureRow {
        // Non-empty by construction.
        &self.rows[self.rows.len() - 1]
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Re-derives features from a rolling window after every observation.
#[derive(Clone)]
pub struct WindowTracker {
    engine: Arc<dyn IndicatorEngine>,
    min_history: usize,
}

impl WindowTracker {
    pub fn new(engine: Arc<dyn IndicatorEngine>, min_history: usize) -> Self {
        Self {
            engine,
            min_history: min_history.max(1),
        }
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Push `price` into `window` and recompute the feature frame.
    ///
    /// Returns `None` while the window holds fewer than `min_history`
    /// prices, or when no row survives the indicator lookback.
    pub fn observe(&self, window: &mut RollingWindow, price: f64) -> Option<FeatureFrame> {
        window.push(price);
        self.derive(window)
    }

    /// Recompute the frame from the current window without mutating it.
    pub fn derive(&self, window: &RollingWindow) -> Option<FeatureFrame> {
        if window.len() < self.min_history {
            return None;
        }
        FeatureFrame::from_rows(self.engine.augment(&window.candles()))
    }
}

impl std::fmt::Debug for WindowTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowTracker")
            .field("min_history", &self.min_history)
            .field("warmup_bars", &self.engine.warmup_bars())
            .finish()
    }
}
