/// Exponential moving average with a configurable smoothing factor.
///
/// Seeded with the first observation (no SMA warm-up) and reported only once
/// `min_periods` values have been seen, which mirrors the usual
/// `ewm(adjust=False, min_periods=n)` convention of charting libraries.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    min_periods: usize,
    seen: usize,
    current: Option<f64>,
}

impl Ema {
    /// Span-style EMA: `alpha = 2 / (period + 1)`.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be > 0");
        Self::with_alpha(2.0 / (period as f64 + 1.0), period)
    }

    /// Wilder smoothing: `alpha = 1 / period`.
    pub fn wilder(period: usize) -> Self {
        assert!(period > 0, "EMA period must be > 0");
        Self::with_alpha(1.0 / period as f64, period)
    }

    pub fn with_alpha(alpha: f64, min_periods: usize) -> Self {
        Self {
            alpha,
            min_periods: min_periods.max(1),
            seen: 0,
            current: None,
        }
    }

    pub fn push(&mut self, value: f64) -> Option<f64> {
        let next = match self.current {
            Some(prev) => prev + self.alpha * (value - prev),
            None => value,
        };
        self.current = Some(next);
        self.seen += 1;
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.is_ready() {
            self.current
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.seen >= self.min_periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_after_min_periods() {
        let mut ema = Ema::new(3);
        assert_eq!(ema.push(10.0), None);
        assert_eq!(ema.push(10.0), None);
        assert!((ema.push(10.0).unwrap() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn span_smoothing() {
        // alpha = 0.5 for period 3
        let mut ema = Ema::new(3);
        ema.push(0.0);
        ema.push(8.0); // 4
        let v = ema.push(8.0).unwrap(); // 6
        assert!((v - 6.0).abs() < 1e-12);
    }

    #[test]
    fn wilder_uses_reciprocal_period() {
        let mut ema = Ema::wilder(2);
        ema.push(0.0);
        let v = ema.push(10.0).unwrap();
        assert!((v - 5.0).abs() < 1e-12);
    }
}
