use super::ema::Ema;

/// MACD line: fast EMA minus slow EMA of closes.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        assert!(
            fast_period < slow_period,
            "fast_period must be less than slow_period"
        );
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
        }
    }

    pub fn push(&mut self, close: f64) -> Option<f64> {
        let fast = self.fast.push(close);
        let slow = self.slow.push(close);
        Some(fast? - slow?)
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new(12, 26)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_with_slow_period() {
        let mut macd = Macd::new(2, 4);
        for _ in 0..3 {
            assert_eq!(macd.push(10.0), None);
        }
        assert_eq!(macd.push(10.0), Some(0.0));
    }

    #[test]
    fn positive_in_uptrend() {
        let mut macd = Macd::default();
        let mut last = None;
        for i in 0..60 {
            last = macd.push(100.0 + i as f64);
        }
        assert!(last.unwrap() > 0.0);
    }
}
