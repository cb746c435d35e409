use super::ema::Ema;

/// Relative strength index with Wilder smoothing of gains and losses.
#[derive(Debug, Clone)]
pub struct Rsi {
    avg_gain: Ema,
    avg_loss: Ema,
    prev: Option<f64>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be > 0");
        Self {
            avg_gain: Ema::wilder(period),
            avg_loss: Ema::wilder(period),
            prev: None,
        }
    }

    pub fn push(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev.replace(close)?;
        let diff = close - prev;
        let gain = self.avg_gain.push(diff.max(0.0));
        let loss = self.avg_loss.push((-diff).max(0.0));
        match (gain, loss) {
            (Some(_), Some(l)) if l == 0.0 => Some(100.0),
            (Some(g), Some(l)) => Some(100.0 - 100.0 / (1.0 + g / l)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_period_differences() {
        let mut rsi = Rsi::new(3);
        assert_eq!(rsi.push(1.0), None);
        assert_eq!(rsi.push(2.0), None);
        assert_eq!(rsi.push(3.0), None);
        assert!(rsi.push(4.0).is_some());
    }

    #[test]
    fn monotonic_rise_saturates_at_100() {
        let mut rsi = Rsi::new(3);
        let mut last = None;
        for p in 1..10 {
            last = rsi.push(p as f64);
        }
        assert_eq!(last, Some(100.0));
    }

    #[test]
    fn flat_prices_are_100_by_convention() {
        let mut rsi = Rsi::new(2);
        let mut last = None;
        for _ in 0..5 {
            last = rsi.push(50.0);
        }
        assert_eq!(last, Some(100.0));
    }
}
