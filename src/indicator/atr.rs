use crate::model::candle::Candle;

/// Average true range, seeded with the mean of the first `period` true
/// ranges and Wilder-smoothed afterwards.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed: Vec<f64>,
    current: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "ATR period must be > 0");
        Self {
            period,
            prev_close: None,
            seed: Vec::with_capacity(period),
            current: None,
        }
    }

    pub fn push(&mut self, candle: &Candle) -> Option<f64> {
        let tr = true_range(candle, self.prev_close);
        self.prev_close = Some(candle.close);

        let n = self.period as f64;
        self.current = match self.current {
            Some(prev) => Some((prev * (n - 1.0) + tr) / n),
            None => {
                self.seed.push(tr);
                if self.seed.len() == self.period {
                    Some(self.seed.iter().sum::<f64>() / n)
                } else {
                    None
                }
            }
        };
        self.current
    }
}

fn true_range(candle: &Candle, prev_close: Option<f64>) -> f64 {
    let range = candle.high - candle.low;
    match prev_close {
        Some(pc) => range
            .max((candle.high - pc).abs())
            .max((candle.low - pc).abs()),
        None => range,
    }
}
