use std::collections::VecDeque;

/// Recompute the running sum from scratch after this many pushes so float
/// error cannot accumulate over long streams.
const RESUM_EVERY: u64 = 4_096;

/// Simple moving average over the last `period` values.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    pushes: u64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be > 0");
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            pushes: 0,
        }
    }

    /// Push a new value, return the current SMA once `period` values are in.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.window.len() == self.period {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
        self.window.push_back(value);
        self.sum += value;
        self.pushes += 1;
        if self.pushes % RESUM_EVERY == 0 {
            self.sum = self.window.iter().sum();
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        self.is_ready().then(|| self.sum / self.period as f64)
    }

    pub fn is_ready(&self) -> bool {
        self.window.len() == self.period
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_after_period_values() {
        let mut sma = Sma::new(3);
        assert_eq!(sma.push(1.0), None);
        assert_eq!(sma.push(2.0), None);
        assert!(!sma.is_ready());
        assert!((sma.push(3.0).unwrap() - 2.0).abs() < f64::EPSILON);
        assert!((sma.push(4.0).unwrap() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn long_stream_matches_naive_mean() {
        let mut sma = Sma::new(50);
        let mut naive: VecDeque<f64> = VecDeque::new();
        for i in 0..20_000u64 {
            let v = 100.0 + (i as f64 * 0.37).sin() * 5.0;
            sma.push(v);
            naive.push_back(v);
            if naive.len() > 50 {
                naive.pop_front();
            }
            if let Some(avg) = sma.value() {
                let expected = naive.iter().sum::<f64>() / naive.len() as f64;
                assert!((avg - expected).abs() < 1e-8, "drift at i={}", i);
            }
        }
    }

    #[test]
    #[should_panic(expected = "SMA period must be > 0")]
    fn zero_period_panics() {
        Sma::new(0);
    }
}
