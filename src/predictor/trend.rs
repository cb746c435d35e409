pub const DEFAULT_FORECAST_PERIODS: usize = 5;

/// Linear trend forecaster over a close series.
///
/// Produces a scalar relative trend for the forecast horizon, not a
/// directional signal, so it only feeds auxiliary scoring.
#[derive(Debug, Clone, Copy)]
pub struct TrendForecaster {
    periods: usize,
}

impl Default for TrendForecaster {
    fn default() -> Self {
        Self::new(DEFAULT_FORECAST_PERIODS)
    }
}

impl TrendForecaster {
    pub fn new(periods: usize) -> Self {
        Self {
            periods: periods.max(1),
        }
    }

    /// Least-squares fit `y = a + b*t` and return
    /// `(y_hat_last - y_hat_first) / y_hat_first` over the next `periods`
    /// points. `None` for fewer than two closes or a zero first forecast.
    pub fn forecast_trend(&self, closes: &[f64]) -> Option<f64> {
        let (intercept, slope) = fit_line(closes)?;
        let n = closes.len() as f64;
        let first = intercept + slope * n;
        let last = intercept + slope * (n + (self.periods - 1) as f64);
        if first == 0.0 || !first.is_finite() {
            return None;
        }
        Some((last - first) / first)
    }

    /// Forecast points for the next `periods` steps.
    pub fn forecast(&self, closes: &[f64]) -> Option<Vec<f64>> {
        let (intercept, slope) = fit_line(closes)?;
        let n = closes.len();
        Some(
            (n..n + self.periods)
                .map(|t| intercept + slope * t as f64)
                .collect(),
        )
    }
}

fn fit_line(ys: &[f64]) -> Option<(f64, f64)> {
    if ys.len() < 2 {
        return None;
    }
    let n = ys.len() as f64;
    let mean_t = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var = 0.0;
    for (t, y) in ys.iter().enumerate() {
        let dt = t as f64 - mean_t;
        cov += dt * (y - mean_y);
        var += dt * dt;
    }
    let slope = cov / var;
    Some((mean_y - slope * mean_t, slope))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_line_has_positive_trend() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let trend = TrendForecaster::new(5).forecast_trend(&closes).unwrap();
        // forecasts 120..=124
        assert!((trend - 4.0 / 120.0).abs() < 1e-9);
    }

    #[test]
    fn flat_series_has_zero_trend() {
        let closes = vec![50.0; 10];
        assert_eq!(TrendForecaster::default().forecast_trend(&closes), Some(0.0));
    }

    #[test]
    fn too_short_series() {
        assert_eq!(TrendForecaster::default().forecast_trend(&[1.0]), None);
        assert_eq!(TrendForecaster::default().forecast(&[]), None);
    }
}
