use stock_autotrader::indicator::ema::Ema;
use stock_autotrader::indicator::sma::Sma;
use stock_autotrader::indicator::{label_rows, IndicatorEngine, StandardIndicators};
use stock_autotrader::model::candle::Candle;

fn flat_bars(closes: impl IntoIterator<Item = f64>) -> Vec<Candle> {
    closes.into_iter().map(Candle::flat).collect()
}

#[test]
fn basic_sma() {
    let mut sma = Sma::new(3);
    assert_eq!(sma.push(1.0), None);
    assert_eq!(sma.push(2.0), None);
    assert!(!sma.is_ready());

    let v = sma.push(3.0).unwrap();
    assert!((v - 2.0).abs() < f64::EPSILON);

    let v = sma.push(4.0).unwrap();
    assert!((v - 3.0).abs() < f64::EPSILON);
}

#[test]
fn sma_no_drift_after_many_pushes() {
    let mut sma = Sma::new(10);
    let mut naive_buf: Vec<f64> = Vec::new();

    for i in 0..10_000u64 {
        let val = (i as f64) * 0.1 + 0.01;
        sma.push(val);
        naive_buf.push(val);
        if naive_buf.len() > 10 {
            naive_buf.remove(0);
        }

        if let Some(ring_avg) = sma.value() {
            let naive_avg: f64 = naive_buf.iter().sum::<f64>() / naive_buf.len() as f64;
            assert!(
                (ring_avg - naive_avg).abs() < 1e-8,
                "Drift at i={}: ring={} naive={}",
                i,
                ring_avg,
                naive_avg
            );
        }
    }
}

#[test]
/// Verifies first-value seeding of the span EMA:
/// alpha = 2/(3+1) = 0.5 gives 2 -> 3.5 -> 5.75, reported from the 3rd value.
fn ema_seeds_with_first_value() {
    let mut ema = Ema::new(3);
    assert_eq!(ema.push(2.0), None);
    assert_eq!(ema.push(5.0), None);
    assert!(!ema.is_ready());
    let v = ema.push(8.0).unwrap();
    assert!((v - 5.75).abs() < 1e-12);
    assert!(ema.is_ready());
}

#[test]
#[should_panic(expected = "EMA period must be > 0")]
fn ema_zero_period_panics() {
    Ema::new(0);
}

#[test]
/// Verifies the standard engine's warm-up: SMA-200 governs, so 250 bars
/// produce exactly 51 rows, each closing on the matching bar.
fn standard_engine_drops_incomplete_lookback() {
    let engine = StandardIndicators::default();
    assert_eq!(engine.warmup_bars(), 199);
    let closes: Vec<f64> = (0..250).map(|i| 50.0 + (i % 7) as f64).collect();
    let rows = engine.augment(&flat_bars(closes.iter().copied()));
    assert_eq!(rows.len(), 51);
    assert_eq!(rows[0].close, closes[199]);
    assert_eq!(rows[50].close, closes[249]);
    assert!(rows.iter().all(|r| r.is_finite()));
}

#[test]
/// Verifies that short input yields no rows rather than partial ones.
fn standard_engine_short_input_is_empty() {
    let engine = StandardIndicators::default();
    assert!(engine.augment(&flat_bars((0..199).map(|i| i as f64 + 1.0))).is_empty());
}

#[test]
/// Verifies that a steady uptrend gives the expected indicator ordering:
/// short averages above long ones, positive MACD, RSI pinned at 100.
fn uptrend_feature_shape() {
    let engine = StandardIndicators::default();
    let rows = engine.augment(&flat_bars((0..220).map(|i| 100.0 + i as f64)));
    let last = rows.last().unwrap();
    assert!(last.ema_20 > last.ema_50);
    assert!(last.sma_50 > last.sma_200);
    assert!(last.macd > 0.0);
    assert_eq!(last.rsi, 100.0);
    assert!((last.atr - 1.0).abs() < 1e-6);
}

#[test]
/// Verifies labeling: target is "next close strictly higher" and the last
/// row, which has no successor, is dropped.
fn label_rows_drops_last_row() {
    let engine = StandardIndicators::default();
    let closes: Vec<f64> = (0..203).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
    let rows = engine.augment(&flat_bars(closes));
    assert_eq!(rows.len(), 4);
    let labeled = label_rows(&rows);
    assert_eq!(labeled.len(), 3);
    assert_eq!(labeled[0].target, rows[1].close > rows[0].close);
    assert!(labeled.windows(2).all(|w| w[0].target != w[1].target));
}
