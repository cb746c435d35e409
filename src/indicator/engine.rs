use crate::indicator::atr::Atr;
use crate::indicator::ema::Ema;
use crate::indicator::macd::Macd;
use crate::indicator::rsi::Rsi;
use crate::indicator::sma::Sma;
use crate::model::candle::Candle;
use crate::model::feature::{FeatureRow, LabeledRow};

/// Turns an OHLC series into feature rows. Rows whose indicators do not yet
/// have a full lookback are dropped, so the output may be shorter than the
/// input (or empty).
pub trait IndicatorEngine: Send + Sync {
    fn augment(&self, candles: &[Candle]) -> Vec<FeatureRow>;

    /// Bars consumed before the first row can be produced.
    fn warmup_bars(&self) -> usize;
}

/// RSI-14, MACD(12, 26), SMA-50, SMA-200, EMA-20, EMA-50 and ATR-14.
#[derive(Debug, Clone, Copy)]
pub struct StandardIndicators {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub sma_short: usize,
    pub sma_long: usize,
    pub ema_short: usize,
    pub ema_long: usize,
    pub atr_period: usize,
}

impl Default for StandardIndicators {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            sma_short: 50,
            sma_long: 200,
            ema_short: 20,
            ema_long: 50,
            atr_period: 14,
        }
    }
}

impl IndicatorEngine for StandardIndicators {
    fn augment(&self, candles: &[Candle]) -> Vec<FeatureRow> {
        let mut rsi = Rsi::new(self.rsi_period);
        let mut macd = Macd::new(self.macd_fast, self.macd_slow);
        let mut sma_short = Sma::new(self.sma_short);
        let mut sma_long = Sma::new(self.sma_long);
        let mut ema_short = Ema::new(self.ema_short);
        let mut ema_long = Ema::new(self.ema_long);
        let mut atr = Atr::new(self.atr_period);

        let mut rows = Vec::with_capacity(candles.len().saturating_sub(self.warmup_bars()));
        for candle in candles {
            // Every indicator must see every bar, so evaluate all before matching.
            let values = (
                rsi.push(candle.close),
                macd.push(candle.close),
                sma_short.push(candle.close),
                sma_long.push(candle.close),
                ema_short.push(candle.close),
                ema_long.push(candle.close),
                atr.push(candle),
            );
            if let (
                Some(rsi),
                Some(macd),
                Some(sma_50),
                Some(sma_200),
                Some(ema_20),
                Some(ema_50),
                Some(atr),
            ) = values
            {
                let row = FeatureRow {
                    close: candle.close,
                    rsi,
                    macd,
                    sma_50,
                    sma_200,
                    ema_20,
                    ema_50,
                    atr,
                };
                if row.is_finite() {
                    rows.push(row);
                }
            }
        }
        rows
    }

    fn warmup_bars(&self) -> usize {
        [
            self.rsi_period + 1,
            self.macd_slow,
            self.sma_short,
            self.sma_long,
            self.ema_short,
            self.ema_long,
            self.atr_period,
        ]
        .into_iter()
        .max()
        .map_or(0, |longest| longest - 1)
    }
}

/// Attach the next-step direction to every row. The final row has no next
/// close and is dropped.
pub fn label_rows(rows: &[FeatureRow]) -> Vec<LabeledRow> {
    rows.windows(2)
        .map(|pair| LabeledRow {
            row: pair[0],
            target: pair[1].close > pair[0].close,
        })
        .collect()
}
