use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AppError;
use crate::model::candle::Candle;

/// Roughly two years of daily bars.
pub const DEFAULT_LOOKBACK_BARS: usize = 504;

/// Ordered OHLC history for an instrument, oldest first.
pub trait HistorySource: Send + Sync {
    fn load_bars(&self, symbol: &str, lookback_bars: usize) -> Result<Vec<Candle>, AppError>;
}

/// Reads `<dir>/<SYMBOL>.csv` files with a header row containing at least
/// `open,high,low,close`. Extra columns such as `date` or `volume` are ignored.
#[derive(Debug, Clone)]
pub struct CsvHistorySource {
    dir: PathBuf,
}

impl CsvHistorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }
}

impl HistorySource for CsvHistorySource {
    fn load_bars(&self, symbol: &str, lookback_bars: usize) -> Result<Vec<Candle>, AppError> {
        let path = self.path_for(symbol);
        let bars = read_bars(&path).map_err(|e| AppError::History {
            symbol: symbol.to_string(),
            msg: format!("{}: {}", path.display(), e),
        })?;
        if bars.is_empty() {
            return Err(AppError::History {
                symbol: symbol.to_string(),
                msg: format!("{} holds no usable bars", path.display()),
            });
        }
        let start = bars.len().saturating_sub(lookback_bars.max(1));
        debug!(symbol, bars = bars.len() - start, path = %path.display(), "history loaded");
        Ok(bars[start..].to_vec())
    }
}

fn read_bars(path: &Path) -> Result<Vec<Candle>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut bars = Vec::new();
    for record in reader.deserialize::<Candle>() {
        let bar = record?;
        if bar.is_finite() {
            bars.push(bar);
        }
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "autotrader-history-{}-{}",
            tag,
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn keeps_the_trailing_lookback() {
        let dir = temp_dir("tail");
        std::fs::write(
            dir.join("AAPL.csv"),
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-01,1,2,0.5,1.5,100\n\
             2024-01-02,2,3,1.5,2.5,100\n\
             2024-01-03,3,4,2.5,3.5,100\n",
        )
        .unwrap();
        let bars = CsvHistorySource::new(&dir).load_bars("AAPL", 2).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 2.5);
        assert_eq!(bars[1].close, 3.5);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_is_history_error() {
        let dir = temp_dir("missing");
        let err = CsvHistorySource::new(&dir).load_bars("MSFT", 10).unwrap_err();
        assert!(matches!(err, AppError::History { ref symbol, .. } if symbol == "MSFT"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
