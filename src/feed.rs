use std::path::Path;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::error::AppError;
use crate::model::tick::Tick;

/// Read a recorded tick tape: a CSV with header `symbol,price[,timestamp_ms]`.
pub fn read_tick_tape(path: &Path) -> Result<Vec<Tick>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut ticks = Vec::new();
    for record in reader.deserialize::<Tick>() {
        ticks.push(record?);
    }
    Ok(ticks)
}

/// Push `ticks` into the ordered tick channel, optionally paced. Returns the
/// number of ticks sent before the tape ended, the channel closed, or
/// shutdown was signalled.
pub async fn replay_ticks(
    ticks: Vec<Tick>,
    pace: Duration,
    tick_tx: mpsc::Sender<Tick>,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let total = ticks.len();
    let mut sent = 0usize;
    for tick in ticks {
        if *shutdown.borrow() {
            break;
        }
        if tick_tx.send(tick).await.is_err() {
            warn!("tick channel closed, replay stopped");
            break;
        }
        sent += 1;
        if !pace.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(pace) => {}
                _ = shutdown.changed() => {}
            }
        }
    }
    info!(sent, total, "tick replay finished");
    sent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_column_is_optional() {
        let path = std::env::temp_dir().join(format!(
            "autotrader-tape-{}.csv",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::write(&path, "symbol,price\nAAPL,101.5\nMSFT,40\n").unwrap();
        let ticks = read_tick_tape(&path).unwrap();
        assert_eq!(ticks, vec![Tick::new("AAPL", 101.5, 0), Tick::new("MSFT", 40.0, 0)]);
        let _ = std::fs::remove_file(path);
    }
}
