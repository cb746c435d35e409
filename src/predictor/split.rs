use crate::model::feature::{FeatureRow, LabeledRow};
use crate::predictor::SignalSource;

/// Share of rows used for training; the remainder is the holdout.
pub const TRAIN_FRACTION: f64 = 0.8;

/// Split an ordered series into (train, holdout) without shuffling.
pub fn chronological_split<T>(items: &[T], train_fraction: f64) -> (&[T], &[T]) {
    let fraction = train_fraction.clamp(0.0, 1.0);
    let cut = ((items.len() as f64) * fraction).floor() as usize;
    items.split_at(cut.min(items.len()))
}

/// Directional accuracy of `source` on the chronological holdout of
/// `labeled`. Holdout rows without enough preceding history for the source
/// are skipped. Returns `None` when nothing could be evaluated.
pub fn holdout_accuracy<S: SignalSource + ?Sized>(source: &S, labeled: &[LabeledRow]) -> Option<f64> {
    let rows: Vec<FeatureRow> = labeled.iter().map(|l| l.row).collect();
    let (train, _) = chronological_split(labeled, TRAIN_FRACTION);
    let lookback = source.lookback().max(1);

    let mut total = 0usize;
    let mut correct = 0usize;
    for (i, item) in labeled.iter().enumerate().skip(train.len()) {
        if i + 1 < lookback {
            continue;
        }
        let Ok(signal) = source.predict(&rows[..=i]) else {
            continue;
        };
        total += 1;
        if signal.is_buy() == item.target {
            correct += 1;
        }
    }
    (total > 0).then(|| correct as f64 / total as f64)
}
