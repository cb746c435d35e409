use serde::{Deserialize, Serialize};

/// Number of named indicators in the classifier input contract.
pub const FEATURE_COUNT: usize = 7;

/// Feature-name contract shared by every trained classifier. Order matters:
/// `FeatureRow::values` is laid out in exactly this order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["RSI", "MACD", "SMA_50", "SMA_200", "EMA_20", "EMA_50", "ATR"];

/// Indicator vector for one time step together with the close it was
/// derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub close: f64,
    pub rsi: f64,
    pub macd: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub ema_20: f64,
    pub ema_50: f64,
    pub atr: f64,
}

impl FeatureRow {
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.rsi,
            self.macd,
            self.sma_50,
            self.sma_200,
            self.ema_20,
            self.ema_50,
            self.atr,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.close.is_finite() && self.values().iter().all(|v| v.is_finite())
    }
}

/// Feature row with its forward-looking up/down target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledRow {
    pub row: FeatureRow,
    /// `true` when the next close is strictly above this close.
    pub target: bool,
}

/// Check a model's declared feature list against [`FEATURE_NAMES`].
pub fn matches_feature_contract<S: AsRef<str>>(declared: &[S]) -> bool {
    declared.len() == FEATURE_COUNT
        && declared
            .iter()
            .zip(FEATURE_NAMES.iter())
            .all(|(d, expected)| d.as_ref() == *expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_requires_exact_order() {
        assert!(matches_feature_contract(&FEATURE_NAMES));
        let mut swapped = FEATURE_NAMES;
        swapped.swap(0, 1);
        assert!(!matches_feature_contract(&swapped));
        assert!(!matches_feature_contract(&FEATURE_NAMES[..6]));
    }
}
