pub mod sequence;
pub mod split;
pub mod tree;
pub mod trend;

use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::model::feature::{matches_feature_contract, FeatureRow, FEATURE_NAMES};
use crate::model::signal::Signal;

pub use sequence::{LstmModel, MinMaxScaler};
pub use split::{chronological_split, holdout_accuracy, TRAIN_FRACTION};
pub use tree::{GradientBoostedModel, RandomForestModel};
pub use trend::TrendForecaster;

/// Anything that maps recent feature history to a direction.
///
/// `history` is chronological; row classifiers look at the last row only,
/// sequence models at the last [`SignalSource::lookback`] rows.
pub trait SignalSource: Send + Sync {
    fn predict(&self, history: &[FeatureRow]) -> Result<Signal, AppError>;

    /// Rows of history required per prediction.
    fn lookback(&self) -> usize {
        1
    }

    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelFile {
    RandomForest {
        #[serde(default)]
        name: Option<String>,
        features: Vec<String>,
        trees: Vec<tree::TreeNodeSpec>,
    },
    GradientBoosted {
        #[serde(default)]
        name: Option<String>,
        features: Vec<String>,
        #[serde(default)]
        base_margin: f64,
        trees: Vec<tree::TreeNodeSpec>,
    },
    Lstm {
        #[serde(default)]
        name: Option<String>,
        features: Vec<String>,
        time_steps: usize,
        scaler: MinMaxScaler,
        layers: Vec<sequence::LstmLayerSpec>,
        head: sequence::DenseHeadSpec,
    },
}

#[derive(Debug, Clone)]
pub enum PredictorKind {
    RandomForest(RandomForestModel),
    GradientBoosted(GradientBoostedModel),
    Lstm(LstmModel),
}

/// A trained classifier loaded from a model file.
#[derive(Debug, Clone)]
pub struct PredictorModel {
    name: String,
    kind: PredictorKind,
}

impl PredictorModel {
    pub fn new(name: impl Into<String>, kind: PredictorKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn kind(&self) -> &PredictorKind {
        &self.kind
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let file: ModelFile = serde_json::from_str(json)?;
        let (features, model) = match file {
            ModelFile::RandomForest {
                name,
                features,
                trees,
            } => (
                features,
                Self::new(
                    name.unwrap_or_else(|| "random-forest".to_string()),
                    PredictorKind::RandomForest(RandomForestModel::new(&trees)?),
                ),
            ),
            ModelFile::GradientBoosted {
                name,
                features,
                base_margin,
                trees,
            } => (
                features,
                Self::new(
                    name.unwrap_or_else(|| "gradient-boosted".to_string()),
                    PredictorKind::GradientBoosted(GradientBoostedModel::new(base_margin, &trees)?),
                ),
            ),
            ModelFile::Lstm {
                name,
                features,
                time_steps,
                scaler,
                layers,
                head,
            } => (
                features,
                Self::new(
                    name.unwrap_or_else(|| "lstm".to_string()),
                    PredictorKind::Lstm(LstmModel::new(time_steps, scaler, layers, head)?),
                ),
            ),
        };
        if !matches_feature_contract(&features) {
            return Err(AppError::Model(format!(
                "feature list {:?} does not match expected {:?}",
                features, FEATURE_NAMES
            )));
        }
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl SignalSource for PredictorModel {
    fn predict(&self, history: &[FeatureRow]) -> Result<Signal, AppError> {
        match &self.kind {
            PredictorKind::RandomForest(m) => last_row(history).map(|row| m.predict_row(row)),
            PredictorKind::GradientBoosted(m) => last_row(history).map(|row| m.predict_row(row)),
            PredictorKind::Lstm(m) => m.predict_sequence(history),
        }
    }

    fn lookback(&self) -> usize {
        match &self.kind {
            PredictorKind::RandomForest(_) | PredictorKind::GradientBoosted(_) => 1,
            PredictorKind::Lstm(m) => m.time_steps(),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn last_row(history: &[FeatureRow]) -> Result<&FeatureRow, AppError> {
    history
        .last()
        .ok_or_else(|| AppError::Model("no feature rows to predict on".to_string()))
}
