use serde::Deserialize;

use crate::error::AppError;
use crate::model::feature::{FeatureRow, FEATURE_COUNT, FEATURE_NAMES};
use crate::model::signal::Signal;

/// Tree node as stored in a model file. Splits send `x <= threshold` left.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNodeSpec {
    Split {
        feature: String,
        threshold: f64,
        left: Box<TreeNodeSpec>,
        right: Box<TreeNodeSpec>,
    },
    Leaf {
        value: f64,
    },
}

/// Tree with feature names resolved to positions in [`FEATURE_NAMES`].
#[derive(Debug, Clone)]
pub enum DecisionTree {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<DecisionTree>,
        right: Box<DecisionTree>,
    },
    Leaf(f64),
}

impl DecisionTree {
    pub fn compile(spec: &TreeNodeSpec) -> Result<Self, AppError> {
        match spec {
            TreeNodeSpec::Leaf { value } => {
                if !value.is_finite() {
                    return Err(AppError::Model(format!("non-finite leaf value {}", value)));
                }
                Ok(DecisionTree::Leaf(*value))
            }
            TreeNodeSpec::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let idx = FEATURE_NAMES
                    .iter()
                    .position(|name| name == feature)
                    .ok_or_else(|| AppError::Model(format!("unknown split feature '{}'", feature)))?;
                Ok(DecisionTree::Split {
                    feature: idx,
                    threshold: *threshold,
                    left: Box::new(Self::compile(left)?),
                    right: Box::new(Self::compile(right)?),
                })
            }
        }
    }

    pub fn eval(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = self;
        loop {
            match node {
                DecisionTree::Leaf(value) => return *value,
                DecisionTree::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }
}

fn compile_all(specs: &[TreeNodeSpec]) -> Result<Vec<DecisionTree>, AppError> {
    if specs.is_empty() {
        return Err(AppError::Model("ensemble has no trees".to_string()));
    }
    specs.iter().map(DecisionTree::compile).collect()
}

/// Bagged ensemble; each leaf stores P(up) and the forest averages them.
#[derive(Debug, Clone)]
pub struct RandomForestModel {
    trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    pub fn new(specs: &[TreeNodeSpec]) -> Result<Self, AppError> {
        Ok(Self {
            trees: compile_all(specs)?,
        })
    }

    pub fn probability(&self, row: &FeatureRow) -> f64 {
        let x = row.values();
        self.trees.iter().map(|t| t.eval(&x)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict_row(&self, row: &FeatureRow) -> Signal {
        Signal::from_up(self.probability(row) > 0.5)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

/// Additive ensemble; leaves store log-odds margins.
#[derive(Debug, Clone)]
pub struct GradientBoostedModel {
    base_margin: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoostedModel {
    pub fn new(base_margin: f64, specs: &[TreeNodeSpec]) -> Result<Self, AppError> {
        Ok(Self {
            base_margin,
            trees: compile_all(specs)?,
        })
    }

    pub fn probability(&self, row: &FeatureRow) -> f64 {
        let x = row.values();
        let margin = self.base_margin + self.trees.iter().map(|t| t.eval(&x)).sum::<f64>();
        sigmoid(margin)
    }

    pub fn predict_row(&self, row: &FeatureRow) -> Signal {
        Signal::from_up(self.probability(row) > 0.5)
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
