use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::feature::{FeatureRow, FEATURE_COUNT};
use crate::model::signal::Signal;
use crate::predictor::split::{chronological_split, TRAIN_FRACTION};
use crate::predictor::tree::sigmoid;

pub const DEFAULT_TIME_STEPS: usize = 60;

/// Per-feature min-max scaling to [0, 1] with bounds frozen at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: [f64; FEATURE_COUNT],
    pub max: [f64; FEATURE_COUNT],
}

impl MinMaxScaler {
    pub fn fit(rows: &[FeatureRow]) -> Option<Self> {
        let first = rows.first()?.values();
        let mut min = first;
        let mut max = first;
        for row in &rows[1..] {
            for (i, v) in row.values().into_iter().enumerate() {
                min[i] = min[i].min(v);
                max[i] = max[i].max(v);
            }
        }
        Some(Self { min, max })
    }

    /// Fit on the chronological training split only, so the bounds carry no
    /// information from the evaluation period.
    pub fn fit_training(rows: &[FeatureRow]) -> Option<Self> {
        let (train, _) = chronological_split(rows, TRAIN_FRACTION);
        Self::fit(train)
    }

    pub fn transform(&self, row: &FeatureRow) -> [f64; FEATURE_COUNT] {
        let mut out = row.values();
        for (i, v) in out.iter_mut().enumerate() {
            let range = self.max[i] - self.min[i];
            *v = if range > 0.0 {
                (*v - self.min[i]) / range
            } else {
                0.0
            };
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LstmLayerSpec {
    /// `4H x input` rows, gates stacked as input, forget, cell, output.
    pub w_input: Vec<Vec<f64>>,
    /// `4H x H`.
    pub w_recurrent: Vec<Vec<f64>>,
    /// `4H`.
    pub bias: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenseHeadSpec {
    pub weights: Vec<f64>,
    pub bias: f64,
}

#[derive(Debug, Clone)]
struct LstmLayer {
    hidden: usize,
    w_input: Vec<Vec<f64>>,
    w_recurrent: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl LstmLayer {
    fn from_spec(spec: LstmLayerSpec, input: usize, index: usize) -> Result<Self, AppError> {
        let gates = spec.bias.len();
        if gates == 0 || gates % 4 != 0 {
            return Err(AppError::Model(format!(
                "lstm layer {}: bias length {} is not a positive multiple of 4",
                index, gates
            )));
        }
        let hidden = gates / 4;
        let shape_ok = spec.w_input.len() == gates
            && spec.w_input.iter().all(|r| r.len() == input)
            && spec.w_recurrent.len() == gates
            && spec.w_recurrent.iter().all(|r| r.len() == hidden);
        if !shape_ok {
            return Err(AppError::Model(format!(
                "lstm layer {}: weight shapes do not match input={} hidden={}",
                index, input, hidden
            )));
        }
        Ok(Self {
            hidden,
            w_input: spec.w_input,
            w_recurrent: spec.w_recurrent,
            bias: spec.bias,
        })
    }

    fn run(&self, inputs: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let h_n = self.hidden;
        let mut h = vec![0.0; h_n];
        let mut c = vec![0.0; h_n];
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut z = vec![0.0; 4 * h_n];

        for x in inputs {
            for (g, zg) in z.iter_mut().enumerate() {
                *zg = self.bias[g] + dot(&self.w_input[g], x) + dot(&self.w_recurrent[g], &h);
            }
            for j in 0..h_n {
                let i_gate = sigmoid(z[j]);
                let f_gate = sigmoid(z[h_n + j]);
                let g_gate = z[2 * h_n + j].tanh();
                let o_gate = sigmoid(z[3 * h_n + j]);
                c[j] = f_gate * c[j] + i_gate * g_gate;
                h[j] = o_gate * c[j].tanh();
            }
            outputs.push(h.clone());
        }
        outputs
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Stacked LSTM over the last `time_steps` scaled feature rows with a
/// sigmoid output unit.
#[derive(Debug, Clone)]
pub struct LstmModel {
    time_steps: usize,
    scaler: MinMaxScaler,
    layers: Vec<LstmLayer>,
    head: DenseHeadSpec,
}

impl LstmModel {
    pub fn new(
        time_steps: usize,
        scaler: MinMaxScaler,
        layers: Vec<LstmLayerSpec>,
        head: DenseHeadSpec,
    ) -> Result<Self, AppError> {
        if time_steps == 0 {
            return Err(AppError::Model("lstm time_steps must be > 0".to_string()));
        }
        if layers.is_empty() {
            return Err(AppError::Model("lstm has no layers".to_string()));
        }
        let mut input = FEATURE_COUNT;
        let mut built = Vec::with_capacity(layers.len());
        for (index, spec) in layers.into_iter().enumerate() {
            let layer = LstmLayer::from_spec(spec, input, index)?;
            input = layer.hidden;
            built.push(layer);
        }
        if head.weights.len() != input {
            return Err(AppError::Model(format!(
                "dense head expects {} weights, got {}",
                input,
                head.weights.len()
            )));
        }
        Ok(Self {
            time_steps,
            scaler,
            layers: built,
            head,
        })
    }

    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    /// P(up) from the trailing `time_steps` rows of `history`.
    pub fn probability(&self, history: &[FeatureRow]) -> Result<f64, AppError> {
        if history.len() < self.time_steps {
            return Err(AppError::Model(format!(
                "lstm needs {} rows, have {}",
                self.time_steps,
                history.len()
            )));
        }
        let recent = &history[history.len() - self.time_steps..];
        let mut seq: Vec<Vec<f64>> = recent
            .iter()
            .map(|row| self.scaler.transform(row).to_vec())
            .collect();
        for layer in &self.layers {
            seq = layer.run(&seq);
        }
        let last = seq.last().map(Vec::as_slice).unwrap_or(&[]);
        Ok(sigmoid(dot(&self.head.weights, last) + self.head.bias))
    }

    pub fn predict_sequence(&self, history: &[FeatureRow]) -> Result<Signal, AppError> {
        Ok(Signal::from_up(self.probability(history)? > 0.5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(v: f64) -> FeatureRow {
        FeatureRow {
            close: v,
            rsi: v,
            macd: v,
            sma_50: v,
            sma_200: v,
            ema_20: v,
            ema_50: v,
            atr: v,
        }
    }

    #[test]
    fn scaler_maps_into_unit_range() {
        let scaler = MinMaxScaler::fit(&[row(10.0), row(20.0)]).unwrap();
        let x = scaler.transform(&row(15.0));
        assert!(x.iter().all(|v| (v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn constant_feature_scales_to_zero() {
        let scaler = MinMaxScaler::fit(&[row(3.0), row(3.0)]).unwrap();
        assert!(scaler.transform(&row(3.0)).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn training_fit_ignores_holdout_tail() {
        let rows: Vec<FeatureRow> = (0..10).map(|i| row(i as f64)).collect();
        let scaler = MinMaxScaler::fit_training(&rows).unwrap();
        // 80% of 10 rows -> values 0..=7
        assert_eq!(scaler.max[0], 7.0);
    }
}
