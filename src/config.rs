use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::history::DEFAULT_LOOKBACK_BARS;
use crate::predictor::sequence::DEFAULT_TIME_STEPS;
use crate::risk_module::{
    RiskLimits, DEFAULT_MAX_ALLOC_FRACTION, DEFAULT_STOP_LOSS_PCT, DEFAULT_TAKE_PROFIT_PCT,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub trading: TradingConfig,
    pub risk: RiskConfig,
    pub window: WindowConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    pub capital: f64,
    pub tickers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    pub cooldown_secs: u64,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,
    #[serde(default = "default_max_alloc_fraction")]
    pub max_alloc_fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub capacity: usize,
    pub min_history: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Expected `time_steps` of a sequence model; checked against the loaded model.
    #[serde(default = "default_sequence_len")]
    pub sequence_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_lookback_bars")]
    pub lookback_bars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllocationConfig {
    /// Zero runs the allocation pass once at startup only.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub replay_path: Option<PathBuf>,
    #[serde(default)]
    pub pace_ms: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_stop_loss_pct() -> f64 {
    DEFAULT_STOP_LOSS_PCT
}
fn default_take_profit_pct() -> f64 {
    DEFAULT_TAKE_PROFIT_PCT
}
fn default_max_alloc_fraction() -> f64 {
    DEFAULT_MAX_ALLOC_FRACTION
}
fn default_sequence_len() -> usize {
    DEFAULT_TIME_STEPS
}
fn default_history_dir() -> PathBuf {
    PathBuf::from("data/history")
}
fn default_lookback_bars() -> usize {
    DEFAULT_LOOKBACK_BARS
}
fn default_refresh_secs() -> u64 {
    3_600
}
fn default_channel_capacity() -> usize {
    256
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> PathBuf {
    PathBuf::from("autotrader.log")
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: default_history_dir(),
            lookback_bars: default_lookback_bars(),
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            replay_path: None,
            pace_ms: 0,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl TradingConfig {
    /// Upper-cased tickers in config order, blanks and duplicates removed.
    pub fn tradable_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for sym in &self.tickers {
            let s = sym.trim().to_ascii_uppercase();
            if !s.is_empty() && !out.iter().any(|v| v == &s) {
                out.push(s);
            }
        }
        out
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("AUTOTRADER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::load_from_path(&config_path)?;

        if let Ok(raw) = std::env::var("AUTOTRADER_CAPITAL") {
            config.trading.capital = raw
                .trim()
                .parse()
                .with_context(|| format!("AUTOTRADER_CAPITAL '{}' is not a number", raw))?;
            config.validate().context("AUTOTRADER_CAPITAL override is invalid")?;
        }

        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("failed to parse config toml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.trading.capital.is_finite() || self.trading.capital <= 0.0 {
            bail!("trading.capital must be > 0, got {}", self.trading.capital);
        }
        if self.trading.tradable_symbols().is_empty() {
            bail!("trading.tickers must name at least one instrument");
        }
        if self.window.capacity == 0 {
            bail!("window.capacity must be > 0");
        }
        if self.window.min_history == 0 || self.window.min_history > self.window.capacity {
            bail!(
                "window.min_history must be in 1..={}, got {}",
                self.window.capacity,
                self.window.min_history
            );
        }
        if self.model.path.as_os_str().is_empty() {
            bail!("model.path must not be empty");
        }
        for (name, v) in [
            ("risk.stop_loss_pct", self.risk.stop_loss_pct),
            ("risk.take_profit_pct", self.risk.take_profit_pct),
        ] {
            if !v.is_finite() || v <= 0.0 {
                bail!("{} must be > 0, got {}", name, v);
            }
        }
        if !(self.risk.max_alloc_fraction > 0.0 && self.risk.max_alloc_fraction <= 1.0) {
            bail!(
                "risk.max_alloc_fraction must be in (0, 1], got {}",
                self.risk.max_alloc_fraction
            );
        }
        if self.feed.channel_capacity == 0 {
            bail!("feed.channel_capacity must be > 0");
        }
        Ok(())
    }

    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            cooldown_ms: self.risk.cooldown_secs.saturating_mul(1_000),
            stop_loss_pct: self.risk.stop_loss_pct,
            take_profit_pct: self.risk.take_profit_pct,
            max_alloc_fraction: self.risk.max_alloc_fraction,
            capital: self.trading.capital,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[trading]
capital = 10000.0
tickers = ["aapl", "MSFT", "AAPL", " "]

[risk]
cooldown_secs = 3600

[window]
capacity = 250
min_history = 50

[model]
path = "config/model.example.json"
"#;

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.history.lookback_bars, 504);
        assert_eq!(config.allocation.refresh_secs, 3_600);
        assert_eq!(config.feed.channel_capacity, 256);
        assert!(config.feed.replay_path.is_none());
        assert_eq!(config.logging.file, PathBuf::from("autotrader.log"));
        assert_eq!(config.model.sequence_len, 60);
        assert!((config.risk.max_alloc_fraction - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn tradable_symbols_dedup_and_uppercase() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(
            config.trading.tradable_symbols(),
            vec!["AAPL".to_string(), "MSFT".to_string()]
        );
    }

    #[test]
    fn risk_limits_convert_cooldown_to_ms() {
        let limits = Config::from_toml_str(MINIMAL).unwrap().risk_limits();
        assert_eq!(limits.cooldown_ms, 3_600_000);
        assert_eq!(limits.capital, 10_000.0);
    }
}
