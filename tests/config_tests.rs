use std::path::Path;

use stock_autotrader::config::Config;

fn with_section(extra: &str, capital: &str, min_history: usize) -> String {
    format!(
        r#"
[trading]
capital = {capital}
tickers = ["AAPL", "MSFT"]

[risk]
cooldown_secs = 60

[window]
capacity = 250
min_history = {min_history}

[model]
path = "model.json"
{extra}
"#
    )
}

#[test]
/// Verifies the shipped config file parses and maps onto risk limits.
fn shipped_default_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.trading.tradable_symbols(), vec!["AAPL", "MSFT"]);
    assert_eq!(config.window.capacity, 250);
    assert_eq!(config.window.min_history, 50);
    assert_eq!(config.logging.level, "info");

    let limits = config.risk_limits();
    assert_eq!(limits.cooldown_ms, 3_600_000);
    assert!((limits.stop_loss_pct - 0.05).abs() < f64::EPSILON);
    assert!((limits.take_profit_pct - 0.10).abs() < f64::EPSILON);
    assert_eq!(limits.capital, 10_000.0);
}

#[test]
/// Verifies explicit optional sections override the defaults.
fn optional_sections_are_honoured() {
    let toml_str = with_section(
        r#"
[feed]
replay_path = "ticks.csv"
pace_ms = 5
channel_capacity = 8

[allocation]
refresh_secs = 0

[logging]
level = "debug"
"#,
        "2500.5",
        10,
    );
    let config = Config::from_toml_str(&toml_str).unwrap();
    assert_eq!(config.trading.capital, 2_500.5);
    assert_eq!(config.feed.pace_ms, 5);
    assert_eq!(config.feed.channel_capacity, 8);
    assert_eq!(config.allocation.refresh_secs, 0);
    assert_eq!(config.logging.level, "debug");
    assert!(config.feed.replay_path.is_some());
}

#[test]
/// Verifies that non-positive capital is rejected at load time.
fn non_positive_capital_is_rejected() {
    assert!(Config::from_toml_str(&with_section("", "0.0", 10)).is_err());
    assert!(Config::from_toml_str(&with_section("", "-5.0", 10)).is_err());
}

#[test]
/// Verifies that min_history must fit inside the window.
fn min_history_above_capacity_is_rejected() {
    assert!(Config::from_toml_str(&with_section("", "1000.0", 251)).is_err());
    assert!(Config::from_toml_str(&with_section("", "1000.0", 0)).is_err());
}

#[test]
/// Verifies that the allocation ceiling fraction is bounded to (0, 1].
fn alloc_fraction_out_of_range_is_rejected() {
    let toml_str = with_section("", "1000.0", 10).replace(
        "cooldown_secs = 60",
        "cooldown_secs = 60\nmax_alloc_fraction = 1.5",
    );
    assert!(Config::from_toml_str(&toml_str).is_err());
}

#[test]
/// Verifies that required sections are enforced.
fn missing_model_section_fails() {
    let toml_str = with_section("", "1000.0", 10).replace("[model]\npath = \"model.json\"", "");
    assert!(Config::from_toml_str(&toml_str).is_err());
}

#[test]
/// Verifies a missing file reports the path.
fn missing_file_mentions_path() {
    let err = Config::load_from_path(Path::new("/nonexistent/autotrader.toml")).unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/autotrader.toml"));
}
