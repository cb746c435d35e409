pub mod backtest;
pub mod broker;
pub mod config;
pub mod decision;
pub mod error;
pub mod event;
pub mod feed;
pub mod history;
pub mod indicator;
pub mod model;
pub mod portfolio;
pub mod predictor;
pub mod risk_module;
pub mod runtime;
pub mod session;
pub mod window;
