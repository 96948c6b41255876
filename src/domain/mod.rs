//! Core engine types and logic.

pub mod account;
pub mod bar_buffer;
pub mod broker;
pub mod config;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod pattern;
pub mod plan;
pub mod position;
pub mod signal;
pub mod throttle;
pub mod timeframe;
