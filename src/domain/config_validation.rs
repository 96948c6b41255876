//! Configuration validation.
//!
//! Validates every field before an engine is built.

use crate::domain::config::EngineConfig;
use crate::domain::error::EngineError;

fn invalid(section: &str, key: &str, reason: &str) -> EngineError {
    EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_engine_config(config: &EngineConfig) -> Result<(), EngineError> {
    validate_symbol(config)?;
    validate_timeframes(config)?;
    validate_windows(config)?;
    validate_ema_periods(config)?;
    validate_atr(config)?;
    validate_zones(config)?;
    validate_plan(config)?;
    validate_paper(config)?;
    Ok(())
}

fn validate_symbol(config: &EngineConfig) -> Result<(), EngineError> {
    if config.symbol.trim().is_empty() {
        return Err(EngineError::ConfigMissing {
            section: "engine".to_string(),
            key: "symbol".to_string(),
        });
    }
    Ok(())
}

fn validate_timeframes(config: &EngineConfig) -> Result<(), EngineError> {
    if config.main_timeframe_minutes == 0 {
        return Err(invalid(
            "engine",
            "main_timeframe_minutes",
            "main_timeframe_minutes must be positive",
        ));
    }
    if config.signal_timeframe_minutes == 0 {
        return Err(invalid(
            "engine",
            "signal_timeframe_minutes",
            "signal_timeframe_minutes must be positive",
        ));
    }
    if config.higher_timeframe_minutes < config.main_timeframe_minutes
        || config.higher_timeframe_minutes % config.main_timeframe_minutes != 0
    {
        return Err(invalid(
            "engine",
            "higher_timeframe_minutes",
            "higher_timeframe_minutes must be a multiple of main_timeframe_minutes",
        ));
    }
    Ok(())
}

fn validate_windows(config: &EngineConfig) -> Result<(), EngineError> {
    if config.window_size < 3 {
        return Err(invalid("engine", "window_size", "window_size must be at least 3"));
    }
    if config.htf_window_size < 1 {
        return Err(invalid(
            "engine",
            "htf_window_size",
            "htf_window_size must be at least 1",
        ));
    }
    Ok(())
}

fn validate_ema_periods(config: &EngineConfig) -> Result<(), EngineError> {
    if config.ema_fast_period < 1 {
        return Err(invalid(
            "indicators",
            "ema_fast_period",
            "ema_fast_period must be at least 1",
        ));
    }
    if config.ema_slow_period <= config.ema_fast_period {
        return Err(invalid(
            "indicators",
            "ema_slow_period",
            "ema_slow_period must be greater than ema_fast_period",
        ));
    }
    Ok(())
}

fn validate_atr(config: &EngineConfig) -> Result<(), EngineError> {
    if config.atr_period < 1 {
        return Err(invalid("indicators", "atr_period", "atr_period must be at least 1"));
    }
    if config.atr_period + 1 > config.window_size {
        return Err(invalid(
            "indicators",
            "atr_period",
            "atr_period must leave room for one extra bar in window_size",
        ));
    }
    if config.atr_low_ratio.is_nan() || config.atr_low_ratio <= 0.0 {
        return Err(invalid(
            "indicators",
            "atr_low_ratio",
            "atr_low_ratio must be positive",
        ));
    }
    if config.atr_high_ratio.is_nan() || config.atr_high_ratio < config.atr_low_ratio {
        return Err(invalid(
            "indicators",
            "atr_high_ratio",
            "atr_high_ratio must not be below atr_low_ratio",
        ));
    }
    Ok(())
}

fn validate_zones(config: &EngineConfig) -> Result<(), EngineError> {
    if config.zone_count < 1 {
        return Err(invalid("signal", "zone_count", "zone_count must be at least 1"));
    }
    if config.fvg_scan_depth < 3 {
        return Err(invalid(
            "signal",
            "fvg_scan_depth",
            "fvg_scan_depth must be at least 3",
        ));
    }
    if config.ob_scan_depth < 3 {
        return Err(invalid(
            "signal",
            "ob_scan_depth",
            "ob_scan_depth must be at least 3",
        ));
    }
    if config.sweep_lookback < 1 {
        return Err(invalid(
            "signal",
            "sweep_lookback",
            "sweep_lookback must be at least 1",
        ));
    }
    Ok(())
}

fn validate_plan(config: &EngineConfig) -> Result<(), EngineError> {
    if config.reward_multiple.is_nan() || config.reward_multiple <= 0.0 {
        return Err(invalid(
            "signal",
            "reward_multiple",
            "reward_multiple must be positive",
        ));
    }
    if !(0.0..1.0).contains(&config.sl_buffer_fraction) {
        return Err(invalid(
            "signal",
            "sl_buffer_fraction",
            "sl_buffer_fraction must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_paper(config: &EngineConfig) -> Result<(), EngineError> {
    if config.paper_capital.is_nan() || config.paper_capital <= 0.0 {
        return Err(invalid("paper", "capital", "capital must be positive"));
    }
    if config.paper_leverage.is_nan() || config.paper_leverage < 1.0 {
        return Err(invalid("paper", "leverage", "leverage must be at least 1"));
    }
    if !(0.0..1.0).contains(&config.paper_fee_rate) {
        return Err(invalid("paper", "fee_rate", "fee_rate must be between 0 and 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid_key(config: EngineConfig, expected: &str) {
        match validate_engine_config(&config) {
            Err(EngineError::ConfigInvalid { key, .. }) => assert_eq!(key, expected),
            other => panic!("expected ConfigInvalid for {expected}, got {other:?}"),
        }
    }

    #[test]
    fn empty_symbol_is_missing() {
        let config = EngineConfig {
            symbol: "  ".into(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            validate_engine_config(&config),
            Err(EngineError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn higher_timeframe_must_be_multiple() {
        assert_invalid_key(
            EngineConfig {
                higher_timeframe_minutes: 50,
                ..EngineConfig::default()
            },
            "higher_timeframe_minutes",
        );
        assert_invalid_key(
            EngineConfig {
                higher_timeframe_minutes: 5,
                ..EngineConfig::default()
            },
            "higher_timeframe_minutes",
        );
    }

    #[test]
    fn slow_must_exceed_fast() {
        assert_invalid_key(
            EngineConfig {
                ema_fast_period: 50,
                ema_slow_period: 50,
                ..EngineConfig::default()
            },
            "ema_slow_period",
        );
    }

    #[test]
    fn atr_thresholds_ordered() {
        assert_invalid_key(
            EngineConfig {
                atr_low_ratio: 0.02,
                atr_high_ratio: 0.01,
                ..EngineConfig::default()
            },
            "atr_high_ratio",
        );
        assert_invalid_key(
            EngineConfig {
                atr_low_ratio: 0.0,
                ..EngineConfig::default()
            },
            "atr_low_ratio",
        );
    }

    #[test]
    fn zone_count_at_least_one() {
        assert_invalid_key(
            EngineConfig {
                zone_count: 0,
                ..EngineConfig::default()
            },
            "zone_count",
        );
    }

    #[test]
    fn reward_multiple_positive() {
        assert_invalid_key(
            EngineConfig {
                reward_multiple: 0.0,
                ..EngineConfig::default()
            },
            "reward_multiple",
        );
    }

    #[test]
    fn paper_fields_checked() {
        assert_invalid_key(
            EngineConfig {
                paper_capital: 0.0,
                ..EngineConfig::default()
            },
            "capital",
        );
        assert_invalid_key(
            EngineConfig {
                paper_leverage: 0.5,
                ..EngineConfig::default()
            },
            "leverage",
        );
        assert_invalid_key(
            EngineConfig {
                paper_fee_rate: 1.0,
                ..EngineConfig::default()
            },
            "fee_rate",
        );
    }

    #[test]
    fn nan_values_are_rejected() {
        let cases = [
            (
                EngineConfig {
                    atr_low_ratio: f64::NAN,
                    ..EngineConfig::default()
                },
                "atr_low_ratio",
            ),
            (
                EngineConfig {
                    atr_high_ratio: f64::NAN,
                    ..EngineConfig::default()
                },
                "atr_high_ratio",
            ),
            (
                EngineConfig {
                    reward_multiple: f64::NAN,
                    ..EngineConfig::default()
                },
                "reward_multiple",
            ),
            (
                EngineConfig {
                    paper_capital: f64::NAN,
                    ..EngineConfig::default()
                },
                "capital",
            ),
            (
                EngineConfig {
                    paper_leverage: f64::NAN,
                    ..EngineConfig::default()
                },
                "leverage",
            ),
        ];
        for (config, key) in cases {
            assert_invalid_key(config, key);
        }
    }

    #[test]
    fn order_block_scan_needs_three_bars() {
        assert_invalid_key(
            EngineConfig {
                ob_scan_depth: 2,
                ..EngineConfig::default()
            },
            "ob_scan_depth",
        );
    }

    #[test]
    fn window_must_fit_atr() {
        assert_invalid_key(
            EngineConfig {
                window_size: 10,
                atr_period: 14,
                ..EngineConfig::default()
            },
            "atr_period",
        );
    }
}
