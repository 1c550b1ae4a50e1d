//! Configuration loading and validation tests.

use std::io::Write;

use tempfile::NamedTempFile;
use turntable_motion::config::{load_config, parse_config, validate_config, ButtonConfig};
use turntable_motion::error::{ConfigError, Error};
use turntable_motion::TurntableConfig;

const BENCH_CONFIG: &str = r#"
chip = "gpiochip0"
steps_per_degree = 8

[pulse]
high_us = 400
low_us = 600

[axes.horizontal]
dir_line = 2
step_line = 3

[axes.vertical]
dir_line = 4
step_line = 17
invert_direction = true

[buttons]
horizontal_line = 22
vertical_line = 23
reset_line = 24
poll_interval_ms = 20
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

#[test]
fn test_load_config_from_file() {
    let file = write_config(BENCH_CONFIG);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.chip.as_str(), "gpiochip0");
    assert_eq!(config.resolution().steps_per_degree(), 8);
    assert_eq!(config.pulse.period_us(), 1000);
    assert_eq!(config.axes.vertical.step_line, 17);
    assert!(config.axes.vertical.invert_direction);

    let buttons = config.buttons.unwrap();
    assert_eq!(buttons.poll_interval_ms, 20);
    assert_eq!(buttons.long_press_ms, 3000);
    assert!(!buttons.active_low);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_config(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::Config(ConfigError::IoError(_)))));
}

#[test]
fn test_empty_file_is_reference_config() {
    let file = write_config("");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config, TurntableConfig::default());
    assert_eq!(config.chip.as_str(), "gpiochip4");
    assert_eq!(config.steps_per_degree, 32);
    assert_eq!(config.axes.horizontal.dir_line, 19);
    assert_eq!(config.axes.horizontal.step_line, 26);
    assert_eq!(config.axes.vertical.dir_line, 20);
    assert_eq!(config.axes.vertical.step_line, 21);
    assert!(config.buttons.is_none());
}

#[test]
fn test_duplicate_line_rejected() {
    let toml = r#"
[axes.horizontal]
dir_line = 19
step_line = 26

[buttons]
horizontal_line = 26
vertical_line = 6
reset_line = 13
"#;
    assert_eq!(
        parse_config(toml),
        Err(Error::Config(ConfigError::DuplicateLine {
            line: 26,
            first: "h_step",
            second: "h_button",
        }))
    );
}

#[test]
fn test_button_timing_rejected() {
    let mut config = TurntableConfig {
        buttons: Some(ButtonConfig::new(5, 6, 13)),
        ..TurntableConfig::default()
    };
    assert!(validate_config(&config).is_ok());

    if let Some(buttons) = config.buttons.as_mut() {
        buttons.poll_interval_ms = 0;
    }
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidPollInterval(0)))
    );

    if let Some(buttons) = config.buttons.as_mut() {
        buttons.poll_interval_ms = 50;
        buttons.long_press_ms = 50;
    }
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidLongPress {
            threshold_ms: 50,
            poll_ms: 50,
        }))
    );
}

#[test]
fn test_invalid_values_rejected() {
    for toml in [
        "steps_per_degree = 0",
        "steps_per_degree = 70000",
        "[pulse]\nhigh_us = 0\nlow_us = 800",
    ] {
        assert!(
            matches!(parse_config(toml), Err(Error::Config(_))),
            "accepted: {toml}"
        );
    }
}
