//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::TurntableConfig;

/// Largest accepted steps-per-degree; keeps a full turn within `u32` steps.
pub const MAX_STEPS_PER_DEGREE: u32 = 65_536;

/// Validate a turntable configuration.
///
/// Checks:
/// - Steps per degree is in `1..=MAX_STEPS_PER_DEGREE`
/// - Both pulse phases have a non-zero length
/// - No line number is assigned twice
/// - Button timing is usable (poll interval > 0, long press > poll interval)
pub fn validate_config(config: &TurntableConfig) -> Result<()> {
    if config.steps_per_degree == 0 || config.steps_per_degree > MAX_STEPS_PER_DEGREE {
        return Err(Error::Config(ConfigError::InvalidStepsPerDegree(
            config.steps_per_degree,
        )));
    }

    if config.pulse.high_us == 0 || config.pulse.low_us == 0 {
        return Err(Error::Config(ConfigError::InvalidPulseWidth {
            high_us: config.pulse.high_us,
            low_us: config.pulse.low_us,
        }));
    }

    validate_lines(config)?;

    if let Some(ref buttons) = config.buttons {
        if buttons.poll_interval_ms == 0 {
            return Err(Error::Config(ConfigError::InvalidPollInterval(
                buttons.poll_interval_ms,
            )));
        }

        if buttons.long_press_ms <= buttons.poll_interval_ms {
            return Err(Error::Config(ConfigError::InvalidLongPress {
                threshold_ms: buttons.long_press_ms,
                poll_ms: buttons.poll_interval_ms,
            }));
        }
    }

    Ok(())
}

fn validate_lines(config: &TurntableConfig) -> Result<()> {
    let lines: Vec<_> = config.lines().collect();

    for (i, &(first, line)) in lines.iter().enumerate() {
        if let Some(&(second, _)) = lines[i + 1..].iter().find(|(_, other)| *other == line) {
            return Err(Error::Config(ConfigError::DuplicateLine {
                line,
                first,
                second,
            }));
        }
    }

    Ok(())
}
