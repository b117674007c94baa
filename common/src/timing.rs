//! Interval and hold-duration parsing.
//!
//! Both values share one grammar: `<number>[ms|s|m|h]`. A bare number is read as
//! seconds and an empty string means "not set".

use std::time::Duration;

use crate::error::ChaosError;

/// When a command runs and how long its effect is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Time between ticks; `None` runs the command once.
    pub interval: Option<Duration>,
    /// Hold time before auto-revert. Defaults to `interval` when not given.
    pub duration: Option<Duration>,
}

impl Timing {
    /// Parses and cross-validates the interval and duration strings.
    ///
    /// A duration longer than the interval is rejected here, so the error surfaces
    /// before the first tick is scheduled.
    pub fn parse(interval: &str, duration: &str) -> Result<Self, ChaosError> {
        let interval = parse_interval(interval)?;
        let duration = match parse_value(duration, "duration")? {
            Some(d) => {
                if let Some(i) = interval
                    && d > i
                {
                    return Err(ChaosError::config(format!(
                        "duration {d:?} must not exceed interval {i:?}"
                    )));
                }
                Some(d)
            }
            None => interval,
        };
        Ok(Self { interval, duration })
    }

    /// Hold time for revertible commands. Fails if none could be derived or it is zero.
    pub fn hold(&self) -> Result<Duration, ChaosError> {
        match self.duration {
            Some(d) if d.is_zero() => Err(ChaosError::config("duration must be greater than zero")),
            Some(d) => Ok(d),
            None => Err(ChaosError::config(
                "duration is required when no interval is configured",
            )),
        }
    }
}

/// Parses the recurring interval. Empty input means "run once".
pub fn parse_interval(s: &str) -> Result<Option<Duration>, ChaosError> {
    match parse_value(s, "interval")? {
        Some(d) if d.is_zero() => Err(ChaosError::config("interval must be greater than zero")),
        other => Ok(other),
    }
}

fn parse_value(s: &str, what: &str) -> Result<Option<Duration>, ChaosError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }

    let (number, unit): (&str, Duration) = if let Some(n) = s.strip_suffix("ms") {
        (n, Duration::from_millis(1))
    } else if let Some(n) = s.strip_suffix('s') {
        (n, Duration::from_secs(1))
    } else if let Some(n) = s.strip_suffix('m') {
        (n, Duration::from_secs(60))
    } else if let Some(n) = s.strip_suffix('h') {
        (n, Duration::from_secs(3600))
    } else {
        (s, Duration::from_secs(1))
    };

    let out_of_range = || ChaosError::config(format!("{what} '{s}' is out of range"));

    // whole numbers stay exact; fractions go through f64
    if let Ok(whole) = number.parse::<u32>() {
        return unit.checked_mul(whole).map(Some).ok_or_else(out_of_range);
    }

    let value: f64 = number
        .parse()
        .map_err(|_| ChaosError::config(format!("invalid {what} '{s}'")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ChaosError::config(format!("invalid {what} '{s}'")));
    }

    Duration::try_from_secs_f64(value * unit.as_secs_f64())
        .map(Some)
        .map_err(|_| out_of_range())
}
