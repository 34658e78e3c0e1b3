// crates/cmdtlm-rs/src/packets/limits.rs

use crate::registry::LimitsResponse;
use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the mandatory limits set.
pub const DEFAULT_LIMITS_SET: &str = "DEFAULT";

/// One red/yellow(/green) band of a limits set.
///
/// Ordering invariant: `red_low <= yellow_low < yellow_high <= red_high` and,
/// when present, `yellow_low <= green_low < green_high <= yellow_high`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitsValues {
    pub red_low: f64,
    pub yellow_low: f64,
    pub yellow_high: f64,
    pub red_high: f64,
    /// Optional operational (green) band as `(green_low, green_high)`.
    pub green: Option<(f64, f64)>,
}

impl LimitsValues {
    pub fn new(red_low: f64, yellow_low: f64, yellow_high: f64, red_high: f64) -> Self {
        Self {
            red_low,
            yellow_low,
            yellow_high,
            red_high,
            green: None,
        }
    }

    pub fn with_green(mut self, green_low: f64, green_high: f64) -> Self {
        self.green = Some((green_low, green_high));
        self
    }

    /// Flat `[red_low, yellow_low, yellow_high, red_high, green_low?, green_high?]` form.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut v = vec![self.red_low, self.yellow_low, self.yellow_high, self.red_high];
        if let Some((gl, gh)) = self.green {
            v.push(gl);
            v.push(gh);
        }
        v
    }

    /// Limits state of `value` within this band.
    pub fn evaluate(&self, value: f64) -> LimitsState {
        if value <= self.yellow_low {
            if value <= self.red_low {
                LimitsState::RedLow
            } else {
                LimitsState::YellowLow
            }
        } else if value >= self.yellow_high {
            if value >= self.red_high {
                LimitsState::RedHigh
            } else {
                LimitsState::YellowHigh
            }
        } else {
            match self.green {
                Some((_, gh)) if value >= gh => LimitsState::GreenHigh,
                Some((gl, _)) if value <= gl => LimitsState::GreenLow,
                Some(_) => LimitsState::Blue,
                None => LimitsState::Green,
            }
        }
    }
}

/// Result of checking a value against its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitsState {
    RedLow,
    YellowLow,
    GreenLow,
    Green,
    GreenHigh,
    YellowHigh,
    RedHigh,
    Blue,
    /// States with colors map directly to these three.
    Red,
    Yellow,
}

impl fmt::Display for LimitsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LimitsState::RedLow => "RED_LOW",
            LimitsState::YellowLow => "YELLOW_LOW",
            LimitsState::GreenLow => "GREEN_LOW",
            LimitsState::Green => "GREEN",
            LimitsState::GreenHigh => "GREEN_HIGH",
            LimitsState::YellowHigh => "YELLOW_HIGH",
            LimitsState::RedHigh => "RED_HIGH",
            LimitsState::Blue => "BLUE",
            LimitsState::Red => "RED",
            LimitsState::Yellow => "YELLOW",
        };
        f.write_str(s)
    }
}

/// Limits attached to a telemetry item.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Limits set name to band. `None` until the DEFAULT set is defined.
    pub values: Option<BTreeMap<String, LimitsValues>>,
    pub enabled: bool,
    /// Consecutive out-of-limits samples required before a state change.
    pub persistence_setting: u32,
    pub persistence_count: u32,
    pub response: Option<Arc<dyn LimitsResponse>>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            values: None,
            enabled: false,
            persistence_setting: 1,
            persistence_count: 0,
            response: None,
        }
    }
}

impl PartialEq for Limits {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
            && self.enabled == other.enabled
            && self.persistence_setting == other.persistence_setting
            && self.response.as_ref().map(|r| r.to_config())
                == other.response.as_ref().map(|r| r.to_config())
    }
}

impl Limits {
    pub fn default_values(&self) -> Option<&LimitsValues> {
        self.values.as_ref().and_then(|v| v.get(DEFAULT_LIMITS_SET))
    }

    /// Limits sets with DEFAULT first, then the others by name.
    pub fn sets(&self) -> Vec<(&str, &LimitsValues)> {
        let Some(values) = &self.values else {
            return Vec::new();
        };
        let mut sets: Vec<(&str, &LimitsValues)> = values
            .iter()
            .filter(|(name, _)| name.as_str() != DEFAULT_LIMITS_SET)
            .map(|(name, v)| (name.as_str(), v))
            .collect();
        if let Some(default) = values.get(DEFAULT_LIMITS_SET) {
            sets.insert(0, (DEFAULT_LIMITS_SET, default));
        }
        sets
    }

    /// Evaluates `value` against `set`, falling back to DEFAULT.
    pub fn evaluate(&self, set: &str, value: f64) -> Option<LimitsState> {
        let values = self.values.as_ref()?;
        values
            .get(set)
            .or_else(|| values.get(DEFAULT_LIMITS_SET))
            .map(|band| band.evaluate(value))
    }
}
