//! Run options: confidence level and its clamping rules.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::KappaError;
use crate::procedure::Warning;

pub const MIN_CONFIDENCE_LEVEL: f64 = 50.0;
pub const MAX_CONFIDENCE_LEVEL: f64 = 99.999;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 95.0;

/// Confidence level in percent, guaranteed to lie in [50, 99.999].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    pub fn new(percent: f64) -> Result<Self, KappaError> {
        if (MIN_CONFIDENCE_LEVEL..=MAX_CONFIDENCE_LEVEL).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(KappaError::InvalidConfidenceLevel(percent))
        }
    }

    /// Clamp `percent` into range, reporting the adjustment as a warning.
    /// NaN cannot be clamped and is rejected.
    pub fn clamped(percent: f64) -> Result<(Self, Option<Warning>), KappaError> {
        if percent.is_nan() {
            return Err(KappaError::InvalidConfidenceLevel(percent));
        }
        if percent < MIN_CONFIDENCE_LEVEL {
            return Ok((
                Self(MIN_CONFIDENCE_LEVEL),
                Some(Warning::ConfidenceLevelRaised { requested: percent }),
            ));
        }
        if percent > MAX_CONFIDENCE_LEVEL {
            return Ok((
                Self(MAX_CONFIDENCE_LEVEL),
                Some(Warning::ConfidenceLevelLowered { requested: percent }),
            ));
        }
        Ok((Self(percent), None))
    }

    pub fn percent(self) -> f64 {
        self.0
    }
}

impl Default for ConfidenceLevel {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE_LEVEL)
    }
}

impl fmt::Display for ConfidenceLevel {
    // 95.0 prints as "95", 99.9 as "99.9".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

/// Options for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleissOptions {
    /// Requested confidence level in percent; clamped to [50, 99.999].
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

impl Default for FleissOptions {
    fn default() -> Self {
        Self {
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }
}

impl FleissOptions {
    pub fn with_confidence_level(mut self, percent: f64) -> Self {
        self.confidence_level = percent;
        self
    }
}

/// Load options from a JSON file. Missing fields take their defaults.
pub fn load_options_from_path(path: impl AsRef<Path>) -> Result<FleissOptions, KappaError> {
    let raw = std::fs::read_to_string(path.as_ref())
        .map_err(|e| KappaError::Config(format!("failed to read options: {e}")))?;
    let options: FleissOptions = serde_json::from_str(&raw)
        .map_err(|e| KappaError::Config(format!("failed to parse options: {e}")))?;
    if !options.confidence_level.is_finite() {
        return Err(KappaError::Config(
            "confidence_level must be a finite number".to_string(),
        ));
    }
    Ok(options)
}
