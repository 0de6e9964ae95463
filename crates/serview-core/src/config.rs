use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::{CfaRemapTable, DemosaicChoice};
use crate::consts::{DEFAULT_CACHE_CAPACITY, DEFAULT_PREFETCH_AHEAD};
use crate::error::{Result, SerError};
use crate::io::timestamp::TimestampEpoch;
use crate::quality::FrameSelection;

/// Per-session settings. Every field has a default, so an empty TOML
/// document is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of decoded frames kept in memory.
    pub cache_capacity: usize,
    /// Frames requested ahead of the current one by `Session::prefetch_ahead`.
    pub prefetch_ahead: usize,
    pub demosaic: DemosaicChoice,
    pub timestamp_epoch: TimestampEpoch,
    /// Defaults applied by `Session::stack` and `Session::start_stack`.
    pub stacking: StackingConfig,
    /// Camera overrides for complementary mosaics.
    pub cfa_remap: CfaRemapTable,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            prefetch_ahead: DEFAULT_PREFETCH_AHEAD,
            demosaic: DemosaicChoice::default(),
            timestamp_epoch: TimestampEpoch::default(),
            stacking: StackingConfig::default(),
            cfa_remap: CfaRemapTable::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SerError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(SerError::Config("cache_capacity must be at least 1".into()));
        }
        self.stacking.selection().validate()?;
        self.cfa_remap.validate()
    }
}

/// Lucky-imaging options for session stacks. All off by default, so a stack
/// combines every frame of its range with no contrast stretch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingConfig {
    /// Keep only the sharpest percentage of frames (0, 100].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_percent: Option<f32>,
    /// Reject frames with a Laplacian-variance score below this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    pub auto_stretch: bool,
}

impl StackingConfig {
    pub fn selection(&self) -> FrameSelection {
        FrameSelection {
            best_percent: self.best_percent,
            min_score: self.min_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(SessionConfig::from_toml_str("").unwrap(), SessionConfig::default());
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = SessionConfig::from_toml_str("cache_capacity = 0").unwrap_err();
        assert!(matches!(err, SerError::Config(_)));
    }

    #[test]
    fn stacking_section_parsed() {
        let config = SessionConfig::from_toml_str(
            "[stacking]\nbest_percent = 10.0\nauto_stretch = true\n",
        )
        .unwrap();
        assert_eq!(config.stacking.selection(), FrameSelection::best_percent(10.0));
        assert!(config.stacking.auto_stretch);
    }

    #[test]
    fn bad_percent_rejected() {
        let err = SessionConfig::from_toml_str("[stacking]\nbest_percent = 0.0\n").unwrap_err();
        assert!(matches!(err, SerError::InvalidSelection(_)));
    }
}
