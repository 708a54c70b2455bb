use crate::error::{FaultlineError, Result};
use crate::registry::Tier;
use std::env;
use strum_macros::{Display, EnumString};

/// How a tier maps the payload's business code onto the HTTP status line.
///
/// The original convention embeds non-200 business codes inside HTTP 200
/// envelopes on most paths, so `Embedded` is the default everywhere;
/// `Real` mirrors the code onto the status line when it is a valid status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum StatusMode {
    /// Keep the status the rule produced (HTTP 200 for envelopes); the
    /// business code travels in the body only.
    #[default]
    Embedded,
    /// Overwrite the HTTP status with the payload's code when that code is
    /// a valid status; otherwise leave the rule's status untouched.
    Real,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Business code used by the built-in catch-all rendering.
    pub default_code: i32,
    pub typed_mode: StatusMode,
    pub status_aware_mode: StatusMode,
    pub catch_all_mode: StatusMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_code: 400,
            typed_mode: StatusMode::Embedded,
            status_aware_mode: StatusMode::Embedded,
            catch_all_mode: StatusMode::Embedded,
        }
    }
}

impl PipelineConfig {
    /// Load overrides from `FAULTLINE_*` environment variables.
    ///
    /// Recognized: `FAULTLINE_DEFAULT_CODE`, `FAULTLINE_TYPED_STATUS_MODE`,
    /// `FAULTLINE_STATUS_AWARE_STATUS_MODE`,
    /// `FAULTLINE_CATCH_ALL_STATUS_MODE` (`embedded` | `real`).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = env::var("FAULTLINE_DEFAULT_CODE") {
            config.default_code = value.parse().map_err(|_| {
                FaultlineError::config(format!("FAULTLINE_DEFAULT_CODE: invalid integer '{value}'"))
            })?;
        }
        config.typed_mode = mode_from_env("FAULTLINE_TYPED_STATUS_MODE", config.typed_mode)?;
        config.status_aware_mode =
            mode_from_env("FAULTLINE_STATUS_AWARE_STATUS_MODE", config.status_aware_mode)?;
        config.catch_all_mode =
            mode_from_env("FAULTLINE_CATCH_ALL_STATUS_MODE", config.catch_all_mode)?;
        Ok(config)
    }

    pub fn mode_for(&self, tier: Tier) -> StatusMode {
        match tier {
            Tier::Typed => self.typed_mode,
            Tier::StatusAware => self.status_aware_mode,
            Tier::CatchAll => self.catch_all_mode,
        }
    }
}

fn mode_from_env(key: &str, fallback: StatusMode) -> Result<StatusMode> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| FaultlineError::config(format!("{key}: unknown status mode '{value}'"))),
        Err(_) => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_convention() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_code, 400);
        assert_eq!(config.mode_for(Tier::Typed), StatusMode::Embedded);
        assert_eq!(config.mode_for(Tier::StatusAware), StatusMode::Embedded);
        assert_eq!(config.mode_for(Tier::CatchAll), StatusMode::Embedded);
    }

    #[test]
    fn test_status_mode_parses_case_insensitive() {
        assert_eq!("real".parse::<StatusMode>().unwrap(), StatusMode::Real);
        assert_eq!("Embedded".parse::<StatusMode>().unwrap(), StatusMode::Embedded);
        assert!("http".parse::<StatusMode>().is_err());
    }
}
