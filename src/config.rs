//! Tracker configuration, loaded from TOML with the reference constants as defaults.
//!
//! ```toml
//! min_blob_area = 800
//! reach_threshold = 30
//!
//! [[colors]]
//! name = "Orange"
//! ranges = [{ lower = { h = 10, s = 100, v = 100 }, upper = { h = 20, s = 255, v = 255 } }]
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core_modules::color_classifier::{ColorSpec, default_colors};
use crate::core_modules::mask_refiner::mask_refiner::RefineSettings;
use crate::error::{Result, TrackerError};

/// Largest accepted `target_margin`. Any margin of half the frame or more already
/// pins targets to the centre.
pub const MAX_TARGET_MARGIN: u32 = u16::MAX as u32;

/// Tunable behaviour of the tracker. Missing keys fall back to `Default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Colors to search for, in priority order. The first color with an accepted
    /// blob wins the frame.
    pub colors: Vec<ColorSpec>,
    /// Side of the smoothing kernel applied to every mask. Must be odd.
    pub blur_kernel: u32,
    pub erode_iterations: u32,
    pub dilate_iterations: u32,
    /// Regions of this many pixels or fewer are treated as noise.
    pub min_blob_area: u32,
    /// Distance kept between a generated target and the frame edges.
    pub target_margin: u32,
    /// Per-axis offset at or below which the object counts as on target.
    pub reach_threshold: u32,
    /// Minimum time between two target replacements, in seconds.
    pub cooldown_secs: f64,
    /// Radius of the drawn target pointer.
    pub target_radius: u32,
    /// Flip frames horizontally before analysis (selfie view).
    pub mirror: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            blur_kernel: 7,
            erode_iterations: 1,
            dilate_iterations: 1,
            min_blob_area: 800,
            target_margin: 50,
            reach_threshold: 30,
            cooldown_secs: 0.8,
            target_radius: 12,
            mirror: false,
        }
    }
}

impl TrackerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.colors.is_empty() {
            return Err(TrackerError::Config("at least one color is required".into()));
        }
        for color in &self.colors {
            if color.ranges.is_empty() {
                return Err(TrackerError::Config(format!(
                    "color {:?} has no ranges",
                    color.name
                )));
            }
            if let Some(range) = color.ranges.iter().find(|r| !r.is_well_formed()) {
                return Err(TrackerError::Config(format!(
                    "color {:?} has a range with lower bound above upper bound: {:?}",
                    color.name, range
                )));
            }
        }
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(TrackerError::Config(format!(
                "blur_kernel must be odd and positive, got {}",
                self.blur_kernel
            )));
        }
        if self.target_margin > MAX_TARGET_MARGIN {
            return Err(TrackerError::Config(format!(
                "target_margin must be at most {MAX_TARGET_MARGIN}, got {}",
                self.target_margin
            )));
        }
        self.cooldown()?;
        Ok(())
    }

    /// The cooldown as a `Duration`. Fails for values that are not positive or
    /// too large to represent.
    pub fn cooldown(&self) -> Result<Duration> {
        let cooldown = Duration::try_from_secs_f64(self.cooldown_secs).map_err(|err| {
            TrackerError::Config(format!(
                "cooldown_secs {} is out of range: {err}",
                self.cooldown_secs
            ))
        })?;
        if cooldown.is_zero() {
            return Err(TrackerError::Config(format!(
                "cooldown_secs must be positive, got {}",
                self.cooldown_secs
            )));
        }
        Ok(cooldown)
    }

    pub fn refine_settings(&self) -> RefineSettings {
        RefineSettings {
            blur_kernel: self.blur_kernel,
            erode_iterations: self.erode_iterations,
            dilate_iterations: self.dilate_iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let config = TrackerConfig::default();
        assert_eq!(config.min_blob_area, 800);
        assert_eq!(config.target_margin, 50);
        assert_eq!(config.reach_threshold, 30);
        assert_eq!(config.cooldown().expect("valid"), Duration::from_millis(800));
        assert_eq!(config.colors.len(), 4);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = TrackerConfig::from_toml_str("reach_threshold = 15\nmirror = true\n")
            .expect("valid config");
        assert_eq!(config.reach_threshold, 15);
        assert!(config.mirror);
        assert_eq!(config.min_blob_area, 800);
        assert_eq!(config.colors, default_colors());
    }

    #[test]
    fn custom_colors_replace_the_table() {
        let toml = r#"
            [[colors]]
            name = "Orange"
            ranges = [{ lower = { h = 10, s = 100, v = 100 }, upper = { h = 20, s = 255, v = 255 } }]
        "#;
        let config = TrackerConfig::from_toml_str(toml).expect("valid config");
        assert_eq!(config.colors.len(), 1);
        assert_eq!(config.colors[0].name, "Orange");
    }

    #[test]
    fn color_without_ranges_is_rejected() {
        let toml = r#"
            [[colors]]
            name = "Nothing"
            ranges = []
        "#;
        assert!(matches!(
            TrackerConfig::from_toml_str(toml),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let toml = r#"
            [[colors]]
            name = "Backwards"
            ranges = [{ lower = { h = 90, s = 0, v = 0 }, upper = { h = 10, s = 255, v = 255 } }]
        "#;
        assert!(matches!(
            TrackerConfig::from_toml_str(toml),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn even_kernel_is_rejected() {
        assert!(matches!(
            TrackerConfig::from_toml_str("blur_kernel = 6"),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn huge_cooldown_is_rejected() {
        assert!(matches!(
            TrackerConfig::from_toml_str("cooldown_secs = 1e30"),
            Err(TrackerError::Config(_))
        ));
        let config = TrackerConfig {
            cooldown_secs: 1e30,
            ..TrackerConfig::default()
        };
        assert!(matches!(config.cooldown(), Err(TrackerError::Config(_))));
    }

    #[test]
    fn non_positive_cooldown_is_rejected() {
        for toml in ["cooldown_secs = 0.0", "cooldown_secs = -1.0", "cooldown_secs = nan"] {
            assert!(
                matches!(TrackerConfig::from_toml_str(toml), Err(TrackerError::Config(_))),
                "{toml} was accepted"
            );
        }
    }

    #[test]
    fn oversized_margin_is_rejected() {
        assert!(matches!(
            TrackerConfig::from_toml_str("target_margin = 3000000000"),
            Err(TrackerError::Config(_))
        ));
        let config = TrackerConfig::from_toml_str("target_margin = 65535").expect("valid config");
        assert_eq!(config.target_margin, MAX_TARGET_MARGIN);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            TrackerConfig::from_toml_str("min_blob_area = \"big\""),
            Err(TrackerError::Toml(_))
        ));
    }
}
