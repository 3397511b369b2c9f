//! Configuration types for the PERT layout pipeline.

use chrono::NaiveDate;
use pyo3::prelude::*;

use crate::chart::PertError;

/// Configuration for scheduling diagnostics and milestone placement.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct PertConfig {
    /// Verbosity level: 0=silent, 1=warnings, 2=stages, 3=debug.
    #[pyo3(get, set)]
    pub verbosity: u8,
    /// Pixel gap between level columns (added to the largest milestone size)
    #[pyo3(get, set)]
    pub horizontal_spacing: f64,
    /// Pixel gap between rows of a column (added to the largest milestone size)
    #[pyo3(get, set)]
    pub vertical_spacing: f64,
    /// Diameter of a regular milestone
    #[pyo3(get, set)]
    pub milestone_size: f64,
    /// Diameter of a milestone on the critical path (None = same as milestone_size)
    #[pyo3(get, set)]
    pub critical_milestone_size: Option<f64>,
    /// Stroke thickness used to align coordinates on the pixel grid
    #[pyo3(get, set)]
    pub stroke_thickness: f64,
    /// Left edge of the drawing area
    #[pyo3(get, set)]
    pub left: f64,
    /// Top edge of the drawing area
    #[pyo3(get, set)]
    pub top: f64,
    /// Calendar day that corresponds to time 0 of the schedule
    #[pyo3(get, set)]
    pub project_start: Option<NaiveDate>,
}

impl Default for PertConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            horizontal_spacing: 80.0,
            vertical_spacing: 40.0,
            milestone_size: 16.0,
            critical_milestone_size: None,
            stroke_thickness: 1.0,
            left: 0.0,
            top: 0.0,
            project_start: None,
        }
    }
}

impl PertConfig {
    /// Size used for a milestone, honoring the critical path override.
    pub fn size_for(&self, is_critical: bool) -> f64 {
        if is_critical {
            self.critical_milestone_size.unwrap_or(self.milestone_size)
        } else {
            self.milestone_size
        }
    }

    /// Largest milestone size any milestone can get.
    pub fn max_size(&self) -> f64 {
        self.milestone_size
            .max(self.critical_milestone_size.unwrap_or(self.milestone_size))
    }

    /// Reject settings that would produce a degenerate or non-finite grid.
    pub fn validate(&self) -> Result<(), PertError> {
        let checks = [
            ("horizontal_spacing", self.horizontal_spacing),
            ("vertical_spacing", self.vertical_spacing),
            ("milestone_size", self.milestone_size),
            (
                "critical_milestone_size",
                self.critical_milestone_size.unwrap_or(self.milestone_size),
            ),
            ("stroke_thickness", self.stroke_thickness),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(PertError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !self.left.is_finite() || !self.top.is_finite() {
            return Err(PertError::InvalidConfig(format!(
                "drawing origin must be finite, got ({}, {})",
                self.left, self.top
            )));
        }
        Ok(())
    }
}

#[pymethods]
impl PertConfig {
    #[new]
    #[pyo3(signature = (
        verbosity=None,
        horizontal_spacing=None,
        vertical_spacing=None,
        milestone_size=None,
        critical_milestone_size=None,
        stroke_thickness=None,
        left=None,
        top=None,
        project_start=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        verbosity: Option<u8>,
        horizontal_spacing: Option<f64>,
        vertical_spacing: Option<f64>,
        milestone_size: Option<f64>,
        critical_milestone_size: Option<f64>,
        stroke_thickness: Option<f64>,
        left: Option<f64>,
        top: Option<f64>,
        project_start: Option<NaiveDate>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            verbosity: verbosity.unwrap_or(defaults.verbosity),
            horizontal_spacing: horizontal_spacing.unwrap_or(defaults.horizontal_spacing),
            vertical_spacing: vertical_spacing.unwrap_or(defaults.vertical_spacing),
            milestone_size: milestone_size.unwrap_or(defaults.milestone_size),
            critical_milestone_size,
            stroke_thickness: stroke_thickness.unwrap_or(defaults.stroke_thickness),
            left: left.unwrap_or(defaults.left),
            top: top.unwrap_or(defaults.top),
            project_start,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "PertConfig(horizontal_spacing={}, vertical_spacing={}, milestone_size={}, verbosity={})",
            self.horizontal_spacing, self.vertical_spacing, self.milestone_size, self.verbosity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PertConfig::default();
        assert_eq!(config.verbosity, 0);
        assert!((config.horizontal_spacing - 80.0).abs() < 1e-9);
        assert!((config.vertical_spacing - 40.0).abs() < 1e-9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_critical_size_override() {
        let config = PertConfig {
            critical_milestone_size: Some(24.0),
            ..PertConfig::default()
        };
        assert_eq!(config.size_for(true), 24.0);
        assert_eq!(config.size_for(false), 16.0);
        assert_eq!(config.max_size(), 24.0);
    }

    #[test]
    fn test_validate_rejects_negative_spacing() {
        let config = PertConfig {
            vertical_spacing: -1.0,
            ..PertConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PertError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_nan_size() {
        let config = PertConfig {
            critical_milestone_size: Some(f64::NAN),
            ..PertConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
