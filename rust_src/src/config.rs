//! Administration settings, fixed for the lifetime of a session.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::models::ResponseModel;

/// How theta is re-estimated after each response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Estimator {
    /// Newton-Raphson maximum likelihood; SE from test information.
    #[default]
    MaximumLikelihood,
    /// Posterior mean under a standard normal prior; SE from test information.
    ExpectedAPosteriori,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatSettings {
    pub model: ResponseModel,
    pub theta_start: f64,
    pub theta_min: f64,
    pub theta_max: f64,
    pub standard_error_target: f64,
    pub min_items: usize,
    pub max_items: usize,
    pub exposure_control: bool,
    /// Number of top-ranked candidates drawn from when exposure control is on.
    pub exposure_window: usize,
    pub content_balancing: bool,
    pub estimator: Estimator,
    /// Grid size for EAP scoring.
    pub quadrature_points: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for CatSettings {
    fn default() -> Self {
        Self {
            model: ResponseModel::TwoPl,
            theta_start: 0.0,
            theta_min: -4.0,
            theta_max: 4.0,
            standard_error_target: 0.3,
            min_items: 1,
            max_items: 30,
            exposure_control: false,
            exposure_window: 5,
            content_balancing: false,
            estimator: Estimator::MaximumLikelihood,
            quadrature_points: 61,
            max_iterations: 30,
            tolerance: 1e-4,
        }
    }
}

impl CatSettings {
    pub fn with_model(mut self, model: ResponseModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_item_limits(mut self, min_items: usize, max_items: usize) -> Self {
        self.min_items = min_items;
        self.max_items = max_items;
        self
    }

    pub fn with_standard_error_target(mut self, target: f64) -> Self {
        self.standard_error_target = target;
        self
    }

    pub fn with_theta_bounds(mut self, theta_min: f64, theta_max: f64) -> Self {
        self.theta_min = theta_min;
        self.theta_max = theta_max;
        self
    }

    pub fn with_exposure_control(mut self, window: usize) -> Self {
        self.exposure_control = true;
        self.exposure_window = window;
        self
    }

    pub fn with_content_balancing(mut self) -> Self {
        self.content_balancing = true;
        self
    }

    pub fn with_estimator(mut self, estimator: Estimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_items == 0 {
            return Err(ConfigurationError::ZeroMaxItems);
        }
        if self.min_items > self.max_items {
            return Err(ConfigurationError::ItemBounds {
                min_items: self.min_items,
                max_items: self.max_items,
            });
        }
        // Negated comparison also rejects NaN bounds.
        if !(self.theta_min < self.theta_max) {
            return Err(ConfigurationError::ThetaBounds {
                theta_min: self.theta_min,
                theta_max: self.theta_max,
            });
        }
        if !(self.theta_min..=self.theta_max).contains(&self.theta_start) {
            return Err(ConfigurationError::ThetaStartOutOfBounds {
                theta_start: self.theta_start,
                theta_min: self.theta_min,
                theta_max: self.theta_max,
            });
        }
        if !(self.standard_error_target > 0.0) {
            return Err(ConfigurationError::StandardErrorTarget(
                self.standard_error_target,
            ));
        }
        if self.exposure_window == 0 {
            return Err(ConfigurationError::ExposureWindow);
        }
        if self.quadrature_points < 2 {
            return Err(ConfigurationError::QuadraturePoints(self.quadrature_points));
        }
        if self.max_iterations == 0 || !(self.tolerance > 0.0) {
            return Err(ConfigurationError::Iteration);
        }
        Ok(())
    }

    /// Parse TOML settings and validate them.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigurationError> {
        let table: toml::Table =
            toml::from_str(source).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        if let Some(model) = table.get("model") {
            let name = model
                .as_str()
                .ok_or_else(|| ConfigurationError::Parse("model must be a string".into()))?;
            name.parse::<ResponseModel>()?;
        }
        let settings: CatSettings = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigurationError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}
