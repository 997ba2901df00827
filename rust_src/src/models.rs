//! Dichotomous response models and their Fisher information.
//!
//! The graded model is collapsed to a single ordered boundary: a polytomous
//! item is scored as "at or above the cut" versus "below", with the item's
//! difficulty as the cut point, which reduces it to the 2PL curve. Multiple
//! category boundaries are not modelled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::item::IrtParameters;
use crate::utils::{clip_probability, sigmoid};

/// Serialized by [`ResponseModel::name`]; deserialized through [`FromStr`],
/// so every spelling `parse` accepts is also accepted in settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ResponseModel {
    /// 1PL: discrimination fixed at 1, guessing ignored.
    #[serde(rename = "rasch")]
    Rasch,
    #[default]
    #[serde(rename = "twoPL")]
    TwoPl,
    #[serde(rename = "threePL")]
    ThreePl,
    /// Single-boundary dichotomization of a graded item; same curve as 2PL.
    #[serde(rename = "graded")]
    Graded,
}

impl ResponseModel {
    pub const ALL: [ResponseModel; 4] = [
        ResponseModel::Rasch,
        ResponseModel::TwoPl,
        ResponseModel::ThreePl,
        ResponseModel::Graded,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResponseModel::Rasch => "rasch",
            ResponseModel::TwoPl => "twoPL",
            ResponseModel::ThreePl => "threePL",
            ResponseModel::Graded => "graded",
        }
    }

    /// Discrimination actually used by this model.
    #[inline]
    fn slope(&self, params: &IrtParameters) -> f64 {
        match self {
            ResponseModel::Rasch => 1.0,
            _ => params.discrimination,
        }
    }

    /// Lower asymptote actually used by this model.
    #[inline]
    fn floor(&self, params: &IrtParameters) -> f64 {
        match self {
            ResponseModel::ThreePl => params.guessing,
            _ => 0.0,
        }
    }

    /// `P(correct | theta)`, clipped into `(1e-6, 1 - 1e-6)`.
    #[inline]
    pub fn probability(&self, theta: f64, params: &IrtParameters) -> f64 {
        let a = self.slope(params);
        let c = self.floor(params);
        let p = sigmoid(a * (theta - params.difficulty));
        clip_probability(c + (1.0 - c) * p)
    }

    /// `dP/dtheta` expressed through the clipped probability `p`.
    #[inline]
    pub fn derivative(&self, p: f64, params: &IrtParameters) -> f64 {
        let a = self.slope(params);
        let c = self.floor(params);
        a * (p - c) * (1.0 - p) / (1.0 - c)
    }

    /// Fisher information of one item at `theta`. Never negative.
    #[inline]
    pub fn information(&self, theta: f64, params: &IrtParameters) -> f64 {
        let a = self.slope(params);
        let p = self.probability(theta, params);
        match self {
            ResponseModel::ThreePl => {
                let c = params.guessing;
                let ratio = ((p - c) / (1.0 - c)).max(0.0);
                a * a * ((1.0 - p) / p) * ratio * ratio
            }
            _ => a * a * p * (1.0 - p),
        }
    }

    /// Log probability of the observed response.
    #[inline]
    pub fn log_probability(&self, theta: f64, params: &IrtParameters, correct: bool) -> f64 {
        let p = self.probability(theta, params);
        if correct {
            p.ln()
        } else {
            (1.0 - p).ln()
        }
    }
}

impl fmt::Display for ResponseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResponseModel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rasch" | "1pl" => Ok(ResponseModel::Rasch),
            "twopl" | "2pl" => Ok(ResponseModel::TwoPl),
            "threepl" | "3pl" => Ok(ResponseModel::ThreePl),
            "graded" | "grm" => Ok(ResponseModel::Graded),
            _ => Err(ConfigurationError::UnknownModel(s.to_string())),
        }
    }
}

impl TryFrom<String> for ResponseModel {
    type Error = ConfigurationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Information of every item at `theta`.
pub fn item_information(theta: f64, items: &[IrtParameters], model: ResponseModel) -> Vec<f64> {
    items.iter().map(|p| model.information(theta, p)).collect()
}
