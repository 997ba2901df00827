//! Error types for the adaptive testing engine.
//!
//! Only malformed input is an error. Numeric trouble during scoring
//! (non-convergence, degenerate response patterns, zero information) is
//! recovered inside the estimator and never surfaces here.

use thiserror::Error;

/// Invalid session settings. Fatal to session creation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("minItems ({min_items}) must not exceed maxItems ({max_items})")]
    ItemBounds { min_items: usize, max_items: usize },

    #[error("maxItems must be at least 1")]
    ZeroMaxItems,

    #[error("thetaMin ({theta_min}) must be below thetaMax ({theta_max})")]
    ThetaBounds { theta_min: f64, theta_max: f64 },

    #[error("thetaStart ({theta_start}) lies outside [{theta_min}, {theta_max}]")]
    ThetaStartOutOfBounds {
        theta_start: f64,
        theta_min: f64,
        theta_max: f64,
    },

    #[error("standardErrorTarget must be positive, got {0}")]
    StandardErrorTarget(f64),

    #[error("exposureWindow must be at least 1")]
    ExposureWindow,

    #[error("quadraturePoints must be at least 2, got {0}")]
    QuadraturePoints(usize),

    #[error("maxIterations must be at least 1 and tolerance positive")]
    Iteration,

    #[error("unknown response model: {0}")]
    UnknownModel(String),

    #[error("failed to parse settings: {0}")]
    Parse(String),
}

/// Invalid item pool contents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolError {
    #[error("duplicate item id: {0}")]
    DuplicateItemId(String),

    #[error("item {id}: invalid {field} ({value})")]
    InvalidParameter {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("{column} has length {len}, expected {expected}")]
    ColumnLength {
        column: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("failed to parse item pool: {0}")]
    Parse(String),
}

/// Top-level error returned by engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("item {0} is not part of the pool")]
    ItemNotInPool(String),

    #[error("item {0} was already administered in this session")]
    AlreadyAdministered(String),

    #[error("session already reached its maximum of {0} items")]
    MaxItemsReached(usize),
}

pub type Result<T> = std::result::Result<T, CatError>;
