//! Computerized Adaptive Testing (CAT) engine built on item response theory.
//!
//! This crate provides:
//! - Response probability and Fisher information for Rasch, 2PL, 3PL and
//!   single-boundary graded items
//! - Maximum-information item selection with optional randomized exposure
//!   control and caller-supplied content policies
//! - Ability estimation by Newton-Raphson maximum likelihood or EAP
//! - Stopping rules on precision, minimum/maximum test length and pool
//!   exhaustion
//! - Final score reports with the per-item history and theta trajectory
//! - Parallel Monte-Carlo simulation of CAT sessions
//!
//! The engine holds no state of its own: every call takes a [`SessionState`]
//! and returns a new one, so sessions can run on any number of threads
//! against a shared, read-only [`ItemPool`].

pub mod utils;

pub mod cat;
pub mod config;
pub mod error;
pub mod estimation;
pub mod item;
pub mod likelihood;
pub mod models;
pub mod report;
pub mod selection;
pub mod simulation;

#[cfg(feature = "python")]
pub mod python;

pub use cat::{
    finalize, initialize_session, process_response, process_response_by_id, run_session,
    select_next_item, should_terminate, termination_reason, ResponseRecord, SessionState,
};
pub use config::{CatSettings, Estimator};
pub use error::{CatError, ConfigurationError, PoolError, Result};
pub use item::{IrtParameters, Item, ItemId, ItemPool};
pub use models::ResponseModel;
pub use report::{FinalReport, ItemSummary, TerminationReason, TrajectoryPoint};
pub use selection::{AllEligible, CategoryQuotas, ContentPolicy, Selection};

/// Python module for irt_cat
#[cfg(feature = "python")]
#[pyo3::pymodule]
fn irt_cat_rs(m: &pyo3::Bound<'_, pyo3::types::PyModule>) -> pyo3::PyResult<()> {
    python::register(m)?;
    Ok(())
}
