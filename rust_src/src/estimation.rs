//! Ability estimation from a response history.
//!
//! Maximum likelihood uses Fisher-scoring Newton-Raphson. Expected a
//! posteriori scoring over a normal-prior grid is available as an
//! alternative and always yields a finite estimate. Either way the standard
//! error is `1 / sqrt(test information)` at the returned theta.

use serde::{Deserialize, Serialize};

use crate::cat::ResponseRecord;
use crate::config::{CatSettings, Estimator};
use crate::likelihood::{log_likelihood_grid, score_and_information};
use crate::models::ResponseModel;
use crate::utils::{clip, compute_eap_with_se, normal_grid, normalize_log_posterior, EPSILON};

/// Largest change in theta allowed in one Newton step.
const MAX_STEP: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityEstimate {
    pub theta: f64,
    pub standard_error: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Posterior standard deviation, set by EAP scoring only.
    pub posterior_sd: Option<f64>,
}

/// Re-estimate theta from the full history, starting from `theta_start`.
pub fn estimate_ability(
    history: &[ResponseRecord],
    theta_start: f64,
    settings: &CatSettings,
) -> AbilityEstimate {
    if history.is_empty() {
        return AbilityEstimate {
            theta: clip(theta_start, settings.theta_min, settings.theta_max),
            standard_error: f64::INFINITY,
            iterations: 0,
            converged: true,
            posterior_sd: None,
        };
    }
    match settings.estimator {
        Estimator::MaximumLikelihood => maximum_likelihood(history, theta_start, settings),
        Estimator::ExpectedAPosteriori => expected_a_posteriori(history, settings),
    }
}

/// Asymptotic standard error `1 / sqrt(total information)`, infinite while
/// the history carries no information.
pub fn standard_error(theta: f64, history: &[ResponseRecord], model: ResponseModel) -> f64 {
    let info: f64 = history
        .iter()
        .map(|r| model.information(theta, &r.irt_parameters))
        .sum();
    if info > EPSILON {
        1.0 / info.sqrt()
    } else {
        f64::INFINITY
    }
}

/// `Some(true)` when every response is correct, `Some(false)` when every
/// response is incorrect.
fn uniform_pattern(history: &[ResponseRecord]) -> Option<bool> {
    let first = history.first()?.is_correct;
    history
        .iter()
        .all(|r| r.is_correct == first)
        .then_some(first)
}

fn maximum_likelihood(
    history: &[ResponseRecord],
    theta_start: f64,
    settings: &CatSettings,
) -> AbilityEstimate {
    let model = settings.model;
    let (lo, hi) = (settings.theta_min, settings.theta_max);

    // No finite maximum exists for a uniform pattern.
    if let Some(all_correct) = uniform_pattern(history) {
        let theta = if all_correct { hi } else { lo };
        return AbilityEstimate {
            theta,
            standard_error: standard_error(theta, history, model),
            iterations: 0,
            converged: false,
            posterior_sd: None,
        };
    }

    let mut theta = clip(theta_start, lo, hi);
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..settings.max_iterations {
        iterations = iter + 1;
        let (score, info) = score_and_information(theta, history, model);
        if info <= EPSILON {
            break;
        }

        let step = clip(score / info, -MAX_STEP, MAX_STEP);
        let next = clip(theta + step, lo, hi);
        tracing::trace!(iteration = iterations, theta = next, score, info, "newton step");

        let delta = (next - theta).abs();
        theta = next;
        // A bound that the score keeps pushing against also ends here, as
        // the clamped step is zero.
        if delta < settings.tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::debug!(theta, iterations, "theta estimate did not converge, keeping last iterate");
    }

    AbilityEstimate {
        theta,
        standard_error: standard_error(theta, history, model),
        iterations,
        converged,
        posterior_sd: None,
    }
}

fn expected_a_posteriori(history: &[ResponseRecord], settings: &CatSettings) -> AbilityEstimate {
    let (nodes, log_prior) = normal_grid(
        settings.quadrature_points,
        settings.theta_min,
        settings.theta_max,
    );
    let log_likes = log_likelihood_grid(&nodes, history, settings.model);

    let log_posterior: Vec<f64> = log_likes
        .iter()
        .zip(log_prior.iter())
        .map(|(&ll, &lp)| ll + lp)
        .collect();

    let posterior = normalize_log_posterior(&log_posterior);
    let (theta, posterior_sd) = compute_eap_with_se(&posterior, &nodes);
    let theta = clip(theta, settings.theta_min, settings.theta_max);

    // Stopping uses test information whichever estimator placed theta.
    AbilityEstimate {
        theta,
        standard_error: standard_error(theta, history, settings.model),
        iterations: 1,
        converged: true,
        posterior_sd: Some(posterior_sd),
    }
}
