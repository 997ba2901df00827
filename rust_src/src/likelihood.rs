//! Log-likelihood of a response history and its derivatives in theta.

use crate::cat::ResponseRecord;
use crate::models::ResponseModel;

/// Log-likelihood of the whole history at `theta`.
pub fn log_likelihood(theta: f64, history: &[ResponseRecord], model: ResponseModel) -> f64 {
    history
        .iter()
        .map(|r| model.log_probability(theta, &r.irt_parameters, r.is_correct))
        .sum()
}

/// First derivative of the log-likelihood and the expected (Fisher)
/// information at `theta`.
///
/// Each item contributes `(u - P) * P' / (P (1 - P))` to the score and
/// `P'^2 / (P (1 - P))` to the information, which reduces to the closed
/// forms of the individual models.
pub fn score_and_information(
    theta: f64,
    history: &[ResponseRecord],
    model: ResponseModel,
) -> (f64, f64) {
    let mut score = 0.0;
    let mut info = 0.0;
    for r in history {
        let p = model.probability(theta, &r.irt_parameters);
        let dp = model.derivative(p, &r.irt_parameters);
        let pq = p * (1.0 - p);
        let u = if r.is_correct { 1.0 } else { 0.0 };
        score += (u - p) * dp / pq;
        info += dp * dp / pq;
    }
    (score, info)
}

/// Log-likelihood of the history at every node of a grid.
pub fn log_likelihood_grid(
    nodes: &[f64],
    history: &[ResponseRecord],
    model: ResponseModel,
) -> Vec<f64> {
    nodes
        .iter()
        .map(|&theta| log_likelihood(theta, history, model))
        .collect()
}
