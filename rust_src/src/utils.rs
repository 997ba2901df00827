//! Shared numeric helpers.

pub const LOG_2_PI: f64 = 1.8378770664093453;
pub const EPSILON: f64 = 1e-10;

/// Probabilities are kept inside `(PROB_EPSILON, 1 - PROB_EPSILON)` before
/// they enter a logarithm or a division.
pub const PROB_EPSILON: f64 = 1e-6;

#[inline]
pub fn logsumexp(arr: &[f64]) -> f64 {
    if arr.is_empty() {
        return f64::NEG_INFINITY;
    }
    let max_val = arr.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        return max_val;
    }
    let sum: f64 = arr.iter().map(|x| (x - max_val).exp()).sum();
    max_val + sum.ln()
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let exp_x = x.exp();
        exp_x / (1.0 + exp_x)
    }
}

#[inline]
pub fn clip(x: f64, min: f64, max: f64) -> f64 {
    x.max(min).min(max)
}

#[inline]
pub fn clip_probability(p: f64) -> f64 {
    clip(p, PROB_EPSILON, 1.0 - PROB_EPSILON)
}

/// Turn unnormalised log posterior weights into probabilities summing to one.
pub fn normalize_log_posterior(log_posterior: &[f64]) -> Vec<f64> {
    let log_norm = logsumexp(log_posterior);
    if !log_norm.is_finite() {
        let n = log_posterior.len().max(1) as f64;
        return vec![1.0 / n; log_posterior.len()];
    }
    log_posterior
        .iter()
        .map(|&lp| (lp - log_norm).exp())
        .collect()
}

/// Posterior mean and standard deviation over a set of nodes.
pub fn compute_eap_with_se(posterior: &[f64], nodes: &[f64]) -> (f64, f64) {
    let eap: f64 = posterior
        .iter()
        .zip(nodes.iter())
        .map(|(&p, &theta)| p * theta)
        .sum();

    let variance: f64 = posterior
        .iter()
        .zip(nodes.iter())
        .map(|(&p, &theta)| p * (theta - eap).powi(2))
        .sum();

    (eap, variance.max(0.0).sqrt())
}

/// Evenly spaced nodes over `[lower, upper]` with standard normal log weights.
pub fn normal_grid(n: usize, lower: f64, upper: f64) -> (Vec<f64>, Vec<f64>) {
    let n = n.max(2);
    let step = (upper - lower) / (n - 1) as f64;
    let nodes: Vec<f64> = (0..n).map(|i| lower + i as f64 * step).collect();
    let log_weights = nodes
        .iter()
        .map(|&x| -0.5 * x * x - 0.5 * LOG_2_PI)
        .collect();
    (nodes, log_weights)
}
