//! Monte-Carlo simulation of adaptive sessions.
//!
//! Responses are drawn from the configured model at a known true ability,
//! which makes it possible to study bias, precision and test length of a
//! pool/settings combination before it is used on real examinees.

use ndarray::Array1;
use rand::prelude::*;
use rand_distr::{Normal, NormalError};
use rand_pcg::Pcg64;
use rayon::prelude::*;

use crate::cat::run_session;
use crate::config::CatSettings;
use crate::error::Result;
use crate::item::ItemPool;
use crate::report::FinalReport;
use crate::selection::AllEligible;

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub theta_est: Array1<f64>,
    pub se_est: Array1<f64>,
    pub n_items: Array1<usize>,
    pub true_theta: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct ConditionalMse {
    pub theta: Array1<f64>,
    pub bias: Array1<f64>,
    pub mse: Array1<f64>,
    pub avg_items: Array1<f64>,
}

/// Run one session for an examinee with the given true ability.
pub fn simulate_session(
    true_theta: f64,
    pool: &ItemPool,
    settings: &CatSettings,
    seed: u64,
) -> Result<FinalReport> {
    let mut rng = Pcg64::seed_from_u64(seed);
    let model = settings.model;
    run_session(pool, settings, &AllEligible, &mut rng, |item, rng| {
        rng.random::<f64>() < model.probability(true_theta, &item.irt_parameters)
    })
}

/// Replicate sessions for every true theta in parallel.
pub fn simulate_batch(
    true_thetas: &[f64],
    pool: &ItemPool,
    settings: &CatSettings,
    n_replications: usize,
    seed: u64,
) -> Result<BatchResult> {
    settings.validate()?;
    let n_total = true_thetas.len() * n_replications;
    tracing::info!(
        n_thetas = true_thetas.len(),
        n_replications,
        seed,
        "running CAT simulation batch"
    );

    let tasks: Vec<(usize, usize)> = (0..true_thetas.len())
        .flat_map(|t| (0..n_replications).map(move |r| (t, r)))
        .collect();

    let results: Vec<(f64, f64, usize, f64)> = tasks
        .par_iter()
        .map(|&(theta_idx, rep)| -> Result<(f64, f64, usize, f64)> {
            let task_seed = seed
                .wrapping_add(theta_idx as u64 * 1000)
                .wrapping_add(rep as u64);
            let true_theta = true_thetas[theta_idx];
            let report = simulate_session(true_theta, pool, settings, task_seed)?;
            Ok((
                report.final_theta,
                report.final_standard_error,
                report.items_administered,
                true_theta,
            ))
        })
        .collect::<Result<_>>()?;

    let mut theta_est = Array1::zeros(n_total);
    let mut se_est = Array1::zeros(n_total);
    let mut n_items = Array1::zeros(n_total);
    let mut true_theta = Array1::zeros(n_total);

    for (i, (t, s, n, tt)) in results.into_iter().enumerate() {
        theta_est[i] = t;
        se_est[i] = s;
        n_items[i] = n;
        true_theta[i] = tt;
    }

    Ok(BatchResult {
        theta_est,
        se_est,
        n_items,
        true_theta,
    })
}

/// Bias, mean squared error and average test length at each theta.
pub fn conditional_mse(
    eval_thetas: &[f64],
    pool: &ItemPool,
    settings: &CatSettings,
    n_replications: usize,
    seed: u64,
) -> Result<ConditionalMse> {
    settings.validate()?;
    let n_reps = n_replications.max(1);

    let stats: Vec<(f64, f64, f64)> = eval_thetas
        .par_iter()
        .enumerate()
        .map(|(t_idx, &true_theta)| -> Result<(f64, f64, f64)> {
            let mut estimates = Vec::with_capacity(n_reps);
            let mut n_items_sum = 0.0;

            for rep in 0..n_reps {
                let task_seed = seed
                    .wrapping_add(t_idx as u64 * 10000)
                    .wrapping_add(rep as u64);
                let report = simulate_session(true_theta, pool, settings, task_seed)?;
                estimates.push(report.final_theta);
                n_items_sum += report.items_administered as f64;
            }

            let mean_est: f64 = estimates.iter().sum::<f64>() / n_reps as f64;
            let bias = mean_est - true_theta;
            let mse: f64 = estimates
                .iter()
                .map(|&e| (e - true_theta).powi(2))
                .sum::<f64>()
                / n_reps as f64;
            Ok((bias, mse, n_items_sum / n_reps as f64))
        })
        .collect::<Result<_>>()?;

    let mut bias = Array1::zeros(eval_thetas.len());
    let mut mse = Array1::zeros(eval_thetas.len());
    let mut avg_items = Array1::zeros(eval_thetas.len());

    for (i, (b, m, a)) in stats.into_iter().enumerate() {
        bias[i] = b;
        mse[i] = m;
        avg_items[i] = a;
    }

    Ok(ConditionalMse {
        theta: Array1::from_vec(eval_thetas.to_vec()),
        bias,
        mse,
        avg_items,
    })
}

/// Average standard error after `n` items (`n = 1..=max_items`) across
/// replicated sessions at one true theta. Entry `n - 1` averages over the
/// sessions that reached `n` items, and is NaN if none did.
pub fn mean_standard_error_curve(
    true_theta: f64,
    pool: &ItemPool,
    settings: &CatSettings,
    n_replications: usize,
    seed: u64,
) -> Result<Array1<f64>> {
    settings.validate()?;
    let max_items = settings.max_items;

    let reports: Vec<FinalReport> = (0..n_replications)
        .into_par_iter()
        .map(|rep| simulate_session(true_theta, pool, settings, seed.wrapping_add(rep as u64)))
        .collect::<Result<_>>()?;

    let mut sums = vec![0.0; max_items];
    let mut counts = vec![0usize; max_items];
    for report in &reports {
        for point in report.trajectory.iter().skip(1) {
            let n = point.item_count - 1;
            sums[n] += point.standard_error;
            counts[n] += 1;
        }
    }

    Ok(sums
        .iter()
        .zip(counts.iter())
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { f64::NAN })
        .collect())
}

/// Draw true abilities from `N(mean, sd)`.
pub fn sample_abilities(
    n: usize,
    mean: f64,
    sd: f64,
    seed: u64,
) -> std::result::Result<Array1<f64>, NormalError> {
    let normal = Normal::new(mean, sd)?;
    let mut rng = Pcg64::seed_from_u64(seed);
    Ok((0..n).map(|_| normal.sample(&mut rng)).collect())
}
