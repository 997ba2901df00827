//! Python bindings for the CAT engine.

use ndarray::Array1;
use numpy::{PyArray1, PyReadonlyArray1, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::CatSettings;
use crate::error::CatError;
use crate::item::{IrtParameters, Item, ItemPool};
use crate::models::ResponseModel;
use crate::selection::same_information;
use crate::simulation;

fn to_py_err(err: CatError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_model(model: &str) -> PyResult<ResponseModel> {
    model
        .parse::<ResponseModel>()
        .map_err(|e| to_py_err(e.into()))
}

fn check_len(name: &str, len: usize, expected: usize) -> PyResult<()> {
    if len != expected {
        return Err(PyValueError::new_err(format!(
            "{name} has length {len}, expected {expected}"
        )));
    }
    Ok(())
}

fn item_parameters(
    discrimination: &[f64],
    difficulty: &[f64],
    guessing: Option<&[f64]>,
) -> PyResult<Vec<IrtParameters>> {
    IrtParameters::from_columns(discrimination, difficulty, guessing)
        .map_err(|e| to_py_err(e.into()))
}

fn build_pool(params: Vec<IrtParameters>) -> PyResult<ItemPool> {
    let items = params
        .into_iter()
        .enumerate()
        .map(|(j, p)| Item::new(format!("{j:06}"), p))
        .collect();
    ItemPool::new(items).map_err(|e| to_py_err(e.into()))
}

/// Compute Fisher information for all items at a given theta
#[pyfunction]
#[pyo3(signature = (theta, discrimination, difficulty, guessing=None, model="twoPL"))]
pub fn cat_compute_item_info<'py>(
    py: Python<'py>,
    theta: f64,
    discrimination: PyReadonlyArray1<f64>,
    difficulty: PyReadonlyArray1<f64>,
    guessing: Option<PyReadonlyArray1<f64>>,
    model: &str,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let model = parse_model(model)?;
    let disc = discrimination.as_array().to_vec();
    let diff = difficulty.as_array().to_vec();
    let guess = guessing.map(|g| g.as_array().to_vec());
    let params = item_parameters(&disc, &diff, guess.as_deref())?;
    let info = crate::models::item_information(theta, &params, model);
    Ok(Array1::from_vec(info).to_pyarray(py))
}

/// Select item with maximum Fisher information from available items
#[pyfunction]
#[pyo3(signature = (theta, discrimination, difficulty, available_mask, guessing=None, model="twoPL"))]
pub fn cat_select_max_info(
    theta: f64,
    discrimination: PyReadonlyArray1<f64>,
    difficulty: PyReadonlyArray1<f64>,
    available_mask: PyReadonlyArray1<bool>,
    guessing: Option<PyReadonlyArray1<f64>>,
    model: &str,
) -> PyResult<i32> {
    let model = parse_model(model)?;
    let disc = discrimination.as_array().to_vec();
    let diff = difficulty.as_array().to_vec();
    let guess = guessing.map(|g| g.as_array().to_vec());
    let available = available_mask.as_array();
    let params = item_parameters(&disc, &diff, guess.as_deref())?;
    check_len("available_mask", available.len(), params.len())?;

    let mut best_item: i32 = -1;
    let mut best_info: f64 = f64::NEG_INFINITY;
    for (j, (p, &open)) in params.iter().zip(available.iter()).enumerate() {
        if !open {
            continue;
        }
        // Lower index wins a tie, matching the id order of built pools.
        let info = model.information(theta, p);
        if best_item < 0 || (info > best_info && !same_information(info, best_info)) {
            best_info = info;
            best_item = j as i32;
        }
    }
    Ok(best_item)
}

/// Run batch CAT simulations in parallel
#[pyfunction]
#[pyo3(signature = (true_thetas, discrimination, difficulty, se_threshold, max_items, min_items, n_replications, seed, guessing=None, model="twoPL"))]
#[allow(clippy::too_many_arguments)]
#[allow(clippy::type_complexity)]
pub fn cat_simulate_batch<'py>(
    py: Python<'py>,
    true_thetas: PyReadonlyArray1<f64>,
    discrimination: PyReadonlyArray1<f64>,
    difficulty: PyReadonlyArray1<f64>,
    se_threshold: f64,
    max_items: usize,
    min_items: usize,
    n_replications: usize,
    seed: u64,
    guessing: Option<PyReadonlyArray1<f64>>,
    model: &str,
) -> PyResult<(
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<i32>>,
    Bound<'py, PyArray1<f64>>,
)> {
    let settings = CatSettings::default()
        .with_model(parse_model(model)?)
        .with_item_limits(min_items, max_items)
        .with_standard_error_target(se_threshold);
    let thetas = true_thetas.as_array().to_vec();
    let disc = discrimination.as_array().to_vec();
    let diff = difficulty.as_array().to_vec();
    let guess = guessing.map(|g| g.as_array().to_vec());
    let pool = build_pool(item_parameters(&disc, &diff, guess.as_deref())?)?;

    let result = py
        .detach(|| simulation::simulate_batch(&thetas, &pool, &settings, n_replications, seed))
        .map_err(to_py_err)?;

    let n_items = result.n_items.mapv(|n| n as i32);
    Ok((
        result.theta_est.to_pyarray(py),
        result.se_est.to_pyarray(py),
        n_items.to_pyarray(py),
        result.true_theta.to_pyarray(py),
    ))
}

/// Compute conditional MSE at specified theta values
#[pyfunction]
#[pyo3(signature = (eval_thetas, discrimination, difficulty, se_threshold, max_items, min_items, n_replications, seed, guessing=None, model="twoPL"))]
#[allow(clippy::too_many_arguments)]
#[allow(clippy::type_complexity)]
pub fn cat_conditional_mse<'py>(
    py: Python<'py>,
    eval_thetas: PyReadonlyArray1<f64>,
    discrimination: PyReadonlyArray1<f64>,
    difficulty: PyReadonlyArray1<f64>,
    se_threshold: f64,
    max_items: usize,
    min_items: usize,
    n_replications: usize,
    seed: u64,
    guessing: Option<PyReadonlyArray1<f64>>,
    model: &str,
) -> PyResult<(
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
)> {
    let settings = CatSettings::default()
        .with_model(parse_model(model)?)
        .with_item_limits(min_items, max_items)
        .with_standard_error_target(se_threshold);
    let thetas = eval_thetas.as_array().to_vec();
    let disc = discrimination.as_array().to_vec();
    let diff = difficulty.as_array().to_vec();
    let guess = guessing.map(|g| g.as_array().to_vec());
    let pool = build_pool(item_parameters(&disc, &diff, guess.as_deref())?)?;

    let result = py
        .detach(|| simulation::conditional_mse(&thetas, &pool, &settings, n_replications, seed))
        .map_err(to_py_err)?;

    Ok((
        result.theta.to_pyarray(py),
        result.bias.to_pyarray(py),
        result.mse.to_pyarray(py),
        result.avg_items.to_pyarray(py),
    ))
}

/// Register CAT functions with the Python module
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(cat_compute_item_info, m)?)?;
    m.add_function(wrap_pyfunction!(cat_select_max_info, m)?)?;
    m.add_function(wrap_pyfunction!(cat_simulate_batch, m)?)?;
    m.add_function(wrap_pyfunction!(cat_conditional_mse, m)?)?;
    Ok(())
}
