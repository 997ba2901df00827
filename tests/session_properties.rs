use std::collections::HashSet;

use irt_cat::simulation::mean_standard_error_curve;
use irt_cat::{
    finalize, initialize_session, process_response, select_next_item, should_terminate,
    AllEligible, CatSettings, Estimator, IrtParameters, Item, ItemPool, ResponseModel,
    SessionState, TerminationReason,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg64;

fn spread_pool(n: usize, discrimination: f64, guessing: f64) -> ItemPool {
    let items = (0..n)
        .map(|i| {
            let b = -3.0 + 6.0 * i as f64 / (n - 1) as f64;
            Item::new(
                format!("item-{i:03}"),
                IrtParameters::three_pl(discrimination, b, guessing),
            )
        })
        .collect();
    ItemPool::new(items).unwrap()
}

/// Administer items by selection, answering from `answers` in order.
fn drive(pool: &ItemPool, settings: &CatSettings, answers: &[bool], seed: u64) -> SessionState {
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut state = initialize_session(settings).unwrap();
    for &answer in answers {
        if should_terminate(&state, settings) {
            break;
        }
        let Some(sel) = select_next_item(&state, pool, settings, &AllEligible, &mut rng) else {
            state = state.mark_exhausted();
            break;
        };
        state = process_response(&state, sel.item, answer, settings).unwrap();
    }
    state
}

#[test]
fn three_item_scenario_picks_middle_item_then_raises_theta() {
    let pool = ItemPool::new(vec![
        Item::new("a", IrtParameters::two_pl(1.0, -1.0)),
        Item::new("b", IrtParameters::two_pl(1.0, 0.0)),
        Item::new("c", IrtParameters::two_pl(1.0, 1.0)),
    ])
    .unwrap();
    let settings = CatSettings::default().with_model(ResponseModel::TwoPl);
    let state = initialize_session(&settings).unwrap();
    let mut rng = Pcg64::seed_from_u64(0);

    let sel = select_next_item(&state, &pool, &settings, &AllEligible, &mut rng).unwrap();
    assert_eq!(sel.item.irt_parameters.difficulty, 0.0);
    assert_eq!(sel.item.id.as_str(), "b");

    let next = process_response(&state, sel.item, true, &settings).unwrap();
    assert!(next.theta() > 0.0);
}

#[test]
fn fixed_length_test_administers_exactly_max_items() {
    let pool = spread_pool(40, 1.0, 0.0);
    let settings = CatSettings::default()
        .with_item_limits(5, 5)
        .with_standard_error_target(10.0);
    let mut rng = Pcg64::seed_from_u64(9);
    let mut state = initialize_session(&settings).unwrap();
    let mut selections = 0;

    while !should_terminate(&state, &settings) {
        let sel = select_next_item(&state, &pool, &settings, &AllEligible, &mut rng).unwrap();
        selections += 1;
        state = process_response(&state, sel.item, selections % 2 == 0, &settings).unwrap();
    }

    assert_eq!(selections, 5);
    assert_eq!(state.item_count(), 5);
    assert_eq!(
        finalize(&state, &settings).termination_reason,
        TerminationReason::MaxItems
    );
}

#[test]
fn never_terminates_below_min_items_even_when_precise() {
    // Very discriminating items make the standard error small immediately.
    let pool = spread_pool(30, 4.0, 0.0);
    let settings = CatSettings::default()
        .with_item_limits(8, 20)
        .with_standard_error_target(5.0);
    let mut rng = Pcg64::seed_from_u64(2);
    let mut state = initialize_session(&settings).unwrap();

    for i in 0..8 {
        assert!(!should_terminate(&state, &settings), "stopped after {i} items");
        let sel = select_next_item(&state, &pool, &settings, &AllEligible, &mut rng).unwrap();
        state = process_response(&state, sel.item, i % 3 != 0, &settings).unwrap();
    }
    assert!(state.standard_error() <= 5.0);
    assert!(should_terminate(&state, &settings));
}

#[test]
fn exhaustion_returns_none() {
    let pool = spread_pool(4, 1.0, 0.0);
    let settings = CatSettings::default()
        .with_item_limits(1, 10)
        .with_standard_error_target(0.001);
    let state = drive(&pool, &settings, &[true, false, true, false], 1);
    assert_eq!(state.item_count(), pool.len());

    let mut rng = Pcg64::seed_from_u64(1);
    assert!(select_next_item(&state, &pool, &settings, &AllEligible, &mut rng).is_none());
    assert!(!should_terminate(&state, &settings));
    assert!(should_terminate(&state.mark_exhausted(), &settings));
}

#[test]
fn selection_is_deterministic_without_exposure_control() {
    let pool = spread_pool(25, 1.3, 0.15);
    let settings = CatSettings::default().with_model(ResponseModel::ThreePl);
    let state = drive(&pool, &settings, &[true, false, true], 4);

    let mut rng_a = Pcg64::seed_from_u64(1);
    let mut rng_b = Pcg64::seed_from_u64(2);
    let a = select_next_item(&state, &pool, &settings, &AllEligible, &mut rng_a).unwrap();
    let b = select_next_item(&state, &pool, &settings, &AllEligible, &mut rng_b).unwrap();
    assert_eq!(a.item.id, b.item.id);
}

#[test]
fn all_correct_stream_reaches_upper_bound() {
    let pool = spread_pool(20, 1.0, 0.0);
    let settings = CatSettings::default().with_item_limits(10, 10);
    let state = drive(&pool, &settings, &[true; 10], 3);
    assert_eq!(state.theta(), settings.theta_max);
    let trajectory: Vec<f64> = state.response_history().iter().map(|r| r.theta_after).collect();
    assert!(trajectory.iter().all(|&t| t <= settings.theta_max));
}

#[test]
fn all_incorrect_stream_reaches_lower_bound() {
    let pool = spread_pool(20, 1.0, 0.0);
    let settings = CatSettings::default()
        .with_item_limits(10, 10)
        .with_theta_bounds(-3.5, 3.5);
    let state = drive(&pool, &settings, &[false; 10], 3);
    assert_eq!(state.theta(), -3.5);
}

#[test]
fn eap_stream_stays_inside_bounds() {
    let pool = spread_pool(20, 1.0, 0.0);
    let settings = CatSettings::default()
        .with_item_limits(10, 10)
        .with_estimator(Estimator::ExpectedAPosteriori);
    let up = drive(&pool, &settings, &[true; 10], 3);
    let down = drive(&pool, &settings, &[false; 10], 3);
    assert!(up.theta() > 1.0 && up.theta() <= settings.theta_max);
    assert!(down.theta() < -1.0 && down.theta() >= settings.theta_min);
}

#[test]
fn average_standard_error_shrinks_with_test_length() {
    let pool = spread_pool(60, 1.2, 0.0);
    let settings = CatSettings::default()
        .with_item_limits(20, 20)
        .with_standard_error_target(0.01);
    let curve = mean_standard_error_curve(0.5, &pool, &settings, 200, 17).unwrap();
    assert_eq!(curve.len(), 20);
    let checkpoints = [curve[0], curve[4], curve[9], curve[19]];
    for pair in checkpoints.windows(2) {
        assert!(pair[1] < pair[0], "curve not decreasing: {checkpoints:?}");
    }
}

proptest! {
    #[test]
    fn theta_stays_within_bounds(
        answers in prop::collection::vec(any::<bool>(), 1..25),
        model_idx in 0usize..4,
        lo in -5.0f64..-1.0,
        hi in 1.0f64..5.0,
        seed in 0u64..1000,
    ) {
        let pool = spread_pool(30, 1.4, 0.2);
        let settings = CatSettings::default()
            .with_model(ResponseModel::ALL[model_idx])
            .with_theta_bounds(lo, hi)
            .with_item_limits(1, 30)
            .with_standard_error_target(0.01);
        let state = drive(&pool, &settings, &answers, seed);
        prop_assert!(state.theta() >= lo && state.theta() <= hi);
        for r in state.response_history() {
            prop_assert!(r.theta_after >= lo && r.theta_after <= hi);
        }
    }

    #[test]
    fn no_item_is_administered_twice(
        answers in prop::collection::vec(any::<bool>(), 1..40),
        exposure in any::<bool>(),
        seed in 0u64..1000,
    ) {
        let pool = spread_pool(30, 1.0, 0.0);
        let mut settings = CatSettings::default()
            .with_item_limits(1, 40)
            .with_standard_error_target(0.01);
        settings.exposure_control = exposure;
        let state = drive(&pool, &settings, &answers, seed);
        let unique: HashSet<_> = state.administered_item_ids().iter().collect();
        prop_assert_eq!(unique.len(), state.item_count());
        prop_assert_eq!(state.response_history().len(), state.item_count());
        prop_assert!(state.item_count() <= settings.max_items);
    }

    #[test]
    fn termination_floor_and_ceiling(
        min_items in 0usize..10,
        extra in 0usize..10,
        answers in prop::collection::vec(any::<bool>(), 20),
        seed in 0u64..1000,
    ) {
        let pool = spread_pool(40, 2.5, 0.0);
        let max_items = (min_items + extra).max(1);
        let settings = CatSettings::default()
            .with_item_limits(min_items, max_items)
            .with_standard_error_target(3.0);
        let mut rng = Pcg64::seed_from_u64(seed);
        let mut state = initialize_session(&settings).unwrap();
        for &answer in &answers {
            if state.item_count() < min_items {
                prop_assert!(!should_terminate(&state, &settings));
            }
            if state.item_count() == max_items {
                prop_assert!(should_terminate(&state, &settings));
                break;
            }
            let sel = select_next_item(&state, &pool, &settings, &AllEligible, &mut rng).unwrap();
            state = process_response(&state, sel.item, answer, &settings).unwrap();
        }
    }

    #[test]
    fn initialize_matches_settings(
        start in -3.0f64..3.0,
        min_items in 0usize..20,
        extra in 1usize..20,
        target in 0.05f64..1.0,
    ) {
        let settings = CatSettings {
            theta_start: start,
            ..CatSettings::default()
        }
        .with_item_limits(min_items, min_items + extra)
        .with_standard_error_target(target);
        let state = initialize_session(&settings).unwrap();
        prop_assert_eq!(state.theta(), start);
        prop_assert!(state.standard_error().is_infinite());
        prop_assert!(state.response_history().is_empty());
        prop_assert_eq!(state.item_count(), 0);
    }
}
