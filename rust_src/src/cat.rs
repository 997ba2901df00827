//! Computerized Adaptive Testing (CAT) session engine.
//!
//! Every operation takes the current [`SessionState`] by reference and
//! returns a value; nothing is held between calls. The caller owns the state
//! and the item pool, and drives the loop:
//!
//! 1. [`initialize_session`]
//! 2. [`select_next_item`] → serve the item → [`process_response`]
//! 3. repeat until [`should_terminate`], then [`finalize`]

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::CatSettings;
use crate::error::{CatError, Result};
use crate::estimation::estimate_ability;
use crate::item::{IrtParameters, Item, ItemId, ItemPool};
use crate::report::{FinalReport, TerminationReason};
use crate::selection::{select_item, ContentPolicy, Selection};

/// One administered item and the estimate right after scoring it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub item_id: ItemId,
    pub is_correct: bool,
    /// Parameters as they were when the item was given.
    pub irt_parameters: IrtParameters,
    pub content_category: Option<String>,
    pub theta_after: f64,
    pub standard_error_after: f64,
}

/// State of one examinee's attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    theta: f64,
    standard_error: f64,
    administered_item_ids: Vec<ItemId>,
    response_history: Vec<ResponseRecord>,
    pool_exhausted: bool,
}

impl SessionState {
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// `f64::INFINITY` until the responses carry any information.
    pub fn standard_error(&self) -> f64 {
        self.standard_error
    }

    pub fn administered_item_ids(&self) -> &[ItemId] {
        &self.administered_item_ids
    }

    pub fn response_history(&self) -> &[ResponseRecord] {
        &self.response_history
    }

    pub fn item_count(&self) -> usize {
        self.administered_item_ids.len()
    }

    pub fn has_administered(&self, id: &str) -> bool {
        self.administered_item_ids.iter().any(|a| a.as_str() == id)
    }

    pub fn pool_exhausted(&self) -> bool {
        self.pool_exhausted
    }

    /// Record that the last selection found no eligible item. Cleared by the
    /// next [`process_response`].
    pub fn mark_exhausted(mut self) -> Self {
        self.pool_exhausted = true;
        self
    }
}

/// Start a fresh session. Fails only on invalid settings.
pub fn initialize_session(settings: &CatSettings) -> Result<SessionState> {
    settings.validate()?;
    tracing::debug!(
        model = %settings.model,
        theta_start = settings.theta_start,
        min_items = settings.min_items,
        max_items = settings.max_items,
        "initialized CAT session"
    );
    Ok(SessionState {
        theta: settings.theta_start,
        standard_error: f64::INFINITY,
        administered_item_ids: Vec::with_capacity(settings.max_items),
        response_history: Vec::with_capacity(settings.max_items),
        pool_exhausted: false,
    })
}

/// Most informative eligible item at the current theta, or `None` once the
/// pool is exhausted. Pair a `None` with [`SessionState::mark_exhausted`].
pub fn select_next_item<'a, P, R>(
    state: &SessionState,
    pool: &'a ItemPool,
    settings: &CatSettings,
    policy: &P,
    rng: &mut R,
) -> Option<Selection<'a>>
where
    P: ContentPolicy + ?Sized,
    R: Rng + ?Sized,
{
    select_item(
        pool,
        &state.response_history,
        state.theta,
        settings,
        policy,
        rng,
    )
}

/// Score a response and return the next state.
pub fn process_response(
    state: &SessionState,
    item: &Item,
    is_correct: bool,
    settings: &CatSettings,
) -> Result<SessionState> {
    if state.has_administered(item.id.as_str()) {
        return Err(CatError::AlreadyAdministered(item.id.to_string()));
    }
    if state.item_count() >= settings.max_items {
        return Err(CatError::MaxItemsReached(settings.max_items));
    }

    let mut next = state.clone();
    // Exhaustion only describes the selection made before this response.
    next.pool_exhausted = false;
    next.administered_item_ids.push(item.id.clone());
    next.response_history.push(ResponseRecord {
        item_id: item.id.clone(),
        is_correct,
        irt_parameters: item.irt_parameters,
        content_category: item.content_category.clone(),
        theta_after: state.theta,
        standard_error_after: state.standard_error,
    });

    let estimate = estimate_ability(&next.response_history, state.theta, settings);
    next.theta = estimate.theta;
    next.standard_error = estimate.standard_error;
    if let Some(last) = next.response_history.last_mut() {
        last.theta_after = estimate.theta;
        last.standard_error_after = estimate.standard_error;
    }

    tracing::debug!(
        item = %item.id,
        is_correct,
        theta = estimate.theta,
        standard_error = estimate.standard_error,
        iterations = estimate.iterations,
        converged = estimate.converged,
        "processed response"
    );

    Ok(next)
}

/// [`process_response`] for hosts that only keep item ids.
pub fn process_response_by_id(
    state: &SessionState,
    pool: &ItemPool,
    item_id: &str,
    is_correct: bool,
    settings: &CatSettings,
) -> Result<SessionState> {
    let item = pool
        .get(item_id)
        .ok_or_else(|| CatError::ItemNotInPool(item_id.to_string()))?;
    process_response(state, item, is_correct, settings)
}

/// Why the session should stop now, if it should.
pub fn termination_reason(
    state: &SessionState,
    settings: &CatSettings,
) -> Option<TerminationReason> {
    let count = state.item_count();
    if count >= settings.max_items {
        Some(TerminationReason::MaxItems)
    } else if count >= settings.min_items
        && state.standard_error <= settings.standard_error_target
    {
        Some(TerminationReason::PrecisionReached)
    } else if state.pool_exhausted {
        Some(TerminationReason::PoolExhausted)
    } else {
        None
    }
}

pub fn should_terminate(state: &SessionState, settings: &CatSettings) -> bool {
    termination_reason(state, settings).is_some()
}

/// Summarize a session. Reads the state only.
pub fn finalize(state: &SessionState, settings: &CatSettings) -> FinalReport {
    FinalReport::from_state(state, settings)
}

/// Drive a whole session with a caller-supplied responder.
///
/// `respond` receives the item to administer and the same random source used
/// for selection, and returns whether the answer was correct.
pub fn run_session<P, R, F>(
    pool: &ItemPool,
    settings: &CatSettings,
    policy: &P,
    rng: &mut R,
    mut respond: F,
) -> Result<FinalReport>
where
    P: ContentPolicy + ?Sized,
    R: Rng + ?Sized,
    F: FnMut(&Item, &mut R) -> bool,
{
    let mut state = initialize_session(settings)?;
    while !should_terminate(&state, settings) {
        let Some(selection) = select_next_item(&state, pool, settings, policy, rng) else {
            state = state.mark_exhausted();
            break;
        };
        let is_correct = respond(selection.item, &mut *rng);
        state = process_response(&state, selection.item, is_correct, settings)?;
    }
    Ok(finalize(&state, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::AllEligible;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn three_item_pool() -> ItemPool {
        ItemPool::new(vec![
            Item::new("easy", IrtParameters::two_pl(1.0, -1.0)),
            Item::new("medium", IrtParameters::two_pl(1.0, 0.0)),
            Item::new("hard", IrtParameters::two_pl(1.0, 1.0)),
        ])
        .unwrap()
    }

    #[test]
    fn initialize_rejects_bad_settings() {
        let settings = CatSettings::default().with_item_limits(6, 3);
        assert!(matches!(
            initialize_session(&settings),
            Err(CatError::Configuration(_))
        ));
    }

    #[test]
    fn fresh_session_is_empty() {
        let settings = CatSettings {
            theta_start: -0.5,
            ..CatSettings::default()
        };
        let state = initialize_session(&settings).unwrap();
        assert_eq!(state.theta(), -0.5);
        assert!(state.standard_error().is_infinite());
        assert_eq!(state.item_count(), 0);
        assert!(state.response_history().is_empty());
    }

    #[test]
    fn response_updates_history_and_estimate() {
        let pool = three_item_pool();
        let settings = CatSettings::default();
        let state = initialize_session(&settings).unwrap();
        let item = pool.get("medium").unwrap();

        let next = process_response(&state, item, true, &settings).unwrap();
        assert_eq!(next.item_count(), 1);
        assert_eq!(next.administered_item_ids()[0].as_str(), "medium");
        assert!(next.theta() > state.theta());
        assert!(next.standard_error().is_finite());

        let record = &next.response_history()[0];
        assert!(record.is_correct);
        assert_eq!(record.theta_after, next.theta());

        // The input state is untouched.
        assert_eq!(state.item_count(), 0);
    }

    #[test]
    fn readministering_is_rejected() {
        let pool = three_item_pool();
        let settings = CatSettings::default();
        let item = pool.get("easy").unwrap();
        let state = initialize_session(&settings).unwrap();
        let state = process_response(&state, item, false, &settings).unwrap();
        assert_eq!(
            process_response(&state, item, true, &settings),
            Err(CatError::AlreadyAdministered("easy".into()))
        );
    }

    #[test]
    fn responses_beyond_max_items_are_rejected() {
        let pool = three_item_pool();
        let settings = CatSettings::default().with_item_limits(1, 1);
        let state = initialize_session(&settings).unwrap();
        let state = process_response(&state, pool.get("easy").unwrap(), true, &settings).unwrap();
        assert_eq!(
            process_response(&state, pool.get("hard").unwrap(), true, &settings),
            Err(CatError::MaxItemsReached(1))
        );
    }

    #[test]
    fn unknown_item_id_is_rejected() {
        let pool = three_item_pool();
        let settings = CatSettings::default();
        let state = initialize_session(&settings).unwrap();
        assert_eq!(
            process_response_by_id(&state, &pool, "nope", true, &settings),
            Err(CatError::ItemNotInPool("nope".into()))
        );
    }

    #[test]
    fn exhaustion_terminates() {
        let settings = CatSettings::default().with_item_limits(0, 10);
        let state = initialize_session(&settings).unwrap();
        assert!(!should_terminate(&state, &settings));
        let state = state.mark_exhausted();
        assert_eq!(
            termination_reason(&state, &settings),
            Some(TerminationReason::PoolExhausted)
        );
    }

    #[test]
    fn exhaustion_clears_after_a_response() {
        let pool = three_item_pool();
        let settings = CatSettings::default()
            .with_item_limits(3, 10)
            .with_content_balancing();
        let mut rng = Pcg64::seed_from_u64(0);
        let state = initialize_session(&settings).unwrap();

        let closed = |_: &Item, _: &[ResponseRecord]| false;
        assert!(select_next_item(&state, &pool, &settings, &closed, &mut rng).is_none());
        let state = state.mark_exhausted();
        assert!(should_terminate(&state, &settings));

        // The policy opens up again and the caller keeps going.
        let sel = select_next_item(&state, &pool, &settings, &AllEligible, &mut rng).unwrap();
        let state = process_response(&state, sel.item, true, &settings).unwrap();
        assert!(!state.pool_exhausted());
        assert_eq!(termination_reason(&state, &settings), None);
    }

    #[test]
    fn run_session_stops_at_pool_size() {
        let pool = three_item_pool();
        let settings = CatSettings::default()
            .with_item_limits(1, 10)
            .with_standard_error_target(0.01);
        let mut rng = Pcg64::seed_from_u64(3);
        let report = run_session(&pool, &settings, &AllEligible, &mut rng, |item, _| {
            item.irt_parameters.difficulty < 0.5
        })
        .unwrap();
        assert_eq!(report.items_administered, 3);
        assert_eq!(report.termination_reason, TerminationReason::PoolExhausted);
    }
}
