//! Next-item selection by maximum Fisher information.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::cat::ResponseRecord;
use crate::config::CatSettings;
use crate::item::{Item, ItemPool};

/// Caller-supplied content policy. The engine only asks whether an item may
/// be given next; quota bookkeeping belongs to the policy.
pub trait ContentPolicy {
    fn is_eligible(&self, item: &Item, history: &[ResponseRecord]) -> bool;
}

/// Policy that never excludes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEligible;

impl ContentPolicy for AllEligible {
    fn is_eligible(&self, _item: &Item, _history: &[ResponseRecord]) -> bool {
        true
    }
}

/// Upper bound on the number of items administered per content category.
/// Categories without a quota, and uncategorized items, are unrestricted.
#[derive(Debug, Clone, Default)]
pub struct CategoryQuotas {
    limits: HashMap<String, usize>,
}

impl CategoryQuotas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, category: impl Into<String>, max_items: usize) -> Self {
        self.limits.insert(category.into(), max_items);
        self
    }
}

impl ContentPolicy for CategoryQuotas {
    fn is_eligible(&self, item: &Item, history: &[ResponseRecord]) -> bool {
        let Some(category) = item.content_category.as_deref() else {
            return true;
        };
        let Some(&limit) = self.limits.get(category) else {
            return true;
        };
        let used = history
            .iter()
            .filter(|r| r.content_category.as_deref() == Some(category))
            .count();
        used < limit
    }
}

impl<F> ContentPolicy for F
where
    F: Fn(&Item, &[ResponseRecord]) -> bool,
{
    fn is_eligible(&self, item: &Item, history: &[ResponseRecord]) -> bool {
        self(item, history)
    }
}

/// An item together with its information at the theta it was scored at.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub item: &'a Item,
    pub information: f64,
}

/// Outcome of a selection call: the chosen item and the candidate count.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub item: &'a Item,
    pub information: f64,
    pub candidates: usize,
}

/// Relative gap under which two information values count as equal. Items
/// the same distance either side of theta differ only by rounding.
const TIE_TOLERANCE: f64 = 1e-12;

pub(crate) fn same_information(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIE_TOLERANCE * a.abs().max(b.abs())
}

/// Sort best first: higher information, with near-equal information ordered
/// by smaller id.
fn sort_by_information(candidates: &mut [Candidate<'_>]) {
    candidates.sort_by(|a, b| {
        b.information
            .total_cmp(&a.information)
            .then_with(|| a.item.id.cmp(&b.item.id))
    });
    // Runs are measured from their most informative member.
    let mut start = 0;
    while start < candidates.len() {
        let anchor = candidates[start].information;
        let end = start
            + candidates[start..]
                .iter()
                .take_while(|c| same_information(anchor, c.information))
                .count();
        candidates[start..end].sort_by(|a, b| a.item.id.cmp(&b.item.id));
        start = end;
    }
}

/// Score every unadministered, eligible item at `theta`, best first.
pub fn rank_candidates<'a, P>(
    pool: &'a ItemPool,
    history: &[ResponseRecord],
    theta: f64,
    settings: &CatSettings,
    policy: &P,
) -> Vec<Candidate<'a>>
where
    P: ContentPolicy + ?Sized,
{
    let administered: HashSet<&str> = history.iter().map(|r| r.item_id.as_str()).collect();
    let mut candidates: Vec<Candidate<'a>> = pool
        .iter()
        .filter(|item| !administered.contains(item.id.as_str()))
        .filter(|item| !settings.content_balancing || policy.is_eligible(item, history))
        .map(|item| Candidate {
            item,
            information: settings.model.information(theta, &item.irt_parameters),
        })
        .collect();
    sort_by_information(&mut candidates);
    candidates
}

/// Pick the next item, or `None` once no eligible item remains.
///
/// Without exposure control the most informative candidate wins. With it,
/// the choice is uniform over the top `exposure_window` candidates.
pub fn select_item<'a, P, R>(
    pool: &'a ItemPool,
    history: &[ResponseRecord],
    theta: f64,
    settings: &CatSettings,
    policy: &P,
    rng: &mut R,
) -> Option<Selection<'a>>
where
    P: ContentPolicy + ?Sized,
    R: Rng + ?Sized,
{
    let ranked = rank_candidates(pool, history, theta, settings, policy);
    let candidates = ranked.len();
    if candidates == 0 {
        return None;
    }

    let chosen = if settings.exposure_control {
        let window = settings.exposure_window.min(candidates);
        ranked[rng.random_range(0..window)]
    } else {
        ranked[0]
    };

    tracing::debug!(
        item = %chosen.item.id,
        information = chosen.information,
        candidates,
        theta,
        "selected next item"
    );

    Some(Selection {
        item: chosen.item,
        information: chosen.information,
        candidates,
    })
}
