//! Final score report of a session, kept for audit rather than grading.

use serde::{Deserialize, Serialize};

use crate::cat::{termination_reason, SessionState};
use crate::config::CatSettings;
use crate::item::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminationReason {
    MaxItems,
    PrecisionReached,
    PoolExhausted,
    /// Finalized before any stopping rule fired.
    NotTerminated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    /// 1-based administration order.
    pub position: usize,
    pub item_id: ItemId,
    pub is_correct: bool,
    pub difficulty: f64,
    pub discrimination: f64,
    pub content_category: Option<String>,
    pub information_at_final_theta: f64,
}

/// Estimate after `item_count` responses. The first point is the start value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub item_count: usize,
    pub theta: f64,
    pub standard_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub final_theta: f64,
    pub final_standard_error: f64,
    pub items_administered: usize,
    pub termination_reason: TerminationReason,
    pub proportion_correct: f64,
    pub items: Vec<ItemSummary>,
    pub trajectory: Vec<TrajectoryPoint>,
}

impl FinalReport {
    pub fn from_state(state: &SessionState, settings: &CatSettings) -> Self {
        let history = state.response_history();
        let final_theta = state.theta();

        let items = history
            .iter()
            .enumerate()
            .map(|(i, r)| ItemSummary {
                position: i + 1,
                item_id: r.item_id.clone(),
                is_correct: r.is_correct,
                difficulty: r.irt_parameters.difficulty,
                discrimination: r.irt_parameters.discrimination,
                content_category: r.content_category.clone(),
                information_at_final_theta: settings
                    .model
                    .information(final_theta, &r.irt_parameters),
            })
            .collect();

        let trajectory = std::iter::once(TrajectoryPoint {
            item_count: 0,
            theta: settings.theta_start,
            standard_error: f64::INFINITY,
        })
        .chain(history.iter().enumerate().map(|(i, r)| TrajectoryPoint {
            item_count: i + 1,
            theta: r.theta_after,
            standard_error: r.standard_error_after,
        }))
        .collect();

        let correct = history.iter().filter(|r| r.is_correct).count();
        let proportion_correct = if history.is_empty() {
            0.0
        } else {
            correct as f64 / history.len() as f64
        };

        Self {
            final_theta,
            final_standard_error: state.standard_error(),
            items_administered: state.item_count(),
            termination_reason: termination_reason(state, settings)
                .unwrap_or(TerminationReason::NotTerminated),
            proportion_correct,
            items,
            trajectory,
        }
    }
}
