//! Expected-value ranking of candidate actions.
//!
//! EV = payoff value × estimate confidence. Pure, deterministic,
//! O(n log n); the sort is stable so equal EVs keep input order.
//!
//! Malformed numeric input is coerced, not propagated: a missing or
//! non-finite payoff becomes value 0.0, a non-finite confidence becomes
//! the 0.5 default. One bad record must never abort a ranking or a
//! downstream sensitivity run.

use serde::{Deserialize, Serialize};

pub const PAYOFF_RANKING_COMPONENT: &str = "payoff_ranking";
pub const PAYOFF_RANKING_SCHEMA_VERSION: &str = "stratagem-engine.payoff-ranking.v1";

/// Confidence assigned when an estimate omits or corrupts it.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Evidence source backing a payoff estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    /// Relevance of this source to the estimate, in [0, 1].
    #[serde(default)]
    pub relevance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Payoff estimate for one candidate action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffEstimate {
    /// Unconstrained real payoff value.
    pub value: f64,
    /// Confidence in the estimate, clipped to [0, 1].
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

impl Default for PayoffEstimate {
    fn default() -> Self {
        Self {
            value: 0.0,
            confidence: DEFAULT_CONFIDENCE,
            sources: Vec::new(),
        }
    }
}

/// One candidate action with its payoff estimate. Immutable engine input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub actor: String,
    pub action: String,
    #[serde(default)]
    pub payoff_estimate: PayoffEstimate,
}

/// Ranked expected-value record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvResult {
    pub actor: String,
    pub action: String,
    pub ev: f64,
    pub sources: Vec<SourceRef>,
}

/// Coerce a payoff estimate to safe numerics.
///
/// Non-finite value → 0.0; non-finite confidence → [`DEFAULT_CONFIDENCE`];
/// confidence clipped to [0, 1]; source relevance clipped to [0, 1].
pub fn sanitize_estimate(estimate: &PayoffEstimate) -> PayoffEstimate {
    let value = if estimate.value.is_finite() {
        estimate.value
    } else {
        0.0
    };
    let confidence = if estimate.confidence.is_finite() {
        estimate.confidence.clamp(0.0, 1.0)
    } else {
        DEFAULT_CONFIDENCE
    };
    let sources = estimate
        .sources
        .iter()
        .map(|source| SourceRef {
            id: source.id.clone(),
            relevance: if source.relevance.is_finite() {
                source.relevance.clamp(0.0, 1.0)
            } else {
                0.0
            },
            excerpt: source.excerpt.clone(),
        })
        .collect();
    PayoffEstimate {
        value,
        confidence,
        sources,
    }
}

/// Rank actions by EV, descending; ties keep input order.
pub fn rank(actions: &[ActionEntry]) -> Vec<EvResult> {
    let mut results: Vec<EvResult> = actions
        .iter()
        .map(|entry| {
            let estimate = sanitize_estimate(&entry.payoff_estimate);
            EvResult {
                actor: entry.actor.clone(),
                action: entry.action.clone(),
                ev: estimate.value * estimate.confidence,
                sources: estimate.sources,
            }
        })
        .collect();
    // Sanitized EVs are always finite, so the comparison is total.
    results.sort_by(|a, b| b.ev.partial_cmp(&a.ev).unwrap_or(std::cmp::Ordering::Equal));
    results
}

/// Top EV of a ranked set, 0.0 when empty.
pub fn top_ev(results: &[EvResult]) -> f64 {
    results.first().map(|r| r.ev).unwrap_or(0.0)
}
