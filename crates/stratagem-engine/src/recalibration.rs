//! Trigger-gated Bayesian strategy recalibration.
//!
//! One call is one pass of the Stable ⇄ Recalibrating state machine: the
//! configured change-detection triggers are evaluated against the new
//! evidence batch; if none fires, the call returns immediately with the
//! beliefs untouched and no recommendations. If at least one fires, each
//! belief is updated by sequential precision-weighted Gaussian fusion,
//! moderated by the caller's adaptation rate so the posterior moves
//! toward, never jumps to, the fused estimate, and a fresh prioritized
//! recommendation set with validity windows is computed.
//!
//! The belief store is caller-owned between cycles; the engine caches
//! nothing.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::telemetry::EngineEvent;

pub const RECALIBRATION_COMPONENT: &str = "recalibration";
pub const RECALIBRATION_SCHEMA_VERSION: &str = "stratagem-engine.recalibration.v1";

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Reliability above which an evidence item counts toward the
/// information-update trigger.
pub const HIGH_RELIABILITY_THRESHOLD: f64 = 0.7;
/// Items with |impact| at or above this count as shocks.
pub const SHOCK_IMPACT_THRESHOLD: f64 = 2.0;
/// Evidence newer than this window counts as recent.
pub const RECENT_EVIDENCE_WINDOW_HOURS: i64 = 48;
/// Normalizers mapping trigger counts to [0, 1] strengths.
const INFORMATION_UPDATE_NORMALIZER: f64 = 5.0;
const EXTERNAL_SHOCK_NORMALIZER: f64 = 2.0;
const TIME_DECAY_NORMALIZER_HOURS: f64 = 24.0;

/// Observation precision per unit of reliability.
const OBSERVATION_PRECISION_SCALE: f64 = 10.0;
/// Variance floor guarding the precision computation.
const MIN_VARIANCE: f64 = 1e-6;
/// Confidence gained per nat of information.
const CONFIDENCE_GAIN_SCALE: f64 = 0.1;
/// Confidence ceiling after updates.
const CONFIDENCE_CEILING: f64 = 0.99;
/// Decay applied to beliefs with no relevant evidence.
const DECAY_CONFIDENCE_FACTOR: f64 = 0.98;
const DECAY_VARIANCE_FACTOR: f64 = 1.05;

/// Recommendation scoring.
const WEAK_RELEVANCE: f64 = 0.25;
const VARIANCE_RISK_SCALE: f64 = 0.5;
const HIGH_RISK_REASON_THRESHOLD: f64 = 0.7;
const LOW_CONFIDENCE_REASON_THRESHOLD: f64 = 0.4;
const BASE_NEUTRAL_BAND: f64 = 0.1;

/// Validity-window bounds (hours).
const VALIDITY_FLOOR_HOURS: f64 = 6.0;
const VALIDITY_SPAN_HOURS: f64 = 66.0;

/// Outcome-level risk classification thresholds.
const HIGH_STRATEGY_CHANGE: f64 = 0.5;
const MEDIUM_STRATEGY_CHANGE: f64 = 0.2;

// ---------------------------------------------------------------------------
// Request types (camelCase wire contract)
// ---------------------------------------------------------------------------

/// Gaussian belief distribution summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefDistribution {
    pub mean: f64,
    pub variance: f64,
    pub confidence: f64,
}

/// One appended update-history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefUpdateEntry {
    pub timestamp: String,
    /// Identifier of the evidence item consumed.
    pub evidence: String,
    pub information_gain: f64,
}

/// A named strategic belief with prior, posterior, and append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicBelief {
    pub parameter: String,
    pub prior_distribution: BeliefDistribution,
    pub posterior_distribution: BeliefDistribution,
    #[serde(default)]
    pub update_history: Vec<BeliefUpdateEntry>,
}

/// One action of the current strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAction {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Previous cycle's expected value, baseline for change classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<f64>,
    /// Observed performance relative to an expectation of 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_performance: Option<f64>,
}

/// The evolving strategy under recalibration. Caller-owned between cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStrategy {
    #[serde(default)]
    pub actions: Vec<StrategyAction>,
    #[serde(default)]
    pub beliefs: Vec<StrategicBelief>,
    /// RFC3339 UTC timestamp of the previous recalibration.
    #[serde(default)]
    pub last_update: String,
    /// Trigger type → RFC3339 timestamp it last fired; drives cooldowns.
    #[serde(default)]
    pub last_triggered: BTreeMap<String, String>,
}

/// One incoming evidence item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    pub id: String,
    #[serde(default)]
    pub content: String,
    /// Source reliability in [0, 1].
    #[serde(default)]
    pub reliability: f64,
    /// Signed observation magnitude; the Gaussian observation value.
    #[serde(default)]
    pub impact: f64,
    /// e.g. "market_signal", "regulatory", "performance".
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Change-detection trigger kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    InformationUpdate,
    TimeDecay,
    PerformanceDeviation,
    ExternalShock,
}

impl TriggerType {
    pub const ALL: [TriggerType; 4] = [
        TriggerType::InformationUpdate,
        TriggerType::TimeDecay,
        TriggerType::PerformanceDeviation,
        TriggerType::ExternalShock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InformationUpdate => "information_update",
            Self::TimeDecay => "time_decay",
            Self::PerformanceDeviation => "performance_deviation",
            Self::ExternalShock => "external_shock",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static trigger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalibrationTrigger {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// Strength at or above this fires the trigger.
    pub threshold: f64,
    /// Strength multiplier; calibrates how aggressively a signal counts.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// Hours after firing during which the trigger is suppressed.
    #[serde(default)]
    pub cooldown_period_hours: f64,
}

fn default_sensitivity() -> f64 {
    1.0
}

/// Engine configuration; every knob has a calibrated default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalibrationConfig {
    #[serde(default = "default_triggers")]
    pub triggers: Vec<RecalibrationTrigger>,
    /// Linear moderation between old and fused posterior, in [0, 1].
    #[serde(default = "default_adaptation_rate")]
    pub adaptation_rate: f64,
    /// Widens the no-change band of the reason classifier, in [0, 1].
    #[serde(default = "default_conservatism_bias")]
    pub conservatism_bias: f64,
}

fn default_adaptation_rate() -> f64 {
    0.5
}

fn default_conservatism_bias() -> f64 {
    0.5
}

fn default_triggers() -> Vec<RecalibrationTrigger> {
    vec![
        RecalibrationTrigger {
            trigger_type: TriggerType::InformationUpdate,
            threshold: 0.4,
            sensitivity: 1.0,
            cooldown_period_hours: 0.0,
        },
        RecalibrationTrigger {
            trigger_type: TriggerType::TimeDecay,
            threshold: 0.8,
            sensitivity: 1.0,
            cooldown_period_hours: 0.0,
        },
        RecalibrationTrigger {
            trigger_type: TriggerType::PerformanceDeviation,
            threshold: 0.3,
            sensitivity: 1.0,
            cooldown_period_hours: 0.0,
        },
        RecalibrationTrigger {
            trigger_type: TriggerType::ExternalShock,
            threshold: 0.5,
            sensitivity: 1.0,
            cooldown_period_hours: 0.0,
        },
    ]
}

impl Default for RecalibrationConfig {
    fn default() -> Self {
        Self {
            triggers: default_triggers(),
            adaptation_rate: default_adaptation_rate(),
            conservatism_bias: default_conservatism_bias(),
        }
    }
}

/// Caller constraints on the recommendation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalibrationConstraints {
    #[serde(default)]
    pub min_confidence_threshold: f64,
    #[serde(default = "default_max_strategy_changes")]
    pub max_strategy_changes: u32,
}

fn default_max_strategy_changes() -> u32 {
    10
}

impl Default for RecalibrationConstraints {
    fn default() -> Self {
        Self {
            min_confidence_threshold: 0.0,
            max_strategy_changes: default_max_strategy_changes(),
        }
    }
}

/// Full recalibration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalibrationRequest {
    pub run_id: String,
    pub current_strategy: CurrentStrategy,
    #[serde(default)]
    pub new_information: Vec<EvidenceItem>,
    #[serde(default)]
    pub recalibration_config: RecalibrationConfig,
    #[serde(default)]
    pub constraints: RecalibrationConstraints,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One prioritized recommendation with a validity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRecommendation {
    pub action_id: String,
    pub priority: f64,
    pub confidence: f64,
    pub expected_value: f64,
    /// Scaled mean variance of the relevant beliefs, in [0, 1].
    pub risk_level: f64,
    pub adaptation_reason: String,
    pub validity_window: ValidityWindow,
}

/// Window within which a recommendation is considered current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
    pub start: String,
    pub end: String,
}

/// Cycle-level adaptation metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationMetrics {
    pub belief_change_magnitude: f64,
    pub strategy_change_magnitude: f64,
    /// Fraction of evidence items with reliability > 0.5.
    pub evidence_quality: f64,
    pub hours_since_last_update: f64,
    pub confidence_improvement: f64,
}

/// Three-level recalibration risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRating {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Outcome-level risk classification with rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalibrationRiskAssessment {
    pub level: RiskRating,
    pub rationale: String,
}

/// Full recalibration outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalibrationOutcome {
    pub should_recalibrate: bool,
    pub triggered_by: Vec<TriggerType>,
    pub updated_beliefs: Vec<StrategicBelief>,
    pub new_recommendations: Vec<StrategyRecommendation>,
    pub adaptation_metrics: AdaptationMetrics,
    pub risk_assessment: RecalibrationRiskAssessment,
}

// ---------------------------------------------------------------------------
// Trigger evaluation
// ---------------------------------------------------------------------------

fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_seconds() as f64 / 3600.0
}

fn is_recent(item: &EvidenceItem, now: DateTime<Utc>) -> bool {
    match parse_utc(&item.timestamp) {
        Some(ts) => now.signed_duration_since(ts).num_hours() <= RECENT_EVIDENCE_WINDOW_HOURS,
        // Unparseable timestamps count as recent; degrading the batch for
        // a formatting defect would starve the trigger.
        None => true,
    }
}

fn is_shock(item: &EvidenceItem) -> bool {
    item.impact.abs() >= SHOCK_IMPACT_THRESHOLD || item.category == "regulatory"
}

/// Strength of one trigger type in [0, 1], before sensitivity scaling.
pub fn trigger_strength(
    trigger_type: TriggerType,
    strategy: &CurrentStrategy,
    evidence: &[EvidenceItem],
    now: DateTime<Utc>,
) -> f64 {
    match trigger_type {
        TriggerType::InformationUpdate => {
            let count = evidence
                .iter()
                .filter(|item| item.reliability > HIGH_RELIABILITY_THRESHOLD && is_recent(item, now))
                .count() as f64;
            (count / INFORMATION_UPDATE_NORMALIZER).clamp(0.0, 1.0)
        }
        TriggerType::TimeDecay => match parse_utc(&strategy.last_update) {
            Some(last) => {
                (hours_between(last, now) / TIME_DECAY_NORMALIZER_HOURS).clamp(0.0, 1.0)
            }
            None => 0.0,
        },
        TriggerType::PerformanceDeviation => {
            let deviations: Vec<f64> = strategy
                .actions
                .iter()
                .filter_map(|action| action.observed_performance)
                .map(|observed| (observed - 1.0).abs())
                .collect();
            if deviations.is_empty() {
                0.0
            } else {
                (deviations.iter().sum::<f64>() / deviations.len() as f64).clamp(0.0, 1.0)
            }
        }
        TriggerType::ExternalShock => {
            let count = evidence.iter().filter(|item| is_shock(item)).count() as f64;
            (count / EXTERNAL_SHOCK_NORMALIZER).clamp(0.0, 1.0)
        }
    }
}

fn in_cooldown(
    trigger: &RecalibrationTrigger,
    strategy: &CurrentStrategy,
    now: DateTime<Utc>,
) -> bool {
    if trigger.cooldown_period_hours <= 0.0 {
        return false;
    }
    strategy
        .last_triggered
        .get(trigger.trigger_type.as_str())
        .and_then(|ts| parse_utc(ts))
        .map(|fired| hours_between(fired, now) < trigger.cooldown_period_hours)
        .unwrap_or(false)
}

fn evaluate_triggers(
    request: &RecalibrationRequest,
    now: DateTime<Utc>,
) -> Vec<TriggerType> {
    let mut fired = Vec::new();
    for trigger in &request.recalibration_config.triggers {
        if in_cooldown(trigger, &request.current_strategy, now) {
            continue;
        }
        let strength = trigger_strength(
            trigger.trigger_type,
            &request.current_strategy,
            &request.new_information,
            now,
        ) * trigger.sensitivity.max(0.0);
        if strength.clamp(0.0, 1.0) >= trigger.threshold {
            fired.push(trigger.trigger_type);
        }
    }
    fired.sort();
    fired.dedup();
    fired
}

// ---------------------------------------------------------------------------
// Belief update
// ---------------------------------------------------------------------------

fn tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_string())
        .collect()
}

fn is_relevant(parameter: &str, item: &EvidenceItem) -> bool {
    let param_tokens = tokens(parameter);
    let content_tokens = tokens(&item.content);
    !param_tokens.is_disjoint(&content_tokens)
}

/// KL-divergence-style information gain between two Gaussian summaries.
fn information_gain(old: &BeliefDistribution, new: &BeliefDistribution) -> f64 {
    let v_old = old.variance.max(MIN_VARIANCE);
    let v_new = new.variance.max(MIN_VARIANCE);
    let gain = 0.5
        * ((v_old / v_new).ln() + v_new / v_old + (new.mean - old.mean).powi(2) / v_old - 1.0);
    gain.max(0.0)
}

/// Update one belief against the evidence batch.
///
/// Relevant items are fused sequentially; the move toward the fused
/// posterior is moderated by `adaptation_rate`. With no relevant items
/// the belief undergoes a small time decay instead, and no history entry
/// is appended.
pub fn update_belief(
    belief: &StrategicBelief,
    evidence: &[EvidenceItem],
    adaptation_rate: f64,
    now_utc: &str,
) -> StrategicBelief {
    let rate = adaptation_rate.clamp(0.0, 1.0);
    let relevant: Vec<&EvidenceItem> = evidence
        .iter()
        .filter(|item| is_relevant(&belief.parameter, item))
        .collect();

    if relevant.is_empty() {
        let mut decayed = belief.clone();
        decayed.posterior_distribution.confidence =
            (belief.posterior_distribution.confidence * DECAY_CONFIDENCE_FACTOR).clamp(0.0, 1.0);
        decayed.posterior_distribution.variance =
            belief.posterior_distribution.variance * DECAY_VARIANCE_FACTOR;
        return decayed;
    }

    let mut updated = belief.clone();
    // The pre-update posterior becomes the new prior.
    updated.prior_distribution = belief.posterior_distribution.clone();

    let mut current = belief.posterior_distribution.clone();
    for item in relevant {
        let before = current.clone();
        let prior_precision = 1.0 / current.variance.max(MIN_VARIANCE);
        let observation_precision =
            item.reliability.clamp(0.0, 1.0) * OBSERVATION_PRECISION_SCALE;
        let fused_precision = prior_precision + observation_precision;
        let fused_mean = (prior_precision * current.mean + observation_precision * item.impact)
            / fused_precision;
        let fused_variance = 1.0 / fused_precision;

        current.mean += rate * (fused_mean - current.mean);
        current.variance += rate * (fused_variance - current.variance);

        let gain = information_gain(&before, &current);
        current.confidence =
            (current.confidence + CONFIDENCE_GAIN_SCALE * gain).min(CONFIDENCE_CEILING);

        let timestamp = if parse_utc(&item.timestamp).is_some() {
            item.timestamp.clone()
        } else {
            now_utc.to_string()
        };
        updated.update_history.push(BeliefUpdateEntry {
            timestamp,
            evidence: item.id.clone(),
            information_gain: gain,
        });
    }

    updated.posterior_distribution = current;
    updated
}

// ---------------------------------------------------------------------------
// Recommendation recomputation
// ---------------------------------------------------------------------------

fn action_relevance(action: &StrategyAction, belief: &StrategicBelief) -> f64 {
    let action_tokens: BTreeSet<String> = tokens(&action.id)
        .union(&tokens(&action.description))
        .cloned()
        .collect();
    if action_tokens.is_disjoint(&tokens(&belief.parameter)) {
        WEAK_RELEVANCE
    } else {
        1.0
    }
}

fn classify_reason(
    delta: f64,
    risk: f64,
    confidence: f64,
    conservatism_bias: f64,
) -> &'static str {
    let band = BASE_NEUTRAL_BAND * (1.0 + conservatism_bias.clamp(0.0, 1.0));
    if risk > HIGH_RISK_REASON_THRESHOLD {
        "high_risk"
    } else if confidence < LOW_CONFIDENCE_REASON_THRESHOLD {
        "low_confidence"
    } else if delta > band {
        "value_increase"
    } else if delta < -band {
        "value_decrease"
    } else if delta.abs() <= band * 0.25 {
        "no_change"
    } else {
        "minor_adjustment"
    }
}

fn recompute_recommendations(
    actions: &[StrategyAction],
    beliefs: &[StrategicBelief],
    config: &RecalibrationConfig,
    constraints: &RecalibrationConstraints,
    now: DateTime<Utc>,
) -> Vec<StrategyRecommendation> {
    if beliefs.is_empty() {
        return Vec::new();
    }
    let min_confidence_overall = beliefs
        .iter()
        .map(|b| b.posterior_distribution.confidence)
        .fold(f64::INFINITY, f64::min);
    let validity_hours =
        VALIDITY_FLOOR_HOURS + VALIDITY_SPAN_HOURS * min_confidence_overall.clamp(0.0, 1.0);
    let window_end = now + Duration::seconds((validity_hours * 3600.0) as i64);
    let window = ValidityWindow {
        start: now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        end: window_end.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    };

    let mut recommendations: Vec<StrategyRecommendation> = actions
        .iter()
        .map(|action| {
            let mut expected_value = 0.0;
            let mut strongly_relevant: Vec<&StrategicBelief> = Vec::new();
            for belief in beliefs {
                let relevance = action_relevance(action, belief);
                expected_value += belief.posterior_distribution.mean
                    * belief.posterior_distribution.confidence
                    * relevance;
                if relevance >= 1.0 {
                    strongly_relevant.push(belief);
                }
            }
            let scoped: Vec<&StrategicBelief> = if strongly_relevant.is_empty() {
                beliefs.iter().collect()
            } else {
                strongly_relevant
            };
            let confidence = scoped
                .iter()
                .map(|b| b.posterior_distribution.confidence)
                .sum::<f64>()
                / scoped.len() as f64;
            let risk = (scoped
                .iter()
                .map(|b| b.posterior_distribution.variance)
                .sum::<f64>()
                / scoped.len() as f64
                * VARIANCE_RISK_SCALE)
                .clamp(0.0, 1.0);
            let priority = expected_value * confidence * (1.0 - risk);
            let delta = expected_value - action.expected_value.unwrap_or(expected_value);
            StrategyRecommendation {
                action_id: action.id.clone(),
                priority,
                confidence,
                expected_value,
                risk_level: risk,
                adaptation_reason: classify_reason(
                    delta,
                    risk,
                    confidence,
                    config.conservatism_bias,
                )
                .to_string(),
                validity_window: window.clone(),
            }
        })
        .filter(|rec| rec.confidence >= constraints.min_confidence_threshold)
        .collect();

    recommendations.sort_by(|a, b| {
        b.priority
            .partial_cmp(&a.priority)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.action_id.cmp(&b.action_id))
    });
    recommendations.truncate(constraints.max_strategy_changes as usize);
    recommendations
}

// ---------------------------------------------------------------------------
// Recalibration
// ---------------------------------------------------------------------------

fn mean_abs_diff(old: &[StrategicBelief], new: &[StrategicBelief]) -> f64 {
    if old.is_empty() {
        return 0.0;
    }
    old.iter()
        .zip(new)
        .map(|(a, b)| (a.posterior_distribution.mean - b.posterior_distribution.mean).abs())
        .sum::<f64>()
        / old.len() as f64
}

fn mean_confidence(beliefs: &[StrategicBelief]) -> f64 {
    if beliefs.is_empty() {
        return 0.0;
    }
    beliefs
        .iter()
        .map(|b| b.posterior_distribution.confidence)
        .sum::<f64>()
        / beliefs.len() as f64
}

fn classify_outcome_risk(
    strategy_change: f64,
    recommendations: &[StrategyRecommendation],
) -> RecalibrationRiskAssessment {
    let has_high_risk_rec = recommendations
        .iter()
        .any(|rec| rec.risk_level > HIGH_RISK_REASON_THRESHOLD);
    let (level, rationale) = if strategy_change > HIGH_STRATEGY_CHANGE || has_high_risk_rec {
        (
            RiskRating::High,
            "large strategy shift or high-risk recommendations present",
        )
    } else if strategy_change > MEDIUM_STRATEGY_CHANGE
        || recommendations.iter().any(|rec| rec.risk_level > 0.5)
    {
        (
            RiskRating::Medium,
            "moderate strategy shift; monitor closely",
        )
    } else {
        (RiskRating::Low, "strategy broadly stable")
    };
    RecalibrationRiskAssessment {
        level,
        rationale: rationale.to_string(),
    }
}

/// Run one recalibration cycle.
pub fn recalibrate(request: &RecalibrationRequest, now: DateTime<Utc>) -> RecalibrationOutcome {
    let strategy = &request.current_strategy;
    let hours_since_last_update = parse_utc(&strategy.last_update)
        .map(|last| hours_between(last, now).max(0.0))
        .unwrap_or(0.0);
    let evidence_quality = if request.new_information.is_empty() {
        0.0
    } else {
        request
            .new_information
            .iter()
            .filter(|item| item.reliability > 0.5)
            .count() as f64
            / request.new_information.len() as f64
    };

    let triggered_by = evaluate_triggers(request, now);
    if triggered_by.is_empty() {
        // Stable: beliefs pass through untouched, no recommendations.
        return RecalibrationOutcome {
            should_recalibrate: false,
            triggered_by,
            updated_beliefs: strategy.beliefs.clone(),
            new_recommendations: Vec::new(),
            adaptation_metrics: AdaptationMetrics {
                belief_change_magnitude: 0.0,
                strategy_change_magnitude: 0.0,
                evidence_quality,
                hours_since_last_update,
                confidence_improvement: 0.0,
            },
            risk_assessment: RecalibrationRiskAssessment {
                level: RiskRating::Low,
                rationale: "no trigger fired; strategy unchanged".to_string(),
            },
        };
    }

    let now_utc = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let updated_beliefs: Vec<StrategicBelief> = strategy
        .beliefs
        .iter()
        .map(|belief| {
            update_belief(
                belief,
                &request.new_information,
                request.recalibration_config.adaptation_rate,
                &now_utc,
            )
        })
        .collect();

    let new_recommendations = recompute_recommendations(
        &strategy.actions,
        &updated_beliefs,
        &request.recalibration_config,
        &request.constraints,
        now,
    );

    let belief_change_magnitude = mean_abs_diff(&strategy.beliefs, &updated_beliefs);
    let strategy_change_magnitude = if new_recommendations.is_empty() {
        0.0
    } else {
        new_recommendations
            .iter()
            .map(|rec| {
                let baseline = strategy
                    .actions
                    .iter()
                    .find(|action| action.id == rec.action_id)
                    .and_then(|action| action.expected_value)
                    .unwrap_or(rec.expected_value);
                (rec.expected_value - baseline).abs()
            })
            .sum::<f64>()
            / new_recommendations.len() as f64
    };
    let confidence_improvement =
        mean_confidence(&updated_beliefs) - mean_confidence(&strategy.beliefs);

    let risk_assessment = classify_outcome_risk(strategy_change_magnitude, &new_recommendations);

    RecalibrationOutcome {
        should_recalibrate: true,
        triggered_by,
        updated_beliefs,
        new_recommendations,
        adaptation_metrics: AdaptationMetrics {
            belief_change_magnitude,
            strategy_change_magnitude,
            evidence_quality,
            hours_since_last_update,
            confidence_improvement,
        },
        risk_assessment,
    }
}

/// Run one cycle and emit the completion event.
pub fn recalibrate_with_events(
    request: &RecalibrationRequest,
    now: DateTime<Utc>,
) -> (RecalibrationOutcome, Vec<EngineEvent>) {
    let outcome = recalibrate(request, now);
    let triggered: Vec<String> = outcome
        .triggered_by
        .iter()
        .map(|t| t.to_string())
        .collect();
    let events = vec![EngineEvent::new(
        &request.run_id,
        RECALIBRATION_COMPONENT,
        "recalibration_completed",
        format!(
            "recalibrated={} triggers=[{}] recommendations={}",
            outcome.should_recalibrate,
            triggered.join(","),
            outcome.new_recommendations.len()
        ),
    )];
    (outcome, events)
}
