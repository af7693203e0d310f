//! Feasibility-gated cross-domain strategy transfer.
//!
//! Scores how well a source strategy can survive transplantation into a
//! target domain before attempting it. Below the viability gate the
//! engine short-circuits: the source pattern is returned unmodified with
//! an empty protocol and a floor success prediction. That path is a
//! deliberate early-exit outcome, not an error.
//!
//! Above the gate, the strategy's core logic is re-expressed in the
//! target domain's vocabulary through a fixed term-mapping table, its
//! success conditions and failure risks are extended with target-domain
//! specifics, and a four-phase adaptation protocol with effort estimates
//! is produced. The implementation plan enforces the caller's time budget
//! as a hard gate.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain_knowledge::{
    DomainCharacteristics, DomainContext, InformationAvailability, KnowledgeBase, StrategyPattern,
    TimeScale,
};
use crate::persistence::{AnalysisStore, RecordKind, submit_best_effort};
use crate::telemetry::EngineEvent;

pub const STRATEGY_TRANSFER_COMPONENT: &str = "strategy_transfer";
pub const STRATEGY_TRANSFER_SCHEMA_VERSION: &str = "stratagem-engine.strategy-transfer.v1";

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Feasibility below this gate short-circuits the transfer.
pub const FEASIBILITY_GATE: f64 = 0.3;
/// Success prediction reported by the short-circuit path.
pub const SHORT_CIRCUIT_SUCCESS_PREDICTION: f64 = 0.2;
/// Transferability discount applied to every adapted pattern.
pub const ADAPTATION_PENALTY: f64 = 0.8;
/// Success-prediction clamp bounds.
pub const SUCCESS_PREDICTION_FLOOR: f64 = 0.10;
pub const SUCCESS_PREDICTION_CEILING: f64 = 0.95;

/// Feasibility factor weights. Contributions are signed around the 0.5
/// base, so the score stays in [0, 1].
const WEIGHT_TIME_SCALE: f64 = 0.20;
const WEIGHT_STAKEHOLDER: f64 = 0.10;
const WEIGHT_INFORMATION: f64 = 0.15;
const WEIGHT_RISK_TOLERANCE: f64 = 0.10;
const WEIGHT_COMPETITIVE: f64 = 0.05;
const WEIGHT_TRANSFERABILITY: f64 = 0.30;
const FEASIBILITY_BASE: f64 = 0.5;

/// Protocol phase durations (hours).
const PHASE_DOMAIN_ANALYSIS_HOURS: f64 = 40.0;
const PHASE_STRATEGY_ADAPTATION_HOURS: f64 = 60.0;
const PHASE_RISK_MITIGATION_HOURS: f64 = 30.0;
const PHASE_IMPLEMENTATION_PLANNING_HOURS: f64 = 50.0;

/// Risk-level multipliers for the success prediction.
const RISK_MULTIPLIER_HIGH: f64 = 0.7;
const RISK_MULTIPLIER_MEDIUM: f64 = 0.85;
const RISK_MULTIPLIER_LOW: f64 = 0.95;

/// Domain-specific success-prediction penalties.
const COMPETITIVE_INTENSITY_PENALTY_THRESHOLD: f64 = 0.8;
const COMPETITIVE_INTENSITY_PENALTY: f64 = 0.9;
const REGULATORY_CONSTRAINT_PENALTY_THRESHOLD: f64 = 0.7;
const REGULATORY_CONSTRAINT_PENALTY: f64 = 0.85;

/// Risk-factor thresholds.
const LOW_FEASIBILITY_RISK_THRESHOLD: f64 = 0.5;
const HIGH_STAKEHOLDER_COMPLEXITY: f64 = 7.0;
const HIGH_COMPETITIVE_INTENSITY: f64 = 0.8;
const LOW_CULTURAL_ALIGNMENT: f64 = 0.3;
const RISK_TOLERANCE_RIDER_GAP: f64 = 0.3;
const REGULATORY_RIDER_THRESHOLD: f64 = 0.6;

// ---------------------------------------------------------------------------
// Request types (camelCase wire contract)
// ---------------------------------------------------------------------------

/// Observed performance of the source strategy in its home domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePerformance {
    /// Observed success rate in [0, 1].
    pub observed_success_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<u32>,
}

/// The strategy being transferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStrategy {
    pub pattern: StrategyPattern,
    /// Source domain name; resolved against the knowledge base.
    pub context: String,
    pub performance: SourcePerformance,
}

/// Caller constraints on the transfer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferConstraints {
    /// Implementation time budget; absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_implement_hours: Option<f64>,
}

/// Full transfer request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub run_id: String,
    pub source_strategy: SourceStrategy,
    pub target_domain: String,
    #[serde(default)]
    pub transfer_objectives: Vec<String>,
    #[serde(default)]
    pub constraints: TransferConstraints,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Feasibility score with its per-factor components, for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFeasibility {
    pub score: f64,
    /// Factor name → compatibility in [0, 1].
    pub components: BTreeMap<String, f64>,
}

/// One protocol phase with an effort estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationPhase {
    pub name: String,
    pub duration_hours: f64,
    pub required_roles: Vec<String>,
}

/// Three-level risk severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Qualitative risk assessment with mitigation suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub mitigations: Vec<String>,
}

/// Time-budget check over the protocol. `feasible` is a hard gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationPlan {
    pub total_protocol_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_hours: Option<f64>,
    pub feasible: bool,
    pub recommendation: String,
}

/// Full transfer outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub transfer_feasibility: TransferFeasibility,
    pub adapted_strategy: StrategyPattern,
    pub adaptation_protocol: Vec<AdaptationPhase>,
    pub risk_assessment: RiskAssessment,
    pub implementation_plan: ImplementationPlan,
    pub success_prediction: f64,
}

// ---------------------------------------------------------------------------
// Term mapping
// ---------------------------------------------------------------------------

/// Fixed cross-domain term-mapping table: generic strategic concept →
/// domain-specific vocabulary. Source-domain terms map back through the
/// concept so any catalogued phrasing rewrites cleanly.
const TERM_TABLE: &[(&str, &[(&str, &str)])] = &[
    (
        "attack",
        &[
            ("military", "assault"),
            ("business", "market_entry"),
            ("politics", "campaign"),
            ("sports", "offensive_play"),
            ("evolutionary_biology", "predation"),
        ],
    ),
    (
        "defend",
        &[
            ("military", "fortify"),
            ("business", "retention_program"),
            ("politics", "hold_the_base"),
            ("sports", "zone_defense"),
            ("evolutionary_biology", "camouflage"),
        ],
    ),
    (
        "territory",
        &[
            ("military", "terrain"),
            ("business", "market_segment"),
            ("politics", "constituency"),
            ("sports", "field_position"),
            ("evolutionary_biology", "niche"),
        ],
    ),
    (
        "opponent",
        &[
            ("military", "adversary"),
            ("business", "competitor"),
            ("politics", "rival_party"),
            ("sports", "opposing_team"),
            ("evolutionary_biology", "rival_species"),
        ],
    ),
    (
        "resources",
        &[
            ("military", "materiel"),
            ("business", "capital"),
            ("politics", "political_capital"),
            ("sports", "roster_depth"),
            ("evolutionary_biology", "energy_budget"),
        ],
    ),
    (
        "alliance",
        &[
            ("military", "combined_arms_coalition"),
            ("business", "joint_venture"),
            ("politics", "governing_coalition"),
            ("sports", "line_combination"),
            ("evolutionary_biology", "symbiosis"),
        ],
    ),
];

fn target_term(concept: &str, target_domain: &str) -> Option<&'static str> {
    let (_, terms) = TERM_TABLE.iter().copied().find(|(c, _)| *c == concept)?;
    terms
        .iter()
        .copied()
        .find(|(domain, _)| *domain == target_domain)
        .map(|(_, term)| term)
}

fn concept_for_word(word: &str) -> Option<&'static str> {
    TERM_TABLE.iter().copied().find_map(|(concept, terms)| {
        let matches = concept == word || terms.iter().copied().any(|(_, term)| term == word);
        if matches { Some(concept) } else { None }
    })
}

/// Rewrite text by substituting domain vocabulary, word by word.
/// Words outside the term table pass through untouched.
pub fn rewrite_terminology(text: &str, target_domain: &str) -> String {
    text.split_whitespace()
        .map(|raw| {
            let trimmed = raw.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_');
            let lowered = trimmed.to_lowercase();
            match concept_for_word(&lowered).and_then(|c| target_term(c, target_domain)) {
                Some(replacement) if !trimmed.is_empty() => raw.replacen(trimmed, replacement, 1),
                _ => raw.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Feasibility
// ---------------------------------------------------------------------------

fn neutral_characteristics() -> DomainCharacteristics {
    DomainCharacteristics {
        time_scale: TimeScale::Medium,
        stakeholder_complexity: 5.0,
        information_availability: InformationAvailability::Partial,
        regulatory_constraints: 0.5,
        competitive_intensity: 0.5,
        risk_tolerance: 0.5,
    }
}

fn resolve_characteristics(kb: &dyn KnowledgeBase, domain: &str) -> DomainCharacteristics {
    kb.profile(domain)
        .map(|profile| profile.characteristics.clone())
        .unwrap_or_else(neutral_characteristics)
}

fn cultural_alignment(kb: &dyn KnowledgeBase, source: &str, target: &str) -> f64 {
    let empty = BTreeSet::new();
    let source_factors = kb
        .profile(source)
        .map(|p| &p.cultural_factors)
        .unwrap_or(&empty);
    let target_factors = kb
        .profile(target)
        .map(|p| &p.cultural_factors)
        .unwrap_or(&empty);
    let union = source_factors.union(target_factors).count();
    if union == 0 {
        return 0.0;
    }
    source_factors.intersection(target_factors).count() as f64 / union as f64
}

/// Compute transfer feasibility with per-factor components.
pub fn compute_feasibility(
    pattern_transferability: f64,
    source: &DomainCharacteristics,
    target: &DomainCharacteristics,
) -> TransferFeasibility {
    let time_compat =
        1.0 - (source.time_scale.rank() - target.time_scale.rank()).abs() as f64 / 3.0;
    let stakeholder_compat =
        1.0 - (source.stakeholder_complexity - target.stakeholder_complexity).abs() / 9.0;
    let info_compat = 1.0
        - (source.information_availability.rank() - target.information_availability.rank()).abs()
            as f64
            / 2.0;
    let risk_compat = 1.0 - (source.risk_tolerance - target.risk_tolerance).abs();
    let competitive_compat = 1.0 - (source.competitive_intensity - target.competitive_intensity).abs();
    let transferability = pattern_transferability.clamp(0.0, 1.0);

    let score = FEASIBILITY_BASE
        + WEIGHT_TIME_SCALE * (time_compat - 0.5)
        + WEIGHT_STAKEHOLDER * (stakeholder_compat - 0.5)
        + WEIGHT_INFORMATION * (info_compat - 0.5)
        + WEIGHT_RISK_TOLERANCE * (risk_compat - 0.5)
        + WEIGHT_COMPETITIVE * (competitive_compat - 0.5)
        + WEIGHT_TRANSFERABILITY * (transferability - 0.5);

    let mut components = BTreeMap::new();
    components.insert("time_scale_compatibility".to_string(), time_compat);
    components.insert("stakeholder_compatibility".to_string(), stakeholder_compat);
    components.insert("information_compatibility".to_string(), info_compat);
    components.insert("risk_tolerance_alignment".to_string(), risk_compat);
    components.insert("competitive_intensity_similarity".to_string(), competitive_compat);
    components.insert("pattern_transferability".to_string(), transferability);

    TransferFeasibility {
        score: score.clamp(0.0, 1.0),
        components,
    }
}

// ---------------------------------------------------------------------------
// Adaptation
// ---------------------------------------------------------------------------

fn adapt_pattern(
    pattern: &StrategyPattern,
    target_domain: &str,
    source: &DomainCharacteristics,
    target: &DomainCharacteristics,
    target_profile: Option<&DomainContext>,
) -> StrategyPattern {
    let mut core_logic = rewrite_terminology(&pattern.core_logic, target_domain);
    if source.time_scale != target.time_scale {
        core_logic.push_str(&format!(
            " Timing: recalibrate from {}-term tempo to {}-term execution.",
            source.time_scale, target.time_scale
        ));
    }
    if let Some(profile) = target_profile
        && !profile.cultural_factors.is_empty()
    {
        let factors: Vec<&str> = profile.cultural_factors.iter().map(String::as_str).collect();
        core_logic.push_str(&format!(
            " Cultural context: account for {}.",
            factors.join(", ")
        ));
    }

    let mut success_conditions = pattern.success_conditions.clone();
    if let Some(profile) = target_profile {
        for metric in &profile.success_metrics {
            success_conditions.push(format!("achieve measurable gains in {metric}"));
        }
    }
    if (source.risk_tolerance - target.risk_tolerance).abs() > RISK_TOLERANCE_RIDER_GAP {
        success_conditions.push(format!(
            "recalibrate risk appetite toward the target's {:.1} tolerance",
            target.risk_tolerance
        ));
    }
    if target.regulatory_constraints > REGULATORY_RIDER_THRESHOLD {
        success_conditions.push("secure regulatory clearance before execution".to_string());
    }

    let mut failure_risks = pattern.failure_risks.clone();
    if target.competitive_intensity > 0.7 {
        failure_risks.push("intense competitive response in the target domain".to_string());
    }
    if target.stakeholder_complexity > HIGH_STAKEHOLDER_COMPLEXITY {
        failure_risks.push("stakeholder misalignment across a complex actor network".to_string());
    }
    if target.information_availability == InformationAvailability::Limited {
        failure_risks.push("commitment under limited information".to_string());
    }

    let mut adaptation_requirements = pattern.adaptation_requirements.clone();
    adaptation_requirements.push(format!(
        "fluency in {target_domain} domain vocabulary and norms"
    ));

    StrategyPattern {
        id: format!("{}-adapted-{target_domain}", pattern.id),
        name: format!("{} ({target_domain} adaptation)", pattern.name),
        source_domain: pattern.source_domain.clone(),
        core_logic,
        success_conditions,
        failure_risks,
        adaptation_requirements,
        transferability_score: (pattern.transferability_score * ADAPTATION_PENALTY).clamp(0.0, 1.0),
    }
}

fn adaptation_protocol() -> Vec<AdaptationPhase> {
    vec![
        AdaptationPhase {
            name: "Domain Analysis & Planning".to_string(),
            duration_hours: PHASE_DOMAIN_ANALYSIS_HOURS,
            required_roles: vec!["domain_analyst".to_string(), "strategist".to_string()],
        },
        AdaptationPhase {
            name: "Strategy Adaptation".to_string(),
            duration_hours: PHASE_STRATEGY_ADAPTATION_HOURS,
            required_roles: vec!["strategist".to_string(), "domain_expert".to_string()],
        },
        AdaptationPhase {
            name: "Risk Mitigation".to_string(),
            duration_hours: PHASE_RISK_MITIGATION_HOURS,
            required_roles: vec!["risk_officer".to_string()],
        },
        AdaptationPhase {
            name: "Implementation Planning".to_string(),
            duration_hours: PHASE_IMPLEMENTATION_PLANNING_HOURS,
            required_roles: vec!["program_manager".to_string(), "strategist".to_string()],
        },
    ]
}

fn assess_risk(
    feasibility: f64,
    target: &DomainCharacteristics,
    cultural_alignment_score: f64,
) -> RiskAssessment {
    let mut factors = Vec::new();
    let mut mitigations = Vec::new();

    if feasibility < LOW_FEASIBILITY_RISK_THRESHOLD {
        factors.push("low transfer feasibility".to_string());
        mitigations.push("run a limited pilot before committing".to_string());
    }
    if target.stakeholder_complexity > HIGH_STAKEHOLDER_COMPLEXITY {
        factors.push("high stakeholder complexity".to_string());
        mitigations.push("map stakeholders and assign dedicated liaisons".to_string());
    }
    if target.information_availability == InformationAvailability::Limited {
        factors.push("limited information availability".to_string());
        mitigations.push("invest in intelligence gathering before each phase gate".to_string());
    }
    if target.competitive_intensity > HIGH_COMPETITIVE_INTENSITY {
        factors.push("high competitive intensity".to_string());
        mitigations.push("prepare counter-responses to fast competitor reaction".to_string());
    }
    if cultural_alignment_score < LOW_CULTURAL_ALIGNMENT {
        factors.push("low cultural alignment between domains".to_string());
        mitigations.push("engage native domain expertise for translation".to_string());
    }

    let level = match factors.len() {
        0 => RiskLevel::Low,
        1 | 2 => RiskLevel::Medium,
        _ => RiskLevel::High,
    };
    RiskAssessment {
        level,
        factors,
        mitigations,
    }
}

fn implementation_plan(
    protocol: &[AdaptationPhase],
    budget_hours: Option<f64>,
) -> ImplementationPlan {
    let total: f64 = protocol.iter().map(|phase| phase.duration_hours).sum();
    let (feasible, recommendation) = match budget_hours {
        Some(budget) if total > budget => (
            false,
            format!(
                "protocol requires {total:.0}h but the budget is {budget:.0}h; extend the timeline before proceeding"
            ),
        ),
        _ => (
            true,
            format!("protocol fits the implementation budget at {total:.0}h"),
        ),
    };
    ImplementationPlan {
        total_protocol_hours: total,
        time_budget_hours: budget_hours,
        feasible,
        recommendation,
    }
}

fn predict_success(
    observed_rate: f64,
    feasibility: f64,
    risk_level: RiskLevel,
    target: &DomainCharacteristics,
) -> f64 {
    let risk_multiplier = match risk_level {
        RiskLevel::High => RISK_MULTIPLIER_HIGH,
        RiskLevel::Medium => RISK_MULTIPLIER_MEDIUM,
        RiskLevel::Low => RISK_MULTIPLIER_LOW,
    };
    let mut prediction = observed_rate.clamp(0.0, 1.0) * feasibility * risk_multiplier;
    if target.competitive_intensity > COMPETITIVE_INTENSITY_PENALTY_THRESHOLD {
        prediction *= COMPETITIVE_INTENSITY_PENALTY;
    }
    if target.regulatory_constraints > REGULATORY_CONSTRAINT_PENALTY_THRESHOLD {
        prediction *= REGULATORY_CONSTRAINT_PENALTY;
    }
    prediction.clamp(SUCCESS_PREDICTION_FLOOR, SUCCESS_PREDICTION_CEILING)
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

/// Run the transfer analysis.
pub fn transfer(request: &TransferRequest, kb: &dyn KnowledgeBase) -> TransferOutcome {
    let source_domain = if request.source_strategy.context.is_empty() {
        request.source_strategy.pattern.source_domain.clone()
    } else {
        request.source_strategy.context.clone()
    };
    let source = resolve_characteristics(kb, &source_domain);
    let target = resolve_characteristics(kb, &request.target_domain);
    let pattern = &request.source_strategy.pattern;

    let transfer_feasibility =
        compute_feasibility(pattern.transferability_score, &source, &target);

    if transfer_feasibility.score < FEASIBILITY_GATE {
        // Short-circuit: no adaptation work is performed.
        return TransferOutcome {
            transfer_feasibility,
            adapted_strategy: pattern.clone(),
            adaptation_protocol: Vec::new(),
            risk_assessment: RiskAssessment {
                level: RiskLevel::High,
                factors: vec!["transfer feasibility below viability gate".to_string()],
                mitigations: vec![
                    "select a structurally closer source strategy".to_string(),
                    "revisit after target-domain constraints change".to_string(),
                ],
            },
            implementation_plan: ImplementationPlan {
                total_protocol_hours: 0.0,
                time_budget_hours: request.constraints.time_to_implement_hours,
                feasible: false,
                recommendation: "transfer not viable; adaptation was not attempted".to_string(),
            },
            success_prediction: SHORT_CIRCUIT_SUCCESS_PREDICTION,
        };
    }

    let alignment = cultural_alignment(kb, &source_domain, &request.target_domain);
    let adapted_strategy = adapt_pattern(
        pattern,
        &request.target_domain,
        &source,
        &target,
        kb.profile(&request.target_domain),
    );
    let adaptation_protocol = adaptation_protocol();
    let risk_assessment = assess_risk(transfer_feasibility.score, &target, alignment);
    let implementation_plan = implementation_plan(
        &adaptation_protocol,
        request.constraints.time_to_implement_hours,
    );
    let success_prediction = predict_success(
        request.source_strategy.performance.observed_success_rate,
        transfer_feasibility.score,
        risk_assessment.level,
        &target,
    );

    TransferOutcome {
        transfer_feasibility,
        adapted_strategy,
        adaptation_protocol,
        risk_assessment,
        implementation_plan,
        success_prediction,
    }
}

/// Run the transfer and submit the result record best-effort.
pub fn transfer_and_persist(
    request: &TransferRequest,
    kb: &dyn KnowledgeBase,
    store: &dyn AnalysisStore,
    completed_at_utc: &str,
) -> (TransferOutcome, Vec<EngineEvent>) {
    let outcome = transfer(request, kb);
    let mut events = vec![EngineEvent::new(
        &request.run_id,
        STRATEGY_TRANSFER_COMPONENT,
        "transfer_completed",
        format!(
            "feasibility={:.2} success_prediction={:.2} risk={}",
            outcome.transfer_feasibility.score,
            outcome.success_prediction,
            outcome.risk_assessment.level
        ),
    )];
    let payload = serde_json::json!({
        "sourcePatternId": request.source_strategy.pattern.id,
        "adaptedStrategy": outcome.adapted_strategy,
        "transferFeasibility": outcome.transfer_feasibility.score,
        "successPrediction": outcome.success_prediction,
    });
    events.push(submit_best_effort(
        store,
        RecordKind::TransferResult,
        &request.run_id,
        completed_at_utc,
        payload,
    ));
    (outcome, events)
}
