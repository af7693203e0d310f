//! Cross-domain structural-analogy discovery.
//!
//! Builds a structural signature of the current scenario, scores it
//! against every eligible catalogued pattern, and returns ranked
//! [`StrategicAnalogy`] records with adaptation guidance. Same-domain
//! patterns are excluded below a high abstraction level so low-abstraction
//! searches return genuinely cross-domain precedents.
//!
//! Similarity is a weighted blend of four factors (0.25 each): player-count
//! closeness, information-structure equality, strategic-dynamics token
//! overlap (Jaccard over a fixed concept vocabulary), and a flat
//! cross-domain bonus when domain fingerprints differ. The weighting
//! constants mirror the calibrated production values and are preserved as
//! named defaults rather than re-derived.
//!
//! Failure semantics: empty or malformed scenario fields degrade to a
//! zero-analogy, low-reliability response, never an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain_knowledge::{
    DomainFingerprint, DomainPattern, InformationAvailability, KnowledgeBase, PlayerStructure,
};
use crate::persistence::{AnalysisStore, RecordKind, submit_best_effort};
use crate::telemetry::EngineEvent;

pub const SYMMETRY_MINING_COMPONENT: &str = "symmetry_mining";
pub const SYMMETRY_MINING_SCHEMA_VERSION: &str = "stratagem-engine.symmetry-mining.v1";

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Weight of each similarity factor. Four factors, equally weighted.
pub const SIMILARITY_FACTOR_WEIGHT: f64 = 0.25;
/// Minimum similarity for a pattern to become an analogy.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;
/// Maximum analogies returned.
pub const DEFAULT_MAX_ANALOGIES: u32 = 5;
/// Default abstraction level when the caller omits one.
pub const DEFAULT_ABSTRACTION_LEVEL: u8 = 5;
/// Abstraction level at which same-domain patterns become eligible.
pub const SAME_DOMAIN_ABSTRACTION_FLOOR: u8 = 8;
/// Blend weights for the final analogy ranking.
pub const RANKING_SIMILARITY_WEIGHT: f64 = 0.6;
pub const RANKING_SUCCESS_WEIGHT: f64 = 0.4;
/// Reliability below which the response flags itself for human review.
pub const HUMAN_REVIEW_RELIABILITY_FLOOR: f64 = 0.5;

/// Fixed vocabulary of strategic concepts used for dynamics overlap.
///
/// Dynamics labels in the catalogue and payoff-structure labels from
/// callers are reduced to tokens from this list before the Jaccard
/// comparison; everything else is noise.
pub const STRATEGIC_CONCEPT_VOCABULARY: &[&str] = &[
    "aggression",
    "asymmetric",
    "attrition",
    "avoidance",
    "coalition",
    "commitment",
    "competition",
    "cooperation",
    "coordination",
    "deception",
    "defense",
    "differentiation",
    "endurance",
    "escalation",
    "fragmentation",
    "innovation",
    "maneuver",
    "network",
    "pacing",
    "positioning",
    "pressure",
    "reactive",
    "sacrifice",
    "signaling",
    "tempo",
];

// ---------------------------------------------------------------------------
// Request types (camelCase wire contract)
// ---------------------------------------------------------------------------

/// Structural elements of the scenario under analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicElements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_count: Option<u32>,
    /// Free-text payoff-structure label, e.g. "zero-sum escalation".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payoff_structure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information_availability: Option<InformationAvailability>,
    #[serde(default)]
    pub action_space: Vec<String>,
}

/// The scenario being mined for precedents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDescription {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub stakeholders: Vec<String>,
    #[serde(default)]
    pub strategic_elements: StrategicElements,
}

/// Mining configuration; every knob has a calibrated default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningConfig {
    /// Abstraction level 1–10, clamped.
    #[serde(default = "default_abstraction_level")]
    pub abstraction_level: u8,
    #[serde(default = "default_max_analogies")]
    pub max_analogies: u32,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Domains to search; empty means the whole catalogue.
    #[serde(default)]
    pub domains_to_search: Vec<String>,
}

fn default_abstraction_level() -> u8 {
    DEFAULT_ABSTRACTION_LEVEL
}

fn default_max_analogies() -> u32 {
    DEFAULT_MAX_ANALOGIES
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            abstraction_level: DEFAULT_ABSTRACTION_LEVEL,
            max_analogies: DEFAULT_MAX_ANALOGIES,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            domains_to_search: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario signature
// ---------------------------------------------------------------------------

/// Structural signature computed from the scenario description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSignature {
    pub player_count: u32,
    pub information_class: InformationAvailability,
    pub payoff_structure_label: String,
    pub stakeholder_count: u32,
    pub action_space_size: u32,
    pub domain_fingerprint: DomainFingerprint,
    pub abstraction_level: u8,
}

/// Build the scenario signature. Missing fields take structural defaults;
/// the abstraction level is clamped to 1–10.
pub fn build_signature(
    scenario: &ScenarioDescription,
    config: &MiningConfig,
    kb: &dyn KnowledgeBase,
) -> ScenarioSignature {
    let stakeholder_count = scenario.stakeholders.len() as u32;
    let player_count = scenario
        .strategic_elements
        .player_count
        .unwrap_or(stakeholder_count);
    ScenarioSignature {
        player_count,
        information_class: scenario
            .strategic_elements
            .information_availability
            .unwrap_or(InformationAvailability::Partial),
        payoff_structure_label: scenario
            .strategic_elements
            .payoff_structure
            .clone()
            .unwrap_or_default()
            .to_lowercase(),
        stakeholder_count,
        action_space_size: scenario.strategic_elements.action_space.len() as u32,
        domain_fingerprint: kb.fingerprint(&scenario.domain),
        abstraction_level: config.abstraction_level.clamp(1, 10),
    }
}

// ---------------------------------------------------------------------------
// Similarity scoring
// ---------------------------------------------------------------------------

fn concept_tokens(text: &str) -> BTreeSet<&'static str> {
    let lowered = text.to_lowercase();
    let tokens: BTreeSet<String> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();
    STRATEGIC_CONCEPT_VOCABULARY
        .iter()
        .copied()
        .filter(|concept| tokens.contains(*concept))
        .collect()
}

fn jaccard(a: &BTreeSet<&'static str>, b: &BTreeSet<&'static str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn player_closeness(signature_players: u32, structure: PlayerStructure) -> f64 {
    let diff = signature_players.abs_diff(structure.representative_count());
    if diff == 0 {
        1.0
    } else if diff <= 1 {
        0.5
    } else {
        0.0
    }
}

/// Structural similarity between the scenario and one pattern, in [0, 1].
pub fn structural_similarity(
    signature: &ScenarioSignature,
    pattern: &DomainPattern,
    pattern_fingerprint: DomainFingerprint,
) -> f64 {
    let player_factor = player_closeness(signature.player_count, pattern.player_structure);
    let info_factor = if signature.information_class == pattern.information_structure {
        1.0
    } else {
        0.0
    };
    let dynamics_factor = jaccard(
        &concept_tokens(&signature.payoff_structure_label),
        &concept_tokens(&pattern.strategic_dynamics),
    );
    let cross_domain_factor = if signature.domain_fingerprint != pattern_fingerprint {
        1.0
    } else {
        0.0
    };
    let score = SIMILARITY_FACTOR_WEIGHT * player_factor
        + SIMILARITY_FACTOR_WEIGHT * info_factor
        + SIMILARITY_FACTOR_WEIGHT * dynamics_factor
        + SIMILARITY_FACTOR_WEIGHT * cross_domain_factor;
    score.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Analogy construction
// ---------------------------------------------------------------------------

/// Descriptors of the matched pattern, carried for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralMatch {
    pub pattern_name: String,
    pub player_structure: PlayerStructure,
    pub strategic_dynamics: String,
    pub information_structure: InformationAvailability,
}

/// Fixed implementation-guidance template attached to every analogy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationGuidance {
    pub immediate_actions: Vec<String>,
    pub adaptation_steps: Vec<String>,
    pub risk_indicators: Vec<String>,
    pub success_probability_conditionals: Vec<String>,
}

/// One ranked cross-domain analogy. Created per call, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicAnalogy {
    pub source_domain: String,
    pub target_domain: String,
    pub structural_similarity: f64,
    /// The matched pattern's historical success rate.
    pub success_probability: f64,
    pub structural_match: StructuralMatch,
    pub analogous_strategies: Vec<String>,
    pub meta_strategic_principles: Vec<String>,
    pub implementation_guidance: ImplementationGuidance,
}

impl StrategicAnalogy {
    /// Ranking score: similarity and historical success blended 0.6/0.4.
    pub fn blended_score(&self) -> f64 {
        RANKING_SIMILARITY_WEIGHT * self.structural_similarity
            + RANKING_SUCCESS_WEIGHT * self.success_probability
    }
}

fn adapted_strategy_suggestions(pattern: &DomainPattern) -> Vec<String> {
    let tokens = concept_tokens(&pattern.strategic_dynamics);
    let mut suggestions = Vec::new();
    if tokens.contains("cooperation") || tokens.contains("coordination") {
        suggestions
            .push("establish a cooperative framework with explicitly aligned incentives".to_string());
    }
    if tokens.contains("escalation") || tokens.contains("pressure") {
        suggestions.push("prepare a de-escalation offramp before committing resources".to_string());
    }
    if tokens.contains("deception") || tokens.contains("signaling") {
        suggestions.push("invest in information advantage before revealing intent".to_string());
    }
    if tokens.contains("attrition") || tokens.contains("endurance") {
        suggestions.push("position for resource endurance over quick wins".to_string());
    }
    if tokens.contains("fragmentation") || tokens.contains("coalition") {
        suggestions.push("address coalition alignment before contesting the center".to_string());
    }
    if suggestions.is_empty() {
        suggestions.push(format!(
            "adapt the {} posture to the target domain's constraints",
            pattern.name
        ));
    }
    suggestions
}

fn meta_principles(fingerprint: DomainFingerprint, pattern: &DomainPattern) -> Vec<String> {
    let mut principles = vec![format!(
        "the {} structure recurs across domains; the {} pattern is one instantiation",
        pattern.player_structure, pattern.name
    )];
    let category_principle = match fingerprint {
        DomainFingerprint::PowerProjection => "concentrate force where the opponent is weakest",
        DomainFingerprint::EconomicCompetition => "compete on structure, not on price alone",
        DomainFingerprint::CoalitionDynamics => "the marginal ally decides the outcome",
        DomainFingerprint::ZeroSumContest => "tempo is a resource; spend it deliberately",
        DomainFingerprint::SelectionPressure => "differentiation beats head-on contests",
        DomainFingerprint::General => "structural analogies transfer; surface details do not",
    };
    principles.push(category_principle.to_string());
    principles
}

fn implementation_guidance(pattern: &DomainPattern, similarity: f64) -> ImplementationGuidance {
    ImplementationGuidance {
        immediate_actions: vec![
            format!("map current actors onto the {} structure", pattern.player_structure),
            "inventory the resources the pattern presumes".to_string(),
        ],
        adaptation_steps: vec![
            format!(
                "translate the {} dynamics into the target domain's vocabulary",
                pattern.name
            ),
            "pilot the adapted strategy at reduced scale".to_string(),
            "define measurable checkpoints before full commitment".to_string(),
        ],
        risk_indicators: vec![
            "structural drift between scenario and pattern assumptions".to_string(),
            "counterparty behavior departing from the pattern's dynamics".to_string(),
        ],
        success_probability_conditionals: vec![
            format!(
                "historical rate {:.0}% assumes the pattern's preconditions hold",
                pattern.success_rate * 100.0
            ),
            format!(
                "structural similarity {similarity:.2} discounts confidence proportionally"
            ),
        ],
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Most-frequent-source-domain themes plus static display clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbstractionInsights {
    pub emergent_themes: Vec<String>,
    pub domain_clusters: BTreeMap<String, Vec<String>>,
}

/// Response-level reliability estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPatternRecognition {
    pub reliability: f64,
    pub analogy_count: u32,
    pub average_similarity: f64,
    pub average_success_probability: f64,
    /// True when the reliability estimate is too low to act on without
    /// human review.
    pub requires_human_review: bool,
}

/// Full mining output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternDiscovery {
    pub signature: ScenarioSignature,
    pub analogies: Vec<StrategicAnalogy>,
    pub abstraction_insights: AbstractionInsights,
    pub meta_pattern_recognition: MetaPatternRecognition,
}

fn domain_clusters() -> BTreeMap<String, Vec<String>> {
    let mut clusters = BTreeMap::new();
    clusters.insert(
        "strategic".to_string(),
        vec!["military".to_string(), "politics".to_string()],
    );
    clusters.insert(
        "competitive".to_string(),
        vec![
            "business".to_string(),
            "sports".to_string(),
            "evolutionary_biology".to_string(),
        ],
    );
    clusters.insert(
        "cooperative".to_string(),
        vec!["politics".to_string(), "business".to_string()],
    );
    clusters
}

fn emergent_themes(analogies: &[StrategicAnalogy]) -> Vec<String> {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for analogy in analogies {
        *counts.entry(analogy.source_domain.as_str()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .map(|(domain, count)| format!("{domain} precedents dominate ({count} analogies)"))
        .collect()
}

fn reliability_estimate(analogies: &[StrategicAnalogy]) -> MetaPatternRecognition {
    if analogies.is_empty() {
        return MetaPatternRecognition {
            reliability: 0.1,
            analogy_count: 0,
            average_similarity: 0.0,
            average_success_probability: 0.0,
            requires_human_review: true,
        };
    }
    let count = analogies.len() as f64;
    let average_similarity = analogies
        .iter()
        .map(|a| a.structural_similarity)
        .sum::<f64>()
        / count;
    let average_success_probability = analogies
        .iter()
        .map(|a| a.success_probability)
        .sum::<f64>()
        / count;
    let base = RANKING_SIMILARITY_WEIGHT * average_similarity
        + RANKING_SUCCESS_WEIGHT * average_success_probability;
    let count_factor = (count.min(DEFAULT_MAX_ANALOGIES as f64)) / DEFAULT_MAX_ANALOGIES as f64;
    let reliability = (base * (0.5 + 0.5 * count_factor)).clamp(0.0, 1.0);
    MetaPatternRecognition {
        reliability,
        analogy_count: analogies.len() as u32,
        average_similarity,
        average_success_probability,
        requires_human_review: reliability < HUMAN_REVIEW_RELIABILITY_FLOOR,
    }
}

/// Discover ranked cross-domain analogies for a scenario.
pub fn discover(
    scenario: &ScenarioDescription,
    config: &MiningConfig,
    kb: &dyn KnowledgeBase,
) -> PatternDiscovery {
    let signature = build_signature(scenario, config, kb);
    let search_domains: Vec<String> = if config.domains_to_search.is_empty() {
        kb.domains()
    } else {
        kb.domains()
            .into_iter()
            .filter(|d| config.domains_to_search.iter().any(|wanted| wanted == d))
            .collect()
    };

    let mut analogies: Vec<StrategicAnalogy> = Vec::new();
    for domain in &search_domains {
        let same_domain = *domain == scenario.domain;
        if same_domain && signature.abstraction_level < SAME_DOMAIN_ABSTRACTION_FLOOR {
            continue;
        }
        let fingerprint = kb.fingerprint(domain);
        for pattern in kb.patterns(domain) {
            let similarity = structural_similarity(&signature, pattern, fingerprint);
            if similarity < config.similarity_threshold {
                continue;
            }
            analogies.push(StrategicAnalogy {
                source_domain: domain.clone(),
                target_domain: scenario.domain.clone(),
                structural_similarity: similarity,
                success_probability: pattern.success_rate.clamp(0.0, 1.0),
                structural_match: StructuralMatch {
                    pattern_name: pattern.name.clone(),
                    player_structure: pattern.player_structure,
                    strategic_dynamics: pattern.strategic_dynamics.clone(),
                    information_structure: pattern.information_structure,
                },
                analogous_strategies: adapted_strategy_suggestions(pattern),
                meta_strategic_principles: meta_principles(fingerprint, pattern),
                implementation_guidance: implementation_guidance(pattern, similarity),
            });
        }
    }

    analogies.sort_by(|a, b| {
        b.blended_score()
            .partial_cmp(&a.blended_score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source_domain.cmp(&b.source_domain))
            .then_with(|| a.structural_match.pattern_name.cmp(&b.structural_match.pattern_name))
    });
    analogies.truncate(config.max_analogies as usize);

    let meta_pattern_recognition = reliability_estimate(&analogies);
    let abstraction_insights = AbstractionInsights {
        emergent_themes: emergent_themes(&analogies),
        domain_clusters: domain_clusters(),
    };

    PatternDiscovery {
        signature,
        analogies,
        abstraction_insights,
        meta_pattern_recognition,
    }
}

/// Discover and submit each analogy as a strategic-pattern record,
/// best-effort. The discovery result is returned regardless of
/// persistence outcome.
pub fn discover_and_persist(
    run_id: &str,
    scenario: &ScenarioDescription,
    config: &MiningConfig,
    kb: &dyn KnowledgeBase,
    store: &dyn AnalysisStore,
    completed_at_utc: &str,
) -> (PatternDiscovery, Vec<EngineEvent>) {
    let discovery = discover(scenario, config, kb);
    let mut events = vec![EngineEvent::new(
        run_id,
        SYMMETRY_MINING_COMPONENT,
        "pattern_discovery_completed",
        format!(
            "analogies={} reliability={:.2}",
            discovery.meta_pattern_recognition.analogy_count,
            discovery.meta_pattern_recognition.reliability
        ),
    )];
    for analogy in &discovery.analogies {
        let payload = serde_json::to_value(analogy).unwrap_or(serde_json::Value::Null);
        events.push(submit_best_effort(
            store,
            RecordKind::StrategicPattern,
            run_id,
            completed_at_utc,
            payload,
        ));
    }
    (discovery, events)
}

/// Per-analogy recommendation summary for the endpoint response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningRecommendation {
    pub source_pattern: String,
    pub source_domain: String,
    pub recommended_strategy: String,
    pub confidence: f64,
}

/// Flatten the top analogies into display recommendations.
pub fn recommendations_from(discovery: &PatternDiscovery) -> Vec<MiningRecommendation> {
    discovery
        .analogies
        .iter()
        .map(|analogy| MiningRecommendation {
            source_pattern: analogy.structural_match.pattern_name.clone(),
            source_domain: analogy.source_domain.clone(),
            recommended_strategy: analogy
                .analogous_strategies
                .first()
                .cloned()
                .unwrap_or_default(),
            confidence: analogy.blended_score(),
        })
        .collect()
}
