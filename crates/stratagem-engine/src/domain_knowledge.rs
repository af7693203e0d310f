//! Static catalogue of strategic domains and patterns.
//!
//! Configuration data, not logic: engines receive the catalogue through
//! the read-only [`KnowledgeBase`] trait and never construct it
//! themselves. Adding a domain or a pattern touches only the
//! [`StaticKnowledgeBase::builtin`] constructors.
//!
//! The catalogue carries two views of each domain:
//! - a [`DomainContext`] profile (time scale, stakeholder complexity,
//!   information availability, constraint/intensity/risk scores, metric
//!   and cultural vocabularies) consumed by the transfer engine, and
//! - [`DomainPattern`] records (structural descriptors plus historical
//!   success rates) consumed by the symmetry mining engine.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DOMAIN_KNOWLEDGE_COMPONENT: &str = "domain_knowledge";
pub const DOMAIN_KNOWLEDGE_SCHEMA_VERSION: &str = "stratagem-engine.domain-knowledge.v1";

// ---------------------------------------------------------------------------
// Structural descriptors
// ---------------------------------------------------------------------------

/// Ordered decision time scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeScale {
    Immediate,
    Short,
    Medium,
    Long,
}

impl TimeScale {
    /// Position on the ordered scale, for distance computations.
    pub fn rank(&self) -> i32 {
        match self {
            Self::Immediate => 0,
            Self::Short => 1,
            Self::Medium => 2,
            Self::Long => 3,
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Immediate => "immediate",
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        };
        f.write_str(s)
    }
}

/// Ordered information-availability class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InformationAvailability {
    Complete,
    Partial,
    Limited,
}

impl InformationAvailability {
    pub fn rank(&self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Partial => 1,
            Self::Limited => 2,
        }
    }
}

impl fmt::Display for InformationAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Limited => "limited",
        };
        f.write_str(s)
    }
}

/// Player-structure class of a strategic situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStructure {
    /// Two opposed principals.
    Dyadic,
    /// A handful of actors, each individually significant.
    SmallGroup,
    /// Many actors, shifting alignments.
    MultiActor,
}

impl PlayerStructure {
    /// Representative player count for closeness comparisons.
    pub fn representative_count(&self) -> u32 {
        match self {
            Self::Dyadic => 2,
            Self::SmallGroup => 4,
            Self::MultiActor => 8,
        }
    }
}

impl fmt::Display for PlayerStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dyadic => "dyadic",
            Self::SmallGroup => "small_group",
            Self::MultiActor => "multi_actor",
        };
        f.write_str(s)
    }
}

/// Abstract category a domain maps onto, independent of its vocabulary.
///
/// A fixed fingerprint per domain name; differing fingerprints earn the
/// cross-domain bonus during similarity scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainFingerprint {
    PowerProjection,
    EconomicCompetition,
    CoalitionDynamics,
    ZeroSumContest,
    SelectionPressure,
    General,
}

impl fmt::Display for DomainFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PowerProjection => "power_projection",
            Self::EconomicCompetition => "economic_competition",
            Self::CoalitionDynamics => "coalition_dynamics",
            Self::ZeroSumContest => "zero_sum_contest",
            Self::SelectionPressure => "selection_pressure",
            Self::General => "general",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Domain profile
// ---------------------------------------------------------------------------

/// Structural characteristics of a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCharacteristics {
    pub time_scale: TimeScale,
    /// Stakeholder complexity on a 1–10 scale.
    pub stakeholder_complexity: f64,
    pub information_availability: InformationAvailability,
    /// Regulatory constraint intensity in [0, 1].
    pub regulatory_constraints: f64,
    /// Competitive intensity in [0, 1].
    pub competitive_intensity: f64,
    /// Typical appetite for risk in [0, 1].
    pub risk_tolerance: f64,
}

/// Full domain profile, loaded once per process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainContext {
    pub name: String,
    pub characteristics: DomainCharacteristics,
    pub success_metrics: BTreeSet<String>,
    pub common_strategies: BTreeSet<String>,
    pub cultural_factors: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Pattern records
// ---------------------------------------------------------------------------

/// Mining-facing pattern record: structural descriptors plus the
/// historically observed success rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainPattern {
    pub name: String,
    pub player_structure: PlayerStructure,
    /// Space-separated strategic-dynamics label, drawn from the shared
    /// strategic-concept vocabulary.
    pub strategic_dynamics: String,
    pub information_structure: InformationAvailability,
    /// Historical success rate in [0, 1].
    pub success_rate: f64,
}

/// Transfer-facing strategy pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyPattern {
    pub id: String,
    pub name: String,
    pub source_domain: String,
    pub core_logic: String,
    pub success_conditions: Vec<String>,
    pub failure_risks: Vec<String>,
    pub adaptation_requirements: Vec<String>,
    /// Intrinsic transferability in [0, 1].
    pub transferability_score: f64,
}

// ---------------------------------------------------------------------------
// Repository trait
// ---------------------------------------------------------------------------

/// Read-only pattern repository injected into the engines.
///
/// Implementations must be free of interior mutability so a shared
/// reference is safe for unlimited concurrent readers.
pub trait KnowledgeBase: Sync {
    /// Catalogued domain names, sorted.
    fn domains(&self) -> Vec<String>;
    /// Patterns for a domain; empty for unknown domains.
    fn patterns(&self, domain: &str) -> &[DomainPattern];
    /// Domain profile, if catalogued.
    fn profile(&self, domain: &str) -> Option<&DomainContext>;
    /// Fixed fingerprint for a domain name; `General` when unknown.
    fn fingerprint(&self, domain: &str) -> DomainFingerprint;
}

#[derive(Debug, Clone)]
struct DomainEntry {
    profile: DomainContext,
    patterns: Vec<DomainPattern>,
    fingerprint: DomainFingerprint,
}

/// The built-in curated catalogue.
#[derive(Debug, Clone)]
pub struct StaticKnowledgeBase {
    entries: BTreeMap<String, DomainEntry>,
}

impl KnowledgeBase for StaticKnowledgeBase {
    fn domains(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn patterns(&self, domain: &str) -> &[DomainPattern] {
        self.entries
            .get(domain)
            .map(|entry| entry.patterns.as_slice())
            .unwrap_or(&[])
    }

    fn profile(&self, domain: &str) -> Option<&DomainContext> {
        self.entries.get(domain).map(|entry| &entry.profile)
    }

    fn fingerprint(&self, domain: &str) -> DomainFingerprint {
        self.entries
            .get(domain)
            .map(|entry| entry.fingerprint)
            .unwrap_or(DomainFingerprint::General)
    }
}

fn string_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn pattern(
    name: &str,
    player_structure: PlayerStructure,
    strategic_dynamics: &str,
    information_structure: InformationAvailability,
    success_rate: f64,
) -> DomainPattern {
    DomainPattern {
        name: name.to_string(),
        player_structure,
        strategic_dynamics: strategic_dynamics.to_string(),
        information_structure,
        success_rate,
    }
}

impl StaticKnowledgeBase {
    /// The hand-curated catalogue: military, business, politics, sports,
    /// evolutionary biology.
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();

        entries.insert(
            "military".to_string(),
            DomainEntry {
                profile: DomainContext {
                    name: "military".to_string(),
                    characteristics: DomainCharacteristics {
                        time_scale: TimeScale::Medium,
                        stakeholder_complexity: 6.0,
                        information_availability: InformationAvailability::Limited,
                        regulatory_constraints: 0.4,
                        competitive_intensity: 0.9,
                        risk_tolerance: 0.3,
                    },
                    success_metrics: string_set(&[
                        "territorial_control",
                        "force_preservation",
                        "objective_seizure",
                    ]),
                    common_strategies: string_set(&[
                        "flanking_maneuver",
                        "defense_in_depth",
                        "feint_and_fix",
                    ]),
                    cultural_factors: string_set(&[
                        "chain_of_command",
                        "unit_cohesion",
                        "operational_secrecy",
                    ]),
                },
                patterns: vec![
                    pattern(
                        "flanking_maneuver",
                        PlayerStructure::Dyadic,
                        "asymmetric deception maneuver",
                        InformationAvailability::Limited,
                        0.72,
                    ),
                    pattern(
                        "defense_in_depth",
                        PlayerStructure::Dyadic,
                        "attrition defense endurance",
                        InformationAvailability::Limited,
                        0.65,
                    ),
                    pattern(
                        "divide_and_conquer",
                        PlayerStructure::MultiActor,
                        "fragmentation competition coalition",
                        InformationAvailability::Partial,
                        0.68,
                    ),
                ],
                fingerprint: DomainFingerprint::PowerProjection,
            },
        );

        entries.insert(
            "business".to_string(),
            DomainEntry {
                profile: DomainContext {
                    name: "business".to_string(),
                    characteristics: DomainCharacteristics {
                        time_scale: TimeScale::Short,
                        stakeholder_complexity: 7.0,
                        information_availability: InformationAvailability::Partial,
                        regulatory_constraints: 0.6,
                        competitive_intensity: 0.8,
                        risk_tolerance: 0.5,
                    },
                    success_metrics: string_set(&[
                        "market_share",
                        "profit_margin",
                        "customer_retention",
                    ]),
                    common_strategies: string_set(&[
                        "market_disruption",
                        "vertical_integration",
                        "loss_leader_entry",
                    ]),
                    cultural_factors: string_set(&[
                        "quarterly_reporting",
                        "shareholder_primacy",
                        "brand_reputation",
                    ]),
                },
                patterns: vec![
                    pattern(
                        "market_disruption",
                        PlayerStructure::MultiActor,
                        "asymmetric innovation competition",
                        InformationAvailability::Partial,
                        0.58,
                    ),
                    pattern(
                        "loss_leader_entry",
                        PlayerStructure::Dyadic,
                        "sacrifice positioning competition",
                        InformationAvailability::Partial,
                        0.61,
                    ),
                    pattern(
                        "platform_lock_in",
                        PlayerStructure::MultiActor,
                        "network coordination cooperation",
                        InformationAvailability::Partial,
                        0.66,
                    ),
                ],
                fingerprint: DomainFingerprint::EconomicCompetition,
            },
        );

        entries.insert(
            "politics".to_string(),
            DomainEntry {
                profile: DomainContext {
                    name: "politics".to_string(),
                    characteristics: DomainCharacteristics {
                        time_scale: TimeScale::Long,
                        stakeholder_complexity: 9.0,
                        information_availability: InformationAvailability::Partial,
                        regulatory_constraints: 0.8,
                        competitive_intensity: 0.7,
                        risk_tolerance: 0.4,
                    },
                    success_metrics: string_set(&[
                        "coalition_stability",
                        "vote_share",
                        "policy_adoption",
                    ]),
                    common_strategies: string_set(&[
                        "coalition_building",
                        "wedge_strategy",
                        "incremental_reform",
                    ]),
                    cultural_factors: string_set(&[
                        "public_opinion",
                        "institutional_norms",
                        "news_cycle",
                    ]),
                },
                patterns: vec![
                    pattern(
                        "coalition_building",
                        PlayerStructure::MultiActor,
                        "cooperation coalition coordination",
                        InformationAvailability::Partial,
                        0.63,
                    ),
                    pattern(
                        "wedge_strategy",
                        PlayerStructure::MultiActor,
                        "fragmentation deception competition",
                        InformationAvailability::Partial,
                        0.55,
                    ),
                    pattern(
                        "incremental_reform",
                        PlayerStructure::SmallGroup,
                        "signaling commitment endurance",
                        InformationAvailability::Partial,
                        0.70,
                    ),
                ],
                fingerprint: DomainFingerprint::CoalitionDynamics,
            },
        );

        entries.insert(
            "sports".to_string(),
            DomainEntry {
                profile: DomainContext {
                    name: "sports".to_string(),
                    characteristics: DomainCharacteristics {
                        time_scale: TimeScale::Immediate,
                        stakeholder_complexity: 3.0,
                        information_availability: InformationAvailability::Complete,
                        regulatory_constraints: 0.2,
                        competitive_intensity: 0.95,
                        risk_tolerance: 0.7,
                    },
                    success_metrics: string_set(&[
                        "win_rate",
                        "point_differential",
                        "season_standing",
                    ]),
                    common_strategies: string_set(&[
                        "counter_attack",
                        "tempo_control",
                        "full_court_press",
                    ]),
                    cultural_factors: string_set(&[
                        "team_chemistry",
                        "home_advantage",
                        "fan_pressure",
                    ]),
                },
                patterns: vec![
                    pattern(
                        "counter_attack",
                        PlayerStructure::Dyadic,
                        "reactive asymmetric tempo",
                        InformationAvailability::Complete,
                        0.60,
                    ),
                    pattern(
                        "tempo_control",
                        PlayerStructure::Dyadic,
                        "attrition endurance pacing",
                        InformationAvailability::Complete,
                        0.64,
                    ),
                    pattern(
                        "full_court_press",
                        PlayerStructure::Dyadic,
                        "escalation pressure aggression",
                        InformationAvailability::Complete,
                        0.52,
                    ),
                ],
                fingerprint: DomainFingerprint::ZeroSumContest,
            },
        );

        entries.insert(
            "evolutionary_biology".to_string(),
            DomainEntry {
                profile: DomainContext {
                    name: "evolutionary_biology".to_string(),
                    characteristics: DomainCharacteristics {
                        time_scale: TimeScale::Long,
                        stakeholder_complexity: 2.0,
                        information_availability: InformationAvailability::Limited,
                        regulatory_constraints: 0.0,
                        competitive_intensity: 0.85,
                        risk_tolerance: 0.5,
                    },
                    success_metrics: string_set(&[
                        "reproductive_fitness",
                        "population_share",
                        "niche_occupancy",
                    ]),
                    common_strategies: string_set(&[
                        "niche_specialization",
                        "mimicry_defense",
                        "red_queen_escalation",
                    ]),
                    cultural_factors: string_set(&["kin_selection", "territoriality"]),
                },
                patterns: vec![
                    pattern(
                        "niche_specialization",
                        PlayerStructure::MultiActor,
                        "differentiation avoidance competition",
                        InformationAvailability::Limited,
                        0.70,
                    ),
                    pattern(
                        "mimicry_defense",
                        PlayerStructure::Dyadic,
                        "deception signaling defense",
                        InformationAvailability::Limited,
                        0.62,
                    ),
                    pattern(
                        "red_queen_escalation",
                        PlayerStructure::Dyadic,
                        "escalation attrition competition",
                        InformationAvailability::Limited,
                        0.50,
                    ),
                ],
                fingerprint: DomainFingerprint::SelectionPressure,
            },
        );

        Self { entries }
    }
}
