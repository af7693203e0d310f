#![forbid(unsafe_code)]

//! Integration tests for the `symmetry_mining` module.
//!
//! Covers: end-to-end discovery against the built-in catalogue, ranking
//! and threshold behavior, same-domain exclusion rules, reliability
//! estimation, graceful degradation, persistence, and the camelCase wire
//! contract.

use stratagem_engine::domain_knowledge::{
    InformationAvailability, KnowledgeBase, StaticKnowledgeBase,
};
use stratagem_engine::persistence::{MemoryStore, RecordKind};
use stratagem_engine::symmetry_mining::{
    DEFAULT_MAX_ANALOGIES, DEFAULT_SIMILARITY_THRESHOLD, MiningConfig, ScenarioDescription,
    StrategicElements, build_signature, discover, discover_and_persist, recommendations_from,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn contested_market_scenario() -> ScenarioDescription {
    ScenarioDescription {
        title: "entrant vs incumbent".to_string(),
        description: "a challenger probes an entrenched market leader".to_string(),
        domain: "business".to_string(),
        stakeholders: vec!["challenger".to_string(), "incumbent".to_string()],
        strategic_elements: StrategicElements {
            player_count: Some(2),
            payoff_structure: Some("asymmetric deception maneuver".to_string()),
            information_availability: Some(InformationAvailability::Limited),
            action_space: vec!["enter".to_string(), "wait".to_string()],
        },
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[test]
fn discovery_returns_cross_domain_analogies() {
    let kb = StaticKnowledgeBase::builtin();
    let discovery = discover(&contested_market_scenario(), &MiningConfig::default(), &kb);
    assert!(!discovery.analogies.is_empty());
    assert!(discovery.analogies.len() <= DEFAULT_MAX_ANALOGIES as usize);
    for analogy in &discovery.analogies {
        assert_ne!(analogy.source_domain, "business");
        assert_eq!(analogy.target_domain, "business");
        assert!(analogy.structural_similarity >= DEFAULT_SIMILARITY_THRESHOLD);
        assert!((0.0..=1.0).contains(&analogy.structural_similarity));
        assert!((0.0..=1.0).contains(&analogy.success_probability));
        assert!(!analogy.analogous_strategies.is_empty());
        assert!(!analogy.meta_strategic_principles.is_empty());
        assert!(!analogy.implementation_guidance.immediate_actions.is_empty());
        assert!(!analogy.implementation_guidance.adaptation_steps.is_empty());
    }
}

#[test]
fn best_match_is_the_structural_twin() {
    let kb = StaticKnowledgeBase::builtin();
    let discovery = discover(&contested_market_scenario(), &MiningConfig::default(), &kb);
    // The military flanking maneuver matches on every factor: dyadic,
    // limited information, identical dynamics tokens, cross-domain.
    let top = &discovery.analogies[0];
    assert_eq!(top.source_domain, "military");
    assert_eq!(top.structural_match.pattern_name, "flanking_maneuver");
    assert!((top.structural_similarity - 1.0).abs() < 1e-12);
}

#[test]
fn blended_ranking_is_monotone() {
    let kb = StaticKnowledgeBase::builtin();
    let config = MiningConfig {
        similarity_threshold: 0.0,
        max_analogies: 100,
        ..MiningConfig::default()
    };
    let discovery = discover(&contested_market_scenario(), &config, &kb);
    for pair in discovery.analogies.windows(2) {
        assert!(pair[0].blended_score() >= pair[1].blended_score() - 1e-12);
    }
}

#[test]
fn raising_the_threshold_prunes_matches() {
    let kb = StaticKnowledgeBase::builtin();
    let loose = discover(
        &contested_market_scenario(),
        &MiningConfig {
            similarity_threshold: 0.2,
            max_analogies: 100,
            ..MiningConfig::default()
        },
        &kb,
    );
    let strict = discover(
        &contested_market_scenario(),
        &MiningConfig {
            similarity_threshold: 0.9,
            max_analogies: 100,
            ..MiningConfig::default()
        },
        &kb,
    );
    assert!(strict.analogies.len() < loose.analogies.len());
    for analogy in &strict.analogies {
        assert!(analogy.structural_similarity >= 0.9);
    }
}

#[test]
fn emergent_themes_name_the_dominant_domain() {
    let kb = StaticKnowledgeBase::builtin();
    let discovery = discover(&contested_market_scenario(), &MiningConfig::default(), &kb);
    assert!(!discovery.abstraction_insights.emergent_themes.is_empty());
    let top_theme = &discovery.abstraction_insights.emergent_themes[0];
    assert!(top_theme.contains("precedents dominate"));
    assert!(
        discovery
            .abstraction_insights
            .domain_clusters
            .contains_key("strategic")
    );
}

#[test]
fn reliability_reflects_match_quality() {
    let kb = StaticKnowledgeBase::builtin();
    let good = discover(&contested_market_scenario(), &MiningConfig::default(), &kb);
    assert!(good.meta_pattern_recognition.reliability > 0.5);
    assert!(!good.meta_pattern_recognition.requires_human_review);

    let empty = discover(
        &ScenarioDescription::default(),
        &MiningConfig::default(),
        &kb,
    );
    assert_eq!(empty.meta_pattern_recognition.analogy_count, 0);
    assert!(empty.meta_pattern_recognition.requires_human_review);
    assert!(
        empty.meta_pattern_recognition.reliability < good.meta_pattern_recognition.reliability
    );
}

#[test]
fn signature_defaults_degrade_gracefully() {
    let kb = StaticKnowledgeBase::builtin();
    let scenario = ScenarioDescription {
        domain: "unknown_domain".to_string(),
        ..ScenarioDescription::default()
    };
    let signature = build_signature(&scenario, &MiningConfig::default(), &kb);
    assert_eq!(signature.player_count, 0);
    assert_eq!(signature.information_class, InformationAvailability::Partial);
    assert_eq!(signature.payoff_structure_label, "");
    // Unknown domains map onto the general fingerprint, which still earns
    // the cross-domain bonus against every catalogued domain.
    assert_eq!(kb.fingerprint("unknown_domain").to_string(), "general");
}

// ---------------------------------------------------------------------------
// Persistence and recommendations
// ---------------------------------------------------------------------------

#[test]
fn discovered_patterns_are_stored_per_analogy() {
    let kb = StaticKnowledgeBase::builtin();
    let store = MemoryStore::new();
    let (discovery, _) = discover_and_persist(
        "run-mine",
        &contested_market_scenario(),
        &MiningConfig::default(),
        &kb,
        &store,
        "2026-08-01T10:00:00Z",
    );
    let records = store.records();
    assert_eq!(records.len(), discovery.analogies.len());
    assert!(records.iter().all(|r| r.kind == RecordKind::StrategicPattern));
    assert!(records.iter().all(|r| r.run_id == "run-mine"));
}

#[test]
fn recommendations_carry_blended_confidence() {
    let kb = StaticKnowledgeBase::builtin();
    let discovery = discover(&contested_market_scenario(), &MiningConfig::default(), &kb);
    let recommendations = recommendations_from(&discovery);
    assert_eq!(recommendations.len(), discovery.analogies.len());
    for rec in &recommendations {
        assert!((0.0..=1.0).contains(&rec.confidence));
        assert!(!rec.recommended_strategy.is_empty());
    }
}

// ---------------------------------------------------------------------------
// Wire contract
// ---------------------------------------------------------------------------

#[test]
fn scenario_deserializes_from_camel_case_wire() {
    let raw = r#"{
        "title": "standoff",
        "description": "d",
        "domain": "sports",
        "stakeholders": ["home", "away"],
        "strategicElements": {
            "playerCount": 2,
            "payoffStructure": "escalation pressure",
            "informationAvailability": "complete",
            "actionSpace": ["press", "hold"]
        }
    }"#;
    let scenario: ScenarioDescription = serde_json::from_str(raw).expect("deserialize");
    assert_eq!(scenario.strategic_elements.player_count, Some(2));
    assert_eq!(
        scenario.strategic_elements.information_availability,
        Some(InformationAvailability::Complete)
    );
}

#[test]
fn analogy_serializes_camel_case() {
    let kb = StaticKnowledgeBase::builtin();
    let discovery = discover(&contested_market_scenario(), &MiningConfig::default(), &kb);
    let json = serde_json::to_value(&discovery.analogies[0]).expect("serialize");
    assert!(json.get("structuralSimilarity").is_some());
    assert!(json.get("successProbability").is_some());
    assert!(json.get("implementationGuidance").is_some());
    assert!(json["structuralMatch"].get("patternName").is_some());
}

#[test]
fn config_defaults_fill_from_empty_object() {
    let config: MiningConfig = serde_json::from_str("{}").expect("deserialize");
    assert_eq!(config.abstraction_level, 5);
    assert_eq!(config.max_analogies, DEFAULT_MAX_ANALOGIES);
    assert_eq!(config.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
    assert!(config.domains_to_search.is_empty());
}
