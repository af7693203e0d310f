#![forbid(unsafe_code)]

//! Integration tests for the `payoff_ranking` module.
//!
//! Covers: ranking order and stability, numeric coercion, serde wire
//! shapes, and the concrete reference scenario.

use stratagem_engine::payoff_ranking::{
    ActionEntry, DEFAULT_CONFIDENCE, EvResult, PayoffEstimate, SourceRef, rank, sanitize_estimate,
    top_ev,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn entry(actor: &str, action: &str, value: f64, confidence: f64) -> ActionEntry {
    ActionEntry {
        actor: actor.to_string(),
        action: action.to_string(),
        payoff_estimate: PayoffEstimate {
            value,
            confidence,
            sources: Vec::new(),
        },
    }
}

// ---------------------------------------------------------------------------
// Ranking properties
// ---------------------------------------------------------------------------

#[test]
fn reference_scenario_ranks_a_over_b() {
    let ranked = rank(&[entry("A", "x", 10.0, 0.5), entry("B", "y", 4.0, 0.9)]);
    let evs: Vec<f64> = ranked.iter().map(|r| r.ev).collect();
    assert_eq!(evs, vec![5.0, 3.6]);
    assert_eq!(ranked[0].action, "x");
    assert_eq!(ranked[1].action, "y");
}

#[test]
fn output_length_matches_input_for_all_sizes() {
    for size in 0..20 {
        let actions: Vec<ActionEntry> = (0..size)
            .map(|i| entry(&format!("actor-{i}"), "move", i as f64, 0.5))
            .collect();
        assert_eq!(rank(&actions).len(), size);
    }
}

#[test]
fn descending_order_with_negative_values() {
    let ranked = rank(&[
        entry("A", "a", -5.0, 1.0),
        entry("B", "b", 0.0, 1.0),
        entry("C", "c", -1.0, 0.5),
    ]);
    let evs: Vec<f64> = ranked.iter().map(|r| r.ev).collect();
    assert_eq!(evs, vec![0.0, -0.5, -5.0]);
}

#[test]
fn equal_evs_preserve_input_order() {
    let ranked = rank(&[
        entry("first", "x", 4.0, 0.5),
        entry("second", "y", 2.0, 1.0),
        entry("third", "z", 1.0, 2.0), // confidence clipped to 1.0 ⇒ ev 1.0
    ]);
    assert_eq!(ranked[0].actor, "first");
    assert_eq!(ranked[1].actor, "second");
    assert_eq!(ranked[2].actor, "third");
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

#[test]
fn sanitize_coerces_all_malformed_numerics() {
    let estimate = PayoffEstimate {
        value: f64::INFINITY,
        confidence: f64::NAN,
        sources: vec![SourceRef {
            id: "src".to_string(),
            relevance: f64::NAN,
            excerpt: None,
        }],
    };
    let clean = sanitize_estimate(&estimate);
    assert_eq!(clean.value, 0.0);
    assert_eq!(clean.confidence, DEFAULT_CONFIDENCE);
    assert_eq!(clean.sources[0].relevance, 0.0);
}

#[test]
fn one_bad_record_does_not_poison_the_ranking() {
    let ranked = rank(&[
        entry("bad", "x", f64::NAN, f64::NAN),
        entry("good", "y", 8.0, 0.75),
    ]);
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].actor, "good");
    assert!((ranked[0].ev - 6.0).abs() < 1e-12);
    assert_eq!(top_ev(&ranked), ranked[0].ev);
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[test]
fn action_entry_deserializes_from_snake_case_wire() {
    let raw = r#"{
        "actor": "A",
        "action": "probe",
        "payoff_estimate": {
            "value": 3.5,
            "confidence": 0.8,
            "sources": [{"id": "doc-9", "relevance": 0.4, "excerpt": "field note"}]
        }
    }"#;
    let entry: ActionEntry = serde_json::from_str(raw).expect("deserialize");
    assert_eq!(entry.payoff_estimate.sources[0].id, "doc-9");
    let ranked = rank(&[entry]);
    assert!((ranked[0].ev - 2.8).abs() < 1e-12);
}

#[test]
fn ev_result_serde_roundtrip() {
    let result = EvResult {
        actor: "A".to_string(),
        action: "x".to_string(),
        ev: 5.0,
        sources: Vec::new(),
    };
    let json = serde_json::to_string(&result).expect("serialize");
    let restored: EvResult = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(result, restored);
}
