#![forbid(unsafe_code)]

//! Integration tests for the `service_endpoint` module.
//!
//! Covers: the shared `{ok, response?, message?}` envelope across all
//! four routes, the 204/400/404/405 taxonomy, CORS headers on every
//! reply, deterministic replies under a fixed seed and clock, and
//! persistence failure isolation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use stratagem_engine::domain_knowledge::StaticKnowledgeBase;
use stratagem_engine::persistence::{FailingStore, MemoryStore};
use stratagem_engine::service_endpoint::{
    EndpointContext, EndpointRoute, HttpMethod, handle, handle_request,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-08-01T12:00:00Z")
        .expect("fixed now")
        .with_timezone(&Utc)
}

fn body_value(body: &str) -> Value {
    serde_json::from_str(body).expect("reply body is JSON")
}

fn sensitivity_body() -> &'static str {
    r#"{
        "analysis_id": "an-1",
        "base_actions": [
            {"actor": "A", "action": "x",
             "payoff_estimate": {"value": 10.0, "confidence": 0.5, "sources": []}},
            {"actor": "B", "action": "y",
             "payoff_estimate": {"value": 4.0, "confidence": 0.9, "sources": []}}
        ],
        "key_params": [
            {"name": "demand", "base_value": 1.0},
            {"name": "cost", "base_value": 2.0, "low_pct": -2.0, "high_pct": 2.0}
        ],
        "n": 10
    }"#
}

fn transfer_body() -> &'static str {
    r#"{
        "runId": "run-t",
        "sourceStrategy": {
            "pattern": {
                "id": "pat-flank",
                "name": "flanking_maneuver",
                "sourceDomain": "military",
                "coreLogic": "attack the opponent where the territory is weakly held",
                "successConditions": ["surprise is preserved"],
                "failureRisks": ["overextension"],
                "adaptationRequirements": ["mobility advantage"],
                "transferabilityScore": 0.8
            },
            "context": "military",
            "performance": {"observedSuccessRate": 0.72}
        },
        "targetDomain": "sports",
        "transferObjectives": ["early momentum"],
        "constraints": {"timeToImplementHours": 400}
    }"#
}

// ---------------------------------------------------------------------------
// Shared behavior
// ---------------------------------------------------------------------------

#[test]
fn every_route_answers_preflight_with_cors() {
    let kb = StaticKnowledgeBase::builtin();
    let store = MemoryStore::new();
    let ctx = EndpointContext {
        kb: &kb,
        store: &store,
        rng_seed: 1,
        now: fixed_now(),
    };
    for route in EndpointRoute::ALL {
        let (reply, events) = handle(&ctx, route, HttpMethod::Options, "");
        assert_eq!(reply.status, 204, "{}", route.path());
        assert!(reply.body.is_empty());
        assert!(events.is_empty());
        assert!(
            reply
                .headers
                .iter()
                .any(|(name, value)| name == "access-control-allow-origin" && value == "*")
        );
        assert!(
            reply
                .headers
                .iter()
                .any(|(name, value)| name == "access-control-allow-methods"
                    && value.contains("POST"))
        );
    }
}

#[test]
fn every_route_rejects_non_post_with_405() {
    let kb = StaticKnowledgeBase::builtin();
    let store = MemoryStore::new();
    let ctx = EndpointContext {
        kb: &kb,
        store: &store,
        rng_seed: 1,
        now: fixed_now(),
    };
    for route in EndpointRoute::ALL {
        for method in ["GET", "PUT", "DELETE", "PATCH"] {
            let (reply, _) = handle(&ctx, route, HttpMethod::from_token(method), "{}");
            assert_eq!(reply.status, 405, "{} {method}", route.path());
            let body = body_value(&reply.body);
            assert_eq!(body["ok"], Value::Bool(false));
            assert!(body["message"].as_str().is_some());
        }
    }
}

#[test]
fn every_route_names_missing_fields() {
    let kb = StaticKnowledgeBase::builtin();
    let store = MemoryStore::new();
    let ctx = EndpointContext {
        kb: &kb,
        store: &store,
        rng_seed: 1,
        now: fixed_now(),
    };
    let expectations = [
        (EndpointRoute::Sensitivity, vec!["analysis_id", "base_actions", "key_params"]),
        (EndpointRoute::SymmetryMining, vec!["runId", "currentScenario"]),
        (
            EndpointRoute::CrossDomainTransfer,
            vec!["runId", "sourceStrategy", "targetDomain"],
        ),
        (
            EndpointRoute::DynamicRecalibration,
            vec!["runId", "currentStrategy", "newInformation"],
        ),
    ];
    for (route, fields) in expectations {
        let (reply, _) = handle(&ctx, route, HttpMethod::Post, "{}");
        assert_eq!(reply.status, 400, "{}", route.path());
        let message = body_value(&reply.body)["message"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        for field in fields {
            assert!(
                message.contains(field),
                "{} message `{message}` missing `{field}`",
                route.path()
            );
        }
    }
}

#[test]
fn null_run_id_counts_as_missing() {
    let kb = StaticKnowledgeBase::builtin();
    let store = MemoryStore::new();
    let ctx = EndpointContext {
        kb: &kb,
        store: &store,
        rng_seed: 1,
        now: fixed_now(),
    };
    let (reply, _) = handle(
        &ctx,
        EndpointRoute::SymmetryMining,
        HttpMethod::Post,
        r#"{"runId": null, "currentScenario": {}}"#,
    );
    assert_eq!(reply.status, 400);
    assert!(
        body_value(&reply.body)["message"]
            .as_str()
            .unwrap_or_default()
            .contains("runId")
    );
}

#[test]
fn unknown_route_is_404_with_envelope() {
    let kb = StaticKnowledgeBase::builtin();
    let store = MemoryStore::new();
    let ctx = EndpointContext {
        kb: &kb,
        store: &store,
        rng_seed: 1,
        now: fixed_now(),
    };
    let (reply, events) = handle_request(&ctx, "/not-an-engine", HttpMethod::Post, "{}");
    assert_eq!(reply.status, 404);
    assert_eq!(body_value(&reply.body)["ok"], Value::Bool(false));
    assert_eq!(events[0].error_code.as_deref(), Some("SG-API-1003"));
}

// ---------------------------------------------------------------------------
// Route round-trips
// ---------------------------------------------------------------------------

#[test]
fn sensitivity_reply_is_deterministic_for_a_seed() {
    let kb = StaticKnowledgeBase::builtin();
    let store = MemoryStore::new();
    let ctx = EndpointContext {
        kb: &kb,
        store: &store,
        rng_seed: 42,
        now: fixed_now(),
    };
    let (a, _) = handle(&ctx, EndpointRoute::Sensitivity, HttpMethod::Post, sensitivity_body());
    let (b, _) = handle(&ctx, EndpointRoute::Sensitivity, HttpMethod::Post, sensitivity_body());
    assert_eq!(a.status, 200);
    assert_eq!(a.body, b.body);
    let parsed = body_value(&a.body);
    let results = parsed["response"]["results"].as_array().expect("results");
    assert_eq!(results.len(), 2);
    // ±10% out-ranges ±5% on the same action set.
    assert_eq!(results[0]["param"], Value::String("demand".to_string()));
}

#[test]
fn transfer_reply_matches_engine_contract() {
    let kb = StaticKnowledgeBase::builtin();
    let store = MemoryStore::new();
    let ctx = EndpointContext {
        kb: &kb,
        store: &store,
        rng_seed: 1,
        now: fixed_now(),
    };
    let (reply, _) = handle(
        &ctx,
        EndpointRoute::CrossDomainTransfer,
        HttpMethod::Post,
        transfer_body(),
    );
    assert_eq!(reply.status, 200);
    let parsed = body_value(&reply.body);
    let response = &parsed["response"];
    assert!(response["transferFeasibility"]["score"].is_number());
    assert_eq!(
        response["adaptationProtocol"].as_array().map(Vec::len),
        Some(4)
    );
    assert!(
        response["adaptedStrategy"]["coreLogic"]
            .as_str()
            .unwrap_or_default()
            .contains("immediate-term execution")
    );
    assert!(response["successPrediction"].is_number());
    assert_eq!(store.records().len(), 1);
}

#[test]
fn recalibration_stable_reply_has_no_recommendations() {
    let kb = StaticKnowledgeBase::builtin();
    let store = MemoryStore::new();
    let ctx = EndpointContext {
        kb: &kb,
        store: &store,
        rng_seed: 1,
        now: fixed_now(),
    };
    let body = r#"{
        "runId": "run-stable",
        "currentStrategy": {
            "actions": [{"id": "hold", "observedPerformance": 1.0}],
            "beliefs": [],
            "lastUpdate": "2026-08-01T11:45:00Z"
        },
        "newInformation": []
    }"#;
    let (reply, _) = handle(&ctx, EndpointRoute::DynamicRecalibration, HttpMethod::Post, body);
    assert_eq!(reply.status, 200);
    let parsed = body_value(&reply.body);
    assert_eq!(parsed["response"]["shouldRecalibrate"], Value::Bool(false));
    assert_eq!(
        parsed["response"]["newRecommendations"]
            .as_array()
            .map(Vec::len),
        Some(0)
    );
}

// ---------------------------------------------------------------------------
// Persistence isolation
// ---------------------------------------------------------------------------

#[test]
fn persistence_failure_never_fails_the_request() {
    let kb = StaticKnowledgeBase::builtin();
    let memory = MemoryStore::new();
    let ok_ctx = EndpointContext {
        kb: &kb,
        store: &memory,
        rng_seed: 42,
        now: fixed_now(),
    };
    let failing = FailingStore;
    let failing_ctx = EndpointContext {
        kb: &kb,
        store: &failing,
        rng_seed: 42,
        now: fixed_now(),
    };
    let (ok_reply, _) = handle(
        &ok_ctx,
        EndpointRoute::Sensitivity,
        HttpMethod::Post,
        sensitivity_body(),
    );
    let (failing_reply, events) = handle(
        &failing_ctx,
        EndpointRoute::Sensitivity,
        HttpMethod::Post,
        sensitivity_body(),
    );
    assert_eq!(failing_reply.status, 200);
    assert_eq!(ok_reply.body, failing_reply.body);
    assert!(events.iter().any(|e| e.event == "record_persist_failed"));
}
