//! Framework-agnostic service endpoints.
//!
//! One synchronous RPC-style endpoint per engine, all sharing the
//! `{ok, response?, message?}` envelope. The handlers return
//! `(status, headers, body)` replies a concrete transport binds directly;
//! nothing here depends on an HTTP framework.
//!
//! Shared behavior: OPTIONS preflight → 204 with permissive CORS headers;
//! any method other than POST/OPTIONS → 405; missing required top-level
//! fields → 400 naming every missing field; malformed JSON → 400;
//! unexpected internal errors → 500 with a display message and no stack
//! trace. Every reply carries CORS headers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::deterministic_prng::Xorshift64;
use crate::domain_knowledge::KnowledgeBase;
use crate::persistence::AnalysisStore;
use crate::recalibration::{RecalibrationRequest, recalibrate_with_events};
use crate::sensitivity_tornado::{TornadoRequest, run_and_persist_tornado_analysis};
use crate::strategy_transfer::{TransferRequest, transfer_and_persist};
use crate::symmetry_mining::{
    MiningConfig, SYMMETRY_MINING_SCHEMA_VERSION, ScenarioDescription, discover_and_persist,
    recommendations_from,
};
use crate::telemetry::EngineEvent;

pub const SERVICE_ENDPOINT_COMPONENT: &str = "service_endpoint";
pub const SERVICE_ENDPOINT_SCHEMA_VERSION: &str = "stratagem-engine.service-endpoint.v1";

const ERROR_MISSING_FIELDS: &str = "SG-API-1001";
const ERROR_MALFORMED_JSON: &str = "SG-API-1002";
const ERROR_UNKNOWN_ROUTE: &str = "SG-API-1003";
const ERROR_INTERNAL: &str = "SG-API-1004";

// ---------------------------------------------------------------------------
// Transport-facing types
// ---------------------------------------------------------------------------

/// HTTP method, reduced to what the contract distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Options,
    Other,
}

impl HttpMethod {
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "POST" => Self::Post,
            "OPTIONS" => Self::Options,
            _ => Self::Other,
        }
    }
}

/// The four engine endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRoute {
    Sensitivity,
    SymmetryMining,
    CrossDomainTransfer,
    DynamicRecalibration,
}

impl EndpointRoute {
    pub const ALL: [EndpointRoute; 4] = [
        EndpointRoute::Sensitivity,
        EndpointRoute::SymmetryMining,
        EndpointRoute::CrossDomainTransfer,
        EndpointRoute::DynamicRecalibration,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Self::Sensitivity => "/sensitivity",
            Self::SymmetryMining => "/symmetry-mining",
            Self::CrossDomainTransfer => "/cross-domain-transfer",
            Self::DynamicRecalibration => "/dynamic-recalibration",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|route| route.path() == path)
    }
}

/// Finished reply for a transport adapter to send verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointReply {
    pub status: u16,
    /// Header name/value pairs; always includes the CORS set.
    pub headers: Vec<(String, String)>,
    /// Serialized envelope; empty for 204 preflight replies.
    pub body: String,
}

/// Collaborators an endpoint call runs against.
pub struct EndpointContext<'a> {
    pub kb: &'a dyn KnowledgeBase,
    pub store: &'a dyn AnalysisStore,
    /// Seed for perturbation sampling; the transport owns reproducibility.
    pub rng_seed: u64,
    /// Wall-clock supplied by the transport so computation stays
    /// deterministic under test.
    pub now: DateTime<Utc>,
}

#[derive(Debug, Error)]
enum EndpointError {
    #[error("missing required field(s): {fields}")]
    MissingFields { fields: String },
    #[error("malformed JSON body: {detail}")]
    MalformedJson { detail: String },
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl EndpointError {
    fn stable_code(&self) -> &'static str {
        match self {
            Self::MissingFields { .. } => ERROR_MISSING_FIELDS,
            Self::MalformedJson { .. } => ERROR_MALFORMED_JSON,
            Self::Internal { .. } => ERROR_INTERNAL,
        }
    }

    fn status(&self) -> u16 {
        match self {
            Self::MissingFields { .. } | Self::MalformedJson { .. } => 400,
            Self::Internal { .. } => 500,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope and reply construction
// ---------------------------------------------------------------------------

fn cors_headers() -> Vec<(String, String)> {
    vec![
        ("access-control-allow-origin".to_string(), "*".to_string()),
        (
            "access-control-allow-methods".to_string(),
            "POST, OPTIONS".to_string(),
        ),
        (
            "access-control-allow-headers".to_string(),
            "content-type, authorization".to_string(),
        ),
        ("content-type".to_string(), "application/json".to_string()),
    ]
}

fn ok_reply<T: Serialize>(response: &T) -> EndpointReply {
    let body = json!({"ok": true, "response": response});
    EndpointReply {
        status: 200,
        headers: cors_headers(),
        body: body.to_string(),
    }
}

fn error_reply(status: u16, message: &str) -> EndpointReply {
    let body = json!({"ok": false, "message": message});
    EndpointReply {
        status,
        headers: cors_headers(),
        body: body.to_string(),
    }
}

fn preflight_reply() -> EndpointReply {
    EndpointReply {
        status: 204,
        headers: cors_headers(),
        body: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn parse_body(body: &str) -> Result<Value, EndpointError> {
    serde_json::from_str(body).map_err(|error| EndpointError::MalformedJson {
        detail: error.to_string(),
    })
}

/// Required top-level fields are never silently defaulted.
fn require_fields(value: &Value, required: &[&str]) -> Result<(), EndpointError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|field| value.get(field).map(Value::is_null).unwrap_or(true))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EndpointError::MissingFields {
            fields: missing.join(", "),
        })
    }
}

fn typed<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, EndpointError> {
    serde_json::from_value(value).map_err(|error| EndpointError::MalformedJson {
        detail: error.to_string(),
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, EndpointError> {
    serde_json::to_value(value).map_err(|error| EndpointError::Internal {
        detail: error.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Per-route handlers
// ---------------------------------------------------------------------------

fn completed_at(ctx: &EndpointContext<'_>) -> String {
    ctx.now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn handle_sensitivity(
    ctx: &EndpointContext<'_>,
    body: Value,
) -> Result<(EndpointReply, Vec<EngineEvent>), EndpointError> {
    require_fields(&body, &["analysis_id", "base_actions", "key_params"])?;
    let request: TornadoRequest = typed(body)?;
    let mut rng = Xorshift64::new(ctx.rng_seed);
    let (analysis, events) =
        run_and_persist_tornado_analysis(&request, &mut rng, ctx.store, &completed_at(ctx));
    Ok((ok_reply(&analysis), events))
}

fn handle_symmetry_mining(
    ctx: &EndpointContext<'_>,
    body: Value,
) -> Result<(EndpointReply, Vec<EngineEvent>), EndpointError> {
    require_fields(&body, &["runId", "currentScenario"])?;
    let run_id = body
        .get("runId")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let scenario: ScenarioDescription = typed(
        body.get("currentScenario")
            .cloned()
            .unwrap_or(Value::Null),
    )?;
    let config: MiningConfig = match body.get("analysisConfig") {
        Some(raw) if !raw.is_null() => typed(raw.clone())?,
        _ => MiningConfig::default(),
    };
    let (discovery, events) = discover_and_persist(
        &run_id,
        &scenario,
        &config,
        ctx.kb,
        ctx.store,
        &completed_at(ctx),
    );
    let response = json!({
        "runId": run_id,
        "patternDiscovery": to_value(&discovery)?,
        "strategicRecommendations": to_value(&recommendations_from(&discovery))?,
        "analysisMetadata": {
            "schemaVersion": SYMMETRY_MINING_SCHEMA_VERSION,
            "abstractionLevel": discovery.signature.abstraction_level,
            "similarityThreshold": config.similarity_threshold,
            "analogyCount": discovery.meta_pattern_recognition.analogy_count,
            "reliability": discovery.meta_pattern_recognition.reliability,
            "completedAt": completed_at(ctx),
        },
    });
    Ok((ok_reply(&response), events))
}

fn handle_transfer(
    ctx: &EndpointContext<'_>,
    body: Value,
) -> Result<(EndpointReply, Vec<EngineEvent>), EndpointError> {
    require_fields(&body, &["runId", "sourceStrategy", "targetDomain"])?;
    let request: TransferRequest = typed(body)?;
    let (outcome, events) =
        transfer_and_persist(&request, ctx.kb, ctx.store, &completed_at(ctx));
    Ok((ok_reply(&outcome), events))
}

fn handle_recalibration(
    ctx: &EndpointContext<'_>,
    body: Value,
) -> Result<(EndpointReply, Vec<EngineEvent>), EndpointError> {
    require_fields(&body, &["runId", "currentStrategy", "newInformation"])?;
    let request: RecalibrationRequest = typed(body)?;
    let (outcome, events) = recalibrate_with_events(&request, ctx.now);
    Ok((ok_reply(&outcome), events))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Handle one request against a resolved route.
pub fn handle(
    ctx: &EndpointContext<'_>,
    route: EndpointRoute,
    method: HttpMethod,
    body: &str,
) -> (EndpointReply, Vec<EngineEvent>) {
    match method {
        HttpMethod::Options => return (preflight_reply(), Vec::new()),
        HttpMethod::Other => {
            return (error_reply(405, "method not allowed; use POST"), Vec::new());
        }
        HttpMethod::Post => {}
    }

    let result = parse_body(body).and_then(|value| match route {
        EndpointRoute::Sensitivity => handle_sensitivity(ctx, value),
        EndpointRoute::SymmetryMining => handle_symmetry_mining(ctx, value),
        EndpointRoute::CrossDomainTransfer => handle_transfer(ctx, value),
        EndpointRoute::DynamicRecalibration => handle_recalibration(ctx, value),
    });

    match result {
        Ok(reply) => reply,
        Err(error) => {
            let event = EngineEvent::new(
                "unknown",
                SERVICE_ENDPOINT_COMPONENT,
                "request_rejected",
                error.to_string(),
            )
            .with_error_code(error.stable_code());
            (error_reply(error.status(), &error.to_string()), vec![event])
        }
    }
}

/// Handle one request by path, returning 404 for unknown routes.
pub fn handle_request(
    ctx: &EndpointContext<'_>,
    path: &str,
    method: HttpMethod,
    body: &str,
) -> (EndpointReply, Vec<EngineEvent>) {
    match EndpointRoute::from_path(path) {
        Some(route) => handle(ctx, route, method, body),
        None => {
            let event = EngineEvent::new(
                "unknown",
                SERVICE_ENDPOINT_COMPONENT,
                "request_rejected",
                format!("unknown route `{path}`"),
            )
            .with_error_code(ERROR_UNKNOWN_ROUTE);
            (
                error_reply(404, &format!("unknown route `{path}`")),
                vec![event],
            )
        }
    }
}
