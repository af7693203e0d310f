//! Fire-and-forget analysis persistence.
//!
//! Engines hand finished records to an [`AnalysisStore`] and move on. A
//! failed write is converted into a structured [`EngineEvent`] and
//! swallowed; compute success is independent of persistence success, and
//! no retry or at-least-once delivery is promised.
//!
//! The store is an injected collaborator: callers that persist through
//! their own pipeline pass [`NullStore`], tests pass [`MemoryStore`].

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::telemetry::EngineEvent;

pub const PERSISTENCE_COMPONENT: &str = "persistence";
pub const PERSISTENCE_SCHEMA_VERSION: &str = "stratagem-engine.persistence.v1";

const ERROR_STORE_UNAVAILABLE: &str = "SG-STORE-1001";
const ERROR_STORE_REJECTED: &str = "SG-STORE-1002";

/// Kind of analysis record being persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    SimulationRun,
    StrategicPattern,
    TransferResult,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SimulationRun => "simulation_run",
            Self::StrategicPattern => "strategic_pattern",
            Self::TransferResult => "transfer_result",
        }
    }
}

/// One persisted analysis artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Stable derived identifier (see [`stable_record_id`]).
    pub record_id: String,
    /// Caller-supplied analysis-run identifier.
    pub run_id: String,
    pub kind: RecordKind,
    /// RFC3339 UTC completion timestamp, caller-supplied.
    pub recorded_at_utc: String,
    /// Full result payload as JSON.
    pub payload: serde_json::Value,
}

/// Persistence failure. Never escapes to the primary computation path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {detail}")]
    Unavailable { detail: String },
    #[error("store rejected record `{record_id}`: {detail}")]
    Rejected { record_id: String, detail: String },
}

impl StoreError {
    pub fn stable_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => ERROR_STORE_UNAVAILABLE,
            Self::Rejected { .. } => ERROR_STORE_REJECTED,
        }
    }
}

/// Best-effort analysis store.
pub trait AnalysisStore {
    fn store(&self, record: StoredRecord) -> Result<(), StoreError>;
}

/// Store that drops everything. For callers that persist out-of-band.
#[derive(Debug, Default)]
pub struct NullStore;

impl AnalysisStore for NullStore {
    fn store(&self, _record: StoredRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-memory store for tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl AnalysisStore for MemoryStore {
    fn store(&self, record: StoredRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().map_err(|_| StoreError::Unavailable {
            detail: "memory store poisoned".to_string(),
        })?;
        guard.push(record);
        Ok(())
    }
}

/// Store that always fails. Exercises the swallow-and-log path.
#[derive(Debug, Default)]
pub struct FailingStore;

impl AnalysisStore for FailingStore {
    fn store(&self, record: StoredRecord) -> Result<(), StoreError> {
        Err(StoreError::Rejected {
            record_id: record.record_id,
            detail: "configured to fail".to_string(),
        })
    }
}

/// Stable record identifier: `<kind>-<first 16 hex of SHA-256>` over the
/// run id and serialized payload.
pub fn stable_record_id(kind: RecordKind, run_id: &str, payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b"\x00");
    hasher.update(run_id.as_bytes());
    hasher.update(b"\x00");
    hasher.update(payload.to_string().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("{}-{}", kind.as_str(), hex)
}

/// Submit a record, converting the outcome into a structured event.
///
/// The returned event is the only trace of a failed write.
pub fn submit_best_effort(
    store: &dyn AnalysisStore,
    kind: RecordKind,
    run_id: &str,
    recorded_at_utc: &str,
    payload: serde_json::Value,
) -> EngineEvent {
    let record_id = stable_record_id(kind, run_id, &payload);
    let record = StoredRecord {
        record_id: record_id.clone(),
        run_id: run_id.to_string(),
        kind,
        recorded_at_utc: recorded_at_utc.to_string(),
        payload,
    };
    match store.store(record) {
        Ok(()) => EngineEvent::new(
            run_id,
            PERSISTENCE_COMPONENT,
            "record_persisted",
            format!("{} {record_id}", kind.as_str()),
        ),
        Err(error) => EngineEvent::new(
            run_id,
            PERSISTENCE_COMPONENT,
            "record_persist_failed",
            error.to_string(),
        )
        .with_error_code(error.stable_code()),
    }
}
