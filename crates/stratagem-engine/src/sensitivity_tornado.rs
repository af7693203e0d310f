//! Tornado sensitivity analysis over the EV ranking.
//!
//! For each named parameter the runner draws `n` independent uniform
//! perturbation factors inside the parameter's declared percentage range,
//! scales every action's payoff value by `1 + factor/100`, re-ranks, and
//! records the top EV of each trial. Parameters are then ranked by the
//! spread (`max − min`) their perturbation induces; the head of the list
//! is the most sensitive parameter.
//!
//! Trials are independent and aggregated only with commutative reductions
//! (sum, min, max), so execution order cannot affect the result beyond
//! floating summation order. Sampling runs on an injected seedable
//! generator; same seed + same request ⇒ identical output.

use serde::{Deserialize, Serialize};

use crate::deterministic_prng::Xorshift64;
use crate::payoff_ranking::{ActionEntry, rank, sanitize_estimate, top_ev};
use crate::persistence::{AnalysisStore, RecordKind, submit_best_effort};
use crate::telemetry::EngineEvent;

pub const SENSITIVITY_COMPONENT: &str = "sensitivity_tornado";
pub const SENSITIVITY_SCHEMA_VERSION: &str = "stratagem-engine.sensitivity-tornado.v1";

/// Default trials per parameter.
pub const DEFAULT_SAMPLES_PER_PARAMETER: u32 = 10;
/// Default symmetric perturbation range: ±10%.
pub const DEFAULT_PERTURBATION_RANGE_PCT: f64 = 10.0;

fn default_low_pct() -> f64 {
    -DEFAULT_PERTURBATION_RANGE_PCT
}

fn default_high_pct() -> f64 {
    DEFAULT_PERTURBATION_RANGE_PCT
}

/// Percentage perturbation range for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerturbationRange {
    #[serde(default = "default_low_pct")]
    pub low_pct: f64,
    #[serde(default = "default_high_pct")]
    pub high_pct: f64,
}

impl PerturbationRange {
    /// Normalized range: non-finite bounds fall back to the default, and
    /// an inverted range is swapped rather than rejected.
    fn normalized(&self) -> Self {
        let mut low = if self.low_pct.is_finite() {
            self.low_pct
        } else {
            -DEFAULT_PERTURBATION_RANGE_PCT
        };
        let mut high = if self.high_pct.is_finite() {
            self.high_pct
        } else {
            DEFAULT_PERTURBATION_RANGE_PCT
        };
        if low > high {
            std::mem::swap(&mut low, &mut high);
        }
        Self {
            low_pct: low,
            high_pct: high,
        }
    }
}

/// Named parameter driving perturbation trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityParameter {
    pub name: String,
    pub base_value: f64,
    #[serde(flatten)]
    pub range: PerturbationRange,
}

impl Default for PerturbationRange {
    fn default() -> Self {
        Self {
            low_pct: default_low_pct(),
            high_pct: default_high_pct(),
        }
    }
}

/// Sensitivity analysis request (snake_case wire contract).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoRequest {
    pub analysis_id: String,
    pub base_actions: Vec<ActionEntry>,
    pub key_params: Vec<SensitivityParameter>,
    /// Trials per parameter; 0 is clamped to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
}

/// Per-parameter tornado summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoResult {
    pub param: String,
    pub base_value: f64,
    pub range_percentage: PerturbationRange,
    pub avg_top_ev: f64,
    pub min_ev: f64,
    pub max_ev: f64,
    /// `max_ev − min_ev`, always ≥ 0.
    pub range_delta: f64,
    /// Raw per-trial top EVs, length = samples per parameter.
    pub raw_deltas: Vec<f64>,
}

/// Whole-run summary for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoSummary {
    pub most_sensitive_parameter: Option<String>,
    pub samples_per_parameter: u32,
    pub perturbation_range_percent: f64,
    pub parameters_analyzed: u32,
}

/// Full sensitivity analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoAnalysis {
    pub results: Vec<TornadoResult>,
    pub tornado_summary: TornadoSummary,
}

fn scaled_top_ev(base_actions: &[ActionEntry], factor_pct: f64) -> f64 {
    let scale = 1.0 + factor_pct / 100.0;
    let perturbed: Vec<ActionEntry> = base_actions
        .iter()
        .map(|entry| {
            let mut estimate = sanitize_estimate(&entry.payoff_estimate);
            estimate.value *= scale;
            ActionEntry {
                actor: entry.actor.clone(),
                action: entry.action.clone(),
                payoff_estimate: estimate,
            }
        })
        .collect();
    top_ev(&rank(&perturbed))
}

/// Run the tornado analysis.
///
/// Pure computation; persistence is handled by
/// [`run_and_persist_tornado_analysis`].
pub fn run_tornado_analysis(request: &TornadoRequest, rng: &mut Xorshift64) -> TornadoAnalysis {
    let samples = request.n.unwrap_or(DEFAULT_SAMPLES_PER_PARAMETER).max(1);

    let mut results: Vec<TornadoResult> = request
        .key_params
        .iter()
        .map(|param| {
            let range = param.range.normalized();
            let mut raw_deltas = Vec::with_capacity(samples as usize);
            for _ in 0..samples {
                let factor = rng.next_in_range(range.low_pct, range.high_pct);
                raw_deltas.push(scaled_top_ev(&request.base_actions, factor));
            }
            let sum: f64 = raw_deltas.iter().sum();
            let min_ev = raw_deltas.iter().cloned().fold(f64::INFINITY, f64::min);
            let max_ev = raw_deltas.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let (min_ev, max_ev) = if raw_deltas.is_empty() {
                (0.0, 0.0)
            } else {
                (min_ev, max_ev)
            };
            TornadoResult {
                param: param.name.clone(),
                base_value: param.base_value,
                range_percentage: range,
                avg_top_ev: sum / raw_deltas.len().max(1) as f64,
                min_ev,
                max_ev,
                range_delta: max_ev - min_ev,
                raw_deltas,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.range_delta
            .partial_cmp(&a.range_delta)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.param.cmp(&b.param))
    });

    let tornado_summary = TornadoSummary {
        most_sensitive_parameter: results.first().map(|r| r.param.clone()),
        samples_per_parameter: samples,
        perturbation_range_percent: DEFAULT_PERTURBATION_RANGE_PCT,
        parameters_analyzed: results.len() as u32,
    };

    TornadoAnalysis {
        results,
        tornado_summary,
    }
}

/// Run the analysis and submit a simulation-run record best-effort.
///
/// Persistence failure is reported only through the returned events; the
/// computed analysis is always returned.
pub fn run_and_persist_tornado_analysis(
    request: &TornadoRequest,
    rng: &mut Xorshift64,
    store: &dyn AnalysisStore,
    completed_at_utc: &str,
) -> (TornadoAnalysis, Vec<EngineEvent>) {
    let analysis = run_tornado_analysis(request, rng);
    let mut events = vec![EngineEvent::new(
        &request.analysis_id,
        SENSITIVITY_COMPONENT,
        "tornado_analysis_completed",
        format!(
            "parameters={} samples={}",
            analysis.tornado_summary.parameters_analyzed,
            analysis.tornado_summary.samples_per_parameter
        ),
    )];
    let payload = serde_json::to_value(&analysis).unwrap_or(serde_json::Value::Null);
    events.push(submit_best_effort(
        store,
        RecordKind::SimulationRun,
        &request.analysis_id,
        completed_at_utc,
        payload,
    ));
    (analysis, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff_ranking::PayoffEstimate;
    use crate::persistence::{FailingStore, MemoryStore};

    fn action(actor: &str, value: f64, confidence: f64) -> ActionEntry {
        ActionEntry {
            actor: actor.to_string(),
            action: format!("{actor}-move"),
            payoff_estimate: PayoffEstimate {
                value,
                confidence,
                sources: Vec::new(),
            },
        }
    }

    fn request() -> TornadoRequest {
        TornadoRequest {
            analysis_id: "analysis-1".to_string(),
            base_actions: vec![action("A", 10.0, 0.5), action("B", 4.0, 0.9)],
            key_params: vec![
                SensitivityParameter {
                    name: "market_share".to_string(),
                    base_value: 0.4,
                    range: PerturbationRange::default(),
                },
                SensitivityParameter {
                    name: "cost_of_entry".to_string(),
                    base_value: 2.0,
                    range: PerturbationRange {
                        low_pct: -2.0,
                        high_pct: 2.0,
                    },
                },
            ],
            n: Some(10),
        }
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let req = request();
        let a = run_tornado_analysis(&req, &mut Xorshift64::new(42));
        let b = run_tornado_analysis(&req, &mut Xorshift64::new(42));
        assert_eq!(a, b);
    }

    #[test]
    fn raw_deltas_within_scaling_bounds() {
        let req = request();
        let analysis = run_tornado_analysis(&req, &mut Xorshift64::new(7));
        // Base top EV is 5.0 (A: 10 × 0.5); scaling the winning payoff by
        // [1 + lo/100, 1 + hi/100] bounds every trial's top EV.
        for result in &analysis.results {
            let lo_scale = 1.0 + result.range_percentage.low_pct / 100.0;
            let hi_scale = 1.0 + result.range_percentage.high_pct / 100.0;
            for raw in &result.raw_deltas {
                assert!(*raw >= 5.0 * lo_scale - 1e-9, "raw {raw} below bound");
                assert!(*raw <= 5.0 * hi_scale + 1e-9, "raw {raw} above bound");
            }
            assert!(result.range_delta >= 0.0);
            assert_eq!(result.raw_deltas.len(), 10);
        }
    }

    #[test]
    fn sorted_by_range_delta_descending() {
        let analysis = run_tornado_analysis(&request(), &mut Xorshift64::new(11));
        for pair in analysis.results.windows(2) {
            assert!(pair[0].range_delta >= pair[1].range_delta);
        }
        assert_eq!(
            analysis.tornado_summary.most_sensitive_parameter.as_deref(),
            Some(analysis.results[0].param.as_str())
        );
    }

    #[test]
    fn wider_range_dominates_sensitivity() {
        // ±10% spread should out-range ±2% on the same action set.
        let analysis = run_tornado_analysis(&request(), &mut Xorshift64::new(3));
        assert_eq!(analysis.results[0].param, "market_share");
    }

    #[test]
    fn empty_params_empty_results() {
        let mut req = request();
        req.key_params.clear();
        let analysis = run_tornado_analysis(&req, &mut Xorshift64::new(1));
        assert!(analysis.results.is_empty());
        assert!(analysis.tornado_summary.most_sensitive_parameter.is_none());
        assert_eq!(analysis.tornado_summary.parameters_analyzed, 0);
    }

    #[test]
    fn empty_actions_yield_zero_evs() {
        let mut req = request();
        req.base_actions.clear();
        let analysis = run_tornado_analysis(&req, &mut Xorshift64::new(1));
        for result in &analysis.results {
            assert!(result.raw_deltas.iter().all(|v| *v == 0.0));
            assert_eq!(result.range_delta, 0.0);
        }
    }

    #[test]
    fn zero_samples_clamped_to_one() {
        let mut req = request();
        req.n = Some(0);
        let analysis = run_tornado_analysis(&req, &mut Xorshift64::new(1));
        assert_eq!(analysis.tornado_summary.samples_per_parameter, 1);
        assert_eq!(analysis.results[0].raw_deltas.len(), 1);
    }

    #[test]
    fn inverted_range_is_swapped() {
        let range = PerturbationRange {
            low_pct: 10.0,
            high_pct: -10.0,
        }
        .normalized();
        assert_eq!(range.low_pct, -10.0);
        assert_eq!(range.high_pct, 10.0);
    }

    #[test]
    fn persists_simulation_run_record() {
        let store = MemoryStore::new();
        let (_, events) = run_and_persist_tornado_analysis(
            &request(),
            &mut Xorshift64::new(42),
            &store,
            "2026-08-01T00:00:00Z",
        );
        assert_eq!(store.records().len(), 1);
        assert!(events.iter().any(|e| e.event == "record_persisted"));
    }

    #[test]
    fn persistence_failure_still_returns_analysis() {
        let (analysis, events) = run_and_persist_tornado_analysis(
            &request(),
            &mut Xorshift64::new(42),
            &FailingStore,
            "2026-08-01T00:00:00Z",
        );
        assert_eq!(analysis.results.len(), 2);
        assert!(events.iter().any(|e| e.event == "record_persist_failed"));
    }
}
