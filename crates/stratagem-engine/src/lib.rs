#![forbid(unsafe_code)]

//! Strategic-scenario evaluation core.
//!
//! Five cooperating analytical engines plus their shared support surface:
//!
//! - [`payoff_ranking`]: expected-value ranking of candidate actions
//! - [`sensitivity_tornado`]: perturbation sampling and tornado summarization
//! - [`domain_knowledge`]: static catalogue of strategic patterns behind a
//!   repository trait
//! - [`symmetry_mining`]: cross-domain structural-analogy discovery
//! - [`strategy_transfer`]: feasibility-gated strategy adaptation across
//!   domains
//! - [`recalibration`]: trigger-gated Bayesian belief updates and
//!   recommendation recomputation
//!
//! Support modules: [`deterministic_prng`] (seedable xorshift64 for
//! reproducible perturbation sampling), [`persistence`] (fire-and-forget
//! analysis store), [`telemetry`] (structured engine events), and
//! [`service_endpoint`] (framework-agnostic JSON endpoint contracts).
//!
//! Every engine call is stateless-per-invocation; the only shared state is
//! the read-only knowledge base. All keyed collections are `BTreeMap`/
//! `BTreeSet` and all rankings carry total tie-breakers, so identical input
//! produces identical output.

pub mod deterministic_prng;
pub mod domain_knowledge;
pub mod payoff_ranking;
pub mod persistence;
pub mod recalibration;
pub mod sensitivity_tornado;
pub mod service_endpoint;
pub mod strategy_transfer;
pub mod symmetry_mining;
pub mod telemetry;
