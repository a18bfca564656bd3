//! Wind project financial simulation library
//!
//! This crate provides a Monte Carlo simulation kernel for the financial and
//! operational outcomes of a long-lived wind energy project. It supports:
//! - A uniform module contract for domain calculators (cost, revenue,
//!   risk/insurance, financing, NPV, IRR, payback)
//! - A registry-driven orchestration engine with a seeded stream and
//!   per-module, per-trial failure isolation
//! - A distribution sampling layer (normal, lognormal, triangular, uniform,
//!   weibull, exponential, poisson, fixed) plus turbulence-corrected wind
//!   speed and year-conditioned geometric Brownian motion
//! - Nearest-rank percentile reduction into fixed five-band records with
//!   semantic labels
//! - A two-stage pipeline that bridges percentile-reduced operational cash
//!   flows into a financing evaluation stage
//!
//! # Running a simulation
//!
//! ```ignore
//! use windplan_core::engine::{EngineConfig, SimulationEngine};
//! use windplan_core::model::SimulationContext;
//! use windplan_core::modules::{CostModule, RevenueModule, RiskModule};
//!
//! let mut engine = SimulationEngine::new(EngineConfig {
//!     iterations: 5_000,
//!     seed: 42,
//!     ..EngineConfig::default()
//! });
//! engine.register_module(CostModule)?;
//! engine.register_module(RevenueModule)?;
//! engine.register_module(RiskModule)?;
//!
//! let result = engine.run(&SimulationContext::default())?;
//! let cost = result.module_summary("cost").unwrap();
//! println!("P50 lifetime cost: {}", cost.metrics["total_lifetime_cost"].primary);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod bridge;
pub mod engine;
pub mod error;
pub mod format;
pub mod module;
pub mod modules;
pub mod pipeline;
pub mod sampling;
pub mod stats;
pub mod validate;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use engine::{EngineConfig, EngineState, SimulationEngine};
pub use model::{RunResult, SimulationContext};
pub use module::{IterationState, SimModule, Validation};
pub use pipeline::{PipelineResult, run_two_stage};
pub use sampling::{Distribution, DistributionSpec};
pub use stats::{Bands, PercentileLabel, PercentileSpec};
