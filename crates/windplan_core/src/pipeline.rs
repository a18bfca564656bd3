//! Two-stage pipeline.
//!
//! Stage 1 runs the operational modules (cost, revenue, risk) over N sampled
//! trials and reduces them to percentile bands. The bridge turns that
//! reduction into one cash-flow series per band; stage 2 then evaluates the
//! financing and return modules against the chosen band's series for every
//! trial. Operational uncertainty is trial-level; financing is evaluated
//! against a percentile of operations rather than a fresh joint sample.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bridge;
use crate::engine::{EngineConfig, SimulationEngine};
use crate::error::PipelineError;
use crate::model::{RunResult, SimulationContext};
use crate::modules::{
    CostModule, FinancingModule, IrrModule, NpvModule, PaybackModule, RevenueModule, RiskModule,
};
use crate::stats::Bands;

/// Output of a full two-stage run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Input-stage run: operational cash-flow components per trial
    pub input: RunResult,
    /// Cash-flow series reconstructed per semantic band
    pub bridged: Bands<Vec<f64>>,
    /// Output-stage run: financing and return metrics
    pub output: RunResult,
}

/// Run the input stage, bridge its reduction, and run the output stage.
///
/// Stage seeds are drawn from one master stream seeded with the run seed, so
/// the whole pipeline is deterministic under a single seed while the two
/// stages never share a stream position.
pub fn run_two_stage(
    ctx: &SimulationContext,
    config: &EngineConfig,
) -> Result<PipelineResult, PipelineError> {
    let mut seeds = SmallRng::seed_from_u64(config.seed);
    let input_seed = seeds.next_u64();
    let output_seed = seeds.next_u64();

    let mut input_engine = SimulationEngine::new(EngineConfig {
        seed: input_seed,
        ..config.clone()
    });
    input_engine.register_module(CostModule)?;
    input_engine.register_module(RevenueModule)?;
    input_engine.register_module(RiskModule)?;
    let input = input_engine.run(ctx)?;

    let (equity, _) = ctx.financing.split();
    let bridged = bridge::bridge_cash_flows(&input.summary, equity, ctx.project_life_years)?;
    debug!(
        band = ctx.operational_band.as_str(),
        "bridging input stage into output stage"
    );

    let mut output_ctx = ctx.clone();
    output_ctx.bridged_cash_flows = Some(bridged.get(ctx.operational_band).clone());

    let mut output_engine = SimulationEngine::new(EngineConfig {
        seed: output_seed,
        ..config.clone()
    });
    output_engine.register_module(FinancingModule)?;
    output_engine.register_module(NpvModule)?;
    output_engine.register_module(IrrModule)?;
    output_engine.register_module(PaybackModule)?;
    let output = output_engine.run(&output_ctx)?;

    Ok(PipelineResult {
        input,
        bridged,
        output,
    })
}
