//! The uniform contract every domain calculator implements, and the
//! per-trial accumulator that carries module outputs to later modules of the
//! same trial.

use rand::RngCore;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, ModuleError};
use crate::format;
use crate::model::{ModuleResult, ModuleSummary, SimulationContext, TrialOutcome};
use crate::stats::PercentileSpec;

/// Result of a module's input validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl Validation {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Per-trial accumulator of module outputs.
///
/// Created fresh by the engine for every trial and discarded after the
/// trial's record is copied out, so trial i+1 can never observe trial i's
/// state. Modules read earlier modules' same-trial output through it; only
/// the engine writes.
#[derive(Debug, Default)]
pub struct IterationState {
    outputs: FxHashMap<&'static str, ModuleResult>,
}

impl IterationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a module's result for downstream modules of the same trial
    pub fn record(&mut self, module: &'static str, result: ModuleResult) {
        self.outputs.insert(module, result);
    }

    /// A module's output from earlier in this trial
    #[must_use]
    pub fn output(&self, module: &str) -> Option<&ModuleResult> {
        self.outputs.get(module)
    }

    /// Shorthand for an earlier module's named annual series
    #[must_use]
    pub fn annual(&self, module: &str, series: &str) -> Option<&[f64]> {
        self.output(module).and_then(|r| r.annual(series))
    }

    /// Shorthand for an earlier module's named scalar metric
    #[must_use]
    pub fn metric(&self, module: &str, name: &str) -> Option<f64> {
        self.output(module).and_then(|r| r.metric(name))
    }
}

/// The module contract.
///
/// Every domain calculator is a distinct type implementing these four
/// operations. `process_iteration` must be pure given its inputs plus the
/// injected random stream: it may read earlier modules' same-trial output
/// from the iteration state, but its only effect is the returned result.
pub trait SimModule {
    /// Module-specific data derived from the context before each trial
    type Prepared;

    /// Stable registry name; must be non-empty
    fn name(&self) -> &'static str;

    /// Module-level input validation; the default accepts everything
    fn validate_inputs(&self, _ctx: &SimulationContext) -> Validation {
        Validation::valid()
    }

    /// Resolve the context into whatever this module needs per trial
    fn prepare_input_data(&self, ctx: &SimulationContext) -> Result<Self::Prepared, ModuleError>;

    /// Compute one trial
    fn process_iteration(
        &self,
        prepared: &Self::Prepared,
        state: &IterationState,
        rng: &mut dyn RngCore,
        iteration: usize,
    ) -> Result<ModuleResult, ModuleError>;

    /// Reduce all trial outcomes into a percentile summary; the default
    /// applies the standard banding to every field
    fn format_results(
        &self,
        outcomes: &[TrialOutcome],
        spec: &PercentileSpec,
    ) -> Result<ModuleSummary, FormatError> {
        Ok(format::summarize(outcomes, spec))
    }
}

/// Object-safe form of [`SimModule`] so the registry can hold modules with
/// heterogeneous `Prepared` types.
pub(crate) trait ErasedModule {
    fn name(&self) -> &'static str;
    fn validate_inputs(&self, ctx: &SimulationContext) -> Validation;
    fn run_iteration(
        &self,
        ctx: &SimulationContext,
        state: &IterationState,
        rng: &mut dyn RngCore,
        iteration: usize,
    ) -> Result<ModuleResult, ModuleError>;
    fn format_results(
        &self,
        outcomes: &[TrialOutcome],
        spec: &PercentileSpec,
    ) -> Result<ModuleSummary, FormatError>;
}

impl<M: SimModule> ErasedModule for M {
    fn name(&self) -> &'static str {
        SimModule::name(self)
    }

    fn validate_inputs(&self, ctx: &SimulationContext) -> Validation {
        SimModule::validate_inputs(self, ctx)
    }

    fn run_iteration(
        &self,
        ctx: &SimulationContext,
        state: &IterationState,
        rng: &mut dyn RngCore,
        iteration: usize,
    ) -> Result<ModuleResult, ModuleError> {
        let prepared = self.prepare_input_data(ctx)?;
        self.process_iteration(&prepared, state, rng, iteration)
    }

    fn format_results(
        &self,
        outcomes: &[TrialOutcome],
        spec: &PercentileSpec,
    ) -> Result<ModuleSummary, FormatError> {
        SimModule::format_results(self, outcomes, spec)
    }
}
