//! Orchestration engine: owns the module registry, the iteration count and
//! the seeded random stream, and drives the trial loop with per-module,
//! per-trial failure isolation.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigurationError, EngineError};
use crate::model::{
    IterationRecord, RunMetadata, RunResult, RunSummary, SimulationContext, SummaryEntry,
    TrialOutcome,
};
use crate::module::{ErasedModule, IterationState, SimModule};
use crate::stats::PercentileSpec;
use crate::validate;

/// How many trials a run performs and how its stream is seeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub iterations: usize,
    pub seed: u64,
    #[serde(default)]
    pub percentiles: PercentileSpec,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            iterations: 1_000,
            seed: 0,
            percentiles: PercentileSpec::default(),
        }
    }
}

/// Engine lifecycle. A run moves Idle -> Validating -> Running -> Formatting
/// -> Idle, or to Failed when context validation rejects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Validating,
    Running { current: usize, total: usize },
    Formatting,
    Failed,
}

impl EngineState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Validating => "validating",
            EngineState::Running { .. } => "running",
            EngineState::Formatting => "formatting",
            EngineState::Failed => "failed",
        }
    }
}

/// The simulation engine.
///
/// Single-threaded and synchronous: trials run sequentially, modules run
/// sequentially within a trial in registration order. `run` takes `&mut
/// self`, so two runs can never share the engine's stream.
pub struct SimulationEngine {
    config: EngineConfig,
    modules: Vec<Box<dyn ErasedModule>>,
    state: EngineState,
}

impl SimulationEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            modules: Vec::new(),
            state: EngineState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Names of the registered modules, in execution order
    #[must_use]
    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Return a Failed engine to Idle so modules can be re-registered
    pub fn reset(&mut self) {
        if self.state == EngineState::Failed {
            self.state = EngineState::Idle;
        }
    }

    /// Register a module for every subsequent run.
    ///
    /// Only permitted while Idle. Re-registering a name replaces the prior
    /// entry in place, preserving its position in the execution order.
    pub fn register_module<M: SimModule + 'static>(
        &mut self,
        module: M,
    ) -> Result<(), EngineError> {
        if self.state != EngineState::Idle {
            return Err(EngineError::NotIdle(self.state.name()));
        }
        if SimModule::name(&module).is_empty() {
            return Err(EngineError::UnnamedModule);
        }
        let name = SimModule::name(&module);
        match self.modules.iter().position(|m| m.name() == name) {
            Some(position) => self.modules[position] = Box::new(module),
            None => self.modules.push(Box::new(module)),
        }
        Ok(())
    }

    /// Run all iterations against the given context.
    ///
    /// Fails fast with the complete aggregated error list when structural
    /// validation rejects the context; once iterating, individual module
    /// failures are recorded as markers and never abort the run.
    pub fn run(&mut self, ctx: &SimulationContext) -> Result<RunResult, ConfigurationError> {
        self.state = EngineState::Validating;

        let mut errors = validate::context_violations(ctx);
        if self.config.iterations == 0 {
            errors.push("iteration count must be positive".to_string());
        }
        errors.extend(self.config.percentiles.violations());
        for module in &self.modules {
            let validation = module.validate_inputs(ctx);
            if !validation.is_valid {
                errors.extend(
                    validation
                        .errors
                        .into_iter()
                        .map(|e| format!("{}: {e}", module.name())),
                );
            }
        }
        if !errors.is_empty() {
            self.state = EngineState::Failed;
            return Err(ConfigurationError { errors });
        }

        let started_at = jiff::Timestamp::now();
        let clock = std::time::Instant::now();
        debug!(
            iterations = self.config.iterations,
            seed = self.config.seed,
            modules = ?self.module_names(),
            "starting simulation run"
        );

        // The run's injected stream; dropped with this frame on every exit path
        let mut rng = SmallRng::seed_from_u64(self.config.seed);

        let total = self.config.iterations;
        let mut iterations = Vec::with_capacity(total);
        let mut per_module: Vec<Vec<TrialOutcome>> =
            vec![Vec::with_capacity(total); self.modules.len()];

        for i in 0..total {
            self.state = EngineState::Running {
                current: i + 1,
                total,
            };

            // Fresh per trial; trial i+1 never observes trial i's state
            let mut trial_state = IterationState::new();
            let mut outputs = BTreeMap::new();

            for (index, module) in self.modules.iter().enumerate() {
                let outcome = match module.run_iteration(ctx, &trial_state, &mut rng, i) {
                    Ok(result) => {
                        trial_state.record(module.name(), result.clone());
                        TrialOutcome::Completed { result }
                    }
                    Err(e) => {
                        warn!(
                            module = module.name(),
                            iteration = i,
                            error = %e,
                            "module trial failed"
                        );
                        TrialOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                per_module[index].push(outcome.clone());
                outputs.insert(module.name().to_string(), outcome);
            }

            iterations.push(IterationRecord { outputs });
        }

        self.state = EngineState::Formatting;
        let mut summary = RunSummary::new();
        for (index, module) in self.modules.iter().enumerate() {
            let entry = match module.format_results(&per_module[index], &self.config.percentiles) {
                Ok(module_summary) => SummaryEntry::Ok {
                    summary: module_summary,
                },
                Err(e) => {
                    warn!(module = module.name(), error = %e, "formatting failed");
                    SummaryEntry::Failed {
                        error: e.to_string(),
                    }
                }
            };
            summary.insert(module.name().to_string(), entry);
        }

        let metadata = RunMetadata {
            iterations: total,
            seed: self.config.seed,
            percentiles: self.config.percentiles,
            legend: self.config.percentiles.legend(),
            project_life_years: ctx.project_life_years,
            currency: ctx.currency.clone(),
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
        };

        self.state = EngineState::Idle;
        debug!(elapsed_ms = metadata.elapsed_ms, "simulation run complete");

        Ok(RunResult {
            iterations,
            summary,
            metadata,
        })
    }
}
