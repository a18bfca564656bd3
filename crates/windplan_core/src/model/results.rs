//! Run output types: per-trial module results, the per-module percentile
//! summaries, and the complete run record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::{Bands, PercentileLabel, PercentileSpec};

/// One module's output for one trial.
///
/// `annual` holds named per-year series (index 0 = project year 1); `metrics`
/// holds named scalar summaries. Immutable once returned to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    #[serde(default)]
    pub annual: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl ModuleResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Named per-year series, if this module produced it
    #[must_use]
    pub fn annual(&self, name: &str) -> Option<&[f64]> {
        self.annual.get(name).map(Vec::as_slice)
    }

    /// Named scalar metric, if this module produced it
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Outcome of one (module, trial) pair.
///
/// A failed trial function is recorded here as a marker instead of aborting
/// the run; errored trials are excluded from that module's reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum TrialOutcome {
    Completed { result: ModuleResult },
    Failed { error: String },
}

impl TrialOutcome {
    #[must_use]
    pub fn result(&self) -> Option<&ModuleResult> {
        match self {
            TrialOutcome::Completed { result } => Some(result),
            TrialOutcome::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, TrialOutcome::Failed { .. })
    }
}

/// All module outcomes of one trial, keyed by module name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub outputs: BTreeMap<String, TrialOutcome>,
}

/// A module's reduction of N trials into percentile-banded structures;
/// the externally visible shape of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    /// Per-year uncertainty bands for every annual series the module produced
    pub annual: BTreeMap<String, Vec<Bands>>,
    /// Bands for every scalar metric
    pub metrics: BTreeMap<String, Bands>,
    /// Trials that contributed to the reduction
    pub trials_used: usize,
    /// Trials excluded because the module's trial function failed
    pub trials_failed: usize,
}

/// A module's slot in the run summary: its reduction, or a marker when the
/// reducer itself failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum SummaryEntry {
    Ok { summary: ModuleSummary },
    Failed { error: String },
}

impl SummaryEntry {
    #[must_use]
    pub fn summary(&self) -> Option<&ModuleSummary> {
        match self {
            SummaryEntry::Ok { summary } => Some(summary),
            SummaryEntry::Failed { .. } => None,
        }
    }
}

/// Per-module summaries keyed by module name
pub type RunSummary = BTreeMap<String, SummaryEntry>;

/// Descriptive record of how a run was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub iterations: usize,
    pub seed: u64,
    pub percentiles: PercentileSpec,
    /// Nearest-rank label ("P5", ...) behind each semantic label
    pub legend: Vec<(String, PercentileLabel)>,
    pub project_life_years: usize,
    pub currency: String,
    pub started_at: jiff::Timestamp,
    pub elapsed_ms: u64,
}

/// Complete output of one engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Raw per-trial outcomes in trial order
    pub iterations: Vec<IterationRecord>,
    pub summary: RunSummary,
    pub metadata: RunMetadata,
}

impl RunResult {
    /// A module's summary, when it exists and formatted cleanly
    #[must_use]
    pub fn module_summary(&self, name: &str) -> Option<&ModuleSummary> {
        self.summary.get(name).and_then(SummaryEntry::summary)
    }
}
