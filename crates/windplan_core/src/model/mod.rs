//! Type definitions: the resolved settings object consumed by a run, and the
//! result types a run produces.

pub mod context;
pub mod results;

pub use context::{
    CostTerms, FinancingModel, FinancingTerms, MajorRepair, RevenueTerms, RiskTerms,
    SimulationContext, YearAdjustment, annuity_payment,
};
pub use results::{
    IterationRecord, ModuleResult, ModuleSummary, RunMetadata, RunResult, RunSummary,
    SummaryEntry, TrialOutcome,
};
