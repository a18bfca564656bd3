//! Reduction of trial outcomes into percentile-banded summaries.
//!
//! Each numeric field a module produced is reduced across trials into the
//! fixed five-band record; annual series get independent bands per project
//! year. Errored trials are excluded from the reduction but counted, so the
//! summary always states how much data backs it.

use std::collections::BTreeSet;

use crate::model::{ModuleResult, ModuleSummary, TrialOutcome};
use crate::stats::{self, PercentileSpec};

/// The default reducer behind `SimModule::format_results`
#[must_use]
pub fn summarize(outcomes: &[TrialOutcome], spec: &PercentileSpec) -> ModuleSummary {
    let results: Vec<&ModuleResult> = outcomes.iter().filter_map(TrialOutcome::result).collect();
    let trials_failed = outcomes.len() - results.len();

    let mut summary = ModuleSummary {
        trials_used: results.len(),
        trials_failed,
        ..ModuleSummary::default()
    };

    let metric_names: BTreeSet<&str> = results
        .iter()
        .flat_map(|r| r.metrics.keys().map(String::as_str))
        .collect();
    for name in metric_names {
        let samples: Vec<f64> = results.iter().filter_map(|r| r.metric(name)).collect();
        summary
            .metrics
            .insert(name.to_string(), stats::bands_of(&samples, spec));
    }

    let annual_names: BTreeSet<&str> = results
        .iter()
        .flat_map(|r| r.annual.keys().map(String::as_str))
        .collect();
    for name in annual_names {
        let series: Vec<&[f64]> = results.iter().filter_map(|r| r.annual(name)).collect();
        summary
            .annual
            .insert(name.to_string(), stats::series_bands(&series, spec));
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(metric: f64, series: &[f64]) -> TrialOutcome {
        let mut result = ModuleResult::new();
        result.metrics.insert("total".to_string(), metric);
        result.annual.insert("flow".to_string(), series.to_vec());
        TrialOutcome::Completed { result }
    }

    #[test]
    fn test_summarize_counts_and_bands() {
        let outcomes = vec![
            trial(10.0, &[1.0, 2.0]),
            trial(20.0, &[3.0, 4.0]),
            TrialOutcome::Failed {
                error: "boom".to_string(),
            },
            trial(30.0, &[5.0, 6.0]),
        ];
        let summary = summarize(&outcomes, &PercentileSpec::default());

        assert_eq!(summary.trials_used, 3);
        assert_eq!(summary.trials_failed, 1);
        assert_eq!(summary.metrics["total"].primary, 20.0);
        assert_eq!(summary.annual["flow"].len(), 2);
        assert_eq!(summary.annual["flow"][1].primary, 4.0);
    }

    #[test]
    fn test_summarize_all_failed_yields_zero_bands() {
        let outcomes = vec![
            TrialOutcome::Failed {
                error: "a".to_string(),
            },
            TrialOutcome::Failed {
                error: "b".to_string(),
            },
        ];
        let summary = summarize(&outcomes, &PercentileSpec::default());
        assert_eq!(summary.trials_used, 0);
        assert_eq!(summary.trials_failed, 2);
        assert!(summary.metrics.is_empty());
        assert!(summary.annual.is_empty());
    }
}
