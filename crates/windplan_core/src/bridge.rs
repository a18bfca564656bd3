//! Cross-stage bridge.
//!
//! Reconstructs, per semantic percentile band, an annual net-cash-flow series
//! from a formatted input-stage summary, so a second simulation stage can
//! evaluate financing against a chosen operational band instead of a fresh
//! joint sample.

use crate::error::BridgeError;
use crate::model::{RunSummary, SummaryEntry};
use crate::modules::{cost, financing, revenue};
use crate::stats::{Bands, PercentileLabel};

/// Rebuild one cash-flow series per band from a formatted summary.
///
/// Preference order per band: a direct `net_cash_flow` series from any
/// module (when its length matches the project life); else elementwise
/// revenue minus cost when both exist with matching lengths. The negative
/// initial investment is prepended, so each series has `project_life + 1`
/// entries.
pub fn bridge_cash_flows(
    summary: &RunSummary,
    initial_investment: f64,
    project_life: usize,
) -> Result<Bands<Vec<f64>>, BridgeError> {
    Bands::build(|label| {
        band_series(summary, label, project_life).map(|mut series| {
            series.insert(0, -initial_investment);
            series
        })
    })
}

fn band_series(
    summary: &RunSummary,
    label: PercentileLabel,
    project_life: usize,
) -> Result<Vec<f64>, BridgeError> {
    // Best effort: a precomputed net series wins when it covers the life
    for entry in summary.values() {
        if let SummaryEntry::Ok { summary: module } = entry
            && let Some(bands) = module.annual.get(financing::NET_CASH_FLOW)
            && bands.len() == project_life
        {
            return Ok(bands.iter().map(|b| *b.get(label)).collect());
        }
    }

    let revenue = summary
        .get(revenue::NAME)
        .and_then(SummaryEntry::summary)
        .and_then(|s| s.annual.get(revenue::TOTAL_REVENUE));
    let costs = summary
        .get(cost::NAME)
        .and_then(SummaryEntry::summary)
        .and_then(|s| s.annual.get(cost::TOTAL_COST));

    match (revenue, costs) {
        (Some(revenue), Some(costs)) if revenue.len() == costs.len() => Ok(revenue
            .iter()
            .zip(costs.iter())
            .map(|(r, c)| *r.get(label) - *c.get(label))
            .collect()),
        (Some(revenue), Some(costs)) => Err(BridgeError::LengthMismatch {
            band: label.as_str(),
            revenue: revenue.len(),
            cost: costs.len(),
        }),
        _ => Err(BridgeError::MissingSeries {
            band: label.as_str(),
        }),
    }
}
