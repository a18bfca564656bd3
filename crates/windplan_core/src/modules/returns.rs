//! Return-metric calculators: net present value, internal rate of return and
//! fractional-year payback.
//!
//! All three consume the equity cash-flow series `[-investment, flows...]`,
//! resolved from the financing module's same-trial output when present, else
//! from a bridged series installed by the pipeline.

use rand::RngCore;

use crate::error::ModuleError;
use crate::model::{ModuleResult, SimulationContext};
use crate::module::{IterationState, SimModule};
use crate::modules::financing;

const IRR_TOLERANCE: f64 = 1e-7;
const IRR_MAX_ITERATIONS: usize = 200;
const IRR_RATE_MIN: f64 = -0.999;
const IRR_RATE_MAX: f64 = 10.0;

/// Shared inputs of the three return modules
#[derive(Debug, Clone)]
pub struct CashFlowInputs {
    years: usize,
    discount_rate: f64,
    bridged: Option<Vec<f64>>,
}

fn prepare(ctx: &SimulationContext) -> CashFlowInputs {
    CashFlowInputs {
        years: ctx.project_life_years,
        discount_rate: ctx.financing.discount_rate,
        bridged: ctx.bridged_cash_flows.clone(),
    }
}

/// The series `[-investment, flow_1, ..., flow_N]` this trial evaluates
fn resolve_series(
    prepared: &CashFlowInputs,
    state: &IterationState,
) -> Result<Vec<f64>, ModuleError> {
    if let Some(result) = state.output(financing::NAME)
        && let Some(flows) = result.annual(financing::NET_CASH_FLOW)
        && let Some(investment) = result.metric(financing::INITIAL_INVESTMENT)
    {
        let mut series = Vec::with_capacity(flows.len() + 1);
        series.push(-investment);
        series.extend_from_slice(flows);
        return Ok(series);
    }
    match &prepared.bridged {
        Some(series) if series.len() == prepared.years + 1 => Ok(series.clone()),
        Some(series) => Err(ModuleError::SeriesLength {
            series: "bridged_cash_flows",
            expected: prepared.years + 1,
            found: series.len(),
        }),
        None => Err(ModuleError::MissingUpstream {
            module: financing::NAME,
            series: financing::NET_CASH_FLOW,
        }),
    }
}

/// Present value of a cash-flow series at the given discount rate
#[must_use]
pub fn net_present_value(series: &[f64], rate: f64) -> f64 {
    series
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

/// Bisection root of `net_present_value` over the discount rate.
///
/// Returns `None` when the series has no sign change over the search window,
/// i.e. no internal rate of return exists.
#[must_use]
pub fn internal_rate_of_return(series: &[f64]) -> Option<f64> {
    let mut lo = IRR_RATE_MIN;
    let mut hi = IRR_RATE_MAX;
    let mut npv_lo = net_present_value(series, lo);
    let npv_hi = net_present_value(series, hi);
    if !npv_lo.is_finite() || !npv_hi.is_finite() || npv_lo.signum() == npv_hi.signum() {
        return None;
    }
    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let npv_mid = net_present_value(series, mid);
        if npv_mid.abs() < IRR_TOLERANCE || (hi - lo) / 2.0 < IRR_TOLERANCE {
            return Some(mid);
        }
        if npv_mid.signum() == npv_lo.signum() {
            lo = mid;
            npv_lo = npv_mid;
        } else {
            hi = mid;
        }
    }
    Some((lo + hi) / 2.0)
}

/// Fractional-year payback period of `[-investment, flows...]`.
///
/// Interpolates linearly within the crossing year; a series that never
/// recovers the investment pays back at the full project life.
#[must_use]
pub fn payback_period(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mut cumulative = series[0];
    if cumulative >= 0.0 {
        return 0.0;
    }
    for (year, cf) in series.iter().enumerate().skip(1) {
        let previous = cumulative;
        cumulative += cf;
        if cumulative >= 0.0 {
            let fraction = if *cf > 0.0 { -previous / cf } else { 0.0 };
            return (year - 1) as f64 + fraction;
        }
    }
    (series.len() - 1) as f64
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NpvModule;

impl SimModule for NpvModule {
    type Prepared = CashFlowInputs;

    fn name(&self) -> &'static str {
        "npv"
    }

    fn prepare_input_data(&self, ctx: &SimulationContext) -> Result<CashFlowInputs, ModuleError> {
        Ok(prepare(ctx))
    }

    fn process_iteration(
        &self,
        prepared: &CashFlowInputs,
        state: &IterationState,
        _rng: &mut dyn RngCore,
        _iteration: usize,
    ) -> Result<ModuleResult, ModuleError> {
        let series = resolve_series(prepared, state)?;
        let discounted: Vec<f64> = series
            .iter()
            .enumerate()
            .skip(1)
            .map(|(t, cf)| cf / (1.0 + prepared.discount_rate).powi(t as i32))
            .collect();

        let mut result = ModuleResult::new();
        result.metrics.insert(
            "npv".to_string(),
            net_present_value(&series, prepared.discount_rate),
        );
        result
            .annual
            .insert("discounted_cash_flow".to_string(), discounted);
        Ok(result)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IrrModule;

impl SimModule for IrrModule {
    type Prepared = CashFlowInputs;

    fn name(&self) -> &'static str {
        "irr"
    }

    fn prepare_input_data(&self, ctx: &SimulationContext) -> Result<CashFlowInputs, ModuleError> {
        Ok(prepare(ctx))
    }

    fn process_iteration(
        &self,
        prepared: &CashFlowInputs,
        state: &IterationState,
        _rng: &mut dyn RngCore,
        _iteration: usize,
    ) -> Result<ModuleResult, ModuleError> {
        let series = resolve_series(prepared, state)?;
        let irr =
            internal_rate_of_return(&series).ok_or(ModuleError::NoConvergence("irr"))?;

        let mut result = ModuleResult::new();
        result.metrics.insert("irr".to_string(), irr);
        Ok(result)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaybackModule;

impl SimModule for PaybackModule {
    type Prepared = CashFlowInputs;

    fn name(&self) -> &'static str {
        "payback"
    }

    fn prepare_input_data(&self, ctx: &SimulationContext) -> Result<CashFlowInputs, ModuleError> {
        Ok(prepare(ctx))
    }

    fn process_iteration(
        &self,
        prepared: &CashFlowInputs,
        state: &IterationState,
        _rng: &mut dyn RngCore,
        _iteration: usize,
    ) -> Result<ModuleResult, ModuleError> {
        let series = resolve_series(prepared, state)?;
        let mut cumulative = Vec::with_capacity(series.len().saturating_sub(1));
        let mut running = series.first().copied().unwrap_or(0.0);
        for cf in series.iter().skip(1) {
            running += cf;
            cumulative.push(running);
        }

        let mut result = ModuleResult::new();
        result
            .metrics
            .insert("payback_years".to_string(), payback_period(&series));
        result
            .annual
            .insert("cumulative_cash_flow".to_string(), cumulative);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npv_known_value() {
        // 100 received in one year at 10% is worth ~90.909 today
        let npv = net_present_value(&[-90.0, 100.0], 0.10);
        assert!((npv - (100.0 / 1.1 - 90.0)).abs() < 1e-9);
    }

    #[test]
    fn test_irr_recovers_discount_rate() {
        // NPV at the IRR is zero by definition
        let series = [-1000.0, 400.0, 400.0, 400.0];
        let irr = internal_rate_of_return(&series).unwrap();
        assert!(net_present_value(&series, irr).abs() < 1e-3);
        // Known root for this series is ~9.7%
        assert!((irr - 0.0970).abs() < 1e-3);
    }

    #[test]
    fn test_irr_none_without_sign_change() {
        assert!(internal_rate_of_return(&[-100.0, -50.0, -25.0]).is_none());
    }

    #[test]
    fn test_payback_interpolates_crossing_year() {
        // Cumulative: -100, -60, -20, +20 -> crossing at 2.5 years
        assert_eq!(payback_period(&[-100.0, 40.0, 40.0, 40.0]), 2.5);
    }

    #[test]
    fn test_payback_full_life_without_crossing() {
        assert_eq!(payback_period(&[-100.0, 10.0, 10.0]), 2.0);
    }

    #[test]
    fn test_payback_zero_for_non_negative_start() {
        assert_eq!(payback_period(&[0.0, 10.0]), 0.0);
    }
}
