//! Financing calculator.
//!
//! Splits the capital structure under the configured financing model,
//! computes the amortizing debt-service schedule, and derives per-year
//! debt-service coverage plus the equity cash-flow series later return
//! modules consume. Operating cash flow is resolved in order: same-trial
//! revenue/cost output, then a bridged series installed by the pipeline,
//! then fallback sampling from the revenue and cost settings.

use rand::RngCore;

use crate::error::ModuleError;
use crate::model::{ModuleResult, SimulationContext};
use crate::module::{IterationState, SimModule};
use crate::modules::{cost, revenue};
use crate::sampling::Distribution;

pub const NAME: &str = "financing";

pub const NET_CASH_FLOW: &str = "net_cash_flow";
pub const INITIAL_INVESTMENT: &str = "initial_investment";

#[derive(Debug, Clone, Copy, Default)]
pub struct FinancingModule;

#[derive(Debug, Clone)]
pub struct FinancingInputs {
    years: usize,
    equity: f64,
    debt: f64,
    loan_duration: usize,
    payment: f64,
    bridged: Option<Vec<f64>>,
    fallback: FallbackSampling,
}

/// Operating-cash-flow estimate used when a trial has neither upstream
/// module output nor a bridged series
#[derive(Debug, Clone)]
struct FallbackSampling {
    production: Distribution,
    degradation_rate: f64,
    price: Distribution,
    oem_term: usize,
    oem_fee: f64,
    base_om: f64,
}

impl FallbackSampling {
    fn operating_flow(&self, year: usize, rng: &mut dyn RngCore) -> Result<f64, ModuleError> {
        let degradation = (1.0 - self.degradation_rate).powi((year - 1) as i32);
        let energy = self.production.sample(&mut *rng)? * degradation;
        let price = self.price.at_year(year).sample(&mut *rng)?;
        let om = if year <= self.oem_term {
            self.oem_fee
        } else {
            self.base_om
        };
        Ok(energy * price - om)
    }
}

impl SimModule for FinancingModule {
    type Prepared = FinancingInputs;

    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare_input_data(&self, ctx: &SimulationContext) -> Result<FinancingInputs, ModuleError> {
        let (equity, debt) = ctx.financing.split();
        Ok(FinancingInputs {
            years: ctx.project_life_years,
            equity,
            debt,
            loan_duration: ctx.financing.loan_duration_years,
            payment: ctx.financing.debt_service_payment(),
            bridged: ctx.bridged_cash_flows.clone(),
            fallback: FallbackSampling {
                production: Distribution::from_spec(&ctx.revenue.energy_production)?,
                degradation_rate: ctx.revenue.degradation_rate,
                price: Distribution::from_spec(&ctx.revenue.price)?,
                oem_term: ctx.cost.oem_term_years,
                oem_fee: ctx.cost.oem_annual_fee,
                base_om: ctx.cost.annual_base_om,
            },
        })
    }

    fn process_iteration(
        &self,
        prepared: &FinancingInputs,
        state: &IterationState,
        rng: &mut dyn RngCore,
        _iteration: usize,
    ) -> Result<ModuleResult, ModuleError> {
        let years = prepared.years;
        let revenues = state.annual(revenue::NAME, revenue::TOTAL_REVENUE);
        let costs = state.annual(cost::NAME, cost::TOTAL_COST);

        let mut debt_service = Vec::with_capacity(years);
        let mut operating_cash_flow = Vec::with_capacity(years);
        let mut dscr = Vec::with_capacity(years);
        let mut net_cash_flow = Vec::with_capacity(years);

        for year in 1..=years {
            let service = if prepared.debt > 0.0 && year <= prepared.loan_duration {
                prepared.payment
            } else {
                0.0
            };

            let operating = match (revenues, costs) {
                (Some(rev), Some(costs)) => {
                    rev.get(year - 1).copied().unwrap_or(0.0)
                        - costs.get(year - 1).copied().unwrap_or(0.0)
                }
                _ => match &prepared.bridged {
                    // Index 0 of the bridged series is the initial investment
                    Some(series) if series.len() == years + 1 => series[year],
                    _ => prepared.fallback.operating_flow(year, &mut *rng)?,
                },
            };

            let coverage = if service > 0.0 { operating / service } else { 0.0 };

            debt_service.push(service);
            operating_cash_flow.push(operating);
            dscr.push(coverage);
            net_cash_flow.push(operating - service);
        }

        let mut result = ModuleResult::new();
        result.metrics.insert("equity".to_string(), prepared.equity);
        result.metrics.insert("debt".to_string(), prepared.debt);
        result
            .metrics
            .insert(INITIAL_INVESTMENT.to_string(), prepared.equity);
        result
            .metrics
            .insert("annual_debt_service".to_string(), prepared.payment);
        result
            .annual
            .insert("debt_service".to_string(), debt_service);
        result
            .annual
            .insert("operating_cash_flow".to_string(), operating_cash_flow);
        result.annual.insert("dscr".to_string(), dscr);
        result
            .annual
            .insert(NET_CASH_FLOW.to_string(), net_cash_flow);
        Ok(result)
    }
}
