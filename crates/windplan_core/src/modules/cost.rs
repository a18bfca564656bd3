//! Operating cost calculator.
//!
//! Produces the annual series `om_cost`, `failure_cost`, `failure_events`,
//! `major_repair_cost`, `contingency`, `adjustment` and `total_cost`, plus
//! the `total_lifetime_cost` metric. The `failure_events` series records the
//! trial's Bernoulli failure realizations so the revenue module can gate its
//! downtime loss on the same outcomes.

use rand::{Rng, RngCore};

use crate::error::ModuleError;
use crate::model::{MajorRepair, ModuleResult, SimulationContext};
use crate::module::{IterationState, SimModule};
use crate::sampling::Distribution;

pub const NAME: &str = "cost";

pub const TOTAL_COST: &str = "total_cost";
pub const FAILURE_EVENTS: &str = "failure_events";
pub const FAILURE_COST: &str = "failure_cost";

#[derive(Debug, Clone, Copy, Default)]
pub struct CostModule;

#[derive(Debug, Clone)]
pub struct CostInputs {
    years: usize,
    oem_term: usize,
    oem_fee: f64,
    base_om: f64,
    escalation: Distribution,
    failure_probability: f64,
    failure_cost: f64,
    major_repairs: Vec<MajorRepair>,
    contingency: f64,
    /// Contract override per project year, resolved from calendar years
    overrides: Vec<Option<f64>>,
    adjustments: Vec<f64>,
}

impl SimModule for CostModule {
    type Prepared = CostInputs;

    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare_input_data(&self, ctx: &SimulationContext) -> Result<CostInputs, ModuleError> {
        let escalation = Distribution::from_spec(&ctx.cost.escalation)?;
        let overrides = (1..=ctx.project_life_years)
            .map(|year| {
                ctx.calendar_year(year)
                    .and_then(|cy| ctx.cost.om_cost_overrides.get(&cy).copied())
            })
            .collect();
        let adjustments = (1..=ctx.project_life_years)
            .map(|year| ctx.adjustment(year).cost)
            .collect();

        Ok(CostInputs {
            years: ctx.project_life_years,
            oem_term: ctx.cost.oem_term_years,
            oem_fee: ctx.cost.oem_annual_fee,
            base_om: ctx.cost.annual_base_om,
            escalation,
            failure_probability: ctx.cost.failure_event_probability,
            failure_cost: ctx.cost.failure_event_cost,
            major_repairs: ctx.cost.major_repairs.clone(),
            contingency: ctx.cost.contingency_cost,
            overrides,
            adjustments,
        })
    }

    fn process_iteration(
        &self,
        prepared: &CostInputs,
        _state: &IterationState,
        rng: &mut dyn RngCore,
        _iteration: usize,
    ) -> Result<ModuleResult, ModuleError> {
        // One escalation rate per trial, compounded from the OEM term end
        let escalation_rate = prepared.escalation.sample(&mut *rng)?;

        let years = prepared.years;
        let mut om_cost = Vec::with_capacity(years);
        let mut failure_events = Vec::with_capacity(years);
        let mut failure_cost = Vec::with_capacity(years);
        let mut major_repair_cost = Vec::with_capacity(years);
        let mut contingency = Vec::with_capacity(years);
        let mut adjustment = Vec::with_capacity(years);
        let mut total_cost = Vec::with_capacity(years);

        for year in 1..=years {
            let modeled_om = if year <= prepared.oem_term {
                prepared.oem_fee
            } else {
                let elapsed = (year - prepared.oem_term) as i32;
                prepared.base_om * (1.0 + escalation_rate).powi(elapsed)
            };
            let om = prepared.overrides[year - 1].unwrap_or(modeled_om);

            let failed = rng.random::<f64>() < prepared.failure_probability;
            let failure = if failed { prepared.failure_cost } else { 0.0 };

            let mut repairs = 0.0;
            for repair in &prepared.major_repairs {
                if repair.year != year {
                    continue;
                }
                let occurs = match repair.probability {
                    None => true,
                    Some(p) => rng.random::<f64>() < p,
                };
                if occurs {
                    repairs += repair.cost;
                }
            }

            let adj = prepared.adjustments[year - 1];

            om_cost.push(om);
            failure_events.push(if failed { 1.0 } else { 0.0 });
            failure_cost.push(failure);
            major_repair_cost.push(repairs);
            contingency.push(prepared.contingency);
            adjustment.push(adj);
            total_cost.push(om + failure + repairs + prepared.contingency + adj);
        }

        let mut result = ModuleResult::new();
        result
            .metrics
            .insert("total_lifetime_cost".to_string(), total_cost.iter().sum());
        result
            .metrics
            .insert("escalation_rate".to_string(), escalation_rate);
        result.annual.insert("om_cost".to_string(), om_cost);
        result
            .annual
            .insert(FAILURE_EVENTS.to_string(), failure_events);
        result.annual.insert(FAILURE_COST.to_string(), failure_cost);
        result
            .annual
            .insert("major_repair_cost".to_string(), major_repair_cost);
        result.annual.insert("contingency".to_string(), contingency);
        result.annual.insert("adjustment".to_string(), adjustment);
        result.annual.insert(TOTAL_COST.to_string(), total_cost);
        Ok(result)
    }
}
