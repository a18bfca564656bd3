//! Revenue calculator.
//!
//! Samples energy production (geometrically degraded over the project life)
//! and electricity price, and subtracts the downtime loss of failure-event
//! years. The failure gate reuses the realization the cost module recorded
//! for this trial; an independent draw with the same probability is made only
//! when no cost output is present in the trial state.

use rand::{Rng, RngCore};

use crate::error::ModuleError;
use crate::model::{ModuleResult, SimulationContext};
use crate::module::{IterationState, SimModule};
use crate::modules::cost;
use crate::sampling::Distribution;

pub const NAME: &str = "revenue";

pub const TOTAL_REVENUE: &str = "total_revenue";

#[derive(Debug, Clone, Copy, Default)]
pub struct RevenueModule;

#[derive(Debug, Clone)]
pub struct RevenueInputs {
    years: usize,
    production: Distribution,
    degradation_rate: f64,
    price: Distribution,
    downtime_loss_factor: f64,
    failure_probability: f64,
    adjustments: Vec<f64>,
}

impl SimModule for RevenueModule {
    type Prepared = RevenueInputs;

    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare_input_data(&self, ctx: &SimulationContext) -> Result<RevenueInputs, ModuleError> {
        let production = Distribution::from_spec(&ctx.revenue.energy_production)?;
        let price = Distribution::from_spec(&ctx.revenue.price)?;
        let adjustments = (1..=ctx.project_life_years)
            .map(|year| ctx.adjustment(year).revenue)
            .collect();

        Ok(RevenueInputs {
            years: ctx.project_life_years,
            production,
            degradation_rate: ctx.revenue.degradation_rate,
            price,
            downtime_loss_factor: ctx.revenue.downtime_loss_factor,
            failure_probability: ctx.cost.failure_event_probability,
            adjustments,
        })
    }

    fn process_iteration(
        &self,
        prepared: &RevenueInputs,
        state: &IterationState,
        rng: &mut dyn RngCore,
        _iteration: usize,
    ) -> Result<ModuleResult, ModuleError> {
        let failure_realizations = state.annual(cost::NAME, cost::FAILURE_EVENTS);

        let years = prepared.years;
        let mut energy_mwh = Vec::with_capacity(years);
        let mut price = Vec::with_capacity(years);
        let mut gross_revenue = Vec::with_capacity(years);
        let mut downtime_loss = Vec::with_capacity(years);
        let mut adjustment = Vec::with_capacity(years);
        let mut total_revenue = Vec::with_capacity(years);

        for year in 1..=years {
            let degradation = (1.0 - prepared.degradation_rate).powi((year - 1) as i32);
            let energy = prepared.production.sample(&mut *rng)? * degradation;
            let unit_price = prepared.price.at_year(year).sample(&mut *rng)?;
            let gross = energy * unit_price;

            let failed = match failure_realizations.and_then(|f| f.get(year - 1)) {
                Some(&flag) => flag > 0.5,
                // Fallback draw; only reached when the cost module is absent
                None => rng.random::<f64>() < prepared.failure_probability,
            };
            let downtime = if failed {
                gross * prepared.downtime_loss_factor
            } else {
                0.0
            };

            let adj = prepared.adjustments[year - 1];

            energy_mwh.push(energy);
            price.push(unit_price);
            gross_revenue.push(gross);
            downtime_loss.push(downtime);
            adjustment.push(adj);
            total_revenue.push(gross - downtime + adj);
        }

        let mut result = ModuleResult::new();
        result.metrics.insert(
            "total_lifetime_revenue".to_string(),
            total_revenue.iter().sum(),
        );
        result.annual.insert("energy_mwh".to_string(), energy_mwh);
        result.annual.insert("price".to_string(), price);
        result
            .annual
            .insert("gross_revenue".to_string(), gross_revenue);
        result
            .annual
            .insert("downtime_loss".to_string(), downtime_loss);
        result.annual.insert("adjustment".to_string(), adjustment);
        result
            .annual
            .insert(TOTAL_REVENUE.to_string(), total_revenue);
        Ok(result)
    }
}
