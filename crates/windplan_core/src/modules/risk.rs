//! Insurance and reserve-fund calculator.
//!
//! When insurance is enabled, charges the flat annual premium and pays out
//! each failure-cost claim above the deductible. Independently of claims, a
//! maintenance reserve fund draws down whenever the trial's net operating
//! cash flow (including the insurance result) is negative; the balance is
//! tracked across years within the trial.

use rand::RngCore;

use crate::error::ModuleError;
use crate::model::{ModuleResult, SimulationContext};
use crate::module::{IterationState, SimModule};
use crate::modules::{cost, revenue};

pub const NAME: &str = "risk";

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskModule;

#[derive(Debug, Clone, Copy)]
pub struct RiskInputs {
    years: usize,
    enabled: bool,
    annual_premium: f64,
    deductible: f64,
    reserve_fund: f64,
}

impl SimModule for RiskModule {
    type Prepared = RiskInputs;

    fn name(&self) -> &'static str {
        NAME
    }

    fn prepare_input_data(&self, ctx: &SimulationContext) -> Result<RiskInputs, ModuleError> {
        Ok(RiskInputs {
            years: ctx.project_life_years,
            enabled: ctx.risk.insurance_enabled,
            annual_premium: ctx.risk.annual_premium,
            deductible: ctx.risk.deductible,
            reserve_fund: ctx.risk.reserve_fund,
        })
    }

    fn process_iteration(
        &self,
        prepared: &RiskInputs,
        state: &IterationState,
        _rng: &mut dyn RngCore,
        _iteration: usize,
    ) -> Result<ModuleResult, ModuleError> {
        let years = prepared.years;
        let failure_costs = state.annual(cost::NAME, cost::FAILURE_COST);
        let total_costs = state.annual(cost::NAME, cost::TOTAL_COST);
        let total_revenues = state.annual(revenue::NAME, revenue::TOTAL_REVENUE);

        let mut premium = vec![0.0; years];
        let mut insurance_payout = vec![0.0; years];
        let mut reserve_drawdown = vec![0.0; years];
        let mut reserve_balance = vec![prepared.reserve_fund; years];

        if prepared.enabled {
            let mut reserve = prepared.reserve_fund;
            for year in 1..=years {
                let idx = year - 1;
                premium[idx] = prepared.annual_premium;

                let claim = failure_costs
                    .and_then(|f| f.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                if claim > 0.0 {
                    insurance_payout[idx] = (claim - prepared.deductible).max(0.0);
                }

                // Reserve covers shortfalls of the year's net position
                let operating = match (total_revenues, total_costs) {
                    (Some(rev), Some(costs)) => {
                        rev.get(idx).copied().unwrap_or(0.0)
                            - costs.get(idx).copied().unwrap_or(0.0)
                    }
                    _ => 0.0,
                };
                let net = operating + insurance_payout[idx] - premium[idx];
                if net < 0.0 {
                    let drawdown = (-net).min(reserve);
                    reserve -= drawdown;
                    reserve_drawdown[idx] = drawdown;
                }
                reserve_balance[idx] = reserve;
            }
        }

        let mut result = ModuleResult::new();
        result
            .metrics
            .insert("total_premiums".to_string(), premium.iter().sum());
        result
            .metrics
            .insert("total_payouts".to_string(), insurance_payout.iter().sum());
        result.metrics.insert(
            "final_reserve".to_string(),
            reserve_balance.last().copied().unwrap_or(prepared.reserve_fund),
        );
        result.annual.insert("premium".to_string(), premium);
        result
            .annual
            .insert("insurance_payout".to_string(), insurance_payout);
        result
            .annual
            .insert("reserve_drawdown".to_string(), reserve_drawdown);
        result
            .annual
            .insert("reserve_balance".to_string(), reserve_balance);
        Ok(result)
    }
}
