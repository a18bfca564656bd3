//! Tests for the domain calculators
//!
//! These tests verify:
//! - Cost composition (OEM term, escalation, overrides, adjustments)
//! - The shared failure-event realization between cost and revenue
//! - Insurance payouts and reserve-fund drawdown
//! - Debt sizing and the amortizing debt-service schedule

use rustc_hash::FxHashMap;

use crate::engine::{EngineConfig, SimulationEngine};
use crate::model::{
    CostTerms, FinancingModel, FinancingTerms, MajorRepair, RevenueTerms, RiskTerms,
    RunResult, SimulationContext, YearAdjustment, annuity_payment,
};
use crate::modules::{CostModule, FinancingModule, RevenueModule, RiskModule};
use crate::sampling::DistributionSpec;

fn run_modules(ctx: &SimulationContext, iterations: usize, seed: u64) -> RunResult {
    let mut engine = SimulationEngine::new(EngineConfig {
        iterations,
        seed,
        ..EngineConfig::default()
    });
    engine.register_module(CostModule).unwrap();
    engine.register_module(RevenueModule).unwrap();
    engine.register_module(RiskModule).unwrap();
    engine.register_module(FinancingModule).unwrap();
    engine.run(ctx).unwrap()
}

/// One-year project with a bare O&M cost and nothing stochastic
#[test]
fn test_cost_single_year_base_om() {
    let ctx = SimulationContext {
        project_life_years: 1,
        cost: CostTerms {
            oem_term_years: 0,
            oem_annual_fee: 0.0,
            annual_base_om: 1_000_000.0,
            escalation: DistributionSpec::fixed(0.0),
            failure_event_probability: 0.0,
            failure_event_cost: 0.0,
            contingency_cost: 0.0,
            ..CostTerms::default()
        },
        ..SimulationContext::default()
    };

    let result = run_modules(&ctx, 1, 1);
    let cost = result.iterations[0].outputs["cost"].result().unwrap();
    assert_eq!(cost.annual("total_cost").unwrap(), &[1_000_000.0]);
    assert_eq!(cost.metric("total_lifetime_cost"), Some(1_000_000.0));
}

#[test]
fn test_cost_oem_term_then_escalation() {
    let ctx = SimulationContext {
        project_life_years: 4,
        cost: CostTerms {
            oem_term_years: 2,
            oem_annual_fee: 500_000.0,
            annual_base_om: 1_000_000.0,
            escalation: DistributionSpec::fixed(0.10),
            failure_event_probability: 0.0,
            contingency_cost: 0.0,
            ..CostTerms::default()
        },
        ..SimulationContext::default()
    };

    let result = run_modules(&ctx, 1, 1);
    let cost = result.iterations[0].outputs["cost"].result().unwrap();
    let om = cost.annual("om_cost").unwrap();
    // Flat fee inside the term, then escalation compounds from the term end
    assert_eq!(om[0], 500_000.0);
    assert_eq!(om[1], 500_000.0);
    assert!((om[2] - 1_100_000.0).abs() < 1e-6);
    assert!((om[3] - 1_210_000.0).abs() < 1e-6);
}

#[test]
fn test_cost_calendar_year_override_replaces_om() {
    let mut overrides = FxHashMap::default();
    overrides.insert(2031_i16, 250_000.0);
    let ctx = SimulationContext {
        project_life_years: 3,
        operations_start: Some(jiff::civil::date(2030, 1, 1)),
        cost: CostTerms {
            oem_term_years: 3,
            oem_annual_fee: 500_000.0,
            failure_event_probability: 0.0,
            contingency_cost: 0.0,
            om_cost_overrides: overrides,
            ..CostTerms::default()
        },
        ..SimulationContext::default()
    };

    let result = run_modules(&ctx, 1, 1);
    let cost = result.iterations[0].outputs["cost"].result().unwrap();
    // Project year 2 falls in calendar 2031 and takes the contract override
    assert_eq!(cost.annual("om_cost").unwrap(), &[500_000.0, 250_000.0, 500_000.0]);
}

#[test]
fn test_cost_major_repairs_and_adjustments() {
    let ctx = SimulationContext {
        project_life_years: 3,
        cost: CostTerms {
            oem_term_years: 3,
            oem_annual_fee: 100_000.0,
            failure_event_probability: 0.0,
            contingency_cost: 50_000.0,
            major_repairs: vec![
                MajorRepair {
                    year: 2,
                    cost: 2_000_000.0,
                    probability: None,
                },
                MajorRepair {
                    year: 3,
                    cost: 9_000_000.0,
                    probability: Some(0.0),
                },
            ],
            ..CostTerms::default()
        },
        manual_adjustments: vec![
            YearAdjustment {
                cost: 10_000.0,
                revenue: 0.0,
            },
            YearAdjustment::default(),
            YearAdjustment::default(),
        ],
        ..SimulationContext::default()
    };

    let result = run_modules(&ctx, 1, 1);
    let cost = result.iterations[0].outputs["cost"].result().unwrap();
    // Deterministic repair fires, zero-probability repair never does
    assert_eq!(cost.annual("major_repair_cost").unwrap(), &[0.0, 2_000_000.0, 0.0]);
    let total = cost.annual("total_cost").unwrap();
    assert_eq!(total[0], 100_000.0 + 50_000.0 + 10_000.0);
    assert_eq!(total[1], 100_000.0 + 50_000.0 + 2_000_000.0);
}

/// The intentional coupling: revenue's downtime loss must derive from the
/// same Bernoulli outcome cost recorded for that trial/year
#[test]
fn test_cost_revenue_share_one_failure_realization() {
    let ctx = SimulationContext {
        project_life_years: 5,
        cost: CostTerms {
            failure_event_probability: 0.5,
            failure_event_cost: 100_000.0,
            ..CostTerms::default()
        },
        revenue: RevenueTerms {
            downtime_loss_factor: 0.25,
            ..RevenueTerms::default()
        },
        ..SimulationContext::default()
    };

    let result = run_modules(&ctx, 100, 11);
    let mut failures_seen = 0;
    for record in &result.iterations {
        let cost = record.outputs["cost"].result().unwrap();
        let revenue = record.outputs["revenue"].result().unwrap();
        let failure_cost = cost.annual("failure_cost").unwrap();
        let downtime = revenue.annual("downtime_loss").unwrap();
        for year in 0..5 {
            if failure_cost[year] > 0.0 {
                failures_seen += 1;
                assert!(downtime[year] > 0.0, "downtime must follow the failure draw");
            } else {
                assert_eq!(downtime[year], 0.0);
            }
        }
    }
    // With p = 0.5 over 500 trial-years, both branches are exercised
    assert!(failures_seen > 100 && failures_seen < 400);
}

#[test]
fn test_risk_payouts_and_reserve_drawdown() {
    let ctx = SimulationContext {
        project_life_years: 3,
        cost: CostTerms {
            oem_term_years: 3,
            oem_annual_fee: 300_000.0,
            failure_event_probability: 1.0,
            failure_event_cost: 100_000.0,
            contingency_cost: 0.0,
            ..CostTerms::default()
        },
        // No production, so every year's net position is negative
        revenue: RevenueTerms {
            energy_production: DistributionSpec::fixed(0.0),
            price: DistributionSpec::fixed(0.0),
            ..RevenueTerms::default()
        },
        risk: RiskTerms {
            insurance_enabled: true,
            annual_premium: 10_000.0,
            deductible: 20_000.0,
            reserve_fund: 500_000.0,
        },
        ..SimulationContext::default()
    };

    let result = run_modules(&ctx, 1, 5);
    let risk = result.iterations[0].outputs["risk"].result().unwrap();

    // Every year claims 100k against a 20k deductible
    assert_eq!(risk.annual("insurance_payout").unwrap(), &[80_000.0; 3]);
    assert_eq!(risk.metric("total_premiums"), Some(30_000.0));

    // Yearly shortfall: -(300k + 100k) + 80k - 10k = -330k; the 500k reserve
    // absorbs the first year and part of the second, then is exhausted
    assert_eq!(risk.annual("reserve_drawdown").unwrap(), &[330_000.0, 170_000.0, 0.0]);
    assert_eq!(risk.annual("reserve_balance").unwrap(), &[170_000.0, 0.0, 0.0]);
    assert_eq!(risk.metric("final_reserve"), Some(0.0));
}

#[test]
fn test_risk_disabled_emits_zeroes() {
    let ctx = SimulationContext {
        project_life_years: 2,
        risk: RiskTerms {
            insurance_enabled: false,
            annual_premium: 10_000.0,
            deductible: 0.0,
            reserve_fund: 100_000.0,
        },
        ..SimulationContext::default()
    };
    let result = run_modules(&ctx, 1, 1);
    let risk = result.iterations[0].outputs["risk"].result().unwrap();
    assert_eq!(risk.annual("premium").unwrap(), &[0.0, 0.0]);
    assert_eq!(risk.metric("total_payouts"), Some(0.0));
}

/// Balance-sheet sizing at 1.5 debt/equity over 10M CAPEX, 5% over 10 years
#[test]
fn test_financing_balance_sheet_split_and_schedule() {
    let ctx = SimulationContext {
        project_life_years: 12,
        financing: FinancingTerms {
            model: FinancingModel::BalanceSheet {
                debt_to_equity_ratio: 1.5,
            },
            capex: 10_000_000.0,
            devex: 0.0,
            interest_rate: 0.05,
            loan_duration_years: 10,
            discount_rate: 0.06,
        },
        ..SimulationContext::default()
    };

    let result = run_modules(&ctx, 1, 1);
    let financing = result.iterations[0].outputs["financing"].result().unwrap();

    assert_eq!(financing.metric("equity"), Some(4_000_000.0));
    assert_eq!(financing.metric("debt"), Some(6_000_000.0));

    let expected_payment = 6_000_000.0 * 0.05 / (1.0 - 1.05_f64.powi(-10));
    let schedule = financing.annual("debt_service").unwrap();
    for year in 0..10 {
        assert!((schedule[year] - expected_payment).abs() < 1e-6);
    }
    // Debt service stops dead after the loan duration
    assert_eq!(schedule[10], 0.0);
    assert_eq!(schedule[11], 0.0);
}

#[test]
fn test_financing_project_finance_split() {
    let terms = FinancingTerms {
        model: FinancingModel::ProjectFinance {
            debt_to_capex_ratio: 0.7,
        },
        capex: 10_000_000.0,
        devex: 1_000_000.0,
        ..FinancingTerms::default()
    };
    let (equity, debt) = terms.split();
    assert_eq!(debt, 7_000_000.0);
    assert_eq!(equity, 4_000_000.0);
}

#[test]
fn test_annuity_payment_edge_cases() {
    assert_eq!(annuity_payment(0.0, 0.05, 10), 0.0);
    assert_eq!(annuity_payment(1_000.0, 0.0, 10), 100.0);
}

#[test]
fn test_financing_dscr_uses_upstream_flows() {
    let ctx = SimulationContext {
        project_life_years: 2,
        cost: CostTerms {
            oem_term_years: 2,
            oem_annual_fee: 1_000_000.0,
            failure_event_probability: 0.0,
            contingency_cost: 0.0,
            ..CostTerms::default()
        },
        revenue: RevenueTerms {
            energy_production: DistributionSpec::fixed(50_000.0),
            degradation_rate: 0.0,
            price: DistributionSpec::fixed(60.0),
            downtime_loss_factor: 0.0,
        },
        financing: FinancingTerms {
            model: FinancingModel::BalanceSheet {
                debt_to_equity_ratio: 1.0,
            },
            capex: 10_000_000.0,
            devex: 0.0,
            interest_rate: 0.05,
            loan_duration_years: 2,
            discount_rate: 0.06,
        },
        ..SimulationContext::default()
    };

    let result = run_modules(&ctx, 1, 1);
    let financing = result.iterations[0].outputs["financing"].result().unwrap();

    // Operating flow is 50,000 MWh * 60 - 1,000,000 = 2,000,000 per year
    let operating = financing.annual("operating_cash_flow").unwrap();
    assert!((operating[0] - 2_000_000.0).abs() < 1e-6);

    let payment = annuity_payment(5_000_000.0, 0.05, 2);
    let dscr = financing.annual("dscr").unwrap();
    assert!((dscr[0] - 2_000_000.0 / payment).abs() < 1e-9);

    let net = financing.annual("net_cash_flow").unwrap();
    assert!((net[0] - (2_000_000.0 - payment)).abs() < 1e-6);
}
