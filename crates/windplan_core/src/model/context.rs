//! The resolved settings object for one simulation run.
//!
//! A context is built once by the surrounding application (from persisted
//! scenario settings and contract data) and is read-only to the kernel.
//! Structural validation happens in [`crate::validate`] before any sampling.

use jiff::civil::Date;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::sampling::DistributionSpec;
use crate::stats::PercentileLabel;

fn default_project_life() -> usize {
    20
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_band() -> PercentileLabel {
    PercentileLabel::Primary
}

/// Everything a module needs to process one run, immutable per run.
///
/// # Conceptual Organization
///
/// **Project shape** (fixed facts):
/// - `project_life_years`, `operations_start`, `currency`
///
/// **Term blocks** (assumptions you might compare between scenarios):
/// - `financing`, `cost`, `revenue`, `risk`
///
/// **Per-year knobs**:
/// - `manual_adjustments` - one entry per project year
/// - `cost.om_cost_overrides` - contract-derived, keyed by calendar year
///
/// **Stage wiring**:
/// - `bridged_cash_flows` / `operational_band` - installed by the two-stage
///   pipeline so output-stage modules evaluate a chosen operational band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationContext {
    #[serde(default = "default_project_life")]
    pub project_life_years: usize,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// First calendar day of commercial operations; maps project years onto
    /// calendar years for contract-derived overrides
    #[serde(default)]
    pub operations_start: Option<Date>,

    #[serde(default)]
    pub financing: FinancingTerms,

    #[serde(default)]
    pub cost: CostTerms,

    #[serde(default)]
    pub revenue: RevenueTerms,

    #[serde(default)]
    pub risk: RiskTerms,

    /// One entry per project year; length must equal `project_life_years`
    #[serde(default)]
    pub manual_adjustments: Vec<YearAdjustment>,

    /// Percentile-reduced cash-flow series from a prior input stage.
    /// Index 0 is the negative initial investment, followed by one operating
    /// flow per project year.
    #[serde(default)]
    pub bridged_cash_flows: Option<Vec<f64>>,

    /// Which semantic band output-stage modules evaluate
    #[serde(default = "default_band")]
    pub operational_band: PercentileLabel,
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self {
            project_life_years: default_project_life(),
            currency: default_currency(),
            operations_start: None,
            financing: FinancingTerms::default(),
            cost: CostTerms::default(),
            revenue: RevenueTerms::default(),
            risk: RiskTerms::default(),
            manual_adjustments: Vec::new(),
            bridged_cash_flows: None,
            operational_band: default_band(),
        }
    }
}

impl SimulationContext {
    /// Calendar year a 1-based project year falls in, when an operations
    /// start date is known
    #[must_use]
    pub fn calendar_year(&self, project_year: usize) -> Option<i16> {
        self.operations_start
            .map(|start| start.year() + (project_year as i16) - 1)
    }

    /// Manual adjustment for a 1-based project year (zero when absent)
    #[must_use]
    pub fn adjustment(&self, project_year: usize) -> YearAdjustment {
        self.manual_adjustments
            .get(project_year - 1)
            .copied()
            .unwrap_or_default()
    }
}

/// Debt sizing model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FinancingModel {
    /// Corporate balance-sheet financing sized by a debt/equity ratio
    BalanceSheet { debt_to_equity_ratio: f64 },
    /// Non-recourse project finance sized as a fraction of CAPEX
    ProjectFinance { debt_to_capex_ratio: f64 },
}

impl Default for FinancingModel {
    fn default() -> Self {
        FinancingModel::BalanceSheet {
            debt_to_equity_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingTerms {
    #[serde(default)]
    pub model: FinancingModel,
    /// Construction capital expenditure
    pub capex: f64,
    /// Development expenditure, funded by equity
    #[serde(default)]
    pub devex: f64,
    /// Annual interest rate on debt
    pub interest_rate: f64,
    /// Amortization period in years
    pub loan_duration_years: usize,
    /// Discount rate for present-value metrics
    pub discount_rate: f64,
}

impl Default for FinancingTerms {
    fn default() -> Self {
        Self {
            model: FinancingModel::default(),
            capex: 10_000_000.0,
            devex: 0.0,
            interest_rate: 0.05,
            loan_duration_years: 10,
            discount_rate: 0.06,
        }
    }
}

impl FinancingTerms {
    /// Equity and debt sides of the capital structure.
    ///
    /// Balance-sheet financing sizes debt from the debt/equity ratio over
    /// CAPEX (devex is always equity-funded); project finance sizes debt as a
    /// fraction of CAPEX directly.
    #[must_use]
    pub fn split(&self) -> (f64, f64) {
        let debt = match self.model {
            FinancingModel::BalanceSheet {
                debt_to_equity_ratio,
            } => self.capex * debt_to_equity_ratio / (1.0 + debt_to_equity_ratio),
            FinancingModel::ProjectFinance {
                debt_to_capex_ratio,
            } => self.capex * debt_to_capex_ratio,
        };
        let equity = self.capex + self.devex - debt;
        (equity, debt)
    }

    /// Fixed annual payment of the amortizing loan (zero when debt-free)
    #[must_use]
    pub fn debt_service_payment(&self) -> f64 {
        let (_, debt) = self.split();
        annuity_payment(debt, self.interest_rate, self.loan_duration_years)
    }
}

/// Standard loan-payment formula: the constant annual payment that amortizes
/// `principal` at `rate` over `years`
#[must_use]
pub fn annuity_payment(principal: f64, rate: f64, years: usize) -> f64 {
    if principal <= 0.0 || years == 0 {
        return 0.0;
    }
    if rate == 0.0 {
        return principal / years as f64;
    }
    principal * rate / (1.0 - (1.0 + rate).powi(-(years as i32)))
}

/// A scheduled or probabilistic mid-life component replacement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MajorRepair {
    /// 1-based project year the repair falls in
    pub year: usize,
    pub cost: f64,
    /// Occurrence probability; `None` means the repair is certain
    #[serde(default)]
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTerms {
    /// Years covered by the OEM full-service contract
    pub oem_term_years: usize,
    /// Flat annual fee during the OEM term
    pub oem_annual_fee: f64,
    /// Base O&M cost once the OEM term ends
    pub annual_base_om: f64,
    /// Annual escalation rate applied to the base O&M cost, sampled once per
    /// trial and compounded from the end of the OEM term
    pub escalation: DistributionSpec,
    /// Per-year probability of an unplanned failure event
    pub failure_event_probability: f64,
    /// Cost of one failure event
    pub failure_event_cost: f64,
    #[serde(default)]
    pub major_repairs: Vec<MajorRepair>,
    /// Flat annual contingency
    #[serde(default)]
    pub contingency_cost: f64,
    /// Contract-derived O&M replacements keyed by calendar year; resolved by
    /// the external contract collaborator before the context reaches the
    /// kernel
    #[serde(default)]
    pub om_cost_overrides: FxHashMap<i16, f64>,
}

impl Default for CostTerms {
    fn default() -> Self {
        Self {
            oem_term_years: 5,
            oem_annual_fee: 900_000.0,
            annual_base_om: 1_000_000.0,
            escalation: DistributionSpec::fixed(0.02),
            failure_event_probability: 0.0,
            failure_event_cost: 0.0,
            major_repairs: Vec::new(),
            contingency_cost: 0.0,
            om_cost_overrides: FxHashMap::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueTerms {
    /// Annual energy production in MWh, before degradation
    pub energy_production: DistributionSpec,
    /// Geometric production decline per year of operation
    pub degradation_rate: f64,
    /// Electricity price per MWh
    pub price: DistributionSpec,
    /// Fraction of gross revenue lost to downtime in a failure-event year
    pub downtime_loss_factor: f64,
}

impl Default for RevenueTerms {
    fn default() -> Self {
        Self {
            energy_production: DistributionSpec::fixed(60_000.0),
            degradation_rate: 0.005,
            price: DistributionSpec::fixed(55.0),
            downtime_loss_factor: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTerms {
    #[serde(default)]
    pub insurance_enabled: bool,
    /// Flat annual insurance premium
    #[serde(default)]
    pub annual_premium: f64,
    /// Deductible applied to each failure-cost claim
    #[serde(default)]
    pub deductible: f64,
    /// Opening balance of the maintenance reserve fund
    #[serde(default)]
    pub reserve_fund: f64,
}

impl Default for RiskTerms {
    fn default() -> Self {
        Self {
            insurance_enabled: false,
            annual_premium: 0.0,
            deductible: 0.0,
            reserve_fund: 0.0,
        }
    }
}

/// Manual per-year corrections applied on top of modeled cost and revenue
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct YearAdjustment {
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub revenue: f64,
}
