//! Structural context validation.
//!
//! Only shape and sanity are checked here; business-rule validation belongs
//! to the surrounding application. The engine refuses to sample from a
//! context with any violation, reporting the complete list at once.

use crate::model::{FinancingModel, SimulationContext};
use crate::module::Validation;

/// Every structural violation in the context (empty when valid)
#[must_use]
pub fn context_violations(ctx: &SimulationContext) -> Vec<String> {
    let mut errors = Vec::new();

    if ctx.project_life_years == 0 {
        errors.push("project life must be at least one year".to_string());
    }

    // An empty sequence means no adjustments; a non-empty one must cover
    // every project year
    if !ctx.manual_adjustments.is_empty()
        && ctx.manual_adjustments.len() != ctx.project_life_years
    {
        errors.push(format!(
            "manual adjustments cover {} years, project life is {}",
            ctx.manual_adjustments.len(),
            ctx.project_life_years
        ));
    }

    for (name, value) in [
        ("capex", ctx.financing.capex),
        ("devex", ctx.financing.devex),
    ] {
        if !value.is_finite() || value < 0.0 {
            errors.push(format!("{name} must be finite and non-negative"));
        }
    }
    if !ctx.financing.interest_rate.is_finite() {
        errors.push("interest rate must be finite".to_string());
    }
    if !ctx.financing.discount_rate.is_finite() || ctx.financing.discount_rate <= -1.0 {
        errors.push("discount rate must be finite and above -100%".to_string());
    }
    let ratio = match ctx.financing.model {
        FinancingModel::BalanceSheet {
            debt_to_equity_ratio,
        } => debt_to_equity_ratio,
        FinancingModel::ProjectFinance {
            debt_to_capex_ratio,
        } => debt_to_capex_ratio,
    };
    if !ratio.is_finite() || ratio < 0.0 {
        errors.push("financing ratio must be finite and non-negative".to_string());
    }
    if ratio > 0.0 && ctx.financing.capex > 0.0 && ctx.financing.loan_duration_years == 0 {
        errors.push("loan duration must be at least one year when debt is drawn".to_string());
    }

    for (name, value) in [
        (
            "failure event probability",
            ctx.cost.failure_event_probability,
        ),
        ("degradation rate", ctx.revenue.degradation_rate),
        ("downtime loss factor", ctx.revenue.downtime_loss_factor),
    ] {
        if !value.is_finite() {
            errors.push(format!("{name} must be finite"));
        }
    }

    for repair in &ctx.cost.major_repairs {
        if repair.year == 0 || repair.year > ctx.project_life_years {
            errors.push(format!(
                "major repair year {} is outside the project life",
                repair.year
            ));
        }
    }

    if let Some(series) = &ctx.bridged_cash_flows
        && series.len() != ctx.project_life_years + 1
    {
        errors.push(format!(
            "bridged cash-flow series has {} entries, expected {} (investment plus one per year)",
            series.len(),
            ctx.project_life_years + 1
        ));
    }

    errors
}

/// Validation-collaborator view of [`context_violations`]
#[must_use]
pub fn validate_context(ctx: &SimulationContext) -> Validation {
    let errors = context_violations(ctx);
    if errors.is_empty() {
        Validation::valid()
    } else {
        Validation::invalid(errors)
    }
}
