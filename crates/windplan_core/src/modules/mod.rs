//! The domain calculators.
//!
//! Input-stage modules (cost, revenue, risk) model operational cash-flow
//! components per trial; output-stage modules (financing, npv, irr, payback)
//! derive financing and return metrics from the resulting cash-flow series.
//! Inter-module data flows through the per-trial iteration state under the
//! field names each module documents.

pub mod cost;
pub mod financing;
pub mod returns;
pub mod revenue;
pub mod risk;

pub use cost::CostModule;
pub use financing::FinancingModule;
pub use returns::{IrrModule, NpvModule, PaybackModule};
pub use revenue::RevenueModule;
pub use risk::RiskModule;
