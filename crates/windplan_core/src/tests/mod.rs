//! Integration tests for the windplan simulation engine
//!
//! Tests are organized by topic:
//! - `engine` - Registry rules, state machine, determinism, failure isolation
//! - `modules` - Domain calculator semantics (cost, revenue, risk, financing)
//! - `pipeline` - Bridge and two-stage pipeline behavior

mod modules;
mod pipeline;
