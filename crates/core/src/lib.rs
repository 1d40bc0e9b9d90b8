//! ArmBudget Core - Consumption budget resource handling.
//!
//! This crate contains the budget configuration model, validation, the
//! mapping to and from the billing API wire model, and the resource
//! lifecycle handler. It is transport-agnostic and defines the
//! `BudgetApiClient` trait that the `armbudget-client` crate implements.

pub mod budgets;
pub mod constants;
pub mod errors;
pub mod resource_id;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
