//! ArmBudget Client - Azure Resource Manager transport for budgets.
//!
//! This crate provides the `reqwest`-based implementation of the
//! `BudgetApiClient` trait defined in `armbudget-core`, along with its
//! environment-driven configuration.

pub mod client;
pub mod config;
mod models;

// Re-export commonly used types
pub use client::ArmBudgetClient;
pub use config::{ClientConfig, DEFAULT_API_VERSION, DEFAULT_ARM_ENDPOINT};
