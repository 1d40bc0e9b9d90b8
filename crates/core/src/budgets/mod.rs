//! Budgets module - configuration and wire models, validation, mapping, and
//! the resource handler.

mod budgets_api_model;
mod budgets_mapping;
mod budgets_model;
mod budgets_plan;
mod budgets_service;
mod budgets_traits;
mod budgets_validation;

#[cfg(test)]
mod budgets_service_tests;

pub use budgets_api_model::{Budget, BudgetProperties, CurrentSpend, Filters, Notification};
pub use budgets_mapping::{
    expand_budget_properties, expand_filters, expand_notifications, flatten_budget,
    flatten_filters, flatten_notifications,
};
pub use budgets_model::{
    BudgetConfig, BudgetState, Category, CurrentSpendState, FilterSet, NotificationOperator,
    NotificationRule, TimeGrain, ValidatedBudget, ValidatedNotification,
};
pub use budgets_plan::{plan_replacement, ReplacementPlan};
pub use budgets_service::BudgetResource;
pub use budgets_traits::{BudgetApiClient, BudgetResourceTrait};
pub use budgets_validation::{
    validate_budget_config, validate_resource_group_name, validate_resource_id,
};
