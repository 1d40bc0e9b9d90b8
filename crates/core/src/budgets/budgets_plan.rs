//! Replacement planning.
//!
//! Budgets have no in-place update: every field is immutable once created,
//! so any difference between tracked state and configuration forces the
//! resource to be recreated. This module works out which fields differ.

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;

use crate::constants::{
    FIELD_AMOUNT, FIELD_CATEGORY, FIELD_FILTERS, FIELD_NAME, FIELD_NOTIFICATION,
    FIELD_RESOURCE_GROUP_NAME, FIELD_TIME_GRAIN,
};
use crate::errors::Result;

use super::budgets_model::{
    BudgetConfig, BudgetState, Category, FilterSet, NotificationOperator, NotificationRule,
};
use super::budgets_validation::validate_budget_config;

/// Fields whose change forces the budget to be recreated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplacementPlan {
    pub fields: Vec<String>,
}

impl ReplacementPlan {
    /// `true` when state and configuration already agree.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn requires_replacement(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

/// Compares tracked state against a new configuration.
///
/// The configuration is validated first; an invalid document never produces
/// a plan.
pub fn plan_replacement(state: &BudgetState, config: &BudgetConfig) -> Result<ReplacementPlan> {
    let desired = validate_budget_config(config)?;
    let mut fields = Vec::new();

    if state.name != desired.name {
        fields.push(FIELD_NAME);
    }
    if state.resource_group_name != desired.resource_group_name {
        fields.push(FIELD_RESOURCE_GROUP_NAME);
    }
    if state.category.parse::<Category>().ok() != Some(desired.category) {
        fields.push(FIELD_CATEGORY);
    }
    if state.amount != desired.amount {
        fields.push(FIELD_AMOUNT);
    }
    // Case differences in the time grain are not a change.
    if !state
        .time_grain
        .eq_ignore_ascii_case(desired.time_grain.as_str())
    {
        fields.push(FIELD_TIME_GRAIN);
    }
    if normalize_filters(state.filters.as_ref()) != normalize_filters(desired.filters.as_ref()) {
        fields.push(FIELD_FILTERS);
    }
    if normalize_notifications(&state.notifications) != normalize_notifications(&config.notifications)
    {
        fields.push(FIELD_NOTIFICATION);
    }

    if !fields.is_empty() {
        debug!(
            "[BudgetPlan] Budget '{}' requires replacement, changed: {}",
            state.id,
            fields.join(", ")
        );
    }

    Ok(ReplacementPlan {
        fields: fields.into_iter().map(str::to_string).collect(),
    })
}

#[derive(Debug, PartialEq, Eq)]
struct NormalizedFilters {
    meters: Option<BTreeSet<String>>,
    resource_group_names: Option<Vec<String>>,
    resource_ids: Option<BTreeSet<String>>,
    tags: Option<Vec<String>>,
}

/// Empty sub-fields are dropped (they are never sent), meters compare
/// lowercased, and a block with nothing left counts as no block.
fn normalize_filters(filters: Option<&FilterSet>) -> Option<NormalizedFilters> {
    let filters = filters?;
    let normalized = NormalizedFilters {
        meters: filters
            .meters
            .as_ref()
            .filter(|m| !m.is_empty())
            .map(|m| m.iter().map(|id| id.trim().to_ascii_lowercase()).collect()),
        resource_group_names: filters
            .resource_group_names
            .clone()
            .filter(|names| !names.is_empty()),
        resource_ids: filters.resource_ids.clone().filter(|ids| !ids.is_empty()),
        tags: filters.tags.clone().filter(|tags| !tags.is_empty()),
    };

    let is_blank = normalized.meters.is_none()
        && normalized.resource_group_names.is_none()
        && normalized.resource_ids.is_none()
        && normalized.tags.is_none();
    (!is_blank).then_some(normalized)
}

type NormalizedNotification = (
    i64,
    Option<NotificationOperator>,
    String,
    Option<BTreeSet<String>>,
    Option<BTreeSet<String>>,
);

fn normalize_notifications(rules: &[NotificationRule]) -> BTreeSet<NormalizedNotification> {
    rules
        .iter()
        .map(|rule| {
            let operator = rule.operator.parse::<NotificationOperator>().ok();
            // Unparseable operators compare by their raw text.
            let raw = if operator.is_some() {
                String::new()
            } else {
                rule.operator.clone()
            };
            (
                rule.threshold,
                operator,
                raw,
                rule.contact_emails.clone().filter(|e| !e.is_empty()),
                rule.action_groups.clone().filter(|g| !g.is_empty()),
            )
        })
        .collect()
}
