//! Expand (configuration -> wire) and flatten (wire -> state) mapping.
//!
//! The two directions are inverses up to set ordering. The one rule that
//! matters throughout: an optional list the operator did not write stays
//! unset on the wire, and an unset wire list stays absent in state.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::constants::FIELD_FILTERS;
use crate::errors::{Error, ExpansionError, Result};
use crate::resource_id::ResourceId;

use super::budgets_api_model::{Budget, BudgetProperties, CurrentSpend, Filters, Notification};
use super::budgets_model::{
    BudgetState, CurrentSpendState, FilterSet, NotificationRule, ValidatedBudget,
    ValidatedNotification,
};

/// Builds the wire properties for a validated budget.
pub fn expand_budget_properties(budget: &ValidatedBudget) -> Result<BudgetProperties> {
    let filters = match &budget.filters {
        Some(filters) => Some(expand_filters(filters)?),
        None => None,
    };

    let notifications = if budget.notifications.is_empty() {
        None
    } else {
        Some(expand_notifications(&budget.notifications))
    };

    Ok(BudgetProperties {
        category: budget.category,
        amount: budget.amount,
        time_grain: budget.time_grain,
        filters,
        notifications,
        current_spend: None,
    })
}

/// Builds the wire filters. Absent or empty sub-fields are left unset.
pub fn expand_filters(filters: &FilterSet) -> Result<Filters> {
    let meters = match non_empty(filters.meters.as_ref()) {
        Some(meters) => Some(
            meters
                .iter()
                .enumerate()
                .map(|(index, meter)| {
                    Uuid::parse_str(meter.trim()).map_err(|e| {
                        Error::from(ExpansionError::InvalidElement {
                            field: format!("{}.meters", FIELD_FILTERS),
                            index,
                            message: format!("'{}' is not a meter UUID: {}", meter, e),
                        })
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        None => None,
    };

    Ok(Filters {
        meters,
        resource_groups: non_empty(filters.resource_group_names.as_ref()).cloned(),
        resources: non_empty(filters.resource_ids.as_ref()).map(|ids| ids.iter().cloned().collect()),
        tags: non_empty(filters.tags.as_ref()).cloned(),
    })
}

/// Builds one wire notification per rule. Contact lists are attached only
/// when they hold at least one entry.
pub fn expand_notifications(rules: &[ValidatedNotification]) -> Vec<Notification> {
    rules
        .iter()
        .map(|rule| Notification {
            threshold: rule.threshold,
            operator: rule.operator,
            contact_emails: non_empty(rule.contact_emails.as_ref())
                .map(|emails| emails.iter().cloned().collect()),
            contact_groups: non_empty(rule.action_groups.as_ref())
                .map(|groups| groups.iter().cloned().collect()),
        })
        .collect()
}

/// Flattens wire notifications back into configuration rules.
pub fn flatten_notifications(notifications: Option<&[Notification]>) -> Vec<NotificationRule> {
    let Some(notifications) = notifications else {
        return Vec::new();
    };

    notifications
        .iter()
        .map(|notification| NotificationRule {
            threshold: i64::from(notification.threshold),
            operator: notification.operator.as_str().to_string(),
            contact_emails: notification
                .contact_emails
                .as_ref()
                .map(|emails| emails.iter().cloned().collect::<BTreeSet<_>>()),
            action_groups: notification
                .contact_groups
                .as_ref()
                .map(|groups| groups.iter().cloned().collect::<BTreeSet<_>>()),
        })
        .collect()
}

/// Flattens wire filters back into a filter set.
pub fn flatten_filters(filters: Option<&Filters>) -> Option<FilterSet> {
    let filters = filters?;
    Some(FilterSet {
        meters: filters
            .meters
            .as_ref()
            .map(|meters| meters.iter().map(|m| m.hyphenated().to_string()).collect()),
        resource_group_names: filters.resource_groups.clone(),
        resource_ids: filters
            .resources
            .as_ref()
            .map(|ids| ids.iter().cloned().collect()),
        tags: filters.tags.clone(),
    })
}

/// Flattens a budget read from the API into local state.
///
/// The identifier is mandatory; name and resource group are taken from it
/// when the response body leaves them out.
pub fn flatten_budget(budget: &Budget) -> Result<BudgetState> {
    let id = budget
        .id
        .clone()
        .ok_or_else(|| Error::UnexpectedResponse("budget has no resource ID".to_string()))?;
    let properties = budget.properties.as_ref().ok_or_else(|| {
        Error::UnexpectedResponse(format!("budget '{}' has no properties", id))
    })?;

    let parsed = ResourceId::parse(&id)?;
    let name = match &budget.name {
        Some(name) => name.clone(),
        None => parsed.budget_name()?.to_string(),
    };
    let resource_group_name = parsed.require_resource_group()?.to_string();

    Ok(BudgetState {
        name,
        resource_group_name,
        category: properties.category.as_str().to_string(),
        amount: properties.amount,
        time_grain: properties.time_grain.as_str().to_string(),
        filters: flatten_filters(properties.filters.as_ref()),
        notifications: flatten_notifications(properties.notifications.as_deref()),
        current_spend: properties.current_spend.as_ref().map(flatten_current_spend),
        id,
    })
}

fn flatten_current_spend(spend: &CurrentSpend) -> CurrentSpendState {
    CurrentSpendState {
        amount: spend.amount,
        unit: spend.unit.clone(),
    }
}

fn non_empty<C>(collection: Option<&C>) -> Option<&C>
where
    for<'a> &'a C: IntoIterator,
{
    collection.filter(|c| IntoIterator::into_iter(*c).next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budgets::{Category, NotificationOperator, TimeGrain};
    use rust_decimal_macros::dec;

    fn notification(
        threshold: i32,
        operator: NotificationOperator,
        emails: Option<&[&str]>,
        groups: Option<&[&str]>,
    ) -> ValidatedNotification {
        let to_set = |items: &[&str]| -> BTreeSet<String> { items.iter().map(|s| s.to_string()).collect() };
        ValidatedNotification {
            threshold,
            operator,
            contact_emails: emails.map(to_set),
            action_groups: groups.map(to_set),
        }
    }

    fn budget_with(notifications: Vec<ValidatedNotification>) -> ValidatedBudget {
        ValidatedBudget {
            name: "monthly-cap".to_string(),
            resource_group_name: "rg-billing".to_string(),
            category: Category::Cost,
            amount: dec!(500.0),
            time_grain: TimeGrain::Monthly,
            filters: None,
            notifications,
        }
    }

    #[test]
    fn test_expand_scenario_single_notification() {
        let budget = budget_with(vec![notification(
            80,
            NotificationOperator::GreaterThan,
            Some(&["a@x.com"][..]),
            None,
        )]);

        let properties = expand_budget_properties(&budget).unwrap();
        assert_eq!(properties.category, Category::Cost);
        assert_eq!(properties.amount, dec!(500));
        assert_eq!(properties.time_grain, TimeGrain::Monthly);
        assert_eq!(properties.filters, None);

        let notifications = properties.notifications.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].threshold, 80);
        assert_eq!(notifications[0].operator, NotificationOperator::GreaterThan);
        assert_eq!(
            notifications[0].contact_emails,
            Some(vec!["a@x.com".to_string()])
        );
        assert_eq!(notifications[0].contact_groups, None);
    }

    #[test]
    fn test_expand_without_notifications_leaves_field_unset() {
        let properties = expand_budget_properties(&budget_with(Vec::new())).unwrap();
        assert_eq!(properties.notifications, None);
    }

    #[test]
    fn test_empty_contact_lists_are_not_sent() {
        let expanded = expand_notifications(&[notification(
            50,
            NotificationOperator::EqualTo,
            Some(&[][..]),
            Some(&[][..]),
        )]);
        assert_eq!(expanded[0].contact_emails, None);
        assert_eq!(expanded[0].contact_groups, None);
    }

    #[test]
    fn test_omitted_contacts_stay_omitted_after_flatten() {
        let rules = [notification(90, NotificationOperator::GreaterThanOrEqualTo, None, Some(&["ag-ops"][..]))];
        let expanded = expand_notifications(&rules);
        let flattened = flatten_notifications(Some(expanded.as_slice()));

        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].contact_emails, None);
        assert_eq!(
            flattened[0].action_groups,
            Some(BTreeSet::from(["ag-ops".to_string()]))
        );
        assert_eq!(flattened[0].operator, "GreaterThanOrEqualTo");
    }

    #[test]
    fn test_expand_filters_copies_only_present_fields() {
        let filters = FilterSet {
            meters: Some(BTreeSet::from([
                "00000000-0000-0000-0000-0000000000AB".to_string()
            ])),
            resource_group_names: None,
            resource_ids: Some(BTreeSet::new()),
            tags: Some(vec!["env".to_string(), "team".to_string()]),
        };

        let expanded = expand_filters(&filters).unwrap();
        assert_eq!(expanded.meters.as_ref().map(Vec::len), Some(1));
        assert_eq!(expanded.resource_groups, None);
        assert_eq!(expanded.resources, None);
        assert_eq!(
            expanded.tags,
            Some(vec!["env".to_string(), "team".to_string()])
        );

        let flattened = flatten_filters(Some(&expanded)).unwrap();
        assert_eq!(
            flattened.meters,
            Some(BTreeSet::from([
                "00000000-0000-0000-0000-0000000000ab".to_string()
            ]))
        );
        assert_eq!(flattened.resource_ids, None);
        assert_eq!(flattened.tags, filters.tags);
    }

    #[test]
    fn test_expand_filters_rejects_malformed_meter() {
        let filters = FilterSet {
            meters: Some(BTreeSet::from(["not-a-uuid".to_string()])),
            ..Default::default()
        };

        match expand_filters(&filters) {
            Err(Error::Expansion(ExpansionError::InvalidElement { field, index, .. })) => {
                assert_eq!(field, "filters.meters");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_flatten_budget_derives_name_and_group_from_id() {
        let budget = Budget {
            id: Some(
                "/subscriptions/s/resourceGroups/rg-billing/providers/Microsoft.Consumption/budgets/monthly-cap"
                    .to_string(),
            ),
            name: None,
            e_tag: None,
            properties: Some(BudgetProperties {
                category: Category::Usage,
                amount: dec!(42.5),
                time_grain: TimeGrain::Annually,
                filters: None,
                notifications: None,
                current_spend: Some(CurrentSpend {
                    amount: dec!(10),
                    unit: "USD".to_string(),
                }),
            }),
        };

        let state = flatten_budget(&budget).unwrap();
        assert_eq!(state.name, "monthly-cap");
        assert_eq!(state.resource_group_name, "rg-billing");
        assert_eq!(state.category, "Usage");
        assert_eq!(state.time_grain, "Annually");
        assert!(state.notifications.is_empty());
        assert_eq!(state.current_spend.unwrap().unit, "USD");
    }

    #[test]
    fn test_flatten_budget_requires_id_and_properties() {
        let budget = Budget {
            id: None,
            name: Some("b".to_string()),
            e_tag: None,
            properties: None,
        };
        assert!(matches!(
            flatten_budget(&budget),
            Err(Error::UnexpectedResponse(_))
        ));
    }
}
