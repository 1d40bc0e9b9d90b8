//! ARM payloads for the consumption budgets endpoint.
//!
//! The resource manager keys notifications by name instead of listing them;
//! these types convert between that envelope and the core wire model.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use armbudget_core::budgets::{
    Budget, BudgetProperties, Category, CurrentSpend, Filters, Notification,
    NotificationOperator, TimeGrain,
};
use armbudget_core::errors::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArmBudget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ArmBudgetProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArmBudgetProperties {
    pub category: Category,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub time_grain: TimeGrain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ArmFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<BTreeMap<String, ArmNotification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_spend: Option<CurrentSpend>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArmFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meters: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<ArmTags>,
}

/// Tag filter. Sent as a list of names; the resource manager may answer
/// with a map of tag name to values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum ArmTags {
    Names(Vec<String>),
    Map(BTreeMap<String, Vec<String>>),
}

impl ArmTags {
    fn into_names(self) -> Vec<String> {
        match self {
            ArmTags::Names(names) => names,
            ArmTags::Map(map) => map.into_keys().collect(),
        }
    }
}

impl From<&Filters> for ArmFilters {
    fn from(filters: &Filters) -> Self {
        Self {
            meters: filters.meters.clone(),
            resource_groups: filters.resource_groups.clone(),
            resources: filters.resources.clone(),
            tags: filters.tags.clone().map(ArmTags::Names),
        }
    }
}

impl From<ArmFilters> for Filters {
    fn from(filters: ArmFilters) -> Self {
        Self {
            meters: filters.meters,
            resource_groups: filters.resource_groups,
            resources: filters.resources,
            tags: filters.tags.map(ArmTags::into_names),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArmNotification {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    pub operator: NotificationOperator,
    #[serde(with = "rust_decimal::serde::float")]
    pub threshold: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_emails: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_groups: Option<Vec<String>>,
}

fn enabled_default() -> bool {
    true
}

/// Error body returned by the resource manager.
#[derive(Debug, Deserialize)]
pub(crate) struct ArmErrorResponse {
    #[serde(default)]
    pub error: Option<ArmErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArmErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Key under which the resource manager stores a notification.
pub(crate) fn notification_key(notification: &Notification) -> String {
    format!(
        "actual_{}_{}_Percent",
        notification.operator.as_str(),
        notification.threshold
    )
}

impl From<&BudgetProperties> for ArmBudgetProperties {
    fn from(properties: &BudgetProperties) -> Self {
        let notifications = properties.notifications.as_ref().map(|notifications| {
            notifications
                .iter()
                .map(|n| {
                    (
                        notification_key(n),
                        ArmNotification {
                            enabled: true,
                            operator: n.operator,
                            threshold: Decimal::from(n.threshold),
                            contact_emails: n.contact_emails.clone(),
                            contact_groups: n.contact_groups.clone(),
                        },
                    )
                })
                .collect()
        });

        Self {
            category: properties.category,
            amount: properties.amount,
            time_grain: properties.time_grain,
            filters: properties.filters.as_ref().map(ArmFilters::from),
            notifications,
            current_spend: None,
        }
    }
}

impl ArmBudgetProperties {
    fn into_core(self) -> Result<BudgetProperties> {
        let notifications = match self.notifications {
            Some(map) => Some(
                map.into_iter()
                    .map(|(key, n)| {
                        let threshold = n
                            .threshold
                            .to_i32()
                            .filter(|_| n.threshold.fract().is_zero())
                            .ok_or_else(|| {
                                Error::UnexpectedResponse(format!(
                                    "notification '{}' has a non-integral threshold {}",
                                    key, n.threshold
                                ))
                            })?;
                        Ok(Notification {
                            threshold,
                            operator: n.operator,
                            contact_emails: n.contact_emails,
                            contact_groups: n.contact_groups,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        Ok(BudgetProperties {
            category: self.category,
            amount: self.amount,
            time_grain: self.time_grain,
            filters: self.filters.map(Filters::from),
            notifications,
            current_spend: self.current_spend,
        })
    }
}

impl ArmBudget {
    /// Request body for a create call.
    pub fn from_core(budget: &Budget) -> Self {
        Self {
            id: None,
            name: None,
            resource_type: None,
            e_tag: budget.e_tag.clone(),
            properties: budget.properties.as_ref().map(ArmBudgetProperties::from),
        }
    }

    pub fn into_core(self) -> Result<Budget> {
        Ok(Budget {
            id: self.id,
            name: self.name,
            e_tag: self.e_tag,
            properties: self.properties.map(ArmBudgetProperties::into_core).transpose()?,
        })
    }
}
