//! Wire models exchanged with the billing API client.
//! These mirror the consumption budget resource of the billing API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::budgets_model::{Category, NotificationOperator, TimeGrain};

/// Scoping filters attached to a budget.
///
/// Unset fields are omitted from the payload rather than sent as empty lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meters: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
    /// Tag names. The ARM endpoint stores tags as a name-to-values map;
    /// `armbudget-client` reads either shape back into names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A notification rule on the wire.
///
/// `contact_emails` and `contact_groups` distinguish "not set" (`None`) from
/// an explicit list; the two must not be conflated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub threshold: i32,
    pub operator: NotificationOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_emails: Option<Vec<String>>,
    /// Action group identifiers (`action_groups` in configuration).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_groups: Option<Vec<String>>,
}

/// Spend accumulated in the current period. Computed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSpend {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub unit: String,
}

/// Budget properties sent on create and returned on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProperties {
    pub category: Category,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub time_grain: TimeGrain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<Notification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_spend: Option<CurrentSpend>,
}

/// A budget resource as seen by the billing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// Remote-assigned resource identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BudgetProperties>,
}

impl Budget {
    /// A create request carrying only properties.
    pub fn from_properties(properties: BudgetProperties) -> Self {
        Self {
            id: None,
            name: None,
            e_tag: None,
            properties: Some(properties),
        }
    }
}
