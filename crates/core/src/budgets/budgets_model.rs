//! Budget configuration documents, validated budgets, and persisted state.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{
    FIELD_FILTERS, FIELD_NOTIFICATION, MAX_FILTER_BLOCKS, THRESHOLD_MAX, THRESHOLD_MIN,
};
use crate::errors::{Error, ExpansionError, Result, ValidationError, ValidationErrors};

/// Whether a budget tracks cost or usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Cost,
    Usage,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Cost, Category::Usage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cost => "Cost",
            Category::Usage => "Usage",
        }
    }

    pub fn allowed() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.as_str()).collect()
    }
}

/// Recurrence period over which the budget amount applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeGrain {
    Annually,
    Monthly,
    Quarterly,
}

impl TimeGrain {
    pub const ALL: [TimeGrain; 3] = [TimeGrain::Annually, TimeGrain::Monthly, TimeGrain::Quarterly];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeGrain::Annually => "Annually",
            TimeGrain::Monthly => "Monthly",
            TimeGrain::Quarterly => "Quarterly",
        }
    }

    pub fn allowed() -> Vec<&'static str> {
        Self::ALL.iter().map(|g| g.as_str()).collect()
    }
}

/// Comparison applied between spend and a notification threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotificationOperator {
    EqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

impl NotificationOperator {
    pub const ALL: [NotificationOperator; 3] = [
        NotificationOperator::EqualTo,
        NotificationOperator::GreaterThan,
        NotificationOperator::GreaterThanOrEqualTo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOperator::EqualTo => "EqualTo",
            NotificationOperator::GreaterThan => "GreaterThan",
            NotificationOperator::GreaterThanOrEqualTo => "GreaterThanOrEqualTo",
        }
    }

    pub fn allowed() -> Vec<&'static str> {
        Self::ALL.iter().map(|o| o.as_str()).collect()
    }
}

// Enum names are matched without regard to ASCII case, so "monthly" and
// "MONTHLY" both parse to `TimeGrain::Monthly`.
macro_rules! impl_case_insensitive_enum {
    ($ty:ident, $label:literal) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| format!("Unknown {}: {}", $label, s))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_case_insensitive_enum!(Category, "category");
impl_case_insensitive_enum!(TimeGrain, "time grain");
impl_case_insensitive_enum!(NotificationOperator, "notification operator");

/// Scoping rules restricting which records count toward a budget.
///
/// Every sub-field is optional: `None` means the operator never wrote it,
/// which is carried through to the wire as an omitted field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meters: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ids: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A threshold-triggered alert as written in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationRule {
    pub threshold: i64,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_emails: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_groups: Option<BTreeSet<String>>,
}

/// A budget configuration document.
///
/// String-typed enums and the optional amount keep the document exactly as
/// written; `validate_budget_config` turns it into a [`ValidatedBudget`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub resource_group_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub time_grain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSet>,
    #[serde(
        default,
        rename = "notification",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub notifications: Vec<NotificationRule>,
}

impl BudgetConfig {
    /// Parses a raw JSON configuration document.
    ///
    /// Shape errors inside the `filters` and `notification` blocks are
    /// reported as [`ExpansionError`]s; everything else as validation errors.
    /// `filters` may be written either as a single object or as a list
    /// holding at most one object.
    pub fn from_document(document: Value) -> Result<Self> {
        let mut object = match document {
            Value::Object(map) => map,
            other => {
                return Err(ValidationError::MalformedDocument(format!(
                    "expected an object, got {}",
                    json_kind(&other)
                ))
                .into())
            }
        };

        let filters = object.remove(FIELD_FILTERS);
        let notification = object.remove(FIELD_NOTIFICATION);

        let mut config: BudgetConfig = serde_json::from_value(Value::Object(object))
            .map_err(|e| ValidationError::MalformedDocument(e.to_string()))?;

        config.filters = parse_filters_block(filters)?;
        config.notifications = parse_notification_block(notification)?;

        Ok(config)
    }

    /// Parses a configuration document from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| ValidationError::MalformedDocument(e.to_string()))?;
        Self::from_document(document)
    }
}

fn parse_filters_block(block: Option<Value>) -> Result<Option<FilterSet>> {
    let element = match block {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(mut items)) => {
            if items.len() > MAX_FILTER_BLOCKS {
                return Err(ValidationErrors::from(vec![ValidationError::TooManyItems {
                    field: FIELD_FILTERS.to_string(),
                    max: MAX_FILTER_BLOCKS,
                    actual: items.len(),
                }])
                .into());
            }
            match items.pop() {
                Some(item) => item,
                None => return Ok(None),
            }
        }
        Some(other) => other,
    };

    if !element.is_object() {
        return Err(ExpansionError::MalformedBlock {
            block: FIELD_FILTERS.to_string(),
            message: format!("expected an object, got {}", json_kind(&element)),
        }
        .into());
    }

    serde_json::from_value(element)
        .map(Some)
        .map_err(|e| {
            Error::from(ExpansionError::MalformedBlock {
                block: FIELD_FILTERS.to_string(),
                message: e.to_string(),
            })
        })
}

fn parse_notification_block(block: Option<Value>) -> Result<Vec<NotificationRule>> {
    let mut items = match block {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ExpansionError::MalformedBlock {
                block: FIELD_NOTIFICATION.to_string(),
                message: format!("expected a list, got {}", json_kind(&other)),
            }
            .into())
        }
    };

    let mut errors = ValidationErrors::new();
    for (index, item) in items.iter_mut().enumerate() {
        if let Err(e) = normalize_threshold(index, item) {
            errors.push(e);
        }
    }
    errors.into_result()?;

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<NotificationRule>(item).map_err(|e| {
                Error::from(ExpansionError::InvalidElement {
                    field: FIELD_NOTIFICATION.to_string(),
                    index,
                    message: e.to_string(),
                })
            })
        })
        .collect()
}

/// Rewrites an integral float threshold (`80.0`) as an integer so the rule
/// deserializes. Fractions and values beyond `i64` are validation errors.
fn normalize_threshold(index: usize, item: &mut Value) -> std::result::Result<(), ValidationError> {
    let Some(Value::Number(number)) = item.get_mut("threshold") else {
        return Ok(());
    };
    if number.is_i64() {
        return Ok(());
    }

    let field = format!("{}.{}.threshold", FIELD_NOTIFICATION, index);
    match number.as_f64() {
        Some(value) if value.is_finite() && value.fract() == 0.0 => {
            // `as` saturates, so huge values stay out of range.
            let threshold = value as i64;
            if (THRESHOLD_MIN..=THRESHOLD_MAX).contains(&threshold) {
                *number = serde_json::Number::from(threshold);
                Ok(())
            } else {
                Err(ValidationError::OutOfRange {
                    field,
                    value: threshold,
                    min: THRESHOLD_MIN,
                    max: THRESHOLD_MAX,
                })
            }
        }
        _ => Err(ValidationError::NotAnInteger {
            field,
            value: number.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// A notification rule whose operator and threshold have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedNotification {
    pub threshold: i32,
    pub operator: NotificationOperator,
    pub contact_emails: Option<BTreeSet<String>>,
    pub action_groups: Option<BTreeSet<String>>,
}

/// A budget configuration that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBudget {
    pub name: String,
    pub resource_group_name: String,
    pub category: Category,
    pub amount: Decimal,
    pub time_grain: TimeGrain,
    pub filters: Option<FilterSet>,
    pub notifications: Vec<ValidatedNotification>,
}

/// Spend recorded against a budget so far, as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSpendState {
    pub amount: Decimal,
    pub unit: String,
}

/// Locally tracked state of a budget, keyed by its remote identifier.
///
/// Absent optional fields are skipped on serialization so that an unset
/// contact list never shows up as an empty one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetState {
    pub id: String,
    pub name: String,
    pub resource_group_name: String,
    pub category: String,
    pub amount: Decimal,
    pub time_grain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSet>,
    #[serde(
        default,
        rename = "notification",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub notifications: Vec<NotificationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_spend: Option<CurrentSpendState>,
}
