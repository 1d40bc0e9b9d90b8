//! Schema validation for budget configuration documents.
//!
//! Validation is a pure check that runs before any network call. It collects
//! every violation instead of stopping at the first one, so a single pass
//! tells the operator everything that is wrong with a document.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use crate::constants::{
    FIELD_AMOUNT, FIELD_CATEGORY, FIELD_FILTERS, FIELD_NAME, FIELD_NOTIFICATION,
    FIELD_RESOURCE_GROUP_NAME, FIELD_TIME_GRAIN, MAX_NOTIFICATIONS,
    RESOURCE_GROUP_NAME_MAX_LEN, THRESHOLD_MAX, THRESHOLD_MIN,
};
use crate::errors::{ValidationError, ValidationErrors};
use crate::resource_id::ResourceId;

use super::budgets_model::{
    BudgetConfig, Category, FilterSet, NotificationOperator, NotificationRule, TimeGrain,
    ValidatedBudget, ValidatedNotification,
};

lazy_static! {
    /// Letters, digits, underscores, hyphens, periods and parentheses.
    static ref RESOURCE_GROUP_NAME_REGEX: Regex =
        Regex::new(r"^[-\w\._\(\)]+$").expect("Invalid regex pattern");
}

/// Validates a configuration document.
///
/// Returns the typed budget on success, or every violation found.
pub fn validate_budget_config(
    config: &BudgetConfig,
) -> std::result::Result<ValidatedBudget, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    require_non_empty(FIELD_NAME, &config.name, &mut errors);
    if config.resource_group_name.is_empty() {
        errors.push(ValidationError::MissingField {
            field: FIELD_RESOURCE_GROUP_NAME.to_string(),
        });
    } else if let Err(e) =
        validate_resource_group_name(FIELD_RESOURCE_GROUP_NAME, &config.resource_group_name)
    {
        errors.push(e);
    }

    let category = parse_enum::<Category>(
        FIELD_CATEGORY,
        &config.category,
        Category::allowed(),
        &mut errors,
    );
    let time_grain = parse_enum::<TimeGrain>(
        FIELD_TIME_GRAIN,
        &config.time_grain,
        TimeGrain::allowed(),
        &mut errors,
    );
    let amount = validate_amount(config.amount, &mut errors);

    if let Some(filters) = &config.filters {
        validate_filters(filters, &mut errors);
    }

    let notifications = validate_notifications(&config.notifications, &mut errors);

    errors.into_result()?;

    match (category, time_grain, amount, notifications) {
        (Some(category), Some(time_grain), Some(amount), Some(notifications)) => {
            Ok(ValidatedBudget {
                name: config.name.clone(),
                resource_group_name: config.resource_group_name.clone(),
                category,
                amount,
                time_grain,
                filters: config.filters.clone(),
                notifications,
            })
        }
        // Every `None` above pushed an error, so this arm is unreachable in
        // practice; report it rather than panic.
        _ => Err(ValidationErrors::from(vec![ValidationError::MalformedDocument(
            "incomplete budget configuration".to_string(),
        )])),
    }
}

/// Checks a resource group name: non-empty, at most 90 characters, drawn from
/// `[-\w._()]` and not ending with a period.
pub fn validate_resource_group_name(
    field: &str,
    value: &str,
) -> std::result::Result<(), ValidationError> {
    let reason = if value.is_empty() {
        Some("must not be empty".to_string())
    } else if value.chars().count() > RESOURCE_GROUP_NAME_MAX_LEN {
        Some(format!(
            "may not exceed {} characters",
            RESOURCE_GROUP_NAME_MAX_LEN
        ))
    } else if value.ends_with('.') {
        Some("cannot end with a period".to_string())
    } else if !RESOURCE_GROUP_NAME_REGEX.is_match(value) {
        Some(
            "may only contain alphanumeric characters, dashes, underscores, parentheses and periods"
                .to_string(),
        )
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ValidationError::InvalidResourceGroupName {
            field: field.to_string(),
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Checks that a value parses as a cloud resource identifier.
pub fn validate_resource_id(field: &str, value: &str) -> std::result::Result<(), ValidationError> {
    ResourceId::parse(value)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidResourceId {
            field: field.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn require_non_empty(field: &str, value: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.push(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
}

fn parse_enum<T: std::str::FromStr>(
    field: &str,
    value: &str,
    allowed: Vec<&'static str>,
    errors: &mut ValidationErrors,
) -> Option<T> {
    if value.trim().is_empty() {
        errors.push(ValidationError::MissingField {
            field: field.to_string(),
        });
        return None;
    }

    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(ValidationError::NotInSet {
                field: field.to_string(),
                value: value.to_string(),
                allowed,
            });
            None
        }
    }
}

fn validate_amount(amount: Option<Decimal>, errors: &mut ValidationErrors) -> Option<Decimal> {
    match amount {
        None => {
            errors.push(ValidationError::MissingField {
                field: FIELD_AMOUNT.to_string(),
            });
            None
        }
        Some(value) if value.is_sign_negative() && !value.is_zero() => {
            errors.push(ValidationError::Negative {
                field: FIELD_AMOUNT.to_string(),
                value: value.to_string(),
            });
            None
        }
        Some(value) => Some(value),
    }
}

fn validate_filters(filters: &FilterSet, errors: &mut ValidationErrors) {
    if let Some(names) = &filters.resource_group_names {
        for (index, name) in names.iter().enumerate() {
            let field = format!("{}.resource_group_names.{}", FIELD_FILTERS, index);
            if let Err(e) = validate_resource_group_name(&field, name) {
                errors.push(e);
            }
        }
    }

    if let Some(ids) = &filters.resource_ids {
        for (index, id) in ids.iter().enumerate() {
            let field = format!("{}.resource_ids.{}", FIELD_FILTERS, index);
            if let Err(e) = validate_resource_id(&field, id) {
                errors.push(e);
            }
        }
    }
}

fn validate_notifications(
    rules: &[NotificationRule],
    errors: &mut ValidationErrors,
) -> Option<Vec<ValidatedNotification>> {
    if rules.len() > MAX_NOTIFICATIONS {
        errors.push(ValidationError::TooManyItems {
            field: FIELD_NOTIFICATION.to_string(),
            max: MAX_NOTIFICATIONS,
            actual: rules.len(),
        });
    }

    let mut validated = Vec::with_capacity(rules.len());
    let mut seen: HashSet<(NotificationOperator, i64)> = HashSet::new();
    let mut complete = true;

    for (index, rule) in rules.iter().enumerate() {
        let threshold = validate_threshold(index, rule.threshold, errors);
        let operator = parse_enum::<NotificationOperator>(
            &format!("{}.{}.operator", FIELD_NOTIFICATION, index),
            &rule.operator,
            NotificationOperator::allowed(),
            errors,
        );

        match (threshold, operator) {
            (Some(threshold), Some(operator)) => {
                if !seen.insert((operator, rule.threshold)) {
                    errors.push(ValidationError::DuplicateNotification {
                        field: format!("{}.{}", FIELD_NOTIFICATION, index),
                        operator: operator.as_str().to_string(),
                        threshold: rule.threshold,
                    });
                }
                validated.push(ValidatedNotification {
                    threshold,
                    operator,
                    contact_emails: rule.contact_emails.clone(),
                    action_groups: rule.action_groups.clone(),
                });
            }
            _ => complete = false,
        }
    }

    complete.then_some(validated)
}

fn validate_threshold(index: usize, threshold: i64, errors: &mut ValidationErrors) -> Option<i32> {
    if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&threshold) {
        errors.push(ValidationError::OutOfRange {
            field: format!("{}.{}.threshold", FIELD_NOTIFICATION, index),
            value: threshold,
            min: THRESHOLD_MIN,
            max: THRESHOLD_MAX,
        });
        return None;
    }
    i32::try_from(threshold).ok()
}
