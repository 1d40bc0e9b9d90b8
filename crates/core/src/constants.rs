/// Maximum number of notification rules attached to one budget
pub const MAX_NOTIFICATIONS: usize = 5;

/// Lowest accepted notification threshold (percent of the budget amount)
pub const THRESHOLD_MIN: i64 = 0;

/// Highest accepted notification threshold (percent of the budget amount)
pub const THRESHOLD_MAX: i64 = 1000;

/// At most one filter block per budget
pub const MAX_FILTER_BLOCKS: usize = 1;

/// Maximum length of a resource group name
pub const RESOURCE_GROUP_NAME_MAX_LEN: usize = 90;

/// Resource provider namespace that owns budgets
pub const BUDGET_PROVIDER_NAMESPACE: &str = "Microsoft.Consumption";

/// Resource type segment for budgets
pub const BUDGET_RESOURCE_TYPE: &str = "budgets";

// Document keys
pub const FIELD_NAME: &str = "name";
pub const FIELD_RESOURCE_GROUP_NAME: &str = "resource_group_name";
pub const FIELD_CATEGORY: &str = "category";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_TIME_GRAIN: &str = "time_grain";
pub const FIELD_FILTERS: &str = "filters";
pub const FIELD_NOTIFICATION: &str = "notification";
