//! Cloud resource identifier parsing and formatting.
//!
//! ## ID Format
//!
//! ```text
//! /subscriptions/{subscriptionId}/resourceGroups/{group}/providers/{namespace}/{type}/{name}
//! ```
//!
//! The path is a sequence of `key/value` pairs. `subscriptions` is mandatory,
//! `resourceGroups` and `providers` are optional, and everything after the
//! provider namespace is kept as an ordered list of pairs.
//!
//! ## Examples
//!
//! ```
//! use armbudget_core::resource_id::ResourceId;
//!
//! let id: ResourceId =
//!     "/subscriptions/0000/resourceGroups/rg-billing/providers/Microsoft.Consumption/budgets/monthly"
//!         .parse()
//!         .unwrap();
//! assert_eq!(id.subscription_id, "0000");
//! assert_eq!(id.resource_group.as_deref(), Some("rg-billing"));
//! assert_eq!(id.budget_name().unwrap(), "monthly");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::constants::{BUDGET_PROVIDER_NAMESPACE, BUDGET_RESOURCE_TYPE};
use crate::errors::ResourceIdError;

const SUBSCRIPTIONS_KEY: &str = "subscriptions";
const RESOURCE_GROUPS_KEY: &str = "resourceGroups";
const PROVIDERS_KEY: &str = "providers";

/// A parsed resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: Option<String>,
    pub provider: Option<String>,
    /// Remaining `type/name` pairs, in path order.
    pub path: Vec<(String, String)>,
}

impl ResourceId {
    /// Parses an identifier such as
    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}`.
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let trimmed = id.trim_matches('/');
        if trimmed.is_empty() {
            return Err(ResourceIdError::Empty);
        }

        let components: Vec<&str> = trimmed.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(ResourceIdError::OddSegments(id.to_string()));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = Vec::new();

        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(ResourceIdError::EmptySegment(id.to_string()));
            }

            if subscription_id.is_none() && key == SUBSCRIPTIONS_KEY {
                subscription_id = Some(value.to_string());
            } else if resource_group.is_none() && key.eq_ignore_ascii_case(RESOURCE_GROUPS_KEY) {
                resource_group = Some(value.to_string());
            } else if provider.is_none() && key == PROVIDERS_KEY {
                provider = Some(value.to_string());
            } else {
                path.push((key.to_string(), value.to_string()));
            }
        }

        let subscription_id =
            subscription_id.ok_or_else(|| ResourceIdError::MissingSubscription(id.to_string()))?;

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path,
        })
    }

    /// Builds the identifier of a budget scoped to a resource group.
    pub fn budget(subscription_id: &str, resource_group: &str, name: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: Some(resource_group.to_string()),
            provider: Some(BUDGET_PROVIDER_NAMESPACE.to_string()),
            path: vec![(BUDGET_RESOURCE_TYPE.to_string(), name.to_string())],
        }
    }

    /// Looks up the value for a path key, ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The resource group, or an error naming the identifier if it has none.
    pub fn require_resource_group(&self) -> Result<&str, ResourceIdError> {
        self.resource_group
            .as_deref()
            .ok_or_else(|| ResourceIdError::MissingResourceGroup(self.to_string()))
    }

    /// The budget name, if this identifier addresses a consumption budget.
    pub fn budget_name(&self) -> Result<&str, ResourceIdError> {
        let is_consumption = self
            .provider
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case(BUDGET_PROVIDER_NAMESPACE));

        match (is_consumption, self.path.as_slice()) {
            (true, [(resource_type, name)]) if resource_type.eq_ignore_ascii_case(BUDGET_RESOURCE_TYPE) => {
                Ok(name.as_str())
            }
            _ => Err(ResourceIdError::UnexpectedType {
                id: self.to_string(),
                expected: format!("{}/{}", BUDGET_PROVIDER_NAMESPACE, BUDGET_RESOURCE_TYPE),
            }),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", SUBSCRIPTIONS_KEY, self.subscription_id)?;
        if let Some(group) = &self.resource_group {
            write!(f, "/{}/{}", RESOURCE_GROUPS_KEY, group)?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "/{}/{}", PROVIDERS_KEY, provider)?;
        }
        for (key, value) in &self.path {
            write!(f, "/{}/{}", key, value)?;
        }
        Ok(())
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
