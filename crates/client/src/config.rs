//! Client configuration.
//!
//! Built programmatically or from the environment. `from_env` loads a `.env`
//! file first when one is present.

use std::fmt;
use std::time::Duration;

use armbudget_core::errors::{Error, Result};
use uuid::Uuid;

/// Default Azure Resource Manager endpoint.
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// API version of the consumption budgets endpoint.
pub const DEFAULT_API_VERSION: &str = "2018-10-01";

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";
pub const ENV_ACCESS_TOKEN: &str = "ARM_ACCESS_TOKEN";
pub const ENV_ENDPOINT: &str = "ARM_ENDPOINT";
pub const ENV_API_VERSION: &str = "ARM_API_VERSION";
pub const ENV_TIMEOUT_SECS: &str = "ARM_TIMEOUT_SECS";

#[derive(Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub subscription_id: String,
    access_token: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration with the default endpoint, API version and
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfigValue` if the subscription ID is not a
    /// UUID or the access token is empty.
    pub fn new(subscription_id: &str, access_token: &str) -> Result<Self> {
        let subscription_id = subscription_id.trim();
        Uuid::parse_str(subscription_id).map_err(|e| {
            Error::InvalidConfigValue(format!(
                "{}: '{}' is not a UUID: {}",
                ENV_SUBSCRIPTION_ID, subscription_id, e
            ))
        })?;

        if access_token.trim().is_empty() {
            return Err(Error::InvalidConfigValue(format!(
                "{} must not be empty",
                ENV_ACCESS_TOKEN
            )));
        }

        Ok(Self {
            endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
            subscription_id: subscription_id.to_string(),
            access_token: access_token.trim().to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_version(mut self, api_version: &str) -> Self {
        self.api_version = api_version.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require =
            |key: &str| read(key).ok_or_else(|| Error::MissingConfigKey(key.to_string()));

        let mut config = Self::new(
            &require(ENV_SUBSCRIPTION_ID)?,
            &require(ENV_ACCESS_TOKEN)?,
        )?;

        if let Some(endpoint) = read(ENV_ENDPOINT) {
            config = config.with_endpoint(endpoint.trim());
        }
        if let Some(api_version) = read(ENV_API_VERSION) {
            config = config.with_api_version(api_version.trim());
        }
        if let Some(timeout) = read(ENV_TIMEOUT_SECS) {
            let secs: u64 = timeout.trim().parse().map_err(|_| {
                Error::InvalidConfigValue(format!(
                    "{}: '{}' is not a number of seconds",
                    ENV_TIMEOUT_SECS, timeout
                ))
            })?;
            if secs == 0 {
                return Err(Error::InvalidConfigValue(format!(
                    "{} must be greater than zero",
                    ENV_TIMEOUT_SECS
                )));
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("subscription_id", &self.subscription_id)
            .field("access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}
