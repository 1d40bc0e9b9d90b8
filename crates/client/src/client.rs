//! HTTP client for the Azure Resource Manager consumption budgets API.
//!
//! Implements `BudgetApiClient` over the ARM REST endpoint. Transport errors
//! and non-success responses come back as `ClientError`s carrying the ARM
//! error message verbatim; a missing budget is reported as `NotFound`.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;

use armbudget_core::budgets::{Budget, BudgetApiClient};
use armbudget_core::constants::{BUDGET_PROVIDER_NAMESPACE, BUDGET_RESOURCE_TYPE};
use armbudget_core::errors::{ClientError, Error, Result};

use crate::config::ClientConfig;
use crate::models::{ArmBudget, ArmErrorResponse};

/// Longest slice of an unparseable error body kept in the message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP client for the consumption budgets API.
///
/// # Example
///
/// ```ignore
/// let config = ClientConfig::from_env()?;
/// let client = ArmBudgetClient::new(&config)?;
/// let budget = client.get("rg-billing", "monthly-cap").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ArmBudgetClient {
    client: reqwest::Client,
    endpoint: String,
    subscription_id: String,
    api_version: String,
    auth_header: HeaderValue,
}

impl ArmBudgetClient {
    /// Create a new budget API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the access token cannot be used as a header value
    /// or the HTTP client cannot be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut auth_header =
            HeaderValue::from_str(&format!("Bearer {}", config.access_token())).map_err(|e| {
                Error::InvalidConfigValue(format!("Invalid access token format: {}", e))
            })?;
        auth_header.set_sensitive(true);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::new(format!("Failed to initialize HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            subscription_id: config.subscription_id.clone(),
            api_version: config.api_version.clone(),
            auth_header,
        })
    }

    /// Create default headers for API requests.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, self.auth_header.clone());
        headers
    }

    /// Path of a budget below the endpoint.
    fn budget_path(&self, resource_group: &str, budget_name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            urlencoding::encode(&self.subscription_id),
            urlencoding::encode(resource_group),
            BUDGET_PROVIDER_NAMESPACE,
            BUDGET_RESOURCE_TYPE,
            urlencoding::encode(budget_name)
        )
    }

    fn budget_url(&self, resource_group: &str, budget_name: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.endpoint,
            self.budget_path(resource_group, budget_name),
            urlencoding::encode(&self.api_version)
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| ClientError::new(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ClientError::new(format!("Failed to read response: {}", e)).with_status(status.as_u16())
        })?;
        Ok((status, body))
    }
}

/// Maps a non-success response to an error. 404 is always `NotFound`.
fn check_status(status: StatusCode, body: &str, target: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(target.to_string()));
    }

    // Prefer the ARM error envelope for the message
    if let Ok(ArmErrorResponse {
        error: Some(detail),
    }) = serde_json::from_str::<ArmErrorResponse>(body)
    {
        let mut err = ClientError::new(
            detail
                .message
                .unwrap_or_else(|| format!("HTTP {}", status)),
        )
        .with_status(status.as_u16());
        if let Some(code) = detail.code {
            err = err.with_code(code);
        }
        return Err(err.into());
    }

    Err(ClientError::new(format!(
        "API error {}: {}",
        status,
        body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>()
    ))
    .with_status(status.as_u16())
    .into())
}

/// Delete variant of [`check_status`]: ARM answers 204 when there was
/// nothing to delete.
fn check_delete_status(status: StatusCode, body: &str, target: &str) -> Result<()> {
    if status == StatusCode::NO_CONTENT {
        return Err(Error::NotFound(target.to_string()));
    }
    check_status(status, body, target)
}

fn parse_budget(body: &str) -> Result<Budget> {
    serde_json::from_str::<ArmBudget>(body)
        .map_err(|e| {
            Error::UnexpectedResponse(format!(
                "Failed to parse budget: {} - {}",
                e,
                body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>()
            ))
        })?
        .into_core()
}

#[async_trait]
impl BudgetApiClient for ArmBudgetClient {
    async fn create(
        &self,
        resource_group: &str,
        budget_name: &str,
        budget: Budget,
    ) -> Result<Budget> {
        let url = self.budget_url(resource_group, budget_name);
        info!("[ArmBudgetApi] PUT {}", url);

        let (status, body) = self
            .send(self.client.put(&url).json(&ArmBudget::from_core(&budget)))
            .await?;
        check_status(status, &body, &self.budget_path(resource_group, budget_name))?;
        debug!("[ArmBudgetApi] Budget '{}' stored ({})", budget_name, status);

        parse_budget(&body)
    }

    async fn get(&self, resource_group: &str, budget_name: &str) -> Result<Budget> {
        let url = self.budget_url(resource_group, budget_name);
        debug!("[ArmBudgetApi] GET {}", url);

        let (status, body) = self.send(self.client.get(&url)).await?;
        check_status(status, &body, &self.budget_path(resource_group, budget_name))?;

        parse_budget(&body)
    }

    async fn delete(&self, resource_group: &str, budget_name: &str) -> Result<()> {
        let url = self.budget_url(resource_group, budget_name);
        info!("[ArmBudgetApi] DELETE {}", url);

        let (status, body) = self.send(self.client.delete(&url)).await?;
        check_delete_status(status, &body, &self.budget_path(resource_group, budget_name))
    }
}
