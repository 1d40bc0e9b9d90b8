use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::errors::{Error, Result};
use crate::resource_id::ResourceId;

use super::budgets_api_model::Budget;
use super::budgets_mapping::{expand_budget_properties, flatten_budget};
use super::budgets_model::{BudgetConfig, BudgetState};
use super::budgets_plan::{plan_replacement, ReplacementPlan};
use super::budgets_traits::{BudgetApiClient, BudgetResourceTrait};
use super::budgets_validation::validate_budget_config;

/// Budget resource handler.
///
/// Holds no state of its own; every operation works on the document or
/// identifier it is handed and talks to the injected client.
pub struct BudgetResource {
    client: Arc<dyn BudgetApiClient>,
}

impl BudgetResource {
    pub fn new(client: Arc<dyn BudgetApiClient>) -> Self {
        BudgetResource { client }
    }

    /// Splits a stored budget identifier into (resource group, budget name).
    fn locate(id: &str) -> Result<(String, String)> {
        let parsed = ResourceId::parse(id)?;
        let resource_group = parsed.require_resource_group()?.to_string();
        let name = parsed.budget_name()?.to_string();
        Ok((resource_group, name))
    }

    /// Runs a client call, aborting it if the token fires first.
    async fn run_cancellable<T, F>(
        operation: &str,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        if cancel.is_cancelled() {
            warn!("[BudgetResource] {} cancelled before start", operation);
            return Err(Error::Cancelled(operation.to_string()));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("[BudgetResource] {} cancelled in flight", operation);
                Err(Error::Cancelled(operation.to_string()))
            }
            result = call => result,
        }
    }
}

#[async_trait]
impl BudgetResourceTrait for BudgetResource {
    async fn create(
        &self,
        config: &BudgetConfig,
        cancel: &CancellationToken,
    ) -> Result<BudgetState> {
        info!("[BudgetResource] Preparing budget '{}' for creation", config.name);

        let validated = validate_budget_config(config)?;
        let properties = expand_budget_properties(&validated)?;
        debug!(
            "[BudgetResource] Expanded budget '{}': filters={}, notifications={}",
            validated.name,
            properties.filters.is_some(),
            properties.notifications.as_ref().map_or(0, Vec::len)
        );

        let created = Self::run_cancellable(
            "create",
            cancel,
            self.client.create(
                &validated.resource_group_name,
                &validated.name,
                Budget::from_properties(properties),
            ),
        )
        .await?;

        let id = created.id.filter(|id| !id.is_empty()).ok_or_else(|| {
            Error::UnexpectedResponse(format!(
                "create of budget '{}' returned no resource ID",
                validated.name
            ))
        })?;
        info!("[BudgetResource] Created budget {}", id);

        self.read(&id, cancel).await
    }

    async fn read(&self, id: &str, cancel: &CancellationToken) -> Result<BudgetState> {
        let (resource_group, name) = Self::locate(id)?;
        debug!("[BudgetResource] Reading budget {}", id);

        let budget =
            Self::run_cancellable("read", cancel, self.client.get(&resource_group, &name)).await?;

        let mut state = flatten_budget(&budget)?;
        // Keep the tracked key stable even if the API echoes it differently.
        state.id = id.to_string();
        Ok(state)
    }

    async fn refresh(
        &self,
        state: &BudgetState,
        cancel: &CancellationToken,
    ) -> Result<Option<BudgetState>> {
        match self.read(&state.id, cancel).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(e) if e.is_not_found() => {
                warn!(
                    "[BudgetResource] Budget {} no longer exists, removing from state",
                    state.id
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let (resource_group, name) = Self::locate(id)?;
        info!("[BudgetResource] Deleting budget {}", id);

        match Self::run_cancellable("delete", cancel, self.client.delete(&resource_group, &name))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("[BudgetResource] Budget {} was already gone", id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn import(&self, id: &str, cancel: &CancellationToken) -> Result<BudgetState> {
        Self::locate(id)?;
        info!("[BudgetResource] Importing budget {}", id);
        self.read(id, cancel).await
    }

    fn plan(&self, state: &BudgetState, config: &BudgetConfig) -> Result<ReplacementPlan> {
        plan_replacement(state, config)
    }
}
