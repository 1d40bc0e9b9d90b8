use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::Result;

use super::budgets_api_model::Budget;
use super::budgets_model::{BudgetConfig, BudgetState};
use super::budgets_plan::ReplacementPlan;

/// Contract of the billing API client.
///
/// Implementations own transport concerns (auth, retries, rate limiting).
/// `get` and `delete` must report a missing budget as `Error::NotFound`
/// rather than a generic client error.
#[async_trait]
pub trait BudgetApiClient: Send + Sync {
    /// Creates (or replaces) a budget and returns the API's view of it.
    async fn create(&self, resource_group: &str, budget_name: &str, budget: Budget)
        -> Result<Budget>;

    /// Fetches a budget.
    async fn get(&self, resource_group: &str, budget_name: &str) -> Result<Budget>;

    /// Deletes a budget.
    async fn delete(&self, resource_group: &str, budget_name: &str) -> Result<()>;
}

/// Lifecycle operations of the budget resource.
#[async_trait]
pub trait BudgetResourceTrait: Send + Sync {
    /// Validates, expands, creates, then reads the budget back.
    async fn create(&self, config: &BudgetConfig, cancel: &CancellationToken)
        -> Result<BudgetState>;

    /// Reads a budget by its identifier. A missing budget is `Error::NotFound`.
    async fn read(&self, id: &str, cancel: &CancellationToken) -> Result<BudgetState>;

    /// Re-reads tracked state; `None` means the budget is gone and should be
    /// dropped from state.
    async fn refresh(
        &self,
        state: &BudgetState,
        cancel: &CancellationToken,
    ) -> Result<Option<BudgetState>>;

    /// Deletes a budget; a budget that is already gone counts as deleted.
    async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<()>;

    /// Adopts an existing budget into state from its identifier.
    async fn import(&self, id: &str, cancel: &CancellationToken) -> Result<BudgetState>;

    /// Lists the fields whose change forces recreation.
    fn plan(&self, state: &BudgetState, config: &BudgetConfig) -> Result<ReplacementPlan>;
}
