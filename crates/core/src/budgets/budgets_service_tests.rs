//! Tests for the BudgetResource lifecycle against a mock billing API.
//!
//! # Contract Points
//!
//! 1. Create: validation and expansion failures never reach the client
//! 2. Create: the remote identifier becomes the key and is read back
//! 3. Read: a missing budget is `NotFound`, not a client error
//! 4. Delete: a missing budget counts as deleted
//! 5. Cancellation: aborts the client call and reports `Cancelled`

#[cfg(test)]
mod tests {
    use crate::budgets::{
        Budget, BudgetApiClient, BudgetConfig, BudgetResource, BudgetResourceTrait, Category,
        FilterSet, NotificationOperator, NotificationRule, TimeGrain,
    };
    use crate::errors::{ClientError, Error, Result};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

    fn budget_id(resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Consumption/budgets/{}",
            SUBSCRIPTION, resource_group, name
        )
    }

    // =========================================================================
    // Mock BudgetApiClient
    // =========================================================================

    #[derive(Clone, Default)]
    struct MockBudgetClient {
        budgets: Arc<Mutex<HashMap<(String, String), Budget>>>,
        calls: Arc<Mutex<Vec<String>>>,
        fail_create: Arc<Mutex<Option<ClientError>>>,
        fail_delete: Arc<Mutex<Option<ClientError>>>,
        omit_id: Arc<Mutex<bool>>,
        stall: Arc<Mutex<bool>>,
    }

    impl MockBudgetClient {
        fn new() -> Self {
            Self::default()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn stored(&self, resource_group: &str, name: &str) -> Option<Budget> {
            self.budgets
                .lock()
                .unwrap()
                .get(&(resource_group.to_string(), name.to_string()))
                .cloned()
        }

        fn remove(&self, resource_group: &str, name: &str) {
            self.budgets
                .lock()
                .unwrap()
                .remove(&(resource_group.to_string(), name.to_string()));
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        async fn maybe_stall(&self) {
            let stall = *self.stall.lock().unwrap();
            if stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    }

    #[async_trait]
    impl BudgetApiClient for MockBudgetClient {
        async fn create(
            &self,
            resource_group: &str,
            budget_name: &str,
            budget: Budget,
        ) -> Result<Budget> {
            self.record(format!("create {}/{}", resource_group, budget_name));
            self.maybe_stall().await;

            if let Some(err) = self.fail_create.lock().unwrap().clone() {
                return Err(err.into());
            }

            let mut stored = budget;
            stored.id = Some(budget_id(resource_group, budget_name));
            stored.name = Some(budget_name.to_string());
            stored.e_tag = Some("\"etag-1\"".to_string());
            self.budgets.lock().unwrap().insert(
                (resource_group.to_string(), budget_name.to_string()),
                stored.clone(),
            );

            if *self.omit_id.lock().unwrap() {
                stored.id = None;
            }
            Ok(stored)
        }

        async fn get(&self, resource_group: &str, budget_name: &str) -> Result<Budget> {
            self.record(format!("get {}/{}", resource_group, budget_name));
            self.maybe_stall().await;

            self.stored(resource_group, budget_name)
                .ok_or_else(|| Error::NotFound(budget_id(resource_group, budget_name)))
        }

        async fn delete(&self, resource_group: &str, budget_name: &str) -> Result<()> {
            self.record(format!("delete {}/{}", resource_group, budget_name));
            self.maybe_stall().await;

            if let Some(err) = self.fail_delete.lock().unwrap().clone() {
                return Err(err.into());
            }

            self.budgets
                .lock()
                .unwrap()
                .remove(&(resource_group.to_string(), budget_name.to_string()))
                .map(|_| ())
                .ok_or_else(|| Error::NotFound(budget_id(resource_group, budget_name)))
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn config() -> BudgetConfig {
        BudgetConfig {
            name: "monthly-cap".to_string(),
            resource_group_name: "rg-billing".to_string(),
            category: "Cost".to_string(),
            amount: Some(dec!(500.0)),
            time_grain: "monthly".to_string(),
            filters: None,
            notifications: vec![NotificationRule {
                threshold: 80,
                operator: "GreaterThan".to_string(),
                contact_emails: Some(BTreeSet::from(["a@x.com".to_string()])),
                action_groups: None,
            }],
        }
    }

    fn resource(client: &MockBudgetClient) -> BudgetResource {
        BudgetResource::new(Arc::new(client.clone()))
    }

    // =========================================================================
    // Create
    // =========================================================================

    #[tokio::test]
    async fn test_create_sends_expanded_properties_and_reads_back() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);

        let state = resource
            .create(&config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(state.id, budget_id("rg-billing", "monthly-cap"));
        assert_eq!(state.name, "monthly-cap");
        assert_eq!(state.resource_group_name, "rg-billing");
        assert_eq!(state.category, "Cost");
        assert_eq!(state.time_grain, "Monthly");
        assert_eq!(state.amount, dec!(500));
        assert_eq!(state.notifications, config().notifications);
        assert_eq!(
            client.calls(),
            vec![
                "create rg-billing/monthly-cap".to_string(),
                "get rg-billing/monthly-cap".to_string(),
            ]
        );

        let sent = client
            .stored("rg-billing", "monthly-cap")
            .and_then(|b| b.properties)
            .unwrap();
        assert_eq!(sent.category, Category::Cost);
        assert_eq!(sent.time_grain, TimeGrain::Monthly);
        assert_eq!(sent.filters, None);
        let notifications = sent.notifications.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].operator, NotificationOperator::GreaterThan);
        assert_eq!(notifications[0].contact_groups, None);
    }

    #[tokio::test]
    async fn test_create_with_invalid_config_never_calls_client() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);

        let mut config = config();
        config.notifications[0].threshold = 1001;
        config.time_grain = "Weekly".to_string();

        let err = resource
            .create(&config, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::Validation(errors) => {
                assert!(errors.has_field("notification.0.threshold"));
                assert!(errors.has_field("time_grain"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_malformed_meter_is_expansion_error() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);

        let mut config = config();
        config.filters = Some(FilterSet {
            meters: Some(BTreeSet::from(["meter-one".to_string()])),
            ..Default::default()
        });

        let err = resource
            .create(&config, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Expansion(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_surfaces_client_error_unchanged() {
        let client = MockBudgetClient::new();
        *client.fail_create.lock().unwrap() = Some(
            ClientError::new("The budget amount must be greater than zero.")
                .with_status(400)
                .with_code("400"),
        );
        let resource = resource(&client);

        let err = resource
            .create(&config(), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::Client(client_err) => {
                assert_eq!(client_err.status, Some(400));
                assert_eq!(
                    client_err.message,
                    "The budget amount must be greater than zero."
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client.calls(), vec!["create rg-billing/monthly-cap".to_string()]);
    }

    #[tokio::test]
    async fn test_create_without_remote_id_fails() {
        let client = MockBudgetClient::new();
        *client.omit_id.lock().unwrap() = true;
        let resource = resource(&client);

        let err = resource
            .create(&config(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }

    // =========================================================================
    // Read / Refresh / Import
    // =========================================================================

    #[tokio::test]
    async fn test_read_missing_budget_is_not_found() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);

        let err = resource
            .read(&budget_id("rg-billing", "gone"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "expected NotFound, got {err:?}");
        assert!(!matches!(err, Error::Client(_)));
    }

    #[tokio::test]
    async fn test_read_reflects_remote_drift() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);
        let cancel = CancellationToken::new();
        let state = resource.create(&config(), &cancel).await.unwrap();

        {
            let mut budgets = client.budgets.lock().unwrap();
            let budget = budgets
                .get_mut(&("rg-billing".to_string(), "monthly-cap".to_string()))
                .unwrap();
            budget.properties.as_mut().unwrap().amount = dec!(900);
        }

        let refreshed = resource.read(&state.id, &cancel).await.unwrap();
        assert_eq!(refreshed.amount, dec!(900));
        assert!(resource.plan(&refreshed, &config()).unwrap().contains("amount"));
    }

    #[tokio::test]
    async fn test_refresh_drops_deleted_budget() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);
        let cancel = CancellationToken::new();
        let state = resource.create(&config(), &cancel).await.unwrap();

        client.remove("rg-billing", "monthly-cap");

        let refreshed = resource.refresh(&state, &cancel).await.unwrap();
        assert!(refreshed.is_none());
    }

    #[tokio::test]
    async fn test_import_reads_existing_budget() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);
        let cancel = CancellationToken::new();
        resource.create(&config(), &cancel).await.unwrap();

        let imported = resource
            .import(&budget_id("rg-billing", "monthly-cap"), &cancel)
            .await
            .unwrap();
        assert_eq!(imported.name, "monthly-cap");
        assert!(resource.plan(&imported, &config()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_rejects_foreign_resource_id() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);

        let err = resource
            .import(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResourceId(_)));
        assert!(client.calls().is_empty());
    }

    // =========================================================================
    // Delete
    // =========================================================================

    #[tokio::test]
    async fn test_delete_existing_and_missing_budget() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);
        let cancel = CancellationToken::new();
        let state = resource.create(&config(), &cancel).await.unwrap();

        resource.delete(&state.id, &cancel).await.unwrap();
        assert!(client.stored("rg-billing", "monthly-cap").is_none());

        // Second delete finds nothing and still succeeds.
        resource.delete(&state.id, &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_surfaces_other_failures() {
        let client = MockBudgetClient::new();
        *client.fail_delete.lock().unwrap() =
            Some(ClientError::new("Authorization failed").with_status(403));
        let resource = resource(&client);

        let err = resource
            .delete(&budget_id("rg-billing", "monthly-cap"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Authorization failed");
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    #[tokio::test]
    async fn test_pre_cancelled_token_skips_client() {
        let client = MockBudgetClient::new();
        let resource = resource(&client);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = resource.create(&config(), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_read() {
        let client = MockBudgetClient::new();
        *client.stall.lock().unwrap() = true;
        let resource = resource(&client);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = resource
            .read(&budget_id("rg-billing", "monthly-cap"), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(client.calls(), vec!["get rg-billing/monthly-cap".to_string()]);
    }
}
