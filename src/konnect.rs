//! The Konnect provider.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::client::RuntimeGroupClient;
use crate::config::ProviderConfig;
use crate::error::{ClientError, ProviderError};
use crate::http::Transport;
use crate::provider::ProviderService;
use crate::runtime_group::{self, RuntimeGroupModel, RESOURCE_TYPE};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult};

/// Provider serving the `konnect_runtime_group` resource.
///
/// Holds no client until [`ProviderService::configure`] succeeds.
#[derive(Default)]
pub struct KonnectProvider {
    client: RwLock<Option<RuntimeGroupClient>>,
    transport: Option<Arc<dyn Transport>>,
}

impl KonnectProvider {
    /// Create a provider that talks to the API over HTTPS.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider whose client sends requests through `transport`.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            client: RwLock::new(None),
            transport: Some(transport),
        }
    }

    /// Whether `configure` has produced a client.
    pub async fn is_configured(&self) -> bool {
        self.client.read().await.is_some()
    }

    async fn client(&self) -> Result<RuntimeGroupClient, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })
    }

    fn build_client(&self, server_url: &str, token: &str) -> Result<RuntimeGroupClient, ClientError> {
        match &self.transport {
            Some(transport) => RuntimeGroupClient::with_transport(server_url, token, transport.clone()),
            None => RuntimeGroupClient::new(server_url, token),
        }
    }
}

fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == RESOURCE_TYPE {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

fn client_diagnostic(err: &ClientError) -> Diagnostic {
    let diagnostic = Diagnostic::error("Unable to create Konnect client").with_detail(err.to_string());
    match err.context() {
        "parsing base URL" => diagnostic.with_attribute("server_url"),
        "validating bearer token" => diagnostic.with_attribute("token"),
        _ => diagnostic,
    }
}

#[async_trait::async_trait]
impl ProviderService for KonnectProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(RESOURCE_TYPE, runtime_group::schema())
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = self.validate_provider_config(config.clone()).await?;
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let resolved = match ProviderConfig::from_value(config)?.resolve() {
            Ok(resolved) => resolved,
            Err(diagnostics) => return Ok(diagnostics),
        };

        match self.build_client(&resolved.server_url, &resolved.token) {
            Ok(client) => {
                info!(server_url = %client.base_url(), "provider configured");
                *self.client.write().await = Some(client);
                Ok(diagnostics)
            }
            Err(err) => Ok(vec![client_diagnostic(&err)]),
        }
    }

    #[instrument(skip(self, prior_state, proposed_state, _config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        check_resource_type(resource_type)?;
        runtime_group::plan(prior_state, proposed_state)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let mut model = runtime_group::parse_planned(planned_state)?;
        let client = self.client().await?;

        let created = client.create_runtime_group(&model.to_request()).await?;
        model.apply_response(&created);
        info!(name = %model.name, runtime_group_id = %created.id, "created runtime group");

        model.to_value()
    }

    #[instrument(skip(self, current_state))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        RuntimeGroupModel::from_value(current_state)?.to_value()
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        runtime_group::merge_update(prior_state, planned_state)
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        check_resource_type(resource_type)?;
        let model = RuntimeGroupModel::from_value(current_state)?;
        // the API has no delete endpoint, so the runtime group stays in Konnect
        debug!(name = %model.name, "removing runtime group from state");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        check_resource_type(resource_type)?;
        let state = runtime_group::import_state(id)?;
        Ok(vec![ImportedResource::new(RESOURCE_TYPE, state)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::testing::{
        assert_error_contains, assert_plan_changes_attribute, assert_plan_creates,
        assert_plan_no_changes, assert_plan_replaces, assert_plan_updates_in_place, ProviderTester,
        StubTransport, TestError,
    };
    use crate::token::tests::test_token;
    use serde_json::json;

    const CREATED_BODY: &str = r#"{
        "id": "rg-42",
        "name": "dev",
        "description": "development group",
        "labels": {"env": "dev"},
        "config": {
            "control_plane_endpoint": "https://cp.example.com",
            "telemetry_endpoint": "https://tp.example.com"
        },
        "created_at": "2023-03-01T10:00:00Z",
        "updated_at": "2023-03-01T10:00:00Z"
    }"#;

    fn provider_config() -> Value {
        json!({"server_url": "https://api.example.com/v2", "token": test_token()})
    }

    async fn configured(stub: &Arc<StubTransport>) -> ProviderTester<KonnectProvider> {
        let tester = ProviderTester::new(KonnectProvider::with_transport(stub.clone()));
        tester.configure(provider_config()).await.unwrap();
        tester
    }

    fn created_stub() -> Arc<StubTransport> {
        Arc::new(StubTransport::always(HttpResponse::new(201, CREATED_BODY)))
    }

    #[test]
    fn test_schema_and_metadata() {
        let tester = ProviderTester::new(KonnectProvider::new());
        assert_eq!(tester.resource_types(), vec![RESOURCE_TYPE.to_string()]);
        assert!(tester.schema().provider.attribute("token").unwrap().sensitive);
    }

    #[tokio::test]
    async fn test_configure_builds_client() {
        let stub = created_stub();
        let tester = configured(&stub).await;
        assert!(tester.provider().is_configured().await);
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn test_configure_rejects_bad_url() {
        let tester = ProviderTester::new(KonnectProvider::with_transport(created_stub()));
        let result = tester
            .configure(json!({"server_url": "not a url", "token": test_token()}))
            .await;

        match result {
            Err(TestError::Diagnostics(diags)) => {
                assert_error_contains(&diags, "Unable to create Konnect client");
                assert_eq!(diags[0].attribute.as_deref(), Some("server_url"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!tester.provider().is_configured().await);
    }

    #[tokio::test]
    async fn test_configure_rejects_bad_token() {
        let tester = ProviderTester::new(KonnectProvider::with_transport(created_stub()));
        let result = tester
            .configure(json!({"server_url": "https://api.example.com", "token": "not-a-jwt"}))
            .await;

        match result {
            Err(TestError::Diagnostics(diags)) => {
                assert_eq!(diags[0].attribute.as_deref(), Some("token"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_configure_rejects_wrong_types() {
        let tester = ProviderTester::new(KonnectProvider::with_transport(created_stub()));
        let result = tester
            .configure(json!({"server_url": 8080, "token": test_token()}))
            .await;
        assert!(matches!(result, Err(TestError::Diagnostics(_))));
    }

    #[tokio::test]
    async fn test_create_requires_configure() {
        let stub = created_stub();
        let tester = ProviderTester::new(KonnectProvider::with_transport(stub.clone()));

        let err = tester
            .create(RESOURCE_TYPE, json!({"name": "dev"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn test_create_sends_one_request() {
        let stub = created_stub();
        let tester = configured(&stub).await;

        let state = tester
            .create(
                RESOURCE_TYPE,
                json!({"name": "dev", "description": "development group", "labels": {"env": "dev"}}),
            )
            .await
            .unwrap();

        assert_eq!(state["id"], "dev");
        assert_eq!(state["runtime_group_id"], "rg-42");
        assert_eq!(state["control_plane_endpoint"], "https://cp.example.com");
        assert_eq!(state["telemetry_endpoint"], "https://tp.example.com");
        assert_eq!(state["labels"], json!({"env": "dev"}));

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.path(), "/v2/create-runtime-group");
        let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["name"], "dev");
        assert_eq!(body["cluster_type"], "");
    }

    #[tokio::test]
    async fn test_create_rejects_reserved_labels_before_sending() {
        let stub = created_stub();
        let tester = configured(&stub).await;

        let err = tester
            .create(RESOURCE_TYPE, json!({"name": "dev", "labels": {"kong-env": "x"}}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn test_create_maps_conflict() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(
            409,
            r#"{"message": "runtime group already exists"}"#,
        )));
        let tester = configured(&stub).await;

        let err = tester
            .create(RESOURCE_TYPE, json!({"name": "dev"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists(_)));
        assert!(err.message().contains("already exists"));
    }

    #[tokio::test]
    async fn test_create_maps_unreachable_server() {
        let stub = Arc::new(StubTransport::new());
        let tester = configured(&stub).await;

        let err = tester
            .create(RESOURCE_TYPE, json!({"name": "dev"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[tokio::test]
    async fn test_plans() {
        let stub = created_stub();
        let tester = configured(&stub).await;

        let create = tester
            .plan_create(RESOURCE_TYPE, json!({"name": "dev"}))
            .await
            .unwrap();
        assert_plan_creates(&create);

        let state = tester
            .create(RESOURCE_TYPE, create.planned_state)
            .await
            .unwrap();

        let unchanged = tester
            .plan_update(RESOURCE_TYPE, state.clone(), json!({"name": "dev"}))
            .await
            .unwrap();
        assert_plan_no_changes(&unchanged);

        let in_place = tester
            .plan_update(RESOURCE_TYPE, state.clone(), json!({"name": "dev", "description": "x"}))
            .await
            .unwrap();
        assert_plan_updates_in_place(&in_place);
        assert_plan_changes_attribute(&in_place, "description");

        let rename = tester
            .plan_update(RESOURCE_TYPE, state.clone(), json!({"name": "prod"}))
            .await
            .unwrap();
        assert_plan_replaces(&rename);

        let delete = tester.plan_delete(RESOURCE_TYPE, state).await.unwrap();
        assert!(delete.planned_state.is_null());
        assert_eq!(stub.request_count(), 1);
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let stub = created_stub();
        let tester = configured(&stub).await;

        let state = tester
            .lifecycle_crud(
                RESOURCE_TYPE,
                json!({"name": "dev"}),
                json!({"name": "dev", "description": "updated"}),
            )
            .await
            .unwrap();

        assert_eq!(state["description"], "updated");
        assert_eq!(state["runtime_group_id"], "rg-42");
        // update and delete stay local
        assert_eq!(stub.request_count(), 1);
    }

    #[tokio::test]
    async fn test_import() {
        let tester = ProviderTester::new(KonnectProvider::new());
        let imported = tester.import_resource(RESOURCE_TYPE, "dev").await.unwrap();

        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, RESOURCE_TYPE);
        assert_eq!(imported[0].state["id"], "dev");
        assert_eq!(imported[0].state["name"], "dev");
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let tester = ProviderTester::new(KonnectProvider::new());
        assert!(matches!(
            tester.read("konnect_service", json!({"name": "x"})).await,
            Err(ProviderError::UnknownResource(_))
        ));
        assert!(matches!(
            tester.import_resource("konnect_service", "x").await,
            Err(ProviderError::UnknownResource(_))
        ));
    }
}
