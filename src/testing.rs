//! Helpers for testing providers without a plugin host or a network.
//!
//! [`ProviderTester`] calls a [`ProviderService`] the way the host would and
//! chains the usual lifecycle sequences. [`StubTransport`] stands in for the
//! HTTP layer of [`RuntimeGroupClient`](crate::RuntimeGroupClient).
//!
//! ```ignore
//! use std::sync::Arc;
//! use konnect_provider::testing::{ProviderTester, StubTransport};
//! use konnect_provider::{HttpResponse, KonnectProvider};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn creates_runtime_group() {
//!     let stub = Arc::new(StubTransport::always(HttpResponse::new(201, CREATED_BODY)));
//!     let tester = ProviderTester::new(KonnectProvider::with_transport(stub.clone()));
//!
//!     tester.configure(json!({"server_url": "https://api.example.com", "token": TOKEN})).await.unwrap();
//!     let state = tester.create("konnect_runtime_group", json!({"name": "dev"})).await.unwrap();
//!
//!     assert_eq!(state["id"], "dev");
//!     assert_eq!(stub.request_count(), 1);
//! }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::provider::ProviderService;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult};

/// Drives a provider through the host lifecycle.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The provider schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Validate the provider block; error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.validate_provider_config(config).await?)
    }

    /// Configure the provider; error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource configuration; error diagnostics become `Err`.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Plan with explicit prior state; the proposed state doubles as config.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        let config = proposed_state.clone();
        self.provider
            .plan(resource_type, prior_state, proposed_state, config)
            .await
    }

    /// Plan a resource that does not exist yet.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.plan(resource_type, None, proposed_state).await
    }

    /// Plan a change to an existing resource.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.plan(resource_type, Some(prior_state), proposed_state)
            .await
    }

    /// Plan removing an existing resource.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.plan(resource_type, Some(prior_state), Value::Null)
            .await
    }

    /// Apply a create.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Refresh state.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Apply an in-place update.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Apply a delete.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import by identifier.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Plan, create, then read back. Returns the read state.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan, update, then read back. Returns the read state.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Plan a delete, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Create, update and delete in turn. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated.clone())
            .await?;
        Ok(updated)
    }
}

/// Failure of a [`ProviderTester`] call that reports diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// Error diagnostics; warnings are dropped.
    Diagnostics(Vec<Diagnostic>),
    /// The call itself failed.
    Provider(ProviderError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diagnostics = match self {
            TestError::Provider(e) => return write!(f, "Provider error: {}", e),
            TestError::Diagnostics(diagnostics) => diagnostics,
        };
        writeln!(f, "{} error diagnostic(s):", diagnostics.len())?;
        for d in diagnostics {
            write!(f, "  {}", d.summary)?;
            if let Some(detail) = &d.detail {
                write!(f, ": {}", detail)?;
            }
            if let Some(attribute) = &d.attribute {
                write!(f, " (at {})", attribute)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<Diagnostic> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// A [`Transport`] that records requests and replays canned responses.
///
/// Queued responses go out first, in order. After that every call gets the
/// `always` response, or a [`TransportError`] when there is none, which is
/// how an unreachable server is simulated.
#[derive(Debug, Default)]
pub struct StubTransport {
    queue: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    fallback: Option<HttpResponse>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    /// No responses; every call fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `response`.
    pub fn always(response: HttpResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    /// Queue a response.
    pub fn with_response(self, response: HttpResponse) -> Self {
        lock(&self.queue).push_back(Ok(response));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: TransportError) -> Self {
        lock(&self.queue).push_back(Err(error));
        self
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.requests).push(request);
        let queued = lock(&self.queue).pop_front();
        match (queued, &self.fallback) {
            (Some(next), _) => next,
            (None, Some(response)) => Ok(response.clone()),
            (None, None) => Err(TransportError::new(
                "connection refused (no stubbed response)",
            )),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Panics unless `plan` creates the resource without replacing anything.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(plan.has_changes(), "expected a create plan, got no changes");
    assert!(!plan.requires_replace, "expected a create plan, got a replace");
    assert!(!plan.is_delete(), "expected a create plan, got a delete");
}

/// Panics if `plan` changes anything.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        !plan.has_changes(),
        "expected no changes, got {:?}",
        plan.changed_paths()
    );
}

/// Panics unless `plan` replaces the resource.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "expected a replace, changes: {:?}",
        plan.changed_paths()
    );
}

/// Panics unless `plan` changes the resource in place.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(plan.has_changes(), "expected an update, got no changes");
    assert!(
        !plan.requires_replace,
        "expected an in-place update, got a replace of {:?}",
        plan.changed_paths()
    );
}

/// Panics unless `plan` changes attribute `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.change(path).is_some(),
        "expected '{}' to change, changes: {:?}",
        path,
        plan.changed_paths()
    );
}

/// Panics if any diagnostic is an error.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<&str> = error_summaries(diagnostics).collect();
    assert!(errors.is_empty(), "expected no errors, got {:?}", errors);
}

/// Panics unless some error diagnostic's summary contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let errors: Vec<&str> = error_summaries(diagnostics).collect();
    assert!(
        errors.iter().any(|s| s.contains(substring)),
        "expected an error containing '{}', got {:?}",
        substring,
        errors
    );
}

fn error_summaries(diagnostics: &[Diagnostic]) -> impl Iterator<Item = &str> {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.summary.as_str())
}
