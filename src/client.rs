//! Client for the Konnect runtime group API.
//!
//! [`RuntimeGroupClient`] holds an immutable base URL, a bearer token and a
//! shared [`Transport`]. Both the URL and the token are checked when the
//! client is built, so a client value is always usable. Each call performs
//! exactly one request; there is no retry and no caching.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::token::validate_bearer_token;

/// Path of the runtime group creation endpoint, relative to the base URL.
pub const CREATE_RUNTIME_GROUP_ENDPOINT: &str = "create-runtime-group";

/// Request body for creating a runtime group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRuntimeGroupRequest {
    /// The runtime group name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Cluster type of the cluster associated with the runtime group.
    pub cluster_type: String,
    /// Labels for tagged search.
    pub labels: BTreeMap<String, String>,
}

/// Endpoints assigned to a runtime group by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeGroupConfig {
    /// Control plane endpoint for data plane nodes.
    pub control_plane_endpoint: String,
    /// Telemetry endpoint for data plane nodes.
    pub telemetry_endpoint: String,
}

/// Response body of a successful runtime group creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRuntimeGroupResponse {
    /// Server-issued identifier.
    pub id: String,
    /// The runtime group name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Labels as stored by the server.
    pub labels: BTreeMap<String, String>,
    /// Server-assigned endpoints.
    pub config: RuntimeGroupConfig,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl CreateRuntimeGroupResponse {
    /// The control plane endpoint assigned by the server.
    pub fn control_plane_endpoint(&self) -> &str {
        &self.config.control_plane_endpoint
    }

    /// The telemetry endpoint assigned by the server.
    pub fn telemetry_endpoint(&self) -> &str {
        &self.config.telemetry_endpoint
    }
}

/// Error body shapes the API is known to return. Only used to pull out a
/// human-readable message; unknown shapes fall back to the raw body.
#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    message: Option<String>,
    detail: Option<String>,
    title: Option<String>,
}

/// Authenticated client for the runtime group API.
#[derive(Clone)]
pub struct RuntimeGroupClient {
    base_url: Url,
    token: String,
    transport: Arc<dyn Transport>,
}

impl RuntimeGroupClient {
    /// Build a client that sends requests with a default [`ReqwestTransport`].
    ///
    /// # Arguments
    ///
    /// * `base_url` - Absolute URL the endpoint path is appended to; any path
    ///   it carries, such as `/v2`, is kept.
    /// * `token` - Bearer token in compact JWT form. It is checked for shape
    ///   only; the API verifies it.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] when either argument is rejected. No request is
    /// made in that case or on success.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use konnect_provider::RuntimeGroupClient;
    ///
    /// # fn main() -> Result<(), konnect_provider::ClientError> {
    /// let token = std::env::var("KONNECT_TOKEN").unwrap_or_default();
    /// let client = RuntimeGroupClient::new("https://us.api.konghq.com/v2", &token)?;
    /// assert_eq!(client.base_url().path(), "/v2");
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        Self::with_transport(base_url, token, Arc::new(ReqwestTransport::default()))
    }

    /// Build a client that sends requests through `transport`.
    ///
    /// Fails with [`ClientError::Config`] if `base_url` is not an absolute
    /// URL or `token` is not a structurally valid JWT. No request is made.
    pub fn with_transport(
        base_url: &str,
        token: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        if base_url.trim().is_empty() {
            return Err(ClientError::config("parsing base URL", "base URL is empty"));
        }
        // Url::parse strips tabs, newlines and leading or trailing C0 controls
        if base_url.chars().any(char::is_control) {
            return Err(ClientError::config(
                "parsing base URL",
                "invalid control character in URL",
            ));
        }
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::config("parsing base URL", e.to_string()))?;

        validate_bearer_token(token).map_err(ClientError::invalid_token)?;

        Ok(Self {
            base_url,
            token: token.to_string(),
            transport,
        })
    }

    /// The validated base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Create a runtime group.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_runtime_group(
        &self,
        request: &CreateRuntimeGroupRequest,
    ) -> Result<CreateRuntimeGroupResponse, ClientError> {
        let created: CreateRuntimeGroupResponse = self
            .post_json(CREATE_RUNTIME_GROUP_ENDPOINT, request)
            .await?;
        debug!(id = %created.id, "runtime group created");
        Ok(created)
    }

    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_string(body).map_err(|source| ClientError::Encoding {
            context: "serializing request body",
            source,
        })?;
        let url = self.endpoint(endpoint)?;

        let response = self
            .send(HttpRequest {
                method: HttpMethod::Post,
                url,
                headers: Vec::new(),
                body: Some(body),
            })
            .await?;
        check_status(&response)?;

        serde_json::from_slice(&response.body).map_err(|source| ClientError::Decoding {
            context: "decoding response JSON",
            source,
        })
    }

    fn endpoint(&self, endpoint: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::config(
                    "joining base URL and endpoint",
                    format!("{} cannot carry a path", self.base_url),
                )
            })?
            .pop_if_empty()
            .extend(endpoint.split('/'));
        Ok(url)
    }

    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, ClientError> {
        request
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        request
            .headers
            .push(("Authorization".to_string(), format!("Bearer {}", self.token)));

        debug!(url = %request.url, "sending request");
        self.transport
            .send(request)
            .await
            .map_err(|source| ClientError::Transport {
                context: "making HTTP request",
                source,
            })
    }
}

impl fmt::Debug for RuntimeGroupClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeGroupClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn check_status(response: &HttpResponse) -> Result<(), ClientError> {
    if matches!(response.status, 200 | 201) {
        return Ok(());
    }
    warn!(status = response.status, "remote API rejected request");
    Err(ClientError::Remote {
        context: "checking status code",
        status: response.status,
        message: remote_message(&response.body),
    })
}

fn remote_message(body: &[u8]) -> Option<String> {
    if let Ok(parsed) = serde_json::from_slice::<RemoteErrorBody>(body) {
        if let Some(msg) = parsed.message.or(parsed.detail).or(parsed.title) {
            return Some(msg);
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientErrorKind;
    use crate::testing::StubTransport;
    use crate::token::tests::test_token;
    use serde::Serializer;
    use serde_json::json;

    const CREATED_BODY: &str = r#"{
        "id": "7f9fd312-a987-4628-b4c5-bb4f4fddd5f7",
        "name": "dev",
        "description": "development group",
        "labels": {"env": "dev"},
        "config": {
            "control_plane_endpoint": "https://cp.example.com",
            "telemetry_endpoint": "https://tp.example.com"
        },
        "created_at": "2023-03-01T10:00:00Z",
        "updated_at": "2023-03-01T10:00:01Z"
    }"#;

    fn request() -> CreateRuntimeGroupRequest {
        CreateRuntimeGroupRequest {
            name: "dev".to_string(),
            description: "development group".to_string(),
            cluster_type: "CLUSTER_TYPE_HYBRID".to_string(),
            labels: BTreeMap::from([("env".to_string(), "dev".to_string())]),
        }
    }

    fn client_with(stub: &Arc<StubTransport>) -> RuntimeGroupClient {
        RuntimeGroupClient::with_transport("https://api.example.com/v2", &test_token(), stub.clone())
            .unwrap()
    }

    #[test]
    fn test_new_accepts_valid_configuration() {
        let client = RuntimeGroupClient::new("https://api.example.com", &test_token()).unwrap();
        assert_eq!(client.base_url().as_str(), "https://api.example.com/");
        let again = client.clone();
        assert_eq!(again.base_url(), client.base_url());
    }

    #[test]
    fn test_new_rejects_malformed_base_url() {
        let stub = Arc::new(StubTransport::new());
        for base in [
            "",
            "not a url",
            "/relative/path",
            "http://exa mple.com",
            "http://[::1",
            "https://api.example.com/v2\n",
            "https://api.example.com/v\n2",
            "https://api.example.com/v2\t",
            "https://api.example.com/v2\u{1}",
            "\u{1}https://api.example.com/v2",
            "https://api.example.com/v2\u{7f}",
        ] {
            let err = RuntimeGroupClient::with_transport(base, &test_token(), stub.clone())
                .unwrap_err();
            assert_eq!(err.kind(), ClientErrorKind::Config, "base {:?}", base);
            assert_eq!(err.context(), "parsing base URL");
        }
        assert_eq!(stub.request_count(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_token() {
        let stub = Arc::new(StubTransport::new());
        let injected = format!("{}\r\nX-Injected: 1", test_token());
        for token in ["", "opaque-api-key", "a.b.c", injected.as_str()] {
            let err = RuntimeGroupClient::with_transport("https://api.example.com", token, stub.clone())
                .unwrap_err();
            assert_eq!(err.kind(), ClientErrorKind::Config, "token {:?}", token);
            assert_eq!(err.context(), "validating bearer token");
        }
        assert_eq!(stub.request_count(), 0);
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = test_token();
        let client = RuntimeGroupClient::new("https://api.example.com", &token).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains(&token));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_create_sends_one_authenticated_post() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(201, CREATED_BODY)));
        let client = client_with(&stub);

        client.create_runtime_group(&request()).await.unwrap();

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(
            sent.url.as_str(),
            "https://api.example.com/v2/create-runtime-group"
        );
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(
            sent.header("authorization"),
            Some(format!("Bearer {}", test_token()).as_str())
        );

        let body: serde_json::Value =
            serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "dev",
                "description": "development group",
                "cluster_type": "CLUSTER_TYPE_HYBRID",
                "labels": {"env": "dev"}
            })
        );
    }

    #[tokio::test]
    async fn test_create_maps_response_fields() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(201, CREATED_BODY)));
        let created = client_with(&stub)
            .create_runtime_group(&request())
            .await
            .unwrap();

        assert_eq!(created.id, "7f9fd312-a987-4628-b4c5-bb4f4fddd5f7");
        assert_eq!(created.name, "dev");
        assert_eq!(created.description, "development group");
        assert_eq!(created.labels["env"], "dev");
        assert_eq!(created.control_plane_endpoint(), "https://cp.example.com");
        assert_eq!(created.telemetry_endpoint(), "https://tp.example.com");
        assert_eq!(created.created_at, "2023-03-01T10:00:00Z");
        assert_eq!(created.updated_at, "2023-03-01T10:00:01Z");
    }

    #[tokio::test]
    async fn test_create_accepts_200() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(200, CREATED_BODY)));
        assert!(client_with(&stub)
            .create_runtime_group(&request())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_not_doubled() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(201, CREATED_BODY)));
        let client =
            RuntimeGroupClient::with_transport("http://localhost:8080/", &test_token(), stub.clone())
                .unwrap();
        client.create_runtime_group(&request()).await.unwrap();
        assert_eq!(
            stub.requests()[0].url.as_str(),
            "http://localhost:8080/create-runtime-group"
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_error() {
        for status in [204, 400, 401, 403, 404, 409, 500, 503] {
            let stub = Arc::new(StubTransport::always(HttpResponse::new(status, "")));
            let err = client_with(&stub)
                .create_runtime_group(&request())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ClientErrorKind::Remote(status));
            assert_eq!(stub.request_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_remote_error_message_extracted() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(
            409,
            r#"{"status": 409, "title": "Conflict", "detail": "name must be unique"}"#,
        )));
        let err = client_with(&stub)
            .create_runtime_group(&request())
            .await
            .unwrap_err();
        match err {
            ClientError::Remote { status, message, .. } => {
                assert_eq!(status, 409);
                assert_eq!(message.as_deref(), Some("name must be unique"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let stub = Arc::new(StubTransport::always(HttpResponse::new(502, "bad gateway\n")));
        let err = client_with(&stub)
            .create_runtime_group(&request())
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("status code 502: bad gateway"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_decoding_error() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(201, "<html>")));
        let err = client_with(&stub)
            .create_runtime_group(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::Decoding);
        assert_eq!(err.context(), "decoding response JSON");
    }

    #[tokio::test]
    async fn test_incomplete_json_is_decoding_error() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(
            201,
            r#"{"id": "abc", "name": "dev"}"#,
        )));
        let err = client_with(&stub)
            .create_runtime_group(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::Decoding);
    }

    #[tokio::test]
    async fn test_transport_failure_is_transport_error() {
        let stub = Arc::new(StubTransport::new());
        let err = client_with(&stub)
            .create_runtime_group(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::Transport);
        assert_eq!(err.context(), "making HTTP request");
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("label value rejected"))
        }
    }

    #[tokio::test]
    async fn test_encoding_error_before_any_io() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(201, CREATED_BODY)));
        let client = client_with(&stub);

        let result: Result<serde_json::Value, ClientError> = client
            .post_json(CREATE_RUNTIME_GROUP_ENDPOINT, &Unserializable)
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::Encoding);
        assert_eq!(err.context(), "serializing request body");
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cannot_be_a_base_url_fails_before_any_io() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(201, CREATED_BODY)));
        let client =
            RuntimeGroupClient::with_transport("mailto:ops@example.com", &test_token(), stub.clone())
                .unwrap();
        let err = client.create_runtime_group(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::Config);
        assert_eq!(err.context(), "joining base URL and endpoint");
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_independent() {
        let stub = Arc::new(StubTransport::always(HttpResponse::new(201, CREATED_BODY)));
        let client = client_with(&stub);

        let first = client.create_runtime_group(&request()).await.unwrap();
        let second = client.create_runtime_group(&request()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(stub.request_count(), 2);
    }
}
