//! Error types for the Konnect provider.
//!
//! [`ClientError`] covers the runtime group API client. [`ProviderError`] is
//! what the provider lifecycle methods return to the plugin host.

use thiserror::Error;

use crate::http::TransportError;
use crate::token::TokenError;

/// Errors returned by [`RuntimeGroupClient`](crate::client::RuntimeGroupClient).
///
/// Every variant carries a short context naming the step that failed.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL or token is unusable, or an endpoint URL could not be
    /// composed from the base URL.
    #[error("client error: {context}: {message}")]
    Config {
        /// The step that failed.
        context: &'static str,
        /// What was wrong with the configuration.
        message: String,
    },

    /// The request body could not be serialized.
    #[error("client error: {context}: {source}")]
    Encoding {
        /// The step that failed.
        context: &'static str,
        /// The underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("client error: {context}: {source}")]
    Transport {
        /// The step that failed.
        context: &'static str,
        /// The underlying transport error.
        #[source]
        source: TransportError,
    },

    /// The server answered with a status other than 200 or 201.
    #[error("client error: {context}: HTTP request failed with status code {status}{}", display_message(.message))]
    Remote {
        /// The step that failed.
        context: &'static str,
        /// The HTTP status code.
        status: u16,
        /// Message extracted from the error body, if any.
        message: Option<String>,
    },

    /// The success body could not be decoded.
    #[error("client error: {context}: {source}")]
    Decoding {
        /// The step that failed.
        context: &'static str,
        /// The underlying deserializer error.
        #[source]
        source: serde_json::Error,
    },
}

/// The kind of a [`ClientError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// See [`ClientError::Config`].
    Config,
    /// See [`ClientError::Encoding`].
    Encoding,
    /// See [`ClientError::Transport`].
    Transport,
    /// See [`ClientError::Remote`].
    Remote(u16),
    /// See [`ClientError::Decoding`].
    Decoding,
}

impl ClientError {
    pub(crate) fn config(context: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            context,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_token(err: TokenError) -> Self {
        Self::config("validating bearer token", err.to_string())
    }

    /// Get the kind of this error.
    pub fn kind(&self) -> ClientErrorKind {
        match self {
            Self::Config { .. } => ClientErrorKind::Config,
            Self::Encoding { .. } => ClientErrorKind::Encoding,
            Self::Transport { .. } => ClientErrorKind::Transport,
            Self::Remote { status, .. } => ClientErrorKind::Remote(*status),
            Self::Decoding { .. } => ClientErrorKind::Decoding,
        }
    }

    /// The context string naming the step that failed.
    pub fn context(&self) -> &'static str {
        match self {
            Self::Config { context, .. }
            | Self::Encoding { context, .. }
            | Self::Transport { context, .. }
            | Self::Remote { context, .. }
            | Self::Decoding { context, .. } => context,
        }
    }

    /// The HTTP status code for [`ClientError::Remote`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn display_message(message: &Option<String>) -> String {
    match message {
        Some(msg) => format!(": {}", msg),
        None => String::new(),
    }
}

/// Errors returned from [`ProviderService`](crate::ProviderService) calls.
///
/// Remote failures arrive through `From<ClientError>`, which picks the
/// variant from the HTTP status.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API reported 404.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Planned state broke a schema rule.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Anything without a more specific variant.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// Called before `configure`, or the client could not be built.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A resource type this provider does not serve.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// State did not match the resource model.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No response from the API.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The API reported 409, e.g. a runtime group name already in use.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// The API reported 401 or 403.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The API reported 429.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The API reported 503.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The API reported 504.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The API reported 400 or 422, or the import identifier was empty.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// The message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Serialization(_) => "state does not match the resource model",
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Sdk(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::Transport(msg)
            | Self::AlreadyExists(msg)
            | Self::PermissionDenied(msg)
            | Self::ResourceExhausted(msg)
            | Self::Unavailable(msg)
            | Self::DeadlineExceeded(msg)
            | Self::InvalidRequest(msg) => msg,
        }
    }
}

impl From<ClientError> for ProviderError {
    fn from(err: ClientError) -> Self {
        let msg = err.to_string();
        match err.kind() {
            ClientErrorKind::Config => ProviderError::Configuration(msg),
            ClientErrorKind::Encoding | ClientErrorKind::Decoding => ProviderError::Sdk(msg),
            ClientErrorKind::Transport => ProviderError::Transport(msg),
            ClientErrorKind::Remote(status) => match status {
                400 | 422 => ProviderError::InvalidRequest(msg),
                401 | 403 => ProviderError::PermissionDenied(msg),
                404 => ProviderError::NotFound(msg),
                409 => ProviderError::AlreadyExists(msg),
                429 => ProviderError::ResourceExhausted(msg),
                503 => ProviderError::Unavailable(msg),
                504 => ProviderError::DeadlineExceeded(msg),
                _ => ProviderError::Sdk(msg),
            },
        }
    }
}
