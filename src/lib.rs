//! Konnect Provider
//!
//! An infrastructure-as-code provider for Kong Konnect runtime groups, with
//! the small authenticated HTTP client it is built on.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **RuntimeGroupClient**: Creates runtime groups through the Konnect API
//! - **Transport**: Pluggable HTTP execution, backed by `reqwest` in production
//! - **ProviderService trait**: The lifecycle a plugin host drives
//! - **KonnectProvider**: The `konnect_runtime_group` resource on top of the client
//! - **Schema types**: Attribute and validation rules for configuration and state
//! - **Error types**: Client and provider errors
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use konnect_provider::{KonnectProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     konnect_provider::init_logging();
//!
//!     let provider = KonnectProvider::new();
//!     provider
//!         .configure(json!({
//!             "server_url": "https://us.api.konghq.com/v2",
//!             "token": std::env::var("KONNECT_TOKEN")?,
//!         }))
//!         .await?;
//!
//!     let plan = provider
//!         .plan("konnect_runtime_group", None, json!({"name": "dev"}), json!({"name": "dev"}))
//!         .await?;
//!     let state = provider.create("konnect_runtime_group", plan.planned_state).await?;
//!     println!("{}", state["control_plane_endpoint"]);
//!     Ok(())
//! }
//! ```
//!
//! # Using the client directly
//!
//! ```ignore
//! use konnect_provider::client::{CreateRuntimeGroupRequest, RuntimeGroupClient};
//!
//! let client = RuntimeGroupClient::new("https://us.api.konghq.com/v2", &token)?;
//! let created = client
//!     .create_runtime_group(&CreateRuntimeGroupRequest {
//!         name: "dev".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{}", created.control_plane_endpoint());
//! ```
//!
//! # Provider Configuration
//!
//! - **server_url**: Base URL of the runtime group API (or `KONNECT_SERVER_URL`)
//! - **token**: Bearer token, a JWT (or `KONNECT_TOKEN`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod konnect;
pub mod logging;
pub mod provider;
pub mod runtime_group;
pub mod schema;
pub mod testing;
pub mod token;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::RuntimeGroupClient;
pub use config::ProviderConfig;
pub use error::{ClientError, ClientErrorKind, ProviderError};
pub use http::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use konnect::KonnectProvider;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::ProviderService;
pub use schema::ProviderSchema;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
