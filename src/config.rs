//! Provider configuration.
//!
//! Values come from the provider block of the user's configuration; any
//! value left unset falls back to an environment variable.

use std::fmt;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable consulted when `server_url` is not configured.
pub const SERVER_URL_ENV: &str = "KONNECT_SERVER_URL";

/// Environment variable consulted when `token` is not configured.
pub const TOKEN_ENV: &str = "KONNECT_TOKEN";

/// Provider configuration as written by the user.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the runtime group API.
    pub server_url: Option<String>,
    /// Bearer token (a JWT) for the runtime group API.
    pub token: Option<String>,
}

/// Provider configuration with every value present.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Base URL of the runtime group API.
    pub server_url: String,
    /// Bearer token for the runtime group API.
    pub token: String,
}

impl ProviderConfig {
    /// The provider configuration schema.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "server_url",
                Attribute::optional_string().with_description(format!(
                    "Base URL of the Konnect runtime group API. May also be set with {}.",
                    SERVER_URL_ENV
                )),
            )
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!(
                        "Bearer token used to authenticate. May also be set with {}.",
                        TOKEN_ENV
                    )),
            )
    }

    /// Parse the provider configuration block. A null block is an empty config.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Fill unset values from the process environment.
    pub fn resolve(self) -> Result<ResolvedConfig, Vec<Diagnostic>> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Fill unset values using `lookup` for environment variables.
    ///
    /// Empty strings count as unset.
    pub fn resolve_with<F>(self, lookup: F) -> Result<ResolvedConfig, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url = non_empty(self.server_url).or_else(|| non_empty(lookup(SERVER_URL_ENV)));
        let token = non_empty(self.token).or_else(|| non_empty(lookup(TOKEN_ENV)));

        match (server_url, token) {
            (Some(server_url), Some(token)) => Ok(ResolvedConfig { server_url, token }),
            (server_url, token) => {
                let mut diagnostics = Vec::new();
                if server_url.is_none() {
                    diagnostics.push(missing("server_url", SERVER_URL_ENV));
                }
                if token.is_none() {
                    diagnostics.push(missing("token", TOKEN_ENV));
                }
                Err(diagnostics)
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn missing(attribute: &str, env: &str) -> Diagnostic {
    Diagnostic::error(format!("Missing provider attribute '{}'", attribute))
        .with_detail(format!(
            "Set '{}' in the provider configuration or the {} environment variable",
            attribute, env
        ))
        .with_attribute(attribute)
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("server_url", &self.server_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("server_url", &self.server_url)
            .field("token", &"<redacted>")
            .finish()
    }
}
