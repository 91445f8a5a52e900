//! SOAP Connector configuration
//!
//! Configuration for a SOAP web service endpoint.

use serde::{Deserialize, Serialize};
use xavyo_connector::config::ConnectorConfig;
use xavyo_connector::error::{ConnectorError, ConnectorResult};
use xavyo_connector::types::ConnectorType;

/// Connection timeout applied when the configured value is blank.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Receive timeout applied when the configured value is blank.
pub const DEFAULT_RECEIVE_TIMEOUT_SECS: u64 = 60;

/// Configuration for the SOAP connector.
///
/// Timeouts are kept as strings because hosts supply them as free-form
/// properties; a blank value falls back to the default and anything that is
/// not an unsigned integer fails validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebServiceConfig {
    /// Web service endpoint (e.g., "https://directory.example.com/services/users").
    pub endpoint: String,

    /// Identifier of the service contract exposed by the endpoint.
    pub service_name: String,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: String,

    /// Receive timeout in seconds.
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout: String,

    /// Prefix prepended to each operation's SOAP action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soap_action_uri_prefix: Option<String>,
}

fn default_connection_timeout() -> String {
    DEFAULT_CONNECTION_TIMEOUT_SECS.to_string()
}

fn default_receive_timeout() -> String {
    DEFAULT_RECEIVE_TIMEOUT_SECS.to_string()
}

impl WebServiceConfig {
    /// Create a new config with required fields.
    pub fn new(endpoint: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            service_name: service_name.into(),
            connection_timeout: default_connection_timeout(),
            receive_timeout: default_receive_timeout(),
            soap_action_uri_prefix: None,
        }
    }

    /// Set the connection timeout (seconds, as supplied by the host).
    pub fn with_connection_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.connection_timeout = timeout.into();
        self
    }

    /// Set the receive timeout (seconds, as supplied by the host).
    pub fn with_receive_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.receive_timeout = timeout.into();
        self
    }

    /// Set the SOAP action URI prefix.
    pub fn with_soap_action_uri_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.soap_action_uri_prefix = Some(prefix.into());
        self
    }

    /// Effective connection timeout in seconds.
    pub fn connection_timeout_secs(&self) -> ConnectorResult<u64> {
        parse_timeout(
            &self.connection_timeout,
            DEFAULT_CONNECTION_TIMEOUT_SECS,
            "connection timeout",
        )
    }

    /// Effective receive timeout in seconds.
    pub fn receive_timeout_secs(&self) -> ConnectorResult<u64> {
        parse_timeout(
            &self.receive_timeout,
            DEFAULT_RECEIVE_TIMEOUT_SECS,
            "receive timeout",
        )
    }
}

fn parse_timeout(raw: &str, default: u64, what: &str) -> ConnectorResult<u64> {
    if raw.trim().is_empty() {
        return Ok(default);
    }
    raw.parse::<u64>()
        .map_err(|_| ConnectorError::invalid_configuration(format!("the specified {what} is not valid")))
}

impl ConnectorConfig for WebServiceConfig {
    fn connector_type() -> ConnectorType {
        ConnectorType::Soap
    }

    fn validate(&self) -> ConnectorResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "endpoint cannot be null or empty",
            ));
        }

        if self.service_name.trim().is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "service name cannot be null or empty",
            ));
        }

        self.connection_timeout_secs()?;
        self.receive_timeout_secs()?;

        let url = url::Url::parse(&self.endpoint).map_err(|e| {
            ConnectorError::invalid_configuration(format!(
                "the specified endpoint is not a valid URL: {e}"
            ))
        })?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConnectorError::invalid_configuration(format!(
                    "unsupported endpoint scheme: {scheme}"
                )));
            }
        }

        if url.host_str().is_none() {
            return Err(ConnectorError::invalid_configuration(
                "the specified endpoint has no host",
            ));
        }

        Ok(())
    }
}
