//! Connector Framework configuration trait

use serde::{de::DeserializeOwned, Serialize};

use crate::error::ConnectorResult;
use crate::types::ConnectorType;

/// Trait for connector-specific configuration.
///
/// Each connector type implements this trait to define its configuration
/// schema and validation rules.
pub trait ConnectorConfig: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Get the connector type this configuration is for.
    fn connector_type() -> ConnectorType;

    /// Validate the configuration.
    ///
    /// Returns an error if the configuration is invalid.
    fn validate(&self) -> ConnectorResult<()>;
}
