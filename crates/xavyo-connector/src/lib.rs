//! # Connector Framework
//!
//! Core abstractions for connecting xavyo to external identity systems.
//!
//! ## Architecture
//!
//! The framework uses a capability-based trait system inspired by `ConnId`:
//!
//! - [`Connector`] - Base trait all connectors implement
//! - [`PoolableConnector`] - Liveness checks for pooled instances
//! - [`SchemaDiscovery`] - Discover target system schema
//! - [`SearchOp`] - Search and retrieve objects
//!
//! Searching is driven by a [`FilterTranslator`], which converts a framework
//! [`Filter`] into the connector's native query type.
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_connector::prelude::*;
//!
//! connector.test_connection().await?;
//!
//! let filter = Filter::eq("surname", "Rossi");
//! let mut names = Vec::new();
//! connector
//!     .search(ACCOUNT_OBJECT_CLASS, Some(&filter), &mut |object: ConnectorObject| {
//!         names.push(object.name);
//!         true
//!     })
//!     .await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`types`] - Connector type enum
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Connector capability traits
//! - [`filter`] - Filter translation driver
//! - [`schema`] - Schema types (`ObjectClass`, `SchemaAttribute`)
//! - [`operation`] - Operation types (Uid, `AttributeSet`, Filter)
//! - [`config`] - Configuration trait

pub mod config;
pub mod error;
pub mod filter;
pub mod operation;
pub mod schema;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```
/// use xavyo_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::types::ConnectorType;

    // Error handling
    pub use crate::error::{ConnectorError, ConnectorResult};

    // Traits
    pub use crate::filter::FilterTranslator;
    pub use crate::traits::{Connector, PoolableConnector, SchemaDiscovery, SearchOp};

    // Schema
    pub use crate::schema::{AttributeDataType, IdentifierType, ObjectClass, Schema, SchemaAttribute};

    // Operations
    pub use crate::operation::{
        AttributeSet, AttributeValue, ConnectorObject, ConnectorObjectBuilder, Filter,
        ResultsHandler, Uid, ACCOUNT_OBJECT_CLASS, NAME_ATTRIBUTE, UID_ATTRIBUTE,
    };

    // Configuration
    pub use crate::config::ConnectorConfig;
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
