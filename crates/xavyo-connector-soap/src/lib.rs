//! # SOAP Connector
//!
//! Web service connector for xavyo provisioning.
//!
//! This crate exposes a SOAP user directory as `__ACCOUNT__` objects. It
//! translates framework filters into an [`Operand`] tree, shares one
//! transport bus across connector instances, and forces a SOAP action onto
//! every outbound request.
//!
//! ## Features
//!
//! - SOAP 1.1 and 1.2 bindings
//! - Configurable connection and receive timeouts
//! - SOAP action URI prefix
//! - Shared, lazily created transport bus
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_connector_soap::{SoapConnector, TransportManager, WebServiceConfig};
//! use xavyo_connector::prelude::*;
//!
//! let config = WebServiceConfig::new("http://localhost:8080/services/users", "UserService")
//!     .with_receive_timeout("10")
//!     .with_soap_action_uri_prefix("http://provisioningws.test.tirasa.net");
//!
//! let connector = SoapConnector::new(config, TransportManager::global())?;
//! connector.test_connection().await?;
//! ```

pub mod config;
pub mod connector;
pub mod operand;
pub mod service;
pub mod session;
pub mod soap;
pub mod translator;
pub mod transport;

// Re-exports
pub use config::WebServiceConfig;
pub use connector::SoapConnector;
pub use operand::{Comparison, ComparisonOperator, Composite, LogicalOperator, Operand};
pub use service::{
    InMemoryUserService, ServiceBinding, ServiceContract, ServiceRegistry, SoapUserService, User,
    UserService,
};
pub use session::Session;
pub use soap::{OutInterceptor, SoapActionInterceptor, SoapFault, SoapMessage, SoapVersion};
pub use translator::WebServiceFilterTranslator;
pub use transport::{BusId, Conduit, HttpClientPolicy, TransportBus, TransportManager};
