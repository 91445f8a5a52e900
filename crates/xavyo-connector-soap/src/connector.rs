//! SOAP Connector implementation
//!
//! Implements the Connector traits on top of a [`Session`].

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, trace};

use xavyo_connector::error::{ConnectorError, ConnectorResult};
use xavyo_connector::filter::FilterTranslator;
use xavyo_connector::operation::{ConnectorObject, ResultsHandler, ACCOUNT_OBJECT_CLASS};
use xavyo_connector::schema::{AttributeDataType, ObjectClass, Schema, SchemaAttribute};
use xavyo_connector::traits::{Connector, PoolableConnector, SchemaDiscovery, SearchOp};
use xavyo_connector::types::ConnectorType;

use crate::config::WebServiceConfig;
use crate::operand::Operand;
use crate::service::{User, UserService};
use crate::session::Session;
use crate::transport::TransportManager;
use crate::translator::WebServiceFilterTranslator;

/// SOAP Connector exposing the user directory as `__ACCOUNT__` objects.
pub struct SoapConnector {
    /// Configuration.
    config: WebServiceConfig,

    /// Display name for this connector instance.
    display_name: String,

    /// Shared transport, torn down on dispose.
    transport: Arc<TransportManager>,

    session: RwLock<Session>,
}

impl std::fmt::Debug for SoapConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoapConnector")
            .field("config", &self.config)
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl SoapConnector {
    /// Create a new SOAP connector, opening its session on `transport`.
    pub fn new(config: WebServiceConfig, transport: Arc<TransportManager>) -> ConnectorResult<Self> {
        debug!(endpoint = %config.endpoint, "Connector initialization");
        let session = transport.open(&config)?;
        let display_name = format!("SOAP: {} ({})", config.endpoint, config.service_name);

        Ok(Self {
            config,
            display_name,
            transport,
            session: RwLock::new(session),
        })
    }

    pub fn config(&self) -> &WebServiceConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<TransportManager> {
        &self.transport
    }

    fn check_object_class(object_class: &str) -> ConnectorResult<()> {
        if object_class != ACCOUNT_OBJECT_CLASS {
            return Err(ConnectorError::InvalidObjectClass {
                object_class: object_class.to_string(),
            });
        }
        Ok(())
    }

    async fn user_service(&self) -> ConnectorResult<Arc<dyn UserService>> {
        self.session
            .read()
            .await
            .user_service()
            .ok_or_else(|| ConnectorError::service_unusable("web service client not found"))
    }

    fn build_connector_object(user: &User) -> ConnectorResult<ConnectorObject> {
        ConnectorObject::builder(ACCOUNT_OBJECT_CLASS)
            .uid(user.initials.as_str())
            .name(user.initials.as_str())
            .attribute("firstname", user.firstname.as_str())
            .attribute("surname", user.surname.as_str())
            .attribute("birthdate", user.birthdate.map(|b| b.to_rfc3339()))
            .build()
    }
}

#[async_trait]
impl Connector for SoapConnector {
    fn connector_type(&self) -> ConnectorType {
        ConnectorType::Soap
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        debug!("Connection test");
        self.session.read().await.test()
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        self.session.write().await.dispose();
        self.transport.shutdown_bus();

        info!(endpoint = %self.config.endpoint, "SOAP connector disposed");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.session
            .try_read()
            .map(|session| session.is_usable())
            .unwrap_or(false)
    }
}

#[async_trait]
impl PoolableConnector for SoapConnector {
    #[instrument(skip(self))]
    async fn check_alive(&self) -> ConnectorResult<()> {
        self.session.read().await.test()
    }
}

#[async_trait]
impl SchemaDiscovery for SoapConnector {
    #[instrument(skip(self))]
    async fn discover_schema(&self) -> ConnectorResult<Schema> {
        debug!("Schema retrieving");

        let account = ObjectClass::new(ACCOUNT_OBJECT_CLASS, "User")
            .with_display_name("Account")
            .with_attribute(
                SchemaAttribute::new("initials", "initials", AttributeDataType::String)
                    .required()
                    .primary_identifier(),
            )
            .with_attribute(SchemaAttribute::new(
                "firstname",
                "firstname",
                AttributeDataType::String,
            ))
            .with_attribute(SchemaAttribute::new(
                "surname",
                "surname",
                AttributeDataType::String,
            ))
            .with_attribute(SchemaAttribute::new(
                "birthdate",
                "birthdate",
                AttributeDataType::String,
            ));

        Ok(Schema::with_object_classes(vec![account]))
    }
}

#[async_trait]
impl SearchOp for SoapConnector {
    type Query = Operand;

    fn create_filter_translator(
        &self,
        object_class: &str,
    ) -> ConnectorResult<Box<dyn FilterTranslator<Operand> + Send + Sync>> {
        Self::check_object_class(object_class)?;
        Ok(Box::new(WebServiceFilterTranslator::new()))
    }

    /// Fetch every user and stream them to `handler`.
    ///
    /// The query is logged but not pushed to the service.
    #[instrument(skip(self, query, handler))]
    async fn execute_query(
        &self,
        object_class: &str,
        query: Option<&Operand>,
        handler: &mut (dyn ResultsHandler + Send),
    ) -> ConnectorResult<()> {
        match query {
            Some(query) => debug!(query = %query, "Execute query"),
            None => debug!("Execute query without filter"),
        }

        Self::check_object_class(object_class)?;
        let service = self.user_service().await?;

        let users = service
            .get_users()
            .await
            .map_err(|e| {
                if e.is_transient() {
                    e
                } else {
                    ConnectorError::operation_failed_with_source("failed to list users", e)
                }
            })?;

        for user in users {
            debug!(user = %user, "Found user");

            let object = match Self::build_connector_object(&user) {
                Ok(object) => object,
                Err(e) => {
                    error!(user = %user, error = %e, "Error building connector object");
                    continue;
                }
            };

            let handle = handler.handle(object);
            trace!(handle, "Handled");
            if !handle {
                break;
            }
        }

        Ok(())
    }
}
