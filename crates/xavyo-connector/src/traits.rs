//! Connector Framework traits
//!
//! Capability-based trait definitions for connectors, inspired by `ConnId`.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ConnectorResult;
use crate::filter::FilterTranslator;
use crate::operation::{ConnectorObject, Filter, ResultsHandler};
use crate::schema::Schema;
use crate::types::ConnectorType;

/// Base trait for all connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Get the type of this connector.
    fn connector_type(&self) -> ConnectorType;

    /// Get the display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the target system.
    ///
    /// Returns `Ok(())` if the connector is usable, or an error describing
    /// what went wrong.
    async fn test_connection(&self) -> ConnectorResult<()>;

    /// Dispose of connector resources.
    async fn dispose(&self) -> ConnectorResult<()>;

    /// Check if the connector is currently healthy.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Capability for connectors kept in a pool between operations.
#[async_trait]
pub trait PoolableConnector: Connector {
    /// Check that a pooled instance is still alive before it is handed out.
    async fn check_alive(&self) -> ConnectorResult<()>;
}

/// Capability for discovering the schema of a target system.
#[async_trait]
pub trait SchemaDiscovery: Connector {
    /// Discover the schema from the target system.
    async fn discover_schema(&self) -> ConnectorResult<Schema>;

    /// Check if a specific object class exists in the target system.
    async fn has_object_class(&self, object_class: &str) -> ConnectorResult<bool> {
        let schema = self.discover_schema().await?;
        Ok(schema.has_object_class(object_class))
    }
}

/// Capability for searching objects in the target system.
///
/// Searching happens in two steps: the framework asks the connector for a
/// [`FilterTranslator`] that converts the abstract filter into the
/// connector's native [`SearchOp::Query`], then executes that query. The
/// connector may apply the query only partially (or not at all); results are
/// always re-filtered by [`SearchOp::search`] before reaching the caller.
#[async_trait]
pub trait SearchOp: Connector {
    /// Native query representation produced by the filter translator.
    type Query: Send + Sync;

    /// Create a filter translator for the given object class.
    fn create_filter_translator(
        &self,
        object_class: &str,
    ) -> ConnectorResult<Box<dyn FilterTranslator<Self::Query> + Send + Sync>>;

    /// Execute a native query, streaming results into `handler`.
    ///
    /// Implementations must stop as soon as the handler returns `false`.
    async fn execute_query(
        &self,
        object_class: &str,
        query: Option<&Self::Query>,
        handler: &mut (dyn ResultsHandler + Send),
    ) -> ConnectorResult<()>;

    /// Search with a framework filter.
    ///
    /// Translates the filter, executes the translated query and forwards to
    /// `handler` only those objects that match `filter`.
    async fn search(
        &self,
        object_class: &str,
        filter: Option<&Filter>,
        handler: &mut (dyn ResultsHandler + Send),
    ) -> ConnectorResult<()> {
        let query = match filter {
            Some(f) => {
                let query = self.create_filter_translator(object_class)?.translate(f);
                if query.is_none() {
                    debug!(object_class, "Filter not translatable, filtering client-side only");
                }
                query
            }
            None => None,
        };

        let mut filtered = |object: ConnectorObject| {
            if filter.map_or(true, |f| f.matches(&object)) {
                handler.handle(object)
            } else {
                true
            }
        };

        self.execute_query(object_class, query.as_ref(), &mut filtered)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;
    use crate::operation::ACCOUNT_OBJECT_CLASS;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct EqualsOnly;

    impl FilterTranslator<String> for EqualsOnly {
        fn create_equals_expression(&self, attribute: &str, value: &str, _not: bool) -> Option<String> {
            Some(format!("{attribute}={value}"))
        }
    }

    // Mock connector serving a fixed list of accounts
    struct MockConnector {
        names: Vec<&'static str>,
        healthy: AtomicBool,
    }

    impl MockConnector {
        fn new(names: Vec<&'static str>) -> Self {
            Self {
                names,
                healthy: AtomicBool::new(true),
            }
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        fn connector_type(&self) -> ConnectorType {
            ConnectorType::Soap
        }

        fn display_name(&self) -> &str {
            "mock"
        }

        async fn test_connection(&self) -> ConnectorResult<()> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(ConnectorError::service_unusable("not healthy"))
            }
        }

        async fn dispose(&self) -> ConnectorResult<()> {
            Ok(())
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchOp for MockConnector {
        type Query = String;

        fn create_filter_translator(
            &self,
            _object_class: &str,
        ) -> ConnectorResult<Box<dyn FilterTranslator<String> + Send + Sync>> {
            Ok(Box::new(EqualsOnly))
        }

        async fn execute_query(
            &self,
            object_class: &str,
            _query: Option<&String>,
            handler: &mut (dyn ResultsHandler + Send),
        ) -> ConnectorResult<()> {
            for name in &self.names {
                let object = ConnectorObject::builder(object_class)
                    .uid(*name)
                    .name(*name)
                    .build()?;
                if !handler.handle(object) {
                    break;
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_mock_connector() {
        let connector = MockConnector::new(vec!["MR"]);
        assert_eq!(connector.connector_type(), ConnectorType::Soap);
        assert!(connector.is_healthy());
        assert!(connector.test_connection().await.is_ok());

        connector.healthy.store(false, Ordering::SeqCst);
        assert!(connector.test_connection().await.is_err());
    }

    #[tokio::test]
    async fn test_search_reapplies_filter() {
        let connector = MockConnector::new(vec!["MR", "FB", "GV"]);
        let filter = Filter::eq("__NAME__", "FB");

        let mut found = Vec::new();
        let mut handler = |object: ConnectorObject| {
            found.push(object.name);
            true
        };
        connector
            .search(ACCOUNT_OBJECT_CLASS, Some(&filter), &mut handler)
            .await
            .unwrap();

        assert_eq!(found, vec!["FB".to_string()]);
    }

    #[tokio::test]
    async fn test_search_without_filter_respects_handler_stop() {
        let connector = MockConnector::new(vec!["MR", "FB", "GV"]);

        let mut count = 0;
        let mut handler = |_object: ConnectorObject| {
            count += 1;
            count < 2
        };
        connector
            .search(ACCOUNT_OBJECT_CLASS, None, &mut handler)
            .await
            .unwrap();

        assert_eq!(count, 2);
    }
}
