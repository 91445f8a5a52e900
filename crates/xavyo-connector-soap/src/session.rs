//! Connector session
//!
//! Opened by [`crate::transport::TransportManager::open`].

use std::fmt;
use std::sync::Arc;
use xavyo_connector::error::{ConnectorError, ConnectorResult};

use crate::service::UserService;
use crate::transport::TransportBus;

/// The shared bus plus one configuration-bound service client.
///
/// A session without a client is unusable: [`Session::test`] fails and no
/// operation can be executed through it.
#[derive(Default)]
pub struct Session {
    bus: Option<Arc<TransportBus>>,
    service: Option<Arc<dyn UserService>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("bus", &self.bus.as_ref().map(|b| b.id()))
            .field("usable", &self.is_usable())
            .finish()
    }
}

impl Session {
    pub(crate) fn new(bus: Arc<TransportBus>, service: Arc<dyn UserService>) -> Self {
        Self {
            bus: Some(bus),
            service: Some(service),
        }
    }

    pub(crate) fn unusable() -> Self {
        Self::default()
    }

    pub fn bus(&self) -> Option<&Arc<TransportBus>> {
        self.bus.as_ref()
    }

    /// The service client, if one was resolved and not yet released.
    pub fn user_service(&self) -> Option<Arc<dyn UserService>> {
        self.service.clone()
    }

    pub fn is_usable(&self) -> bool {
        self.service.is_some()
    }

    /// Check that the session has a bound client. No request is sent.
    pub fn test(&self) -> ConnectorResult<()> {
        if self.service.is_none() {
            return Err(ConnectorError::service_unusable("service port not found"));
        }
        Ok(())
    }

    /// Release the service client. The shared bus is left running.
    pub fn dispose(&mut self) {
        self.service = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::InMemoryUserService;
    use crate::transport::TransportManager;
    use crate::config::WebServiceConfig;

    #[test]
    fn test_unusable_session() {
        let session = Session::unusable();
        assert!(!session.is_usable());
        assert!(session.bus().is_none());
        assert!(session.user_service().is_none());

        let err = session.test().unwrap_err();
        assert!(matches!(err, ConnectorError::ServiceUnusable { .. }));
    }

    #[test]
    fn test_dispose_releases_client_only() {
        let manager = TransportManager::default();
        let config = WebServiceConfig::new("http://localhost/ws", "InMemoryUserService");
        let mut session = manager.open(&config).unwrap();
        assert!(session.test().is_ok());

        session.dispose();

        assert!(session.test().is_err());
        assert!(session.user_service().is_none());
        assert!(manager.current_bus().is_some_and(|b| !b.is_shut_down()));
    }

    #[tokio::test]
    async fn test_user_service_is_shared() {
        let manager = TransportManager::default();
        let bus = {
            let session = manager
                .open(&WebServiceConfig::new("http://localhost/ws", "InMemoryUserService"))
                .unwrap();
            session.bus().cloned().unwrap()
        };

        let session = Session::new(bus, Arc::new(InMemoryUserService::new()));
        let service = session.user_service().unwrap();
        assert_eq!(service.get_users().await.unwrap().len(), 2);
    }
}
