//! SOAP transport
//!
//! A [`TransportManager`] owns at most one shared [`TransportBus`] at a
//! time. The bus is created lazily by the first [`TransportManager::open`]
//! that resolves a service, reused by every later open and torn down only by
//! [`TransportManager::shutdown_bus`]. Creation, teardown and reads of the
//! bus slot all go through the manager's lock.
//!
//! Each session gets its own [`Conduit`]: the endpoint, an HTTP client from
//! the bus pool, the [`HttpClientPolicy`] timeouts and the outbound
//! interceptors.

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, instrument, trace};
use url::Url;
use uuid::Uuid;
use xavyo_connector::config::ConnectorConfig;
use xavyo_connector::error::{ConnectorError, ConnectorResult};

use crate::config::{WebServiceConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_RECEIVE_TIMEOUT_SECS};
use crate::service::{ServiceBinding, ServiceRegistry};
use crate::session::Session;
use crate::soap::{BindingOperationInfo, OutInterceptor, SoapActionInterceptor, SoapMessage, SoapVersion};

/// Identifier of a transport bus instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(Uuid);

impl BusId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared transport bus.
///
/// Pools HTTP clients by connection timeout, so conduits with the same
/// connect deadline share one connection pool.
pub struct TransportBus {
    id: BusId,
    created_at: DateTime<Utc>,
    clients: Mutex<HashMap<u64, Client>>,
    shut_down: AtomicBool,
}

impl fmt::Debug for TransportBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportBus")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl TransportBus {
    fn new() -> Self {
        Self {
            id: BusId::new(),
            created_at: Utc::now(),
            clients: Mutex::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Number of pooled HTTP clients.
    pub fn pooled_clients(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Get the pooled client for a connection timeout, building it on first use.
    fn client(&self, connection_timeout_ms: u64) -> ConnectorResult<Client> {
        if self.is_shut_down() {
            return Err(ConnectorError::service_unusable(format!(
                "transport bus {} has been shut down",
                self.id
            )));
        }

        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&connection_timeout_ms) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder();
        if connection_timeout_ms > 0 {
            builder = builder.connect_timeout(Duration::from_millis(connection_timeout_ms));
        }
        let client = builder.build().map_err(|e| {
            ConnectorError::connection_failed_with_source("failed to build HTTP client", e)
        })?;

        trace!(bus_id = %self.id, connection_timeout_ms, "Pooled new HTTP client");
        clients.insert(connection_timeout_ms, client.clone());
        Ok(client)
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Connection and receive timeouts of a conduit, in milliseconds.
///
/// Zero means no deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpClientPolicy {
    pub connection_timeout_ms: u64,
    pub receive_timeout_ms: u64,
}

impl Default for HttpClientPolicy {
    fn default() -> Self {
        Self {
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_SECS * 1000,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_SECS * 1000,
        }
    }
}

impl HttpClientPolicy {
    /// Build a policy from timeouts in seconds.
    pub fn from_secs(connection_timeout: u64, receive_timeout: u64) -> ConnectorResult<Self> {
        let to_ms = |secs: u64, what: &str| {
            secs.checked_mul(1000).ok_or_else(|| {
                ConnectorError::invalid_configuration(format!("{what} of {secs}s is out of range"))
            })
        };

        Ok(Self {
            connection_timeout_ms: to_ms(connection_timeout, "connection timeout")?,
            receive_timeout_ms: to_ms(receive_timeout, "receive timeout")?,
        })
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        (self.receive_timeout_ms > 0).then(|| Duration::from_millis(self.receive_timeout_ms))
    }

    /// Seconds of the deadline that expired: connect or receive.
    fn expired_timeout_secs(&self, during_connect: bool) -> u64 {
        let ms = if during_connect {
            self.connection_timeout_ms
        } else {
            self.receive_timeout_ms
        };
        ms / 1000
    }
}

/// Raw HTTP response of a SOAP call.
#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub status: u16,
    pub body: String,
}

/// Per-session channel to one endpoint.
pub struct Conduit {
    endpoint: Url,
    version: SoapVersion,
    client: Client,
    policy: HttpClientPolicy,
    interceptors: Vec<Arc<dyn OutInterceptor>>,
}

impl fmt::Debug for Conduit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conduit")
            .field("endpoint", &self.endpoint.as_str())
            .field("version", &self.version)
            .field("policy", &self.policy)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl Conduit {
    /// Create a conduit with the default policy and no interceptors.
    pub fn new(bus: &TransportBus, endpoint: Url, version: SoapVersion) -> ConnectorResult<Self> {
        let policy = HttpClientPolicy::default();
        Ok(Self {
            client: bus.client(policy.connection_timeout_ms)?,
            endpoint,
            version,
            policy,
            interceptors: Vec::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn version(&self) -> SoapVersion {
        self.version
    }

    pub fn policy(&self) -> HttpClientPolicy {
        self.policy
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Apply a timeout policy, switching to the bus client for its connect deadline.
    pub fn apply_policy(&mut self, bus: &TransportBus, policy: HttpClientPolicy) -> ConnectorResult<()> {
        self.client = bus.client(policy.connection_timeout_ms)?;
        self.policy = policy;
        Ok(())
    }

    pub fn add_out_interceptor(&mut self, interceptor: Arc<dyn OutInterceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Send a request envelope for `operation` and return the raw response.
    ///
    /// Interceptors run in registration order before the request is sent.
    pub async fn invoke(
        &self,
        operation: BindingOperationInfo,
        envelope: String,
    ) -> ConnectorResult<SoapResponse> {
        let mut message = SoapMessage::new(self.version, envelope).with_binding_operation(operation);
        for interceptor in &self.interceptors {
            interceptor.handle_message(&mut message);
        }

        debug!(
            endpoint = %self.endpoint,
            operation = message.binding_operation.as_ref().map(BindingOperationInfo::name),
            content_type = %message.content_type,
            "Sending SOAP request"
        );

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .headers(message.headers)
            .header(CONTENT_TYPE, message.content_type)
            .body(message.body);
        if let Some(timeout) = self.policy.receive_timeout() {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| self.request_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.request_error(e))?;

        debug!(endpoint = %self.endpoint, status = %status, "Received SOAP response");

        Ok(SoapResponse {
            status: status.as_u16(),
            body,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> ConnectorError {
        if e.is_timeout() {
            ConnectorError::ConnectionTimeout {
                timeout_secs: self.policy.expired_timeout_secs(e.is_connect()),
            }
        } else if e.is_connect() {
            ConnectorError::connection_failed_with_source(
                format!("failed to connect to {}", self.endpoint),
                e,
            )
        } else {
            ConnectorError::network_with_source(format!("request to {} failed", self.endpoint), e)
        }
    }
}

/// Owner of the shared transport bus and the service registry.
pub struct TransportManager {
    bus: Mutex<Option<Arc<TransportBus>>>,
    buses_created: AtomicUsize,
    registry: ServiceRegistry,
}

impl fmt::Debug for TransportManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportManager")
            .field("bus", &self.current_bus())
            .field("buses_created", &self.buses_created())
            .field("registry", &self.registry)
            .finish()
    }
}

impl Default for TransportManager {
    fn default() -> Self {
        Self::new(ServiceRegistry::with_defaults())
    }
}

impl TransportManager {
    pub fn new(registry: ServiceRegistry) -> Self {
        Self {
            bus: Mutex::new(None),
            buses_created: AtomicUsize::new(0),
            registry,
        }
    }

    /// Process-wide manager with the default service registry.
    pub fn global() -> Arc<TransportManager> {
        static GLOBAL: OnceLock<Arc<TransportManager>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(TransportManager::default())).clone()
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// The live bus, if one exists.
    pub fn current_bus(&self) -> Option<Arc<TransportBus>> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of buses created over the manager's lifetime.
    pub fn buses_created(&self) -> usize {
        self.buses_created.load(Ordering::SeqCst)
    }

    /// Return the live bus, creating one if the slot is empty.
    fn acquire_bus(&self, slot: &mut Option<Arc<TransportBus>>) -> Arc<TransportBus> {
        if let Some(bus) = slot.as_ref() {
            return Arc::clone(bus);
        }

        let bus = Arc::new(TransportBus::new());
        self.buses_created.fetch_add(1, Ordering::SeqCst);
        info!(bus_id = %bus.id(), "Created transport bus");
        *slot = Some(Arc::clone(&bus));
        bus
    }

    /// Shut down the shared bus. The next [`open`](Self::open) creates a new one.
    ///
    /// Sessions still holding the old bus are not notified.
    pub fn shutdown_bus(&self) {
        let mut slot = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bus) = slot.take() {
            bus.shutdown();
            info!(bus_id = %bus.id(), "Shut down transport bus");
        }
    }

    /// Open a session for a configuration.
    ///
    /// Configuration errors are returned. An unknown service, or an HTTP
    /// client that cannot be built, yields a session without a client.
    /// Failures while applying timeouts or interceptors are logged and leave
    /// the conduit on its defaults.
    #[instrument(skip(self, config), fields(endpoint = %config.endpoint, service = %config.service_name))]
    pub fn open(&self, config: &WebServiceConfig) -> ConnectorResult<Session> {
        config.validate()?;
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ConnectorError::invalid_configuration(format!("the specified endpoint is not a valid URL: {e}"))
        })?;

        let Some(contract) = self.registry.resolve(&config.service_name) else {
            let err = ConnectorError::ServiceResolutionFailed {
                service_name: config.service_name.clone(),
            };
            error!(error = %err, "Provisioning service not found");
            return Ok(Session::unusable());
        };

        // The bus cannot be shut down while its clients are checked out.
        let (bus, conduit) = {
            let mut slot = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
            let bus = self.acquire_bus(&mut slot);
            let mut conduit = match Conduit::new(&bus, endpoint, contract.version()) {
                Ok(conduit) => conduit,
                Err(e) => {
                    error!(error = %e, "Failed to create conduit");
                    return Ok(Session::unusable());
                }
            };
            if let Err(e) = Self::wire(&mut conduit, &bus, config) {
                error!(error = %e, "Failed to configure conduit, continuing with defaults");
            }
            (bus, conduit)
        };

        debug!(bus_id = %bus.id(), conduit = ?conduit, "Opened session");
        let service = contract.create(ServiceBinding {
            conduit: Arc::new(conduit),
        });

        Ok(Session::new(bus, service))
    }

    fn wire(conduit: &mut Conduit, bus: &TransportBus, config: &WebServiceConfig) -> ConnectorResult<()> {
        let policy = HttpClientPolicy::from_secs(
            config.connection_timeout_secs()?,
            config.receive_timeout_secs()?,
        )?;
        conduit.apply_policy(bus, policy)?;
        conduit.add_out_interceptor(Arc::new(SoapActionInterceptor::new(
            config.soap_action_uri_prefix.as_deref(),
        )));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WebServiceConfig {
        WebServiceConfig::new("http://localhost:8080/services/users", "UserService")
    }

    #[test]
    fn test_policy_from_secs() {
        let policy = HttpClientPolicy::from_secs(30, 60).unwrap();
        assert_eq!(policy.connection_timeout_ms, 30_000);
        assert_eq!(policy.receive_timeout_ms, 60_000);
        assert_eq!(policy, HttpClientPolicy::default());
        assert_eq!(policy.receive_timeout(), Some(Duration::from_secs(60)));

        assert!(HttpClientPolicy::from_secs(u64::MAX, 60).is_err());
        assert_eq!(HttpClientPolicy::from_secs(0, 0).unwrap().receive_timeout(), None);
    }

    #[test]
    fn test_expired_timeout_matches_phase() {
        let policy = HttpClientPolicy::from_secs(5, 20).unwrap();
        assert_eq!(policy.expired_timeout_secs(true), 5);
        assert_eq!(policy.expired_timeout_secs(false), 20);
    }

    #[test]
    fn test_open_creates_bus_once() {
        let manager = TransportManager::default();
        assert!(manager.current_bus().is_none());

        let first = manager.open(&config()).unwrap();
        let second = manager.open(&config().with_receive_timeout("5")).unwrap();

        assert_eq!(manager.buses_created(), 1);
        let bus = manager.current_bus().unwrap();
        assert_eq!(first.bus().map(|b| b.id()), Some(bus.id()));
        assert_eq!(second.bus().map(|b| b.id()), Some(bus.id()));
    }

    #[test]
    fn test_bus_pools_clients_by_connection_timeout() {
        let manager = TransportManager::default();
        manager.open(&config()).unwrap();
        manager.open(&config().with_receive_timeout("5")).unwrap();
        let bus = manager.current_bus().unwrap();
        assert_eq!(bus.pooled_clients(), 1);

        manager.open(&config().with_connection_timeout("3")).unwrap();
        assert_eq!(bus.pooled_clients(), 2);
    }

    #[test]
    fn test_shutdown_and_recreate() {
        let manager = TransportManager::default();
        let session = manager.open(&config()).unwrap();
        let old = manager.current_bus().unwrap();

        manager.shutdown_bus();
        assert!(manager.current_bus().is_none());
        assert!(old.is_shut_down());
        assert_eq!(old.pooled_clients(), 0);
        assert!(session.bus().is_some_and(|b| b.is_shut_down()));

        manager.open(&config()).unwrap();
        let new = manager.current_bus().unwrap();
        assert_ne!(new.id(), old.id());
        assert_eq!(manager.buses_created(), 2);

        // No bus: a second shutdown is a no-op.
        manager.shutdown_bus();
        manager.shutdown_bus();
        assert!(manager.current_bus().is_none());
    }

    #[test]
    fn test_open_succeeds_under_concurrent_shutdown() {
        let manager = Arc::new(TransportManager::default());
        let config = WebServiceConfig::new("http://localhost/ws", "InMemoryUserService");

        for _ in 0..100 {
            let stopper = {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        manager.shutdown_bus();
                    }
                })
            };
            let openers: Vec<_> = (0..5)
                .map(|_| {
                    let manager = Arc::clone(&manager);
                    let config = config.clone();
                    std::thread::spawn(move || manager.open(&config).map(|s| s.is_usable()))
                })
                .collect();

            for opener in openers {
                let opened = opener.join().unwrap();
                assert!(matches!(opened, Ok(true)), "open failed: {opened:?}");
            }
            stopper.join().unwrap();
        }
    }

    #[test]
    fn test_unknown_service_yields_unusable_session_without_bus() {
        let manager = TransportManager::default();
        let session = manager
            .open(&WebServiceConfig::new("http://localhost/ws", "com.example.Missing"))
            .unwrap();

        assert!(!session.is_usable());
        assert!(session.test().is_err());
        assert!(manager.current_bus().is_none());
        assert_eq!(manager.buses_created(), 0);
    }

    #[test]
    fn test_invalid_configuration_is_returned() {
        let manager = TransportManager::default();
        let err = manager
            .open(&config().with_connection_timeout("abc"))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidConfiguration { .. }));
        assert!(manager.current_bus().is_none());
    }

    #[test]
    fn test_wiring_failure_degrades_conduit() {
        let bus = TransportBus::new();
        let url = Url::parse("http://localhost/ws").unwrap();
        let mut conduit = Conduit::new(&bus, url, SoapVersion::V11).unwrap();

        let overflow = config().with_connection_timeout(u64::MAX.to_string());
        assert!(TransportManager::wire(&mut conduit, &bus, &overflow).is_err());
        assert_eq!(conduit.policy(), HttpClientPolicy::default());
        assert_eq!(conduit.interceptor_count(), 0);

        let short = config().with_receive_timeout("5");
        assert!(TransportManager::wire(&mut conduit, &bus, &short).is_ok());
        assert_eq!(conduit.policy().receive_timeout_ms, 5_000);
        assert_eq!(conduit.interceptor_count(), 1);
    }

    #[test]
    fn test_shut_down_bus_refuses_new_clients() {
        let bus = TransportBus::new();
        bus.shutdown();
        let url = Url::parse("http://localhost/ws").unwrap();
        let err = Conduit::new(&bus, url, SoapVersion::V11).unwrap_err();
        assert!(matches!(err, ConnectorError::ServiceUnusable { .. }));
    }
}
