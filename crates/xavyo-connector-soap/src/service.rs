//! User directory service
//!
//! The [`UserService`] contract exposed by the remote directory, its SOAP
//! client proxy, an in-memory stand-in and the [`ServiceRegistry`] mapping
//! configured service names to client factories.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use xavyo_connector::error::{ConnectorError, ConnectorResult};

use crate::soap::{decode_response, encode_request, BindingOperationInfo, Record, SoapBody, SoapFault, SoapVersion};
use crate::transport::{Conduit, SoapResponse};

/// Target namespace of the provisioning web service.
pub const TARGET_NAMESPACE: &str = "http://provisioningws.test.tirasa.net/";

/// A user record of the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique key, also used as display name.
    pub initials: String,
    pub firstname: String,
    pub surname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        initials: impl Into<String>,
        firstname: impl Into<String>,
        surname: impl Into<String>,
    ) -> Self {
        Self {
            initials: initials.into(),
            firstname: firstname.into(),
            surname: surname.into(),
            birthdate: None,
        }
    }

    pub fn with_birthdate(mut self, birthdate: DateTime<Utc>) -> Self {
        self.birthdate = Some(birthdate);
        self
    }

    /// Build a user from a decoded response record.
    ///
    /// Missing text fields are empty. A birthdate that cannot be parsed is
    /// dropped with a warning.
    pub fn from_record(record: &Record) -> Self {
        let field = |name: &str| record.get(name).cloned().unwrap_or_default();
        let birthdate = record
            .get("birthdate")
            .filter(|b| !b.trim().is_empty())
            .and_then(|raw| {
                let parsed = parse_birthdate(raw);
                if parsed.is_none() {
                    warn!(birthdate = %raw, "Ignoring unparseable birthdate");
                }
                parsed
            });

        Self {
            initials: field("initials"),
            firstname: field("firstname"),
            surname: field("surname"),
            birthdate,
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.initials, self.firstname, self.surname)
    }
}

/// Parse an `xs:dateTime` or `xs:date`; values without an offset are UTC.
fn parse_birthdate(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Directory collaborator contract.
#[async_trait]
pub trait UserService: Send + Sync {
    /// List all users.
    async fn get_users(&self) -> ConnectorResult<Vec<User>>;

    /// Get one user; fails with [`ConnectorError::ObjectNotFound`] when absent.
    async fn get_user(&self, initials: &str) -> ConnectorResult<User>;
}

/// SOAP client proxy for the user service.
#[derive(Debug)]
pub struct SoapUserService {
    conduit: Arc<Conduit>,
}

impl SoapUserService {
    pub fn new(conduit: Arc<Conduit>) -> Self {
        Self { conduit }
    }

    pub fn conduit(&self) -> &Conduit {
        &self.conduit
    }

    async fn call(&self, operation: &str, params: &[(&str, &str)]) -> ConnectorResult<Vec<Record>> {
        let envelope = encode_request(self.conduit.version(), TARGET_NAMESPACE, operation, params);
        let binding = BindingOperationInfo::new(operation).with_soap_action(operation);
        let response = self.conduit.invoke(binding, envelope).await?;
        Self::records(operation, &response)
    }

    fn records(operation: &str, response: &SoapResponse) -> ConnectorResult<Vec<Record>> {
        let success = (200..300).contains(&response.status);
        match decode_response(&response.body) {
            Ok(SoapBody::Fault(fault)) => Err(Self::fault_error(operation, fault)),
            _ if !success => Err(ConnectorError::operation_failed(format!(
                "{operation} returned HTTP status {}",
                response.status
            ))),
            Ok(SoapBody::Records(records)) => Ok(records),
            Err(e) => Err(e),
        }
    }

    fn fault_error(operation: &str, fault: SoapFault) -> ConnectorError {
        if fault.is_not_found() {
            return ConnectorError::ObjectNotFound {
                identifier: fault.reason,
            };
        }
        ConnectorError::operation_failed_with_source(format!("{operation} failed"), fault)
    }
}

#[async_trait]
impl UserService for SoapUserService {
    async fn get_users(&self) -> ConnectorResult<Vec<User>> {
        let records = self.call("getUsers", &[]).await?;
        debug!(count = records.len(), "getUsers returned");
        Ok(records.iter().map(User::from_record).collect())
    }

    async fn get_user(&self, initials: &str) -> ConnectorResult<User> {
        let records = self.call("getUser", &[("initials", initials)]).await?;
        records
            .first()
            .map(User::from_record)
            .ok_or_else(|| ConnectorError::ObjectNotFound {
                identifier: initials.to_string(),
            })
    }
}

/// In-memory user directory.
#[derive(Debug, Clone)]
pub struct InMemoryUserService {
    users: BTreeMap<String, User>,
}

impl Default for InMemoryUserService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserService {
    /// Directory holding the two sample users.
    pub fn new() -> Self {
        let birthdate = |year, month, day| {
            NaiveDate::from_ymd_opt(year, month, day)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        };

        let mut mr = User::new("MR", "Mario", "Rossi");
        mr.birthdate = birthdate(1977, 9, 8);
        let mut fb = User::new("FB", "Filippo", "Bianchi");
        fb.birthdate = birthdate(1977, 7, 26);

        Self::with_users(vec![mr, fb])
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|u| (u.initials.clone(), u))
                .collect(),
        }
    }
}

#[async_trait]
impl UserService for InMemoryUserService {
    async fn get_users(&self) -> ConnectorResult<Vec<User>> {
        Ok(self.users.values().cloned().collect())
    }

    async fn get_user(&self, initials: &str) -> ConnectorResult<User> {
        self.users
            .get(initials)
            .cloned()
            .ok_or_else(|| ConnectorError::ObjectNotFound {
                identifier: format!("Could not find user with initial {initials}"),
            })
    }
}

/// What a service factory receives to build a client.
#[derive(Debug, Clone)]
pub struct ServiceBinding {
    pub conduit: Arc<Conduit>,
}

/// Builds a client for a resolved service.
pub type ServiceFactory = Arc<dyn Fn(ServiceBinding) -> Arc<dyn UserService> + Send + Sync>;

/// A registered service: its SOAP version and client factory.
#[derive(Clone)]
pub struct ServiceContract {
    version: SoapVersion,
    factory: ServiceFactory,
}

impl ServiceContract {
    pub fn version(&self) -> SoapVersion {
        self.version
    }

    pub fn create(&self, binding: ServiceBinding) -> Arc<dyn UserService> {
        (self.factory)(binding)
    }
}

impl fmt::Debug for ServiceContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContract")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Registry of service names the connector can resolve.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    contracts: HashMap<String, ServiceContract>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in services:
    ///
    /// - `UserService` (and its qualified name): SOAP 1.1 proxy
    /// - `UserServiceSoap12`: SOAP 1.2 proxy
    /// - `InMemoryUserService`: the sample directory, no remote calls
    pub fn with_defaults() -> Self {
        let soap = |binding: ServiceBinding| -> Arc<dyn UserService> {
            Arc::new(SoapUserService::new(binding.conduit))
        };

        Self::new()
            .with_service("UserService", SoapVersion::V11, soap)
            .with_service("net.tirasa.test.provisioningws.UserService", SoapVersion::V11, soap)
            .with_service("UserServiceSoap12", SoapVersion::V12, soap)
            .with_service("InMemoryUserService", SoapVersion::V11, |_| {
                Arc::new(InMemoryUserService::new())
            })
    }

    /// Register a service, replacing any previous one of the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, version: SoapVersion, factory: F)
    where
        F: Fn(ServiceBinding) -> Arc<dyn UserService> + Send + Sync + 'static,
    {
        self.contracts.insert(
            name.into(),
            ServiceContract {
                version,
                factory: Arc::new(factory),
            },
        );
    }

    /// Register a service using builder pattern.
    pub fn with_service<F>(mut self, name: impl Into<String>, version: SoapVersion, factory: F) -> Self
    where
        F: Fn(ServiceBinding) -> Arc<dyn UserService> + Send + Sync + 'static,
    {
        self.register(name, version, factory);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<&ServiceContract> {
        self.contracts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_from_record() {
        let record: Record = [
            ("initials", "MR"),
            ("firstname", "Mario"),
            ("surname", "Rossi"),
            ("birthdate", "1977-09-08T00:00:00+02:00"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let user = User::from_record(&record);
        assert_eq!(user.initials, "MR");
        assert_eq!(user.surname, "Rossi");
        assert_eq!(
            user.birthdate.map(|b| b.to_rfc3339()),
            Some("1977-09-07T22:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_parse_birthdate_formats() {
        assert!(parse_birthdate("1977-07-26").is_some());
        assert!(parse_birthdate("1977-07-26T10:30:00").is_some());
        assert!(parse_birthdate("1977-07-26T10:30:00.000Z").is_some());
        assert!(parse_birthdate("26/07/1977").is_none());

        let record: Record = [("initials", "FB"), ("birthdate", "yesterday")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let user = User::from_record(&record);
        assert!(user.birthdate.is_none());
        assert_eq!(user.firstname, "");
    }

    #[tokio::test]
    async fn test_in_memory_service() {
        let service = InMemoryUserService::new();

        let users = service.get_users().await.unwrap();
        assert_eq!(users.len(), 2);

        let mario = service.get_user("MR").await.unwrap();
        assert_eq!(mario.firstname, "Mario");
        assert_eq!(
            mario.birthdate.map(|b| b.to_rfc3339()),
            Some("1977-09-08T00:00:00+00:00".to_string())
        );

        let err = service.get_user("XX").await.unwrap_err();
        assert!(matches!(err, ConnectorError::ObjectNotFound { .. }));
    }

    #[test]
    fn test_registry_defaults() {
        let registry = ServiceRegistry::with_defaults();
        assert_eq!(
            registry.resolve("UserService").map(ServiceContract::version),
            Some(SoapVersion::V11)
        );
        assert_eq!(
            registry.resolve("UserServiceSoap12").map(ServiceContract::version),
            Some(SoapVersion::V12)
        );
        assert!(registry.contains("InMemoryUserService"));
        assert!(registry.resolve("com.example.Missing").is_none());
    }

    #[test]
    fn test_records_maps_faults_and_statuses() {
        let fault = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><soap:Fault><faultcode>soap:Server</faultcode><faultstring>Could not find user with initial XX</faultstring><detail><ns1:NotFoundException xmlns:ns1="urn:x"/></detail></soap:Fault></soap:Body></soap:Envelope>"#;
        let response = SoapResponse {
            status: 500,
            body: fault.to_string(),
        };
        let err = SoapUserService::records("getUser", &response).unwrap_err();
        assert!(matches!(err, ConnectorError::ObjectNotFound { ref identifier } if identifier.contains("XX")));

        let response = SoapResponse {
            status: 503,
            body: "Service Unavailable".to_string(),
        };
        let err = SoapUserService::records("getUsers", &response).unwrap_err();
        assert!(matches!(err, ConnectorError::OperationFailed { .. }));
        assert!(err.to_string().contains("503"));

        let response = SoapResponse {
            status: 200,
            body: "not xml <".to_string(),
        };
        assert!(SoapUserService::records("getUsers", &response).is_err());
    }
}
