//! Outbound SOAP interceptors
//!
//! [`SoapActionInterceptor`] makes sure every request carries a SOAP action,
//! either as the `SOAPAction` header (SOAP 1.1) or as the `action` parameter
//! of the content type (SOAP 1.2).

use reqwest::header::{HeaderName, HeaderValue};
use tracing::{trace, warn};

use super::{BindingOperationInfo, SoapMessage, SoapVersion, SOAP_ACTION_HEADER};

/// The quoted empty action.
const EMPTY_ACTION: &str = "\"\"";

/// Hook run on every outbound message before it is sent.
pub trait OutInterceptor: Send + Sync {
    /// Mutate the message in place.
    fn handle_message(&self, message: &mut SoapMessage);
}

/// Forces a SOAP action onto outbound messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapActionInterceptor {
    uri_prefix: Option<String>,
}

impl SoapActionInterceptor {
    /// Create an interceptor. A non-blank prefix is normalized to end with `/`.
    pub fn new(uri_prefix: Option<&str>) -> Self {
        let uri_prefix = uri_prefix
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                if p.ends_with('/') {
                    p.to_string()
                } else {
                    format!("{p}/")
                }
            });
        Self { uri_prefix }
    }

    pub fn uri_prefix(&self) -> Option<&str> {
        self.uri_prefix.as_deref()
    }

    /// Compute the quoted action for a message.
    pub fn soap_action(&self, message: &SoapMessage) -> String {
        let operation = message
            .binding_operation
            .as_ref()
            .map(|op| op.wrapped_operation().unwrap_or(op));

        let action = match &message.soap_action {
            Some(action) => action.clone(),
            None => operation
                .and_then(|op| self.prefixed_action(op))
                .unwrap_or_else(|| EMPTY_ACTION.to_string()),
        };

        if action.starts_with('"') {
            action
        } else {
            format!("\"{action}\"")
        }
    }

    fn prefixed_action(&self, operation: &BindingOperationInfo) -> Option<String> {
        let operation = operation.dispatch_to_operation().unwrap_or(operation);
        let action = operation.soap_action().filter(|a| !a.trim().is_empty())?;
        let prefix = self.uri_prefix.as_deref()?;
        Some(format!("{prefix}{action}"))
    }
}

impl OutInterceptor for SoapActionInterceptor {
    fn handle_message(&self, message: &mut SoapMessage) {
        let action = self.soap_action(message);

        match message.version {
            SoapVersion::V11 => {
                if message.headers.contains_key(SOAP_ACTION_HEADER) {
                    return;
                }
                match HeaderValue::from_str(&action) {
                    Ok(value) => {
                        trace!(action = %action, "Setting SOAPAction header");
                        message
                            .headers
                            .insert(HeaderName::from_static(SOAP_ACTION_HEADER), value);
                    }
                    Err(e) => warn!(action = %action, error = %e, "SOAP action is not a valid header value"),
                }
            }
            SoapVersion::V12 => {
                if action == EMPTY_ACTION || message.content_type.contains("action=\"") {
                    return;
                }
                trace!(action = %action, "Appending action to content type");
                message.content_type = format!("{}; action={action}", message.content_type);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_user() -> BindingOperationInfo {
        BindingOperationInfo::new("addUser").with_soap_action("addUser")
    }

    fn message(version: SoapVersion) -> SoapMessage {
        SoapMessage::new(version, "").with_binding_operation(add_user())
    }

    fn soap_action_header(message: &SoapMessage) -> Option<&str> {
        message
            .headers
            .get(SOAP_ACTION_HEADER)
            .and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(SoapActionInterceptor::new(Some("urn:svc")).uri_prefix(), Some("urn:svc/"));
        assert_eq!(SoapActionInterceptor::new(Some("urn:svc/")).uri_prefix(), Some("urn:svc/"));
        assert_eq!(SoapActionInterceptor::new(Some("  ")).uri_prefix(), None);
        assert_eq!(SoapActionInterceptor::new(None).uri_prefix(), None);
    }

    #[test]
    fn test_soap11_sets_header() {
        let interceptor = SoapActionInterceptor::new(Some("urn:svc"));
        let mut message = message(SoapVersion::V11);
        message.content_type = "text/xml".to_string();

        interceptor.handle_message(&mut message);

        assert_eq!(soap_action_header(&message), Some("\"urn:svc/addUser\""));
        assert_eq!(message.content_type, "text/xml");
    }

    #[test]
    fn test_soap11_keeps_existing_header_case_insensitively() {
        let interceptor = SoapActionInterceptor::new(Some("urn:svc"));
        let mut message = message(SoapVersion::V11);
        message
            .headers
            .insert("SOAPACTION".parse::<HeaderName>().unwrap(), HeaderValue::from_static("\"custom\""));

        interceptor.handle_message(&mut message);

        assert_eq!(soap_action_header(&message), Some("\"custom\""));
        assert_eq!(message.headers.len(), 1);
    }

    #[test]
    fn test_soap12_appends_action_parameter() {
        let interceptor = SoapActionInterceptor::new(Some("urn:svc"));
        let mut message = message(SoapVersion::V12);
        message.content_type = "text/xml".to_string();

        interceptor.handle_message(&mut message);

        assert_eq!(message.content_type, "text/xml; action=\"urn:svc/addUser\"");
        assert!(message.headers.is_empty());
    }

    #[test]
    fn test_soap12_is_idempotent() {
        let interceptor = SoapActionInterceptor::new(Some("urn:svc"));
        let mut message = message(SoapVersion::V12);

        interceptor.handle_message(&mut message);
        let once = message.content_type.clone();
        interceptor.handle_message(&mut message);

        assert_eq!(message.content_type, once);
        assert_eq!(once.matches("action=").count(), 1);
    }

    #[test]
    fn test_soap12_skips_empty_action() {
        let interceptor = SoapActionInterceptor::new(None);
        let mut message = message(SoapVersion::V12);

        interceptor.handle_message(&mut message);

        assert_eq!(message.content_type, SoapVersion::V12.content_type());
    }

    #[test]
    fn test_without_prefix_action_is_empty() {
        let interceptor = SoapActionInterceptor::new(None);
        let mut message = message(SoapVersion::V11);

        interceptor.handle_message(&mut message);

        assert_eq!(soap_action_header(&message), Some("\"\""));
    }

    #[test]
    fn test_without_operation_action_is_empty() {
        let interceptor = SoapActionInterceptor::new(Some("urn:svc"));
        let message = SoapMessage::new(SoapVersion::V11, "");
        assert_eq!(interceptor.soap_action(&message), "\"\"");

        let message = SoapMessage::new(SoapVersion::V11, "")
            .with_binding_operation(BindingOperationInfo::new("ping").with_soap_action("  "));
        assert_eq!(interceptor.soap_action(&message), "\"\"");
    }

    #[test]
    fn test_explicit_override_wins() {
        let interceptor = SoapActionInterceptor::new(Some("urn:svc"));

        let mut message = message(SoapVersion::V11);
        message.soap_action = Some("urn:other/op".to_string());
        assert_eq!(interceptor.soap_action(&message), "\"urn:other/op\"");

        message.soap_action = Some("\"already\"".to_string());
        assert_eq!(interceptor.soap_action(&message), "\"already\"");
    }

    #[test]
    fn test_unwrapped_and_dispatched_operations() {
        let interceptor = SoapActionInterceptor::new(Some("urn:svc"));

        let unwrapped = BindingOperationInfo::unwrapped("addUserUnwrapped", add_user());
        let message = SoapMessage::new(SoapVersion::V11, "").with_binding_operation(unwrapped);
        assert_eq!(interceptor.soap_action(&message), "\"urn:svc/addUser\"");

        let dispatched = BindingOperationInfo::new("router")
            .with_soap_action("router")
            .with_dispatch_to_operation(add_user());
        let message = SoapMessage::new(SoapVersion::V11, "").with_binding_operation(dispatched);
        assert_eq!(interceptor.soap_action(&message), "\"urn:svc/addUser\"");
    }
}
