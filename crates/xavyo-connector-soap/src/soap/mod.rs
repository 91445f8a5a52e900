//! SOAP messaging
//!
//! Message model for outbound requests, envelope encoding and response
//! decoding. Responses are decoded into flat records (one per `return`
//! element of the operation response) or a [`SoapFault`].

pub mod interceptor;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use xavyo_connector::error::{ConnectorError, ConnectorResult};

pub use interceptor::{OutInterceptor, SoapActionInterceptor};

/// HTTP header carrying the action under SOAP 1.1 (`SOAPAction`), in the
/// lowercase form header maps store.
pub const SOAP_ACTION_HEADER: &str = "soapaction";

/// SOAP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoapVersion {
    /// SOAP 1.1: action travels in the `SOAPAction` header.
    #[default]
    V11,
    /// SOAP 1.2: action travels as a content-type parameter.
    V12,
}

impl SoapVersion {
    /// Envelope namespace URI.
    pub fn namespace(&self) -> &'static str {
        match self {
            SoapVersion::V11 => "http://schemas.xmlsoap.org/soap/envelope/",
            SoapVersion::V12 => "http://www.w3.org/2003/05/soap-envelope",
        }
    }

    /// Base content type of a request, before any action parameter.
    pub fn content_type(&self) -> &'static str {
        match self {
            SoapVersion::V11 => "text/xml; charset=UTF-8",
            SoapVersion::V12 => "application/soap+xml; charset=UTF-8",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SoapVersion::V11 => "1.1",
            SoapVersion::V12 => "1.2",
        }
    }
}

impl fmt::Display for SoapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SOAP {}", self.as_str())
    }
}

/// Binding metadata of the operation a message invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOperationInfo {
    name: String,
    soap_action: Option<String>,
    wrapped_operation: Option<Box<BindingOperationInfo>>,
    dispatch_to_operation: Option<Box<BindingOperationInfo>>,
}

impl BindingOperationInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            soap_action: None,
            wrapped_operation: None,
            dispatch_to_operation: None,
        }
    }

    /// Set the operation's SOAP action.
    pub fn with_soap_action(mut self, action: impl Into<String>) -> Self {
        self.soap_action = Some(action.into());
        self
    }

    /// Create the unwrapped view of a document/literal wrapped operation.
    ///
    /// The unwrapped view carries no action of its own; it lives on `wrapped`.
    pub fn unwrapped(name: impl Into<String>, wrapped: BindingOperationInfo) -> Self {
        Self {
            wrapped_operation: Some(Box::new(wrapped)),
            ..Self::new(name)
        }
    }

    /// Route dispatch to another operation.
    pub fn with_dispatch_to_operation(mut self, target: BindingOperationInfo) -> Self {
        self.dispatch_to_operation = Some(Box::new(target));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn soap_action(&self) -> Option<&str> {
        self.soap_action.as_deref()
    }

    pub fn is_unwrapped(&self) -> bool {
        self.wrapped_operation.is_some()
    }

    pub fn wrapped_operation(&self) -> Option<&BindingOperationInfo> {
        self.wrapped_operation.as_deref()
    }

    pub fn dispatch_to_operation(&self) -> Option<&BindingOperationInfo> {
        self.dispatch_to_operation.as_deref()
    }
}

/// An outbound SOAP message as seen by interceptors.
#[derive(Debug, Clone)]
pub struct SoapMessage {
    pub version: SoapVersion,
    /// Protocol headers; lookups are case-insensitive.
    pub headers: HeaderMap,
    pub content_type: String,
    /// Explicit action override set by an earlier interceptor.
    pub soap_action: Option<String>,
    pub binding_operation: Option<BindingOperationInfo>,
    pub body: String,
}

impl SoapMessage {
    pub fn new(version: SoapVersion, body: impl Into<String>) -> Self {
        Self {
            version,
            headers: HeaderMap::new(),
            content_type: version.content_type().to_string(),
            soap_action: None,
            binding_operation: None,
            body: body.into(),
        }
    }

    pub fn with_binding_operation(mut self, operation: BindingOperationInfo) -> Self {
        self.binding_operation = Some(operation);
        self
    }
}

/// A SOAP fault returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("SOAP fault {code}: {reason}")]
pub struct SoapFault {
    pub code: String,
    pub reason: String,
    /// Local name of the first element inside the fault detail.
    pub detail: Option<String>,
}

impl SoapFault {
    /// Whether the detail carries a `NotFoundException`.
    pub fn is_not_found(&self) -> bool {
        self.detail.as_deref() == Some("NotFoundException")
    }
}

/// One `return` element of an operation response, as field name to text.
pub type Record = HashMap<String, String>;

/// Decoded body of a SOAP response.
#[derive(Debug, Clone, PartialEq)]
pub enum SoapBody {
    Records(Vec<Record>),
    Fault(SoapFault),
}

/// Encode a request envelope invoking `operation` in `target_namespace`.
///
/// Each parameter becomes an unqualified child element of the operation
/// element. Values are XML-escaped.
pub fn encode_request(
    version: SoapVersion,
    target_namespace: &str,
    operation: &str,
    params: &[(&str, &str)],
) -> String {
    let mut xml = String::with_capacity(256);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str(&format!(
        r#"<soap:Envelope xmlns:soap="{}"><soap:Body>"#,
        version.namespace()
    ));
    xml.push_str(&format!(
        r#"<ns:{operation} xmlns:ns="{}">"#,
        escape(target_namespace)
    ));
    for (name, value) in params {
        xml.push_str(&format!("<{name}>{}</{name}>", escape(*value)));
    }
    xml.push_str(&format!("</ns:{operation}>"));
    xml.push_str("</soap:Body></soap:Envelope>");
    xml
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().into_inner()).into_owned()
}

/// Event-driven decoder state. `path` holds the local names of the open
/// elements; `body_depth` is the index of `Body` within it.
#[derive(Default)]
struct ResponseDecoder {
    path: Vec<String>,
    body_depth: Option<usize>,
    records: Vec<Record>,
    current: Option<Record>,
    fault: Option<SoapFault>,
    in_detail: bool,
}

impl ResponseDecoder {
    fn start(&mut self, local: String) {
        let depth = self.path.len();
        match self.body_depth {
            None if local == "Body" => self.body_depth = Some(depth),
            Some(body) if depth > body => {
                let rel = depth - body;
                if rel == 1 && local == "Fault" {
                    self.fault = Some(SoapFault::default());
                } else if let Some(fault) = self.fault.as_mut() {
                    if rel == 2 && local.eq_ignore_ascii_case("detail") {
                        self.in_detail = true;
                    } else if rel == 3 && self.in_detail && fault.detail.is_none() {
                        fault.detail = Some(local.clone());
                    }
                } else if rel == 2 && local == "return" {
                    self.current = Some(Record::new());
                } else if rel == 3 {
                    if let Some(record) = self.current.as_mut() {
                        record.entry(local.clone()).or_default();
                    }
                }
            }
            _ => {}
        }
        self.path.push(local);
    }

    fn text(&mut self, text: String) {
        let Some(body) = self.body_depth else {
            return;
        };
        let depth = self.path.len();
        let Some(field) = self.path.last() else {
            return;
        };

        if let Some(fault) = self.fault.as_mut() {
            let parent = depth
                .checked_sub(2)
                .and_then(|i| self.path.get(i))
                .map(String::as_str);
            match (field.as_str(), parent) {
                ("faultcode", _) => fault.code = text,
                ("faultstring", _) => fault.reason = text,
                ("Value", Some("Code")) if fault.code.is_empty() => fault.code = text,
                ("Text", Some("Reason")) => fault.reason = text,
                _ => {}
            }
        } else if depth == body + 4 {
            if let Some(record) = self.current.as_mut() {
                record.entry(field.clone()).or_default().push_str(&text);
            }
        }
    }

    fn end(&mut self) {
        self.path.pop();
        if let Some(body) = self.body_depth {
            if self.path.len() == body + 2 {
                if let Some(record) = self.current.take() {
                    self.records.push(record);
                }
                self.in_detail = false;
            }
        }
    }

    fn finish(self) -> ConnectorResult<SoapBody> {
        if self.body_depth.is_none() {
            return Err(ConnectorError::InvalidData {
                message: "response has no SOAP Body".to_string(),
            });
        }
        Ok(match self.fault {
            Some(fault) => SoapBody::Fault(fault),
            None => SoapBody::Records(self.records),
        })
    }
}

/// Decode a response envelope.
///
/// Records are read from `Body/<operationResponse>/return/<field>`; a
/// `Body/Fault` yields [`SoapBody::Fault`] for either SOAP version.
pub fn decode_response(xml: &str) -> ConnectorResult<SoapBody> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut decoder = ResponseDecoder::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => decoder.start(local_name(e)),
            Ok(Event::Empty(ref e)) => {
                decoder.start(local_name(e));
                decoder.end();
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|e| ConnectorError::InvalidData {
                    message: format!("XML text error: {e}"),
                })?;
                decoder.text(text.into_owned());
            }
            Ok(Event::CData(e)) => {
                decoder.text(String::from_utf8_lossy(&e.into_inner()).into_owned());
            }
            Ok(Event::End(_)) => decoder.end(),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConnectorError::InvalidData {
                    message: format!("XML parse error: {e}"),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    decoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://provisioningws.test.tirasa.net/";

    #[test]
    fn test_version_constants() {
        assert_eq!(SoapVersion::V11.content_type(), "text/xml; charset=UTF-8");
        assert_eq!(
            SoapVersion::V12.namespace(),
            "http://www.w3.org/2003/05/soap-envelope"
        );
        assert_eq!(SoapVersion::V12.to_string(), "SOAP 1.2");
    }

    #[test]
    fn test_encode_request_escapes_values() {
        let xml = encode_request(SoapVersion::V11, NS, "getUser", &[("initials", "M&R<")]);

        assert!(xml.contains(r#"xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/""#));
        assert!(xml.contains(r#"<ns:getUser xmlns:ns="http://provisioningws.test.tirasa.net/">"#));
        assert!(xml.contains("<initials>M&amp;R&lt;</initials>"));
        assert!(xml.ends_with("</ns:getUser></soap:Body></soap:Envelope>"));
    }

    #[test]
    fn test_decode_records() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns2:getUsersResponse xmlns:ns2="http://provisioningws.test.tirasa.net/">
      <return>
        <birthdate>1977-09-08T00:00:00+02:00</birthdate>
        <firstname>Mario</firstname>
        <initials>MR</initials>
        <surname>Rossi &amp; Co</surname>
      </return>
      <return>
        <firstname>Filippo</firstname>
        <initials>FB</initials>
        <surname/>
      </return>
    </ns2:getUsersResponse>
  </soap:Body>
</soap:Envelope>"#;

        let SoapBody::Records(records) = decode_response(xml).unwrap() else {
            panic!("Expected records");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("initials").map(String::as_str), Some("MR"));
        assert_eq!(records[0].get("surname").map(String::as_str), Some("Rossi & Co"));
        assert_eq!(records[1].get("surname").map(String::as_str), Some(""));
        assert!(records[1].get("birthdate").is_none());
    }

    #[test]
    fn test_decode_cdata_fields() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns2:getUserResponse xmlns:ns2="http://provisioningws.test.tirasa.net/">
      <return>
        <firstname>Mario</firstname>
        <initials><![CDATA[MR]]></initials>
        <surname><![CDATA[Rossi & Co]]></surname>
      </return>
    </ns2:getUserResponse>
  </soap:Body>
</soap:Envelope>"#;

        let SoapBody::Records(records) = decode_response(xml).unwrap() else {
            panic!("Expected records");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("initials").map(String::as_str), Some("MR"));
        assert_eq!(records[0].get("surname").map(String::as_str), Some("Rossi & Co"));
    }

    #[test]
    fn test_decode_empty_response() {
        let xml = r#"<S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/"><S:Body><ns2:getUsersResponse xmlns:ns2="urn:x"/></S:Body></S:Envelope>"#;
        assert_eq!(decode_response(xml).unwrap(), SoapBody::Records(vec![]));
    }

    #[test]
    fn test_decode_soap11_fault() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>Could not find user with initial XX</faultstring>
      <detail>
        <ns1:NotFoundException xmlns:ns1="http://provisioningws.test.tirasa.net/">
          <message>Could not find user with initial XX</message>
        </ns1:NotFoundException>
      </detail>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

        let SoapBody::Fault(fault) = decode_response(xml).unwrap() else {
            panic!("Expected fault");
        };
        assert_eq!(fault.code, "soap:Server");
        assert_eq!(fault.reason, "Could not find user with initial XX");
        assert!(fault.is_not_found());
    }

    #[test]
    fn test_decode_soap12_fault() {
        let xml = r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
  <env:Body>
    <env:Fault>
      <env:Code><env:Value>env:Receiver</env:Value></env:Code>
      <env:Reason><env:Text xml:lang="en">boom</env:Text></env:Reason>
    </env:Fault>
  </env:Body>
</env:Envelope>"#;

        let SoapBody::Fault(fault) = decode_response(xml).unwrap() else {
            panic!("Expected fault");
        };
        assert_eq!(fault.code, "env:Receiver");
        assert_eq!(fault.reason, "boom");
        assert!(!fault.is_not_found());
    }

    #[test]
    fn test_decode_rejects_non_envelope() {
        assert!(decode_response("<html><body>502</body></html>").is_err());
        assert!(decode_response("<a><b></a>").is_err());
    }
}
