//! Fuzz target for the SOAP action interceptor.
//!
//! Running the interceptor twice must leave the message as the first run
//! left it, for either SOAP version.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_soap_action -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use xavyo_connector_soap::soap::BindingOperationInfo;
use xavyo_connector_soap::{OutInterceptor, SoapActionInterceptor, SoapMessage, SoapVersion};

fuzz_target!(|data: &[u8]| {
    let Some((&flags, rest)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(rest) else {
        return;
    };

    // prefix \0 action [\0 override]
    let mut parts = text.splitn(3, '\0');
    let prefix = parts.next().filter(|p| !p.is_empty());
    let action = parts.next().unwrap_or_default();
    let action_override = parts.next();

    let version = if flags & 1 == 0 {
        SoapVersion::V11
    } else {
        SoapVersion::V12
    };

    let interceptor = SoapActionInterceptor::new(prefix);
    let mut message = SoapMessage::new(version, "")
        .with_binding_operation(BindingOperationInfo::new("op").with_soap_action(action));
    message.soap_action = action_override.map(str::to_string);

    interceptor.handle_message(&mut message);
    let headers = message.headers.clone();
    let content_type = message.content_type.clone();

    interceptor.handle_message(&mut message);
    assert_eq!(message.headers, headers);
    assert_eq!(message.content_type, content_type);
});
