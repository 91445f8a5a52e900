//! Fuzz target for SOAP response decoding.
//!
//! Arbitrary bytes must decode to records, a fault or an error without
//! panicking.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_soap_response -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use xavyo_connector_soap::soap::{decode_response, SoapBody};
use xavyo_connector_soap::User;

fuzz_target!(|data: &[u8]| {
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };

    match decode_response(xml) {
        Ok(SoapBody::Records(records)) => {
            for record in &records {
                let _ = User::from_record(record);
            }
        }
        Ok(SoapBody::Fault(fault)) => {
            let _ = fault.is_not_found();
        }
        Err(_) => {}
    }
});
