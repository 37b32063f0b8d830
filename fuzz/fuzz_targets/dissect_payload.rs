#![no_main]

use lanwarden_capture::dissect::{dns, http, tls};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = dns::parse(data);
    let _ = tls::parse(data);
    let _ = http::parse(data);
});
