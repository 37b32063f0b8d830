#![no_main]

use lanwarden_core::time::{normalize_time, posix_seconds};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = normalize_time(text);
    let _ = posix_seconds(text);
});
