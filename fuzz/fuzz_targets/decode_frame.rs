#![no_main]

use lanwarden_capture::{decode_frame, dissect};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 임의의 프레임에서도 패닉 없이 디코딩/분석이 끝나야 한다
    if let Some(frame) = decode_frame(data) {
        let _ = frame.ports();
        let _ = dissect(&frame);
    }
});
