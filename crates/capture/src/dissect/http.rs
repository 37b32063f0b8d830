//! HTTP/1.x 요청 인식 및 Host 헤더 추출

const METHODS: [&[u8]; 9] = [
    b"GET ", b"POST ", b"PUT ", b"DELETE ", b"HEAD ", b"OPTIONS ", b"PATCH ", b"CONNECT ",
    b"TRACE ",
];

/// HTTP 요청 또는 응답이면 `Some`을 반환합니다. 안쪽 값은 포트를 제거한 Host 헤더입니다.
pub fn parse(payload: &[u8]) -> Option<Option<String>> {
    let is_request = METHODS.iter().any(|m| payload.starts_with(m));
    let is_response = payload.starts_with(b"HTTP/1.");
    if !is_request && !is_response {
        return None;
    }
    if !is_request {
        return Some(None);
    }

    let head_end = find(payload, b"\r\n\r\n").unwrap_or(payload.len());
    let head = String::from_utf8_lossy(&payload[..head_end]);
    let host = head
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("host"))
        .map(|(_, value)| strip_port(value.trim()))
        .filter(|h| !h.is_empty())
        .map(str::to_ascii_lowercase);

    Some(host)
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [::1]:8080
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
