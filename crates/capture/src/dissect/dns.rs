//! DNS / mDNS 질의 이름 추출

/// DNS 헤더 크기
const HEADER_LEN: usize = 12;

/// 이름 하나가 가질 수 있는 최대 길이
const MAX_NAME_LEN: usize = 255;

/// 압축 포인터 추적 한도
const MAX_POINTER_HOPS: usize = 16;

/// DNS 메시지로 해석 가능한지 확인하고 첫 번째 질의 이름을 반환합니다.
///
/// 반환값의 바깥 `Option`은 메시지 인식 여부, 안쪽은 이름 존재 여부입니다.
/// 질의 수가 0이면 `Some(None)`입니다.
pub fn parse(payload: &[u8]) -> Option<Option<String>> {
    if payload.len() < HEADER_LEN {
        return None;
    }
    let opcode = (payload[2] >> 3) & 0x0f;
    if opcode > 5 {
        return None;
    }
    let qdcount = u16::from_be_bytes([payload[4], payload[5]]);
    if qdcount == 0 {
        return Some(None);
    }
    let name = read_name(payload, HEADER_LEN)?;
    Some(if name.is_empty() { None } else { Some(name) })
}

fn read_name(msg: &[u8], mut pos: usize) -> Option<String> {
    let mut name = String::new();
    let mut hops = 0;

    loop {
        let len = *msg.get(pos)? as usize;
        match len & 0xc0 {
            0x00 => {
                if len == 0 {
                    return Some(name);
                }
                let label = msg.get(pos + 1..pos + 1 + len)?;
                if !name.is_empty() {
                    name.push('.');
                }
                for &b in label {
                    if !b.is_ascii_graphic() {
                        return None;
                    }
                    name.push(char::from(b.to_ascii_lowercase()));
                }
                if name.len() > MAX_NAME_LEN {
                    return None;
                }
                pos += 1 + len;
            }
            0xc0 => {
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return None;
                }
                let low = *msg.get(pos + 1)? as usize;
                pos = ((len & 0x3f) << 8) | low;
            }
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::build::dns_query;

    #[test]
    fn extracts_first_question() {
        assert_eq!(
            parse(&dns_query("Example.COM")),
            Some(Some("example.com".to_owned()))
        );
    }

    #[test]
    fn follows_compression_pointer() {
        let mut msg = dns_query("a.example");
        // 두 번째 위치에 질의 하나를 더 두는 대신 헤더 직후를 포인터로 바꾼 메시지
        let mut pointer = msg[..HEADER_LEN].to_vec();
        pointer.extend_from_slice(&[0xc0, 0x0e]);
        pointer.extend_from_slice(&msg[HEADER_LEN..]);
        msg = pointer;
        assert_eq!(parse(&msg), Some(Some("a.example".to_owned())));
    }

    #[test]
    fn pointer_loop_is_rejected() {
        let mut msg = dns_query("x");
        msg.truncate(HEADER_LEN);
        msg.extend_from_slice(&[0xc0, 0x0c]);
        assert_eq!(parse(&msg), None);
    }

    #[test]
    fn short_or_truncated_payloads() {
        assert_eq!(parse(b"abc"), None);
        let msg = dns_query("example.com");
        assert_eq!(parse(&msg[..16]), None);
    }

    #[test]
    fn zero_questions() {
        let mut msg = dns_query("example.com");
        msg[5] = 0;
        assert_eq!(parse(&msg), Some(None));
    }
}
