//! TLS 레코드 인식 및 ClientHello SNI 추출

const CONTENT_HANDSHAKE: u8 = 0x16;
const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;
const EXT_SERVER_NAME: u16 = 0x0000;
const NAME_TYPE_HOST: u8 = 0x00;

/// TLS 레코드면 `Some`을 반환합니다. 안쪽 값은 ClientHello의 SNI입니다.
pub fn parse(payload: &[u8]) -> Option<Option<String>> {
    if payload.len() < 5 {
        return None;
    }
    let content_type = payload[0];
    if !(0x14..=0x17).contains(&content_type) || payload[1] != 0x03 || payload[2] > 0x04 {
        return None;
    }
    if content_type != CONTENT_HANDSHAKE {
        return Some(None);
    }
    Some(client_hello_sni(&payload[5..]))
}

fn client_hello_sni(handshake: &[u8]) -> Option<String> {
    let mut r = Reader::new(handshake);
    if r.u8()? != HANDSHAKE_CLIENT_HELLO {
        return None;
    }
    r.skip(3)?; // length
    r.skip(2 + 32)?; // version + random
    let session_len = r.u8()? as usize;
    r.skip(session_len)?;
    let suites_len = r.u16()? as usize;
    r.skip(suites_len)?;
    let compression_len = r.u8()? as usize;
    r.skip(compression_len)?;

    let ext_total = r.u16()? as usize;
    let mut ext = Reader::new(r.take(ext_total)?);
    while let (Some(kind), Some(len)) = (ext.u16(), ext.u16()) {
        let body = ext.take(len as usize)?;
        if kind == EXT_SERVER_NAME {
            return server_name(body);
        }
    }
    None
}

fn server_name(body: &[u8]) -> Option<String> {
    let mut r = Reader::new(body);
    let list_len = r.u16()? as usize;
    let mut list = Reader::new(r.take(list_len)?);
    while let Some(name_type) = list.u8() {
        let len = list.u16()? as usize;
        let name = list.take(len)?;
        if name_type == NAME_TYPE_HOST {
            let name = std::str::from_utf8(name).ok()?;
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic()) {
                return None;
            }
            return Some(name.to_ascii_lowercase());
        }
    }
    None
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() < n {
            return None;
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Some(head)
    }

    fn skip(&mut self, n: usize) -> Option<()> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }
}
