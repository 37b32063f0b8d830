//! 애플리케이션 계층 해석 -- 최상위 프로토콜 이름과 호스트 이름
//!
//! 전송 계층 포트와 페이로드를 보고 프로토콜을 판별합니다.
//!
//! # 호스트 우선순위
//! 1. DNS / mDNS 첫 번째 질의 이름
//! 2. HTTP `Host` 헤더 (포트 제거)
//! 3. TLS ClientHello SNI

pub mod dns;
pub mod http;
pub mod tls;

use crate::decode::{DecodedFrame, Transport};

const PORT_DNS: u16 = 53;
const PORT_MDNS: u16 = 5353;
const PORT_SSDP: u16 = 1900;
const PORT_NTP: u16 = 123;
const PORT_DHCP_SERVER: u16 = 67;
const PORT_DHCP_CLIENT: u16 = 68;
const PORT_DHCPV6_CLIENT: u16 = 546;
const PORT_DHCPV6_SERVER: u16 = 547;

/// 해석 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayer {
    /// 최상위 프로토콜 이름 (`DNS`, `HTTP`, `TLS`, `UDP` 등)
    pub protocol: &'static str,
    /// 애플리케이션 계층 호스트 이름
    pub host: Option<String>,
}

impl AppLayer {
    fn bare(protocol: &'static str) -> Self {
        Self {
            protocol,
            host: None,
        }
    }
}

/// 디코딩된 프레임의 최상위 프로토콜과 호스트를 판별합니다.
pub fn dissect(frame: &DecodedFrame<'_>) -> AppLayer {
    match frame.transport {
        Transport::Udp { src_port, dst_port } => dissect_udp(src_port, dst_port, frame.payload),
        Transport::Tcp { .. } => dissect_tcp(frame.payload),
        Transport::Icmpv4 => AppLayer::bare("ICMP"),
        Transport::Icmpv6 => AppLayer::bare("ICMPV6"),
        Transport::Other if frame.is_ipv6() => AppLayer::bare("IPV6"),
        Transport::Other => AppLayer::bare("IP"),
    }
}

fn dissect_udp(src: u16, dst: u16, payload: &[u8]) -> AppLayer {
    let either = |port: u16| src == port || dst == port;

    if either(PORT_MDNS) {
        if let Some(host) = dns::parse(payload) {
            return AppLayer {
                protocol: "MDNS",
                host,
            };
        }
    }
    if either(PORT_DNS) {
        if let Some(host) = dns::parse(payload) {
            return AppLayer {
                protocol: "DNS",
                host,
            };
        }
    }
    if either(PORT_SSDP) {
        return AppLayer::bare("SSDP");
    }
    if either(PORT_NTP) && payload.len() >= 48 {
        return AppLayer::bare("NTP");
    }
    if either(PORT_DHCP_SERVER)
        || either(PORT_DHCP_CLIENT)
        || either(PORT_DHCPV6_CLIENT)
        || either(PORT_DHCPV6_SERVER)
    {
        return AppLayer::bare("DHCP");
    }
    if payload.is_empty() {
        AppLayer::bare("UDP")
    } else {
        AppLayer::bare("DATA")
    }
}

fn dissect_tcp(payload: &[u8]) -> AppLayer {
    if payload.is_empty() {
        return AppLayer::bare("TCP");
    }
    if let Some(host) = http::parse(payload) {
        return AppLayer {
            protocol: "HTTP",
            host,
        };
    }
    if let Some(host) = tls::parse(payload) {
        return AppLayer {
            protocol: "TLS",
            host,
        };
    }
    AppLayer::bare("DATA")
}
