//! Ethernet/IP/전송 계층 디코딩
//!
//! `etherparse`로 프레임을 슬라이스하여 주소, 포트, 전송 계층 페이로드를 추출합니다.
//! Ethernet II 헤더나 IP 계층이 없는 프레임은 `None`을 반환합니다 (캡처 대상 아님).

use std::net::IpAddr;

use etherparse::{LinkSlice, NetSlice, SlicedPacket, TransportSlice};

use lanwarden_core::types::MacAddr;

/// 전송 계층 요약
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp { src_port: u16, dst_port: u16 },
    Udp { src_port: u16, dst_port: u16 },
    Icmpv4,
    Icmpv6,
    /// 디코딩하지 않는 IP 상위 프로토콜
    Other,
}

impl Transport {
    /// (출발지, 목적지) 포트. 포트가 없는 프로토콜이면 `None`
    pub fn ports(&self) -> Option<(u16, u16)> {
        match *self {
            Transport::Tcp { src_port, dst_port } | Transport::Udp { src_port, dst_port } => {
                Some((src_port, dst_port))
            }
            _ => None,
        }
    }
}

/// 디코딩된 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    pub eth_src: MacAddr,
    pub eth_dst: MacAddr,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub transport: Transport,
    /// TCP/UDP 페이로드 (그 외 프로토콜이면 빈 슬라이스)
    pub payload: &'a [u8],
}

impl DecodedFrame<'_> {
    pub fn is_ipv6(&self) -> bool {
        self.src_ip.is_ipv6()
    }
}

/// Ethernet 프레임을 디코딩합니다.
pub fn decode_frame(data: &[u8]) -> Option<DecodedFrame<'_>> {
    let sliced = SlicedPacket::from_ethernet(data).ok()?;

    let (eth_src, eth_dst) = match &sliced.link {
        Some(LinkSlice::Ethernet2(eth)) => (
            MacAddr::from_octets(eth.source()),
            MacAddr::from_octets(eth.destination()),
        ),
        _ => return None,
    };

    let (src_ip, dst_ip) = match &sliced.net {
        Some(NetSlice::Ipv4(v4)) => (
            IpAddr::V4(v4.header().source_addr()),
            IpAddr::V4(v4.header().destination_addr()),
        ),
        Some(NetSlice::Ipv6(v6)) => (
            IpAddr::V6(v6.header().source_addr()),
            IpAddr::V6(v6.header().destination_addr()),
        ),
        _ => return None,
    };

    let (transport, payload) = match &sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => (
            Transport::Tcp {
                src_port: tcp.source_port(),
                dst_port: tcp.destination_port(),
            },
            tcp.payload(),
        ),
        Some(TransportSlice::Udp(udp)) => (
            Transport::Udp {
                src_port: udp.source_port(),
                dst_port: udp.destination_port(),
            },
            udp.payload(),
        ),
        Some(TransportSlice::Icmpv4(_)) => (Transport::Icmpv4, &[][..]),
        Some(TransportSlice::Icmpv6(_)) => (Transport::Icmpv6, &[][..]),
        None => (Transport::Other, &[][..]),
    };

    Some(DecodedFrame {
        eth_src,
        eth_dst,
        src_ip,
        dst_ip,
        transport,
        payload,
    })
}

/// 테스트와 벤치마크용 프레임 생성기 (`test-util` 기능)
#[cfg(any(test, feature = "test-util"))]
pub mod build {
    use etherparse::PacketBuilder;

    pub const SRC_MAC: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
    pub const DST_MAC: [u8; 6] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

    /// IPv4/UDP 프레임
    pub fn udp_frame(src: [u8; 6], src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2(src, DST_MAC)
            .ipv4([192, 168, 1, 10], [192, 168, 1, 1], 64)
            .udp(src_port, dst_port);
        let mut out = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut out, payload).expect("udp frame");
        out
    }

    /// IPv4/TCP 프레임
    pub fn tcp_frame(src: [u8; 6], src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2(src, DST_MAC)
            .ipv4([10, 0, 0, 5], [93, 184, 216, 34], 64)
            .tcp(src_port, dst_port, 1000, 64_240);
        let mut out = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut out, payload).expect("tcp frame");
        out
    }

    /// IPv4/ICMP echo 요청 프레임
    pub fn icmp_frame(src: [u8; 6]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2(src, DST_MAC)
            .ipv4([10, 0, 0, 5], [10, 0, 0, 1], 64)
            .icmpv4_echo_request(1, 1);
        let mut out = Vec::with_capacity(builder.size(8));
        builder.write(&mut out, &[0u8; 8]).expect("icmp frame");
        out
    }

    /// IPv6/UDP 프레임
    pub fn udp6_frame(src: [u8; 6], src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2(src, DST_MAC)
            .ipv6(
                [0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
                [0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xfb],
                255,
            )
            .udp(src_port, dst_port);
        let mut out = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut out, payload).expect("udp6 frame");
        out
    }

    /// IP가 아닌 ARP 프레임 (EtherType 0x0806)
    pub fn arp_frame(src: [u8; 6]) -> Vec<u8> {
        let mut out = Vec::with_capacity(42);
        out.extend_from_slice(&[0xff; 6]);
        out.extend_from_slice(&src);
        out.extend_from_slice(&[0x08, 0x06]);
        out.extend_from_slice(&[0u8; 28]);
        out
    }

    /// DNS 질의 페이로드 (질의 하나)
    pub fn dns_query(name: &str) -> Vec<u8> {
        let mut out = vec![
            0x12, 0x34, // id
            0x01, 0x00, // flags: RD
            0x00, 0x01, // qdcount
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        for label in name.split('.') {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
        out.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        out
    }

    /// SNI 확장을 포함한 TLS ClientHello 레코드
    pub fn tls_client_hello(server_name: &str) -> Vec<u8> {
        let name = server_name.as_bytes();
        let mut sni = Vec::new();
        sni.extend_from_slice(&((name.len() + 3) as u16).to_be_bytes()); // list length
        sni.push(0); // host_name
        sni.extend_from_slice(&(name.len() as u16).to_be_bytes());
        sni.extend_from_slice(name);

        let mut extensions = Vec::new();
        extensions.extend_from_slice(&[0x00, 0x00]); // server_name
        extensions.extend_from_slice(&(sni.len() as u16).to_be_bytes());
        extensions.extend_from_slice(&sni);

        let mut hello = Vec::new();
        hello.extend_from_slice(&[0x03, 0x03]); // client_version
        hello.extend_from_slice(&[0x42; 32]); // random
        hello.push(0); // session id
        hello.extend_from_slice(&[0x00, 0x02, 0x13, 0x01]); // cipher suites
        hello.extend_from_slice(&[0x01, 0x00]); // compression
        hello.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
        hello.extend_from_slice(&extensions);

        let mut handshake = vec![0x01];
        let len = hello.len() as u32;
        handshake.extend_from_slice(&len.to_be_bytes()[1..]);
        handshake.extend_from_slice(&hello);

        let mut record = vec![0x16, 0x03, 0x01];
        record.extend_from_slice(&(handshake.len() as u16).to_be_bytes());
        record.extend_from_slice(&handshake);
        record
    }
}
