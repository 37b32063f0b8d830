//! 출발지 IP 역방향 DNS 조회
//!
//! 조회 실패는 복구 가능한 상황이므로 에러를 올리지 않고 `"Unknown"`으로 대체합니다.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use lanwarden_core::types::UNKNOWN;

/// 역방향 이름 조회기
pub trait HostResolver: Send + Sync {
    /// IP 주소의 호스트 이름. 찾지 못하면 `None`
    fn reverse(&self, ip: IpAddr) -> Option<String>;
}

/// 운영체제 리졸버(`getnameinfo`)를 사용하는 조회기
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn reverse(&self, ip: IpAddr) -> Option<String> {
        match dns_lookup::lookup_addr(&ip) {
            Ok(name) if !name.is_empty() && name != ip.to_string() => Some(name),
            Ok(_) => None,
            Err(e) => {
                tracing::trace!(%ip, error = %e, "reverse lookup miss");
                None
            }
        }
    }
}

/// 항상 실패하는 조회기 (`resolve_hostnames = false`)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

impl HostResolver for NoopResolver {
    fn reverse(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}

/// 세션 단위 조회 결과 캐시
///
/// 한 세션 안에서 같은 주소는 한 번만 조회합니다. 실패 결과도 캐시합니다.
pub(crate) struct ResolveCache {
    resolver: Arc<dyn HostResolver>,
    entries: HashMap<IpAddr, String>,
}

impl ResolveCache {
    pub(crate) fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Self {
            resolver,
            entries: HashMap::new(),
        }
    }

    pub(crate) fn hostname(&mut self, ip: IpAddr) -> String {
        self.entries
            .entry(ip)
            .or_insert_with(|| {
                self.resolver
                    .reverse(ip)
                    .unwrap_or_else(|| UNKNOWN.to_owned())
            })
            .clone()
    }
}
