//! 파이프라인 trait -- 장기 실행 모듈의 생명주기 정의
//!
//! 데몬이 관리하는 모듈(HTTP API 서버, 알림 모니터)은 [`Pipeline`]을 구현하여
//! 동일한 start/stop/health_check 생명주기를 따릅니다.
//! [`ModuleRegistry`]는 등록 순서대로 모듈을 시작하고 정지합니다.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::{LanwardenError, PipelineError};

/// dyn 호환 trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 성능 저하 (사유 포함)
    Degraded(String),
    /// 동작 불가 (사유 포함)
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 장기 실행 모듈의 생명주기 trait
pub trait Pipeline: Send + Sync {
    /// 모듈을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), LanwardenError>> + Send;

    /// 모듈을 정지합니다. 진행 중인 작업을 정리한 뒤 반환합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), LanwardenError>> + Send;

    /// 현재 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// dyn 호환 파이프라인 trait
///
/// `Pipeline`은 RPITIT를 사용하므로 `dyn Pipeline`이 불가합니다.
/// `DynPipeline`은 `BoxFuture`를 반환하여 이종 모듈을 한 목록에서 관리합니다.
pub trait DynPipeline: Send + Sync {
    fn start(&mut self) -> BoxFuture<'_, Result<(), LanwardenError>>;
    fn stop(&mut self) -> BoxFuture<'_, Result<(), LanwardenError>>;
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

impl<T: Pipeline> DynPipeline for T {
    fn start(&mut self) -> BoxFuture<'_, Result<(), LanwardenError>> {
        Box::pin(Pipeline::start(self))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), LanwardenError>> {
        Box::pin(Pipeline::stop(self))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(Pipeline::health_check(self))
    }
}

/// 이름이 붙은 모듈 목록
///
/// 등록 순서가 보존되며 시작과 정지 모두 등록 순서를 따릅니다.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<(String, Box<dyn DynPipeline>)>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모듈을 등록합니다. 같은 이름이 있으면 에러를 반환합니다.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        module: Box<dyn DynPipeline>,
    ) -> Result<(), LanwardenError> {
        let name = name.into();
        if self.modules.iter().any(|(n, _)| *n == name) {
            return Err(PipelineError::AlreadyRegistered(name).into());
        }
        self.modules.push((name, module));
        Ok(())
    }

    /// 모든 모듈을 시작합니다. 첫 실패에서 즉시 반환합니다.
    ///
    /// 이미 시작된 모듈은 롤백하지 않으므로 호출자가 `stop_all`을 호출해야 합니다.
    pub async fn start_all(&mut self) -> Result<(), LanwardenError> {
        for (name, module) in &mut self.modules {
            tracing::debug!(module = %name, "starting module");
            module.start().await?;
        }
        Ok(())
    }

    /// 모든 모듈을 정지합니다.
    ///
    /// 개별 실패가 있어도 나머지 정지를 계속하고, 에러를 모아 반환합니다.
    pub async fn stop_all(&mut self) -> Result<(), LanwardenError> {
        let mut errors = Vec::new();
        for (name, module) in &mut self.modules {
            if let Err(e) = module.stop().await {
                errors.push(format!("{name}: {e}"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::StopFailed(errors.join("; ")).into())
        }
    }

    /// 모든 모듈의 건강 상태를 등록 순서대로 조회합니다.
    pub async fn health_check_all(&self) -> Vec<(String, HealthStatus)> {
        let mut statuses = Vec::with_capacity(self.modules.len());
        for (name, module) in &self.modules {
            statuses.push((name.clone(), module.health_check().await));
        }
        statuses
    }

    pub fn count(&self) -> usize {
        self.modules.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|(n, _)| n.as_str()).collect()
    }
}
