//! 캡처 세션 실행기 -- capture → classify → alert → persist
//!
//! [`CaptureService`]는 주입된 신뢰 저장소, 감사 로그, 분류기, 알림 버스로
//! 캡처 세션 하나를 블로킹 스레드에서 실행합니다.
//!
//! # 패킷 처리 순서
//! ```text
//! observation -> TrustStore::classify -> FeatureVector -> BehaviorClassifier
//!             -> PacketRecorder::append -> (Suspicious) AlertBus::publish
//! ```
//!
//! # 실패 처리
//! - 캡처 에러: 세션 종료, 그 전까지의 레코드는 보존 (`SessionReport::fault`)
//! - 신뢰 조회 실패: 해당 패킷만 건너뜀 (`PacketFailure`)
//! - 기록 실패: 레코드와 알림은 유지하고 `PacketFailure`로 보고
//! - 취소: 패킷 사이에서만 확인하므로 반쯤 기록된 레코드는 없음

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use lanwarden_capture::{CaptureSettings, FrameSource, HostResolver, ObservationStream};
use lanwarden_core::error::{CaptureError, PipelineError};
use lanwarden_core::event::AlertEvent;
use lanwarden_core::metrics as m;
use lanwarden_core::pipeline::HealthStatus;
use lanwarden_core::types::{BehaviorLabel, ClassifiedPacketRecord, MacAddr, PacketObservation};
use lanwarden_storage::{PacketRecorder, TrustStore};

use crate::alert::AlertBus;
use crate::classifier::BehaviorClassifier;
use crate::features::FeatureVector;

/// 설정으로 프레임 소스를 여는 함수
pub type SourceFactory =
    Arc<dyn Fn(&CaptureSettings) -> Result<Box<dyn FrameSource>, CaptureError> + Send + Sync>;

fn default_source_factory() -> SourceFactory {
    Arc::new(|settings: &CaptureSettings| settings.open_source())
}

/// 캡처 요청
#[derive(Debug, Clone, Default)]
pub struct CaptureRequest {
    /// 이번 세션의 패킷 수 (없으면 설정값)
    pub max_packets: Option<usize>,
    /// 로그/알림 추적 ID (없으면 생성)
    pub trace_id: Option<String>,
}

/// 패킷 단위 실패
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketFailure {
    /// 세션 내 패킷 순번 (0부터)
    pub index: usize,
    pub eth_src: MacAddr,
    pub reason: String,
}

/// 세션 결과
#[derive(Debug, Default)]
pub struct SessionReport {
    /// 처리된 레코드 (캡처 순서)
    pub records: Vec<ClassifiedPacketRecord>,
    pub failures: Vec<PacketFailure>,
    /// 세션을 끝낸 캡처 에러
    pub fault: Option<CaptureError>,
    pub cancelled: bool,
}

impl SessionReport {
    fn faulted(fault: CaptureError) -> Self {
        Self {
            fault: Some(fault),
            ..Self::default()
        }
    }

    /// 캡처 에러와 패킷 실패가 모두 없으면 `true`
    pub fn is_success(&self) -> bool {
        self.fault.is_none() && self.failures.is_empty()
    }

    fn result_label(&self) -> &'static str {
        if self.fault.is_some() {
            "fault"
        } else if self.cancelled {
            "cancelled"
        } else {
            "success"
        }
    }
}

/// 세션 스레드가 소유하는 구성 요소 묶음
#[derive(Clone)]
struct SessionContext {
    trust: TrustStore,
    recorder: PacketRecorder,
    classifier: BehaviorClassifier,
    alerts: AlertBus,
    source_factory: SourceFactory,
    resolver: Arc<dyn HostResolver>,
}

impl SessionContext {
    fn run(
        &self,
        settings: &CaptureSettings,
        cancel: CancellationToken,
        trace_id: &str,
    ) -> SessionReport {
        let source = match (self.source_factory)(settings) {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(trace_id, error = %e, "failed to open frame source");
                return SessionReport::faulted(e);
            }
        };
        tracing::info!(
            trace_id,
            source = %source.describe(),
            max_packets = settings.max_packets,
            "capture session started"
        );

        let mut stream = ObservationStream::new(
            source,
            Arc::clone(&self.resolver),
            settings.max_packets,
            cancel,
        );
        let mut report = SessionReport::default();

        for (index, item) in stream.by_ref().enumerate() {
            match item {
                Ok(obs) => self.process(index, obs, trace_id, &mut report),
                Err(e) => {
                    report.fault = Some(e);
                    break;
                }
            }
        }

        report.cancelled = stream.was_cancelled();
        tracing::info!(
            trace_id,
            records = report.records.len(),
            failures = report.failures.len(),
            dropped_frames = stream.dropped(),
            cancelled = report.cancelled,
            fault = report.fault.is_some(),
            "capture session finished"
        );
        report
    }

    fn process(
        &self,
        index: usize,
        obs: PacketObservation,
        trace_id: &str,
        report: &mut SessionReport,
    ) {
        let mac = obs.eth_src;

        let prior = match self.trust.classify(&mac) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(trace_id, mac = %mac, error = %e, "trust lookup failed");
                report.failures.push(PacketFailure {
                    index,
                    eth_src: mac,
                    reason: format!("trust lookup failed: {e}"),
                });
                return;
            }
        };

        let features = FeatureVector::from_observation(&obs);
        let label = self.classifier.classify(&features);

        let record = ClassifiedPacketRecord {
            observation: obs,
            classification: prior,
            behavior_prediction: label,
        };

        if let Err(e) = self.recorder.append(&record) {
            report.failures.push(PacketFailure {
                index,
                eth_src: mac,
                reason: format!("failed to persist record: {e}"),
            });
        }

        if label == BehaviorLabel::Suspicious {
            let alert =
                AlertEvent::suspicious(mac, prior, record.observation.time.clone(), trace_id);
            tracing::warn!(
                trace_id,
                mac = %mac,
                alarm = %alert.alarm_type,
                "suspicious behavior detected"
            );
            self.alerts.publish(alert);
        }

        report.records.push(record);
    }
}

/// 캡처 세션 실행기
///
/// 세션은 서비스당 하나씩 순서대로 실행됩니다. 두 번째 요청은 첫 번째가 끝날 때까지 기다립니다.
pub struct CaptureService {
    ctx: SessionContext,
    settings: CaptureSettings,
    /// 데몬 종료 토큰 (세션 토큰의 부모)
    shutdown: CancellationToken,
    session_lock: Arc<tokio::sync::Mutex<()>>,
    last_fault: Mutex<Option<String>>,
}

impl CaptureService {
    pub fn builder() -> CaptureServiceBuilder {
        CaptureServiceBuilder::default()
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn alerts(&self) -> &AlertBus {
        &self.ctx.alerts
    }

    /// 캡처 세션 하나를 실행합니다.
    ///
    /// 반환된 future가 완료 전에 버려지면 세션도 다음 패킷 경계에서 취소됩니다.
    pub async fn run(&self, request: CaptureRequest) -> SessionReport {
        let trace_id = request
            .trace_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let settings = match request.max_packets {
            Some(n) => self.settings.with_max_packets(n),
            None => self.settings.clone(),
        };

        // 세션 스레드가 끝날 때까지 잠금을 유지
        let session = Arc::clone(&self.session_lock).lock_owned().await;
        let cancel = self.shutdown.child_token();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let started = Instant::now();
        let ctx = self.ctx.clone();
        let task_trace = trace_id.clone();
        let report = match tokio::task::spawn_blocking(move || {
            let _session = session;
            ctx.run(&settings, cancel, &task_trace)
        })
        .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(trace_id = %trace_id, error = %e, "capture task failed");
                SessionReport::faulted(CaptureError::Task(e.to_string()))
            }
        };

        metrics::counter!(m::CAPTURE_SESSIONS_TOTAL, m::LABEL_RESULT => report.result_label())
            .increment(1);
        metrics::histogram!(m::CAPTURE_SESSION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        *self.last_fault.lock() = report.fault.as_ref().map(ToString::to_string);
        report
    }

    /// 마지막 세션 결과 기준 상태
    pub fn health(&self) -> HealthStatus {
        match self.last_fault.lock().as_deref() {
            Some(fault) => HealthStatus::Degraded(format!("last capture session failed: {fault}")),
            None => HealthStatus::Healthy,
        }
    }
}

/// [`CaptureService`] 빌더
#[derive(Default)]
pub struct CaptureServiceBuilder {
    trust: Option<TrustStore>,
    recorder: Option<PacketRecorder>,
    classifier: Option<BehaviorClassifier>,
    alerts: Option<AlertBus>,
    settings: Option<CaptureSettings>,
    source_factory: Option<SourceFactory>,
    resolver: Option<Arc<dyn HostResolver>>,
    shutdown: Option<CancellationToken>,
}

impl CaptureServiceBuilder {
    pub fn trust_store(mut self, trust: TrustStore) -> Self {
        self.trust = Some(trust);
        self
    }

    pub fn recorder(mut self, recorder: PacketRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn classifier(mut self, classifier: BehaviorClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn alert_bus(mut self, alerts: AlertBus) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn settings(mut self, settings: CaptureSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// 프레임 소스 생성 방식을 바꿉니다 (기본: [`CaptureSettings::open_source`]).
    pub fn source_factory(mut self, factory: SourceFactory) -> Self {
        self.source_factory = Some(factory);
        self
    }

    /// 역방향 조회기를 바꿉니다 (기본: [`CaptureSettings::resolver`]).
    pub fn resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// 데몬 종료 토큰을 연결합니다.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub fn build(self) -> Result<CaptureService, PipelineError> {
        let missing = |what: &str| PipelineError::InitFailed(format!("{what} is required"));

        let settings = self.settings.unwrap_or_default();
        let resolver = self.resolver.unwrap_or_else(|| settings.resolver());
        let source_factory = match self.source_factory {
            Some(factory) => factory,
            None => default_source_factory(),
        };

        let ctx = SessionContext {
            trust: self.trust.ok_or_else(|| missing("trust store"))?,
            recorder: self.recorder.ok_or_else(|| missing("packet recorder"))?,
            classifier: self.classifier.ok_or_else(|| missing("classifier"))?,
            alerts: self.alerts.ok_or_else(|| missing("alert bus"))?,
            source_factory,
            resolver,
        };

        Ok(CaptureService {
            ctx,
            settings,
            shutdown: self.shutdown.unwrap_or_default(),
            session_lock: Arc::new(tokio::sync::Mutex::new(())),
            last_fault: Mutex::new(None),
        })
    }
}
