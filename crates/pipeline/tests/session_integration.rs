//! 캡처 세션 통합 테스트
//!
//! 메모리 프레임 소스와 파일 데이터베이스로 전체 흐름
//! (신뢰 조회 → 분류 → 기록 → 알림)을 검증합니다.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use lanwarden_capture::decode::build::*;
use lanwarden_capture::{CaptureSettings, FrameSource, MemoryFrameSource, NoopResolver, RawFrame};
use lanwarden_core::error::{CaptureError, ModelError};
use lanwarden_core::event::AlarmType;
use lanwarden_core::types::{BehaviorLabel, MacAddr, TrustState};
use lanwarden_pipeline::{
    AlertBus, BehaviorClassifier, BehaviorModel, CaptureRequest, CaptureService, FeatureVector,
    SourceFactory,
};
use lanwarden_storage::{Database, PacketFilter, PacketRecorder, TrustStore};

/// 목적지 포트 443은 Suspicious(1), 9999는 알 수 없는 코드(7), 나머지는 Normal(0)
struct PortModel;

impl BehaviorModel for PortModel {
    fn predict(&self, features: &FeatureVector) -> Result<i64, ModelError> {
        match features.dst_port.as_str() {
            "443" => Ok(1),
            "9999" => Ok(7),
            "6666" => Err(ModelError::Inference("simulated".to_owned())),
            _ => Ok(0),
        }
    }

    fn describe(&self) -> String {
        "port model".to_owned()
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    db_path: std::path::PathBuf,
    trust: TrustStore,
    recorder: PacketRecorder,
    alerts: AlertBus,
    shutdown: CancellationToken,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("lanwarden.db");
        let db = Arc::new(Database::open(&db_path, Duration::from_secs(5)).unwrap());
        Self {
            _dir: dir,
            db_path,
            trust: TrustStore::new(Arc::clone(&db)),
            recorder: PacketRecorder::new(db),
            alerts: AlertBus::new(64),
            shutdown: CancellationToken::new(),
        }
    }

    fn service(&self, frames: Vec<RawFrame>) -> CaptureService {
        let factory: SourceFactory = Arc::new(move |_: &CaptureSettings| {
            Ok(Box::new(MemoryFrameSource::new(frames.clone())) as Box<dyn FrameSource>)
        });
        CaptureService::builder()
            .trust_store(self.trust.clone())
            .recorder(self.recorder.clone())
            .classifier(BehaviorClassifier::new(Arc::new(PortModel)))
            .alert_bus(self.alerts.clone())
            .settings(CaptureSettings::default())
            .source_factory(factory)
            .resolver(Arc::new(NoopResolver))
            .shutdown_token(self.shutdown.clone())
            .build()
            .unwrap()
    }

    fn raw(&self) -> rusqlite::Connection {
        rusqlite::Connection::open(&self.db_path).unwrap()
    }
}

fn mac(s: &str) -> MacAddr {
    s.parse().unwrap()
}

fn tls_from(src: [u8; 6]) -> RawFrame {
    RawFrame::new(tcp_frame(src, 40000, 443, &tls_client_hello("c2.example")))
}

fn dns_from(src: [u8; 6]) -> RawFrame {
    RawFrame::new(udp_frame(src, 40000, 53, &dns_query("example.com")))
}

#[tokio::test]
async fn unseen_device_raises_new_device_alert() {
    let h = Harness::new();
    let mut rx = h.alerts.subscribe();
    let service = h.service(vec![tls_from(SRC_MAC)]);

    let report = service.run(CaptureRequest::default()).await;
    assert!(report.is_success());
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].classification, TrustState::Unknown);
    assert_eq!(report.records[0].behavior_prediction, BehaviorLabel::Suspicious);

    let alert = rx.recv().await.unwrap();
    let payload = serde_json::to_value(alert.payload()).unwrap();
    assert_eq!(payload["mac"], "aa:bb:cc:dd:ee:ff");
    assert_eq!(payload["type"], "New Suspicious Device");
    assert_eq!(
        payload["message"],
        "New device with MAC aa:bb:cc:dd:ee:ff is exhibiting suspicious behavior."
    );
    assert_eq!(payload["time"], report.records[0].observation.time.as_str());
}

#[tokio::test]
async fn trusted_device_raises_existing_device_alert() {
    let h = Harness::new();
    h.trust.trust(&mac("aa:bb:cc:dd:ee:ff")).unwrap();
    let mut rx = h.alerts.subscribe();
    let service = h.service(vec![tls_from(SRC_MAC)]);

    let report = service.run(CaptureRequest::default()).await;
    assert_eq!(report.records[0].classification, TrustState::Trusted);

    let alert = rx.recv().await.unwrap();
    assert_eq!(alert.alarm_type, AlarmType::ExistingDeviceSuspicious);
    assert_eq!(
        alert.message,
        "Device with MAC aa:bb:cc:dd:ee:ff has become suspicious."
    );
}

#[tokio::test]
async fn records_are_persisted_in_capture_order_with_alerts_in_order() {
    let h = Harness::new();
    let mut rx = h.alerts.subscribe();
    let a = [0x02, 0, 0, 0, 0, 0x01];
    let b = [0x02, 0, 0, 0, 0, 0x02];
    let service = h.service(vec![tls_from(a), dns_from(a), tls_from(b), dns_from(b)]);

    let report = service.run(CaptureRequest::default()).await;
    assert_eq!(report.records.len(), 4);

    let stored = h.recorder.query(&PacketFilter::default()).unwrap();
    let protocols: Vec<_> = stored.iter().map(|r| r.ip_proto.as_str()).collect();
    assert_eq!(protocols, vec!["TLS", "DNS", "TLS", "DNS"]);
    assert_eq!(stored[0].behavior_prediction, "Suspicious");
    assert_eq!(stored[1].behavior_prediction, "Normal");

    assert_eq!(rx.recv().await.unwrap().mac, MacAddr::from_octets(a));
    assert_eq!(rx.recv().await.unwrap().mac, MacAddr::from_octets(b));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn unknown_codes_and_inference_failures_become_unknown() {
    let h = Harness::new();
    let service = h.service(vec![
        RawFrame::new(udp_frame(SRC_MAC, 40000, 9999, b"x")),
        RawFrame::new(udp_frame(SRC_MAC, 40000, 6666, b"x")),
    ]);

    let report = service.run(CaptureRequest::default()).await;
    assert!(report.is_success());
    assert!(
        report
            .records
            .iter()
            .all(|r| r.behavior_prediction == BehaviorLabel::Unknown)
    );
}

#[tokio::test]
async fn append_failure_continues_batch_and_still_alerts() {
    let h = Harness::new();
    h.raw().execute_batch("DROP TABLE packets").unwrap();
    let mut rx = h.alerts.subscribe();
    let service = h.service(vec![tls_from(SRC_MAC), dns_from(SRC_MAC), tls_from(SRC_MAC)]);

    let report = service.run(CaptureRequest::default()).await;
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.failures.len(), 3);
    assert_eq!(
        report.failures.iter().map(|f| f.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(report.fault.is_none());

    assert!(rx.recv().await.is_ok());
    assert!(rx.recv().await.is_ok());
}

#[tokio::test]
async fn trust_lookup_failure_skips_only_that_packet() {
    let h = Harness::new();
    h.raw().execute_batch("DROP TABLE blocked_devices").unwrap();
    let service = h.service(vec![dns_from(SRC_MAC), dns_from(SRC_MAC)]);

    let report = service.run(CaptureRequest::default()).await;
    assert!(report.records.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures[0].reason.contains("trust lookup"));
}

#[tokio::test]
async fn capture_fault_keeps_earlier_records() {
    let h = Harness::new();
    let factory: SourceFactory = Arc::new(|_: &CaptureSettings| {
        let source = MemoryFrameSource::new(vec![dns_from(SRC_MAC), dns_from(SRC_MAC), dns_from(SRC_MAC)])
            .fail_after(2, CaptureError::Read("interface went down".to_owned()));
        Ok(Box::new(source) as Box<dyn FrameSource>)
    });
    let service = CaptureService::builder()
        .trust_store(h.trust.clone())
        .recorder(h.recorder.clone())
        .classifier(BehaviorClassifier::new(Arc::new(PortModel)))
        .alert_bus(h.alerts.clone())
        .source_factory(factory)
        .resolver(Arc::new(NoopResolver))
        .build()
        .unwrap();

    let report = service.run(CaptureRequest::default()).await;
    assert_eq!(report.records.len(), 2);
    assert!(matches!(report.fault, Some(CaptureError::Read(_))));
    assert!(!report.is_success());
    assert!(!service.health().is_healthy());
    assert_eq!(h.recorder.count().unwrap(), 2);
}

#[tokio::test]
async fn source_open_failure_is_a_fault() {
    let h = Harness::new();
    let factory: SourceFactory = Arc::new(|s: &CaptureSettings| {
        Err(CaptureError::PermissionDenied {
            interface: s.interface.clone(),
            reason: "operation not permitted".to_owned(),
        })
    });
    let service = CaptureService::builder()
        .trust_store(h.trust.clone())
        .recorder(h.recorder.clone())
        .classifier(BehaviorClassifier::new(Arc::new(PortModel)))
        .alert_bus(h.alerts.clone())
        .source_factory(factory)
        .build()
        .unwrap();

    let report = service.run(CaptureRequest::default()).await;
    assert!(report.records.is_empty());
    assert!(matches!(
        report.fault,
        Some(CaptureError::PermissionDenied { .. })
    ));
}

#[tokio::test]
async fn shutdown_cancels_session_without_partial_records() {
    let h = Harness::new();
    h.shutdown.cancel();
    let service = h.service(vec![dns_from(SRC_MAC); 10]);

    let report = service.run(CaptureRequest::default()).await;
    assert!(report.cancelled);
    assert!(report.records.is_empty());
    assert_eq!(h.recorder.count().unwrap(), 0);
}

#[tokio::test]
async fn request_overrides_packet_count() {
    let h = Harness::new();
    let service = h.service(vec![dns_from(SRC_MAC); 10]);

    let report = service
        .run(CaptureRequest {
            max_packets: Some(4),
            trace_id: Some("trace-1".to_owned()),
        })
        .await;
    assert_eq!(report.records.len(), 4);
}

#[tokio::test]
async fn concurrent_sessions_are_queued() {
    let h = Harness::new();
    let service = Arc::new(h.service(vec![dns_from(SRC_MAC); 5]));

    let (a, b) = tokio::join!(
        service.run(CaptureRequest::default()),
        service.run(CaptureRequest::default())
    );
    assert_eq!(a.records.len() + b.records.len(), 10);
    assert_eq!(h.recorder.count().unwrap(), 10);
}

#[test]
fn builder_requires_components() {
    assert!(CaptureService::builder().build().is_err());
}
