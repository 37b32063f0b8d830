//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수로 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `lanwarden_`
//! - 모듈명: `capture_`, `classifier_`, `alerts_`, `storage_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 행위 라벨 레이블 키 (Normal, Suspicious, Unknown)
pub const LABEL_LABEL: &str = "label";

/// 신뢰 변경 레이블 키 (trust, block)
pub const LABEL_ACTION: &str = "action";

/// 결과 레이블 키 (success, fault, cancelled)
pub const LABEL_RESULT: &str = "result";

// ─── Capture 메트릭 ──────────────────────────────────────────────────

/// Capture: 수용된 IP 패킷 수 (counter)
pub const CAPTURE_PACKETS_TOTAL: &str = "lanwarden_capture_packets_total";

/// Capture: Ethernet/IP 계층이 없어 버려진 프레임 수 (counter)
pub const CAPTURE_FRAMES_DROPPED_TOTAL: &str = "lanwarden_capture_frames_dropped_total";

/// Capture: 세션 수 (counter, label: result)
pub const CAPTURE_SESSIONS_TOTAL: &str = "lanwarden_capture_sessions_total";

/// Capture: 세션 소요 시간 (histogram, 초)
pub const CAPTURE_SESSION_DURATION_SECONDS: &str = "lanwarden_capture_session_duration_seconds";

// ─── Classifier 메트릭 ───────────────────────────────────────────────

/// Classifier: 라벨별 예측 수 (counter, label: label)
pub const CLASSIFIER_PREDICTIONS_TOTAL: &str = "lanwarden_classifier_predictions_total";

/// Classifier: 추론 실패 수 (counter)
pub const CLASSIFIER_INFERENCE_FAILURES_TOTAL: &str =
    "lanwarden_classifier_inference_failures_total";

// ─── Alerts 메트릭 ───────────────────────────────────────────────────

/// Alerts: 발행된 알림 수 (counter)
pub const ALERTS_PUBLISHED_TOTAL: &str = "lanwarden_alerts_published_total";

/// Alerts: 구독자가 없어 유실된 알림 수 (counter)
pub const ALERTS_UNDELIVERED_TOTAL: &str = "lanwarden_alerts_undelivered_total";

// ─── Storage 메트릭 ──────────────────────────────────────────────────

/// Storage: 감사 로그에 기록된 레코드 수 (counter)
pub const STORAGE_RECORDS_PERSISTED_TOTAL: &str = "lanwarden_storage_records_persisted_total";

/// Storage: 감사 로그 기록 실패 수 (counter)
pub const STORAGE_PERSIST_FAILURES_TOTAL: &str = "lanwarden_storage_persist_failures_total";

/// Storage: 신뢰 상태 변경 수 (counter, label: action)
pub const STORAGE_TRUST_MUTATIONS_TOTAL: &str = "lanwarden_storage_trust_mutations_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "lanwarden_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "lanwarden_daemon_build_info";

/// 캡처 세션 소요 시간 히스토그램 버킷 (초)
pub const SESSION_DURATION_BUCKETS: [f64; 8] = [0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 전역 레코더 설치 후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        CAPTURE_PACKETS_TOTAL,
        "Total number of IP packets accepted by capture sessions"
    );
    describe_counter!(
        CAPTURE_FRAMES_DROPPED_TOTAL,
        "Frames dropped because they lacked Ethernet or IP layers"
    );
    describe_counter!(
        CAPTURE_SESSIONS_TOTAL,
        "Capture sessions by result (success, fault, cancelled)"
    );
    describe_histogram!(
        CAPTURE_SESSION_DURATION_SECONDS,
        "Wall-clock duration of a capture session in seconds"
    );

    describe_counter!(
        CLASSIFIER_PREDICTIONS_TOTAL,
        "Behavior predictions by label"
    );
    describe_counter!(
        CLASSIFIER_INFERENCE_FAILURES_TOTAL,
        "Per-packet inference failures recorded as Unknown"
    );

    describe_counter!(
        ALERTS_PUBLISHED_TOTAL,
        "Suspicious behavior alerts published to the alert bus"
    );
    describe_counter!(
        ALERTS_UNDELIVERED_TOTAL,
        "Alerts published while no subscriber was connected"
    );

    describe_counter!(
        STORAGE_RECORDS_PERSISTED_TOTAL,
        "Packet records appended to the audit log"
    );
    describe_counter!(
        STORAGE_PERSIST_FAILURES_TOTAL,
        "Packet records that failed to persist"
    );
    describe_counter!(
        STORAGE_TRUST_MUTATIONS_TOTAL,
        "Trust store mutations by action"
    );

    describe_gauge!(DAEMON_UPTIME_SECONDS, "Lanwarden daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
