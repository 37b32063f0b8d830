//! 에러 타입 -- 도메인별 에러 정의
//!
//! 복구 가능한 결함(역방향 DNS 실패, 타임스탬프 파싱 실패, 패킷 단위 추론 실패)은
//! 호출 지점에서 기본값으로 흡수되므로 별도 타입이 없습니다.
//! 여기 정의된 타입은 모두 호출자에게 전달되는 구조적 결함입니다.

/// Lanwarden 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LanwardenError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 패킷 캡처 에러 (인터페이스 없음, 권한 거부 등)
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// 행위 분류 모델 에러
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// 영속화 에러 (신뢰 저장소, 감사 로그)
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 요청 검증 에러
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 캡처 세션을 중단시키는 에러
///
/// 세션 도중 발생하더라도 그 이전까지 캡처된 관측값은 버려지지 않습니다.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    /// 인터페이스를 열 수 없음
    #[error("interface '{interface}' unavailable: {reason}")]
    InterfaceUnavailable { interface: String, reason: String },

    /// 캡처 권한 없음
    #[error("permission denied on '{interface}': {reason}")]
    PermissionDenied { interface: String, reason: String },

    /// BPF 필터 컴파일 실패
    #[error("invalid capture filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// 캡처 도중 읽기 실패
    #[error("capture read failed: {0}")]
    Read(String),

    /// 캡처 스레드 실행 실패
    #[error("capture task failed: {0}")]
    Task(String),
}

/// 분류 모델 에러
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// 시작 시 모델 로드 실패 (서비스 시작 불가)
    #[error("failed to load model from {path}: {reason}")]
    Load { path: String, reason: String },

    /// 단일 패킷 추론 실패 (해당 패킷만 Unknown 처리)
    #[error("inference failed: {0}")]
    Inference(String),
}

/// 영속화 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 데이터베이스 열기 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 쿼리 실패
    #[error("query failed: {0}")]
    Query(String),

    /// 저장된 값이 도메인 타입으로 해석되지 않음
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// 요청 검증 에러 -- 부작용 없이 즉시 클라이언트 에러로 반환됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// 필수 필드 누락
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// 하드웨어 주소 형식 오류
    #[error("invalid hardware address '{0}'")]
    InvalidMac(String),

    /// 허용되지 않은 열거 값
    #[error("invalid value '{value}' for '{field}': expected one of {expected}")]
    InvalidEnum {
        field: String,
        value: String,
        expected: String,
    },

    /// 타임스탬프 형식 오류
    #[error("invalid timestamp '{value}' for '{field}'")]
    InvalidTimestamp { field: String, value: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 동일한 이름의 모듈이 이미 등록됨
    #[error("module already registered: {0}")]
    AlreadyRegistered(String),

    /// 모듈 정지 실패
    #[error("failed to stop modules: {0}")]
    StopFailed(String),
}
