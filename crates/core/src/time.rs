//! 타임스탬프 형식 -- 감사 로그와 알림이 공유하는 고정 폭 ISO-8601 표현
//!
//! 저장 형식은 항상 `YYYY-MM-DDTHH:MM:SS.ffffff` (UTC, 26자)입니다.
//! 폭이 고정되어 있으므로 문자열 비교 순서가 시간 순서와 같습니다.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// 저장 타임스탬프 형식 (chrono strftime)
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// 입력으로 허용하는 naive 형식 (소수 초는 선택)
const INPUT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// UTC 시각을 저장 형식 문자열로 변환합니다.
pub fn format_time(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format(TIME_FORMAT).to_string()
}

/// 현재 시각을 저장 형식으로 반환합니다.
pub fn now_string() -> String {
    format_time(Utc::now())
}

/// 타임스탬프 문자열을 해석합니다.
///
/// 저장 형식, 공백 구분 형식, RFC 3339, 날짜만(`YYYY-MM-DD`, 자정으로 해석)을 허용합니다.
/// 오프셋이 없는 값은 UTC로 간주합니다.
pub fn parse_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for fmt in INPUT_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// 입력 타임스탬프를 저장 형식으로 정규화합니다.
///
/// 해석할 수 없으면 `None`을 반환합니다.
pub fn normalize_time(value: &str) -> Option<String> {
    parse_time(value).map(|t| t.format(TIME_FORMAT).to_string())
}

/// 타임스탬프를 POSIX 초(소수 포함)로 변환합니다.
///
/// 해석할 수 없는 값은 에러 없이 `0.0`이 됩니다.
pub fn posix_seconds(value: &str) -> f64 {
    match parse_time(value) {
        Some(t) => {
            let utc = t.and_utc();
            #[allow(clippy::cast_precision_loss)]
            let secs = utc.timestamp() as f64;
            secs + f64::from(utc.timestamp_subsec_micros()) / 1_000_000.0
        }
        None => 0.0,
    }
}
