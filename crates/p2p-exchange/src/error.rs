//! 거래소 에러 타입.

use thiserror::Error;

/// 거래소 요청 단위 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 인증/권한 에러
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 요청 한도 초과
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 서버 에러 (5xx)
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// API 에러 코드
    #[error("API error {code}: {message}")]
    ApiError { code: i64, message: String },

    /// 응답 페이지를 해석할 수 없음
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// 타임스탬프 동기화 에러
    #[error("Timestamp error: {0}")]
    TimestampError(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 알 수 없는 에러
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    ///
    /// `TimestampError`는 재시도 시 새 타임스탬프로 다시 서명되므로 재시도 대상입니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::NetworkError(_)
                | ExchangeError::RateLimited
                | ExchangeError::ServerError { .. }
                | ExchangeError::Timeout(_)
                | ExchangeError::TimestampError(_)
        )
    }

    /// 인증 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ExchangeError::Unauthorized(_))
    }

    /// 페이지 응답 형식 에러인지 확인.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ExchangeError::MalformedPayload(_))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() || err.is_body() || err.is_decode() {
            // 본문 수신 중 연결이 끊기면 body/decode 에러로 보고됩니다.
            ExchangeError::NetworkError(err.to_string())
        } else {
            ExchangeError::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::MalformedPayload(err.to_string())
    }
}
