//! 도메인 에러 타입.
//!
//! 외부 입력(거래소 원시 레코드, 사용자 입력)을 도메인 값으로 바꿀 때 발생하는 에러를 정의합니다.

use thiserror::Error;

/// 도메인 검증 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// 필수 필드 누락 또는 빈 값
    #[error("필수 필드 누락: {0}")]
    MissingField(String),

    /// 숫자로 해석할 수 없는 금액
    #[error("잘못된 금액 ({field}): {value}")]
    InvalidAmount { field: String, value: String },

    /// 음수 금액
    #[error("음수 금액 ({field}): {value}")]
    NegativeAmount { field: String, value: String },

    /// 잘못된 타임스탬프
    #[error("잘못된 타임스탬프: {0}")]
    InvalidTimestamp(String),

    /// 알 수 없는 주문 방향
    #[error("알 수 없는 주문 방향: {0}")]
    UnknownSide(String),

    /// 금액 계산이 Decimal 표현 범위를 넘음
    #[error("금액 범위 초과: {0}")]
    AmountOverflow(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// 문제가 된 필드 이름을 반환합니다.
    pub fn field(&self) -> Option<&str> {
        match self {
            DomainError::MissingField(field) | DomainError::AmountOverflow(field) => Some(field),
            DomainError::InvalidAmount { field, .. } | DomainError::NegativeAmount { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_field() {
        let err = DomainError::NegativeAmount {
            field: "amount".to_string(),
            value: "-1".to_string(),
        };
        assert_eq!(err.field(), Some("amount"));

        let err = DomainError::UnknownSide("HOLD".to_string());
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_error_message() {
        let err = DomainError::MissingField("orderNumber".to_string());
        assert_eq!(err.to_string(), "필수 필드 누락: orderNumber");
    }
}
