//! 정밀한 금융 계산을 위한 Decimal 유틸리티.
//!
//! 거래소가 내려주는 금액 문자열은 신뢰할 수 없는 입력이므로,
//! 도메인에 들어오기 전에 반드시 이 모듈의 함수로 검증합니다.

use crate::error::{DomainError, DomainResult};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 자산(코인) 수량 타입.
pub type Quantity = Decimal;

/// 법정화폐 금액 타입.
pub type FiatAmount = Decimal;

/// 금액 문자열을 유한한 음이 아닌 Decimal로 파싱합니다.
///
/// `"12.50"`, `" 3 "`, `"1e-3"` 형식을 허용하며 `NaN`, `inf`, 음수는 거부합니다.
pub fn parse_amount(field: &str, raw: &str) -> DomainResult<Decimal> {
    let trimmed = raw.trim();
    let invalid = || DomainError::InvalidAmount {
        field: field.to_string(),
        value: raw.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid());
    }

    let value = if trimmed.contains(|c: char| c == 'e' || c == 'E') {
        Decimal::from_scientific(trimmed).map_err(|_| invalid())?
    } else {
        Decimal::from_str(trimmed).map_err(|_| invalid())?
    };

    if value < Decimal::ZERO {
        return Err(DomainError::NegativeAmount {
            field: field.to_string(),
            value: raw.to_string(),
        });
    }

    // "-0" 같은 입력의 부호 비트 제거
    Ok(value.abs().normalize())
}

/// 선택적 금액 필드를 파싱합니다. 없으면 `None`.
pub fn parse_optional_amount(field: &str, raw: Option<&str>) -> DomainResult<Option<Decimal>> {
    raw.map(|r| parse_amount(field, r)).transpose()
}
