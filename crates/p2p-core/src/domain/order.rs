//! P2P 주문 타입 및 정산 규칙.
//!
//! 이 모듈은 정규화된 P2P 주문과 관련 타입을 정의합니다:
//! - `TradeType` - 거래 방향 (매수/매도)
//! - `OrderStatus` - 주문 결과 (대기/완료/취소)
//! - `FeeOrigin` - 수수료 값의 출처 (보고/추정/메이커)
//! - `TakerFeePolicy` - 수수료가 누락된 테이커 주문에 적용할 기본 수수료
//! - `Order` - 정규화된 주문 엔티티

use crate::error::{DomainError, DomainResult};
use crate::types::{FiatAmount, Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// 거래 방향 (매수 또는 매도).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    /// 매수 (법정화폐 지불, 자산 수령)
    Buy,
    /// 매도 (자산 지불, 법정화폐 수령)
    Sell,
}

impl TradeType {
    /// 거래소 문자열에서 변환합니다. 대소문자를 구분하지 않습니다.
    pub fn from_exchange_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Some(TradeType::Buy),
            "SELL" => Some(TradeType::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeType::Buy => write!(f, "BUY"),
            TradeType::Sell => write!(f, "SELL"),
        }
    }
}

/// 주문 결과 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// 진행 중 (결제 대기, 이의 제기 등 포함)
    Pending,
    /// 거래 완료
    Completed,
    /// 사용자 또는 시스템에 의해 취소됨
    Cancelled,
}

impl OrderStatus {
    /// 주문이 최종 상태인지 확인합니다.
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Completed => write!(f, "COMPLETED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// 수수료 값의 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeOrigin {
    /// 거래소가 0이 아닌 수수료를 보고함
    Reported,
    /// 수수료가 누락되어 기본 테이커 수수료를 추정함
    Imputed,
    /// 메이커 주문이라 수수료 없음
    Maker,
    /// 수수료가 부과되지 않는 상태 (대기/취소)
    None,
}

/// 수수료가 누락된 테이커 주문에 적용할 기본 수수료 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum TakerFeePolicy {
    /// 주문당 고정 수수료 (자산 단위)
    Flat(Decimal),
    /// 자산 수량 대비 비율 (0.001 = 0.1%)
    Rate(Decimal),
}

impl Default for TakerFeePolicy {
    fn default() -> Self {
        TakerFeePolicy::Flat(dec!(0.05))
    }
}

impl TakerFeePolicy {
    /// 주어진 자산 수량에 대한 기본 테이커 수수료를 계산합니다.
    ///
    /// 비율 곱셈이 Decimal 범위를 넘으면 `None`을 반환합니다.
    pub fn fee_for(&self, crypto_amount: Quantity) -> Option<Decimal> {
        match self {
            TakerFeePolicy::Flat(amount) => Some(*amount),
            TakerFeePolicy::Rate(rate) => crypto_amount.checked_mul(*rate).map(|fee| fee.normalize()),
        }
    }
}

/// 원시 수수료, 상태, 메이커 여부로부터 최종 수수료와 출처를 결정합니다.
///
/// - 0이 아닌 수수료가 보고되면 그대로 사용합니다.
/// - 수수료가 없거나 0이고 완료된 주문이면서 메이커가 아니면 기본 테이커 수수료를 추정합니다.
/// - 메이커 주문은 0으로 둡니다.
/// - 대기/취소 주문은 추정하지 않습니다.
///
/// 추정 수수료 계산이 범위를 넘으면 [`DomainError::AmountOverflow`]를 반환합니다.
pub fn derive_fee(
    reported: Option<Decimal>,
    status: OrderStatus,
    is_maker: Option<bool>,
    crypto_amount: Quantity,
    policy: &TakerFeePolicy,
) -> DomainResult<(Decimal, FeeOrigin)> {
    let derived = match reported {
        Some(fee) if !fee.is_zero() => (fee, FeeOrigin::Reported),
        _ if is_maker == Some(true) => (Decimal::ZERO, FeeOrigin::Maker),
        _ if status == OrderStatus::Completed => {
            let fee = policy
                .fee_for(crypto_amount)
                .ok_or_else(|| DomainError::AmountOverflow("commission".to_string()))?;
            (fee, FeeOrigin::Imputed)
        }
        _ => (Decimal::ZERO, FeeOrigin::None),
    };
    Ok(derived)
}

/// 수수료 차감 후 실제 수령 자산을 계산합니다.
///
/// 매수 주문은 `crypto_amount - fee`, 매도 또는 취소 주문은 `crypto_amount`.
/// 수수료가 수량보다 크면 0으로 고정합니다.
pub fn net_asset_amount(
    trade_type: TradeType,
    status: OrderStatus,
    crypto_amount: Quantity,
    fee: Decimal,
) -> Quantity {
    if trade_type == TradeType::Sell || status == OrderStatus::Cancelled {
        return crypto_amount;
    }
    (crypto_amount - fee).max(Decimal::ZERO)
}

/// 정규화된 P2P 주문.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// 거래소 주문 번호 (결과 집합 내 고유 키)
    pub order_id: String,
    /// 거래 방향
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    /// 법정화폐 금액
    pub fiat_amount: FiatAmount,
    /// 자산 수량
    pub crypto_amount: Quantity,
    /// 단가
    pub price: Price,
    /// 수수료 차감 후 실제 자산
    pub actual_usdt: Quantity,
    /// 수수료 (자산 단위)
    pub fee: Decimal,
    /// 수수료 출처
    pub fee_origin: FeeOrigin,
    /// 주문 상태
    pub status: OrderStatus,
    /// 생성 시각 (직렬화 시 epoch 밀리초)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub create_time: DateTime<Utc>,
}

impl Order {
    /// 취소된 주문인지 확인합니다.
    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    /// 수수료가 추정값인지 확인합니다.
    pub fn fee_imputed(&self) -> bool {
        self.fee_origin == FeeOrigin::Imputed
    }

    /// 정산에 반영할 수수료. 취소된 주문은 0입니다.
    pub fn accounting_fee(&self) -> Decimal {
        if self.is_cancelled() {
            Decimal::ZERO
        } else {
            self.fee
        }
    }
}
