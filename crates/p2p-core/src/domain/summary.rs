//! 정규화된 주문 집합의 정산 요약.

use super::order::{Order, OrderStatus, TradeType};
use crate::error::{DomainError, DomainResult};
use rust_decimal::Decimal;
use serde::Serialize;

/// 주문 집합 집계 결과.
///
/// 금액 합계는 완료된 주문만 반영합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub total_orders: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub pending: usize,
    /// 매수에 지불한 법정화폐 합계
    pub fiat_bought: Decimal,
    /// 매도로 받은 법정화폐 합계
    pub fiat_sold: Decimal,
    /// 매수한 자산 합계 (수수료 차감 전)
    pub crypto_bought: Decimal,
    /// 매도한 자산 합계
    pub crypto_sold: Decimal,
    /// 수수료 합계
    pub total_fees: Decimal,
    /// 추정 수수료가 적용된 주문 수
    pub imputed_fee_count: usize,
    /// 실제 수령 자산 (완료된 매수의 actual_usdt 합계)
    pub net_asset_received: Decimal,
    /// 실제 송금 자산 (완료된 매도의 crypto_amount 합계)
    pub net_asset_sent: Decimal,
}

impl ReconciliationSummary {
    /// 주문 집합을 집계합니다.
    ///
    /// 합계가 Decimal 표현 범위를 넘으면 [`DomainError::AmountOverflow`]를 반환합니다.
    pub fn from_orders(orders: &[Order]) -> DomainResult<Self> {
        let mut summary = Self {
            total_orders: orders.len(),
            ..Default::default()
        };

        for order in orders {
            match order.status {
                OrderStatus::Pending => summary.pending += 1,
                OrderStatus::Cancelled => summary.cancelled += 1,
                OrderStatus::Completed => {
                    summary.completed += 1;
                    accumulate(&mut summary.total_fees, order.accounting_fee(), "totalFees")?;
                    if order.fee_imputed() {
                        summary.imputed_fee_count += 1;
                    }
                    match order.trade_type {
                        TradeType::Buy => {
                            accumulate(&mut summary.fiat_bought, order.fiat_amount, "fiatBought")?;
                            accumulate(&mut summary.crypto_bought, order.crypto_amount, "cryptoBought")?;
                            accumulate(
                                &mut summary.net_asset_received,
                                order.actual_usdt,
                                "netAssetReceived",
                            )?;
                        }
                        TradeType::Sell => {
                            accumulate(&mut summary.fiat_sold, order.fiat_amount, "fiatSold")?;
                            accumulate(&mut summary.crypto_sold, order.crypto_amount, "cryptoSold")?;
                            accumulate(&mut summary.net_asset_sent, order.crypto_amount, "netAssetSent")?;
                        }
                    }
                }
            }
        }

        Ok(summary)
    }

    /// 순 자산 변동 (수령 - 송금).
    pub fn net_asset_change(&self) -> Decimal {
        self.net_asset_received - self.net_asset_sent
    }
}

fn accumulate(total: &mut Decimal, value: Decimal, field: &str) -> DomainResult<()> {
    *total = total
        .checked_add(value)
        .ok_or_else(|| DomainError::AmountOverflow(field.to_string()))?;
    Ok(())
}
