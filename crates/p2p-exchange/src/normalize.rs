//! 원시 주문 레코드 정규화.
//!
//! 검증 → 파생(실제 자산, 수수료 추정, 상태 매핑) 순서로 처리합니다.
//! 검증에 실패한 레코드는 제외하고 `InvalidRecord` 이상 징후로 보고합니다.

use crate::connector::binance_p2p::{FlexValue, RawOrderRecord};
use chrono::{TimeZone, Utc};
use p2p_core::{
    derive_fee, net_asset_amount, parse_amount, parse_optional_amount, AnomalyKind,
    AnomalyReport, DomainError, DomainResult, Order, OrderStatus, TakerFeePolicy, TradeType,
};
use tracing::warn;

/// 거래소 상태 코드를 주문 상태로 매핑합니다. 알 수 없으면 `None`.
pub fn map_status(code: &str) -> Option<OrderStatus> {
    match code.trim().to_uppercase().as_str() {
        "COMPLETED" => Some(OrderStatus::Completed),
        "CANCELLED" | "CANCELLED_BY_SYSTEM" => Some(OrderStatus::Cancelled),
        "PENDING" | "TRADING" | "BUYER_PAYED" | "DISTRIBUTING" | "IN_APPEAL" => {
            Some(OrderStatus::Pending)
        }
        _ => None,
    }
}

/// 광고 역할에서 메이커 여부를 판단합니다. 알 수 없으면 `None`.
fn maker_flag(role: Option<&str>) -> Option<bool> {
    match role.map(|r| r.trim().to_uppercase()) {
        Some(r) if r == "MAKER" => Some(true),
        Some(r) if r == "TAKER" => Some(false),
        _ => None,
    }
}

fn required_text(field: &str, value: Option<&FlexValue>) -> DomainResult<String> {
    value
        .map(FlexValue::as_text)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| DomainError::MissingField(field.to_string()))
}

/// 한 페이지 정규화 결과.
#[derive(Debug, Default)]
pub struct NormalizedPage {
    pub orders: Vec<Order>,
    pub anomalies: Vec<AnomalyReport>,
}

/// 원시 레코드를 `Order`로 바꾸는 정규화기.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    fee_policy: TakerFeePolicy,
}

impl Normalizer {
    pub fn new(fee_policy: TakerFeePolicy) -> Self {
        Self { fee_policy }
    }

    pub fn fee_policy(&self) -> &TakerFeePolicy {
        &self.fee_policy
    }

    /// 페이지의 모든 레코드를 정규화합니다. 레코드 순서는 유지됩니다.
    pub fn normalize_page(&self, page: u32, records: &[serde_json::Value]) -> NormalizedPage {
        let mut result = NormalizedPage::default();

        for (index, value) in records.iter().enumerate() {
            let raw: RawOrderRecord = match serde_json::from_value(value.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    let anomaly = AnomalyReport::new(
                        AnomalyKind::InvalidRecord,
                        format!("record #{}: {}", index, e),
                    )
                    .on_page(page);
                    warn!(%anomaly, "Dropping undecodable record");
                    result.anomalies.push(anomaly);
                    continue;
                }
            };

            match self.normalize_record(&raw) {
                Ok((order, anomalies)) => {
                    for anomaly in anomalies {
                        let anomaly = anomaly.on_page(page);
                        warn!(%anomaly, "Order anomaly");
                        result.anomalies.push(anomaly);
                    }
                    result.orders.push(order);
                }
                Err(e) => {
                    let mut anomaly =
                        AnomalyReport::new(AnomalyKind::InvalidRecord, e.to_string()).on_page(page);
                    if let Some(id) = raw.order_number.as_ref().map(FlexValue::as_text) {
                        anomaly = anomaly.for_order(id);
                    }
                    warn!(%anomaly, "Dropping invalid record");
                    result.anomalies.push(anomaly);
                }
            }
        }

        result
    }

    /// 단일 레코드를 검증하고 파생 필드를 계산합니다.
    ///
    /// 레코드는 유지하되 주의가 필요한 경우(알 수 없는 상태, 수수료 초과) 이상 징후를 함께 반환합니다.
    pub fn normalize_record(
        &self,
        raw: &RawOrderRecord,
    ) -> DomainResult<(Order, Vec<AnomalyReport>)> {
        let order_id = required_text("orderNumber", raw.order_number.as_ref())?;
        let mut anomalies = Vec::new();

        let side = raw
            .trade_type
            .as_deref()
            .ok_or_else(|| DomainError::MissingField("tradeType".to_string()))?;
        let trade_type =
            TradeType::from_exchange_str(side).ok_or_else(|| DomainError::UnknownSide(side.to_string()))?;

        let fiat_amount = parse_amount(
            "totalPrice",
            &required_text("totalPrice", raw.total_price.as_ref())?,
        )?;
        let crypto_amount = parse_amount("amount", &required_text("amount", raw.amount.as_ref())?)?;
        let price = parse_amount(
            "unitPrice",
            &required_text("unitPrice", raw.unit_price.as_ref())?,
        )?;
        let commission_text = raw.commission.as_ref().map(FlexValue::as_text);
        let reported_fee = parse_optional_amount(
            "commission",
            commission_text.as_deref().filter(|s| !s.trim().is_empty()),
        )?;

        let create_time_text = required_text("createTime", raw.create_time.as_ref())?;
        let create_ms: i64 = create_time_text
            .trim()
            .parse()
            .map_err(|_| DomainError::InvalidTimestamp(create_time_text.clone()))?;
        if create_ms < 0 {
            return Err(DomainError::InvalidTimestamp(create_time_text));
        }
        let create_time = Utc
            .timestamp_millis_opt(create_ms)
            .single()
            .ok_or_else(|| DomainError::InvalidTimestamp(create_time_text.clone()))?;

        let status_code = raw
            .order_status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DomainError::MissingField("orderStatus".to_string()))?;
        let status = match map_status(status_code) {
            Some(status) => status,
            None => {
                anomalies.push(
                    AnomalyReport::new(
                        AnomalyKind::UnknownStatus,
                        format!("unknown status {}, treated as PENDING", status_code),
                    )
                    .for_order(order_id.clone()),
                );
                OrderStatus::Pending
            }
        };

        let (fee, fee_origin) = derive_fee(
            reported_fee,
            status,
            maker_flag(raw.advertisement_role.as_deref()),
            crypto_amount,
            &self.fee_policy,
        )?;

        let actual_usdt = net_asset_amount(trade_type, status, crypto_amount, fee);
        if trade_type == TradeType::Buy && status != OrderStatus::Cancelled && fee > crypto_amount {
            anomalies.push(
                AnomalyReport::new(
                    AnomalyKind::FeeExceedsAmount,
                    format!("fee {} exceeds amount {}", fee, crypto_amount),
                )
                .for_order(order_id.clone()),
            );
        }

        let order = Order {
            order_id,
            trade_type,
            fiat_amount,
            crypto_amount,
            price,
            actual_usdt,
            fee,
            fee_origin,
            status,
            create_time,
        };

        Ok((order, anomalies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p2p_core::FeeOrigin;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn record(overrides: serde_json::Value) -> serde_json::Value {
        let mut base = json!({
            "orderNumber": "20000000000000000001",
            "tradeType": "BUY",
            "asset": "USDT",
            "fiat": "KRW",
            "amount": "100",
            "totalPrice": "140000",
            "unitPrice": "1400",
            "orderStatus": "COMPLETED",
            "createTime": 1_700_000_000_000i64,
            "commission": "0"
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        base
    }

    fn normalize_one(value: serde_json::Value) -> NormalizedPage {
        Normalizer::default().normalize_page(1, &[value])
    }

    #[test]
    fn test_map_status() {
        assert_eq!(map_status("COMPLETED"), Some(OrderStatus::Completed));
        assert_eq!(map_status("cancelled_by_system"), Some(OrderStatus::Cancelled));
        assert_eq!(map_status("BUYER_PAYED"), Some(OrderStatus::Pending));
        assert_eq!(map_status("IN_APPEAL"), Some(OrderStatus::Pending));
        assert_eq!(map_status("FROZEN"), None);
    }

    #[test]
    fn test_completed_taker_buy_gets_imputed_fee() {
        let page = normalize_one(record(json!({})));
        assert!(page.anomalies.is_empty());

        let order = &page.orders[0];
        assert_eq!(order.fee, dec!(0.05));
        assert_eq!(order.fee_origin, FeeOrigin::Imputed);
        assert_eq!(order.actual_usdt, dec!(99.95));
    }

    #[test]
    fn test_maker_keeps_zero_fee() {
        let page = normalize_one(record(json!({ "advertisementRole": "MAKER" })));
        let order = &page.orders[0];
        assert_eq!(order.fee, Decimal::ZERO);
        assert_eq!(order.fee_origin, FeeOrigin::Maker);
        assert_eq!(order.actual_usdt, dec!(100));
    }

    #[test]
    fn test_reported_fee_and_sell() {
        let page = normalize_one(record(json!({ "tradeType": "SELL", "commission": "0.1" })));
        let order = &page.orders[0];
        assert_eq!(order.trade_type, TradeType::Sell);
        assert_eq!(order.fee, dec!(0.1));
        assert_eq!(order.fee_origin, FeeOrigin::Reported);
        assert_eq!(order.actual_usdt, dec!(100));
    }

    #[test]
    fn test_cancelled_order_is_not_imputed() {
        let page = normalize_one(record(json!({ "orderStatus": "CANCELLED", "commission": null })));
        let order = &page.orders[0];
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.fee, Decimal::ZERO);
        assert_eq!(order.actual_usdt, dec!(100));
    }

    #[test]
    fn test_unknown_status_is_kept_as_pending() {
        let page = normalize_one(record(json!({ "orderStatus": "FROZEN" })));
        assert_eq!(page.orders.len(), 1);
        assert_eq!(page.orders[0].status, OrderStatus::Pending);
        assert_eq!(page.anomalies.len(), 1);
        assert_eq!(page.anomalies[0].kind, AnomalyKind::UnknownStatus);
        assert_eq!(page.anomalies[0].page, Some(1));
    }

    #[test]
    fn test_fee_exceeding_amount_is_clamped() {
        let page = normalize_one(record(json!({ "amount": "0.02", "commission": "0.05" })));
        assert_eq!(page.orders[0].actual_usdt, Decimal::ZERO);
        assert_eq!(page.anomalies[0].kind, AnomalyKind::FeeExceedsAmount);
    }

    #[test]
    fn test_invalid_records_are_dropped() {
        let cases = [
            json!({ "orderNumber": null }),
            json!({ "tradeType": "HOLD" }),
            json!({ "amount": "NaN" }),
            json!({ "unitPrice": "-3" }),
            json!({ "createTime": "yesterday" }),
            json!({ "createTime": -5 }),
        ];
        for overrides in cases {
            let page = normalize_one(record(overrides.clone()));
            assert!(page.orders.is_empty(), "{} should be dropped", overrides);
            assert_eq!(page.anomalies.len(), 1);
            assert_eq!(page.anomalies[0].kind, AnomalyKind::InvalidRecord);
        }
    }

    #[test]
    fn test_undecodable_record() {
        let page = normalize_one(json!("not an object"));
        assert!(page.orders.is_empty());
        assert_eq!(page.anomalies[0].kind, AnomalyKind::InvalidRecord);
    }

    #[test]
    fn test_numeric_fields_as_numbers() {
        let page = normalize_one(record(json!({
            "amount": 50.5,
            "totalPrice": 70700,
            "unitPrice": 1400,
            "commission": 0.1
        })));
        let order = &page.orders[0];
        assert_eq!(order.crypto_amount, dec!(50.5));
        assert_eq!(order.actual_usdt, dec!(50.4));
    }
}
