//! 주문 정산 규칙 속성 테스트
//!
//! 임의의 수량/수수료 조합에서 실제 자산 계산과 수수료 추정 규칙을 검증합니다.

use p2p_core::{
    derive_fee, net_asset_amount, FeeOrigin, OrderStatus, TakerFeePolicy, TradeType,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// 소수점 8자리까지의 음이 아닌 Decimal.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000_000).prop_map(|units| Decimal::new(units, 8))
}

/// Decimal 표현 범위 전체에서 뽑은 음이 아닌 값.
fn full_range_amount() -> impl Strategy<Value = Decimal> {
    (any::<u32>(), any::<u32>(), any::<u32>(), 0u32..=28)
        .prop_map(|(lo, mid, hi, scale)| Decimal::from_parts(lo, mid, hi, false, scale))
}

fn any_status() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Completed),
        Just(OrderStatus::Cancelled),
    ]
}

proptest! {
    #[test]
    fn buy_actual_is_amount_minus_fee(crypto in amount(), fee in amount()) {
        prop_assume!(fee <= crypto);
        let actual = net_asset_amount(TradeType::Buy, OrderStatus::Completed, crypto, fee);
        prop_assert_eq!(actual, crypto - fee);
    }

    #[test]
    fn sell_or_cancelled_keeps_full_amount(crypto in amount(), fee in amount(), status in any_status()) {
        prop_assert_eq!(
            net_asset_amount(TradeType::Sell, status, crypto, fee),
            crypto
        );
        prop_assert_eq!(
            net_asset_amount(TradeType::Buy, OrderStatus::Cancelled, crypto, fee),
            crypto
        );
    }

    #[test]
    fn actual_is_never_negative(crypto in amount(), fee in amount(), status in any_status()) {
        let actual = net_asset_amount(TradeType::Buy, status, crypto, fee);
        prop_assert!(actual >= Decimal::ZERO);
        prop_assert!(actual <= crypto);
    }

    #[test]
    fn reported_fee_is_used_as_is(fee in amount(), crypto in amount(), status in any_status()) {
        prop_assume!(!fee.is_zero());
        let (derived, origin) = derive_fee(Some(fee), status, None, crypto, &TakerFeePolicy::default()).unwrap();
        prop_assert_eq!(derived, fee);
        prop_assert_eq!(origin, FeeOrigin::Reported);
    }

    #[test]
    fn completed_taker_zero_fee_is_imputed(crypto in amount()) {
        let (derived, origin) = derive_fee(
            Some(Decimal::ZERO),
            OrderStatus::Completed,
            None,
            crypto,
            &TakerFeePolicy::default(),
        )
        .unwrap();
        prop_assert_eq!(derived, dec!(0.05));
        prop_assert_eq!(origin, FeeOrigin::Imputed);

        let (derived, origin) = derive_fee(
            Some(Decimal::ZERO),
            OrderStatus::Completed,
            Some(true),
            crypto,
            &TakerFeePolicy::default(),
        )
        .unwrap();
        prop_assert_eq!(derived, Decimal::ZERO);
        prop_assert_eq!(origin, FeeOrigin::Maker);
    }
}

#[test]
fn test_fee_larger_than_amount_clamps_to_zero() {
    let actual = net_asset_amount(TradeType::Buy, OrderStatus::Completed, dec!(0.03), dec!(0.05));
    assert_eq!(actual, Decimal::ZERO);
}

proptest! {
    #[test]
    fn rate_fee_never_overflows_and_stays_within_amount(
        crypto in full_range_amount(),
        permille in 0i64..=1000,
    ) {
        let policy = TakerFeePolicy::Rate(Decimal::new(permille, 3));
        let fee = policy.fee_for(crypto);
        prop_assert!(fee.is_some());
        prop_assert!(fee.unwrap_or_default() <= crypto);
    }
}
