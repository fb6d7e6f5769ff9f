//! P2P 주문 내역 동기화 엔진.
//!
//! 페이지를 1부터 순차적으로 조회하고, 각 페이지를 정규화한 뒤
//! 주문 번호 기준으로 중복을 제거하여 `SyncReport`를 만듭니다.
//!
//! # 실패 처리
//! - 인증 실패: 즉시 전체 실패 (`SyncError::Authentication`)
//! - 첫 페이지를 받기 전에 재시도 소진: 전체 실패 (`SyncError::TransientFetch`)
//! - 이후 페이지 재시도 소진: 조회 중단, 이전 결과 유지 + `TransientFetch` 이상 징후
//! - 형식이 잘못된 페이지: 건너뛰고 다음 페이지 계속 + `MalformedPage` 이상 징후
//! - `max_pages` 도달: 조회 중단 + `PaginationLimitExceeded` 이상 징후

use crate::normalize::Normalizer;
use crate::retry::{with_retry, RetryConfig};
use crate::traits::{OrderHistoryApi, PageQuery};
use chrono::{DateTime, Utc};
use p2p_core::{
    sync_span, AnomalyKind, AnomalyReport, AppConfig, CredentialProfile, DomainResult, Order,
    ReconciliationSummary, TakerFeePolicy,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

/// 동기화 실패.
#[derive(Debug, Error)]
pub enum SyncError {
    /// 자격증명이 비어 있거나 거래소가 거부함
    #[error("인증 실패: {0}")]
    Authentication(String),

    /// 첫 페이지 조회 실패 (재시도 소진)
    #[error("페이지 {page} 조회 실패 ({attempts}회 시도): {message}")]
    TransientFetch {
        page: u32,
        attempts: u32,
        message: String,
    },

    /// 호출자가 취소함
    #[error("동기화 취소됨 ({pages_fetched}페이지 조회 후)")]
    Cancelled { pages_fetched: u32 },

    /// 잘못된 동기화 설정
    #[error("설정 오류: {0}")]
    Config(String),
}

/// 동기화 옵션.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// 페이지당 행 수
    pub page_size: u32,
    /// 최대 페이지 수
    pub max_pages: u32,
    /// 페이지 단위 재시도 설정
    pub retry: RetryConfig,
    /// 테이커 수수료 추정 정책
    pub fee_policy: TakerFeePolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 50,
            retry: RetryConfig::default(),
            fee_policy: TakerFeePolicy::default(),
        }
    }
}

impl SyncOptions {
    /// 애플리케이션 설정에서 옵션을 만듭니다.
    pub fn from_config(config: &AppConfig) -> Result<Self, SyncError> {
        let fee_policy = config
            .fees
            .policy()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        Self {
            page_size: config.sync.page_size,
            max_pages: config.sync.max_pages,
            retry: RetryConfig::from(&config.sync.retry),
            fee_policy,
        }
        .validated()
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fee_policy(mut self, fee_policy: TakerFeePolicy) -> Self {
        self.fee_policy = fee_policy;
        self
    }

    fn validated(self) -> Result<Self, SyncError> {
        if self.page_size == 0 {
            return Err(SyncError::Config("page_size must be greater than 0".into()));
        }
        if self.max_pages == 0 {
            return Err(SyncError::Config("max_pages must be greater than 0".into()));
        }
        Ok(self)
    }
}

/// 조회 기간 (생략 시 거래소 기본 범위).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// 동기화 결과.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// 중복 제거된 주문 (처음 등장한 순서)
    pub orders: Vec<Order>,
    /// 수집된 이상 징후
    pub anomalies: Vec<AnomalyReport>,
    /// 응답을 받은 페이지 수
    pub pages_fetched: u32,
}

impl SyncReport {
    /// 일부 페이지를 가져오지 못했는지 확인합니다.
    pub fn is_partial(&self) -> bool {
        self.anomalies.iter().any(|a| {
            matches!(
                a.kind,
                AnomalyKind::TransientFetch
                    | AnomalyKind::PaginationLimitExceeded
                    | AnomalyKind::MalformedPage
            )
        })
    }

    /// 정산 요약. 합계가 Decimal 범위를 넘으면 에러입니다.
    pub fn summary(&self) -> DomainResult<ReconciliationSummary> {
        ReconciliationSummary::from_orders(&self.orders)
    }
}

/// 주문 번호 기준 중복 제거.
///
/// 같은 번호가 여러 번 나오면 마지막에 가져온 내용을 처음 등장한 위치에 둡니다.
pub fn dedup_orders(orders: Vec<Order>) -> Vec<Order> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(orders.len());
    let mut unique: Vec<Order> = Vec::with_capacity(orders.len());

    for order in orders {
        match positions.get(&order.order_id) {
            Some(&index) => unique[index] = order,
            None => {
                positions.insert(order.order_id.clone(), unique.len());
                unique.push(order);
            }
        }
    }

    unique
}

/// P2P 주문 동기화 엔진.
///
/// 엔진은 변경 가능한 상태를 갖지 않으므로 여러 프로필에 대해 동시에 호출할 수 있습니다.
pub struct OrderSyncEngine<A> {
    api: A,
    options: SyncOptions,
    normalizer: Normalizer,
}

impl<A: OrderHistoryApi> OrderSyncEngine<A> {
    pub fn new(api: A, options: SyncOptions) -> Self {
        let normalizer = Normalizer::new(options.fee_policy);
        Self {
            api,
            options,
            normalizer,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// 프로필의 전체 주문 내역을 동기화합니다.
    pub async fn sync(&self, profile: &CredentialProfile) -> Result<SyncReport, SyncError> {
        self.sync_with_cancel(profile, &CancellationToken::new())
            .await
    }

    /// 취소 토큰과 함께 동기화합니다. 토큰은 각 페이지 요청 전에 확인합니다.
    pub async fn sync_with_cancel(
        &self,
        profile: &CredentialProfile,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        self.sync_window(profile, SyncWindow::default(), cancel)
            .await
    }

    /// 기간을 지정해 동기화합니다.
    pub async fn sync_window(
        &self,
        profile: &CredentialProfile,
        window: SyncWindow,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let span = sync_span!("order_sync", profile.name);
        self.run(profile, window, cancel).instrument(span).await
    }

    async fn run(
        &self,
        profile: &CredentialProfile,
        window: SyncWindow,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        if profile.public_key.trim().is_empty()
            || profile.private_key().expose_secret().trim().is_empty()
        {
            warn!("Empty API key or secret, refusing to sync");
            return Err(SyncError::Authentication(
                "API 키 또는 시크릿이 비어 있음".to_string(),
            ));
        }

        let rows = self.options.page_size;
        let max_pages = self.options.max_pages;
        let mut fetched: Vec<Order> = Vec::new();
        let mut anomalies: Vec<AnomalyReport> = Vec::new();
        let mut pages_fetched = 0u32;

        info!(
            exchange = self.api.name(),
            page_size = rows,
            max_pages = max_pages,
            "Order sync started"
        );

        for page in 1..=max_pages {
            if cancel.is_cancelled() {
                info!(pages_fetched, "Order sync cancelled");
                return Err(SyncError::Cancelled { pages_fetched });
            }

            let query = PageQuery {
                page,
                rows,
                start_time: window.start.map(|t| t.timestamp_millis()),
                end_time: window.end.map(|t| t.timestamp_millis()),
            };

            let (result, stats) =
                with_retry(&self.options.retry, || self.api.fetch_page(profile, &query)).await;

            let history = match result {
                Ok(history) => history,
                Err(e) if e.is_auth_error() => {
                    warn!(page, error = %e, "Authentication rejected by exchange");
                    return Err(SyncError::Authentication(e.to_string()));
                }
                Err(e) if e.is_malformed() => {
                    pages_fetched += 1;
                    let anomaly = AnomalyReport::new(AnomalyKind::MalformedPage, e.to_string())
                        .on_page(page);
                    warn!(%anomaly, "Skipping malformed page");
                    anomalies.push(anomaly);
                    // 건너뛴 페이지는 가득 찼는지 알 수 없으므로 뒤에 더 있다고 봅니다.
                    if page == max_pages {
                        anomalies.push(pagination_limit_anomaly(page, max_pages));
                    }
                    continue;
                }
                Err(e) => {
                    if pages_fetched == 0 {
                        return Err(SyncError::TransientFetch {
                            page,
                            attempts: stats.attempts,
                            message: e.to_string(),
                        });
                    }
                    let anomaly = AnomalyReport::new(
                        AnomalyKind::TransientFetch,
                        format!("gave up after {} attempts: {}", stats.attempts, e),
                    )
                    .on_page(page);
                    warn!(%anomaly, "Stopping sync with partial results");
                    anomalies.push(anomaly);
                    break;
                }
            };

            pages_fetched += 1;
            let record_count = history.records.len();
            let normalized = self.normalizer.normalize_page(page, &history.records);
            fetched.extend(normalized.orders);
            anomalies.extend(normalized.anomalies);

            if record_count < rows as usize {
                break;
            }
            if page == max_pages {
                anomalies.push(pagination_limit_anomaly(page, max_pages));
            }
        }

        let orders = dedup_orders(fetched);
        info!(
            orders = orders.len(),
            anomalies = anomalies.len(),
            pages_fetched,
            "Order sync finished"
        );

        Ok(SyncReport {
            orders,
            anomalies,
            pages_fetched,
        })
    }
}

fn pagination_limit_anomaly(page: u32, max_pages: u32) -> AnomalyReport {
    let anomaly = AnomalyReport::new(
        AnomalyKind::PaginationLimitExceeded,
        format!("stopped at max_pages={} with more pages possibly remaining", max_pages),
    )
    .on_page(page);
    warn!(%anomaly, "Pagination limit reached");
    anomaly
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use p2p_core::{FeeOrigin, OrderStatus, TradeType};
    use rust_decimal_macros::dec;

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            order_id: id.to_string(),
            trade_type: TradeType::Buy,
            fiat_amount: dec!(1400),
            crypto_amount: dec!(1),
            price: dec!(1400),
            actual_usdt: dec!(1),
            fee: dec!(0),
            fee_origin: FeeOrigin::None,
            status,
            create_time: Utc.timestamp_millis_opt(0).unwrap(),
        }
    }

    #[test]
    fn test_dedup_keeps_first_position_last_content() {
        let orders = vec![
            order("1", OrderStatus::Pending),
            order("2", OrderStatus::Completed),
            order("1", OrderStatus::Completed),
        ];

        let unique = dedup_orders(orders);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].order_id, "1");
        assert_eq!(unique[0].status, OrderStatus::Completed);
        assert_eq!(unique[1].order_id, "2");
    }

    #[test]
    fn test_report_partial_flag() {
        let mut report = SyncReport::default();
        assert!(!report.is_partial());

        report
            .anomalies
            .push(AnomalyReport::new(AnomalyKind::UnknownStatus, "x"));
        assert!(!report.is_partial());

        report
            .anomalies
            .push(AnomalyReport::new(AnomalyKind::PaginationLimitExceeded, "y"));
        assert!(report.is_partial());
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AppConfig::default();
        config.sync.page_size = 20;
        config.fees.mode = "rate".to_string();
        config.fees.default_taker_fee = dec!(0.001);

        let options = SyncOptions::from_config(&config).unwrap();
        assert_eq!(options.page_size, 20);
        assert_eq!(options.retry.max_attempts, 3);
        assert_eq!(options.fee_policy, TakerFeePolicy::Rate(dec!(0.001)));

        config.sync.max_pages = 0;
        assert!(matches!(
            SyncOptions::from_config(&config),
            Err(SyncError::Config(_))
        ));
    }
}
