//! 주문 내역 조회 trait.
//!
//! 동기화 엔진은 이 trait을 통해서만 거래소에 접근하므로,
//! 테스트에서는 스크립트된 가짜 구현으로 교체할 수 있습니다.

use crate::error::ExchangeError;
use async_trait::async_trait;
use p2p_core::CredentialProfile;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 한 페이지 조회 조건.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    /// 1부터 시작하는 페이지 번호
    pub page: u32,
    /// 페이지당 행 수
    pub rows: u32,
    /// 조회 시작 시각 (epoch 밀리초)
    pub start_time: Option<i64>,
    /// 조회 종료 시각 (epoch 밀리초)
    pub end_time: Option<i64>,
}

impl PageQuery {
    pub fn new(page: u32, rows: u32) -> Self {
        Self {
            page,
            rows,
            start_time: None,
            end_time: None,
        }
    }
}

/// 한 페이지의 원시 레코드.
///
/// 레코드는 JSON 그대로 보관하며, 개별 레코드의 검증은 정규화 단계에서 수행합니다.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub records: Vec<serde_json::Value>,
    /// 거래소가 보고한 전체 건수
    pub total: Option<u64>,
}

/// P2P 주문 내역 조회 API.
#[async_trait]
pub trait OrderHistoryApi: Send + Sync {
    /// 거래소 이름.
    fn name(&self) -> &str;

    /// 한 페이지를 조회합니다. 호출마다 새 타임스탬프로 서명합니다.
    async fn fetch_page(
        &self,
        credentials: &CredentialProfile,
        query: &PageQuery,
    ) -> ExchangeResult<HistoryPage>;
}
