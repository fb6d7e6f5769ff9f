//! 동기화 중 발견된 비치명적 이상 징후.

use serde::{Deserialize, Serialize};

/// 이상 징후 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// 페이지 응답을 해석할 수 없어 건너뜀
    MalformedPage,
    /// 레코드 검증 실패로 제외됨
    InvalidRecord,
    /// 알 수 없는 주문 상태 (PENDING으로 처리)
    UnknownStatus,
    /// 수수료가 자산 수량보다 큼 (실제 자산 0으로 고정)
    FeeExceedsAmount,
    /// 재시도 소진으로 이후 페이지를 가져오지 못함
    TransientFetch,
    /// 최대 페이지 수에 도달하여 조회를 중단함
    PaginationLimitExceeded,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnomalyKind::MalformedPage => "MALFORMED_PAGE",
            AnomalyKind::InvalidRecord => "INVALID_RECORD",
            AnomalyKind::UnknownStatus => "UNKNOWN_STATUS",
            AnomalyKind::FeeExceedsAmount => "FEE_EXCEEDS_AMOUNT",
            AnomalyKind::TransientFetch => "TRANSIENT_FETCH",
            AnomalyKind::PaginationLimitExceeded => "PAGINATION_LIMIT_EXCEEDED",
        };
        write!(f, "{}", s)
    }
}

/// 이상 징후 보고.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    pub kind: AnomalyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub detail: String,
}

impl AnomalyReport {
    pub fn new(kind: AnomalyKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            page: None,
            order_id: None,
            detail: detail.into(),
        }
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn for_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }
}

impl std::fmt::Display for AnomalyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(page) = self.page {
            write!(f, " page={}", page)?;
        }
        if let Some(order_id) = &self.order_id {
            write!(f, " order={}", order_id)?;
        }
        write!(f, " {}", self.detail)
    }
}
