//! 거래소 연결 및 P2P 주문 동기화.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - OrderHistoryApi trait: 주문 내역 조회 인터페이스
//! - Binance C2C 커넥터 (HMAC-SHA256 서명 REST)
//! - 지수 백오프 재시도
//! - 원시 레코드 정규화 (수수료 추정, 상태 매핑)
//! - OrderSyncEngine: 페이지네이션, 중복 제거, 취소

pub mod connector;
pub mod error;
pub mod normalize;
pub mod retry;
pub mod sync;
pub mod traits;

pub use connector::{BinanceP2pClient, BinanceP2pConfig, BinanceSigner, RawOrderRecord};
pub use error::*;
pub use normalize::{map_status, NormalizedPage, Normalizer};
pub use retry::{with_retry, with_retry_if, RetryConfig, RetryStats};
pub use sync::{dedup_orders, OrderSyncEngine, SyncError, SyncOptions, SyncReport, SyncWindow};
pub use traits::*;

pub use tokio_util::sync::CancellationToken;
