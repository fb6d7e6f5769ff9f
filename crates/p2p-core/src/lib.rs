//! # P2P Core
//!
//! P2P 주문 정산 시스템의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 워크스페이스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 정규화된 P2P 주문 및 정산 요약
//! - 자격증명 프로필
//! - 이상 징후(anomaly) 보고
//! - 금액 검증 유틸리티
//! - 설정 관리
//! - 로깅 인프라
//! - 자격증명 암호화

pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use crypto::{generate_master_key, CredentialEncryptor, CryptoError};
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
