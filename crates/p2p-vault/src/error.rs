//! 자격증명 저장소 에러 타입.

use p2p_core::{CryptoError, DomainError};
use thiserror::Error;

/// 자격증명 저장소 에러.
#[derive(Debug, Error)]
pub enum VaultError {
    /// 입력 검증 실패 (빈 필드)
    #[error("입력 검증 실패: {0}")]
    Validation(#[from] DomainError),

    /// 저장된 프로필 없음
    #[error("프로필을 찾을 수 없음: {0}")]
    NotFound(String),

    /// 저장소 접근 실패 또는 데이터 손상
    #[error("저장소 오류: {0}")]
    Storage(String),
}

impl VaultError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::NotFound(_))
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Storage(format!("프로필 목록 해석 실패: {}", err))
    }
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        VaultError::Storage(format!("암호화 처리 실패: {}", err))
    }
}

/// 저장소 작업을 위한 Result 타입.
pub type VaultResult<T> = Result<T, VaultError>;
