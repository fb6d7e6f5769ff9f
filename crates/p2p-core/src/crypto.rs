//! # 암호화 모듈
//!
//! AES-256-GCM을 사용한 자격증명 암호화/복호화 기능을 제공합니다.
//!
//! ## 보안 고려사항
//! - 마스터 키는 환경변수에서 로드 (Base64, 32바이트)
//! - 각 암호화마다 고유한 nonce (12바이트) 사용
//! - 저장 형식은 `base64(nonce || ciphertext)` 단일 문자열

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use rand::RngCore;
use thiserror::Error;

/// 암호화 에러
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid master key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Sealed payload too short: {0} bytes")]
    TruncatedPayload(usize),

    #[error("Base64 decode error: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),

    #[error("UTF-8 decode error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error("Master key not configured: {0}")]
    MasterKeyNotConfigured(String),
}

/// AES-256-GCM nonce 크기 (바이트)
pub const NONCE_SIZE: usize = 12;

/// AES-256 키 크기 (바이트)
pub const KEY_SIZE: usize = 32;

/// 자격증명 암호화 관리자
pub struct CredentialEncryptor {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEncryptor")
            .field("cipher", &"***REDACTED***")
            .finish()
    }
}

impl CredentialEncryptor {
    /// Base64로 인코딩된 32바이트 마스터 키로 생성합니다.
    pub fn new(master_key: &str) -> Result<Self, CryptoError> {
        let key_bytes = Self::decode_key(master_key)?;
        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// 환경 변수에서 마스터 키를 읽어 생성합니다.
    pub fn from_env(var_name: &str) -> Result<Self, CryptoError> {
        let key = std::env::var(var_name)
            .map_err(|_| CryptoError::MasterKeyNotConfigured(var_name.to_string()))?;
        Self::new(key.trim())
    }

    fn decode_key(master_key: &str) -> Result<Vec<u8>, CryptoError> {
        let key_bytes = base64::engine::general_purpose::STANDARD.decode(master_key)?;

        if key_bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength(key_bytes.len()));
        }

        Ok(key_bytes)
    }

    fn generate_nonce() -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }

    /// 문자열을 암호화하여 `(ciphertext, nonce)`를 반환합니다.
    pub fn encrypt(&self, plaintext: &str) -> Result<(Vec<u8>, [u8; NONCE_SIZE]), CryptoError> {
        let nonce_bytes = Self::generate_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        Ok((ciphertext, nonce_bytes))
    }

    /// 암호화된 데이터를 복호화합니다.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<String, CryptoError> {
        if nonce.len() != NONCE_SIZE {
            return Err(CryptoError::TruncatedPayload(nonce.len()));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext).map_err(CryptoError::from)
    }

    /// 문자열을 암호화하여 저장용 단일 문자열 `base64(nonce || ciphertext)`로 만듭니다.
    pub fn seal(&self, plaintext: &str) -> Result<String, CryptoError> {
        let (ciphertext, nonce) = self.encrypt(plaintext)?;
        let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(payload))
    }

    /// `seal`로 만든 문자열을 복호화합니다.
    pub fn open(&self, sealed: &str) -> Result<String, CryptoError> {
        let payload = base64::engine::general_purpose::STANDARD.decode(sealed.trim())?;
        if payload.len() <= NONCE_SIZE {
            return Err(CryptoError::TruncatedPayload(payload.len()));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_SIZE);
        self.decrypt(ciphertext, nonce)
    }
}

/// 새로운 마스터 키 생성 (초기 설정용)
///
/// ```
/// let key = p2p_core::crypto::generate_master_key();
/// println!("P2P_VAULT_KEY={}", key);
/// ```
pub fn generate_master_key() -> String {
    let mut key = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    base64::engine::general_purpose::STANDARD.encode(key)
}
