//! # P2P Vault
//!
//! 거래소 API 자격증명 프로필 저장소.
//!
//! - `CredentialStore`: 교체 가능한 키-값 저장소 trait
//! - `MemoryStore` / `FileStore` / `SealedStore`: 인메모리, 파일, 암호화 래퍼
//! - `CredentialVault`: 프로필 저장, 목록, 조회, 삭제
//! - `ProfileDraft`: 작성 중인 입력 (저장 후 초기화)

pub mod error;
pub mod sealed;
pub mod store;
pub mod vault;

pub use error::{VaultError, VaultResult};
pub use sealed::SealedStore;
pub use store::{CredentialStore, FileStore, MemoryStore, UpdateFn};
pub use vault::{CredentialVault, ProfileDraft, PROFILES_KEY};
