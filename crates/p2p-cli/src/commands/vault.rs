//! 설정에 따라 자격증명 저장소를 엽니다.

use anyhow::{Context, Result};
use p2p_core::{CredentialEncryptor, VaultConfig};
use p2p_vault::{CredentialStore, CredentialVault, FileStore, SealedStore};
use tracing::{info, warn};

/// CLI가 사용하는 저장소 타입.
pub type CliVault = CredentialVault<Box<dyn CredentialStore>>;

/// 저장소 디렉토리를 엽니다.
///
/// 마스터 키 환경 변수가 설정되어 있으면 값을 암호화해서 저장합니다.
pub fn open_vault(config: &VaultConfig) -> Result<CliVault> {
    let files = FileStore::new(&config.path);

    let store: Box<dyn CredentialStore> = if std::env::var(&config.encryption_key_env).is_ok() {
        let encryptor = CredentialEncryptor::from_env(&config.encryption_key_env)
            .with_context(|| format!("{} 값이 올바르지 않습니다", config.encryption_key_env))?;
        info!(path = %config.path, "Opening encrypted credential vault");
        Box::new(SealedStore::new(files, encryptor))
    } else {
        warn!(
            path = %config.path,
            key_env = %config.encryption_key_env,
            "Master key not set, credentials are stored unencrypted"
        );
        Box::new(files)
    };

    Ok(CredentialVault::new(store))
}
