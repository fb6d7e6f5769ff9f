//! 저장 시 암호화하는 저장소 래퍼.

use crate::error::VaultResult;
use crate::store::{CredentialStore, UpdateFn};
use async_trait::async_trait;
use p2p_core::CredentialEncryptor;

/// 내부 저장소에 값을 AES-256-GCM으로 암호화해서 저장합니다.
///
/// 저장 형식은 `base64(nonce || ciphertext)`.
#[derive(Debug)]
pub struct SealedStore<S> {
    inner: S,
    encryptor: CredentialEncryptor,
}

impl<S: CredentialStore> SealedStore<S> {
    pub fn new(inner: S, encryptor: CredentialEncryptor) -> Self {
        Self { inner, encryptor }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: CredentialStore> CredentialStore for SealedStore<S> {
    async fn get(&self, key: &str) -> VaultResult<Option<String>> {
        match self.inner.get(key).await? {
            Some(sealed) => Ok(Some(self.encryptor.open(&sealed)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        let sealed = self.encryptor.seal(value)?;
        self.inner.set(key, &sealed).await
    }

    async fn update(&self, key: &str, apply: UpdateFn<'_>) -> VaultResult<String> {
        let encryptor = &self.encryptor;
        let sealed = self
            .inner
            .update(
                key,
                Box::new(move |current: Option<String>| -> VaultResult<String> {
                    let plain = current.map(|raw| encryptor.open(&raw)).transpose()?;
                    let next = apply(plain)?;
                    Ok(encryptor.seal(&next)?)
                }),
            )
            .await?;
        Ok(self.encryptor.open(&sealed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use crate::store::MemoryStore;
    use p2p_core::crypto::generate_master_key;

    fn sealed() -> SealedStore<MemoryStore> {
        let encryptor = CredentialEncryptor::new(&generate_master_key()).unwrap();
        SealedStore::new(MemoryStore::new(), encryptor)
    }

    #[tokio::test]
    async fn test_values_are_encrypted_at_rest() {
        let store = sealed();
        store.set("p2p_profiles", "secret-value").await.unwrap();

        let raw = store.inner().get("p2p_profiles").await.unwrap().unwrap();
        assert!(!raw.contains("secret-value"));
        assert_eq!(
            store.get("p2p_profiles").await.unwrap().as_deref(),
            Some("secret-value")
        );
    }

    #[tokio::test]
    async fn test_update_sees_and_writes_plaintext() {
        let store = sealed();
        store.set("p2p_profiles", "one").await.unwrap();

        let next = store
            .update(
                "p2p_profiles",
                Box::new(|current: Option<String>| -> VaultResult<String> {
                    Ok(format!("{},two", current.unwrap_or_default()))
                }),
            )
            .await
            .unwrap();
        assert_eq!(next, "one,two");

        let raw = store.inner().get("p2p_profiles").await.unwrap().unwrap();
        assert!(!raw.contains("two"));
        assert_eq!(
            store.get("p2p_profiles").await.unwrap().as_deref(),
            Some("one,two")
        );
    }

    #[tokio::test]
    async fn test_tampered_value_is_storage_error() {
        let store = sealed();
        store.inner().insert_raw("p2p_profiles", "bm90LWEtdmFsaWQtcGF5bG9hZA==").await;

        assert!(matches!(
            store.get("p2p_profiles").await,
            Err(VaultError::Storage(_))
        ));
    }
}
