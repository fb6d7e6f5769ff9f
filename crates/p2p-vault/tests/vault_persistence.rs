//! 파일 저장소 기반 프로필 저장소 통합 테스트
//!
//! 프로세스 재시작(새 인스턴스)과 동시 저장 상황을 검증합니다.

use p2p_core::crypto::generate_master_key;
use p2p_core::{CredentialEncryptor, CredentialProfile};
use p2p_vault::{CredentialStore, CredentialVault, FileStore, SealedStore, PROFILES_KEY};
use std::path::PathBuf;
use std::sync::Arc;

/// 테스트마다 고유한 임시 디렉토리.
struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("p2p-vault-{}", uuid::Uuid::new_v4()));
        Self(dir)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[tokio::test]
async fn test_profiles_survive_restart() {
    let dir = TempDir::new();
    let profile = CredentialProfile::new("acct1", "pk", "sk");

    {
        let vault = CredentialVault::new(FileStore::new(&dir.0));
        vault.save(&profile).await.unwrap();
    }

    let reopened = CredentialVault::new(FileStore::new(&dir.0));
    assert_eq!(reopened.retrieve("acct1").await.unwrap(), profile);
    assert_eq!(reopened.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_directory_lists_nothing() {
    let dir = TempDir::new();
    let vault = CredentialVault::new(FileStore::new(&dir.0));

    assert!(vault.list().await.unwrap().is_empty());
    assert!(vault.retrieve("acct1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_concurrent_saves_keep_every_profile() {
    let dir = TempDir::new();
    let vault = Arc::new(CredentialVault::new(FileStore::new(&dir.0)));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let vault = Arc::clone(&vault);
            tokio::spawn(async move {
                let profile =
                    CredentialProfile::new(format!("acct{}", i), format!("pk{}", i), "sk");
                vault.save(&profile).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let summaries = vault.list().await.unwrap();
    assert_eq!(summaries.len(), 16);
    for i in 0..16 {
        let profile = vault.retrieve(&format!("acct{}", i)).await.unwrap();
        assert_eq!(profile.public_key, format!("pk{}", i));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_separate_vaults_on_one_directory_keep_every_save() {
    let dir = TempDir::new();
    let first = Arc::new(CredentialVault::new(FileStore::new(&dir.0)));
    let second = Arc::new(CredentialVault::new(FileStore::new(&dir.0)));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let vault = if i % 2 == 0 {
                Arc::clone(&first)
            } else {
                Arc::clone(&second)
            };
            tokio::spawn(async move {
                let profile =
                    CredentialProfile::new(format!("acct{}", i), format!("pk{}", i), "sk");
                vault.save(&profile).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reopened = CredentialVault::new(FileStore::new(&dir.0));
    assert_eq!(reopened.list().await.unwrap().len(), 20);
    for i in 0..20 {
        assert!(reopened.retrieve(&format!("acct{}", i)).await.is_ok());
    }

    let leftovers: Vec<_> = std::fs::read_dir(&dir.0)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_save_and_remove_across_vaults() {
    let dir = TempDir::new();
    let first = CredentialVault::new(FileStore::new(&dir.0));
    let second = CredentialVault::new(FileStore::new(&dir.0));
    first
        .save(&CredentialProfile::new("old", "pk-old", "sk"))
        .await
        .unwrap();

    let new_profile = CredentialProfile::new("new", "pk-new", "sk");
    let (saved, removed) = tokio::join!(
        first.save(&new_profile),
        second.remove("old"),
    );
    saved.unwrap();
    removed.unwrap();

    let names: Vec<_> = second
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["new"]);
}

#[tokio::test]
async fn test_sealed_file_store_hides_secrets_on_disk() {
    let dir = TempDir::new();
    let key = generate_master_key();
    let profile = CredentialProfile::new("acct1", "public-key-123", "secret-key-456");

    {
        let store = SealedStore::new(FileStore::new(&dir.0), CredentialEncryptor::new(&key).unwrap());
        CredentialVault::new(store).save(&profile).await.unwrap();
    }

    let raw = FileStore::new(&dir.0).get(PROFILES_KEY).await.unwrap().unwrap();
    assert!(!raw.contains("secret-key-456"));
    assert!(!raw.contains("public-key-123"));

    let store = SealedStore::new(FileStore::new(&dir.0), CredentialEncryptor::new(&key).unwrap());
    let reopened = CredentialVault::new(store);
    assert_eq!(reopened.retrieve("acct1").await.unwrap(), profile);
}
