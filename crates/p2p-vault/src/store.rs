//! 키-값 저장소 추상화와 기본 구현.
//!
//! - `MemoryStore`: 테스트용 인메모리 저장소
//! - `FileStore`: 키마다 파일 하나를 쓰는 디렉토리 저장소 (재시작 후에도 유지)

use crate::error::{VaultError, VaultResult};
use async_trait::async_trait;
use fs4::fs_std::FileExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// `update`에 전달되는 변환 함수. 현재 값을 받아 새 값을 돌려줍니다.
///
/// 에러를 반환하면 아무것도 쓰지 않습니다.
pub type UpdateFn<'a> = Box<dyn FnOnce(Option<String>) -> VaultResult<String> + Send + 'a>;

/// 문자열 키-값 저장소.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 키에 해당하는 값을 읽습니다. 없으면 `None`.
    async fn get(&self, key: &str) -> VaultResult<Option<String>>;

    /// 키에 값을 씁니다. 기존 값은 덮어씁니다.
    async fn set(&self, key: &str, value: &str) -> VaultResult<()>;

    /// 읽기-수정-쓰기를 하나의 임계 구역에서 수행하고 새 값을 반환합니다.
    ///
    /// 같은 키에 대한 `update`는 서로 겹치지 않습니다.
    async fn update(&self, key: &str, apply: UpdateFn<'_>) -> VaultResult<String>;
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Box<T> {
    async fn get(&self, key: &str) -> VaultResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        (**self).set(key, value).await
    }

    async fn update(&self, key: &str, apply: UpdateFn<'_>) -> VaultResult<String> {
        (**self).update(key, apply).await
    }
}

/// 인메모리 저장소.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 원시 값을 직접 넣습니다 (테스트용 손상 데이터 주입 등).
    pub async fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> VaultResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn update(&self, key: &str, apply: UpdateFn<'_>) -> VaultResult<String> {
        let mut entries = self.entries.write().await;
        let next = apply(entries.get(key).cloned())?;
        entries.insert(key.to_string(), next.clone());
        Ok(next)
    }
}

/// 디렉토리 기반 파일 저장소.
///
/// 키 `k`는 `{dir}/k.json`에 저장됩니다. 쓰기는 고유한 임시 파일에 기록한 뒤
/// rename으로 교체하므로 중간에 중단되어도 기존 값이 깨지지 않습니다.
/// `update`는 `{dir}/.k.lock` 파일의 배타적 advisory 잠금을 잡으므로
/// 같은 디렉토리를 여는 다른 인스턴스나 프로세스와도 직렬화됩니다.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

/// 잠금 파일을 닫을 때 잠금이 풀립니다.
struct KeyLock {
    file: std::fs::File,
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> VaultResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(VaultError::Storage(format!("잘못된 저장소 키: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// 키별 잠금 파일에 배타적 잠금을 겁니다. 잠금 대기는 블로킹 스레드에서 수행합니다.
    async fn lock(&self, key: &str) -> VaultResult<KeyLock> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let lock_path = self.dir.join(format!(".{}.lock", key));

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| VaultError::Storage(format!("잠금 작업 실패: {}", e)))??;

        Ok(KeyLock { file })
    }

    async fn read(&self, path: &Path) -> VaultResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::Storage(format!(
                "{} 읽기 실패: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write_atomic(&self, key: &str, path: &Path, value: &str) -> VaultResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp_path = self
            .dir
            .join(format!(".{}.json.tmp-{}", key, uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp_path, value.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(VaultError::Storage(format!(
                "{} 쓰기 실패: {}",
                path.display(),
                e
            )));
        }

        debug!(path = %path.display(), bytes = value.len(), "Store entry written");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn get(&self, key: &str) -> VaultResult<Option<String>> {
        let path = self.path_for(key)?;
        self.read(&path).await
    }

    async fn set(&self, key: &str, value: &str) -> VaultResult<()> {
        let path = self.path_for(key)?;
        let _lock = self.lock(key).await?;
        self.write_atomic(key, &path, value).await
    }

    async fn update(&self, key: &str, apply: UpdateFn<'_>) -> VaultResult<String> {
        let path = self.path_for(key)?;
        let _lock = self.lock(key).await?;

        let current = self.read(&path).await?;
        let next = apply(current)?;
        self.write_atomic(key, &path, &next).await?;
        Ok(next)
    }
}
