//! 자격증명 프로필 저장소.
//!
//! 모든 프로필은 단일 키(`p2p_profiles`) 아래에 `{ name, apiKey, secretKey }`
//! JSON 배열로 저장 순서대로 보관됩니다.

use crate::error::{VaultError, VaultResult};
use crate::store::CredentialStore;
use p2p_core::{mask_key, CredentialProfile, ProfileSummary};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// 프로필 목록이 저장되는 키.
pub const PROFILES_KEY: &str = "p2p_profiles";

/// 저장 형식.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProfile {
    name: String,
    api_key: String,
    secret_key: String,
}

impl From<&CredentialProfile> for StoredProfile {
    fn from(profile: &CredentialProfile) -> Self {
        Self {
            name: profile.name.clone(),
            api_key: profile.public_key.clone(),
            secret_key: profile.private_key().expose_secret().to_string(),
        }
    }
}

impl From<StoredProfile> for CredentialProfile {
    fn from(stored: StoredProfile) -> Self {
        CredentialProfile::new(stored.name, stored.api_key, stored.secret_key)
    }
}

fn parse_profiles(raw: Option<&str>) -> VaultResult<Vec<StoredProfile>> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(raw)?),
        _ => Ok(Vec::new()),
    }
}

/// 자격증명 프로필 저장소.
///
/// 읽기는 동시에 수행되고, 목록을 고치는 쓰기는 저장소의 `update`로 직렬화됩니다.
/// `FileStore`에서는 같은 디렉토리를 연 다른 프로세스와도 직렬화됩니다.
pub struct CredentialVault<S> {
    store: S,
}

impl<S: CredentialStore> CredentialVault<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn load(&self) -> VaultResult<Vec<StoredProfile>> {
        let raw = self.store.get(PROFILES_KEY).await?;
        parse_profiles(raw.as_deref())
    }

    /// 프로필을 저장합니다.
    ///
    /// 같은 이름이 있으면 그 자리에서 교체하고, 없으면 목록 끝에 추가합니다.
    /// 빈 필드(공백만 있는 값 포함)가 있으면 `Validation` 에러.
    pub async fn save(&self, profile: &CredentialProfile) -> VaultResult<()> {
        profile.validate()?;

        let stored = StoredProfile::from(profile);
        let mut replaced = false;
        let mut total = 0usize;

        self.store
            .update(
                PROFILES_KEY,
                Box::new(|current: Option<String>| -> VaultResult<String> {
                    let mut profiles = parse_profiles(current.as_deref())?;
                    match profiles.iter_mut().find(|p| p.name == stored.name) {
                        Some(existing) => {
                            *existing = stored;
                            replaced = true;
                        }
                        None => profiles.push(stored),
                    }
                    total = profiles.len();
                    Ok(serde_json::to_string(&profiles)?)
                }),
            )
            .await?;

        if replaced {
            debug!(name = %profile.name, "Replaced existing profile");
        }
        info!(
            name = %profile.name,
            api_key = %mask_key(&profile.public_key),
            total,
            "Profile saved"
        );
        Ok(())
    }

    /// 저장된 프로필 목록 (이름 + API 키), 저장 순서.
    pub async fn list(&self) -> VaultResult<Vec<ProfileSummary>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|p| ProfileSummary {
                name: p.name,
                public_key: p.api_key,
            })
            .collect())
    }

    /// 이름으로 프로필을 조회합니다.
    pub async fn retrieve(&self, name: &str) -> VaultResult<CredentialProfile> {
        self.load()
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .map(CredentialProfile::from)
            .ok_or_else(|| VaultError::NotFound(name.to_string()))
    }

    /// 프로필을 삭제합니다.
    pub async fn remove(&self, name: &str) -> VaultResult<()> {
        let mut remaining = 0usize;

        let result = self
            .store
            .update(
                PROFILES_KEY,
                Box::new(|current: Option<String>| -> VaultResult<String> {
                    let mut profiles = parse_profiles(current.as_deref())?;
                    let before = profiles.len();
                    profiles.retain(|p| p.name != name);
                    if profiles.len() == before {
                        return Err(VaultError::NotFound(name.to_string()));
                    }
                    remaining = profiles.len();
                    Ok(serde_json::to_string(&profiles)?)
                }),
            )
            .await;

        match result {
            Ok(_) => {
                info!(name = %name, remaining, "Profile removed");
                Ok(())
            }
            Err(e) => {
                if e.is_not_found() {
                    warn!(name = %name, "Profile to remove not found");
                }
                Err(e)
            }
        }
    }

    /// 저장된 프로필을 입력 폼(draft)으로 불러옵니다.
    pub async fn draft(&self, name: &str) -> VaultResult<ProfileDraft> {
        let profile = self.retrieve(name).await?;
        Ok(ProfileDraft::from(&profile))
    }

    /// 입력 폼 내용을 검증해 저장하고, 성공하면 폼을 비웁니다.
    ///
    /// 실패하면 폼 내용은 그대로 남습니다.
    pub async fn save_draft(&self, draft: &mut ProfileDraft) -> VaultResult<CredentialProfile> {
        let profile = draft.to_profile();
        self.save(&profile).await?;
        draft.clear();
        Ok(profile)
    }
}

/// 작성 중인 프로필 입력.
///
/// 저장된 프로필과는 독립적이며 `clear`는 입력만 비웁니다.
#[derive(Clone, Default)]
pub struct ProfileDraft {
    pub name: String,
    pub public_key: String,
    private_key: Option<SecretString>,
}

impl ProfileDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_private_key(&mut self, value: impl Into<String>) {
        self.private_key = Some(SecretString::from(value.into()));
    }

    /// 모든 입력이 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.public_key.is_empty() && self.private_key.is_none()
    }

    /// 입력을 모두 비웁니다. 저장된 프로필에는 영향이 없습니다.
    pub fn clear(&mut self) {
        self.name.clear();
        self.public_key.clear();
        self.private_key = None;
    }

    pub fn to_profile(&self) -> CredentialProfile {
        let secret = self
            .private_key
            .as_ref()
            .map(|s| s.expose_secret().to_string())
            .unwrap_or_default();
        CredentialProfile::new(self.name.clone(), self.public_key.clone(), secret)
    }
}

impl From<&CredentialProfile> for ProfileDraft {
    fn from(profile: &CredentialProfile) -> Self {
        Self {
            name: profile.name.clone(),
            public_key: profile.public_key.clone(),
            private_key: Some(profile.private_key().clone()),
        }
    }
}

impl std::fmt::Debug for ProfileDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileDraft")
            .field("name", &self.name)
            .field("public_key", &mask_key(&self.public_key))
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}
