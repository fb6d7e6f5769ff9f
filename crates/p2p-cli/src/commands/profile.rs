//! 자격증명 프로필 관리 명령.

use anyhow::{Context, Result};
use p2p_core::{mask_key, ProfileSummary};
use p2p_vault::{CredentialStore, CredentialVault, ProfileDraft};
use serde::Serialize;
use tracing::info;

/// 화면 출력용 프로필 (API 키는 가림).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub name: String,
    pub api_key: String,
}

impl From<ProfileSummary> for ProfileView {
    fn from(summary: ProfileSummary) -> Self {
        Self {
            api_key: mask_key(&summary.public_key),
            name: summary.name,
        }
    }
}

/// 프로필 수정 입력. `None`인 필드는 기존 값을 유지합니다.
#[derive(Debug, Default)]
pub struct ProfileEdit {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
}

/// 새 프로필을 저장합니다. 같은 이름이 있으면 덮어씁니다.
pub async fn save_profile<S: CredentialStore>(
    vault: &CredentialVault<S>,
    name: &str,
    api_key: &str,
    secret_key: &str,
) -> Result<ProfileView> {
    let mut draft = ProfileDraft::new();
    draft.name = name.to_string();
    draft.public_key = api_key.to_string();
    draft.set_private_key(secret_key);

    let profile = vault
        .save_draft(&mut draft)
        .await
        .with_context(|| format!("프로필 '{}' 저장 실패", name))?;
    Ok(ProfileView::from(profile.summary()))
}

/// 저장된 프로필의 일부 필드만 바꿉니다.
pub async fn edit_profile<S: CredentialStore>(
    vault: &CredentialVault<S>,
    name: &str,
    edit: ProfileEdit,
) -> Result<ProfileView> {
    let mut draft = vault
        .draft(name)
        .await
        .with_context(|| format!("프로필 '{}' 조회 실패", name))?;

    if let Some(api_key) = edit.api_key {
        draft.public_key = api_key;
    }
    if let Some(secret_key) = edit.secret_key {
        draft.set_private_key(secret_key);
    }

    let profile = vault
        .save_draft(&mut draft)
        .await
        .with_context(|| format!("프로필 '{}' 저장 실패", name))?;
    info!(name = %name, "Profile updated");
    Ok(ProfileView::from(profile.summary()))
}

pub async fn list_profiles<S: CredentialStore>(
    vault: &CredentialVault<S>,
) -> Result<Vec<ProfileView>> {
    let profiles = vault.list().await.context("프로필 목록 조회 실패")?;
    Ok(profiles.into_iter().map(ProfileView::from).collect())
}

pub async fn show_profile<S: CredentialStore>(
    vault: &CredentialVault<S>,
    name: &str,
) -> Result<ProfileView> {
    let profile = vault
        .retrieve(name)
        .await
        .with_context(|| format!("프로필 '{}' 조회 실패", name))?;
    Ok(ProfileView::from(profile.summary()))
}

pub async fn remove_profile<S: CredentialStore>(
    vault: &CredentialVault<S>,
    name: &str,
) -> Result<()> {
    vault
        .remove(name)
        .await
        .with_context(|| format!("프로필 '{}' 삭제 실패", name))
}
