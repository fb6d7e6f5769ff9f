//! 거래소 자격증명 프로필.

use crate::error::{DomainError, DomainResult};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// 이름이 붙은 거래소 API 자격증명.
///
/// 비밀 키는 `SecretString`으로 보관되며 `Debug` 출력에서 항상 가려집니다.
#[derive(Clone)]
pub struct CredentialProfile {
    /// 프로필 이름 (저장소 내 고유 키)
    pub name: String,
    /// 거래소 API 키
    pub public_key: String,
    private_key: SecretString,
}

impl CredentialProfile {
    pub fn new(
        name: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
            private_key: SecretString::from(private_key.into()),
        }
    }

    /// 비밀 키.
    pub fn private_key(&self) -> &SecretString {
        &self.private_key
    }

    /// 세 필드가 모두 비어 있지 않은지 검증합니다. 공백만 있는 값도 비어 있는 것으로 봅니다.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::MissingField("name".to_string()));
        }
        if self.public_key.trim().is_empty() {
            return Err(DomainError::MissingField("apiKey".to_string()));
        }
        if self.private_key.expose_secret().trim().is_empty() {
            return Err(DomainError::MissingField("secretKey".to_string()));
        }
        Ok(())
    }

    /// 목록 표시용 요약.
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            name: self.name.clone(),
            public_key: self.public_key.clone(),
        }
    }
}

impl PartialEq for CredentialProfile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.public_key == other.public_key
            && self.private_key.expose_secret() == other.private_key.expose_secret()
    }
}

impl Eq for CredentialProfile {}

impl std::fmt::Debug for CredentialProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProfile")
            .field("name", &self.name)
            .field("public_key", &mask_key(&self.public_key))
            .field("private_key", &"***REDACTED***")
            .finish()
    }
}

/// 프로필 목록 항목 (이름 + API 키).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub name: String,
    pub public_key: String,
}

/// API 키를 `abcd...wxyz` 형태로 가립니다. 8자 이하면 전부 가립니다.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_keys() {
        let profile = CredentialProfile::new("acct1", "abcdefghijklmnopwxyz", "super-secret");
        let debug = format!("{:?}", profile);

        assert!(debug.contains("abcd...wxyz"));
        assert!(debug.contains("***REDACTED***"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("abcdefghijklmnopwxyz"));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(CredentialProfile::new("acct1", "pk", "sk").validate().is_ok());

        let err = CredentialProfile::new("  ", "pk", "sk").validate().unwrap_err();
        assert_eq!(err, DomainError::MissingField("name".to_string()));

        let err = CredentialProfile::new("acct1", "", "sk").validate().unwrap_err();
        assert_eq!(err, DomainError::MissingField("apiKey".to_string()));

        let err = CredentialProfile::new("acct1", "pk", "\t").validate().unwrap_err();
        assert_eq!(err, DomainError::MissingField("secretKey".to_string()));
    }

    #[test]
    fn test_equality_includes_secret() {
        let a = CredentialProfile::new("acct1", "pk", "sk");
        assert_eq!(a, CredentialProfile::new("acct1", "pk", "sk"));
        assert_ne!(a, CredentialProfile::new("acct1", "pk", "other"));
    }

    #[test]
    fn test_mask_short_key() {
        assert_eq!(mask_key("pk"), "***");
    }
}
