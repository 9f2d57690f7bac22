use async_trait::async_trait;
use domain::{DomainError, DomainResult, PasswordHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHasherError {
    #[error("hash error: {0}")]
    Hash(String),
    #[error("verify error: {0}")]
    Verify(String),
}

impl PasswordHasherError {
    pub fn hash_error(message: impl Into<String>) -> Self {
        Self::Hash(message.into())
    }

    pub fn verify_error(message: impl Into<String>) -> Self {
        Self::Verify(message.into())
    }
}

/// 密码哈希适配器。`verify` 对格式损坏的存量哈希返回 `false`，
/// 而不是报错。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError>;
    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError>;
}

/// 注册口令强度策略。
///
/// 历史上存在"仅限长度"与"长度加大小写加数字"两套规则，
/// 这里统一采用后者（严格版）。
pub struct PasswordPolicy;

impl PasswordPolicy {
    pub fn validate(candidate: &str) -> DomainResult<()> {
        if candidate.len() < 8 {
            return Err(DomainError::invalid_argument(
                "password",
                "must be at least 8 characters long",
            ));
        }
        if candidate.len() > 128 {
            return Err(DomainError::invalid_argument(
                "password",
                "must be at most 128 characters long",
            ));
        }
        if !candidate.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::invalid_argument(
                "password",
                "must contain at least one uppercase letter",
            ));
        }
        if !candidate.chars().any(|c| c.is_ascii_lowercase()) {
            return Err(DomainError::invalid_argument(
                "password",
                "must contain at least one lowercase letter",
            ));
        }
        if !candidate.chars().any(|c| c.is_ascii_digit()) {
            return Err(DomainError::invalid_argument(
                "password",
                "must contain at least one number",
            ));
        }
        Ok(())
    }
}
