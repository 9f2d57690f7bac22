use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// 统一的时间戳类型。
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// 用户唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<UserId> for Uuid {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// 联系人分组唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for GroupId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<GroupId> for Uuid {
    fn from(value: GroupId) -> Self {
        value.0
    }
}

/// 消息唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<MessageId> for Uuid {
    fn from(value: MessageId) -> Self {
        value.0
    }
}

/// 经过校验并统一小写的用户名。
///
/// 规则：长度 3-30，仅允许字母数字及 `.`、`_`、`-`；
/// 显式拒绝 `$`、`{`、`}`，防止存储层操作符注入。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_owned();
        if value.chars().any(|c| matches!(c, '$' | '{' | '}')) {
            return Err(DomainError::invalid_argument(
                "username",
                "must not contain '$', '{' or '}'",
            ));
        }
        if !(3..=30).contains(&value.chars().count()) {
            return Err(DomainError::invalid_argument(
                "username",
                "must be 3-30 characters",
            ));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(DomainError::invalid_argument(
                "username",
                "only letters, digits, '.', '_' and '-' are allowed",
            ));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 经过校验的邮箱，大小写按提交原样保留。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserEmail(String);

impl UserEmail {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_owned();
        let invalid = || DomainError::invalid_argument("email", "must look like local@domain.tld");

        let mut parts = value.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }

        // 域名至少包含一个点，最后一段为 >=2 个字母
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
            return Err(invalid());
        }
        let tld = labels[labels.len() - 1];
        if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 收件人手机号码。匹配回信时按字符串精确比较。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(DomainError::invalid_argument(
                "phone_number",
                "cannot be empty",
            ));
        }
        if value.len() > 20 {
            return Err(DomainError::invalid_argument("phone_number", "too long"));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '))
            || !value.chars().any(|c| c.is_ascii_digit())
        {
            return Err(DomainError::invalid_argument(
                "phone_number",
                "must be a phone number",
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 回执码：嵌入外发短信、收件人原样回复用于关联消息的短令牌。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseCode(String);

impl ResponseCode {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(DomainError::invalid_argument(
                "response_code",
                "cannot be empty",
            ));
        }
        if value.len() > 32 {
            return Err(DomainError::invalid_argument("response_code", "too long"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 经过外部服务生成的密码哈希，永不包含明文。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let hash = value.into();
        if hash.trim().is_empty() {
            return Err(DomainError::invalid_argument(
                "password_hash",
                "cannot be empty",
            ));
        }
        Ok(Self(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_normalizes_to_lowercase() {
        let username = Username::parse("Rae.Dawn_Law").unwrap();
        assert_eq!(username.as_str(), "rae.dawn_law");
    }

    #[test]
    fn username_rejects_query_operator_characters() {
        // `$`、`{`、`}` 一律拒绝
        for candidate in ["$where", "user{1}", "a}b.cd", "abc$", "{gt}"] {
            let err = Username::parse(candidate).unwrap_err();
            assert!(
                matches!(err, DomainError::InvalidArgument { ref field, .. } if field == "username"),
                "expected rejection for {candidate:?}"
            );
        }
    }

    #[test]
    fn username_enforces_length_and_charset() {
        assert!(Username::parse("ab").is_err());
        assert!(Username::parse("a".repeat(31)).is_err());
        assert!(Username::parse("has space").is_err());
        assert!(Username::parse("ünïcode").is_err());
        assert!(Username::parse("ok_name-1.2").is_ok());
        assert!(Username::parse("abc").is_ok());
        assert!(Username::parse("a".repeat(30)).is_ok());
    }

    #[test]
    fn email_requires_domain_with_tld() {
        assert!(UserEmail::parse("user@example.com").is_ok());
        assert!(UserEmail::parse("User.Name+tag@sub.example.org").is_ok());
        assert!(UserEmail::parse("invalid-email").is_err());
        assert!(UserEmail::parse("@example.com").is_err());
        assert!(UserEmail::parse("user@example").is_err());
        assert!(UserEmail::parse("user@example.c").is_err());
        assert!(UserEmail::parse("user@example.c0m").is_err());
        assert!(UserEmail::parse("user@.com").is_err());
        assert!(UserEmail::parse("a@b@c.com").is_err());
    }

    #[test]
    fn email_preserves_case() {
        let email = UserEmail::parse("Rae@Example.COM").unwrap();
        assert_eq!(email.as_str(), "Rae@Example.COM");
    }

    #[test]
    fn phone_number_rules() {
        assert!(PhoneNumber::parse("+15551234567").is_ok());
        assert!(PhoneNumber::parse("(555) 123-4567").is_ok());
        assert!(PhoneNumber::parse("").is_err());
        assert!(PhoneNumber::parse("call-me").is_err());
        assert!(PhoneNumber::parse("+").is_err());
    }

    #[test]
    fn response_code_is_trimmed() {
        let code = ResponseCode::parse("  X7Q2 ").unwrap();
        assert_eq!(code.as_str(), "X7Q2");
        assert!(ResponseCode::parse("   ").is_err());
    }
}
