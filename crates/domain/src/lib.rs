//! 群发短信系统核心领域模型
//!
//! 包含用户、联系人分组、待发消息等核心实体，以及凭据校验、
//! 回执确认等相关的业务规则。

pub mod errors;
pub mod group;
pub mod message;
pub mod user;
pub mod value_objects;

pub use errors::{DomainError, DomainResult, RepositoryError};
pub use group::ContactGroup;
pub use message::{ConfirmOutcome, Message, Recipient};
pub use user::User;
pub use value_objects::{
    GroupId, MessageId, PasswordHash, PhoneNumber, ResponseCode, Timestamp, UserEmail, UserId,
    Username,
};
