//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、去重检查、
//! 以及对外部适配器（密码哈希、短信网关、存储）的抽象。

pub mod clock;
pub mod error;
pub mod password;
pub mod repository;
pub mod services;
pub mod sms;

pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use password::{PasswordHasher, PasswordHasherError, PasswordPolicy};
pub use repository::{GroupRepository, MessageRepository, UserRepository};
pub use services::{
    AccountService, AccountServiceDependencies, DispatchService, DispatchServiceDependencies,
    GroupService, MessageService,
};
pub use sms::{SmsDeliveryReceipt, SmsGateway, SmsGatewayError};
