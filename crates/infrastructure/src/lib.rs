//! 基础设施层实现。
//!
//! 提供应用层端口的具体适配：Postgres 存储、bcrypt 密码哈希、
//! Twilio 短信网关与 webhook 签名校验，以及测试用的内存存储。

pub mod memory;
pub mod password;
pub mod repository;
pub mod twilio;

pub use memory::{InMemoryGroupRepository, InMemoryMessageRepository, InMemoryUserRepository};
pub use password::BcryptPasswordHasher;
pub use repository::{
    create_pg_pool, create_pg_pool_with, PgGroupRepository, PgMessageRepository, PgUserRepository,
};
pub use twilio::{TwilioSignatureValidator, TwilioSmsGateway};

/// 编译期打包的数据库迁移，启动与集成测试共用。
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
