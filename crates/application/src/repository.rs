//! 存储层接口定义。
//!
//! 具体实现见 infrastructure crate（Postgres 与内存两种）。

use async_trait::async_trait;
use domain::{
    ConfirmOutcome, ContactGroup, GroupId, Message, MessageId, Recipient, RepositoryError,
    ResponseCode, User, UserEmail, UserId, Username,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: Username) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, group: ContactGroup) -> Result<ContactGroup, RepositoryError>;
    async fn update(&self, group: ContactGroup) -> Result<ContactGroup, RepositoryError>;
    async fn find_by_id(&self, id: GroupId) -> Result<Option<ContactGroup>, RepositoryError>;
    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<ContactGroup>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn update(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;
    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Message>, RepositoryError>;
    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError>;

    /// 按回执码查找消息。回执码在创建时即要求唯一关联一条消息。
    async fn find_by_response_code(
        &self,
        code: ResponseCode,
    ) -> Result<Option<Message>, RepositoryError>;

    /// 原子地把收件人记入 `responded_yes`（按手机号去重的集合加法）。
    ///
    /// 实现必须保证该操作是单文档条件更新：并发确认同一收件人
    /// 时最多只落一条记录，且不覆盖其他收件人的确认。
    async fn confirm_recipient(
        &self,
        id: MessageId,
        recipient: Recipient,
    ) -> Result<ConfirmOutcome, RepositoryError>;
}
