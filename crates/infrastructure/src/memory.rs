//! 内存存储实现，供测试与本地演示使用。
//!
//! 语义与 Postgres 版保持一致：用户名、邮箱、回执码唯一，
//! 回执确认按手机号去重。

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use domain::{
    ConfirmOutcome, ContactGroup, GroupId, Message, MessageId, Recipient, RepositoryError,
    ResponseCode, User, UserEmail, UserId, Username,
};

use application::{GroupRepository, MessageRepository, UserRepository};

fn poisoned() -> RepositoryError {
    RepositoryError::storage("in-memory store lock poisoned")
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().map_err(|_| poisoned())?;
        let duplicate = users
            .values()
            .any(|existing| existing.username == user.username || existing.email == user.email);
        if duplicate || users.contains_key(&user.id) {
            return Err(RepositoryError::Conflict);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: Username) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.values().find(|user| user.email == email).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryGroupRepository {
    groups: Mutex<HashMap<GroupId, ContactGroup>>,
}

impl InMemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn create(&self, group: ContactGroup) -> Result<ContactGroup, RepositoryError> {
        let mut groups = self.groups.lock().map_err(|_| poisoned())?;
        if groups.contains_key(&group.id) {
            return Err(RepositoryError::Conflict);
        }
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update(&self, group: ContactGroup) -> Result<ContactGroup, RepositoryError> {
        let mut groups = self.groups.lock().map_err(|_| poisoned())?;
        if !groups.contains_key(&group.id) {
            return Err(RepositoryError::NotFound);
        }
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<ContactGroup>, RepositoryError> {
        let groups = self.groups.lock().map_err(|_| poisoned())?;
        Ok(groups.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<ContactGroup>, RepositoryError> {
        let groups = self.groups.lock().map_err(|_| poisoned())?;
        let mut owned: Vec<ContactGroup> = groups
            .values()
            .filter(|group| group.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by_key(|group| group.created_at);
        Ok(owned)
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: Mutex<HashMap<MessageId, Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.lock().map_err(|_| poisoned())?;
        let code_taken = messages
            .values()
            .any(|existing| existing.response_code == message.response_code);
        if code_taken || messages.contains_key(&message.id) {
            return Err(RepositoryError::Conflict);
        }
        messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.lock().map_err(|_| poisoned())?;
        match messages.get_mut(&message.id) {
            Some(existing) => {
                // responded_yes 以库内现值为准，只裁掉不再是收件人的号码，
                // 新增只能通过 confirm_recipient
                let mut incoming = message;
                incoming.responded_yes = existing
                    .responded_yes
                    .iter()
                    .filter(|confirmed| {
                        incoming
                            .recipients
                            .iter()
                            .any(|recipient| recipient.phone_number == confirmed.phone_number)
                    })
                    .cloned()
                    .collect();
                *existing = incoming.clone();
                Ok(incoming)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let messages = self.messages.lock().map_err(|_| poisoned())?;
        Ok(messages.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.lock().map_err(|_| poisoned())?;
        let mut owned: Vec<Message> = messages
            .values()
            .filter(|message| message.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by_key(|message| message.created_at);
        Ok(owned)
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        let mut messages = self.messages.lock().map_err(|_| poisoned())?;
        messages.remove(&id).ok_or(RepositoryError::NotFound)?;
        Ok(())
    }

    async fn find_by_response_code(
        &self,
        code: ResponseCode,
    ) -> Result<Option<Message>, RepositoryError> {
        let messages = self.messages.lock().map_err(|_| poisoned())?;
        Ok(messages
            .values()
            .find(|message| message.response_code == code)
            .cloned())
    }

    async fn confirm_recipient(
        &self,
        id: MessageId,
        recipient: Recipient,
    ) -> Result<ConfirmOutcome, RepositoryError> {
        let mut messages = self.messages.lock().map_err(|_| poisoned())?;
        let message = messages.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        if message.is_confirmed(&recipient.phone_number) {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }
        message
            .confirm(&recipient.phone_number, chrono::Utc::now())
            .map_err(|err| RepositoryError::storage(err.to_string()))
    }
}
