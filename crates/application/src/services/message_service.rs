//! 消息用例：创建、列出、查看、部分更新、删除。
//!
//! 创建与更新时对收件人手机号逐条重新校验，回执码也在此解析，
//! 非法输入在触达存储层之前就被拒绝。

use std::sync::Arc;

use domain::{DomainError, Message, MessageId, PhoneNumber, Recipient, ResponseCode, UserId};
use uuid::Uuid;

use crate::{clock::Clock, error::ApplicationError, repository::MessageRepository};

/// 未解析的收件人输入，手机号在服务内统一校验。
#[derive(Debug, Clone)]
pub struct RecipientInput {
    pub phone_number: String,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct CreateMessageRequest {
    pub owner_id: UserId,
    pub title: String,
    pub body: String,
    pub response_code: String,
    pub recipients: Vec<RecipientInput>,
    pub attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMessageRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub recipients: Option<Vec<RecipientInput>>,
    pub attributes: Option<serde_json::Value>,
}

pub struct MessageService {
    message_repository: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn new(message_repository: Arc<dyn MessageRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            message_repository,
            clock,
        }
    }

    pub async fn create(&self, request: CreateMessageRequest) -> Result<Message, ApplicationError> {
        if request.title.trim().is_empty() {
            return Err(DomainError::invalid_argument("title", "cannot be empty").into());
        }
        let response_code = ResponseCode::parse(request.response_code)?;
        let recipients = parse_recipients(request.recipients)?;

        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            request.owner_id,
            request.title,
            request.body,
            response_code,
            recipients,
            request.attributes,
            self.clock.now(),
        );
        let stored = self.message_repository.create(message).await?;
        Ok(stored)
    }

    pub async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Message>, ApplicationError> {
        Ok(self.message_repository.list_by_owner(owner_id).await?)
    }

    pub async fn get(&self, id: MessageId) -> Result<Message, ApplicationError> {
        self.message_repository
            .find_by_id(id)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::MessageNotFound))
    }

    pub async fn update(
        &self,
        id: MessageId,
        request: UpdateMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let mut message = self.get(id).await?;

        let recipients = match request.recipients {
            Some(inputs) => Some(parse_recipients(inputs)?),
            None => None,
        };
        message.apply_update(
            request.title,
            request.body,
            recipients,
            request.attributes,
            self.clock.now(),
        );
        let stored = self.message_repository.update(message).await?;
        Ok(stored)
    }

    pub async fn delete(&self, id: MessageId) -> Result<(), ApplicationError> {
        // 先确认存在，让调用方拿到 404 而不是静默成功
        self.get(id).await?;
        self.message_repository.delete(id).await?;
        Ok(())
    }
}

fn parse_recipients(inputs: Vec<RecipientInput>) -> Result<Vec<Recipient>, ApplicationError> {
    inputs
        .into_iter()
        .map(|input| {
            Ok(Recipient {
                phone_number: PhoneNumber::parse(input.phone_number)?,
                attributes: input.attributes,
            })
        })
        .collect()
}
