//! 短信派发与回执处理。
//!
//! 外发按收件人逐条调用网关，单条失败只记录在该收件人的报告里，
//! 整批永远返回成功。回信按 回执码 → 消息 → 收件人 的顺序关联，
//! 确认动作交给存储层的原子集合加法。

use std::sync::Arc;

use domain::{ConfirmOutcome, MessageId, PhoneNumber, Recipient, ResponseCode};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::ApplicationError,
    repository::MessageRepository,
    sms::{SmsDeliveryReceipt, SmsGateway},
};

#[derive(Debug, Clone)]
pub struct SendBatchRequest {
    pub recipients: Vec<PhoneNumber>,
    pub body: String,
    pub response_code: ResponseCode,
}

/// 单个收件人的发送结果，`twilio_response` 与 `error` 恰有一个存在。
#[derive(Debug, Clone, Serialize)]
pub struct SendReport {
    pub recipient: PhoneNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twilio_response: Option<SmsDeliveryReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 一条回信的处理结果。
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    /// 回执码与发信人都匹配，确认已入账（或早已入账）。
    Confirmed {
        message_id: MessageId,
        outcome: ConfirmOutcome,
    },
    /// 回信正文不对应任何在途消息。
    NoMatchingMessage,
    /// 找到了消息，但发信号码不在收件人列表里。
    NoMatchingContact { message_id: MessageId },
}

pub struct DispatchServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub sms_gateway: Arc<dyn SmsGateway>,
}

pub struct DispatchService {
    deps: DispatchServiceDependencies,
}

impl DispatchService {
    pub fn new(deps: DispatchServiceDependencies) -> Self {
        Self { deps }
    }

    /// 向一批收件人发送同一条短信，正文末尾附上回执提示。
    ///
    /// 返回值与收件人一一对应、顺序一致；该方法本身不会失败。
    pub async fn send_batch(&self, request: SendBatchRequest) -> Vec<SendReport> {
        let body = format!(
            "{} Respond '{}' to confirm your attendance.",
            request.body,
            request.response_code.as_str()
        );

        let sends = request.recipients.iter().map(|recipient| {
            let body = body.as_str();
            async move {
                match self.deps.sms_gateway.send(recipient, body).await {
                    Ok(receipt) => SendReport {
                        recipient: recipient.clone(),
                        twilio_response: Some(receipt),
                        error: None,
                    },
                    Err(err) => {
                        warn!(recipient = %recipient, error = %err, "sms send failed");
                        SendReport {
                            recipient: recipient.clone(),
                            twilio_response: None,
                            error: Some(err.to_string()),
                        }
                    }
                }
            }
        });

        join_all(sends).await
    }

    /// 处理一条入站回信：正文去除首尾空白后视为回执码，
    /// 发信号码用于在该消息的收件人中定位联系人。
    pub async fn handle_reply(
        &self,
        body: &str,
        from: &str,
    ) -> Result<ReplyOutcome, ApplicationError> {
        let code = match ResponseCode::parse(body) {
            Ok(code) => code,
            Err(_) => return Ok(ReplyOutcome::NoMatchingMessage),
        };

        let message = match self
            .deps
            .message_repository
            .find_by_response_code(code.clone())
            .await?
        {
            Some(message) => message,
            None => return Ok(ReplyOutcome::NoMatchingMessage),
        };

        let phone = match PhoneNumber::parse(from) {
            Ok(phone) => phone,
            Err(_) => {
                return Ok(ReplyOutcome::NoMatchingContact {
                    message_id: message.id,
                })
            }
        };
        let recipient: Recipient = match message.find_recipient(&phone) {
            Some(recipient) => recipient.clone(),
            None => {
                return Ok(ReplyOutcome::NoMatchingContact {
                    message_id: message.id,
                })
            }
        };

        let outcome = self
            .deps
            .message_repository
            .confirm_recipient(message.id, recipient)
            .await?;
        info!(message_id = %message.id, from = %phone, ?outcome, "reply confirmed");

        Ok(ReplyOutcome::Confirmed {
            message_id: message.id,
            outcome,
        })
    }
}
