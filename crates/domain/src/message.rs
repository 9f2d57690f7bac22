//! 待发消息实体与回执确认规则。
//!
//! `responded_yes` 按手机号去重，同一收件人反复确认只保留一条记录。
//! 不变式：`responded_yes` 中的手机号永远是 `recipients` 的子集，
//! 替换收件人列表时被移出的号码连同其确认记录一并裁掉。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{MessageId, PhoneNumber, ResponseCode, Timestamp, UserId};

/// 收件人：手机号加任意联系人属性，属性原样透传。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub phone_number: PhoneNumber,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Recipient {
    pub fn new(phone_number: PhoneNumber) -> Self {
        Self {
            phone_number,
            attributes: serde_json::Map::new(),
        }
    }
}

/// 回执确认的结果。重复确认不是错误，只是无操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Applied,
    AlreadyConfirmed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub owner_id: UserId,
    pub title: String,
    pub body: String,
    pub response_code: ResponseCode,
    pub recipients: Vec<Recipient>,
    pub responded_yes: Vec<Recipient>,
    pub attributes: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Message {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MessageId,
        owner_id: UserId,
        title: String,
        body: String,
        response_code: ResponseCode,
        recipients: Vec<Recipient>,
        attributes: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            owner_id,
            title,
            body,
            response_code,
            recipients,
            responded_yes: Vec::new(),
            attributes,
            created_at: now,
            updated_at: now,
        }
    }

    /// 查找收件人列表中匹配指定手机号的条目。
    pub fn find_recipient(&self, phone: &PhoneNumber) -> Option<&Recipient> {
        self.recipients
            .iter()
            .find(|recipient| &recipient.phone_number == phone)
    }

    /// 指定手机号是否已确认。
    pub fn is_confirmed(&self, phone: &PhoneNumber) -> bool {
        self.responded_yes
            .iter()
            .any(|recipient| &recipient.phone_number == phone)
    }

    /// 将指定手机号对应的收件人记入 `responded_yes`。
    ///
    /// 号码不在收件人列表时返回 `RecipientNotFound`；已确认过的
    /// 号码返回 `AlreadyConfirmed` 且不产生重复条目。
    pub fn confirm(&mut self, phone: &PhoneNumber, now: Timestamp) -> DomainResult<ConfirmOutcome> {
        let recipient = self
            .find_recipient(phone)
            .cloned()
            .ok_or(DomainError::RecipientNotFound)?;

        if self.is_confirmed(phone) {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }

        self.responded_yes.push(recipient);
        self.updated_at = now;
        Ok(ConfirmOutcome::Applied)
    }

    pub fn apply_update(
        &mut self,
        title: Option<String>,
        body: Option<String>,
        recipients: Option<Vec<Recipient>>,
        attributes: Option<serde_json::Value>,
        now: Timestamp,
    ) {
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(body) = body {
            self.body = body;
        }
        if let Some(recipients) = recipients {
            // 不再是收件人的号码，其确认记录一并移除
            self.responded_yes.retain(|confirmed| {
                recipients
                    .iter()
                    .any(|recipient| recipient.phone_number == confirmed.phone_number)
            });
            self.recipients = recipients;
        }
        if let Some(attributes) = attributes {
            self.attributes = attributes;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn recipient(phone: &str, name: &str) -> Recipient {
        let mut attributes = serde_json::Map::new();
        attributes.insert("name".to_owned(), serde_json::json!(name));
        Recipient {
            phone_number: PhoneNumber::parse(phone).unwrap(),
            attributes,
        }
    }

    fn sample_message() -> Message {
        Message::new(
            MessageId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            "Potluck".to_owned(),
            "Dinner on Friday at 6pm.".to_owned(),
            ResponseCode::parse("X7Q2").unwrap(),
            vec![
                recipient("+15551234567", "Alice"),
                recipient("+15557654321", "Bob"),
            ],
            serde_json::json!({}),
            chrono::Utc::now(),
        )
    }

    #[test]
    fn confirm_records_recipient_once() {
        let mut message = sample_message();
        let phone = PhoneNumber::parse("+15551234567").unwrap();

        assert_eq!(
            message.confirm(&phone, chrono::Utc::now()).unwrap(),
            ConfirmOutcome::Applied
        );
        assert_eq!(
            message.confirm(&phone, chrono::Utc::now()).unwrap(),
            ConfirmOutcome::AlreadyConfirmed
        );
        assert_eq!(message.responded_yes.len(), 1);
        assert!(message.is_confirmed(&phone));
    }

    #[test]
    fn confirm_rejects_unknown_phone() {
        let mut message = sample_message();
        let phone = PhoneNumber::parse("+19998887777").unwrap();

        let err = message.confirm(&phone, chrono::Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::RecipientNotFound);
        assert!(message.responded_yes.is_empty());
    }

    #[test]
    fn responded_yes_stays_subset_of_recipients() {
        let mut message = sample_message();
        for phone in ["+15551234567", "+15557654321"] {
            let phone = PhoneNumber::parse(phone).unwrap();
            message.confirm(&phone, chrono::Utc::now()).unwrap();
        }

        for confirmed in &message.responded_yes {
            assert!(message.find_recipient(&confirmed.phone_number).is_some());
        }
    }

    #[test]
    fn replacing_recipients_prunes_stale_confirmations() {
        let mut message = sample_message();
        for phone in ["+15551234567", "+15557654321"] {
            let phone = PhoneNumber::parse(phone).unwrap();
            message.confirm(&phone, chrono::Utc::now()).unwrap();
        }

        // Bob 被移出收件人列表，Carol 加入
        message.apply_update(
            None,
            None,
            Some(vec![
                recipient("+15551234567", "Alice"),
                recipient("+15550001111", "Carol"),
            ]),
            None,
            chrono::Utc::now(),
        );

        assert_eq!(message.responded_yes.len(), 1);
        assert!(message.is_confirmed(&PhoneNumber::parse("+15551234567").unwrap()));
        assert!(!message.is_confirmed(&PhoneNumber::parse("+15557654321").unwrap()));
        for confirmed in &message.responded_yes {
            assert!(message.find_recipient(&confirmed.phone_number).is_some());
        }
    }

    #[test]
    fn recipient_attributes_round_trip_through_serde() {
        let original = recipient("+15551234567", "Alice");
        let json = serde_json::to_value(&original).unwrap();
        assert_eq!(json["phone_number"], "+15551234567");
        assert_eq!(json["name"], "Alice");

        let parsed: Recipient = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, original);
    }
}
