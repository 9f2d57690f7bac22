use crate::value_objects::{GroupId, Timestamp, UserId};

/// 联系人分组。`attributes` 为客户端自定义字段，原样存取。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContactGroup {
    pub id: GroupId,
    pub owner_id: UserId,
    pub name: String,
    pub attributes: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContactGroup {
    pub fn new(
        id: GroupId,
        owner_id: UserId,
        name: String,
        attributes: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            owner_id,
            name,
            attributes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(
        &mut self,
        name: Option<String>,
        attributes: Option<serde_json::Value>,
        now: Timestamp,
    ) {
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(attributes) = attributes {
            self.attributes = attributes;
        }
        self.updated_at = now;
    }
}
