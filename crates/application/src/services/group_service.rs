//! 联系人分组用例：创建、按属主列出、部分更新。

use std::sync::Arc;

use domain::{ContactGroup, DomainError, GroupId, UserId};
use uuid::Uuid;

use crate::{clock::Clock, error::ApplicationError, repository::GroupRepository};

#[derive(Debug, Clone)]
pub struct CreateGroupRequest {
    pub owner_id: UserId,
    pub name: String,
    pub attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub attributes: Option<serde_json::Value>,
}

pub struct GroupService {
    group_repository: Arc<dyn GroupRepository>,
    clock: Arc<dyn Clock>,
}

impl GroupService {
    pub fn new(group_repository: Arc<dyn GroupRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            group_repository,
            clock,
        }
    }

    pub async fn create(&self, request: CreateGroupRequest) -> Result<ContactGroup, ApplicationError> {
        let group = ContactGroup::new(
            GroupId::from(Uuid::new_v4()),
            request.owner_id,
            request.name,
            request.attributes,
            self.clock.now(),
        );
        let stored = self.group_repository.create(group).await?;
        Ok(stored)
    }

    pub async fn list_by_owner(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<ContactGroup>, ApplicationError> {
        Ok(self.group_repository.list_by_owner(owner_id).await?)
    }

    pub async fn update(
        &self,
        id: GroupId,
        request: UpdateGroupRequest,
    ) -> Result<ContactGroup, ApplicationError> {
        let mut group = self
            .group_repository
            .find_by_id(id)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::GroupNotFound))?;

        group.apply_update(request.name, request.attributes, self.clock.now());
        let stored = self.group_repository.update(group).await?;
        Ok(stored)
    }
}
