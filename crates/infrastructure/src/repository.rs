//! Postgres 存储实现。
//!
//! 收件人、回执名单与自由属性存成 JSONB；回执确认用单条带条件的
//! UPDATE 完成，保证并发下按手机号去重。

use async_trait::async_trait;
use domain::{
    ConfirmOutcome, ContactGroup, GroupId, Message, MessageId, Recipient, RepositoryError,
    ResponseCode, Timestamp, User, UserEmail, UserId, Username,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use application::{GroupRepository, MessageRepository, UserRepository};

pub async fn create_pg_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

pub async fn create_pg_pool_with(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username =
            Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?;
        let email = UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password = domain::PasswordHash::new(value.password_hash)
            .map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::from(value.id),
            username,
            email,
            password,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct GroupRecord {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    attributes: serde_json::Value,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<GroupRecord> for ContactGroup {
    fn from(value: GroupRecord) -> Self {
        ContactGroup {
            id: GroupId::from(value.id),
            owner_id: UserId::from(value.owner_id),
            name: value.name,
            attributes: value.attributes,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    body: String,
    response_code: String,
    recipients: serde_json::Value,
    responded_yes: serde_json::Value,
    attributes: serde_json::Value,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let response_code = ResponseCode::parse(value.response_code)
            .map_err(|err| invalid_data(err.to_string()))?;
        let recipients: Vec<Recipient> = serde_json::from_value(value.recipients)
            .map_err(|err| invalid_data(err.to_string()))?;
        let responded_yes: Vec<Recipient> = serde_json::from_value(value.responded_yes)
            .map_err(|err| invalid_data(err.to_string()))?;

        Ok(Message {
            id: MessageId::from(value.id),
            owner_id: UserId::from(value.owner_id),
            title: value.title,
            body: value.body,
            response_code,
            recipients,
            responded_yes,
            attributes: value.attributes,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn recipients_json(recipients: &[Recipient]) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(recipients).map_err(|err| invalid_data(err.to_string()))
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";
const GROUP_COLUMNS: &str = "id, owner_id, name, attributes, created_at, updated_at";
const MESSAGE_COLUMNS: &str =
    "id, owner_id, title, body, response_code, recipients, responded_yes, attributes, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: Username) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1",
        ))
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }
}

#[derive(Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn create(&self, group: ContactGroup) -> Result<ContactGroup, RepositoryError> {
        let record = sqlx::query_as::<_, GroupRecord>(&format!(
            r#"
            INSERT INTO contact_groups (id, owner_id, name, attributes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {GROUP_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(group.id))
        .bind(Uuid::from(group.owner_id))
        .bind(&group.name)
        .bind(&group.attributes)
        .bind(group.created_at)
        .bind(group.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(ContactGroup::from(record))
    }

    async fn update(&self, group: ContactGroup) -> Result<ContactGroup, RepositoryError> {
        let record = sqlx::query_as::<_, GroupRecord>(&format!(
            r#"
            UPDATE contact_groups
            SET name = $2, attributes = $3, updated_at = $4
            WHERE id = $1
            RETURNING {GROUP_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(group.id))
        .bind(&group.name)
        .bind(&group.attributes)
        .bind(group.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(ContactGroup::from(record))
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<ContactGroup>, RepositoryError> {
        let record = sqlx::query_as::<_, GroupRecord>(&format!(
            "SELECT {GROUP_COLUMNS} FROM contact_groups WHERE id = $1",
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(ContactGroup::from))
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<ContactGroup>, RepositoryError> {
        let records = sqlx::query_as::<_, GroupRecord>(&format!(
            "SELECT {GROUP_COLUMNS} FROM contact_groups WHERE owner_id = $1 ORDER BY created_at",
        ))
        .bind(Uuid::from(owner_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(ContactGroup::from).collect())
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO messages
                (id, owner_id, title, body, response_code, recipients, responded_yes,
                 attributes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.owner_id))
        .bind(&message.title)
        .bind(&message.body)
        .bind(message.response_code.as_str())
        .bind(recipients_json(&message.recipients)?)
        .bind(recipients_json(&message.responded_yes)?)
        .bind(&message.attributes)
        .bind(message.created_at)
        .bind(message.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        // responded_yes 以库内现值为准裁剪：只保留仍在新收件人列表中的
        // 号码，新增只能通过 confirm_recipient
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            UPDATE messages
            SET title = $2,
                body = $3,
                recipients = $4,
                attributes = $5,
                updated_at = $6,
                responded_yes = (
                    SELECT COALESCE(jsonb_agg(entry), '[]'::jsonb)
                    FROM jsonb_array_elements(responded_yes) AS entry
                    WHERE entry->>'phone_number' IN (
                        SELECT wanted->>'phone_number'
                        FROM jsonb_array_elements($4::jsonb) AS wanted
                    )
                )
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "#,
        ))
        .bind(Uuid::from(message.id))
        .bind(&message.title)
        .bind(&message.body)
        .bind(recipients_json(&message.recipients)?)
        .bind(&message.attributes)
        .bind(message.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Message::try_from(record)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1",
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE owner_id = $1 ORDER BY created_at",
        ))
        .bind(Uuid::from(owner_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_response_code(
        &self,
        code: ResponseCode,
    ) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE response_code = $1",
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn confirm_recipient(
        &self,
        id: MessageId,
        recipient: Recipient,
    ) -> Result<ConfirmOutcome, RepositoryError> {
        let entry = serde_json::to_value(vec![&recipient])
            .map_err(|err| invalid_data(err.to_string()))?;

        // 单条带条件的 UPDATE：已有同号码条目时整条语句不命中，
        // 并发确认同一号码时最多只落一条记录
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET responded_yes = responded_yes || $3::jsonb, updated_at = $4
            WHERE id = $1
              AND NOT EXISTS (
                  SELECT 1
                  FROM jsonb_array_elements(responded_yes) AS entry
                  WHERE entry->>'phone_number' = $2
              )
            "#,
        )
        .bind(Uuid::from(id))
        .bind(recipient.phone_number.as_str())
        .bind(entry)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() > 0 {
            return Ok(ConfirmOutcome::Applied);
        }

        // 未命中：要么消息不存在，要么早已确认
        let exists = sqlx::query("SELECT 1 FROM messages WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if exists.is_some() {
            Ok(ConfirmOutcome::AlreadyConfirmed)
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}
