use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::services::{
    CreateGroupRequest, CreateMessageRequest, LoginRequest, RecipientInput, RegisterRequest,
    ReplyOutcome, SendBatchRequest, UpdateGroupRequest, UpdateMessageRequest,
};
use domain::{ContactGroup, GroupId, Message, MessageId, PhoneNumber, ResponseCode, UserId};

use crate::{auth::TokenResponse, error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CreateGroupPayload {
    name: String,
    attributes: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct UpdateGroupPayload {
    name: Option<String>,
    attributes: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RecipientPayload {
    #[serde(alias = "phoneNumber")]
    phone_number: String,
    #[serde(flatten)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl From<RecipientPayload> for RecipientInput {
    fn from(value: RecipientPayload) -> Self {
        RecipientInput {
            phone_number: value.phone_number,
            attributes: value.attributes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateMessagePayload {
    title: String,
    body: String,
    #[serde(alias = "responseId")]
    response_code: String,
    recipients: Vec<RecipientPayload>,
    attributes: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct UpdateMessagePayload {
    title: Option<String>,
    body: Option<String>,
    recipients: Option<Vec<RecipientPayload>>,
    attributes: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SendBatchPayload {
    recipients: Vec<RecipientPayload>,
    message: String,
    #[serde(alias = "responseId")]
    response_id: String,
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    user_id: Option<Uuid>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/groups", post(create_group).get(list_groups))
        .route("/groups/{group_id}", put(update_group))
        .route("/messages", post(create_message).get(list_messages))
        .route(
            "/messages/{message_id}",
            get(get_message).put(update_message).delete(delete_message),
        )
        .route("/twilio", post(send_batch))
        .route("/twilio-webhook", post(twilio_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<UserId, ApiError> {
    state
        .jwt_service
        .extract_user_from_headers(headers)
        .map(UserId::from)
}

fn require_owner(query: OwnerQuery) -> Result<UserId, ApiError> {
    query
        .user_id
        .map(UserId::from)
        .ok_or_else(|| ApiError::bad_request("Missing user_id parameter"))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let user = state
        .account_service
        .register(RegisterRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let user_id = Uuid::from(user.id);
    let token = state.jwt_service.generate_token(user_id)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token, user_id })))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .account_service
        .login(LoginRequest {
            username: payload.username,
            password: payload.password,
        })
        .await?;

    let user_id = Uuid::from(user.id);
    let token = state.jwt_service.generate_token(user_id)?;
    Ok(Json(TokenResponse { token, user_id }))
}

async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGroupPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let owner_id = authorize(&state, &headers)?;
    let group = state
        .group_service
        .create(CreateGroupRequest {
            owner_id,
            name: payload.name,
            attributes: payload.attributes.unwrap_or_else(|| json!({})),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Group created successfully", "id": group.id })),
    ))
}

async fn list_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<ContactGroup>>, ApiError> {
    authorize(&state, &headers)?;
    let owner_id = require_owner(query)?;
    let groups = state.group_service.list_by_owner(owner_id).await?;
    Ok(Json(groups))
}

async fn update_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<UpdateGroupPayload>,
) -> Result<Json<ContactGroup>, ApiError> {
    authorize(&state, &headers)?;
    let group = state
        .group_service
        .update(
            GroupId::from(group_id),
            UpdateGroupRequest {
                name: payload.name,
                attributes: payload.attributes,
            },
        )
        .await?;
    Ok(Json(group))
}

async fn create_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateMessagePayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let owner_id = authorize(&state, &headers)?;
    let message = state
        .message_service
        .create(CreateMessageRequest {
            owner_id,
            title: payload.title,
            body: payload.body,
            response_code: payload.response_code,
            recipients: payload
                .recipients
                .into_iter()
                .map(RecipientInput::from)
                .collect(),
            attributes: payload.attributes.unwrap_or_else(|| json!({})),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Message created successfully", "id": message.id })),
    ))
}

async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    authorize(&state, &headers)?;
    let owner_id = require_owner(query)?;
    let messages = state.message_service.list_by_owner(owner_id).await?;
    Ok(Json(messages))
}

async fn get_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    authorize(&state, &headers)?;
    let message = state.message_service.get(MessageId::from(message_id)).await?;
    Ok(Json(message))
}

async fn update_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<Uuid>,
    Json(payload): Json<UpdateMessagePayload>,
) -> Result<Json<Message>, ApiError> {
    authorize(&state, &headers)?;
    let message = state
        .message_service
        .update(
            MessageId::from(message_id),
            UpdateMessageRequest {
                title: payload.title,
                body: payload.body,
                recipients: payload
                    .recipients
                    .map(|items| items.into_iter().map(RecipientInput::from).collect()),
                attributes: payload.attributes,
            },
        )
        .await?;
    Ok(Json(message))
}

async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    state
        .message_service
        .delete(MessageId::from(message_id))
        .await?;
    Ok(Json(json!({ "message": "Message deleted successfully" })))
}

async fn send_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendBatchPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;

    let recipients = payload
        .recipients
        .into_iter()
        .map(|recipient| PhoneNumber::parse(recipient.phone_number))
        .collect::<Result<Vec<_>, _>>()?;
    let response_code = ResponseCode::parse(payload.response_id)?;

    let reports = state
        .dispatch_service
        .send_batch(SendBatchRequest {
            recipients,
            body: payload.message,
            response_code,
        })
        .await;

    Ok(Json(json!({ "responses": reports })))
}

/// webhook 入口。签名不合法时直接 403，任何业务逻辑都不执行。
async fn twilio_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<Vec<(String, String)>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get("X-Twilio-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::forbidden("missing signature"))?;

    if !state
        .signature_validator
        .is_valid(&state.webhook_url, &params, signature)
    {
        return Err(ApiError::forbidden("invalid signature"));
    }

    let field = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    };

    match state
        .dispatch_service
        .handle_reply(field("Body"), field("From"))
        .await?
    {
        ReplyOutcome::Confirmed { .. } => Ok(Json(json!({ "message": "Response recorded" }))),
        ReplyOutcome::NoMatchingMessage => Err(ApiError::not_found(
            "NO_MATCHING_MESSAGE",
            "no matching message found",
        )),
        ReplyOutcome::NoMatchingContact { .. } => Err(ApiError::not_found(
            "NO_MATCHING_CONTACT",
            "no matching contact found",
        )),
    }
}
