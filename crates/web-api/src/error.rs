use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;
        use domain::DomainError;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                format!("{}: {}", field, reason),
            ),
            // 重名注册按校验失败处理，返回 400 而不是 409
            AppErr::Domain(DomainError::UserAlreadyExists) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "USER_EXISTS",
                "username or email already exists",
            ),
            AppErr::Domain(DomainError::UserNotFound) => {
                ApiError::not_found("USER_NOT_FOUND", "user not found")
            }
            AppErr::Domain(DomainError::GroupNotFound) => {
                ApiError::not_found("GROUP_NOT_FOUND", "group not found")
            }
            AppErr::Domain(DomainError::MessageNotFound) => {
                ApiError::not_found("MESSAGE_NOT_FOUND", "message not found")
            }
            AppErr::Domain(DomainError::RecipientNotFound) => {
                ApiError::not_found("RECIPIENT_NOT_FOUND", "recipient not found")
            }
            AppErr::Repository(repo_err) => match repo_err {
                domain::RepositoryError::NotFound => {
                    ApiError::not_found("NOT_FOUND", "requested resource not found")
                }
                domain::RepositoryError::Conflict => ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "CONFLICT",
                    "resource already exists",
                ),
                domain::RepositoryError::Storage { message } => {
                    // 细节只进日志，响应体保持通用
                    error!(detail = %message, "storage failure");
                    ApiError::internal_server_error("internal error")
                }
            },
            AppErr::Password(err) => {
                error!(detail = %err, "password hashing failure");
                ApiError::internal_server_error("internal error")
            }
            AppErr::Authentication => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_FAILED",
                "invalid username or password",
            ),
        }
    }
}

impl From<domain::DomainError> for ApiError {
    fn from(error: domain::DomainError) -> Self {
        ApiError::from(ApplicationError::from(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
