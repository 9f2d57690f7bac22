//! HTTP 接入层。
//!
//! axum 路由、请求/响应负载定义、JWT 认证与统一错误映射。

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use auth::{Claims, JwtService, TokenResponse};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
