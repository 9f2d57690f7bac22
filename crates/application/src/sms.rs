//! 短信网关抽象。

use async_trait::async_trait;
use domain::PhoneNumber;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 网关返回的单条短信回执。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsDeliveryReceipt {
    /// 服务商分配的消息标识
    pub sid: String,
    /// 服务商侧的投递状态（如 queued / sent / delivered）
    pub status: String,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum SmsGatewayError {
    /// 请求未到达服务商（网络、超时等）
    #[error("gateway request failed: {0}")]
    Request(String),
    /// 服务商明确拒绝了这条消息
    #[error("gateway rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// 服务商应答无法解析
    #[error("gateway response malformed: {0}")]
    Malformed(String),
}

/// 外发短信网关。单条发送失败只影响该收件人，调用方负责继续
/// 处理批次中的其余收件人。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<SmsDeliveryReceipt, SmsGatewayError>;
}
