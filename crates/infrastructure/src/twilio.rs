//! Twilio 适配：REST 发送短信与 webhook 签名校验。
//!
//! 签名算法：把回调 URL 与按键名排序的表单参数拼成一个串，
//! 用账号的 auth token 做 HMAC-SHA1，再 Base64 编码，与请求头
//! `X-Twilio-Signature` 比对。

use std::collections::HashMap;

use async_trait::async_trait;
use data_encoding::BASE64;
use ring::hmac;
use serde::Deserialize;
use tracing::debug;

use application::{SmsDeliveryReceipt, SmsGateway, SmsGatewayError};
use domain::PhoneNumber;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Clone)]
pub struct TwilioSmsGateway {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    messaging_service_sid: String,
}

impl TwilioSmsGateway {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        messaging_service_sid: impl Into<String>,
    ) -> Self {
        Self::with_base_url(TWILIO_API_BASE, account_sid, auth_token, messaging_service_sid)
    }

    /// 测试时可以把 base URL 指向本地 mock 服务。
    pub fn with_base_url(
        base_url: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        messaging_service_sid: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            messaging_service_sid: messaging_service_sid.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    status: String,
    error_code: Option<i64>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResource {
    message: Option<String>,
}

#[async_trait]
impl SmsGateway for TwilioSmsGateway {
    async fn send(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<SmsDeliveryReceipt, SmsGatewayError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let mut form: HashMap<&str, &str> = HashMap::new();
        form.insert("To", to.as_str());
        form.insert("Body", body);
        form.insert("MessagingServiceSid", &self.messaging_service_sid);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|err| SmsGatewayError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResource>(&text)
                .ok()
                .and_then(|resource| resource.message)
                .unwrap_or(text);
            return Err(SmsGatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let resource: MessageResource = response
            .json()
            .await
            .map_err(|err| SmsGatewayError::Malformed(err.to_string()))?;
        debug!(sid = %resource.sid, status = %resource.status, "sms accepted by twilio");

        Ok(SmsDeliveryReceipt {
            sid: resource.sid,
            status: resource.status,
            error_code: resource.error_code,
            error_message: resource.error_message,
        })
    }
}

/// webhook 请求签名校验器。
#[derive(Clone)]
pub struct TwilioSignatureValidator {
    key: hmac::Key,
}

impl TwilioSignatureValidator {
    pub fn new(auth_token: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, auth_token.as_bytes()),
        }
    }

    fn payload(url: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut payload = String::from(url);
        for (key, value) in sorted {
            payload.push_str(key);
            payload.push_str(value);
        }
        payload
    }

    /// 计算某次请求的期望签名，测试侧也用它来伪造合法请求。
    pub fn sign(&self, url: &str, params: &[(String, String)]) -> String {
        let payload = Self::payload(url, params);
        let tag = hmac::sign(&self.key, payload.as_bytes());
        BASE64.encode(tag.as_ref())
    }

    /// 常数时间比较由 `ring::hmac::verify` 保证。
    pub fn is_valid(&self, url: &str, params: &[(String, String)], signature: &str) -> bool {
        let decoded = match BASE64.decode(signature.as_bytes()) {
            Ok(decoded) => decoded,
            Err(_) => return false,
        };
        let payload = Self::payload(url, params);
        hmac::verify(&self.key, payload.as_bytes(), &decoded).is_ok()
    }
}
