//! 集成测试基座：内存存储 + 脚本化短信网关拼出的完整路由。

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use application::{
    AccountService, AccountServiceDependencies, DispatchService, DispatchServiceDependencies,
    GroupService, MessageService, SmsDeliveryReceipt, SmsGateway, SmsGatewayError, SystemClock,
};
use config::JwtConfig;
use domain::PhoneNumber;
use infrastructure::{
    BcryptPasswordHasher, InMemoryGroupRepository, InMemoryMessageRepository,
    InMemoryUserRepository, TwilioSignatureValidator,
};
use web_api::{router, AppState, JwtService};

pub const WEBHOOK_URL: &str = "https://example.com/twilio-webhook";
pub const TWILIO_AUTH_TOKEN: &str = "test-twilio-auth-token";

/// 按号码脚本化成功/失败的网关替身，记录每次外发。
pub struct ScriptedSmsGateway {
    failing: Mutex<HashSet<String>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl ScriptedSmsGateway {
    pub fn new() -> Self {
        Self {
            failing: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_for(&self, phone: &str) {
        self.failing.lock().unwrap().insert(phone.to_owned());
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsGateway for ScriptedSmsGateway {
    async fn send(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<SmsDeliveryReceipt, SmsGatewayError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.as_str().to_owned(), body.to_owned()));

        if self.failing.lock().unwrap().contains(to.as_str()) {
            return Err(SmsGatewayError::Rejected {
                status: 400,
                message: "unreachable number".to_owned(),
            });
        }
        Ok(SmsDeliveryReceipt {
            sid: format!("SM-{}", to.as_str()),
            status: "queued".to_owned(),
            error_code: None,
            error_message: None,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<ScriptedSmsGateway>,
    pub validator: TwilioSignatureValidator,
    pub messages: Arc<InMemoryMessageRepository>,
}

pub fn spawn_app() -> TestApp {
    let user_repository = Arc::new(InMemoryUserRepository::new());
    let group_repository = Arc::new(InMemoryGroupRepository::new());
    let message_repository = Arc::new(InMemoryMessageRepository::new());
    let gateway = Arc::new(ScriptedSmsGateway::new());

    // cost 4 只用于测试，生产 cost 来自配置
    let password_hasher = Arc::new(BcryptPasswordHasher::new(Some(4)));
    let clock = Arc::new(SystemClock);

    let account_service = Arc::new(AccountService::new(AccountServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher,
        clock: clock.clone(),
    }));
    let group_service = Arc::new(GroupService::new(group_repository, clock.clone()));
    let message_service = Arc::new(MessageService::new(message_repository.clone(), clock));
    let dispatch_service = Arc::new(DispatchService::new(DispatchServiceDependencies {
        message_repository: message_repository.clone(),
        sms_gateway: gateway.clone(),
    }));

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "integration-test-secret-key-with-length".to_owned(),
        expiration_hours: 1,
    }));
    let validator = TwilioSignatureValidator::new(TWILIO_AUTH_TOKEN);

    let state = AppState::new(
        account_service,
        group_service,
        message_service,
        dispatch_service,
        jwt_service,
        Arc::new(validator.clone()),
        WEBHOOK_URL,
    );

    TestApp {
        router: router(state),
        gateway,
        validator,
        messages: message_repository,
    }
}

pub async fn send_json(
    router: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// webhook 请求：表单编码 + 可选的 `X-Twilio-Signature` 头。
pub async fn send_webhook(
    router: &Router,
    params: &[(String, String)],
    signature: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/twilio-webhook")
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(signature) = signature {
        builder = builder.header("X-Twilio-Signature", signature);
    }
    let request = builder.body(Body::from(form_encode(params))).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn form_params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// 表单百分号编码，`+` 等保留字符必须转义，否则解码端会把它当空格。
fn form_encode(params: &[(String, String)]) -> String {
    fn escape(value: &str) -> String {
        let mut out = String::new();
        for byte in value.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    out.push(byte as char)
                }
                _ => out.push_str(&format!("%{byte:02X}")),
            }
        }
        out
    }

    params
        .iter()
        .map(|(key, value)| format!("{}={}", escape(key), escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}
