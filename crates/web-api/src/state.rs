use std::sync::Arc;

use application::{AccountService, DispatchService, GroupService, MessageService};
use infrastructure::TwilioSignatureValidator;

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<AccountService>,
    pub group_service: Arc<GroupService>,
    pub message_service: Arc<MessageService>,
    pub dispatch_service: Arc<DispatchService>,
    pub jwt_service: Arc<JwtService>,
    pub signature_validator: Arc<TwilioSignatureValidator>,
    /// 必须与 Twilio 控制台登记的回调地址完全一致
    pub webhook_url: Arc<str>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_service: Arc<AccountService>,
        group_service: Arc<GroupService>,
        message_service: Arc<MessageService>,
        dispatch_service: Arc<DispatchService>,
        jwt_service: Arc<JwtService>,
        signature_validator: Arc<TwilioSignatureValidator>,
        webhook_url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            account_service,
            group_service,
            message_service,
            dispatch_service,
            jwt_service,
            signature_validator,
            webhook_url: webhook_url.into(),
        }
    }
}
