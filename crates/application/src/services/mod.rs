pub mod account_service;
pub mod dispatch_service;
pub mod group_service;
pub mod message_service;

pub use account_service::{
    AccountService, AccountServiceDependencies, LoginRequest, RegisterRequest,
};
pub use dispatch_service::{
    DispatchService, DispatchServiceDependencies, ReplyOutcome, SendBatchRequest, SendReport,
};
pub use group_service::{CreateGroupRequest, GroupService, UpdateGroupRequest};
pub use message_service::{
    CreateMessageRequest, MessageService, RecipientInput, UpdateMessageRequest,
};
