//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    AccountService, AccountServiceDependencies, DispatchService, DispatchServiceDependencies,
    GroupService, MessageService, SystemClock,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool_with, BcryptPasswordHasher, PgGroupRepository, PgMessageRepository,
    PgUserRepository, TwilioSignatureValidator, TwilioSmsGateway,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();
    config.validate()?;

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').last().unwrap_or("unknown")
    );

    let pg_pool =
        create_pg_pool_with(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    infrastructure::MIGRATOR.run(&pg_pool).await?;

    let user_repository = Arc::new(PgUserRepository::new(pg_pool.clone()));
    let group_repository = Arc::new(PgGroupRepository::new(pg_pool.clone()));
    let message_repository = Arc::new(PgMessageRepository::new(pg_pool));

    let password_hasher: Arc<dyn application::PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(config.server.bcrypt_cost));
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    // Twilio 客户端在启动时构建一次，整个进程复用
    let sms_gateway = Arc::new(TwilioSmsGateway::new(
        config.twilio.account_sid.clone(),
        config.twilio.auth_token.clone(),
        config.twilio.messaging_service_sid.clone(),
    ));
    let signature_validator = Arc::new(TwilioSignatureValidator::new(&config.twilio.auth_token));

    let account_service = Arc::new(AccountService::new(AccountServiceDependencies {
        user_repository,
        password_hasher,
        clock: clock.clone(),
    }));
    let group_service = Arc::new(GroupService::new(group_repository, clock.clone()));
    let message_service = Arc::new(MessageService::new(message_repository.clone(), clock));
    let dispatch_service = Arc::new(DispatchService::new(DispatchServiceDependencies {
        message_repository,
        sms_gateway,
    }));

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let state = AppState::new(
        account_service,
        group_service,
        message_service,
        dispatch_service,
        jwt_service,
        signature_validator,
        config.twilio.webhook_url.as_str(),
    );

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("短信群发服务启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
