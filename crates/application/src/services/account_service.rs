//! 账号用例：注册与登录。
//!
//! 注册按 用户名 → 邮箱 → 口令 的顺序校验，遇错即止；
//! 重名检查对用户名大小写不敏感（统一小写后入库），邮箱按原样精确比较。

use std::sync::Arc;

use domain::{DomainError, User, UserEmail, UserId, Username};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    password::{PasswordHasher, PasswordPolicy},
    repository::UserRepository,
};

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub struct AccountServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

pub struct AccountService {
    deps: AccountServiceDependencies,
}

impl AccountService {
    pub fn new(deps: AccountServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username)?;
        if self
            .deps
            .user_repository
            .find_by_username(username.clone())
            .await?
            .is_some()
        {
            return Err(ApplicationError::Domain(DomainError::UserAlreadyExists));
        }

        let email = UserEmail::parse(request.email)?;
        if self
            .deps
            .user_repository
            .find_by_email(email.clone())
            .await?
            .is_some()
        {
            return Err(ApplicationError::Domain(DomainError::UserAlreadyExists));
        }

        PasswordPolicy::validate(&request.password)?;
        let password_hash = self.deps.password_hasher.hash(&request.password).await?;

        let now = self.deps.clock.now();
        let user = User::register(
            UserId::from(Uuid::new_v4()),
            username,
            email,
            password_hash,
            now,
        );

        let stored = self.deps.user_repository.create(user).await?;
        Ok(stored)
    }

    /// 用户名或口令任一不匹配都返回同一个认证错误，不泄露差别。
    pub async fn login(&self, request: LoginRequest) -> Result<User, ApplicationError> {
        let username =
            Username::parse(request.username).map_err(|_| ApplicationError::Authentication)?;
        let user = self
            .deps
            .user_repository
            .find_by_username(username)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !password_ok {
            return Err(ApplicationError::Authentication);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::MockPasswordHasher;
    use crate::repository::MockUserRepository;
    use crate::SystemClock;
    use domain::PasswordHash;

    fn hash_fixture() -> PasswordHash {
        PasswordHash::new("$2b$12$abcdefghijklmnopqrstuvwxyz012345678901234567890123456").unwrap()
    }

    fn stored_user(username: &str, email: &str) -> User {
        let now = chrono::Utc::now();
        User::register(
            UserId::from(Uuid::new_v4()),
            Username::parse(username).unwrap(),
            UserEmail::parse(email).unwrap(),
            hash_fixture(),
            now,
        )
    }

    fn service(
        repository: MockUserRepository,
        hasher: MockPasswordHasher,
    ) -> AccountService {
        AccountService::new(AccountServiceDependencies {
            user_repository: Arc::new(repository),
            password_hasher: Arc::new(hasher),
            clock: Arc::new(SystemClock),
        })
    }

    #[tokio::test]
    async fn register_creates_user_with_normalized_username() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_find_by_username()
            .returning(|_| Ok(None));
        repository.expect_find_by_email().returning(|_| Ok(None));
        repository
            .expect_create()
            .returning(|user| Ok(user));

        let mut hasher = MockPasswordHasher::new();
        hasher.expect_hash().returning(|_| Ok(hash_fixture()));

        let service = service(repository, hasher);
        let user = service
            .register(RegisterRequest {
                username: "Rae.Dawn".to_owned(),
                email: "rae@example.com".to_owned(),
                password: "GoodPass123".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(user.username.as_str(), "rae.dawn");
        assert_eq!(user.email.as_str(), "rae@example.com");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username_case_insensitively() {
        let mut repository = MockUserRepository::new();
        repository.expect_find_by_username().returning(|username| {
            // 查询的是统一小写后的用户名
            assert_eq!(username.as_str(), "raedawn");
            Ok(Some(stored_user("raedawn", "first@example.com")))
        });

        // 用户名冲突后不应再查邮箱、也不应哈希口令
        let service = service(repository, MockPasswordHasher::new());
        let err = service
            .register(RegisterRequest {
                username: "RaeDawn".to_owned(),
                email: "second@example.com".to_owned(),
                password: "GoodPass123".to_owned(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_find_by_username()
            .returning(|_| Ok(None));
        repository.expect_find_by_email().returning(|_| {
            Ok(Some(stored_user("someoneelse", "taken@example.com")))
        });

        let service = service(repository, MockPasswordHasher::new());
        let err = service
            .register(RegisterRequest {
                username: "newuser".to_owned(),
                email: "taken@example.com".to_owned(),
                password: "GoodPass123".to_owned(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn register_short_circuits_on_invalid_username() {
        // 用户名非法时不应触达存储，也不应哈希口令
        let service = service(MockUserRepository::new(), MockPasswordHasher::new());
        let err = service
            .register(RegisterRequest {
                username: "${injection}".to_owned(),
                email: "user@example.com".to_owned(),
                password: "GoodPass123".to_owned(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn register_rejects_weak_password_before_hashing() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_find_by_username()
            .returning(|_| Ok(None));
        repository.expect_find_by_email().returning(|_| Ok(None));

        // 口令策略失败时 MockPasswordHasher 没有任何期望，
        // 一旦被调用测试会直接失败
        let service = service(repository, MockPasswordHasher::new());
        let err = service
            .register(RegisterRequest {
                username: "newuser".to_owned(),
                email: "user@example.com".to_owned(),
                password: "short".to_owned(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_find_by_username()
            .returning(|_| Ok(Some(stored_user("raedawn", "rae@example.com"))));

        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| Ok(false));

        let service = service(repository, hasher);
        let err = service
            .login(LoginRequest {
                username: "raedawn".to_owned(),
                password: "WrongPass123".to_owned(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Authentication));
    }

    #[tokio::test]
    async fn login_rejects_unknown_username() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_find_by_username()
            .returning(|_| Ok(None));

        let service = service(repository, MockPasswordHasher::new());
        let err = service
            .login(LoginRequest {
                username: "nobody".to_owned(),
                password: "GoodPass123".to_owned(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Authentication));
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_credentials() {
        let expected = stored_user("raedawn", "rae@example.com");
        let returned = expected.clone();

        let mut repository = MockUserRepository::new();
        repository
            .expect_find_by_username()
            .returning(move |_| Ok(Some(returned.clone())));

        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| Ok(true));

        let service = service(repository, hasher);
        let user = service
            .login(LoginRequest {
                username: "RaeDawn".to_owned(),
                password: "GoodPass123".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(user.id, expected.id);
    }
}
