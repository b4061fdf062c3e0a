//! Registration, login and profile.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use storeline_core::{Email, UserId};

use crate::auth::{
    IssuedToken, TokenService, hash_password, reject_unknown_user, verify_password,
};
use crate::db::{UserRepository, with_timeout};
use crate::email::{EmailSender, OutgoingEmail};
use crate::error::{AppError, Result};
use crate::models::{NewUser, User};

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: Email,
    pub password: String,
    pub name: String,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub user: User,
}

/// User account operations.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create an account. Duplicate emails fail with `DUPLICATE_ENTRY`.
    async fn register(&self, registration: Registration) -> Result<User>;

    /// Check credentials and issue an access token.
    async fn login(&self, email: &Email, password: &str) -> Result<LoginOutcome>;

    /// The caller's own account.
    async fn profile(&self, user_id: UserId) -> Result<User>;
}

/// [`UserService`] over a [`UserRepository`].
pub struct UserServiceImpl {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    mailer: Arc<dyn EmailSender>,
}

impl UserServiceImpl {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            users,
            tokens,
            mailer,
        }
    }

    /// Best effort: a failed welcome email never fails registration.
    async fn send_welcome(&self, user: &User) {
        let result = match OutgoingEmail::welcome(user.email.as_str(), &user.name) {
            Ok(email) => self.mailer.send(&email).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to send welcome email");
        }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register(&self, registration: Registration) -> Result<User> {
        let password_hash = hash_password(&registration.password)?;

        let user = with_timeout(self.users.create(NewUser {
            email: registration.email,
            name: registration.name,
            password_hash,
        }))
        .await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.send_welcome(&user).await;
        Ok(user)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: &Email, password: &str) -> Result<LoginOutcome> {
        let Some(user) = with_timeout(self.users.get_by_email(email)).await? else {
            return Err(reject_unknown_user(password).into());
        };

        verify_password(password, &user.password_hash)?;

        let token = self.tokens.issue(user.id, user.email.as_str())?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome { token, user })
    }

    #[instrument(skip(self))]
    async fn profile(&self, user_id: UserId) -> Result<User> {
        with_timeout(self.users.get_by_id(user_id))
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::db::memory::InMemoryUserRepository;
    use crate::email::FakeEmailSender;
    use crate::error::ErrorCode;

    fn service(mailer: Arc<FakeEmailSender>) -> UserServiceImpl {
        UserServiceImpl::new(
            Arc::new(InMemoryUserRepository::default()),
            TokenService::new(
                &SecretString::from("k3Jx9!qLm2#Vb7$Wn4@Tz8^Hs1&Pd6*Rf0"),
                Duration::from_secs(60),
            ),
            mailer,
        )
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: Email::parse(email).unwrap(),
            password: "hunter2hunter2".to_owned(),
            name: "Jane".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let mailer = Arc::new(FakeEmailSender::new());
        let users = service(mailer.clone());

        let user = users.register(registration("jane@example.com")).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);

        let outcome = users
            .login(&Email::parse("JANE@example.com").unwrap(), "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(outcome.user.id, user.id);
        assert!(!outcome.token.token.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let users = service(Arc::new(FakeEmailSender::new()));
        users.register(registration("jane@example.com")).await.unwrap();
        let err = users
            .register(registration("jane@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);
    }

    #[tokio::test]
    async fn test_welcome_failure_does_not_fail_registration() {
        let mailer = Arc::new(FakeEmailSender::new());
        mailer.fail_sends(true);
        let users = service(mailer);
        assert!(users.register(registration("jane@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_credentials_are_unauthorized() {
        let users = service(Arc::new(FakeEmailSender::new()));
        users.register(registration("jane@example.com")).await.unwrap();

        let wrong_password = users
            .login(&Email::parse("jane@example.com").unwrap(), "nope-nope")
            .await
            .unwrap_err();
        assert_eq!(wrong_password.code(), ErrorCode::Unauthorized);

        let unknown = users
            .login(&Email::parse("who@example.com").unwrap(), "hunter2hunter2")
            .await
            .unwrap_err();
        assert_eq!(unknown.code(), ErrorCode::Unauthorized);
        assert_eq!(unknown.message(), wrong_password.message());
    }

    #[tokio::test]
    async fn test_profile_missing_user() {
        let users = service(Arc::new(FakeEmailSender::new()));
        let err = users.profile(UserId::new()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
