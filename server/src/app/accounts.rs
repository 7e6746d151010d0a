//! Account service: registration, login, profile and token authentication.

use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::auth::token::{TokenError, TokenIssuer};
use crate::store::{RepositoryError, UserRepository};
use crate::types::{Identity, User, UserId, UserView};
use gatherly_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Account operation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Registration with an email already in use
    #[error("Email is already registered")]
    EmailTaken,

    /// Unknown email or wrong password (deliberately indistinguishable)
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Account no longer exists
    #[error("User not found")]
    UserNotFound,

    /// Request failed validation
    #[error("{0}")]
    InvalidInput(String),

    /// Bearer token rejected
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Storage or hashing failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AccountError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::DuplicateEmail => Self::EmailTaken,
            RepositoryError::NotFound => Self::UserNotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for AccountError {
    fn from(error: PasswordError) -> Self {
        Self::Internal(error.to_string())
    }
}

/// Result type for account operations
pub type Result<T> = std::result::Result<T, AccountError>;

/// `POST /api/auth/register` body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterRequest {
    /// Display name
    pub name: String,
    /// Email
    pub email: String,
    /// Plain password
    pub password: String,
    /// Admin flag
    #[serde(default, alias = "isAdmin")]
    pub is_admin: bool,
}

/// `POST /api/auth/login` body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    /// Email
    pub email: String,
    /// Plain password
    pub password: String,
}

/// `PUT /api/auth/update` body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateProfileRequest {
    /// New display name
    pub name: String,
    /// New password; absent or empty keeps the current one
    #[serde(default)]
    pub password: Option<String>,
    /// New admin flag; absent keeps the current one
    #[serde(default, alias = "isAdmin")]
    pub is_admin: Option<bool>,
}

/// Token plus the account it was issued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token
    pub token: String,
    /// The account
    pub user: UserView,
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AccountError::InvalidInput("Name cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let valid = email.trim().split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains('@')
    });
    if valid {
        Ok(())
    } else {
        Err(AccountError::InvalidInput("Invalid email address".to_string()))
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Argon2 is deliberately slow; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AccountError::Internal(format!("Hashing task failed: {e}")))?
        .map_err(AccountError::from)
}

async fn verify_blocking(encoded: String, password: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&encoded, &password))
        .await
        .map_err(|e| AccountError::Internal(format!("Verification task failed: {e}")))?
        .map_err(AccountError::from)
}

/// Account operations exposed to the API layer.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    tokens: TokenIssuer,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    /// Creates a new `AccountService`
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenIssuer, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            tokens,
            clock,
        }
    }

    fn respond(&self, user: &User) -> Result<AuthResponse> {
        Ok(AuthResponse {
            token: self.tokens.issue(user)?,
            user: user.view(),
        })
    }

    /// Create an account and sign the caller in.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on a blank name, malformed email or short password;
    /// `EmailTaken` if the email is in use.
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        validate_name(&request.name)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        let user = User {
            id: UserId::new(),
            name: request.name.trim().to_string(),
            email: crate::store::normalize_email(&request.email),
            password_hash: hash_blocking(request.password).await?,
            is_admin: request.is_admin,
            created_at: self.clock.now(),
        };
        self.users.insert(&user).await?;

        info!(user_id = %user.id, is_admin = user.is_admin, "User registered");
        self.respond(&user)
    }

    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for an unknown email or a wrong password.
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        let Some(user) = self.users.find_by_email(&request.email).await? else {
            warn!("Login for unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        if !verify_blocking(user.password_hash.clone(), request.password).await? {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User logged in");
        self.respond(&user)
    }

    /// The caller's own account.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if it has been removed since the token was issued.
    #[tracing::instrument(skip(self))]
    pub async fn me(&self, identity: Identity) -> Result<UserView> {
        self.users
            .find_by_id(identity.user_id)
            .await?
            .map(|user| user.view())
            .ok_or(AccountError::UserNotFound)
    }

    /// Change name, password and admin flag.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on a blank name or a short new password,
    /// `UserNotFound` if the account is gone.
    #[tracing::instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        identity: Identity,
        request: UpdateProfileRequest,
    ) -> Result<UserView> {
        validate_name(&request.name)?;
        let new_password = request.password.filter(|password| !password.is_empty());
        if let Some(password) = &new_password {
            validate_password(password)?;
        }

        let mut user = self
            .users
            .find_by_id(identity.user_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        user.name = request.name.trim().to_string();
        if let Some(password) = new_password {
            user.password_hash = hash_blocking(password).await?;
        }
        if let Some(is_admin) = request.is_admin {
            user.is_admin = is_admin;
        }
        self.users.update(&user).await?;

        info!(user_id = %user.id, "Profile updated");
        Ok(user.view())
    }

    /// Resolve a bearer token to the caller's identity.
    ///
    /// The admin flag comes from the stored account, so a changed flag takes
    /// effect without re-issuing tokens.
    ///
    /// # Errors
    ///
    /// `Token` if the token is invalid, expired, or names a vanished user.
    pub async fn authenticate(&self, token: &str) -> Result<Identity> {
        let claims = self.tokens.verify(token)?;
        let user = self
            .users
            .find_by_id(claims.user_id())
            .await?
            .ok_or(TokenError::UnknownSubject)?;

        Ok(Identity {
            user_id: user.id,
            is_admin: user.is_admin,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserRepository;
    use chrono::Duration;
    use gatherly_testing::test_clock;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(InMemoryUserRepository::new()),
            TokenIssuer::new("test-secret", Duration::hours(1)),
            Arc::new(gatherly_core::environment::SystemClock),
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ana".to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let accounts = service();
        let registered = accounts
            .register(register_request("Ana@Example.com"))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "ana@example.com");

        let logged_in = accounts
            .login(LoginRequest {
                email: "ana@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user, registered.user);

        let identity = accounts.authenticate(&logged_in.token).await.unwrap();
        assert_eq!(identity, Identity::user(registered.user.id));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let accounts = service();
        accounts.register(register_request("ana@example.com")).await.unwrap();

        assert_eq!(
            accounts.register(register_request("ANA@example.com")).await,
            Err(AccountError::EmailTaken)
        );
    }

    #[tokio::test]
    async fn test_register_validation() {
        let accounts = service();

        let mut short = register_request("ana@example.com");
        short.password = "12345".to_string();
        assert!(matches!(
            accounts.register(short).await,
            Err(AccountError::InvalidInput(_))
        ));

        assert!(matches!(
            accounts.register(register_request("not-an-email")).await,
            Err(AccountError::InvalidInput(_))
        ));

        let mut blank = register_request("ana@example.com");
        blank.name = " ".to_string();
        assert!(matches!(
            accounts.register(blank).await,
            Err(AccountError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_credentials_look_the_same() {
        let accounts = service();
        accounts.register(register_request("ana@example.com")).await.unwrap();

        let wrong_password = accounts
            .login(LoginRequest {
                email: "ana@example.com".to_string(),
                password: "nope-nope".to_string(),
            })
            .await;
        let unknown_email = accounts
            .login(LoginRequest {
                email: "bruno@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await;

        assert_eq!(wrong_password, Err(AccountError::InvalidCredentials));
        assert_eq!(unknown_email, Err(AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_password_when_empty() {
        let accounts = service();
        let registered = accounts.register(register_request("ana@example.com")).await.unwrap();
        let identity = Identity::user(registered.user.id);

        let updated = accounts
            .update_profile(
                identity,
                UpdateProfileRequest {
                    name: "Ana Maria".to_string(),
                    password: Some(String::new()),
                    is_admin: Some(true),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ana Maria");
        assert!(updated.is_admin);

        // Old password still works, and the admin flag is read from the store
        let login = accounts
            .login(LoginRequest {
                email: "ana@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        assert!(accounts.authenticate(&registered.token).await.unwrap().is_admin);
        assert!(login.user.is_admin);
    }

    #[tokio::test]
    async fn test_token_for_unknown_user() {
        let accounts = service();
        let stranger = User {
            id: UserId::new(),
            name: "Ghost".to_string(),
            email: "ghost@example.com".to_string(),
            password_hash: String::new(),
            is_admin: false,
            created_at: test_clock().now(),
        };
        let token = TokenIssuer::new("test-secret", Duration::hours(1))
            .issue(&stranger)
            .unwrap();

        assert_eq!(
            accounts.authenticate(&token).await,
            Err(AccountError::Token(TokenError::UnknownSubject))
        );
    }

    #[tokio::test]
    async fn test_tokens_outlive_a_fixed_clock() {
        // The injected clock is frozen in 2025; tokens must still verify today
        let accounts = AccountService::new(
            Arc::new(InMemoryUserRepository::new()),
            TokenIssuer::new("test-secret", Duration::hours(1)),
            Arc::new(test_clock()),
        );
        let registered = accounts.register(register_request("ana@example.com")).await.unwrap();

        assert_eq!(registered.user.created_at, test_clock().now());
        assert!(accounts.authenticate(&registered.token).await.is_ok());
    }

    #[test]
    fn test_admin_flag_accepts_both_casings() {
        let snake: RegisterRequest = serde_json::from_value(serde_json::json!({
            "name": "Ana", "email": "ana@example.com", "password": "secret1", "is_admin": true
        }))
        .unwrap();
        let camel: RegisterRequest = serde_json::from_value(serde_json::json!({
            "name": "Ana", "email": "ana@example.com", "password": "secret1", "isAdmin": true
        }))
        .unwrap();
        assert!(snake.is_admin);
        assert!(camel.is_admin);

        let update: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({"name": "Ana", "is_admin": true})).unwrap();
        assert_eq!(update.is_admin, Some(true));
    }

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("@b.co").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@.co").is_err());
        assert!(validate_email("a@b@c.co").is_err());
    }
}
