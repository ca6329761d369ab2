//! Authentication service
//!
//! Signup and credential checks. Password hashing runs on the blocking pool
//! since Argon2 is deliberately slow.

use std::sync::Arc;

use error::{AppError, AuthError};

use crate::models::{Account, LoginRequest, RegisterRequest, DEFAULT_ROLE};
use crate::password::PasswordEncoder;
use crate::repository::{AccountRepository, RepositoryError};

/// Account registration and login
pub struct AuthenticationService<R> {
    accounts: Arc<R>,
    encoder: Arc<dyn PasswordEncoder>,
    default_role: String,
}

impl<R: AccountRepository> AuthenticationService<R> {
    pub fn new(accounts: Arc<R>, encoder: Arc<dyn PasswordEncoder>) -> Self {
        Self {
            accounts,
            encoder,
            default_role: DEFAULT_ROLE.to_string(),
        }
    }

    /// Role assigned to newly registered accounts.
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    /// Register a new student account
    pub async fn signup(&self, request: RegisterRequest) -> Result<Account, AppError> {
        request.validate()?;

        let password_hash = self.encode_password(request.password).await?;
        let account = Account {
            id: None,
            username: request.username,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            password_hash,
            date_of_birth: request.date_of_birth,
            phone_number: request.phone_number,
            address: request.address,
            roles: vec![self.default_role.clone()],
            created_at: None,
        };

        let saved = self.accounts.save(&account).await.map_err(|e| {
            match e.downcast_ref::<RepositoryError>() {
                Some(RepositoryError::Conflict(_)) => {
                    tracing::info!(username = %account.username, "Signup rejected: username taken");
                    AppError::Conflict("A student with this username already exists.".to_string())
                }
                _ => AppError::Repository(e.to_string()),
            }
        })?;

        tracing::info!(username = %saved.username, id = ?saved.id, "Registered student");
        Ok(saved)
    }

    /// Authenticate a login request
    pub async fn authenticate(&self, request: LoginRequest) -> Result<Account, AppError> {
        request.validate()?;
        self.verify_credentials(&request.username, &request.password)
            .await
    }

    /// Check a username/password pair against the stored hash.
    ///
    /// Unknown users and wrong passwords fail identically.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Account, AppError> {
        let account = self
            .accounts
            .find_by_username(username)
            .await
            .map_err(|e| AppError::Repository(e.to_string()))?;

        let Some(account) = account else {
            tracing::warn!(username, "Login failed: unknown user");
            return Err(AuthError::InvalidCredentials.into());
        };

        let encoder = Arc::clone(&self.encoder);
        let raw = password.to_string();
        let hash = account.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || encoder.matches(&raw, &hash))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        if !matches {
            tracing::warn!(username, "Login failed: bad password");
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(account)
    }

    async fn encode_password(&self, raw: String) -> Result<String, AppError> {
        let encoder = Arc::clone(&self.encoder);
        tokio::task::spawn_blocking(move || encoder.encode(&raw))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
