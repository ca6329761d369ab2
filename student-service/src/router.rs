//! Service Router
//!
//! Entry point for the request-handling layer. Wires the token, account and
//! course services together and guards course operations with bearer tokens.

use std::sync::Arc;

use auth::{IdentityDescriptor, TokenService};
use error::{AppError, AuthError};

use crate::authentication::AuthenticationService;
use crate::config::StudentServiceConfig;
use crate::course::CourseService;
use crate::identity::AccountIdentityResolver;
use crate::models::{
    Account, AuthenticationResponse, Course, CourseView, CreateCourseRequest, LoginRequest,
    RegisterRequest,
};
use crate::password::Argon2PasswordEncoder;
use crate::repository::{InMemoryAccountRepository, InMemoryCourseRepository};

const BEARER_PREFIX: &str = "Bearer ";

/// Service router that manages in-process service calls
pub struct ServiceRouter {
    tokens: Arc<TokenService>,
    authentication: AuthenticationService<InMemoryAccountRepository>,
    identities: AccountIdentityResolver<InMemoryAccountRepository>,
    courses: CourseService<InMemoryAccountRepository, InMemoryCourseRepository>,
}

impl ServiceRouter {
    pub fn new(config: &StudentServiceConfig) -> Result<Self, AppError> {
        let tokens = TokenService::new(&config.token).map_err(|e| {
            tracing::error!("Failed to initialise token service: {}", e);
            AppError::Internal(e.to_string())
        })?;
        Ok(Self::with_token_service(Arc::new(tokens), &config.default_role))
    }

    /// Build the router around an existing token service.
    pub fn with_token_service(tokens: Arc<TokenService>, default_role: &str) -> Self {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let courses = Arc::new(InMemoryCourseRepository::new());

        Self {
            tokens,
            authentication: AuthenticationService::new(accounts.clone(), Arc::new(Argon2PasswordEncoder::new()))
                .with_default_role(default_role),
            identities: AccountIdentityResolver::new(accounts.clone()),
            courses: CourseService::new(accounts, courses),
        }
    }

    /// Register and receive a token
    pub async fn signup(&self, request: RegisterRequest) -> Result<AuthenticationResponse, AppError> {
        let account = self.authentication.signup(request).await?;
        self.token_response(&account)
    }

    /// Log in and receive a token
    pub async fn login(&self, request: LoginRequest) -> Result<AuthenticationResponse, AppError> {
        let account = self.authentication.authenticate(request).await?;
        self.token_response(&account)
    }

    /// Authenticate a request from its `Authorization` header value.
    ///
    /// The token is fully validated first, so an expired or forged token is
    /// reported as such; its subject must then still map to an account.
    pub async fn authorize(&self, authorization: Option<&str>) -> Result<IdentityDescriptor, AppError> {
        Ok(self.authenticated_account(authorization).await?.identity())
    }

    pub async fn list_courses(&self, authorization: Option<&str>) -> Result<Vec<CourseView>, AppError> {
        self.authorize(authorization).await?;
        self.courses.list_courses().await
    }

    pub async fn create_course(
        &self,
        authorization: Option<&str>,
        request: CreateCourseRequest,
    ) -> Result<CourseView, AppError> {
        self.authorize(authorization).await?;
        self.courses.create_course(request).await
    }

    /// Enroll the authenticated student in a course
    pub async fn register(&self, authorization: Option<&str>, course_id: i64) -> Result<(), AppError> {
        let student_id = self.current_student_id(authorization).await?;
        self.courses.register_to_course(student_id, course_id).await
    }

    /// Withdraw the authenticated student from a course
    pub async fn cancel(&self, authorization: Option<&str>, course_id: i64) -> Result<(), AppError> {
        let student_id = self.current_student_id(authorization).await?;
        self.courses.cancel_registration(student_id, course_id).await
    }

    /// Course schedule of the authenticated student
    pub async fn schedule(&self, authorization: Option<&str>) -> Result<Vec<Course>, AppError> {
        let student_id = self.current_student_id(authorization).await?;
        self.courses.schedule_for(student_id).await
    }

    async fn current_student_id(&self, authorization: Option<&str>) -> Result<i64, AppError> {
        self.authenticated_account(authorization)
            .await?
            .id
            .ok_or(AppError::Auth(AuthError::Unauthorized))
    }

    async fn authenticated_account(&self, authorization: Option<&str>) -> Result<Account, AppError> {
        let token = bearer_token(authorization)?;
        let claims = self.tokens.validate(token, None)?;

        self.identities
            .resolve_account(claims.subject())
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => {
                    tracing::warn!(subject = claims.subject(), "Token subject has no account");
                    AppError::Auth(AuthError::Unauthorized)
                }
                other => other,
            })
    }

    fn token_response(&self, account: &Account) -> Result<AuthenticationResponse, AppError> {
        let token = self.tokens.generate_token(&account.identity())?;
        Ok(AuthenticationResponse {
            token,
            expires_in: self.tokens.expiration_time().num_milliseconds(),
        })
    }
}

/// Extract the token from a `Bearer` authorization header.
fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    authorization
        .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc123")), Ok("abc123"));
        assert_eq!(bearer_token(Some("abc123")), Err(AuthError::Unauthorized));
        assert_eq!(bearer_token(Some("Basic abc123")), Err(AuthError::Unauthorized));
        assert_eq!(bearer_token(Some("Bearer ")), Err(AuthError::Unauthorized));
        assert_eq!(bearer_token(None), Err(AuthError::Unauthorized));
    }
}
