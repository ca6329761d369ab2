//! Account-backed identity resolution

use std::sync::Arc;

use auth::{IdentityDescriptor, IdentityResolver};
use error::AppError;

use crate::models::Account;
use crate::repository::AccountRepository;

/// Resolves token subjects to live accounts
pub struct AccountIdentityResolver<R> {
    accounts: Arc<R>,
}

impl<R: AccountRepository> AccountIdentityResolver<R> {
    pub fn new(accounts: Arc<R>) -> Self {
        Self { accounts }
    }

    /// The live account behind a token subject.
    pub async fn resolve_account(&self, subject: &str) -> error::Result<Account> {
        self.accounts
            .find_by_username(subject)
            .await
            .map_err(|e| AppError::Repository(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("User not found with username: {subject}")))
    }
}

impl<R: AccountRepository> IdentityResolver for AccountIdentityResolver<R> {
    async fn resolve(&self, subject: &str) -> error::Result<IdentityDescriptor> {
        Ok(self.resolve_account(subject).await?.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryAccountRepository;

    #[tokio::test]
    async fn test_resolve_existing_account() {
        let repo = Arc::new(InMemoryAccountRepository::new());
        repo.save(&Account {
            id: None,
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "hash".to_string(),
            date_of_birth: None,
            phone_number: None,
            address: None,
            roles: vec!["USER".to_string(), "ADMIN".to_string()],
            created_at: None,
        })
        .await
        .unwrap();

        let identity = AccountIdentityResolver::new(repo).resolve("testuser").await.unwrap();

        assert_eq!(identity.subject(), "testuser");
        assert_eq!(identity.authorities(), ["ROLE_USER", "ROLE_ADMIN"]);
    }

    #[tokio::test]
    async fn test_resolve_account_keeps_id() {
        let repo = Arc::new(InMemoryAccountRepository::new());
        let saved = repo
            .save(&Account {
                id: None,
                username: "testuser".to_string(),
                email: "test@example.com".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password_hash: "hash".to_string(),
                date_of_birth: None,
                phone_number: None,
                address: None,
                roles: vec!["USER".to_string()],
                created_at: None,
            })
            .await
            .unwrap();

        let account = AccountIdentityResolver::new(repo).resolve_account("testuser").await.unwrap();

        assert_eq!(account.id, saved.id);
        assert!(matches!(
            AccountIdentityResolver::new(Arc::new(InMemoryAccountRepository::new()))
                .resolve_account("testuser")
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_unknown_account() {
        let resolver = AccountIdentityResolver::new(Arc::new(InMemoryAccountRepository::new()));

        let result = resolver.resolve("nobody").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
