//! Identity descriptors and the resolver boundary.

/// Immutable view of an account used for token issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDescriptor {
    subject: String,
    authorities: Vec<String>,
}

impl IdentityDescriptor {
    /// Create a descriptor. Duplicate authorities are dropped, first occurrence wins.
    pub fn new<I, S>(subject: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for authority in authorities {
            let authority = authority.into();
            if !unique.contains(&authority) {
                unique.push(authority);
            }
        }

        Self {
            subject: subject.into(),
            authorities: unique,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

/// Maps a token subject back to a live account.
///
/// Implemented by the account service; a missing account is reported as
/// [`error::AppError::NotFound`].
#[allow(async_fn_in_trait)]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, subject: &str) -> error::Result<IdentityDescriptor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorities_keep_order_without_duplicates() {
        let identity = IdentityDescriptor::new("alice", ["ROLE_USER", "ROLE_ADMIN", "ROLE_USER"]);

        assert_eq!(identity.subject(), "alice");
        assert_eq!(identity.authorities(), ["ROLE_USER", "ROLE_ADMIN"]);
        assert!(identity.has_authority("ROLE_ADMIN"));
        assert!(!identity.has_authority("ROLE_VIEWER"));
    }
}
