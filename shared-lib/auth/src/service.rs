//! Token issuance and validation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use error::{AuthError, EncodingError, SignatureError};
use serde_json::{Map, Value};

use crate::claims::{self, ClaimSet, ClaimValue, CustomClaims};
use crate::clock::{Clock, SystemClock};
use crate::config::TokenConfig;
use crate::identity::IdentityDescriptor;
use crate::signer::HmacSigner;

/// Custom claim carrying the identity's authorities.
pub const ROLES_CLAIM: &str = "roles";

/// Issues and validates compact session tokens.
///
/// Stateless apart from the signing key and clock, both fixed at construction,
/// so a single instance can be shared across threads. There is no revocation
/// list: a token stays valid until `exp` whatever happens to the account.
pub struct TokenService {
    signer: HmacSigner,
    expires_in: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Result<Self, SignatureError> {
        Ok(Self {
            signer: HmacSigner::new(&config.secret)?,
            expires_in: config.expires_in,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configured default token lifetime.
    pub fn expiration_time(&self) -> Duration {
        self.expires_in
    }

    /// Build, encode and sign a claim set for `identity`.
    pub fn issue(
        &self,
        identity: &IdentityDescriptor,
        custom_claims: CustomClaims,
        lifetime: Duration,
    ) -> Result<String, EncodingError> {
        if lifetime <= Duration::zero() {
            return Err(EncodingError::NonPositiveLifetime);
        }
        if let Some(name) = custom_claims.keys().find(|name| claims::is_reserved(name)) {
            tracing::warn!(subject = identity.subject(), claim = %name, "Rejected reserved custom claim");
            return Err(EncodingError::ReservedClaim(name.clone()));
        }

        let issued_at = nearest_second(self.clock.now().timestamp_millis());
        let expires_at = issued_at.saturating_add(nearest_second(lifetime.num_milliseconds()).max(1));
        if DateTime::from_timestamp(expires_at, 0).is_none() {
            tracing::warn!(subject = identity.subject(), "Rejected token lifetime beyond date range");
            return Err(EncodingError::LifetimeOutOfRange);
        }

        let claims = ClaimSet::new(identity.subject(), issued_at, expires_at).with_custom(custom_claims);
        let payload = claims::encode(&claims)?;
        let token = self.signer.sign(&payload)?;

        tracing::debug!(subject = identity.subject(), expires_at, "Issued token");
        Ok(token)
    }

    /// Issue with custom claims given as untyped JSON.
    pub fn issue_json(
        &self,
        identity: &IdentityDescriptor,
        custom_claims: Map<String, Value>,
        lifetime: Duration,
    ) -> Result<String, EncodingError> {
        let custom = custom_claims
            .into_iter()
            .map(|(name, value)| ClaimValue::from_json(&name, value).map(|value| (name, value)))
            .collect::<Result<CustomClaims, _>>()?;
        self.issue(identity, custom, lifetime)
    }

    /// Issue a token with the default lifetime, embedding the identity's authorities.
    pub fn generate_token(&self, identity: &IdentityDescriptor) -> Result<String, EncodingError> {
        let mut custom = CustomClaims::new();
        custom.insert(
            ROLES_CLAIM.to_string(),
            ClaimValue::StringList(identity.authorities().to_vec()),
        );
        self.issue(identity, custom, self.expires_in)
    }

    /// Issue a token with the default lifetime and caller-supplied claims.
    pub fn generate_token_with_claims(
        &self,
        identity: &IdentityDescriptor,
        custom_claims: CustomClaims,
    ) -> Result<String, EncodingError> {
        self.issue(identity, custom_claims, self.expires_in)
    }

    /// Verify, decode and check a token.
    ///
    /// Checks run in order: signature, claims decoding, expiry, then subject.
    pub fn validate(&self, token: &str, expected_subject: Option<&str>) -> Result<ClaimSet, AuthError> {
        let now = self.clock.now();
        let claims = self.verified_claims(token)?;

        if claims.is_expired_at(now) {
            tracing::debug!(subject = claims.subject(), "Token expired");
            return Err(AuthError::Expired);
        }

        if let Some(expected) = expected_subject {
            if claims.subject() != expected {
                tracing::warn!(
                    expected,
                    actual = claims.subject(),
                    "Token subject mismatch"
                );
                return Err(AuthError::SubjectMismatch);
            }
        }

        Ok(claims)
    }

    /// Project a value out of a verified token.
    ///
    /// Expiry is not checked. `Ok(None)` means the claim is absent, not that
    /// the token is invalid.
    pub fn extract_claim<T, F>(&self, token: &str, selector: F) -> Result<Option<T>, AuthError>
    where
        F: FnOnce(&ClaimSet) -> Option<T>,
    {
        let claims = self.verified_claims(token)?;
        Ok(selector(&claims))
    }

    pub fn extract_subject(&self, token: &str) -> Result<String, AuthError> {
        Ok(self.verified_claims(token)?.subject().to_string())
    }

    pub fn extract_expiration(&self, token: &str) -> Result<DateTime<Utc>, AuthError> {
        self.verified_claims(token)?
            .expiration()
            .ok_or(AuthError::Malformed)
    }

    /// Time left until `exp`; zero or negative once expired.
    pub fn remaining_lifetime(&self, token: &str) -> Result<Duration, AuthError> {
        let now = self.clock.now();
        let claims = self.verified_claims(token)?;
        let remaining_ms = claims
            .expires_at()
            .saturating_mul(1000)
            .saturating_sub(now.timestamp_millis());
        Ok(Duration::milliseconds(remaining_ms))
    }

    pub fn is_token_expired(&self, token: &str) -> Result<bool, AuthError> {
        let now = self.clock.now();
        Ok(self.verified_claims(token)?.is_expired_at(now))
    }

    /// True when the token is authentic, unexpired and issued for `identity`.
    pub fn is_token_valid(&self, token: &str, identity: &IdentityDescriptor) -> bool {
        self.validate(token, Some(identity.subject())).is_ok()
    }

    fn verified_claims(&self, token: &str) -> Result<ClaimSet, AuthError> {
        let segment = self.signer.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Token signature rejected");
            AuthError::from(e)
        })?;

        claims::from_segment(segment)
            .and_then(|payload| claims::decode(&payload))
            .map_err(|e| {
                tracing::warn!(error = %e, "Signed token carries malformed claims");
                AuthError::from(e)
            })
    }
}

/// Milliseconds rounded to the nearest whole second.
///
/// `iat` and the lifetime are rounded the same way, so `exp - iat` is exactly
/// the lifetime in seconds and `exp` lands within half a second of
/// `now + lifetime`.
fn nearest_second(millis: i64) -> i64 {
    millis.saturating_add(500).div_euclid(1000)
}
