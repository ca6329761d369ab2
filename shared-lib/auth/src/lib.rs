//! Session tokens for the student services.
//!
//! Tokens are compact HS256-signed strings carrying a subject, issue and
//! expiry timestamps, and typed custom claims. Validation needs nothing but
//! the signing secret: there is no token store.

pub mod claims;
pub mod clock;
pub mod config;
pub mod identity;
pub mod service;
pub mod signer;

pub use claims::{ClaimSet, ClaimValue, CustomClaims};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TokenConfig;
pub use identity::{IdentityDescriptor, IdentityResolver};
pub use service::{TokenService, ROLES_CLAIM};
pub use signer::{HmacSigner, SigningSecret};
