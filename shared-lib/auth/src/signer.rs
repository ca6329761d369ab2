//! HS256 signing and verification of compact tokens.
//!
//! Token layout: `<b64url(header)>.<b64url(claims)>.<b64url(signature)>`,
//! where the signature is HMAC-SHA256 over the first two segments joined by
//! `.`.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use error::{EncodingError, SignatureError};
use hmac::{Hmac, Mac};
use jwt::algorithm::{AlgorithmType, SigningAlgorithm, VerifyingAlgorithm};
use jwt::header::HeaderType;
use jwt::{FromBase64, Header, ToBase64};
use sha2::Sha256;

use crate::claims;

type HmacSha256 = Hmac<Sha256>;

const SEGMENT_SEPARATOR: char = '.';

/// Symmetric key material shared by the signer and the verifier.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Signs claims payloads and verifies compact tokens with one HMAC key.
#[derive(Clone)]
pub struct HmacSigner {
    key: HmacSha256,
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}

impl HmacSigner {
    pub fn new(secret: &SigningSecret) -> Result<Self, SignatureError> {
        let key = HmacSha256::new_from_slice(secret.expose()).map_err(|e| {
            tracing::error!("Failed to create HMAC key: {}", e);
            SignatureError::InvalidKey
        })?;
        Ok(Self { key })
    }

    fn header() -> Header {
        Header {
            algorithm: AlgorithmType::Hs256,
            type_: Some(HeaderType::JsonWebToken),
            ..Default::default()
        }
    }

    /// Sign an encoded claims payload and compose the compact token.
    pub fn sign(&self, payload: &[u8]) -> Result<String, EncodingError> {
        let header = Self::header();
        let header = header
            .to_base64()
            .map_err(|e| EncodingError::Serialization(e.to_string()))?;
        let claims = claims::to_segment(payload);

        let signature = SigningAlgorithm::sign(&self.key, &header, &claims).map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            EncodingError::Signing(e.to_string())
        })?;

        Ok(format!("{header}{SEGMENT_SEPARATOR}{claims}{SEGMENT_SEPARATOR}{signature}"))
    }

    /// Verify a compact token and return its claims segment.
    ///
    /// The claims segment is only handed back once the signature over it has
    /// been checked; the MAC comparison is constant-time.
    pub fn verify<'t>(&self, token: &'t str) -> Result<&'t str, SignatureError> {
        let segments: Vec<&str> = token.split(SEGMENT_SEPARATOR).collect();
        let &[header, claims, signature] = segments.as_slice() else {
            return Err(SignatureError::SegmentCount(segments.len()));
        };

        let parsed = Header::from_base64(header).map_err(|_| SignatureError::UnsupportedHeader)?;
        if parsed.algorithm != AlgorithmType::Hs256 {
            tracing::warn!(algorithm = ?parsed.algorithm, "Rejected token with foreign algorithm");
            return Err(SignatureError::UnsupportedHeader);
        }

        // Strict decoding: any altered character changes the bytes or fails here.
        let signature = URL_SAFE_NO_PAD
            .decode(signature.as_bytes())
            .map_err(|_| SignatureError::Mismatch)?;

        let verified = VerifyingAlgorithm::verify_bytes(&self.key, header, claims, &signature)
            .map_err(|_| SignatureError::Mismatch)?;
        if !verified {
            return Err(SignatureError::Mismatch);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    fn signer(secret: &str) -> HmacSigner {
        HmacSigner::new(&SigningSecret::new(secret)).unwrap()
    }

    fn replace_char(token: &str, index: usize) -> String {
        let mut chars: Vec<char> = token.chars().collect();
        let current = chars[index];
        chars[index] = ALPHABET.chars().find(|c| *c != current).unwrap();
        chars.into_iter().collect()
    }

    #[test]
    fn test_sign_verify() {
        let signer = signer("test-secret-key");
        let token = signer.sign(br#"{"sub":"alice"}"#).unwrap();

        assert_eq!(token.split('.').count(), 3);
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims::from_segment(claims).unwrap(), br#"{"sub":"alice"}"#);
    }

    #[test]
    fn test_header_names_hs256() {
        let token = signer("test-secret-key").sign(b"{}").unwrap();
        let header = claims::from_segment(token.split('.').next().unwrap()).unwrap();
        let header: serde_json::Value = serde_json::from_slice(&header).unwrap();
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn test_every_signature_character_is_checked() {
        let signer = signer("test-secret-key");
        let token = signer.sign(br#"{"sub":"alice"}"#).unwrap();
        let signature_start = token.rfind('.').unwrap() + 1;

        for index in signature_start..token.len() {
            let tampered = replace_char(&token, index);
            assert_eq!(
                signer.verify(&tampered),
                Err(SignatureError::Mismatch),
                "tampering at {index} went unnoticed"
            );
        }
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let signer = signer("test-secret-key");
        let token = signer.sign(br#"{"sub":"alice"}"#).unwrap();
        let claims_start = token.find('.').unwrap() + 1;

        let tampered = replace_char(&token, claims_start);
        assert_eq!(signer.verify(&tampered), Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_secret_mismatch() {
        let token = signer("first-secret").sign(b"{}").unwrap();
        assert_eq!(signer("second-secret").verify(&token), Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_segment_count() {
        let signer = signer("test-secret-key");
        assert_eq!(signer.verify("only.two"), Err(SignatureError::SegmentCount(2)));
        assert_eq!(signer.verify(""), Err(SignatureError::SegmentCount(1)));
        assert_eq!(signer.verify("a.b.c.d"), Err(SignatureError::SegmentCount(4)));
    }

    #[test]
    fn test_foreign_algorithm_rejected() {
        let signer = signer("test-secret-key");
        let token = signer.sign(b"{}").unwrap();
        let rest = token.split_once('.').unwrap().1;
        let none_header = claims::to_segment(br#"{"alg":"none"}"#);

        assert_eq!(
            signer.verify(&format!("{none_header}.{rest}")),
            Err(SignatureError::UnsupportedHeader)
        );
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = SigningSecret::new("super-secret-value");
        assert!(!format!("{secret:?}").contains("super-secret-value"));
    }
}
