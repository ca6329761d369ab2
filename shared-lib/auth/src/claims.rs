//! Token claims and the claims codec.
//!
//! A [`ClaimSet`] always carries `sub`, `iat` and `exp`; everything else is a
//! custom claim restricted to the [`ClaimValue`] shapes. The payload is JSON
//! and travels as an unpadded base64url segment.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use error::{DecodeError, EncodingError};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Subject claim name.
pub const SUBJECT: &str = "sub";
/// Issued-at claim name.
pub const ISSUED_AT: &str = "iat";
/// Expiration claim name.
pub const EXPIRATION: &str = "exp";

/// Claim names that custom claims may not use.
pub const RESERVED_CLAIMS: [&str; 3] = [SUBJECT, ISSUED_AT, EXPIRATION];

/// Custom claims keyed by name.
pub type CustomClaims = BTreeMap<String, ClaimValue>;

/// Returns true for `sub`, `iat` and `exp`.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_CLAIMS.contains(&name)
}

/// Value of a custom claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    String(String),
    Number(Number),
    Bool(bool),
    StringList(Vec<String>),
}

impl ClaimValue {
    /// Convert an arbitrary JSON value, rejecting shapes a token cannot carry.
    pub fn from_json(name: &str, value: Value) -> Result<Self, EncodingError> {
        let unsupported = |value: &Value| EncodingError::UnsupportedValue {
            name: name.to_string(),
            kind: json_kind(value),
        };

        match value {
            Value::String(s) => Ok(Self::String(s)),
            Value::Number(n) => Ok(Self::Number(n)),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(unsupported(&other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::StringList),
            other => Err(unsupported(&other)),
        }
    }

    /// Build a number claim from a float; NaN and infinities are rejected.
    pub fn from_f64(name: &str, value: f64) -> Result<Self, EncodingError> {
        Number::from_f64(value)
            .map(Self::Number)
            .ok_or_else(|| EncodingError::UnsupportedValue {
                name: name.to_string(),
                kind: "non-finite number",
            })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Self::StringList(items) => Some(items),
            _ => None,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for ClaimValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for ClaimValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<Vec<String>> for ClaimValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringList(value)
    }
}

impl From<Vec<&str>> for ClaimValue {
    fn from(value: Vec<&str>) -> Self {
        Self::StringList(value.into_iter().map(str::to_string).collect())
    }
}

/// Decoded token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    custom: CustomClaims,
}

impl ClaimSet {
    /// Create a claim set with no custom claims. Timestamps are Unix seconds.
    pub fn new(subject: impl Into<String>, issued_at: i64, expires_at: i64) -> Self {
        Self {
            sub: subject.into(),
            iat: issued_at,
            exp: expires_at,
            custom: CustomClaims::new(),
        }
    }

    /// Attach custom claims.
    pub fn with_custom(mut self, custom: CustomClaims) -> Self {
        self.custom = custom;
        self
    }

    /// Attach a single custom claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.custom.insert(name.into(), value.into());
        self
    }

    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn issued_at(&self) -> i64 {
        self.iat
    }

    pub fn expires_at(&self) -> i64 {
        self.exp
    }

    /// Expiration as a UTC instant.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Look up a custom claim by name.
    pub fn claim(&self, name: &str) -> Option<&ClaimValue> {
        self.custom.get(name)
    }

    pub fn custom_claims(&self) -> &CustomClaims {
        &self.custom
    }

    /// A token stops being valid at the instant `exp` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.exp.saturating_mul(1000)
    }
}

/// Serialize a claim set into its JSON payload.
pub fn encode(claims: &ClaimSet) -> Result<Vec<u8>, EncodingError> {
    if let Some(name) = claims.custom.keys().find(|name| is_reserved(name)) {
        return Err(EncodingError::ReservedClaim(name.clone()));
    }

    serde_json::to_vec(claims).map_err(|e| EncodingError::Serialization(e.to_string()))
}

/// Parse a JSON payload back into a claim set.
pub fn decode(bytes: &[u8]) -> Result<ClaimSet, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;
    let claims: ClaimSet =
        serde_json::from_str(text).map_err(|e| DecodeError::Structure(e.to_string()))?;

    if claims.expiration().is_none() {
        return Err(DecodeError::Structure(format!(
            "exp ({}) is outside the representable date range",
            claims.exp
        )));
    }
    if claims.exp <= claims.iat {
        return Err(DecodeError::Structure(format!(
            "exp ({}) must be after iat ({})",
            claims.exp, claims.iat
        )));
    }

    Ok(claims)
}

/// Encode raw bytes as a compact token segment.
pub fn to_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a compact token segment.
pub fn from_segment(segment: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE_NO_PAD
        .decode(segment.as_bytes())
        .map_err(|_| DecodeError::Base64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_decode_claims() {
        let claims = ClaimSet::new("alice", 1_700_000_000, 1_700_003_600)
            .with_claim("stringClaim", "test")
            .with_claim("integerClaim", 123)
            .with_claim("booleanClaim", true)
            .with_claim("listClaim", vec!["item1", "item2"]);

        let decoded = decode(&encode(&claims).unwrap()).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.claim("integerClaim").and_then(ClaimValue::as_i64), Some(123));
        assert_eq!(
            decoded.claim("listClaim").and_then(ClaimValue::as_string_list),
            Some(&["item1".to_string(), "item2".to_string()][..])
        );
    }

    #[test]
    fn test_payload_is_flat_json() {
        let claims = ClaimSet::new("alice", 10, 20).with_claim("active", true);
        let value: Value = serde_json::from_slice(&encode(&claims).unwrap()).unwrap();
        assert_eq!(value, json!({"sub": "alice", "iat": 10, "exp": 20, "active": true}));
    }

    #[test]
    fn test_reserved_claim_rejected_on_encode() {
        let claims = ClaimSet::new("alice", 10, 20).with_claim("sub", "mallory");
        assert_eq!(encode(&claims), Err(EncodingError::ReservedClaim("sub".into())));
    }

    #[test]
    fn test_from_json_rejects_unsupported_shapes() {
        assert!(matches!(
            ClaimValue::from_json("meta", json!({"nested": 1})),
            Err(EncodingError::UnsupportedValue { kind: "object", .. })
        ));
        assert!(matches!(
            ClaimValue::from_json("gone", Value::Null),
            Err(EncodingError::UnsupportedValue { kind: "null", .. })
        ));
        assert!(matches!(
            ClaimValue::from_json("mixed", json!(["a", 1])),
            Err(EncodingError::UnsupportedValue { kind: "number", .. })
        ));
        assert_eq!(
            ClaimValue::from_json("tags", json!(["a", "b"])).unwrap(),
            ClaimValue::from(vec!["a", "b"])
        );
    }

    #[test]
    fn test_non_finite_number_rejected() {
        assert!(ClaimValue::from_f64("score", f64::NAN).is_err());
        assert!(ClaimValue::from_f64("score", f64::INFINITY).is_err());
        assert_eq!(ClaimValue::from_f64("score", 2.5).unwrap().as_f64(), Some(2.5));
    }

    #[test]
    fn test_decode_rejects_unsupported_value() {
        let payload = br#"{"sub":"alice","iat":10,"exp":20,"meta":null}"#;
        assert!(matches!(decode(payload), Err(DecodeError::Structure(_))));
    }

    #[test]
    fn test_decode_rejects_missing_subject() {
        let payload = br#"{"iat":10,"exp":20}"#;
        assert!(matches!(decode(payload), Err(DecodeError::Structure(_))));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert_eq!(decode(&[0xff, 0xfe, 0x7b]), Err(DecodeError::Utf8));
    }

    #[test]
    fn test_decode_rejects_expiry_before_issue() {
        let payload = br#"{"sub":"alice","iat":20,"exp":20}"#;
        assert!(matches!(decode(payload), Err(DecodeError::Structure(_))));
    }

    #[test]
    fn test_decode_rejects_unrepresentable_expiry() {
        let payload = br#"{"sub":"alice","iat":10,"exp":31537792150940}"#;
        assert!(matches!(decode(payload), Err(DecodeError::Structure(_))));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let claims = ClaimSet::new("alice", 10, 20);
        let just_before = DateTime::from_timestamp_millis(19_999).unwrap();
        let at_expiry = DateTime::from_timestamp(20, 0).unwrap();
        assert!(!claims.is_expired_at(just_before));
        assert!(claims.is_expired_at(at_expiry));
    }

    #[test]
    fn test_segment_rejects_padding() {
        assert_eq!(from_segment("YWI="), Err(DecodeError::Base64));
        assert_eq!(from_segment(&to_segment(b"ab")).unwrap(), b"ab");
    }
}
