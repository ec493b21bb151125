//! JWT Token Service
//!
//! Signs caller-supplied identity payloads into short-lived session tokens
//! and verifies them on the way back in.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Issuer embedded in, and required of, every token
pub const ISSUER: &str = "dine-in-server";

/// Session lifetime in seconds
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Claim names the service owns; callers cannot set them.
const RESERVED_CLAIMS: [&str; 3] = ["iat", "exp", "iss"];

/// JWT Claims: the caller's identity payload plus token metadata
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// User email, when the identity payload carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Everything else from the identity payload
    #[serde(flatten)]
    pub identity: Map<String, Value>,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
    /// Token issuer
    pub iss: String,
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    /// Create a new JWT service with the provided secret
    pub fn new(secret: &str) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);

        Self {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Sign an identity payload into a token valid for one hour
    pub fn issue(&self, mut identity: Map<String, Value>) -> Result<String> {
        for reserved in RESERVED_CLAIMS {
            identity.remove(reserved);
        }

        let email = match identity.remove("email") {
            Some(Value::String(email)) => Some(email),
            Some(other) => {
                tracing::warn!("Ignoring non-string email in identity payload: {}", other);
                None
            }
            None => None,
        };

        let now = Utc::now();
        let claims = Claims {
            email,
            identity,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
            iss: ISSUER.to_string(),
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key).context("Failed to encode JWT token")
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        decode::<Claims>(token, &self.decoding_key, &self.validation).context("Failed to validate JWT token")
    }

    pub fn decode_claims(&self, token: &str) -> Result<Claims> {
        let token_data = self.validate_token(token)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_jwt_roundtrip() {
        let jwt_service = JwtService::new("test_secret");

        let token = jwt_service
            .issue(identity(json!({ "email": "test@example.com", "name": "Tester" })))
            .unwrap();
        let claims = jwt_service.decode_claims(&token).unwrap();

        assert_eq!(claims.email.as_deref(), Some("test@example.com"));
        assert_eq!(claims.identity.get("name"), Some(&json!("Tester")));
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn caller_cannot_override_expiry() {
        let jwt_service = JwtService::new("test_secret");
        let token = jwt_service
            .issue(identity(json!({ "email": "a@b.io", "exp": 9_999_999_999_i64, "iss": "someone" })))
            .unwrap();
        let claims = jwt_service.decode_claims(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
        assert_eq!(claims.iss, ISSUER);
        assert!(!claims.identity.contains_key("exp"));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let issuer = JwtService::new("one");
        let verifier = JwtService::new("two");
        let token = issuer.issue(identity(json!({ "email": "a@b.io" }))).unwrap();

        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let jwt_service = JwtService::new("test_secret");
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            email: Some("a@b.io".into()),
            identity: Map::new(),
            iat: past.timestamp(),
            exp: (past + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
            iss: ISSUER.into(),
        };
        let token = jwt_service.sign(&claims).unwrap();

        assert!(jwt_service.validate_token(&token).is_err());
    }

    #[test]
    fn rejects_garbage() {
        let jwt_service = JwtService::new("test_secret");
        assert!(jwt_service.validate_token("not.a.jwt").is_err());
    }

    #[test]
    fn payload_without_email_still_issues() {
        let jwt_service = JwtService::new("test_secret");
        let token = jwt_service.issue(Map::new()).unwrap();
        let claims = jwt_service.decode_claims(&token).unwrap();
        assert_eq!(claims.email, None);
    }
}
