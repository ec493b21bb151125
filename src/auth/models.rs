//! Authentication Models
//!
//! Identity attached to requests that passed the auth gate.

use serde_json::{Map, Value};

use crate::auth::jwt::Claims;

/// Authenticated caller, decoded from the session token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: Option<String>,
    pub identity: Map<String, Value>,
}

impl AuthUser {
    /// True when the token carries exactly this email
    pub fn owns_email(&self, email: &str) -> bool {
        self.email.as_deref() == Some(email)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            email: claims.email,
            identity: claims.identity,
        }
    }
}
