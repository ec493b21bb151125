//! Auth routes: session token issuance and logout

use axum::{extract::State, response::Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Map, Value};

use crate::auth::{jwt::TOKEN_TTL_SECS, TOKEN_COOKIE};
use crate::database::models::SuccessResponse;
use crate::error::AppError;
use crate::server::AppState;

/// Cookie attributes shared by issuance and removal so browsers treat them
/// as the same cookie.
fn token_cookie(value: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None) // cross origin
        .path("/")
        .build()
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie = token_cookie(token);
    cookie.set_max_age(time::Duration::seconds(TOKEN_TTL_SECS));
    cookie
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = token_cookie(String::new());
    cookie.make_removal();
    cookie
}

/// `POST /jwt`: signs whatever identity the client sends and stores it in
/// the session cookie.
pub async fn issue_token(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(identity): Json<Map<String, Value>>,
) -> Result<(CookieJar, Json<SuccessResponse>), AppError> {
    let email = identity.get("email").and_then(Value::as_str).map(str::to_string);
    let token = app_state.jwt_service.issue(identity).map_err(AppError::Token)?;
    tracing::info!("🔑 Issued session token for {:?}", email);

    Ok((jar.add(session_cookie(token)), Json(SuccessResponse::ok())))
}

/// `GET /logout`: always emits an expired cookie; tokens themselves stay
/// valid until they expire.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<SuccessResponse>) {
    (jar.add(removal_cookie()), Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_locked_down() {
        let rendered = session_cookie("abc".into()).to_string();
        assert!(rendered.starts_with("token=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=None"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=3600"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cookie.path(), Some("/"));
    }
}
