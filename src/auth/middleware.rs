//! Authentication Middleware
//!
//! Axum middleware that admits a request only when it carries a valid
//! session token cookie.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::auth::{jwt::JwtService, models::AuthUser, TOKEN_COOKIE};
use crate::error::AppError;

/// Authentication middleware that validates the token cookie and injects user info
pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Middleware function for validating session tokens
    pub async fn validate_token(
        State(jwt_service): State<Arc<JwtService>>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, AppError> {
        let jar = CookieJar::from_headers(req.headers());

        let Some(token) = jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()) else {
            tracing::warn!("[AuthMiddleware] {} {}: missing {} cookie", req.method(), req.uri(), TOKEN_COOKIE);
            return Err(AppError::Unauthorized);
        };

        let claims = match jwt_service.decode_claims(&token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("[AuthMiddleware] {} {}: token rejected: {:#}", req.method(), req.uri(), e);
                return Err(AppError::Unauthorized);
            }
        };

        let auth_user = AuthUser::from(claims);
        tracing::debug!("[AuthMiddleware] Authenticated email={:?}", auth_user.email);

        // Insert the user into request extensions for downstream handlers
        req.extensions_mut().insert(auth_user);

        Ok(next.run(req).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::Extension,
        http::{header, Request as HttpRequest, StatusCode},
        middleware,
        response::Json,
        routing::get,
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn whoami(Extension(user): Extension<AuthUser>) -> Json<Value> {
        Json(json!({ "email": user.email }))
    }

    fn test_app(jwt_service: Arc<JwtService>) -> Router {
        Router::new()
            .route("/me", get(whoami))
            .layer(middleware::from_fn_with_state(jwt_service, AuthMiddleware::validate_token))
    }

    fn request(cookie: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/me");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).expect("request build")
    }

    #[tokio::test]
    async fn passes_identity_for_valid_cookie() {
        let jwt_service = Arc::new(JwtService::new("secret"));
        let token = jwt_service
            .issue(json!({ "email": "chef@example.com" }).as_object().cloned().unwrap())
            .unwrap();

        let response = test_app(jwt_service)
            .oneshot(request(Some(&format!("theme=dark; {TOKEN_COOKIE}={token}"))))
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body extraction");
        let body: Value = serde_json::from_slice(&body).expect("json deserialization");
        assert_eq!(body["email"], "chef@example.com");
    }

    #[tokio::test]
    async fn rejects_missing_cookie() {
        let response = test_app(Arc::new(JwtService::new("secret")))
            .oneshot(request(None))
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body extraction");
        let body: Value = serde_json::from_slice(&body).expect("json deserialization");
        assert_eq!(body["message"], "unauthorized access");
    }

    #[tokio::test]
    async fn rejects_forged_cookie() {
        let forger = JwtService::new("not-the-secret");
        let token = forger.issue(json!({ "email": "x@y.z" }).as_object().cloned().unwrap()).unwrap();

        let response = test_app(Arc::new(JwtService::new("secret")))
            .oneshot(request(Some(&format!("{TOKEN_COOKIE}={token}"))))
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
