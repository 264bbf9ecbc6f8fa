//! Authentication middleware
//!
//! Two layers share one state: `require_token` for the submitter-facing
//! `/files` listing, `require_admin` for everything that drives the
//! pipeline. Both inject the verified [`Claims`] into request extensions.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::jwt::{AuthManager, Claims};

/// Authentication error, rendered as a plain-text response
#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub message: String,
}

impl AuthError {
    fn no_token() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "no access token supplied".to_string(),
        }
    }

    fn bad_token(detail: String) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: detail,
        }
    }

    fn not_admin() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "not authorized".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Shared auth state for middleware
#[derive(Clone)]
pub struct AuthState {
    pub auth: Arc<AuthManager>,
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

fn authenticate(state: &AuthState, request: &Request) -> Result<Claims, AuthError> {
    let token = bearer_token(request).ok_or_else(AuthError::no_token)?;
    state
        .auth
        .validate_token(token)
        .map_err(|e| AuthError::bad_token(e.to_string()))
}

/// Require a valid token; the caller's claims go into request extensions
pub async fn require_token(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = authenticate(&state, &request)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Require a valid token whose subject is in the admin allow-list
pub async fn require_admin(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = authenticate(&state, &request)?;
    if !state.auth.is_admin(&claims.sub) {
        return Err(AuthError::not_admin());
    }
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::{Json, Router, middleware};
    use http_body_util::BodyExt;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode, get_current_timestamp};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::core::config::ApiConfig;

    const SECRET: &str = "test-secret";

    fn auth_state(admins: &[&str]) -> AuthState {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            admins: admins.iter().map(|s| s.to_string()).collect(),
            jwt_pubkey_path: None,
            jwt_secret: Some(SECRET.to_string()),
        };
        AuthState {
            auth: Arc::new(AuthManager::from_config(&config).unwrap()),
        }
    }

    fn token(sub: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: get_current_timestamp() as i64 + 3600,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn admin_router(state: AuthState) -> Router {
        Router::new()
            .route("/", get(|| async { Json(json!({"ok": true})) }))
            .layer(middleware::from_fn_with_state(state, require_admin))
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn admin_without_token() {
        let router = admin_router(auth_state(&["dummy"]));
        let response = router
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(response).await.contains("no access token supplied"));
    }

    #[tokio::test]
    async fn admin_with_non_admin_subject() {
        let router = admin_router(auth_state(&["foo", "bar"]));
        let request = HttpRequest::get("/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token("dummy")))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(response).await.contains("not authorized"));
    }

    #[tokio::test]
    async fn admin_with_listed_subject() {
        let router = admin_router(auth_state(&["foo", "bar", "dummy"]));
        let request = HttpRequest::get("/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token("dummy")))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("ok"));
    }

    #[tokio::test]
    async fn token_layer_rejects_garbage() {
        let state = auth_state(&[]);
        let router = Router::new()
            .route("/files", get(|| async { "[]" }))
            .layer(middleware::from_fn_with_state(state, require_token));

        let request = HttpRequest::get("/files")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_layer_accepts_any_valid_subject() {
        let state = auth_state(&[]);
        let router = Router::new()
            .route("/files", get(|| async { "[]" }))
            .layer(middleware::from_fn_with_state(state, require_token));

        let request = HttpRequest::get("/files")
            .header(header::AUTHORIZATION, format!("Bearer {}", token("anyone")))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
