//! access token (HS256 JWT) 検証 → Principal を extensions に入れる
//!
//! - `Authorization: Bearer <jwt>` が無い / Bearer でない → 401 (missing bearer token)
//! - 署名・期限・種別の検証失敗 → 401 (理由は log のみ)
//! - 成功 → `Principal { user_id, role }` を extensions に格納して次へ
//!
//! 認可 (role / owner) はここではやらない。handler → service 側の責務。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};
use chrono::Utc;

use crate::api::v1::extractors::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// protected routes に認証を掛ける。
///
/// `route_layer` なので未マッチのパスは 404 のまま (401 にならない)。
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or(AppError::MissingToken)?;

    let claims = match state.codec.decode_access(token, Utc::now()) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(error = ?err, "access token verification failed");
            return Err(AppError::Unauthorized);
        }
    };

    let principal = Principal::new(claims.uid, claims.user_type);

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{http::StatusCode, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::api::v1::extractors::AuthPrincipal;
    use crate::repos::InMemoryUserStore;
    use crate::services::auth::{CredentialHasher, Role, TokenCodec, TokenIdentity};

    const SECRET: &[u8] = b"access-middleware-test-secret-0123";

    fn state() -> AppState {
        AppState::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(TokenCodec::new(SECRET, 3600, 7200)),
            CredentialHasher::with_params(1024, 1, 1).unwrap(),
            Duration::from_secs(5),
        )
    }

    async fn whoami(AuthPrincipal(p): AuthPrincipal) -> String {
        format!("{}:{}", p.user_id, p.role)
    }

    fn app(state: AppState) -> Router {
        let protected = Router::new().route("/me", get(whoami));
        apply(protected, state.clone()).with_state(state)
    }

    fn identity(role: Role) -> TokenIdentity {
        TokenIdentity {
            user_id: "user-1".into(),
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role,
        }
    }

    async fn call(app: Router, auth: Option<String>) -> (StatusCode, serde_json::Value, String) {
        let mut req = Request::builder().uri("/me");
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let res = app
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json, text)
    }

    #[tokio::test]
    async fn missing_header_is_missing_token() {
        let (status, body, _) = call(app(state()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "missing bearer token");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_missing_token() {
        let (status, body, _) = call(app(state()), Some("Basic YWRhOnB3".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "missing bearer token");
    }

    #[tokio::test]
    async fn invalid_token_is_unauthorized() {
        let (status, body, _) = call(app(state()), Some("Bearer not.a.jwt".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "unauthorized");
    }

    #[tokio::test]
    async fn token_from_other_secret_is_unauthorized() {
        let other = TokenCodec::new(b"some-other-secret-0123456789abcdef", 3600, 7200);
        let token = other.issue_access(&identity(Role::User), Utc::now()).unwrap();

        let (status, _, _) = call(app(state()), Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = state();
        let token = state.codec.issue_refresh("user-1", Utc::now()).unwrap();

        let (status, _, _) = call(app(state), Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_puts_principal_in_extensions() {
        let state = state();
        let token = state
            .codec
            .issue_access(&identity(Role::Admin), Utc::now())
            .unwrap();

        let (status, _, text) = call(app(state), Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "user-1:ADMIN");
    }

    #[tokio::test]
    async fn extractor_without_middleware_is_unauthorized() {
        let state = state();
        let bare = Router::new().route("/me", get(whoami)).with_state(state);

        let (status, _, _) = call(bare, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_token_strips_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
