use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RefreshRequest, RegisterRequest},
        error::AuthError,
        extractors::AuthUser,
        jwt::TokenPair,
        repo_types::PublicUser,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/user/info", get(user_info))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let user = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let (tokens, user) = state
        .auth
        .login(&payload.username, &payload.password)
        .await?;
    Ok(Json(LoginResponse { tokens, user }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let pair = state.auth.refresh_token(&payload.refresh_token).await?;
    Ok(Json(pair))
}

#[instrument(skip(state, claims), fields(user_id = claims.user_id))]
pub async fn user_info(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state.auth.get_user_by_id(claims.user_id).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{memory::MemoryUserStore, repo_types::UserStatus};

    fn app() -> (Router, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        let state = AppState::fake(store.clone());
        let router = Router::new()
            .merge(crate::auth::router())
            .with_state(state);
        (router, store)
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.expect("response");
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };
        (status, value)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn register_and_login(app: &Router) -> Value {
        let (status, _) = call(
            app,
            post_json(
                "/auth/register",
                json!({"username": "bob", "password": "secret1", "email": "b@x.com"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            app,
            post_json("/auth/login", json!({"username": "bob", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    #[tokio::test]
    async fn register_login_and_fetch_profile() {
        let (app, _) = app();
        let body = register_and_login(&app).await;
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["user"]["username"], "bob");
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("password_hash").is_none());

        let access = body["access_token"].as_str().expect("access token");
        let (status, me) = call(
            &app,
            Request::builder()
                .uri("/user/info")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "b@x.com");
    }

    #[tokio::test]
    async fn profile_rejects_refresh_token_and_missing_header() {
        let (app, _) = app();
        let body = register_and_login(&app).await;
        let refresh = body["refresh_token"].as_str().expect("refresh token");

        let (status, _) = call(
            &app,
            Request::builder()
                .uri("/user/info")
                .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(
            &app,
            Request::builder().uri("/user/info").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_endpoint_issues_new_pair() {
        let (app, _) = app();
        let body = register_and_login(&app).await;
        let refresh = body["refresh_token"].as_str().expect("refresh token");

        let (status, pair) = call(
            &app,
            post_json("/auth/refresh", json!({ "refresh_token": refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(pair["access_token"].as_str().is_some_and(|t| !t.is_empty()));

        let (status, err) = call(
            &app,
            post_json("/auth/refresh", json!({ "refresh_token": "garbage" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(err["error"], "malformed token");
    }

    #[tokio::test]
    async fn error_statuses() {
        let (app, store) = app();
        register_and_login(&app).await;

        let (status, err) = call(
            &app,
            post_json(
                "/auth/register",
                json!({"username": "bob", "password": "secret1", "email": "z@x.com"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"], "username already registered");

        let (status, _) = call(
            &app,
            post_json(
                "/auth/register",
                json!({"username": "zz", "password": "secret1", "email": "z@x.com"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            post_json("/auth/login", json!({"username": "bob", "password": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        store.set_status(1, UserStatus::Disabled);
        let (status, err) = call(
            &app,
            post_json("/auth/login", json!({"username": "bob", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(err["error"], "account disabled");
    }
}
