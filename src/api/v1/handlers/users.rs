/*
 * Responsibility
 * - /users 系 handler (signup / login / refresh / list / get)
 * - Json/Path/Query を extractor で受け、DTO validation → UserService 呼び出し
 * - 認可は service 側で resource に触る前に行う
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    api::v1::{
        dto::users::{
            ListUsersQuery, LoginRequest, RefreshRequest, SignUpRequest, TokenResponse,
            UserResponse, UsersPageResponse,
        },
        extractors::AuthPrincipal,
    },
    error::AppError,
    state::AppState,
};

pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let new_user = req.into_new_user()?;
    let user = state.users.sign_up(new_user, state.deadline()).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::with_tokens(user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserResponse>, AppError> {
    req.validate()?;

    let user = state
        .users
        .login(&req.email, &req.password, state.deadline())
        .await?;

    Ok(Json(UserResponse::with_tokens(user)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let pair = state
        .users
        .refresh(&req.refresh_token, state.deadline())
        .await?;

    Ok(Json(pair.into()))
}

pub async fn list_users(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UsersPageResponse>, AppError> {
    let page = query.resolve()?;
    let users = state
        .users
        .list_users(&principal, page, state.deadline())
        .await?;

    Ok(Json(users.into()))
}

pub async fn get_user(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .get_user(&principal, &user_id, state.deadline())
        .await?;

    Ok(Json(UserResponse::profile(user)))
}
