/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - public (health / signup / login / refresh) と protected (users 参照) を merge
 * - Bearer が必要な範囲だけ route_layer で access middleware を掛ける
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    health::health,
    users::{get_user, list_users, login, refresh, sign_up},
};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/users/signup", post(sign_up))
        .route("/users/login", post(login))
        .route("/users/refresh", post(refresh));

    let protected = Router::new()
        .route("/users", get(list_users))
        .route("/users/{user_id}", get(get_user));
    let protected = middleware::auth::access::apply(protected, state);

    public.merge(protected)
}
