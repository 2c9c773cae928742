/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - users: 業務フロー, codec: access token 検証 (middleware 用)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;
use std::time::Duration;

use crate::repos::UserStore;
use crate::services::auth::{CredentialHasher, TokenCodec, TokenService, TokenStore};
use crate::services::deadline::Deadline;
use crate::services::users::UserService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub codec: Arc<TokenCodec>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn UserStore>,
        codec: Arc<TokenCodec>,
        hasher: CredentialHasher,
        request_timeout: Duration,
    ) -> Self {
        let tokens = TokenService::new(codec.clone(), TokenStore::new(store.clone()));
        let users = Arc::new(UserService::new(store, tokens, hasher));

        Self {
            users,
            codec,
            request_timeout,
        }
    }

    /// Fresh per-request deadline.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.request_timeout)
    }
}
