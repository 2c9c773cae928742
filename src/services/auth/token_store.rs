use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use crate::error::AppError;
use crate::repos::user_repo::{TokenUpdate, UserStore};
use crate::services::auth::token_service::TokenPair;
use crate::services::deadline::Deadline;

/// Persists the most recently issued pair against a user (upsert by `user_id`).
///
/// Side effect only: no validation of token contents, no retries.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn UserStore>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl TokenStore {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn persist(
        &self,
        user_id: &str,
        pair: &TokenPair,
        deadline: Deadline,
    ) -> Result<(), AppError> {
        let update = TokenUpdate {
            token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            updated_at: Utc::now(),
        };

        deadline
            .run(self.store.upsert_tokens(user_id, &update))
            .await?
            .map_err(|e| {
                error!(user_id = %user_id, error = ?e, "Failed to persist token pair");
                AppError::from(e)
            })?;

        debug!(user_id = %user_id, backend = self.store.backend_name(), "Token pair persisted");
        Ok(())
    }
}
