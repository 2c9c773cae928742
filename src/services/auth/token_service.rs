use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::services::auth::jwt::{TokenCodec, TokenIdentity};
use crate::services::auth::token_store::TokenStore;
use crate::services::deadline::Deadline;

/// Service that orchestrates access/refresh issuance and persistence of the latest pair.
///
/// - TokenCodec signs both tokens.
/// - TokenStore overwrites the pair stored against the user.
#[derive(Clone, Debug)]
pub struct TokenService {
    codec: Arc<TokenCodec>,
    store: TokenStore,
}

impl TokenService {
    pub fn new(codec: Arc<TokenCodec>, store: TokenStore) -> Self {
        Self { codec, store }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Sign a new pair without persisting it (sign-up stores it with the user record).
    pub fn issue_pair(
        &self,
        identity: &TokenIdentity,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AppError> {
        let access_token = self.codec.issue_access(identity, now)?;
        let refresh_token = self.codec.issue_refresh(&identity.user_id, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.codec.access_ttl_seconds(),
        })
    }

    /// Sign a new pair and overwrite the stored one.
    ///
    /// If persistence fails the pair is dropped; the caller never sees it.
    pub async fn issue_and_persist(
        &self,
        identity: &TokenIdentity,
        deadline: Deadline,
    ) -> Result<TokenPair, AppError> {
        let pair = self.issue_pair(identity, Utc::now())?;
        self.store.persist(&identity.user_id, &pair, deadline).await?;
        Ok(pair)
    }
}

/// Service-level return type to keep handlers thin.
#[derive(Clone, Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Seconds until the access token expires.
    pub expires_in: u64,
}
