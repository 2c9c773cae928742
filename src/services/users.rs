/*
 * Responsibility
 * - sign-up / login / refresh / get / list の業務フロー
 * - store 呼び出しと hashing は全て caller の Deadline で打ち切る
 * - 認可 (authorizer) は resource に触る前に呼ぶ
 */
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::v1::extractors::Principal;
use crate::error::AppError;
use crate::repos::user_repo::{UserDocument, UserFilter, UserStore};
use crate::services::auth::authorizer::{authorize_owner_or_role, authorize_role};
use crate::services::auth::{CredentialHasher, Role, TokenIdentity, TokenPair, TokenService};
use crate::services::deadline::Deadline;

/// Validated sign-up input.
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: u64,
    pub limit: u64,
}

#[derive(Debug)]
pub struct UserPage {
    pub total_count: u64,
    pub items: Vec<UserDocument>,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    tokens: TokenService,
    hasher: CredentialHasher,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("backend", &self.store.backend_name())
            .field("tokens", &self.tokens)
            .finish()
    }
}

fn identity_of(user: &UserDocument) -> TokenIdentity {
    TokenIdentity {
        user_id: user.user_id.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        role: user.user_type,
    }
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenService, hasher: CredentialHasher) -> Self {
        Self {
            store,
            tokens,
            hasher,
        }
    }

    /// Create a user with a freshly issued pair.
    ///
    /// Duplicate email / phone is rejected before any hashing, issuance or write.
    pub async fn sign_up(
        &self,
        new_user: NewUser,
        deadline: Deadline,
    ) -> Result<UserDocument, AppError> {
        let email_taken = deadline
            .run(self.store.count_matching(&UserFilter::Email(new_user.email.clone())))
            .await??;
        if email_taken > 0 {
            debug!("sign-up rejected: email already registered");
            return Err(AppError::DuplicateIdentity);
        }

        let phone_taken = deadline
            .run(self.store.count_matching(&UserFilter::Phone(new_user.phone.clone())))
            .await??;
        if phone_taken > 0 {
            debug!("sign-up rejected: phone already registered");
            return Err(AppError::DuplicateIdentity);
        }

        let password_hash = self.hash_password(new_user.password, deadline).await?;

        let now = Utc::now();
        let mut user = UserDocument {
            user_id: Uuid::new_v4().to_string(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            phone: new_user.phone,
            password_hash,
            user_type: new_user.role,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        let pair = self.tokens.issue_pair(&identity_of(&user), now)?;
        user.token = Some(pair.access_token);
        user.refresh_token = Some(pair.refresh_token);

        // A concurrent sign-up with the same email/phone surfaces here as Conflict.
        deadline.run(self.store.insert_one(user.clone())).await??;

        info!(user_id = %user.user_id, role = %user.user_type, "user signed up");
        Ok(user)
    }

    /// Verify the credential and rotate the stored pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        deadline: Deadline,
    ) -> Result<UserDocument, AppError> {
        let found = deadline
            .run(self.store.find_one(&UserFilter::Email(email.to_string())))
            .await??;

        let Some(user) = found else {
            self.verify_password(None, password.to_string(), deadline)
                .await?;
            debug!("login rejected");
            return Err(AppError::CredentialMismatch);
        };

        let valid = self
            .verify_password(
                Some(user.password_hash.clone()),
                password.to_string(),
                deadline,
            )
            .await?;
        if !valid {
            debug!("login rejected");
            return Err(AppError::CredentialMismatch);
        }

        self.tokens
            .issue_and_persist(&identity_of(&user), deadline)
            .await?;

        let user_id = user.user_id;
        let refreshed = deadline
            .run(self.store.find_one(&UserFilter::UserId(user_id.clone())))
            .await??
            .ok_or_else(|| {
                error!(user_id = %user_id, "user vanished after token update");
                AppError::Internal
            })?;

        info!(user_id = %refreshed.user_id, "user logged in");
        Ok(refreshed)
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Role and profile come from the store, not from the refresh token.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        deadline: Deadline,
    ) -> Result<TokenPair, AppError> {
        let claims = self
            .tokens
            .codec()
            .decode_refresh(refresh_token, Utc::now())
            .map_err(|e| {
                warn!(error = %e, "refresh token rejected");
                AppError::Unauthorized
            })?;

        let user = deadline
            .run(self.store.find_one(&UserFilter::UserId(claims.uid.clone())))
            .await??
            .ok_or_else(|| {
                warn!(user_id = %claims.uid, "refresh token for unknown user");
                AppError::Unauthorized
            })?;

        let pair = self
            .tokens
            .issue_and_persist(&identity_of(&user), deadline)
            .await?;

        info!(user_id = %user.user_id, "token pair refreshed");
        Ok(pair)
    }

    /// Self-or-admin read of a single user.
    pub async fn get_user(
        &self,
        principal: &Principal,
        user_id: &str,
        deadline: Deadline,
    ) -> Result<UserDocument, AppError> {
        authorize_owner_or_role(principal, user_id, Role::User)?;

        deadline
            .run(self.store.find_one(&UserFilter::UserId(user_id.to_string())))
            .await??
            .ok_or(AppError::NotFound)
    }

    /// Admin-only paged listing.
    pub async fn list_users(
        &self,
        principal: &Principal,
        page: PageRequest,
        deadline: Deadline,
    ) -> Result<UserPage, AppError> {
        authorize_role(principal, Role::Admin)?;

        let total_count = deadline
            .run(self.store.count_matching(&UserFilter::All))
            .await??;
        let items = deadline
            .run(self.store.find_page(page.skip, page.limit))
            .await??;

        Ok(UserPage { total_count, items })
    }

    // argon2 is CPU bound: keep it off the async workers.
    async fn hash_password(&self, password: String, deadline: Deadline) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let task = tokio::task::spawn_blocking(move || hasher.hash(&password));

        match deadline.run(task).await? {
            Ok(Ok(hash)) => Ok(hash),
            Ok(Err(e)) => {
                error!(error = %e, "credential hashing failed");
                Err(AppError::Hashing)
            }
            Err(e) => {
                error!(error = %e, "credential hashing task failed");
                Err(AppError::Hashing)
            }
        }
    }

    // `None` runs the decoy verification and always yields false.
    async fn verify_password(
        &self,
        stored_hash: Option<String>,
        candidate: String,
        deadline: Deadline,
    ) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        let task = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&hash, &candidate),
            None => {
                hasher.verify_decoy(&candidate);
                false
            }
        });

        deadline.run(task).await?.map_err(|e| {
            error!(error = %e, "credential verification task failed");
            AppError::Internal
        })
    }
}
