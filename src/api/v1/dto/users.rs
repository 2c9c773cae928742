/*
 * Responsibility
 * - Users / auth の request/response DTO
 * - 形式チェック (validator derive or validate()) まではここ。重複チェックなどは service 側
 * - password / password_hash は response に出さない
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::repos::UserDocument;
use crate::services::auth::{Role, TokenPair};
use crate::services::users::{NewUser, PageRequest, UserPage};

const DEFAULT_RECORDS_PER_PAGE: u64 = 10;

fn validate_role(value: &str) -> Result<(), ValidationError> {
    value.parse::<Role>().map(|_| ()).map_err(|_| {
        ValidationError::new("user_type").with_message("user_type must be ADMIN or USER".into())
    })
}

// No Debug: carries the plaintext password.
#[derive(Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 2, max = 100, message = "first_name must be 2-100 chars"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 100, message = "last_name must be 2-100 chars"))]
    pub last_name: String,
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 chars"))]
    pub password: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[validate(custom(function = "validate_role"))]
    pub user_type: String,
}

impl SignUpRequest {
    /// Validate and convert into service input.
    pub fn into_new_user(self) -> Result<NewUser, AppError> {
        self.validate()?;

        let role = self
            .user_type
            .parse::<Role>()
            .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

        Ok(NewUser {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            password: self.password,
            role,
        })
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.email.trim().is_empty() {
            return Err(AppError::InvalidRequest("email is required".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::InvalidRequest("password is required".into()));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `GET /users` query. Values are kept as raw strings so bad input falls back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    #[serde(rename = "recordPerPage")]
    pub record_per_page: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "startIndex")]
    pub start_index: Option<String>,
}

impl ListUsersQuery {
    pub fn resolve(&self) -> Result<PageRequest, AppError> {
        let limit = match self.record_per_page.as_deref().map(str::parse::<i64>) {
            Some(Ok(n)) if n >= 1 => n as u64,
            _ => DEFAULT_RECORDS_PER_PAGE,
        };

        let page = match self.page.as_deref().map(str::parse::<i64>) {
            Some(Ok(n)) if n >= 1 => n as u64,
            _ => 1,
        };

        let skip = match self.start_index.as_deref() {
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 0 => n as u64,
                _ => {
                    return Err(AppError::InvalidRequest(
                        "startIndex must be a non-negative integer".into(),
                    ));
                }
            },
            None => (page - 1).saturating_mul(limit),
        };

        Ok(PageRequest { skip, limit })
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub user_type: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    /// Includes the stored pair (sign-up / login).
    pub fn with_tokens(doc: UserDocument) -> Self {
        Self {
            user_id: doc.user_id,
            first_name: doc.first_name,
            last_name: doc.last_name,
            email: doc.email,
            phone: doc.phone,
            user_type: doc.user_type,
            token: doc.token,
            refresh_token: doc.refresh_token,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }

    /// Profile only (get / list).
    pub fn profile(doc: UserDocument) -> Self {
        Self {
            token: None,
            refresh_token: None,
            ..Self::with_tokens(doc)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Usually "Bearer"
    pub token_type: &'static str,
    /// Seconds until the access token expires.
    pub expires_in: u64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsersPageResponse {
    pub total_count: u64,
    pub user_items: Vec<UserResponse>,
}

impl From<UserPage> for UsersPageResponse {
    fn from(page: UserPage) -> Self {
        Self {
            total_count: page.total_count,
            user_items: page.items.into_iter().map(UserResponse::profile).collect(),
        }
    }
}
