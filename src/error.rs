/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - RepoError / TokenError / deadline 超過を統一的に変換
 *
 * Client に返す message は固定文言のみ。内部の失敗理由は tracing にだけ出す。
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::auth::jwt::TokenError;
use crate::services::deadline::DeadlineExceeded;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("this email or phone number already exists")]
    DuplicateIdentity,

    // Same message for unknown email and wrong password
    #[error("email or password is incorrect")]
    CredentialMismatch,

    #[error("missing bearer token")]
    MissingToken,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("credential hashing failed")]
    Hashing,

    #[error("persistence failure")]
    Persistence,

    #[error("internal server error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorResponseBody {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateIdentity => StatusCode::CONFLICT,
            AppError::CredentialMismatch | AppError::MissingToken | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Hashing | AppError::Persistence | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "BAD_REQUEST",
            AppError::DuplicateIdentity => "CONFLICT",
            AppError::CredentialMismatch => "INVALID_CREDENTIALS",
            AppError::MissingToken | AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound => "NOT_FOUND",
            AppError::Timeout => "TIMEOUT",
            AppError::Hashing | AppError::Persistence | AppError::Internal => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // 5xx は中身を出さない
        let message = if status.is_server_error() {
            AppError::Internal.to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponseBody {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => AppError::DuplicateIdentity,
            RepoError::Db(e) => {
                tracing::error!(error = ?e, "store operation failed");
                AppError::Persistence
            }
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidSignature | TokenError::Expired | TokenError::Malformed => {
                AppError::Unauthorized
            }
            TokenError::Signing(_) => AppError::Internal,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"))
                })
            })
            .collect();
        messages.sort();

        AppError::InvalidRequest(messages.join("; "))
    }
}

impl From<DeadlineExceeded> for AppError {
    fn from(_: DeadlineExceeded) -> Self {
        tracing::warn!("request deadline exceeded");
        AppError::Timeout
    }
}
