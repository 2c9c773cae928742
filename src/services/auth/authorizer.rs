//! Request-time authorization decisions.
//!
//! The middleware establishes *who* (Principal); handlers call these before touching a
//! resource to establish *may they*. Every denial is the same `Forbidden`.

use tracing::debug;

use crate::api::v1::extractors::Principal;
use crate::error::AppError;
use crate::services::auth::role::Role;

/// Exact role match.
pub fn authorize_role(principal: &Principal, required: Role) -> Result<(), AppError> {
    if principal.role == required {
        return Ok(());
    }

    debug!(
        user_id = %principal.user_id,
        role = %principal.role,
        required = %required,
        "role check denied"
    );
    Err(AppError::Forbidden)
}

/// Owner-or-role check for a per-user resource.
///
/// - ADMIN: always allowed.
/// - `owner_role`: allowed only on its own `target_user_id`.
/// - anything else: denied.
pub fn authorize_owner_or_role(
    principal: &Principal,
    target_user_id: &str,
    owner_role: Role,
) -> Result<(), AppError> {
    if principal.role.is_admin() {
        return Ok(());
    }
    if principal.role == owner_role && principal.user_id == target_user_id {
        return Ok(());
    }

    debug!(
        user_id = %principal.user_id,
        role = %principal.role,
        target_user_id = %target_user_id,
        "owner check denied"
    );
    Err(AppError::Forbidden)
}
