/*
 * Responsibility
 * - middleware が検証済み access token から作る「誰が」「どの role で」の型
 * - request extensions 経由で handler に渡る。永続化はしない
 */
use crate::services::auth::Role;

/// Identity derived from a validated access token; lives for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: String, role: Role) -> Self {
        Self { user_id, role }
    }
}
