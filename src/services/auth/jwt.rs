use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::error;
use uuid::Uuid;

use crate::services::auth::role::Role;

// Errors returned by token signing / verification.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed,
        }
    }
}

/// Discriminates access and refresh tokens signed with the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub uid: String,
    pub user_type: Role,
    pub typ: TokenKind,
    /// Unique per issuance; two tokens signed in the same second still differ.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh token claims.
///
/// Subject only. Profile and role are re-read from the store on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub uid: String,
    pub typ: TokenKind,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

trait SignedClaims {
    fn kind(&self) -> TokenKind;
    fn exp(&self) -> i64;
}

impl SignedClaims for AccessClaims {
    fn kind(&self) -> TokenKind {
        self.typ
    }
    fn exp(&self) -> i64 {
        self.exp
    }
}

impl SignedClaims for RefreshClaims {
    fn kind(&self) -> TokenKind {
        self.typ
    }
    fn exp(&self) -> i64 {
        self.exp
    }
}

/// Identity embedded in an access token.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// HS256 token codec.
///
/// - Built once at startup from the shared secret; read-only afterwards.
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_seconds: u64,
    refresh_ttl_seconds: u64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenCodec")
            .field("validation", &self.validation)
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], access_ttl_seconds: u64, refresh_ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    pub fn access_ttl_seconds(&self) -> u64 {
        self.access_ttl_seconds
    }

    pub fn issue_access(
        &self,
        identity: &TokenIdentity,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            uid: identity.user_id.clone(),
            user_type: identity.role,
            typ: TokenKind::Access,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at(now, self.access_ttl_seconds),
        };

        self.sign(&claims)
    }

    pub fn issue_refresh(&self, user_id: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = RefreshClaims {
            uid: user_id.to_string(),
            typ: TokenKind::Refresh,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at(now, self.refresh_ttl_seconds),
        };

        self.sign(&claims)
    }

    pub fn decode_access(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenError> {
        self.decode(token, TokenKind::Access, now)
    }

    pub fn decode_refresh(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshClaims, TokenError> {
        self.decode(token, TokenKind::Refresh, now)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            TokenError::Signing(e)
        })
    }

    /// Signature and structure first (jsonwebtoken), then our own expiry check against `now`.
    ///
    /// jsonwebtoken accepts `exp == now`; we do not.
    fn decode<T>(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<T, TokenError>
    where
        T: DeserializeOwned + SignedClaims,
    {
        let data = jsonwebtoken::decode::<T>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        if claims.kind() != kind {
            return Err(TokenError::Malformed);
        }
        if claims.exp() <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

// Saturates instead of panicking on absurd TTLs.
fn expires_at(now: DateTime<Utc>, ttl_seconds: u64) -> i64 {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-for-jwt-testing-minimum-32-chars";
    const DAY: u64 = 24 * 60 * 60;
    const WEEK: u64 = 168 * 60 * 60;

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, DAY, WEEK)
    }

    fn identity() -> TokenIdentity {
        TokenIdentity {
            user_id: "user-123".into(),
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role: Role::User,
        }
    }

    #[test]
    fn access_token_carries_identity() {
        let now = Utc::now();
        let token = codec().issue_access(&identity(), now).unwrap();

        let claims = codec().decode_access(&token, now).unwrap();
        assert_eq!(claims.uid, "user-123");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.user_type, Role::User);
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, DAY as i64);
    }

    #[test]
    fn refresh_token_uses_the_week_window() {
        let now = Utc::now();
        let token = codec().issue_refresh("user-123", now).unwrap();

        let claims = codec().decode_refresh(&token, now).unwrap();
        assert_eq!(claims.uid, "user-123");
        assert_eq!(claims.exp - claims.iat, WEEK as i64);
    }

    #[test]
    fn same_second_issuance_yields_distinct_tokens() {
        let now = Utc::now();
        let codec = codec();

        let a = codec.issue_access(&identity(), now).unwrap();
        let b = codec.issue_access(&identity(), now).unwrap();
        assert_ne!(a, b);

        let r1 = codec.issue_refresh("user-123", now).unwrap();
        let r2 = codec.issue_refresh("user-123", now).unwrap();
        assert_ne!(r1, r2);
        assert_ne!(
            codec.decode_refresh(&r1, now).unwrap().jti,
            codec.decode_refresh(&r2, now).unwrap().jti
        );
    }

    #[test]
    fn valid_until_just_before_window_end() {
        let issued = Utc::now();
        let token = codec().issue_access(&identity(), issued).unwrap();

        let just_before = issued + ChronoDuration::seconds(DAY as i64 - 1);
        assert!(codec().decode_access(&token, just_before).is_ok());
    }

    #[test]
    fn expired_at_exactly_window_end() {
        let issued = Utc::now();
        let token = codec().issue_access(&identity(), issued).unwrap();

        let at_end = issued + ChronoDuration::seconds(DAY as i64);
        assert!(matches!(
            codec().decode_access(&token, at_end),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn expired_by_wall_clock_is_reported_as_expired() {
        // jsonwebtoken's own exp check fires here
        let issued = Utc::now() - ChronoDuration::days(2);
        let token = codec().issue_access(&identity(), issued).unwrap();

        assert!(matches!(
            codec().decode_access(&token, Utc::now()),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn other_secret_is_invalid_signature_even_when_expired() {
        let other = TokenCodec::new(b"another-secret-key-also-at-least-32-chars!", DAY, WEEK);
        let now = Utc::now();

        let fresh = other.issue_access(&identity(), now).unwrap();
        let stale = other
            .issue_access(&identity(), now - ChronoDuration::days(30))
            .unwrap();

        assert!(matches!(
            codec().decode_access(&fresh, now),
            Err(TokenError::InvalidSignature)
        ));
        assert!(matches!(
            codec().decode_access(&stale, now),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        use base64_payload::swap_payload;

        let now = Utc::now();
        let token = codec().issue_access(&identity(), now).unwrap();

        let mut forged = codec().decode_access(&token, now).unwrap();
        forged.user_type = Role::Admin;
        let tampered = swap_payload(&token, &serde_json::to_vec(&forged).unwrap());

        assert!(matches!(
            codec().decode_access(&tampered, now),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let now = Utc::now();
        assert!(matches!(
            codec().decode_access("not-a-jwt", now),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            codec().decode_access("a.b.c", now),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let now = Utc::now();
        let access = codec().issue_access(&identity(), now).unwrap();
        let refresh = codec().issue_refresh("user-123", now).unwrap();

        assert!(matches!(
            codec().decode_refresh(&access, now),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            codec().decode_access(&refresh, now),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn debug_hides_keys() {
        let printed = format!("{:?}", codec());
        assert!(!printed.contains("test-secret-key"));
    }

    mod base64_payload {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        // Replace the payload segment, keep header and signature.
        pub fn swap_payload(token: &str, payload: &[u8]) -> String {
            let parts: Vec<&str> = token.split('.').collect();
            format!("{}.{}.{}", parts[0], URL_SAFE_NO_PAD.encode(payload), parts[2])
        }
    }
}
