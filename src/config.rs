/*
 * Responsibility
 * - 環境変数の読み込み (SECRET_KEY, DATABASE_URL, token TTL, timeout など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    // None -> in-memory store (development only)
    pub database_url: Option<String>,
    pub cors_allowed_origins: Vec<String>,

    // HS256 signing secret shared by issuance and verification
    pub secret_key: String,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,

    // Deadline applied to every store / hashing call of a request
    pub request_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the secret or credentials embedded in DATABASE_URL
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("database", &self.database_url.as_ref().map(|_| "postgres"))
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the process env in `from_env`).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(s) => s.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 8080,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(&lookup("APP_ENV").unwrap_or_else(|| "development".into()));

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());
        if app_env.is_production() && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        // An empty secret would still "sign" tokens, so treat it as missing.
        let secret_key = lookup("SECRET_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("SECRET_KEY"))?;

        let access_token_ttl_seconds =
            positive_u64(&lookup, "ACCESS_TOKEN_TTL_SECONDS", 24 * 60 * 60)?;
        let refresh_token_ttl_seconds =
            positive_u64(&lookup, "REFRESH_TOKEN_TTL_SECONDS", 168 * 60 * 60)?;
        let request_timeout_ms = positive_u64(&lookup, "REQUEST_TIMEOUT_MS", 10_000)?;

        Ok(Self {
            addr,
            app_env,
            database_url,
            cors_allowed_origins,
            secret_key,
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }
}

fn positive_u64<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(ConfigError::Invalid(key)),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_secret_fails_startup() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SECRET_KEY"));
    }

    #[test]
    fn blank_secret_is_treated_as_missing() {
        let err = Config::from_lookup(lookup_from(&[("SECRET_KEY", "   ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SECRET_KEY"));
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup_from(&[("SECRET_KEY", "s3cret")])).unwrap();

        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.app_env, AppEnv::Development);
        assert!(config.database_url.is_none());
        assert_eq!(config.access_token_ttl_seconds, 86_400);
        assert_eq!(config.refresh_token_ttl_seconds, 604_800);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn production_requires_database_url() {
        let err = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", "s3cret"),
            ("APP_ENV", "production"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", "s3cret"),
            ("ACCESS_TOKEN_TTL_SECONDS", "0"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid("ACCESS_TOKEN_TTL_SECONDS"));
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = Config::from_lookup(lookup_from(&[
            ("SECRET_KEY", "do-not-print-me"),
            ("DATABASE_URL", "postgres://user:pw@localhost/db"),
        ]))
        .unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("do-not-print-me"));
        assert!(!printed.contains("pw@localhost"));
    }
}
