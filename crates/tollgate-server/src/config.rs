//! Configuration loading and validation
//!
//! Values come from an optional TOML file, overridden by `TOLLGATE__*`
//! environment variables (e.g. `TOLLGATE__AUTH__JWT_SECRET`).

use ::config::{Environment, File, FileFormat};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use tollgate_auth::{DEFAULT_ISSUER, HashingConfig};
use tollgate_core::{LivenessCheck, SessionPolicy, UnavailablePolicy};

/// Environment variable prefix
const ENV_PREFIX: &str = "TOLLGATE";

/// Minimum signing secret length in bytes
const MIN_SECRET_BYTES: usize = 32;

/// Token lifetime bounds in minutes
const MIN_TOKEN_TTL_MINUTES: i64 = 1;
const MAX_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub revocation: RevocationConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Requests running longer than this are cancelled
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl DatabaseConfig {
    /// Path of the SQLite file, if the URL names one
    pub fn file_path(&self) -> Option<PathBuf> {
        let rest = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or_default();

        if path.is_empty() || path.starts_with(":memory:") {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret
    #[serde(default)]
    pub jwt_secret: String,
    /// Accept secrets shorter than 32 bytes
    #[serde(default)]
    pub allow_weak_secret: bool,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Argon2 memory cost in KiB
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Argon2 passes
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Argon2 lanes
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            allow_weak_secret: false,
            token_ttl_minutes: default_token_ttl_minutes(),
            issuer: default_issuer(),
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

impl AuthConfig {
    /// Token TTL clamped to [1, 1440] minutes, logging a warning if adjusted
    pub fn validated_ttl_minutes(&self) -> i64 {
        if self.token_ttl_minutes < MIN_TOKEN_TTL_MINUTES {
            warn!(
                "token_ttl_minutes {} is below minimum {}, using minimum",
                self.token_ttl_minutes, MIN_TOKEN_TTL_MINUTES
            );
            MIN_TOKEN_TTL_MINUTES
        } else if self.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            warn!(
                "token_ttl_minutes {} exceeds maximum {}, using maximum",
                self.token_ttl_minutes, MAX_TOKEN_TTL_MINUTES
            );
            MAX_TOKEN_TTL_MINUTES
        } else {
            self.token_ttl_minutes
        }
    }

    pub fn hashing(&self) -> HashingConfig {
        HashingConfig {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

/// Revocation store backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RevocationBackend {
    #[default]
    Redis,
    /// Process-local; records do not survive restarts or span replicas
    Memory,
}

/// Revocation cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationConfig {
    #[serde(default)]
    pub backend: RevocationBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Per-operation timeout
    #[serde(default = "default_revocation_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub liveness: LivenessCheck,
    #[serde(default)]
    pub on_unavailable: UnavailablePolicy,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            backend: RevocationBackend::default(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            timeout_ms: default_revocation_timeout_ms(),
            liveness: LivenessCheck::default(),
            on_unavailable: UnavailablePolicy::default(),
        }
    }
}

impl RevocationConfig {
    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            liveness: self.liveness,
            on_unavailable: self.on_unavailable,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_database_url() -> String {
    "sqlite:./data/tollgate.db?mode=rwc".to_string()
}

fn default_token_ttl_minutes() -> i64 {
    15
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_key_prefix() -> String {
    "jwt".to_string()
}

fn default_revocation_timeout_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

/// Environment source for `TOLLGATE__<SECTION>__<KEY>`
///
/// Values stay strings; numeric and boolean fields are converted when the
/// sections are deserialized, so string keys such as the signing secret are
/// never reinterpreted as numbers.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__")
}

impl Config {
    /// Load configuration from a file (if present) and the environment
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: &str, env: Environment) -> Result<Self> {
        let config: Config = ::config::Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse configuration from {}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot start with
    pub fn validate(&self) -> Result<()> {
        let secret_len = self.auth.jwt_secret.len();
        if secret_len == 0 {
            bail!("auth.jwt_secret is required (set TOLLGATE__AUTH__JWT_SECRET)");
        }
        if secret_len < MIN_SECRET_BYTES {
            if !self.auth.allow_weak_secret {
                bail!(
                    "auth.jwt_secret must be at least {} bytes (got {})",
                    MIN_SECRET_BYTES,
                    secret_len
                );
            }
            warn!(
                "auth.jwt_secret is only {} bytes; allowed by auth.allow_weak_secret",
                secret_len
            );
        }

        if self.revocation.backend == RevocationBackend::Redis
            && self.revocation.redis_url.is_empty()
        {
            bail!("revocation.redis_url is required for the redis backend");
        }
        if self.revocation.timeout_ms == 0 {
            bail!("revocation.timeout_ms must be greater than zero");
        }
        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be greater than zero");
        }

        Ok(())
    }
}

/// Create the parent directory of a file path if needed
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_with_secret_from_env() {
        let config = Config::load_with_env(
            "/nonexistent/tollgate.toml",
            env(&[("TOLLGATE__AUTH__JWT_SECRET", SECRET)]),
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.auth.token_ttl_minutes, 15);
        assert_eq!(config.auth.issuer, "user-service");
        assert_eq!(config.revocation.backend, RevocationBackend::Redis);
        assert_eq!(config.revocation.key_prefix, "jwt");
        assert_eq!(config.revocation.liveness, LivenessCheck::Off);
        assert_eq!(config.revocation.on_unavailable, UnavailablePolicy::FailOpen);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let err = Config::load_with_env("/nonexistent/tollgate.toml", env(&[])).unwrap_err();
        assert!(err.to_string().contains("jwt_secret is required"));
    }

    #[test]
    fn test_weak_secret() {
        let file = config_file("[auth]\njwt_secret = \"short\"\n");
        let path = file.path().to_str().unwrap();

        let err = Config::load_with_env(path, env(&[])).unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));

        let allowed = Config::load_with_env(
            path,
            env(&[("TOLLGATE__AUTH__ALLOW_WEAK_SECRET", "true")]),
        )
        .unwrap();
        assert_eq!(allowed.auth.jwt_secret, "short");
    }

    #[test]
    fn test_load_from_file() {
        let file = config_file(&format!(
            r#"
[server]
port = 9090

[database]
url = "sqlite::memory:"

[auth]
jwt_secret = "{}"
token_ttl_minutes = 60

[revocation]
backend = "memory"
liveness = "present"
on_unavailable = "fail-closed"
timeout_ms = 100

[logging]
level = "debug"
format = "json"

[metrics]
enabled = false
"#,
            SECRET
        ));

        let config = Config::load_with_env(file.path().to_str().unwrap(), env(&[])).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.auth.token_ttl_minutes, 60);
        assert_eq!(config.revocation.backend, RevocationBackend::Memory);
        assert_eq!(
            config.revocation.session_policy(),
            SessionPolicy {
                liveness: LivenessCheck::Present,
                on_unavailable: UnavailablePolicy::FailClosed,
            }
        );
        assert_eq!(config.revocation.timeout_ms, 100);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.metrics.enabled);
        assert_eq!(config.database.file_path(), None);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = config_file(&format!(
            "[server]\nport = 9090\n[auth]\njwt_secret = \"{}\"\n",
            SECRET
        ));

        let config = Config::load_with_env(
            file.path().to_str().unwrap(),
            env(&[
                ("TOLLGATE__SERVER__PORT", "7070"),
                ("TOLLGATE__REVOCATION__KEY_PREFIX", "session"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 7070);
        assert_eq!(config.revocation.key_prefix, "session");
    }

    #[test]
    fn test_numeric_looking_secret_is_kept_verbatim() {
        for secret in [
            "12345678901234567890123456789012",
            "123e4567890123456789012345678901",
            "00000000000000000000000000000042",
        ] {
            let config = Config::load_with_env(
                "/nonexistent/tollgate.toml",
                env(&[
                    ("TOLLGATE__AUTH__JWT_SECRET", secret),
                    ("TOLLGATE__METRICS__ENABLED", "false"),
                ]),
            )
            .unwrap();

            assert_eq!(config.auth.jwt_secret, secret);
            assert!(!config.metrics.enabled);
        }
    }

    #[test]
    fn test_ttl_is_clamped() {
        let mut auth = AuthConfig::default();

        auth.token_ttl_minutes = 0;
        assert_eq!(auth.validated_ttl_minutes(), 1);

        auth.token_ttl_minutes = 10_000;
        assert_eq!(auth.validated_ttl_minutes(), 1440);

        auth.token_ttl_minutes = 15;
        assert_eq!(auth.validated_ttl_minutes(), 15);
    }

    #[test]
    fn test_invalid_enum_value_is_rejected() {
        let file = config_file(&format!(
            "[auth]\njwt_secret = \"{}\"\n[revocation]\nliveness = \"sometimes\"\n",
            SECRET
        ));

        assert!(Config::load_with_env(file.path().to_str().unwrap(), env(&[])).is_err());
    }

    #[test]
    fn test_database_file_path() {
        let db = DatabaseConfig::default();
        assert_eq!(db.file_path(), Some(PathBuf::from("./data/tollgate.db")));

        let db = DatabaseConfig {
            url: "sqlite:///var/lib/tollgate/users.db".to_string(),
        };
        assert_eq!(db.file_path(), Some(PathBuf::from("/var/lib/tollgate/users.db")));

        let db = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        };
        assert_eq!(db.file_path(), None);
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tollgate.db");

        ensure_parent_dir(&path).unwrap();
        assert!(dir.path().join("nested").is_dir());
    }
}
