//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PAYMENTS_SECRET_KEY` - Payment provider secret API key
//! - `IDENTITY_SECRET_KEY` - Identity provider backend API key
//! - `CONTENT_WEBHOOK_SECRET` - Shared secret expected on revalidation webhooks
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL used for checkout redirects
//! - `STOREFRONT_APP_URL` - Fallback for `STOREFRONT_BASE_URL` (default: <http://localhost:3000>)
//! - `CONTENT_PROJECT_ID` - Content store project (default: n0bva0w8)
//! - `CONTENT_DATASET` - Content store dataset (default: production)
//! - `CONTENT_API_VERSION` - Content API version date (default: 2025-10-29)
//! - `CONTENT_READ_TOKEN` / `CONTENT_API_TOKEN` - Token for authenticated reads
//! - `CONTENT_WRITE_TOKEN` - Token for address writes (falls back to the read token)
//! - `PAYMENTS_API_VERSION` - Payment API version (default: 2023-10-16)
//! - `PAYMENTS_CURRENCY` - ISO currency for line items (default: usd)
//! - `IDENTITY_API_URL` - Identity provider backend API (default: <https://api.clerk.com>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use nextcart_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Base URL used when neither base URL variable is set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

const DEFAULT_CONTENT_PROJECT_ID: &str = "n0bva0w8";
const DEFAULT_CONTENT_DATASET: &str = "production";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without a trailing slash
    pub base_url: String,
    /// Content store configuration
    pub content: ContentConfig,
    /// Payment provider configuration
    pub payments: PaymentsConfig,
    /// Identity provider configuration
    pub identity: IdentityConfig,
    /// Secret the content store sends with revalidation webhooks
    pub webhook_secret: SecretString,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Content store configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ContentConfig {
    /// Project identifier (first label of the API host)
    pub project_id: String,
    /// Dataset name
    pub dataset: String,
    /// API version date (e.g. 2025-10-29)
    pub api_version: String,
    /// Token for authenticated, non-CDN reads
    pub read_token: Option<SecretString>,
    /// Token for document writes
    pub write_token: Option<SecretString>,
}

impl std::fmt::Debug for ContentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentConfig")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("api_version", &self.api_version)
            .field("read_token", &self.read_token.as_ref().map(|_| "[REDACTED]"))
            .field("write_token", &self.write_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Payment provider configuration.
#[derive(Clone)]
pub struct PaymentsConfig {
    /// Secret API key (server-side only)
    pub secret_key: SecretString,
    /// Pinned API version
    pub api_version: String,
    /// Currency for checkout line items
    pub currency: CurrencyCode,
}

impl std::fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("currency", &self.currency)
            .finish()
    }
}

/// Identity provider configuration.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Backend API base URL
    pub api_url: String,
    /// Backend API secret key
    pub secret_key: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_url", &self.api_url)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = resolve_base_url(
            get_optional_env("STOREFRONT_BASE_URL"),
            get_optional_env("STOREFRONT_APP_URL"),
        );

        let content = ContentConfig::from_env();
        let payments = PaymentsConfig::from_env()?;
        let identity = IdentityConfig::from_env()?;
        let webhook_secret = get_required_secret("CONTENT_WEBHOOK_SECRET")?;

        Ok(Self {
            host,
            port,
            base_url,
            content,
            payments,
            identity,
            webhook_secret,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ContentConfig {
    fn from_env() -> Self {
        let project_id = get_optional_env("CONTENT_PROJECT_ID");
        let dataset = get_optional_env("CONTENT_DATASET");

        if project_id.is_none() || dataset.is_none() {
            tracing::warn!(
                project_id = DEFAULT_CONTENT_PROJECT_ID,
                dataset = DEFAULT_CONTENT_DATASET,
                "CONTENT_PROJECT_ID or CONTENT_DATASET is missing, using fallback values"
            );
        }

        let read_token = get_optional_env("CONTENT_READ_TOKEN")
            .or_else(|| get_optional_env("CONTENT_API_TOKEN"))
            .map(SecretString::from);
        let write_token = get_optional_env("CONTENT_WRITE_TOKEN")
            .map(SecretString::from)
            .or_else(|| read_token.clone());

        Self {
            project_id: project_id.unwrap_or_else(|| DEFAULT_CONTENT_PROJECT_ID.to_string()),
            dataset: dataset.unwrap_or_else(|| DEFAULT_CONTENT_DATASET.to_string()),
            api_version: get_env_or_default("CONTENT_API_VERSION", "2025-10-29"),
            read_token,
            write_token,
        }
    }
}

impl PaymentsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency_raw = get_env_or_default("PAYMENTS_CURRENCY", "usd");
        let currency = CurrencyCode::parse(&currency_raw).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "PAYMENTS_CURRENCY".to_string(),
                format!("unsupported currency '{currency_raw}'"),
            )
        })?;

        Ok(Self {
            secret_key: get_validated_secret("PAYMENTS_SECRET_KEY")?,
            api_version: get_env_or_default("PAYMENTS_API_VERSION", "2023-10-16"),
            currency,
        })
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_env_or_default("IDENTITY_API_URL", "https://api.clerk.com")
                .trim_end_matches('/')
                .to_string(),
            secret_key: get_validated_secret("IDENTITY_SECRET_KEY")?,
        })
    }
}

/// Pick the public base URL for redirects.
///
/// The first non-empty candidate wins, with one trailing slash removed;
/// otherwise [`DEFAULT_BASE_URL`].
#[must_use]
pub fn resolve_base_url(primary: Option<String>, fallback: Option<String>) -> String {
    [primary, fallback]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.is_empty())
        .map_or_else(
            || DEFAULT_BASE_URL.to_string(),
            |url| url.strip_suffix('/').unwrap_or(&url).to_string(),
        )
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    non_empty_secret(key, get_required_env(key)?)
}

/// A set-but-blank secret counts as missing.
fn non_empty_secret(key: &str, value: String) -> Result<SecretString, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingEnvVar(key.to_string()));
    }
    Ok(SecretString::from(value))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a sample rate in `[0, 1]`.
fn get_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };

    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0 and 1 (got {rate})"),
        ))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // API keys are long random strings
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load, trim and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::MissingEnvVar(key.to_string()));
    }
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_base_url_prefers_primary() {
        let url = resolve_base_url(
            Some("https://shop.example.org/".to_string()),
            Some("https://app.example.org".to_string()),
        );
        assert_eq!(url, "https://shop.example.org");
    }

    #[test]
    fn test_resolve_base_url_skips_empty_primary() {
        let url = resolve_base_url(
            Some(String::new()),
            Some("https://app.example.org/".to_string()),
        );
        assert_eq!(url, "https://app.example.org");
    }

    #[test]
    fn test_resolve_base_url_default() {
        assert_eq!(resolve_base_url(None, None), DEFAULT_BASE_URL);
        assert_eq!(
            resolve_base_url(Some(String::new()), Some(String::new())),
            DEFAULT_BASE_URL
        );
    }

    #[test]
    fn test_resolve_base_url_strips_only_one_slash() {
        assert_eq!(
            resolve_base_url(Some("http://host//".to_string()), None),
            "http://host/"
        );
    }

    #[test]
    fn test_blank_secret_is_missing() {
        for value in ["", "   "] {
            let result = non_empty_secret("CONTENT_WEBHOOK_SECRET", value.to_string());
            assert!(matches!(
                result,
                Err(ConfigError::MissingEnvVar(key)) if key == "CONTENT_WEBHOOK_SECRET"
            ));
        }
        assert!(non_empty_secret("CONTENT_WEBHOOK_SECRET", "whsec-1".to_string()).is_ok());
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_api_key() {
        let result = validate_secret_strength("sk_test_51HxQ2bK9vLmT7rPq3ZsWn8Yc", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: DEFAULT_BASE_URL.to_string(),
            content: ContentConfig {
                project_id: "proj".to_string(),
                dataset: "production".to_string(),
                api_version: "2025-10-29".to_string(),
                read_token: None,
                write_token: None,
            },
            payments: PaymentsConfig {
                secret_key: SecretString::from("sk_test"),
                api_version: "2023-10-16".to_string(),
                currency: CurrencyCode::USD,
            },
            identity: IdentityConfig {
                api_url: "https://identity.test".to_string(),
                secret_key: SecretString::from("idk"),
            },
            webhook_secret: SecretString::from("hook"),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let payments = PaymentsConfig {
            secret_key: SecretString::from("sk_live_super_private"),
            api_version: "2023-10-16".to_string(),
            currency: CurrencyCode::USD,
        };
        let content = ContentConfig {
            project_id: "proj".to_string(),
            dataset: "production".to_string(),
            api_version: "2025-10-29".to_string(),
            read_token: Some(SecretString::from("read_token_value")),
            write_token: None,
        };

        let debug_output = format!("{payments:?} {content:?}");

        assert!(debug_output.contains("2023-10-16"));
        assert!(debug_output.contains("proj"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_live_super_private"));
        assert!(!debug_output.contains("read_token_value"));
    }
}
