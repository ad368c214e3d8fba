//! Checkout service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHECKOUT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   the generic `DATABASE_URL`)
//! - `CIELO_MERCHANT_ID` - Cielo merchant identifier
//! - `CIELO_MERCHANT_KEY` - Cielo merchant key
//!
//! ## Optional
//! - `CHECKOUT_HOST` - Bind address (default: 127.0.0.1)
//! - `CHECKOUT_PORT` - Listen port (default: 3002)
//! - `CIELO_ENVIRONMENT` - `sandbox` or `production` (default: sandbox);
//!   selects the gateway hosts and request timeouts
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - sample rates
//!
//! ## Optional (SMTP - enables order confirmation emails)
//! - `SMTP_HOST` - SMTP server hostname
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME` - SMTP authentication username
//! - `SMTP_PASSWORD` - SMTP authentication password
//! - `SMTP_FROM` - Email sender address

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::cielo::RetryPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
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

/// Checkout service configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Cielo gateway configuration
    pub cielo: CieloConfig,
    /// SMTP configuration (optional - enables confirmation emails)
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl CheckoutConfig {
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

        let database_url = get_database_url("CHECKOUT_DATABASE_URL")?;
        let host = get_env_or_default("CHECKOUT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHECKOUT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("CHECKOUT_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHECKOUT_PORT".to_string(), e.to_string()))?;

        let cielo = CieloConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            cielo,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns a reference to the email configuration (if configured).
    #[must_use]
    pub const fn email(&self) -> Option<&EmailConfig> {
        self.email.as_ref()
    }
}

/// Which Cielo installation to talk to.
///
/// Selects both the API hosts and the request timeout - the sandbox is
/// noticeably slower than production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CieloEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl CieloEnvironment {
    /// Transactional API base URL.
    #[must_use]
    pub const fn api_base(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://apisandbox.cieloecommerce.cielo.com.br",
            Self::Production => "https://api.cieloecommerce.cielo.com.br",
        }
    }

    /// Query API base URL (read-only transaction lookups).
    #[must_use]
    pub const fn query_base(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://apiquerysandbox.cieloecommerce.cielo.com.br",
            Self::Production => "https://apiquery.cieloecommerce.cielo.com.br",
        }
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        match self {
            Self::Sandbox => Duration::from_secs(60),
            Self::Production => Duration::from_secs(30),
        }
    }
}

impl std::str::FromStr for CieloEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            _ => Err(format!("invalid Cielo environment: {s}")),
        }
    }
}

/// Cielo gateway configuration.
///
/// Implements `Debug` manually to redact the merchant key.
#[derive(Clone)]
pub struct CieloConfig {
    /// Merchant identifier (also used for boleto identification)
    pub merchant_id: String,
    /// Merchant key
    pub merchant_key: SecretString,
    /// Sandbox or production hosts/timeouts
    pub environment: CieloEnvironment,
    /// Backoff schedule for gateway calls
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for CieloConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CieloConfig")
            .field("merchant_id", &self.merchant_id)
            .field("merchant_key", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("retry", &self.retry)
            .finish()
    }
}

impl CieloConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let environment = get_env_or_default("CIELO_ENVIRONMENT", "sandbox")
            .parse::<CieloEnvironment>()
            .map_err(|e| ConfigError::InvalidEnvVar("CIELO_ENVIRONMENT".to_string(), e))?;

        Ok(Self {
            merchant_id: get_required_env("CIELO_MERCHANT_ID")?,
            merchant_key: get_validated_secret("CIELO_MERCHANT_KEY")?,
            environment,
            retry: RetryPolicy::default(),
        })
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl EmailConfig {
    /// Load SMTP configuration from environment.
    ///
    /// Returns `None` if `SMTP_HOST` is not set (confirmation emails
    /// disabled); the remaining variables are required once it is.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
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
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
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
            #[allow(clippy::cast_precision_loss)]
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

    // Real merchant keys are random; low entropy means a made-up value.
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the real merchant key."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_degenerate_inputs() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_random_looking_key() {
        let entropy = shannon_entropy("f47ac10b58cc4372a5670e02b2c3d479");
        assert!(entropy > 3.0);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-merchant-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("f47ac10b58cc4372a5670e02b2c3d479", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_cielo_environment_parsing() {
        assert_eq!(
            "sandbox".parse::<CieloEnvironment>().unwrap(),
            CieloEnvironment::Sandbox
        );
        assert_eq!(
            "Production".parse::<CieloEnvironment>().unwrap(),
            CieloEnvironment::Production
        );
        assert!("staging".parse::<CieloEnvironment>().is_err());
    }

    #[test]
    fn test_cielo_environment_selects_hosts_and_timeouts() {
        assert!(CieloEnvironment::Sandbox.api_base().contains("apisandbox"));
        assert!(
            CieloEnvironment::Sandbox
                .query_base()
                .contains("apiquerysandbox")
        );
        assert_eq!(
            CieloEnvironment::Production.api_base(),
            "https://api.cieloecommerce.cielo.com.br"
        );
        assert_eq!(
            CieloEnvironment::Production.query_base(),
            "https://apiquery.cieloecommerce.cielo.com.br"
        );
        assert!(
            CieloEnvironment::Sandbox.request_timeout()
                > CieloEnvironment::Production.request_timeout()
        );
    }

    #[test]
    fn test_cielo_config_debug_redacts_merchant_key() {
        let config = CieloConfig {
            merchant_id: "merchant-123".to_string(),
            merchant_key: SecretString::from("super-secret-merchant-key"),
            environment: CieloEnvironment::Sandbox,
            retry: RetryPolicy::default(),
        };

        let output = format!("{config:?}");
        assert!(output.contains("merchant-123"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super-secret-merchant-key"));
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "pedidos@patinhas.pet".to_string(),
            smtp_password: SecretString::from("super-secret-smtp-password"),
            from_address: "pedidos@patinhas.pet".to_string(),
        };

        let output = format!("{config:?}");
        assert!(output.contains("smtp.example.com"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super-secret-smtp-password"));
    }

    #[test]
    fn test_socket_addr() {
        let config = CheckoutConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            cielo: CieloConfig {
                merchant_id: "merchant-123".to_string(),
                merchant_key: SecretString::from("f47ac10b58cc4372a5670e02b2c3d479"),
                environment: CieloEnvironment::Sandbox,
                retry: RetryPolicy::default(),
            },
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3002);
    }
}
