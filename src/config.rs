//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; SMTP settings are optional so the
//! server can run without email delivery in development.

use std::env;

/// SMTP settings for match notification emails.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP relay host (SMTPS, port 465)
    pub host: String,
    /// SMTP username
    pub username: String,
    /// SMTP password
    pub password: String,
    /// From address for outgoing mail
    pub from_address: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Directory holding users.json and config.json
    pub data_dir: String,
    /// Server port
    pub port: u16,

    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Password the seeded admin account starts with
    pub admin_password: String,
    /// SMTP settings; None disables email delivery
    pub smtp: Option<SmtpConfig>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            data_dir: "data".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            admin_password: "admin123".to_string(),
            smtp: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
            smtp: Self::smtp_from_env(),
        })
    }

    /// SMTP settings are optional; all four variables must be present to
    /// enable delivery.
    fn smtp_from_env() -> Option<SmtpConfig> {
        let host = env::var("SMTP_HOST").ok()?;
        let username = env::var("SMTP_USERNAME").ok()?;
        let password = env::var("SMTP_PASSWORD").ok()?;
        let from_address = env::var("SMTP_FROM").ok()?;

        Some(SmtpConfig {
            host,
            username: username.trim().to_string(),
            password: password.trim().to_string(),
            from_address: from_address.trim().to_string(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::remove_var("SMTP_HOST");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.admin_password, "admin123");
        assert!(config.smtp.is_none());
    }
}
