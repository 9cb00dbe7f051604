use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub apple: AppleConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

/// App Store Server API credentials (ES256 key from App Store Connect).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppleConfig {
    pub issuer_id: String,
    pub key_id: String,
    pub private_key: String,
    pub bundle_id: String,
    /// "production" or "sandbox"
    #[serde(default)]
    pub environment: Option<String>,
}

/// Google Play Developer API service account.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GoogleConfig {
    pub package_name: String,
    pub service_account_email: String,
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// "remote" calls the store APIs; "accept" trusts client payloads and
    /// must never be enabled in production.
    #[serde(default = "default_verification_mode")]
    pub mode: String,
    #[serde(default = "default_verification_timeout")]
    pub timeout_secs: u64,
}

fn default_verification_mode() -> String {
    "remote".to_string()
}

fn default_verification_timeout() -> u64 {
    10
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            mode: "remote".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => toml::from_str(&config_str)
                .with_context(|| format!("Failed to parse config file {config_path}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No config file: build from environment variables alone
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL").context(
                    "Missing DATABASE_URL environment variable and no config.toml found",
                )?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    apple: AppleConfig {
                        issuer_id: get_env("APPLE_ISSUER_ID").unwrap_or_default(),
                        key_id: get_env("APPLE_KEY_ID").unwrap_or_default(),
                        private_key: get_env("APPLE_PRIVATE_KEY").unwrap_or_default(),
                        bundle_id: get_env("APPLE_BUNDLE_ID").unwrap_or_default(),
                        environment: get_env("APPLE_ENVIRONMENT"),
                    },
                    google: GoogleConfig {
                        package_name: get_env("GOOGLE_PACKAGE_NAME").unwrap_or_default(),
                        service_account_email: get_env("GOOGLE_SERVICE_ACCOUNT_EMAIL")
                            .unwrap_or_default(),
                        private_key: get_env("GOOGLE_PRIVATE_KEY").unwrap_or_default(),
                    },
                    verification: VerificationConfig {
                        mode: get_env("VERIFICATION_MODE").unwrap_or_else(|| "remote".to_string()),
                        timeout_secs: get_env_parse("VERIFICATION_TIMEOUT_SECS", 10u64),
                    },
                }
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file {config_path}"));
            }
        };

        // Environment overrides apply even when the file exists
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.refresh_token_expires_in = n;
        }
        if let Ok(v) = env::var("APPLE_ISSUER_ID") {
            config.apple.issuer_id = v;
        }
        if let Ok(v) = env::var("APPLE_KEY_ID") {
            config.apple.key_id = v;
        }
        if let Ok(v) = env::var("APPLE_PRIVATE_KEY") {
            config.apple.private_key = v;
        }
        if let Ok(v) = env::var("APPLE_BUNDLE_ID") {
            config.apple.bundle_id = v;
        }
        if let Ok(v) = env::var("APPLE_ENVIRONMENT") {
            config.apple.environment = Some(v);
        }
        if let Ok(v) = env::var("GOOGLE_PACKAGE_NAME") {
            config.google.package_name = v;
        }
        if let Ok(v) = env::var("GOOGLE_SERVICE_ACCOUNT_EMAIL") {
            config.google.service_account_email = v;
        }
        if let Ok(v) = env::var("GOOGLE_PRIVATE_KEY") {
            config.google.private_key = v;
        }
        if let Ok(v) = env::var("VERIFICATION_MODE") {
            config.verification.mode = v;
        }
        if let Ok(v) = env::var("VERIFICATION_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            config.verification.timeout_secs = n;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_defaults_to_remote() {
        let cfg = VerificationConfig::default();
        assert_eq!(cfg.mode, "remote");
        assert_eq!(cfg.timeout_secs, 10);
    }

    #[test]
    fn minimal_toml_parses_with_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [database]
            url = "postgres://localhost/jobboard"
            max_connections = 5

            [jwt]
            secret = "secret"
            access_token_expires_in = 7200
            refresh_token_expires_in = 2592000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.verification.mode, "remote");
        assert!(cfg.apple.issuer_id.is_empty());
        assert!(cfg.google.package_name.is_empty());
    }
}
