use crate::models::AppConfig;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Environment variable that overrides `jwt.secret`
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Parse configuration from YAML text, apply environment overrides and validate.
pub fn parse_config(contents: &str) -> Result<AppConfig, String> {
    let mut config: AppConfig = serde_yaml::from_str(contents)
        .map_err(|e| format!("Failed to parse YAML config: {}", e))?;

    if let Ok(secret) = std::env::var(JWT_SECRET_ENV)
        && !secret.is_empty()
    {
        config.jwt.secret = secret;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Arc<AppConfig>, String> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    let config = parse_config(&contents)?;

    info!(
        users = config.directory.users.len(),
        subscriptions = config.directory.subscriptions.len(),
        exempt_paths = config.subscription_gate.exempt_paths.len(),
        "Configuration loaded"
    );

    Ok(Arc::new(config))
}

/// Load configuration with fallback options
pub fn load_config_with_fallback() -> Result<Arc<AppConfig>, String> {
    if let Ok(config_path) = std::env::var("CONFIG_PATH") {
        match load_config(&config_path) {
            Ok(config) => return Ok(config),
            Err(e) => warn!(
                "Failed to load config from CONFIG_PATH ({}): {}",
                config_path, e
            ),
        }
    }

    for path in ["config.yaml", "config.yml"] {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    Err(
        "No configuration file found. Please create a config.yaml file or set CONFIG_PATH environment variable."
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SameSite, SubscriptionStatus, UserRole};

    // 32 bytes of 'k', base64-encoded
    const SECRET: &str = "a2tra2tra2tra2tra2tra2tra2tra2tra2tra2tra2s=";

    #[test]
    fn test_load_valid_config() {
        let yaml = format!(
            r#"
jwt:
  secret: "{SECRET}"
  access_token_expiration_secs: 600
cookies:
  domain: pastcare.app
  secure: true
  same_site: Strict
directory:
  users:
    - id: 1
      email: admin@grace.org
      church_id: 5
      role: ADMIN
  subscriptions:
    - church_id: 5
      status: ACTIVE
"#
        );

        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.jwt.access_token_expiration_secs, 600);
        assert_eq!(config.jwt.refresh_token_expiration_secs, 2_592_000);
        assert_eq!(config.cookies.same_site, SameSite::Strict);
        assert_eq!(config.cookies.refresh_path, "/api/auth/refresh");
        assert_eq!(config.directory.users[0].role, UserRole::Admin);
        assert!(config.directory.users[0].active);
        assert_eq!(
            config.directory.subscriptions[0].status,
            SubscriptionStatus::Active
        );
        assert!(
            config
                .subscription_gate
                .exempt_paths
                .contains(&"/api/auth/".to_string())
        );
        assert_eq!(config.login_protection.max_failed_attempts_per_account, 5);
        assert_eq!(config.login_protection.max_failed_attempts_per_ip, 10);
        assert_eq!(config.login_protection.lockout_secs, 900);
        assert_eq!(config.audit.max_entries, 10_000);
        assert_eq!(config.audit.retention_days, 90);
    }

    #[test]
    fn test_config_validation_login_protection_and_audit_limits() {
        let mut config = AppConfig::with_secret(SECRET);
        config.login_protection.max_failed_attempts_per_ip = 0;
        assert!(config.validate().unwrap_err().contains("login_protection"));

        let mut config = AppConfig::with_secret(SECRET);
        config.login_protection.window_secs = -1;
        assert!(config.validate().unwrap_err().contains("login_protection"));

        let mut config = AppConfig::with_secret(SECRET);
        config.audit.max_entries = 0;
        assert!(config.validate().unwrap_err().contains("audit"));
    }

    #[test]
    fn test_config_validation_empty_secret() {
        let config = AppConfig::with_secret("");
        let result = config.validate();
        assert!(result.unwrap_err().contains("must be set"));
    }

    #[test]
    fn test_config_validation_short_secret() {
        let config = AppConfig::with_secret("c2hvcnQ=");
        let result = config.validate();
        assert!(result.unwrap_err().contains("at least 32 bytes"));
    }

    #[test]
    fn test_config_validation_secret_not_base64() {
        let config = AppConfig::with_secret("not base64!!");
        assert!(config.validate().unwrap_err().contains("base64"));
    }

    #[test]
    fn test_config_validation_relative_exempt_path() {
        let mut config = AppConfig::with_secret(SECRET);
        config
            .subscription_gate
            .exempt_paths
            .push("api/health".to_string());
        assert!(config.validate().unwrap_err().contains("api/health"));
    }

    #[test]
    fn test_config_validation_same_site_none_requires_secure() {
        let mut config = AppConfig::with_secret(SECRET);
        config.cookies.same_site = SameSite::None;
        assert!(config.validate().is_err());

        config.cookies.secure = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_non_positive_lifetime() {
        let mut config = AppConfig::with_secret(SECRET);
        config.jwt.refresh_token_expiration_secs = 0;
        assert!(
            config
                .validate()
                .unwrap_err()
                .contains("refresh_token_expiration_secs")
        );
    }

    #[test]
    fn test_parse_config_rejects_invalid_yaml() {
        let result = parse_config("jwt: [");
        assert!(result.unwrap_err().contains("Failed to parse YAML"));
    }
}
