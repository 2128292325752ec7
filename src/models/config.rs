use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::subscription::Subscription;
use super::user::User;

/// Minimum decoded length of the HMAC signing secret (256 bits).
pub const MIN_SECRET_BYTES: usize = 32;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub subscription_gate: SubscriptionGateConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub login_protection: LoginProtectionConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    /// Seed data for the in-memory user directory and subscription store
    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Token signing and lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Base64-encoded HMAC secret
    pub secret: String,
    /// Access token lifetime (default: 900 = 15 minutes)
    #[serde(default = "default_access_expiration")]
    pub access_token_expiration_secs: i64,
    /// Access token lifetime when "remember me" is requested (default: 30 days)
    #[serde(default = "default_long_expiration")]
    pub remember_me_expiration_secs: i64,
    /// Refresh token lifetime (default: 30 days)
    #[serde(default = "default_long_expiration")]
    pub refresh_token_expiration_secs: i64,
}

fn default_access_expiration() -> i64 {
    900
}

fn default_long_expiration() -> i64 {
    2_592_000
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie domain; `localhost` means "omit the Domain attribute"
    #[serde(default = "default_cookie_domain")]
    pub domain: String,
    /// Mark cookies `Secure`. Only disable for local development.
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: SameSite,
    /// The only path the refresh cookie is sent to
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            domain: default_cookie_domain(),
            secure: false,
            same_site: SameSite::default(),
            refresh_path: default_refresh_path(),
        }
    }
}

fn default_cookie_domain() -> String {
    "localhost".to_string()
}

pub fn default_refresh_path() -> String {
    "/api/auth/refresh".to_string()
}

/// Paths that bypass the subscription gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionGateConfig {
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,
}

impl Default for SubscriptionGateConfig {
    fn default() -> Self {
        Self {
            exempt_paths: default_exempt_paths(),
        }
    }
}

pub fn default_exempt_paths() -> Vec<String> {
    [
        "/api/auth/",
        "/api/billing/",
        "/api/churches/*/subscription",
        "/api/churches/public/",
        "/api/location/",
        "/api/health",
        "/health",
        "/swagger",
        "/swagger-ui",
        "/v3/api-docs",
        "/actuator",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Failed-login lockout thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginProtectionConfig {
    /// Failures against one e-mail before it is locked (default: 5)
    #[serde(default = "default_max_account_failures")]
    pub max_failed_attempts_per_account: u32,
    /// Failures from one client address before it is blocked (default: 10)
    #[serde(default = "default_max_ip_failures")]
    pub max_failed_attempts_per_ip: u32,
    /// Window in which failures are counted (default: 900 = 15 minutes)
    #[serde(default = "default_lockout_secs")]
    pub window_secs: i64,
    /// How long a lock lasts (default: 900 = 15 minutes)
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: i64,
}

impl Default for LoginProtectionConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts_per_account: default_max_account_failures(),
            max_failed_attempts_per_ip: default_max_ip_failures(),
            window_secs: default_lockout_secs(),
            lockout_secs: default_lockout_secs(),
        }
    }
}

fn default_max_account_failures() -> u32 {
    5
}

fn default_max_ip_failures() -> u32 {
    10
}

fn default_lockout_secs() -> i64 {
    900
}

/// Retention of the in-memory audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_audit_retention_days")]
    pub retention_days: i64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_entries: default_audit_max_entries(),
            retention_days: default_audit_retention_days(),
        }
    }
}

fn default_audit_max_entries() -> usize {
    10_000
}

fn default_audit_retention_days() -> i64 {
    90
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

impl AppConfig {
    /// Build a configuration with defaults everywhere except the secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            server: ServerConfig::default(),
            jwt: JwtConfig {
                secret: secret.into(),
                access_token_expiration_secs: default_access_expiration(),
                remember_me_expiration_secs: default_long_expiration(),
                refresh_token_expiration_secs: default_long_expiration(),
            },
            cookies: CookieConfig::default(),
            subscription_gate: SubscriptionGateConfig::default(),
            cors: CorsConfig::default(),
            login_protection: LoginProtectionConfig::default(),
            audit: AuditConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt.secret.is_empty() {
            return Err("jwt.secret must be set".to_string());
        }

        let decoded = STANDARD
            .decode(self.jwt.secret.trim())
            .map_err(|e| format!("jwt.secret must be base64: {}", e))?;
        if decoded.len() < MIN_SECRET_BYTES {
            return Err(format!(
                "jwt.secret must decode to at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                decoded.len()
            ));
        }

        for (name, secs) in [
            ("access_token_expiration_secs", self.jwt.access_token_expiration_secs),
            ("remember_me_expiration_secs", self.jwt.remember_me_expiration_secs),
            ("refresh_token_expiration_secs", self.jwt.refresh_token_expiration_secs),
        ] {
            if secs <= 0 {
                return Err(format!("jwt.{} must be positive", name));
            }
        }

        if !self.cookies.refresh_path.starts_with('/') {
            return Err("cookies.refresh_path must start with '/'".to_string());
        }

        if self.cookies.same_site == SameSite::None && !self.cookies.secure {
            return Err("cookies.same_site None requires cookies.secure".to_string());
        }

        let protection = &self.login_protection;
        if protection.max_failed_attempts_per_account == 0
            || protection.max_failed_attempts_per_ip == 0
        {
            return Err("login_protection attempt limits must be positive".to_string());
        }
        if protection.window_secs <= 0 || protection.lockout_secs <= 0 {
            return Err("login_protection durations must be positive".to_string());
        }

        if self.audit.max_entries == 0 || self.audit.retention_days <= 0 {
            return Err("audit.max_entries and audit.retention_days must be positive".to_string());
        }

        for pattern in &self.subscription_gate.exempt_paths {
            if !pattern.starts_with('/') {
                return Err(format!(
                    "Exempt path '{}' must start with '/'",
                    pattern
                ));
            }
        }

        Ok(())
    }
}
