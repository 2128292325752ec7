// Signed, time-bounded credentials carrying identity and tenant claims.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::{Map, Value};

use super::error::AuthError;
use crate::models::{Claims, JwtConfig, TenantId, TokenType, UserId, UserRole};
use crate::models::config::MIN_SECRET_BYTES;

/// Token lifetimes, fixed at issuance.
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub remember_me: Duration,
    pub refresh: Duration,
}

impl TokenLifetimes {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            access: Duration::seconds(config.access_token_expiration_secs),
            remember_me: Duration::seconds(config.remember_me_expiration_secs),
            refresh: Duration::seconds(config.refresh_token_expiration_secs),
        }
    }

    /// Access lifetime selected by the "remember me" flag.
    pub fn access_for(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me
        } else {
            self.access
        }
    }
}

/// HS256 codec over a single process-wide secret.
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetimes: TokenLifetimes,
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("lifetimes", &self.lifetimes)
            .finish_non_exhaustive()
    }
}

impl JwtCodec {
    pub fn new(secret: &[u8], lifetimes: TokenLifetimes) -> Result<Self, AuthError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::InvalidKey(format!(
                "secret must be at least {} bytes",
                MIN_SECRET_BYTES
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetimes,
        })
    }

    /// Build from configuration; the configured secret is base64.
    pub fn from_config(config: &JwtConfig) -> Result<Self, AuthError> {
        let secret = STANDARD
            .decode(config.secret.trim())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Self::new(&secret, TokenLifetimes::from_config(config))
    }

    pub fn lifetimes(&self) -> &TokenLifetimes {
        &self.lifetimes
    }

    /// Issue an access token. `remember_me` picks the long lifetime.
    pub fn issue(
        &self,
        subject: &str,
        user_id: UserId,
        church_id: Option<TenantId>,
        role: UserRole,
        remember_me: bool,
    ) -> Result<String, AuthError> {
        self.sign(
            subject,
            user_id,
            church_id,
            role,
            TokenType::Access,
            self.lifetimes.access_for(remember_me),
        )
    }

    pub fn issue_refresh(
        &self,
        subject: &str,
        user_id: UserId,
        church_id: Option<TenantId>,
        role: UserRole,
    ) -> Result<String, AuthError> {
        self.sign(
            subject,
            user_id,
            church_id,
            role,
            TokenType::Refresh,
            self.lifetimes.refresh,
        )
    }

    fn sign(
        &self,
        subject: &str,
        user_id: UserId,
        church_id: Option<TenantId>,
        role: UserRole,
        token_type: TokenType,
        lifetime: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            user_id,
            church_id,
            role,
            token_type,
            iat: now,
            exp: now + lifetime.num_seconds(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry, returning the claim set.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Look up a single claim by wire name on a verified token.
    ///
    /// Unknown and null claims resolve to `None`.
    pub fn claim(&self, token: &str, key: &str) -> Result<Option<Value>, AuthError> {
        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims.get(key).filter(|v| !v.is_null()).cloned())
    }
}
