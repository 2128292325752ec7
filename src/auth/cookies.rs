// Moves tokens between client and server in `HttpOnly` cookies.
//
// The refresh cookie is path-scoped to the refresh endpoint so it never
// travels with ordinary API traffic.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use chrono::Duration;

use super::error::AuthError;
use crate::models::CookieConfig;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieKind {
    Access,
    Refresh,
}

impl CookieKind {
    pub fn name(&self) -> &'static str {
        match self {
            CookieKind::Access => ACCESS_TOKEN_COOKIE,
            CookieKind::Refresh => REFRESH_TOKEN_COOKIE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CookieTransport {
    config: CookieConfig,
}

impl CookieTransport {
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    fn path(&self, kind: CookieKind) -> &str {
        match kind {
            CookieKind::Access => "/",
            CookieKind::Refresh => &self.config.refresh_path,
        }
    }

    fn build(&self, kind: CookieKind, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}",
            kind.name(),
            value,
            self.path(kind),
            max_age_secs.max(0)
        );

        if max_age_secs <= 0 {
            cookie.push_str("; Expires=");
            cookie.push_str(EXPIRED);
        }

        if self.config.domain != "localhost" {
            cookie.push_str("; Domain=");
            cookie.push_str(&self.config.domain);
        }

        cookie.push_str("; HttpOnly");
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.config.same_site.as_str());
        cookie
    }

    /// Build the `Set-Cookie` value carrying `token`.
    pub fn cookie(
        &self,
        token: &str,
        kind: CookieKind,
        max_age: Duration,
    ) -> Result<HeaderValue, AuthError> {
        HeaderValue::from_str(&self.build(kind, token, max_age.num_seconds()))
            .map_err(|e| AuthError::InvalidCookie(e.to_string()))
    }

    /// Append a `Set-Cookie` header carrying `token`.
    pub fn attach(
        &self,
        headers: &mut HeaderMap,
        token: &str,
        kind: CookieKind,
        max_age: Duration,
    ) -> Result<(), AuthError> {
        let value = self.cookie(token, kind, max_age)?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }

    /// Read the cookie for `kind` from the request headers.
    pub fn extract(&self, headers: &HeaderMap, kind: CookieKind) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == kind.name())
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// A cookie that the browser drops immediately.
    pub fn revoke(&self, kind: CookieKind) -> Result<HeaderValue, AuthError> {
        HeaderValue::from_str(&self.build(kind, "", 0))
            .map_err(|e| AuthError::InvalidCookie(e.to_string()))
    }

    /// Revoke both cookies. Nothing is appended unless both values build.
    pub fn revoke_all(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        let access = self.revoke(CookieKind::Access)?;
        let refresh = self.revoke(CookieKind::Refresh)?;
        headers.append(SET_COOKIE, access);
        headers.append(SET_COOKIE, refresh);
        Ok(())
    }
}
