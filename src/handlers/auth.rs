use axum::{
    Extension, Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Value, json};
use std::net::SocketAddr;
use tracing::{debug, error, info, warn};

use crate::audit::AuditLogger;
use crate::auth::{Authentication, CookieKind, verify_dummy_password, verify_password};
use crate::models::{AuthResponse, LoginRequest, TokenType, User, UserInfo};
use crate::state::AppState;

type ErrorResponse = (StatusCode, Json<Value>);

fn invalid_credentials() -> ErrorResponse {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Invalid credentials"
        })),
    )
}

fn unauthorized() -> ErrorResponse {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Unauthorized"
        })),
    )
}

fn internal_error() -> ErrorResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error"
        })),
    )
}

/// Password login.
///
/// Locked accounts and client addresses are refused before any credential
/// check. Every credential failure counts toward both locks and gets the
/// same 401, and an unknown e-mail still pays for a bcrypt check.
pub async fn login(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), Response> {
    let ip = AuditLogger::client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let user_agent = AuditLogger::user_agent(&headers);
    let now = Utc::now();

    match state.login_guard.check(&payload.email, &ip, now).await {
        Ok(Some(blocked)) => {
            warn!(ip = %ip, scope = ?blocked.scope, "Login refused while locked out");
            state
                .audit
                .log_login_failed(&payload.email, &ip, user_agent, "Too many failed attempts")
                .await;
            return Err(blocked.into_response());
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Error checking login lockout"),
    }

    let user = match state.users.find_user_by_email(&payload.email).await {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, "User directory unavailable during login");
            return Err(internal_error().into_response());
        }
    };

    let failure = match &user {
        Some(user) => {
            let is_valid = verify_password(&payload.password, &user.password_hash).map_err(|e| {
                error!(error = %e, user_id = user.id, "Password verification failed");
                internal_error().into_response()
            })?;
            if !is_valid {
                Some("Invalid password")
            } else if !user.active {
                Some("Account inactive")
            } else {
                None
            }
        }
        None => {
            if let Err(e) = verify_dummy_password(&payload.password) {
                warn!(error = %e, "Dummy password check failed");
            }
            Some("Unknown user")
        }
    };

    let user = match (user, failure) {
        (Some(user), None) => user,
        (_, reason) => {
            let reason = reason.unwrap_or("Unknown user");
            if let Err(e) = state.login_guard.record_failure(&payload.email, &ip, now).await {
                warn!(error = %e, "Failed to record failed login");
            }
            state
                .audit
                .log_login_failed(&payload.email, &ip, user_agent, reason)
                .await;
            return Err(invalid_credentials().into_response());
        }
    };

    if let Err(e) = state.login_guard.record_success(&payload.email).await {
        warn!(error = %e, "Failed to reset failed login attempts");
    }

    let mut response_headers = HeaderMap::new();
    issue_cookies(&state, &user, payload.remember_me, &mut response_headers)
        .map_err(IntoResponse::into_response)?;

    info!(user_id = user.id, church_id = ?user.church_id, "User logged in");
    state
        .audit
        .log_login(user.church_id, user.id, &ip, user_agent)
        .await;

    Ok((
        StatusCode::OK,
        response_headers,
        Json(AuthResponse {
            user: UserInfo::from(user),
        }),
    ))
}

fn issue_cookies(
    state: &AppState,
    user: &User,
    remember_me: bool,
    headers: &mut HeaderMap,
) -> Result<(), ErrorResponse> {
    let lifetimes = state.codec.lifetimes();

    let access = state
        .codec
        .issue(&user.email, user.id, user.church_id, user.role, remember_me)
        .and_then(|token| {
            state.cookies.attach(
                headers,
                &token,
                CookieKind::Access,
                lifetimes.access_for(remember_me),
            )
        });

    let refresh = state
        .codec
        .issue_refresh(&user.email, user.id, user.church_id, user.role)
        .and_then(|token| {
            state
                .cookies
                .attach(headers, &token, CookieKind::Refresh, lifetimes.refresh)
        });

    access.and(refresh).map_err(|e| {
        error!(error = %e, user_id = user.id, "Failed to issue tokens");
        internal_error()
    })
}

/// Exchange the refresh cookie for a fresh access cookie.
///
/// The user is re-read from the directory so church and role changes take
/// effect on the next access token.
pub async fn refresh(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ErrorResponse> {
    let ip = AuditLogger::client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));

    let token = state
        .cookies
        .extract(&headers, CookieKind::Refresh)
        .ok_or_else(unauthorized)?;

    let claims = state.codec.verify(&token).map_err(|e| {
        debug!(error = %e, "Refresh token rejected");
        unauthorized()
    })?;

    if claims.token_type != TokenType::Refresh {
        debug!(user_id = claims.user_id, "Access token presented for refresh");
        return Err(unauthorized());
    }

    let user = match state.users.find_user_by_id(claims.user_id).await {
        Ok(Some(user)) if user.active && user.email.eq_ignore_ascii_case(&claims.sub) => user,
        Ok(_) => {
            debug!(user_id = claims.user_id, "Refresh token no longer matches an active user");
            return Err(unauthorized());
        }
        Err(e) => {
            error!(error = %e, "User directory unavailable during refresh");
            return Err(internal_error());
        }
    };

    let access_lifetime = state.codec.lifetimes().access;
    let mut response_headers = HeaderMap::new();
    state
        .codec
        .issue(&user.email, user.id, user.church_id, user.role, false)
        .and_then(|token| {
            state.cookies.attach(
                &mut response_headers,
                &token,
                CookieKind::Access,
                access_lifetime,
            )
        })
        .map_err(|e| {
            error!(error = %e, user_id = user.id, "Failed to issue access token");
            internal_error()
        })?;

    state
        .audit
        .log_token_refreshed(user.church_id, user.id, &ip)
        .await;

    Ok((
        StatusCode::OK,
        response_headers,
        Json(AuthResponse {
            user: UserInfo::from(user),
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    authentication: Option<Extension<Authentication>>,
    headers: HeaderMap,
) -> Result<(StatusCode, HeaderMap, Json<Value>), ErrorResponse> {
    let mut response_headers = HeaderMap::new();
    state
        .cookies
        .revoke_all(&mut response_headers)
        .map_err(|e| {
            error!(error = %e, "Failed to build revocation cookies");
            internal_error()
        })?;

    if let Some(Extension(Authentication::Authenticated(principal))) = authentication {
        let ip = AuditLogger::client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
        state
            .audit
            .log_logout(principal.claimed_tenant_id, principal.user_id, &ip)
            .await;
    }

    Ok((StatusCode::OK, response_headers, Json(json!({}))))
}
