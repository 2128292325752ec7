// Tenant validation: re-derives the caller's church from the directory and
// cross-checks it against the `churchId` claim before publishing it.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::{Instrument, debug, error, info_span};

use super::internal_error;
use crate::audit::{AuditLogger, TenantViolationEvent};
use crate::auth::{Authentication, Principal};
use crate::models::{TenantId, UserId, UserRole};
use crate::state::AppState;
use crate::storage::{StorageError, UserDirectory};
use crate::tenancy::TenantContext;

/// Marker that the request went through tenant validation.
///
/// Only this module can construct it, so later stages can rely on the
/// ordering instead of assuming it.
#[derive(Debug, Clone)]
pub struct TenantValidated {
    context: TenantContext,
}

impl TenantValidated {
    pub fn context(&self) -> &TenantContext {
        &self.context
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TenantViolation {
    #[error("authenticated user not found in directory")]
    UserNotFound,

    #[error("token carries no tenant claim")]
    MissingTenantClaim,

    #[error("token tenant does not match directory tenant")]
    TenantMismatch,
}

#[derive(Debug, Error)]
pub enum TenantValidationError {
    #[error("{violation}")]
    Violation {
        violation: TenantViolation,
        actual_tenant_id: Option<TenantId>,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TenantValidationError {
    fn violation(violation: TenantViolation, actual_tenant_id: Option<TenantId>) -> Self {
        Self::Violation {
            violation,
            actual_tenant_id,
        }
    }
}

/// The tenant binding that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTenant {
    pub tenant_id: Option<TenantId>,
    pub user_id: UserId,
    pub role: UserRole,
}

/// Cross-check a principal's claimed tenant against the directory.
///
/// The lookup is by user id, never by subject. The superadmin exception only
/// applies when the directory agrees the user is a superadmin, and the
/// published role is always the directory's.
pub async fn validate_tenant(
    users: &dyn UserDirectory,
    principal: &Principal,
) -> Result<VerifiedTenant, TenantValidationError> {
    let Some(user) = users.find_user_by_id(principal.user_id).await? else {
        return Err(TenantValidationError::violation(
            TenantViolation::UserNotFound,
            None,
        ));
    };

    if principal.is_superadmin() && user.role.is_platform_role() {
        return Ok(VerifiedTenant {
            tenant_id: None,
            user_id: principal.user_id,
            role: user.role,
        });
    }

    let Some(claimed) = principal.claimed_tenant_id else {
        return Err(TenantValidationError::violation(
            TenantViolation::MissingTenantClaim,
            user.church_id,
        ));
    };

    if user.church_id != Some(claimed) {
        return Err(TenantValidationError::violation(
            TenantViolation::TenantMismatch,
            user.church_id,
        ));
    }

    Ok(VerifiedTenant {
        tenant_id: user.church_id,
        user_id: principal.user_id,
        role: user.role,
    })
}

fn access_denied() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Access denied" })),
    )
        .into_response()
}

pub async fn tenant_validation_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // The scope outlives every branch below; dropping it clears the context.
    let context = TenantContext::new();
    let scope = context.open_scope();
    request.extensions_mut().insert(context.clone());

    let authentication = request.extensions().get::<Authentication>().cloned();
    let principal = match authentication {
        Some(Authentication::Authenticated(principal)) => principal,
        Some(Authentication::Unauthenticated) => {
            request.extensions_mut().insert(TenantValidated { context });
            return next.run(request).await;
        }
        None => {
            error!(path = %request.uri().path(), "Tenant validation reached without authentication stage");
            return internal_error();
        }
    };

    let path = request.uri().path().to_string();

    match validate_tenant(state.users.as_ref(), &principal).await {
        Ok(verified) => {
            scope.begin(verified.tenant_id, verified.user_id, verified.role);
            request
                .extensions_mut()
                .insert(TenantValidated { context });

            debug!(church_id = ?verified.tenant_id, user_id = verified.user_id, "Tenant context established");

            let span = info_span!(
                "tenant",
                church_id = ?verified.tenant_id,
                user_id = verified.user_id,
                role = %verified.role,
                path = %path,
            );
            let response = next.run(request).instrument(span).await;
            drop(scope);
            response
        }
        Err(TenantValidationError::Violation {
            violation,
            actual_tenant_id,
        }) => {
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            let ip = AuditLogger::client_ip(request.headers(), peer);

            error!(
                reason = %violation,
                user_id = principal.user_id,
                claimed_church_id = ?principal.claimed_tenant_id,
                actual_church_id = ?actual_tenant_id,
                ip = %ip,
                path = %path,
                "SECURITY: tenant isolation violation"
            );
            state
                .audit
                .log_tenant_violation(TenantViolationEvent {
                    reason: &violation.to_string(),
                    user_id: principal.user_id,
                    claimed_tenant_id: principal.claimed_tenant_id,
                    actual_tenant_id,
                    ip_address: &ip,
                    path: &path,
                })
                .await;

            access_denied()
        }
        Err(TenantValidationError::Storage(e)) => {
            error!(error = %e, user_id = principal.user_id, "User directory unavailable during tenant validation");
            internal_error()
        }
    }
}
