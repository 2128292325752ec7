use axum::{Json, http::StatusCode};
use serde_json::{Value, json};
use tracing::error;

use crate::auth::AuthenticatedUser;
use crate::tenancy::TenantContext;

/// The caller's verified tenant binding.
pub async fn current_user(
    AuthenticatedUser(principal): AuthenticatedUser,
    context: TenantContext,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let active = context.current().ok_or_else(|| {
        error!(user_id = principal.user_id, "Authenticated request without tenant context");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Internal server error"
            })),
        )
    })?;

    Ok(Json(json!({
        "userId": active.user_id,
        "email": principal.subject,
        "churchId": active.tenant_id,
        "role": active.role,
    })))
}
