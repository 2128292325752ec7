pub mod auth;
pub mod pipeline;
pub mod rate_limit;
pub mod rate_limit_memory;
pub mod subscription;
pub mod tenant_auth;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub use auth::{authenticate, authentication_middleware};
pub use pipeline::TenancyPipeline;
pub use rate_limit::{AttemptPolicy, LockScope, LoginAttemptTracker, LoginBlocked, LoginGuard};
pub use rate_limit_memory::MemoryLoginAttemptTracker;
pub use subscription::{
    AllowReason, BlockReason, ExemptPaths, GateDecision, evaluate, subscription_gate,
};
pub use tenant_auth::{
    TenantValidated, TenantValidationError, TenantViolation, VerifiedTenant,
    tenant_validation_middleware, validate_tenant,
};

/// Generic 500 body; details stay in the server log.
pub(crate) fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
