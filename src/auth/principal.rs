// The authenticated caller as seen by downstream stages.

use async_trait::async_trait;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde_json::{Value, json};

use crate::models::{Claims, TenantId, UserId, UserRole};

/// Identity derived from verified claims.
///
/// `claimed_tenant_id` is whatever the token says; it is not trusted until
/// the tenant validation stage has compared it against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub subject: String,
    pub claimed_tenant_id: Option<TenantId>,
    pub role: UserRole,
    pub authorities: Vec<String>,
}

impl Principal {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id,
            subject: claims.sub.clone(),
            claimed_tenant_id: claims.church_id,
            role: claims.role,
            authorities: vec![claims.role.authority()],
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn is_superadmin(&self) -> bool {
        self.role.is_platform_role()
    }
}

/// Authentication state of the current request.
#[derive(Debug, Clone, Default)]
pub enum Authentication {
    #[default]
    Unauthenticated,
    Authenticated(Principal),
}

impl Authentication {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Authentication::Authenticated(principal) => Some(principal),
            Authentication::Unauthenticated => None,
        }
    }
}

/// Extractor for handlers that require a signed-in caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Authentication>() {
            Some(Authentication::Authenticated(principal)) => Ok(Self(principal.clone())),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )),
        }
    }
}
