// Authentication stage: turns the access cookie into a [`Principal`].
//
// This stage never rejects. Anything short of a valid access token for an
// active directory user leaves the request `Unauthenticated`, and handlers
// decide whether that matters.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{Authentication, CookieKind, Principal};
use crate::models::TokenType;
use crate::state::AppState;

pub async fn authentication_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let authentication = {
        let headers = request.headers();
        authenticate(&state, headers).await
    };
    request.extensions_mut().insert(authentication);

    next.run(request).await
}

/// Resolve the caller from the access cookie.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Authentication {
    let Some(token) = state.cookies.extract(headers, CookieKind::Access) else {
        return Authentication::Unauthenticated;
    };

    let claims = match state.codec.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Access token rejected");
            return Authentication::Unauthenticated;
        }
    };

    if claims.token_type != TokenType::Access {
        debug!(user_id = claims.user_id, "Refresh token presented as access credential");
        return Authentication::Unauthenticated;
    }

    match state.users.find_user_by_email(&claims.sub).await {
        Ok(Some(user)) if user.active && user.id == claims.user_id => {
            Authentication::Authenticated(Principal::from_claims(&claims))
        }
        Ok(Some(user)) => {
            debug!(
                user_id = claims.user_id,
                directory_user_id = user.id,
                active = user.active,
                "Token subject does not resolve to the claimed active user"
            );
            Authentication::Unauthenticated
        }
        Ok(None) => {
            debug!(user_id = claims.user_id, "Token subject not found in directory");
            Authentication::Unauthenticated
        }
        Err(e) => {
            warn!(error = %e, "User directory unavailable during authentication");
            Authentication::Unauthenticated
        }
    }
}
