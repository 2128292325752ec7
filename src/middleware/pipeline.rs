// Fixed composition of the request pipeline.

use axum::{Router, middleware::from_fn_with_state};

use super::auth::authentication_middleware;
use super::subscription::subscription_gate;
use super::tenant_auth::tenant_validation_middleware;
use crate::state::AppState;

/// Authentication, then tenant validation, then the subscription gate.
///
/// This is the only way the stages are mounted, so their order cannot vary
/// between routers.
pub struct TenancyPipeline {
    state: AppState,
}

impl TenancyPipeline {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        // Layers wrap outward: the last one added runs first.
        router
            .layer(from_fn_with_state(self.state.clone(), subscription_gate))
            .layer(from_fn_with_state(
                self.state.clone(),
                tenant_validation_middleware,
            ))
            .layer(from_fn_with_state(self.state, authentication_middleware))
    }
}
