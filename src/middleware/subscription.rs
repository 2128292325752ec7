// Subscription gate: blocks tenant traffic when the church's billing state
// does not grant access.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::net::SocketAddr;
use tracing::{debug, error, warn};

use super::internal_error;
use super::tenant_auth::TenantValidated;
use crate::audit::AuditLogger;
use crate::models::{SubscriptionStatus, TenantId};
use crate::state::AppState;
use crate::storage::{StorageError, SubscriptionStore};

pub const SUBSCRIPTION_REQUIRED: &str = "SUBSCRIPTION_REQUIRED";
pub const RENEW_SUBSCRIPTION: &str = "RENEW_SUBSCRIPTION";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Any,
    Literal(String),
}

/// Compiled exempt path patterns.
///
/// A pattern matches when its segments are a prefix of the request path's
/// segments. `*` stands for exactly one non-empty path segment, so
/// `/api/churches/*/subscription` matches
/// `/api/churches/12/subscription/upgrade` but not `/api/churches/subscription`.
/// Segments compare whole: `/api/health` does not cover `/api/healthcare`.
#[derive(Debug, Clone)]
pub struct ExemptPaths {
    patterns: Vec<Vec<Segment>>,
}

impl ExemptPaths {
    pub fn new<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                pattern
                    .as_ref()
                    .split('/')
                    .map(|segment| match segment {
                        "*" => Segment::Any,
                        literal => Segment::Literal(literal.to_string()),
                    })
                    .collect()
            })
            .collect();

        Self { patterns }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| Self::matches_prefix(pattern, path))
    }

    fn matches_prefix(pattern: &[Segment], path: &str) -> bool {
        let mut segments = path.split('/');
        let last = pattern.len().saturating_sub(1);

        for (index, expected) in pattern.iter().enumerate() {
            let Some(actual) = segments.next() else {
                return false;
            };
            let ok = match expected {
                Segment::Any => !actual.is_empty(),
                // a trailing `/` in the pattern accepts any next segment
                Segment::Literal(literal) if index == last && literal.is_empty() => true,
                Segment::Literal(literal) => actual == literal,
            };
            if !ok {
                return false;
            }
        }

        !pattern.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// Superadmin or unauthenticated request
    NoTenant,
    Active,
    GracePeriod,
    PromotionalCredit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    NoSubscription,
    Status(SubscriptionStatus),
}

impl BlockReason {
    /// Machine-readable status reported to the client.
    pub fn status(&self) -> &'static str {
        match self {
            BlockReason::NoSubscription => "NO_SUBSCRIPTION",
            BlockReason::Status(status) => status.as_str(),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BlockReason::NoSubscription => {
                "No active subscription found. Please subscribe to access this feature."
            }
            BlockReason::Status(SubscriptionStatus::Suspended) => {
                "Your subscription has been suspended. Please update your payment to restore access."
            }
            BlockReason::Status(SubscriptionStatus::Canceled) => {
                "Your subscription has been canceled. Please reactivate to continue."
            }
            BlockReason::Status(SubscriptionStatus::PastDue) => {
                "Your payment is overdue. Please update your payment to continue."
            }
            BlockReason::Status(SubscriptionStatus::Active) => {
                "Active subscription required to access this feature."
            }
        }
    }
}

impl IntoResponse for BlockReason {
    fn into_response(self) -> Response {
        (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({
                "error": SUBSCRIPTION_REQUIRED,
                "message": self.message(),
                "status": self.status(),
                "requiredAction": RENEW_SUBSCRIPTION,
            })),
        )
            .into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow(AllowReason),
    Block(BlockReason),
}

/// Decide whether a tenant may use gated features on `today`.
pub async fn evaluate(
    store: &dyn SubscriptionStore,
    tenant_id: Option<TenantId>,
    today: NaiveDate,
) -> Result<GateDecision, StorageError> {
    let Some(tenant_id) = tenant_id else {
        return Ok(GateDecision::Allow(AllowReason::NoTenant));
    };

    let Some(subscription) = store.find_by_tenant_id(tenant_id).await? else {
        return Ok(GateDecision::Block(BlockReason::NoSubscription));
    };

    let decision = if subscription.is_active() {
        GateDecision::Allow(AllowReason::Active)
    } else if subscription.is_in_grace_period(today) {
        GateDecision::Allow(AllowReason::GracePeriod)
    } else if subscription.has_promotional_credits() {
        GateDecision::Allow(AllowReason::PromotionalCredit)
    } else {
        GateDecision::Block(BlockReason::Status(subscription.status))
    };

    Ok(decision)
}

pub async fn subscription_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if state.exempt_paths.is_exempt(&path) {
        return next.run(request).await;
    }

    let Some(validated) = request.extensions().get::<TenantValidated>().cloned() else {
        error!(path = %path, "Subscription gate reached without tenant validation");
        return internal_error();
    };

    let context = validated.context();
    let today = Utc::now().date_naive();

    match evaluate(state.subscriptions.as_ref(), context.tenant_id(), today).await {
        Ok(GateDecision::Allow(reason)) => {
            if reason == AllowReason::GracePeriod {
                warn!(church_id = ?context.tenant_id(), "Subscription past due, allowing within grace period");
            } else {
                debug!(?reason, "Subscription gate passed");
            }
            next.run(request).await
        }
        Ok(GateDecision::Block(reason)) => {
            let tenant_id = context.tenant_id().unwrap_or_default();
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            let ip = AuditLogger::client_ip(request.headers(), peer);

            warn!(
                church_id = tenant_id,
                status = reason.status(),
                path = %path,
                "Subscription inactive, blocking request"
            );
            state
                .audit
                .log_subscription_blocked(tenant_id, context.user_id(), &ip, &path, reason.status())
                .await;

            reason.into_response()
        }
        Err(e) => {
            error!(error = %e, church_id = ?context.tenant_id(), "Subscription lookup failed");
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Subscription;
    use crate::models::config::default_exempt_paths;
    use crate::storage::MemorySubscriptionStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_exempt_paths() {
        let exempt = ExemptPaths::new(default_exempt_paths());

        assert!(exempt.is_exempt("/api/auth/login"));
        assert!(exempt.is_exempt("/api/billing/invoices"));
        assert!(exempt.is_exempt("/api/churches/12/subscription"));
        assert!(exempt.is_exempt("/api/churches/12/subscription/upgrade"));
        assert!(exempt.is_exempt("/api/churches/public/register"));
        assert!(exempt.is_exempt("/api/health"));
        assert!(exempt.is_exempt("/health"));
        assert!(exempt.is_exempt("/swagger-ui/index.html"));
        assert!(exempt.is_exempt("/v3/api-docs"));
        assert!(exempt.is_exempt("/actuator/info"));

        assert!(!exempt.is_exempt("/api/members"));
        assert!(!exempt.is_exempt("/api/auth"));
        assert!(!exempt.is_exempt("/api/churches/12/members"));
        assert!(!exempt.is_exempt("/api/churches//subscription"));
        assert!(!exempt.is_exempt("/api/churches/subscription"));
        assert!(!exempt.is_exempt("/"));
    }

    #[test]
    fn test_exempt_paths_respect_segment_boundaries() {
        let exempt = ExemptPaths::new(default_exempt_paths());

        assert!(exempt.is_exempt("/api/health/db"));
        assert!(exempt.is_exempt("/actuator"));
        assert!(exempt.is_exempt("/swagger"));

        assert!(!exempt.is_exempt("/api/healthcare/records"));
        assert!(!exempt.is_exempt("/healthz"));
        assert!(!exempt.is_exempt("/actuator-admin/shutdown"));
        assert!(!exempt.is_exempt("/swaggerish"));
        assert!(!exempt.is_exempt("/api/churches/12/subscriptions-export"));
        assert!(!exempt.is_exempt("/api/authority/grant"));
    }

    #[test]
    fn test_trailing_wildcard() {
        let exempt = ExemptPaths::new(["/files/*"]);
        assert!(exempt.is_exempt("/files/report.pdf"));
        assert!(!exempt.is_exempt("/files/"));
        assert!(!exempt.is_exempt("/files"));
    }

    #[test]
    fn test_block_messages() {
        let body = |reason: BlockReason| (reason.status(), reason.message());

        assert_eq!(
            body(BlockReason::Status(SubscriptionStatus::Suspended)),
            (
                "SUSPENDED",
                "Your subscription has been suspended. Please update your payment to restore access."
            )
        );
        assert_eq!(
            body(BlockReason::Status(SubscriptionStatus::Canceled)).0,
            "CANCELED"
        );
        assert_eq!(
            body(BlockReason::Status(SubscriptionStatus::PastDue)).1,
            "Your payment is overdue. Please update your payment to continue."
        );
        assert_eq!(body(BlockReason::NoSubscription).0, "NO_SUBSCRIPTION");
    }

    #[tokio::test]
    async fn test_evaluate() {
        let today = date(2025, 3, 20);

        let mut grace = Subscription::new(2, SubscriptionStatus::PastDue);
        grace.next_billing_date = Some(date(2025, 3, 13));

        let mut lapsed = Subscription::new(3, SubscriptionStatus::PastDue);
        lapsed.next_billing_date = Some(date(2025, 3, 12));

        let mut promo = Subscription::new(4, SubscriptionStatus::Canceled);
        promo.free_months_remaining = 2;

        let store = MemorySubscriptionStore::with_subscriptions([
            Subscription::new(1, SubscriptionStatus::Active),
            grace,
            lapsed,
            promo,
            Subscription::new(5, SubscriptionStatus::Suspended),
        ]);

        assert_eq!(
            evaluate(&store, None, today).await.unwrap(),
            GateDecision::Allow(AllowReason::NoTenant)
        );
        assert_eq!(
            evaluate(&store, Some(1), today).await.unwrap(),
            GateDecision::Allow(AllowReason::Active)
        );
        assert_eq!(
            evaluate(&store, Some(2), today).await.unwrap(),
            GateDecision::Allow(AllowReason::GracePeriod)
        );
        assert_eq!(
            evaluate(&store, Some(3), today).await.unwrap(),
            GateDecision::Block(BlockReason::Status(SubscriptionStatus::PastDue))
        );
        assert_eq!(
            evaluate(&store, Some(4), today).await.unwrap(),
            GateDecision::Allow(AllowReason::PromotionalCredit)
        );
        assert_eq!(
            evaluate(&store, Some(5), today).await.unwrap(),
            GateDecision::Block(BlockReason::Status(SubscriptionStatus::Suspended))
        );
        assert_eq!(
            evaluate(&store, Some(6), today).await.unwrap(),
            GateDecision::Block(BlockReason::NoSubscription)
        );
    }
}
