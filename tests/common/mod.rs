#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::{Days, NaiveDate, Utc};
use pastcare_auth_api::{
    audit::MemoryAuditStorage,
    auth::{JwtCodec, TokenLifetimes},
    models::{AppConfig, Subscription, SubscriptionStatus, TenantId, User, UserId, UserRole},
    routes::build_router,
    state::AppState,
    storage::{MemorySubscriptionStore, MemoryUserDirectory},
};
use serde_json::Value;
use std::sync::Arc;

/// base64 of 32 bytes of 'k'
pub const SECRET_B64: &str = "a2tra2tra2tra2tra2tra2tra2tra2tra2tra2tra2s=";
pub const SECRET_BYTES: &[u8] = b"kkkkkkkkkkkkkkkkkkkkkkkkkkkkkkkk";
pub const PASSWORD: &str = "shepherd";

pub const GRACE: TenantId = 5;
pub const HOPE: TenantId = 6;
pub const FAITH: TenantId = 8;
pub const LAPSED: TenantId = 7;
pub const IN_GRACE: TenantId = 10;
pub const PAST_GRACE: TenantId = 11;

pub const PASTOR: UserId = 42;
pub const ROOT: UserId = 1;
pub const HOPE_MEMBER: UserId = 7;
pub const INACTIVE: UserId = 8;
pub const LAPSED_TREASURER: UserId = 9;
pub const FAITH_ADMIN: UserId = 11;
pub const GRACE_PERIOD_USER: UserId = 12;
pub const PAST_GRACE_USER: UserId = 13;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: MemoryUserDirectory,
    pub subscriptions: MemorySubscriptionStore,
    pub audit: Arc<MemoryAuditStorage>,
}

pub fn user(id: UserId, email: &str, church_id: Option<TenantId>, role: UserRole) -> User {
    User {
        id,
        email: email.to_string(),
        password_hash: bcrypt::hash(PASSWORD, 4).unwrap(),
        church_id,
        role,
        active: true,
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn past_due(church_id: TenantId, days_overdue: u64) -> Subscription {
    let mut subscription = Subscription::new(church_id, SubscriptionStatus::PastDue);
    subscription.next_billing_date = today().checked_sub_days(Days::new(days_overdue));
    subscription
}

pub fn users() -> Vec<User> {
    let mut inactive = user(INACTIVE, "retired@grace.org", Some(GRACE), UserRole::Member);
    inactive.active = false;

    vec![
        user(PASTOR, "pastor@grace.org", Some(GRACE), UserRole::Pastor),
        user(ROOT, "root@pastcare.app", None, UserRole::Superadmin),
        user(HOPE_MEMBER, "member@hope.org", Some(HOPE), UserRole::Member),
        inactive,
        user(
            LAPSED_TREASURER,
            "treasurer@lapsed.org",
            Some(LAPSED),
            UserRole::Treasurer,
        ),
        user(FAITH_ADMIN, "admin@faith.org", Some(FAITH), UserRole::Admin),
        user(
            GRACE_PERIOD_USER,
            "late@payer.org",
            Some(IN_GRACE),
            UserRole::Admin,
        ),
        user(
            PAST_GRACE_USER,
            "very@late.org",
            Some(PAST_GRACE),
            UserRole::Admin,
        ),
    ]
}

pub fn subscriptions() -> Vec<Subscription> {
    vec![
        Subscription::new(GRACE, SubscriptionStatus::Active),
        Subscription::new(HOPE, SubscriptionStatus::Suspended),
        Subscription::new(FAITH, SubscriptionStatus::Active),
        past_due(IN_GRACE, 7),
        past_due(PAST_GRACE, 8),
    ]
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::with_secret(SECRET_B64);
    config.directory.users = users();
    config.directory.subscriptions = subscriptions();
    config
}

/// Build the full router with `routes` mounted behind the pipeline.
pub fn app(routes: Router<AppState>) -> TestApp {
    app_with_config(config(), routes)
}

pub fn app_with_config(config: AppConfig, routes: Router<AppState>) -> TestApp {
    let config = Arc::new(config);
    let users = MemoryUserDirectory::with_users(config.directory.users.clone());
    let subscriptions =
        MemorySubscriptionStore::with_subscriptions(config.directory.subscriptions.clone());
    let audit = Arc::new(MemoryAuditStorage::from_config(&config.audit));

    let state = AppState::new(
        config,
        Arc::new(users.clone()),
        Arc::new(subscriptions.clone()),
        audit.clone(),
    )
    .unwrap();

    TestApp {
        router: build_router(state.clone(), routes),
        state,
        users,
        subscriptions,
        audit,
    }
}

impl TestApp {
    pub fn token(&self, subject: &str, user_id: UserId, church_id: Option<TenantId>, role: UserRole) -> String {
        self.state
            .codec
            .issue(subject, user_id, church_id, role, false)
            .unwrap()
    }
}

/// A codec sharing the app secret whose access tokens are already expired.
pub fn expired_codec() -> JwtCodec {
    JwtCodec::new(
        SECRET_BYTES,
        TokenLifetimes {
            access: chrono::Duration::seconds(-60),
            remember_me: chrono::Duration::seconds(-60),
            refresh: chrono::Duration::seconds(-60),
        },
    )
    .unwrap()
}

pub fn http_get(uri: &str, access_token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = access_token {
        builder = builder.header(header::COOKIE, format!("access_token={}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn http_post(uri: &str, cookie: Option<String>, json: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match json {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of the named cookie among the response's `Set-Cookie` headers.
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?.to_string();
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
