use std::sync::Arc;

use crate::audit::{AuditLogger, AuditStorage, MemoryAuditStorage};
use crate::auth::{AuthError, CookieTransport, JwtCodec};
use crate::middleware::{ExemptPaths, LoginGuard};
use crate::models::AppConfig;
use crate::storage::{
    MemorySubscriptionStore, MemoryUserDirectory, SubscriptionStore, UserDirectory,
};

/// Process-wide shared state. Nothing request-scoped lives here.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub codec: Arc<JwtCodec>,
    pub cookies: Arc<CookieTransport>,
    pub users: Arc<dyn UserDirectory>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub exempt_paths: Arc<ExemptPaths>,
    pub login_guard: LoginGuard,
    pub audit: AuditLogger,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        users: Arc<dyn UserDirectory>,
        subscriptions: Arc<dyn SubscriptionStore>,
        audit_storage: Arc<dyn AuditStorage>,
    ) -> Result<Self, AuthError> {
        let codec = JwtCodec::from_config(&config.jwt)?;
        let cookies = CookieTransport::new(config.cookies.clone());
        let exempt_paths = ExemptPaths::new(&config.subscription_gate.exempt_paths);
        let login_guard = LoginGuard::in_memory(&config.login_protection);

        Ok(Self {
            codec: Arc::new(codec),
            cookies: Arc::new(cookies),
            users,
            subscriptions,
            exempt_paths: Arc::new(exempt_paths),
            login_guard,
            audit: AuditLogger::new(audit_storage),
            config,
        })
    }

    /// State backed by in-memory stores seeded from `config.directory`.
    pub fn in_memory(config: Arc<AppConfig>) -> Result<Self, AuthError> {
        let users = MemoryUserDirectory::with_users(config.directory.users.clone());
        let subscriptions =
            MemorySubscriptionStore::with_subscriptions(config.directory.subscriptions.clone());

        Self::new(
            config.clone(),
            Arc::new(users),
            Arc::new(subscriptions),
            Arc::new(MemoryAuditStorage::from_config(&config.audit)),
        )
    }
}
