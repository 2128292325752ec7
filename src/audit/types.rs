// Audit log types and structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{TenantId, UserId};

/// Audit log entry representing a single auditable event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier for the audit entry
    pub id: String,
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// Church the event belongs to
    pub tenant_id: Option<TenantId>,
    /// User who performed the action
    pub user_id: Option<UserId>,
    /// IP address of the requester
    pub ip_address: String,
    /// User agent string from the request
    pub user_agent: Option<String>,
    /// Request path, when the event happened inside the request pipeline
    pub path: Option<String>,
    pub action: AuditAction,
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    pub level: AuditLevel,
    pub success: bool,
    pub error_message: Option<String>,
    /// Additional metadata about the event
    pub metadata: HashMap<String, String>,
}

/// Types of auditable actions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    LoginFailed,
    Logout,
    TokenRefreshed,
    TenantViolation,
    SubscriptionBlocked,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::LoginFailed => "login_failed",
            AuditAction::Logout => "logout",
            AuditAction::TokenRefreshed => "token_refreshed",
            AuditAction::TenantViolation => "tenant_violation",
            AuditAction::SubscriptionBlocked => "subscription_blocked",
        }
    }
}

/// Resource types that can be audited
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    User,
    Token,
    Tenant,
    Subscription,
}

/// Severity level of audit events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    /// Informational events (normal operations)
    Info,
    /// Unusual but expected outcomes, e.g. a lapsed subscription
    Warning,
    /// Security-relevant events
    Security,
    /// Critical security events
    Critical,
}

/// Query parameters for searching audit logs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub tenant_id: Option<TenantId>,
    pub user_id: Option<UserId>,
    pub action: Option<AuditAction>,
    pub success: Option<bool>,
    /// Filter by minimum severity level
    pub min_level: Option<AuditLevel>,
    /// Maximum number of results to return
    pub limit: Option<usize>,
}

impl AuditEntry {
    /// Start an entry for `action`; everything else is optional.
    pub fn builder(action: AuditAction) -> AuditEntryBuilder {
        AuditEntryBuilder {
            action,
            tenant_id: None,
            user_id: None,
            ip_address: None,
            user_agent: None,
            path: None,
            resource_type: None,
            resource_id: None,
            level: None,
            success: None,
            error_message: None,
            metadata: HashMap::new(),
        }
    }
}

/// Builder for creating audit entries
pub struct AuditEntryBuilder {
    action: AuditAction,
    tenant_id: Option<TenantId>,
    user_id: Option<UserId>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    path: Option<String>,
    resource_type: Option<ResourceType>,
    resource_id: Option<String>,
    level: Option<AuditLevel>,
    success: Option<bool>,
    error_message: Option<String>,
    metadata: HashMap<String, String>,
}

impl AuditEntryBuilder {
    pub fn tenant_id(mut self, tenant_id: Option<TenantId>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn user_id(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn level(mut self, level: AuditLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self.success = Some(false);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> AuditEntry {
        AuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            ip_address: self.ip_address.unwrap_or_else(|| "unknown".to_string()),
            user_agent: self.user_agent,
            path: self.path,
            action: self.action,
            resource_type: self.resource_type.unwrap_or(ResourceType::User),
            resource_id: self.resource_id,
            level: self.level.unwrap_or(AuditLevel::Info),
            success: self.success.unwrap_or(true),
            error_message: self.error_message,
            metadata: self.metadata,
        }
    }
}
