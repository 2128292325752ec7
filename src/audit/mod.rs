// Audit trail for authentication and tenant-isolation events

pub mod logger;
pub mod storage;
pub mod types;

pub use logger::{AuditLogger, TenantViolationEvent};
pub use storage::{AuditStorage, MemoryAuditStorage};
pub use types::{AuditAction, AuditEntry, AuditLevel, AuditQuery, ResourceType};
