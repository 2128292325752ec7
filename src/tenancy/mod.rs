pub mod context;

pub use context::{ActiveTenant, TenantContext, TenantContextError, TenantScope};
