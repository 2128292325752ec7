pub mod config;
pub mod subscription;
pub mod user;

pub use config::{
    AppConfig, AuditConfig, CookieConfig, CorsConfig, DirectoryConfig, JwtConfig,
    LoginProtectionConfig, SameSite, ServerConfig, SubscriptionGateConfig,
};
pub use subscription::{Subscription, SubscriptionStatus};
pub use user::{
    AuthResponse, Claims, LoginRequest, TenantId, TokenType, User, UserId, UserInfo, UserRole,
};
