use serde::{Deserialize, Serialize};

/// Identifier of a user row in the directory.
pub type UserId = i64;

/// Identifier of a tenant (church).
pub type TenantId = i64;

/// Roles known to the platform.
///
/// `Superadmin` is the only platform-level role; every other role is scoped
/// to exactly one church.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Superadmin,
    Admin,
    Pastor,
    Treasurer,
    FellowshipLeader,
    MemberManager,
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Superadmin => "SUPERADMIN",
            UserRole::Admin => "ADMIN",
            UserRole::Pastor => "PASTOR",
            UserRole::Treasurer => "TREASURER",
            UserRole::FellowshipLeader => "FELLOWSHIP_LEADER",
            UserRole::MemberManager => "MEMBER_MANAGER",
            UserRole::Member => "MEMBER",
        }
    }

    /// Platform roles are not tenant-scoped.
    pub fn is_platform_role(&self) -> bool {
        matches!(self, UserRole::Superadmin)
    }

    /// Granted authority string, e.g. `ROLE_ADMIN`.
    pub fn authority(&self) -> String {
        format!("ROLE_{}", self.as_str())
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user as stored in the system of record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Church the user belongs to. `None` only for platform users.
    #[serde(default)]
    pub church_id: Option<TenantId>,
    pub role: UserRole,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Kind of credential carried in the `tokenType` claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claim set carried by every token.
///
/// Field names on the wire are part of the contract with existing clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Login identifier (e-mail)
    pub sub: String,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "churchId", default)]
    pub church_id: Option<TenantId>,
    pub role: UserRole,
    #[serde(rename = "tokenType")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: UserId,
    pub email: String,
    pub church_id: Option<TenantId>,
    pub role: UserRole,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            church_id: user.church_id,
            role: user.role,
        }
    }
}
