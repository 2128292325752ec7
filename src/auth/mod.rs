pub mod cookies;
pub mod error;
pub mod jwt;
pub mod password;
pub mod principal;

pub use cookies::{ACCESS_TOKEN_COOKIE, CookieKind, CookieTransport, REFRESH_TOKEN_COOKIE};
pub use error::AuthError;
pub use jwt::{JwtCodec, TokenLifetimes};
pub use password::{hash_password, verify_dummy_password, verify_password};
pub use principal::{AuthenticatedUser, Authentication, Principal};
