use thiserror::Error;

/// Credential and transport errors.
///
/// Callers collapse every variant to "no credential"; the distinction only
/// ever reaches server-side debug logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("failed to encode token: {0}")]
    Encoding(String),

    #[error("invalid cookie value: {0}")]
    InvalidCookie(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_jsonwebtoken() {
        let jwt_err =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature);
        assert!(matches!(AuthError::from(jwt_err), AuthError::TokenExpired));

        let jwt_err =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature);
        assert!(matches!(
            AuthError::from(jwt_err),
            AuthError::TokenInvalid(_)
        ));
    }
}
