use lazy_static::lazy_static;

use super::error::AuthError;

lazy_static! {
    // Same cost as stored hashes, so checking an unknown account costs as
    // much as checking a real one.
    static ref DUMMY_HASH: Option<String> = hash_password("pastcare-unknown-account").ok();
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| AuthError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Run a full bcrypt check against a throwaway hash. Always `Ok(false)`.
///
/// Used when no account matches, so that branch is not measurably faster
/// than a wrong password.
pub fn verify_dummy_password(password: &str) -> Result<bool, AuthError> {
    let hash = DUMMY_HASH
        .as_deref()
        .ok_or_else(|| AuthError::PasswordHash("dummy hash unavailable".to_string()))?;
    verify_password(password, hash).map(|_| false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = bcrypt::hash("hallelujah", 4).unwrap();
        assert!(verify_password("hallelujah", &hash).unwrap());
        assert!(!verify_password("amen", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_dummy_hash_uses_default_cost() {
        let hash = DUMMY_HASH.as_deref().unwrap();
        let prefix = format!("$2b${:02}$", bcrypt::DEFAULT_COST);
        assert!(hash.starts_with(&prefix), "{} lacks {}", hash, prefix);
    }

    #[test]
    fn test_dummy_check_never_succeeds() {
        assert!(!verify_dummy_password("pastcare-unknown-account").unwrap());
        assert!(!verify_dummy_password("shepherd").unwrap());
    }
}
