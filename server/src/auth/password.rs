//! Argon2 password hashing.

use rand::Rng;
use thiserror::Error;

/// Hashing failure
#[derive(Error, Debug)]
#[error("Password hashing failed: {0}")]
pub struct PasswordError(#[from] argon2::Error);

/// Hash `password` with a fresh random 16-byte salt.
///
/// # Errors
///
/// Returns [`PasswordError`] if argon2 rejects its parameters.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &argon2::Config::default(),
    )?)
}

/// Check `password` against an encoded hash.
///
/// # Errors
///
/// Returns [`PasswordError`] if `encoded` is not a valid argon2 hash.
pub fn verify_password(encoded: &str, password: &str) -> Result<bool, PasswordError> {
    Ok(argon2::verify_encoded(encoded, password.as_bytes())?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "hunter22").unwrap());
        assert!(!verify_password(&hash, "hunter23").unwrap());
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_hash_embeds_a_sixteen_byte_salt() {
        let hash = hash_password("hunter22").unwrap();
        // $argon2i$v=19$m=..,t=..,p=..$<salt>$<hash>, salt is unpadded base64
        let salt = hash.split('$').nth(4).unwrap();
        assert_eq!(salt.len(), 22);
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("not-a-hash", "whatever").is_err());
    }
}
