// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing, verification and policy checks.
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};

use crate::auth::user::IdentityError;
use crate::config::{HashingSettings, PasswordRequirements};
use crate::error::AppError;

/// Derived key length in bytes
const HASH_LEN: usize = 32;

/// Build scrypt parameters from settings
pub fn scrypt_params(settings: &HashingSettings) -> Result<Params, AppError> {
    if settings.log_n == 0 {
        return Err(AppError::Config("scrypt log_n must be at least 1".to_string()));
    }
    Params::new(settings.log_n, settings.r, settings.p, HASH_LEN)
        .map_err(|e| AppError::Config(format!("invalid scrypt parameters: {e}")))
}

/// Hash a password using scrypt, returning a PHC string
pub fn hash_password(plain: &str, params: Params) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
        .to_string();
    Ok(hash)
}

/// Verify a password against a PHC hash
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

/// Check a password against the complexity requirements.
/// Returns every unmet requirement, empty when the password is acceptable.
pub fn validate_password_strength(
    password: &str,
    requirements: &PasswordRequirements,
) -> Vec<IdentityError> {
    let mut errors = Vec::new();

    if password.chars().count() < requirements.min_length {
        errors.push(IdentityError::password_too_short(requirements.min_length));
    }

    if requirements.require_special && password.chars().all(char::is_alphanumeric) {
        errors.push(IdentityError::password_requires_non_alphanumeric());
    }

    if requirements.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(IdentityError::password_requires_digit());
    }

    if requirements.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(IdentityError::password_requires_lower());
    }

    if requirements.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(IdentityError::password_requires_upper());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> Params {
        scrypt_params(&HashingSettings {
            log_n: 8,
            r: 8,
            p: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_password_hashing_and_verification() {
        let hash = hash_password("!1aaaA", fast_params()).unwrap();

        assert_ne!(hash, "!1aaaA");
        assert!(hash.starts_with("$scrypt$"));
        assert!(verify_password(&hash, "!1aaaA"));
        assert!(!verify_password(&hash, "!1aaaB"));
        assert!(!verify_password("not a phc string", "!1aaaA"));
    }

    #[test]
    fn test_salts_differ() {
        let first = hash_password("Test123!", fast_params()).unwrap();
        let second = hash_password("Test123!", fast_params()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_password_strength_validation() {
        let requirements = PasswordRequirements::default();

        assert!(validate_password_strength("Test123!", &requirements).is_empty());
        assert!(validate_password_strength("!1aaaA", &requirements).is_empty());

        let codes = |pwd: &str| -> Vec<&'static str> {
            validate_password_strength(pwd, &requirements)
                .into_iter()
                .map(|e| e.code)
                .collect()
        };

        assert_eq!(codes("!1aA"), vec!["PasswordTooShort"]);
        assert_eq!(codes("Test1234"), vec!["PasswordRequiresNonAlphanumeric"]);
        assert_eq!(codes("Test!!!!"), vec!["PasswordRequiresDigit"]);
        assert_eq!(codes("TEST123!"), vec!["PasswordRequiresLower"]);
        assert_eq!(codes("test123!"), vec!["PasswordRequiresUpper"]);
        assert_eq!(codes("InvalidPassword").len(), 2);

        // Custom requirements
        let relaxed = PasswordRequirements {
            min_length: 8,
            require_uppercase: false,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        };
        assert!(validate_password_strength("securepassw0rd", &relaxed).is_empty());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let settings = HashingSettings {
            log_n: 10,
            r: 8,
            p: 0,
        };
        assert!(matches!(scrypt_params(&settings), Err(AppError::Config(_))));
    }
}
