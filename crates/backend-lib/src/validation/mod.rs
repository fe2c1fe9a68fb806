// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Shape validation for account forms.
//!
//! Runs before any collaborator is called. Failures are keyed by form field
//! name so the error report lines up with the inputs that produced it.

use authchat_common::{LoginRequest, RegistrationRequest};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::ErrorReport;

// Common validation constants
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

/// Form field names
pub const EMAIL_FIELD: &str = "Email";
pub const PASSWORD_FIELD: &str = "Password";
pub const CONFIRM_PASSWORD_FIELD: &str = "ConfirmPassword";

// One '@' with something on both sides and no whitespace
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email regex is valid"));

/// Whether a string looks like an email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(email)
}

fn check_email(email: &str, report: &mut ErrorReport) {
    if email.trim().is_empty() {
        report.add(EMAIL_FIELD, "The Email field is required.");
    } else if !is_valid_email(email) {
        report.add(EMAIL_FIELD, "The Email field is not a valid e-mail address.");
    }
}

/// Validate a registration form
pub fn validate_registration(request: &RegistrationRequest) -> Result<(), ErrorReport> {
    let mut report = ErrorReport::new();

    check_email(&request.email, &mut report);

    let password_length = request.password.chars().count();
    if request.password.is_empty() {
        report.add(PASSWORD_FIELD, "The Password field is required.");
    } else if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&password_length) {
        report.add(
            PASSWORD_FIELD,
            format!(
                "The Password must be at least {MIN_PASSWORD_LENGTH} and at max {MAX_PASSWORD_LENGTH} characters long."
            ),
        );
    }

    if request.password != request.confirm_password {
        report.add(
            CONFIRM_PASSWORD_FIELD,
            "The password and confirmation password do not match.",
        );
    }

    report.into_result()
}

/// Validate a login form
pub fn validate_login(request: &LoginRequest) -> Result<(), ErrorReport> {
    let mut report = ErrorReport::new();

    check_email(&request.email, &mut report);
    if request.password.is_empty() {
        report.add(PASSWORD_FIELD, "The Password field is required.");
    }

    report.into_result()
}

/// A return target is only followed when it stays on this site:
/// a rooted path that is neither protocol-relative (`//host`) nor `/\host`,
/// and that can be sent back in a `Location` header.
pub fn is_local_url(url: &str) -> bool {
    if url.chars().any(char::is_control) {
        return false;
    }
    let mut chars = url.chars();
    match (chars.next(), chars.next()) {
        (Some('/'), None) => true,
        (Some('/'), Some(second)) => second != '/' && second != '\\',
        _ => false,
    }
}
