//! Pure input validators for the registration and login forms.
//!
//! These are the exact acceptance rules the forms enforce before any network
//! call; the typed wrappers in [`crate::types`] share the same semantics.

use crate::types::{Email, Phone};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Whether `email` is an acceptable email address.
///
/// Valid iff the string has no whitespace, exactly one `@`, a non-empty
/// local part, and a domain containing an interior dot.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    Email::parse(email).is_ok()
}

/// Whether `phone` is an acceptable mobile number.
///
/// Valid iff the string is exactly ten digits and starts with 6-9.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    Phone::parse(phone).is_ok()
}

/// Whether `password` meets the minimum length rule.
///
/// Length is the only criterion; character content is unrestricted.
#[must_use]
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}
