//! Input validation rules for user records

use url::Url;

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Canonical form of a username; `None` if it is blank
pub fn normalize_username(username: &str) -> Option<&str> {
    let trimmed = username.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub fn is_valid_email(email: &str) -> bool {
    validator::validate_email(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Absolute URL with a scheme, e.g. `https://example.com/a.png`
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}
