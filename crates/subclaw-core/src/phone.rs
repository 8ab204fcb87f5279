//! Contact identifier normalization.
//!
//! Chat identifiers are digits-only phone numbers carrying the country code,
//! suffixed with a fixed domain tag: `18095551234@c.us`.

/// Country code applied when a number does not already start with it.
pub const DEFAULT_COUNTRY_CODE: &str = "1";

/// Domain tag appended to every contact identifier.
pub const CONTACT_DOMAIN: &str = "c.us";

/// Keep only ASCII digits.
pub fn to_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Map any free-form phone (or an already-normalized identifier) to its
/// canonical contact identifier. Total: every input yields an identifier.
pub fn normalize_phone(raw: &str) -> String {
    let local = raw.split('@').next().unwrap_or_default();
    let digits = to_digits(local);
    if digits.starts_with(DEFAULT_COUNTRY_CODE) {
        format!("{digits}@{CONTACT_DOMAIN}")
    } else {
        format!("{DEFAULT_COUNTRY_CODE}{digits}@{CONTACT_DOMAIN}")
    }
}

/// Digits of an identifier without the domain tag, as the Cloud API wants them.
pub fn identifier_digits(identifier: &str) -> String {
    to_digits(identifier.split('@').next().unwrap_or_default())
}
