//! Normalization and validation of user-supplied form fields.
//!
//! Every function returns the cleaned value or a user-facing message; the
//! calling service wraps the message in its own validation error.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_PROVIDER_NAME_LEN: usize = 100;
pub const MAX_CERTIFICATE_NAME_LEN: usize = 200;
pub const MAX_CATALOG_NAME_LEN: usize = 100;

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
}

fn hex_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"^#[0-9A-Fa-f]{6}$")
}

/// Upper-cases the first letter of every word and lower-cases the rest.
/// Any non-alphabetic character starts a new word (`o'neil` -> `O'Neil`).
#[must_use]
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

pub fn normalize_email(email: &str) -> Result<String, String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err("Email is required.".to_string());
    }
    if !email_regex().is_match(&email) {
        return Err("Enter a valid email address.".to_string());
    }
    Ok(email)
}

/// Trims, requires at least two characters, and title-cases a first or last
/// name. `label` names the field in the message.
pub fn normalize_person_name(value: &str, label: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{label} is required."));
    }
    if value.chars().count() < 2 {
        return Err(format!("{label} must be at least 2 characters long."));
    }
    Ok(title_case(value))
}

/// Department and position are optional; present values are title-cased.
#[must_use]
pub fn normalize_org_field(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        String::new()
    } else {
        title_case(value)
    }
}

/// Empty input is allowed and stays empty.
pub fn validate_http_url(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Ok(value.to_string())
        }
        _ => Err("Enter a valid http or https URL.".to_string()),
    }
}

pub fn validate_hex_color(value: &str) -> Result<String, String> {
    let value = value.trim();
    if hex_color_regex().is_match(value) {
        Ok(value.to_string())
    } else {
        Err("Color must be a hex code like #3B82F6.".to_string())
    }
}

pub fn validate_required(value: &str, label: &str, max_len: usize) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{label} is required."));
    }
    if value.chars().count() > max_len {
        return Err(format!("{label} must be {max_len} characters or less."));
    }
    Ok(value.to_string())
}

pub fn validate_provider_name(value: &str) -> Result<String, String> {
    validate_required(value, "Provider name", MAX_PROVIDER_NAME_LEN)
}

/// Issue date must not be in the future; expiry, when set, must come after
/// the issue date.
pub fn validate_certificate_dates(
    issue_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), String> {
    if issue_date > today {
        return Err("Issue date cannot be in the future.".to_string());
    }
    if let Some(expiry) = expiry_date
        && expiry <= issue_date
    {
        return Err("Expiry date must be after issue date.".to_string());
    }
    Ok(())
}
