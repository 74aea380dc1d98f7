//! Temporary password generation and password policy checks.

use rand::seq::{IndexedRandom, SliceRandom};

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*";

/// Generates a random password of `length` characters (minimum 4) holding at
/// least one upper-case letter, lower-case letter, digit and one of
/// `!@#$%^&*`.
///
/// Uses the thread-local CSPRNG.
#[must_use]
pub fn generate_temporary_password(length: usize) -> String {
    let length = length.max(4);
    let mut rng = rand::rng();

    let all: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SPECIAL].concat();

    let mut chars: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SPECIAL]
        .iter()
        .filter_map(|set| set.choose(&mut rng).copied())
        .collect();

    chars.extend((chars.len()..length).filter_map(|_| all.choose(&mut rng).copied()));
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

/// Checks a user-chosen password against the policy. Returns the first
/// violated rule as a message.
pub fn check_new_password(
    current: &str,
    new_password: &str,
    min_length: usize,
) -> Result<(), String> {
    if new_password.chars().count() < min_length {
        return Err(format!(
            "New password must be at least {min_length} characters"
        ));
    }

    if new_password.chars().all(|c| c.is_ascii_digit()) {
        return Err("New password cannot be entirely numeric".to_string());
    }

    if current == new_password {
        return Err("New password must be different from current password".to_string());
    }

    Ok(())
}
