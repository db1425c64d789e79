//! Input validation for usernames and store names.

use std::collections::HashSet;

/// Username validation errors with helpful messages
#[derive(Debug, thiserror::Error)]
pub enum UsernameError {
    #[error("Username is too short (minimum 2 characters)")]
    TooShort,

    #[error("Username is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Username cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Username contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Username is a reserved system name")]
    Reserved,
}

pub const MIN_USERNAME_LEN: usize = 2;
pub const MAX_USERNAME_LEN: usize = 24;
pub const MAX_STORE_NAME_LEN: usize = 64;

fn reserved_names() -> HashSet<&'static str> {
    ["admin", "administrator", "root", "system", "mall", "support", "staff"]
        .into_iter()
        .collect()
}

/// Validate a username: length bounds, ASCII alphanumerics plus `_`/`-`/`.`,
/// no reserved system names. Returns the trimmed username on success.
pub fn validate_username(username: &str) -> Result<String, UsernameError> {
    if username != username.trim() {
        return Err(UsernameError::InvalidWhitespace);
    }
    if username.len() < MIN_USERNAME_LEN {
        return Err(UsernameError::TooShort);
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(UsernameError::TooLong {
            max: MAX_USERNAME_LEN,
        });
    }
    let bad: String = username
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        .collect();
    if !bad.is_empty() {
        return Err(UsernameError::InvalidCharacters { chars: bad });
    }
    if reserved_names().contains(username.to_ascii_lowercase().as_str()) {
        return Err(UsernameError::Reserved);
    }
    Ok(username.to_string())
}

/// Normalize a store name for receipts: trim, collapse inner whitespace,
/// strip control characters, cap the length.
pub fn sanitize_store_name(store: &str) -> String {
    let cleaned: String = store
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut result = collapsed;
    if result.len() > MAX_STORE_NAME_LEN {
        // Truncate on a char boundary.
        let mut end = MAX_STORE_NAME_LEN;
        while !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
    }
    result
}
