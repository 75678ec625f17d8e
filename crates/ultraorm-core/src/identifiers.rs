//! Identifier hygiene.
//!
//! Table and column names are interpolated into SQL text (values never are),
//! so they are restricted to a closed grammar checked once at
//! entity-definition time. Anything the grammar rejects cannot reach a
//! statement.

use crate::error::{Error, Result};

/// Check a name against the identifier grammar `[A-Za-z_][A-Za-z0-9_]*`.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate an identifier, describing its role in the error message.
pub fn ensure_identifier(name: &str, role: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "invalid {role} identifier `{name}`: must match [A-Za-z_][A-Za-z0-9_]*"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("users"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("order_items2"));
        assert!(is_valid_identifier("A"));
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("user-name"));
        assert!(!is_valid_identifier("name with space"));
        assert!(!is_valid_identifier("naïve"));
    }

    #[test]
    fn test_injection_attempts_rejected() {
        assert!(!is_valid_identifier("users; DROP TABLE users;--"));
        assert!(!is_valid_identifier("name\"; --"));
        assert!(!is_valid_identifier("a'b"));
    }

    #[test]
    fn test_ensure_identifier_message() {
        let err = ensure_identifier("bad name", "table").unwrap_err();
        assert!(err.to_string().contains("invalid table identifier"));
    }
}
