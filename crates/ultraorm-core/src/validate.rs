//! Field validation.
//!
//! Every descriptor owns an ordered rule list derived from its kind and
//! constraints. [`FieldDescriptor::validate`] runs the base nullability rule
//! first, then each kind rule in order, stopping at the first violation.
//! Composite kinds extend their parent's list: e-mail is the string rules
//! plus the mandatory e-mail pattern.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldKind};
use crate::value::Value;

/// Pattern required of every e-mail value: exactly one `@` with
/// non-whitespace on both sides and at least one `.` after the `@`.
pub const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Default max length applied to e-mail fields when none is configured.
pub const EMAIL_DEFAULT_MAX_LENGTH: u32 = 255;

/// One validation rule. Rules receive a present, non-null value; the
/// nullability check runs before any rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Value must be an integer (floats pass only with no fractional part).
    WholeNumber,
    /// Value must be numeric.
    Numeric,
    /// Value must be text.
    Textual,
    /// Value must be a boolean.
    TwoValued,
    /// Value must convert to a JSON representation.
    JsonRepresentable,
    /// Numeric lower bound (inclusive).
    Min(f64),
    /// Numeric upper bound (inclusive).
    Max(f64),
    /// Minimum text length in characters.
    MinLength(u32),
    /// Maximum text length in characters.
    MaxLength(u32),
    /// Text must match a configured regex pattern.
    Pattern(String),
    /// Text must match [`EMAIL_PATTERN`].
    Email,
}

impl Rule {
    /// Apply the rule, returning the violation message on failure.
    pub fn apply(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            Rule::WholeNumber => match value {
                Value::Int(_) => Ok(()),
                Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(()),
                other => Err(format!("must be a whole number, got {}", other.kind_name())),
            },
            Rule::Numeric => {
                if value.as_f64().is_some() {
                    Ok(())
                } else {
                    Err(format!("must be numeric, got {}", value.kind_name()))
                }
            }
            Rule::Textual => {
                if value.as_str().is_some() {
                    Ok(())
                } else {
                    Err(format!("must be textual, got {}", value.kind_name()))
                }
            }
            Rule::TwoValued => {
                if value.as_bool().is_some() {
                    Ok(())
                } else {
                    Err(format!("must be a boolean, got {}", value.kind_name()))
                }
            }
            Rule::JsonRepresentable => {
                if value.to_json().is_some() {
                    Ok(())
                } else {
                    Err("cannot be represented as JSON".to_string())
                }
            }
            Rule::Min(min) => match value.as_f64() {
                Some(n) if n < *min => Err(format!("must be at least {min}")),
                Some(_) => Ok(()),
                None => Err(format!("must be numeric, got {}", value.kind_name())),
            },
            Rule::Max(max) => match value.as_f64() {
                Some(n) if n > *max => Err(format!("must be at most {max}")),
                Some(_) => Ok(()),
                None => Err(format!("must be numeric, got {}", value.kind_name())),
            },
            Rule::MinLength(min) => match value.as_str() {
                Some(s) if s.chars().count() < *min as usize => {
                    Err(format!("must be at least {min} characters"))
                }
                Some(_) => Ok(()),
                None => Err(format!("must be textual, got {}", value.kind_name())),
            },
            Rule::MaxLength(max) => match value.as_str() {
                Some(s) if s.chars().count() > *max as usize => {
                    Err(format!("must be at most {max} characters"))
                }
                Some(_) => Ok(()),
                None => Err(format!("must be textual, got {}", value.kind_name())),
            },
            Rule::Pattern(pattern) => match value.as_str() {
                Some(s) if matches_pattern(s, pattern) => Ok(()),
                Some(_) => Err("does not match the required pattern".to_string()),
                None => Err(format!("must be textual, got {}", value.kind_name())),
            },
            Rule::Email => match value.as_str() {
                Some(s) if matches_pattern(s, EMAIL_PATTERN) => Ok(()),
                Some(_) => Err("is not a valid e-mail address".to_string()),
                None => Err(format!("must be textual, got {}", value.kind_name())),
            },
        }
    }
}

impl FieldDescriptor {
    /// Assemble the ordered rule list for this descriptor.
    ///
    /// Parent-kind rules come first, so a composite kind always enforces a
    /// strict superset of its parent's rules.
    #[must_use]
    pub fn rules(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        match self.kind {
            FieldKind::Integer | FieldKind::BigInteger | FieldKind::ForeignKey => {
                rules.push(Rule::WholeNumber);
                if let Some(min) = self.min {
                    rules.push(Rule::Min(min));
                }
                if let Some(max) = self.max {
                    rules.push(Rule::Max(max));
                }
            }
            FieldKind::Float => {
                rules.push(Rule::Numeric);
                if let Some(min) = self.min {
                    rules.push(Rule::Min(min));
                }
                if let Some(max) = self.max {
                    rules.push(Rule::Max(max));
                }
            }
            FieldKind::String => {
                rules.push(Rule::Textual);
                if let Some(min) = self.min_length {
                    rules.push(Rule::MinLength(min));
                }
                if let Some(max) = self.max_length {
                    rules.push(Rule::MaxLength(max));
                }
                if let Some(pattern) = &self.pattern {
                    rules.push(Rule::Pattern(pattern.clone()));
                }
            }
            FieldKind::Email => {
                rules.push(Rule::Textual);
                if let Some(min) = self.min_length {
                    rules.push(Rule::MinLength(min));
                }
                rules.push(Rule::MaxLength(
                    self.max_length.unwrap_or(EMAIL_DEFAULT_MAX_LENGTH),
                ));
                if let Some(pattern) = &self.pattern {
                    rules.push(Rule::Pattern(pattern.clone()));
                }
                rules.push(Rule::Email);
            }
            FieldKind::Boolean => rules.push(Rule::TwoValued),
            FieldKind::Json => rules.push(Rule::JsonRepresentable),
            FieldKind::DateTime => {}
        }
        rules
    }

    /// Validate a value against this descriptor.
    ///
    /// `None` and `Value::Null` both count as absent: they fail unless the
    /// field is nullable, and pass without running kind rules when it is.
    pub fn validate(&self, value: Option<&Value>) -> Result<()> {
        let value = match value {
            None | Some(Value::Null) => {
                if self.nullable {
                    return Ok(());
                }
                return Err(Error::validation(&self.name, "value is required"));
            }
            Some(v) => v,
        };
        for rule in self.rules() {
            if let Err(message) = rule.apply(value) {
                return Err(Error::validation(&self.name, message));
            }
        }
        Ok(())
    }
}

/// Thread-safe cache of compiled regex patterns.
///
/// Compilation happens once per distinct pattern; validation on the hot
/// save path only clones a pre-built `Regex`.
struct RegexCache {
    cache: std::sync::RwLock<std::collections::HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: std::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> std::result::Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap();
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)?;
        {
            let mut cache = self.cache.write().unwrap();
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Check if a string matches a regex pattern, compiling through the cache.
///
/// An invalid pattern logs a warning and counts as a non-match; definition
/// builders reject invalid patterns up front via [`pattern_error`].
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "invalid regex pattern in validation, treating as non-match"
            );
            false
        }
    }
}

/// Check that a pattern compiles, returning the error message if not.
#[must_use]
pub fn pattern_error(pattern: &str) -> Option<String> {
    match Regex::new(pattern) {
        Ok(_) => None,
        Err(e) => Some(format!("invalid regex pattern: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDescriptor;

    fn ok(field: &FieldDescriptor, value: impl Into<Value>) {
        let value = value.into();
        assert!(
            field.validate(Some(&value)).is_ok(),
            "expected {value:?} to pass `{}`",
            field.name
        );
    }

    fn fails(field: &FieldDescriptor, value: impl Into<Value>) {
        let value = value.into();
        assert!(
            field.validate(Some(&value)).is_err(),
            "expected {value:?} to fail `{}`",
            field.name
        );
    }

    #[test]
    fn test_base_rule_non_nullable() {
        let field = FieldDescriptor::string("name");
        assert!(field.validate(None).is_err());
        assert!(field.validate(Some(&Value::Null)).is_err());
    }

    #[test]
    fn test_base_rule_nullable() {
        let field = FieldDescriptor::string("nickname").nullable();
        assert!(field.validate(None).is_ok());
        assert!(field.validate(Some(&Value::Null)).is_ok());
    }

    #[test]
    fn test_integer_bounds() {
        let field = FieldDescriptor::integer("score").min(0.0).max(100.0);
        fails(&field, -1);
        ok(&field, 0);
        ok(&field, 100);
        fails(&field, 101);
        fails(&field, 1.5);
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        let field = FieldDescriptor::integer("n");
        ok(&field, 2.0);
        fails(&field, 2.5);
        fails(&field, "2");
    }

    #[test]
    fn test_email_field() {
        let field = FieldDescriptor::email("email");
        ok(&field, "a@b.co");
        fails(&field, "not-an-email");
        fails(&field, "a@@b.co");
        fails(&field, "a b@c.co");
        fails(&field, "a@b");
        let long = format!("a@b.co{}", "x".repeat(300));
        fails(&field, long);
    }

    #[test]
    fn test_email_max_length_override() {
        let field = FieldDescriptor::email("email").max_length(10);
        ok(&field, "a@b.co");
        fails(&field, "longer@mail.example");
    }

    #[test]
    fn test_string_rules() {
        let field = FieldDescriptor::string("code")
            .min_length(2)
            .max_length(4)
            .pattern("^[a-z]+$");
        ok(&field, "ab");
        ok(&field, "abcd");
        fails(&field, "a");
        fails(&field, "abcde");
        fails(&field, "AB");
        fails(&field, 12);
    }

    #[test]
    fn test_string_without_max_length_is_unbounded() {
        let field = FieldDescriptor::string("body");
        ok(&field, "x".repeat(10_000));
    }

    #[test]
    fn test_boolean_rule() {
        let field = FieldDescriptor::boolean("active");
        ok(&field, true);
        fails(&field, 1);
        fails(&field, "true");
    }

    #[test]
    fn test_json_rule() {
        let field = FieldDescriptor::json("payload");
        ok(&field, serde_json::json!({"a": [1, 2]}));
        ok(&field, "plain text is valid JSON content");
        fails(&field, f64::NAN);
    }

    #[test]
    fn test_float_rules() {
        let field = FieldDescriptor::float("ratio").min(0.0).max(1.0);
        ok(&field, 0.25);
        ok(&field, 1);
        fails(&field, 1.01);
        fails(&field, "0.5");
    }

    #[test]
    fn test_datetime_has_no_kind_rules() {
        let field = FieldDescriptor::datetime("at");
        assert!(field.rules().is_empty());
        ok(&field, chrono::Utc::now());
    }

    #[test]
    fn test_foreign_key_validates_as_integer() {
        let field = FieldDescriptor::foreign_key("author_id", "users");
        ok(&field, 3);
        fails(&field, 3.5);
        fails(&field, "3");
    }

    #[test]
    fn test_email_rules_are_superset_of_string_rules() {
        let string_rules = FieldDescriptor::string("s").min_length(1).rules();
        let email_rules = FieldDescriptor::email("s").min_length(1).rules();
        for rule in &string_rules {
            assert!(email_rules.contains(rule), "missing {rule:?}");
        }
        assert!(email_rules.len() > string_rules.len());
    }

    #[test]
    fn test_matches_pattern_caching() {
        let pattern = r"^test\d+$";
        assert!(matches_pattern("test123", pattern));
        assert!(matches_pattern("test456", pattern));
        assert!(!matches_pattern("nope", pattern));
    }

    #[test]
    fn test_invalid_pattern_is_non_match() {
        assert!(!matches_pattern("anything", r"[unclosed"));
    }

    #[test]
    fn test_pattern_error() {
        assert!(pattern_error(r"^[a-z]+$").is_none());
        assert!(pattern_error(r"[unclosed").is_some());
    }
}
