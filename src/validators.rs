//! Field-level validation rules.
//!
//! A [`Rule`] is a declarative constraint bound to an attribute in a
//! [`Schema`](crate::schema::Schema). Rules are plain data so that the schema
//! stays serializable and each rule can be checked in isolation.
//!
//! # Example
//!
//! ```
//! use ces_provider::validators::Rule;
//! use serde_json::json;
//!
//! let count = Rule::int_range(1, 5);
//! assert!(count.check("condition.0.count", &json!(3)).is_empty());
//! assert_eq!(
//!     count.check("condition.0.count", &json!(6)),
//!     vec!["condition.0.count must be in range [1, 5]".to_string()]
//! );
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Compiled patterns, keyed by source. Failed compilations are cached too.
static PATTERNS: OnceLock<Mutex<HashMap<String, Result<Regex, regex::Error>>>> = OnceLock::new();

fn compiled(pattern: &str) -> Result<Regex, regex::Error> {
    let mut cache = PATTERNS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    cache
        .entry(pattern.to_string())
        .or_insert_with(|| Regex::new(pattern))
        .clone()
}

/// Integer view of a number, including floats without a fractional part.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// A single constraint on an attribute value.
///
/// [`Rule::check`] only inspects values of the JSON type the rule applies to.
/// Values of any other type pass, since type mismatches are reported by the
/// schema walker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    /// String must match a regular expression.
    Pattern {
        /// The regular expression, anchored by the author.
        pattern: String,
        /// Constraint description appended to the key on failure.
        message: String,
    },
    /// String must be one of a fixed set.
    OneOf {
        /// Accepted values.
        values: Vec<String>,
    },
    /// Integer must be one of a fixed set.
    OneOfInt {
        /// Accepted values.
        values: Vec<i64>,
    },
    /// Integer must lie in an inclusive range. Missing bounds are open.
    IntRange {
        /// Inclusive lower bound.
        min: Option<i64>,
        /// Inclusive upper bound.
        max: Option<i64>,
    },
    /// String length in characters must not exceed `max`.
    MaxLength {
        /// Maximum number of characters.
        max: usize,
    },
    /// List must not hold more than `max` items.
    MaxItems {
        /// Maximum number of items.
        max: usize,
    },
}

impl Rule {
    /// Create a pattern rule.
    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a string enumeration rule.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an integer enumeration rule.
    pub fn one_of_int(values: impl IntoIterator<Item = i64>) -> Self {
        Self::OneOfInt {
            values: values.into_iter().collect(),
        }
    }

    /// Create an inclusive integer range rule.
    pub fn int_range(min: i64, max: i64) -> Self {
        Self::IntRange {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Create an integer lower-bound rule.
    pub fn int_at_least(min: i64) -> Self {
        Self::IntRange {
            min: Some(min),
            max: None,
        }
    }

    /// Create a maximum string length rule.
    pub fn max_length(max: usize) -> Self {
        Self::MaxLength { max }
    }

    /// Create a maximum list size rule.
    pub fn max_items(max: usize) -> Self {
        Self::MaxItems { max }
    }

    /// Check `value`, reporting failures against `key`.
    ///
    /// Returns an empty list when the value satisfies the rule.
    pub fn check(&self, key: &str, value: &Value) -> Vec<String> {
        match self {
            Self::Pattern { pattern, message } => {
                let Some(s) = value.as_str() else {
                    return vec![];
                };
                match compiled(pattern) {
                    Ok(re) if re.is_match(s) => vec![],
                    Ok(_) => vec![format!("{} {}", key, message)],
                    Err(err) => vec![format!("{} has an invalid pattern {}: {}", key, pattern, err)],
                }
            },
            Self::OneOf { values } => match value.as_str() {
                Some(s) if !values.iter().any(|v| v == s) => {
                    vec![format!("{} can be {}", key, values.join(", "))]
                },
                _ => vec![],
            },
            Self::OneOfInt { values } => match as_integer(value) {
                Some(n) if !values.contains(&n) => {
                    let listed: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                    vec![format!("{} can be {}", key, listed.join(", "))]
                },
                _ => vec![],
            },
            Self::IntRange { min, max } => {
                let Some(n) = as_integer(value) else {
                    return vec![];
                };
                let below = min.is_some_and(|min| n < min);
                let above = max.is_some_and(|max| n > max);
                if !below && !above {
                    return vec![];
                }
                match (min, max) {
                    (Some(min), Some(max)) => {
                        vec![format!("{} must be in range [{}, {}]", key, min, max)]
                    },
                    (Some(min), None) => {
                        vec![format!("{} must be greater than or equal to {}", key, min)]
                    },
                    (None, Some(max)) => {
                        vec![format!("{} must be less than or equal to {}", key, max)]
                    },
                    (None, None) => vec![],
                }
            },
            Self::MaxLength { max } => match value.as_str() {
                Some(s) if s.chars().count() > *max => {
                    vec![format!("The length of {} must be in [0, {}]", key, max)]
                },
                _ => vec![],
            },
            Self::MaxItems { max } => match value.as_array() {
                Some(items) if items.len() > *max => vec![format!(
                    "{} allows at most {} item(s), got {}",
                    key,
                    max,
                    items.len()
                )],
                _ => vec![],
            },
        }
    }

    /// Whether `value` satisfies the rule.
    pub fn is_satisfied_by(&self, value: &Value) -> bool {
        self.check("value", value).is_empty()
    }
}
