//! Conditions over a single request facet.
//!
//! A condition is anything that can test a value and describe itself for
//! diagnostics. Closures are conditions (described as `satisfies <closure>`);
//! the string conditions below and [`described`] carry a readable label.

use crate::error::Result;
use hyper::Uri;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

pub trait Condition<T: ?Sized>: Send + Sync + 'static {
    fn check(&self, value: &T) -> bool;

    fn describe(&self) -> String {
        "satisfies <closure>".to_string()
    }
}

impl<T, F> Condition<T> for F
where
    T: ?Sized,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn check(&self, value: &T) -> bool {
        self(value)
    }
}

/// String comparison with a printable form.
#[derive(Debug, Clone)]
pub enum StringCondition {
    Equals(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Matches(Arc<Regex>),
}

impl StringCondition {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            StringCondition::Equals(expected) => value == expected,
            StringCondition::Contains(needle) => value.contains(needle.as_str()),
            StringCondition::StartsWith(prefix) => value.starts_with(prefix.as_str()),
            StringCondition::EndsWith(suffix) => value.ends_with(suffix.as_str()),
            StringCondition::Matches(regex) => regex.is_match(value),
        }
    }
}

impl fmt::Display for StringCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringCondition::Equals(v) => write!(f, "== {v:?}"),
            StringCondition::Contains(v) => write!(f, "contains {v:?}"),
            StringCondition::StartsWith(v) => write!(f, "starts-with {v:?}"),
            StringCondition::EndsWith(v) => write!(f, "ends-with {v:?}"),
            StringCondition::Matches(regex) => write!(f, "matches /{}/", regex.as_str()),
        }
    }
}

impl Condition<str> for StringCondition {
    fn check(&self, value: &str) -> bool {
        self.matches(value)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl Condition<String> for StringCondition {
    fn check(&self, value: &String) -> bool {
        self.matches(value)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// URIs are compared in their printed form, e.g. `http://127.0.0.1:4000/orders?page=2`.
impl Condition<Uri> for StringCondition {
    fn check(&self, value: &Uri) -> bool {
        self.matches(&value.to_string())
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// A closure with an explicit label.
pub struct Described<F> {
    label: String,
    condition: F,
}

impl<T, F> Condition<T> for Described<F>
where
    T: ?Sized,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn check(&self, value: &T) -> bool {
        (self.condition)(value)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

pub fn equals(expected: impl Into<String>) -> StringCondition {
    StringCondition::Equals(expected.into())
}

pub fn contains(needle: impl Into<String>) -> StringCondition {
    StringCondition::Contains(needle.into())
}

pub fn starts_with(prefix: impl Into<String>) -> StringCondition {
    StringCondition::StartsWith(prefix.into())
}

pub fn ends_with(suffix: impl Into<String>) -> StringCondition {
    StringCondition::EndsWith(suffix.into())
}

pub fn matches_regex(pattern: &str) -> Result<StringCondition> {
    Ok(StringCondition::Matches(Arc::new(Regex::new(pattern)?)))
}

/// Label a closure so unmet-expectation reports say what it checks.
pub fn described<F>(label: impl Into<String>, condition: F) -> Described<F> {
    Described {
        label: label.into(),
        condition,
    }
}
