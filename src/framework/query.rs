//! # Filter Query Language
//!
//! A search is a flat conjunction of `key,operator,value` terms, e.g.
//! `?q=name,EQ,Alice&q=created,GE,2024-01-31_09:30`.
//!
//! - **Keys** are matched case-insensitively against a resource's [`Field`] schema.
//! - **Operators** are `EQ`, `NE`, `LT`, `GT`, `LE`, `GE` (any case).
//! - **Values** are strings; timestamp fields take [`TIME_FORMAT`] (`YYYY-MM-DD_hh:mm`, UTC).
//!
//! Nothing here talks to the store. The repository turns validated predicates into
//! [`StoreFilter`](crate::store::StoreFilter)s using [`Operator::token`].

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use super::error::{ResourceError, Violations};
use super::resource::{find_field, Field, FieldKind};
use crate::store::ops;

/// `chrono` format for timestamp filter values.
pub const TIME_FORMAT: &str = "%Y-%m-%d_%H:%M";

/// Relational operators accepted in filter terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Gt,
        Operator::Le,
        Operator::Ge,
    ];

    /// Case-insensitive parse of `EQ`, `ne`, `Lt`, ...
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "EQ",
            Operator::Ne => "NE",
            Operator::Lt => "LT",
            Operator::Gt => "GT",
            Operator::Le => "LE",
            Operator::Ge => "GE",
        }
    }

    /// The store's native comparison token.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Eq => ops::EQ,
            Operator::Ne => ops::NE,
            Operator::Lt => ops::LT,
            Operator::Gt => ops::GT,
            Operator::Le => ops::LE,
            Operator::Ge => ops::GE,
        }
    }
}

/// Native token for a raw operator string, or [`ops::UNKNOWN`] for anything else.
pub fn native_token(raw: &str) -> &'static str {
    Operator::parse(raw).map_or(ops::UNKNOWN, Operator::token)
}

/// Parses a timestamp filter value (UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// One query term: `(key, operator, value)`.
///
/// Key and operator are kept as written; validation decides whether they name
/// something real.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicate {
    pub key: String,
    pub operator: String,
    pub value: Value,
}

impl FilterPredicate {
    pub fn new(key: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Parses a `key,operator,value` term. Anything but exactly three parts is rejected.
    pub fn parse_term(term: &str) -> Result<Self, ResourceError> {
        let parts: Vec<&str> = term.split(',').collect();
        match parts.as_slice() {
            [key, operator, value] => Ok(Self::new(*key, *operator, *value)),
            _ => {
                let mut v = Violations::new();
                v.push(format!("{}: must be q=(key),(operator),(value)", term));
                Err(ResourceError::InvalidQuery(v))
            }
        }
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.key, self.operator, display_value(&self.value))
    }
}

/// Renders a filter value without JSON quoting.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses every `q` term of a search request.
pub fn parse_terms<'a>(terms: impl IntoIterator<Item = &'a str>) -> Result<Vec<FilterPredicate>, ResourceError> {
    terms.into_iter().map(FilterPredicate::parse_term).collect()
}

/// Validates every predicate against `fields`, collecting all violations.
///
/// Key, operator and value are checked independently. An unknown key skips the
/// value check since the expected type is unknown.
pub fn validate(fields: &[Field], predicates: &[FilterPredicate]) -> Result<(), Violations> {
    let mut violations = Violations::new();

    for p in predicates {
        let field = find_field(fields, &p.key);
        if field.is_none() {
            violations.push(format!("key[{}]: invalid", p.key));
        }

        if Operator::parse(&p.operator).is_none() {
            violations.push(format!("operator[{}]: invalid", p.operator));
        }

        if let Some(field) = field {
            match (field.kind, p.value.as_str()) {
                (FieldKind::String, Some(_)) => {}
                (FieldKind::Timestamp, Some(raw)) if parse_timestamp(raw).is_some() => {}
                (FieldKind::Timestamp, Some(raw)) => {
                    violations.push(format!("value[{}]: time must be YYYY-MM-DD_hh:mm", raw))
                }
                (_, None) => violations.push(format!("value[{}]: invalid", display_value(&p.value))),
            }
        }
    }

    violations.into_result()
}
