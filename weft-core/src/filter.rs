//! Filters applied to navigation queries.
//!
//! A [`Filter`] is evaluated by the batch fetcher against child rows. The
//! in-memory store evaluates it with [`Filter::matches`]; database-backed
//! fetchers translate it into their own predicate language.

use std::cmp::Ordering;

use smol_str::SmolStr;

use crate::fetch::EntityRow;
use crate::value::Value;

/// A filter over the scalar attributes of a row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison.
    Equals(SmolStr, Value),
    /// Not equals comparison.
    NotEquals(SmolStr, Value),

    /// Less than comparison.
    Lt(SmolStr, Value),
    /// Less than or equal comparison.
    Lte(SmolStr, Value),
    /// Greater than comparison.
    Gt(SmolStr, Value),
    /// Greater than or equal comparison.
    Gte(SmolStr, Value),

    /// In a list of values.
    In(SmolStr, Vec<Value>),
    /// Not in a list of values.
    NotIn(SmolStr, Vec<Value>),

    /// String contains.
    Contains(SmolStr, String),
    /// String starts with.
    StartsWith(SmolStr, String),
    /// String ends with.
    EndsWith(SmolStr, String),

    /// Is null (or missing) check.
    IsNull(SmolStr),
    /// Is not null check.
    IsNotNull(SmolStr),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Equality on a column.
    pub fn equals(column: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        Self::Equals(column.into(), value.into())
    }

    /// Greater-than on a column.
    pub fn gt(column: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        Self::Gt(column.into(), value.into())
    }

    /// Less-than on a column.
    pub fn lt(column: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        Self::Lt(column.into(), value.into())
    }

    /// Substring match on a string column.
    pub fn contains(column: impl Into<SmolStr>, needle: impl Into<String>) -> Self {
        Self::Contains(column.into(), needle.into())
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        Self::and([self, other])
    }

    /// Evaluate the filter against a row's attributes.
    ///
    /// Missing attributes behave like nulls. Comparisons between values of
    /// incompatible types are false.
    pub fn matches(&self, row: &EntityRow) -> bool {
        let attr = |column: &SmolStr| row.attributes.get(column).unwrap_or(&Value::Null);

        match self {
            Self::None => true,
            Self::Equals(c, v) => attr(c).compare(v) == Some(Ordering::Equal),
            Self::NotEquals(c, v) => {
                let a = attr(c);
                !a.is_null() && a.compare(v) != Some(Ordering::Equal)
            }
            Self::Lt(c, v) => attr(c).compare(v) == Some(Ordering::Less),
            Self::Lte(c, v) => matches!(attr(c).compare(v), Some(Ordering::Less | Ordering::Equal)),
            Self::Gt(c, v) => attr(c).compare(v) == Some(Ordering::Greater),
            Self::Gte(c, v) => matches!(attr(c).compare(v), Some(Ordering::Greater | Ordering::Equal)),
            Self::In(c, values) => {
                let a = attr(c);
                values.iter().any(|v| a.compare(v) == Some(Ordering::Equal))
            }
            Self::NotIn(c, values) => {
                let a = attr(c);
                !a.is_null() && values.iter().all(|v| a.compare(v) != Some(Ordering::Equal))
            }
            Self::Contains(c, s) => attr(c).as_str().is_some_and(|a| a.contains(s.as_str())),
            Self::StartsWith(c, s) => attr(c).as_str().is_some_and(|a| a.starts_with(s.as_str())),
            Self::EndsWith(c, s) => attr(c).as_str().is_some_and(|a| a.ends_with(s.as_str())),
            Self::IsNull(c) => attr(c).is_null(),
            Self::IsNotNull(c) => !attr(c).is_null(),
            Self::And(filters) => filters.iter().all(|f| f.matches(row)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(row)),
            Self::Not(filter) => !filter.matches(row),
        }
    }
}
