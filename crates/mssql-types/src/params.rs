//! Statement parameters.
//!
//! A statement template takes either a single scalar, a positional sequence
//! (`%s`/`%d` placeholders) or a named mapping (`%(key)s` placeholders). Each
//! positional or named slot may hold a list, which renders as a
//! parenthesized literal list for `IN (...)` clauses.

use std::collections::HashMap;

use crate::value::SqlValue;

/// One parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A single value.
    Scalar(SqlValue),
    /// A list of values, rendered as `(v1,v2,...)`.
    List(Vec<SqlValue>),
}

impl Param {
    /// Create a scalar slot.
    pub fn scalar(value: impl Into<SqlValue>) -> Self {
        Self::Scalar(value.into())
    }

    /// Create a list slot.
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<SqlValue> for Param {
    fn from(value: SqlValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<SqlValue>> for Param {
    fn from(values: Vec<SqlValue>) -> Self {
        Self::List(values)
    }
}

/// Parameters for one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// A single value for a template with one positional placeholder.
    Scalar(SqlValue),
    /// Values for `%s`/`%d` placeholders, in order.
    Positional(Vec<Param>),
    /// Values for `%(key)s` placeholders.
    Named(HashMap<String, Param>),
}

impl Params {
    /// Create scalar parameters.
    pub fn scalar(value: impl Into<SqlValue>) -> Self {
        Self::Scalar(value.into())
    }

    /// Create positional parameters.
    pub fn positional<I, P>(params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        Self::Positional(params.into_iter().map(Into::into).collect())
    }

    /// Create named parameters.
    pub fn named<I, K, P>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<Param>,
    {
        Self::Named(
            params
                .into_iter()
                .map(|(key, param)| (key.into(), param.into()))
                .collect(),
        )
    }

    /// Check if there is nothing to substitute.
    ///
    /// Empty parameters leave the template untouched, so a literal `%` in
    /// SQL run without parameters needs no escaping.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(_) => false,
            Self::Positional(params) => params.is_empty(),
            Self::Named(params) => params.is_empty(),
        }
    }
}

impl From<SqlValue> for Params {
    fn from(value: SqlValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<Param>> for Params {
    fn from(params: Vec<Param>) -> Self {
        Self::Positional(params)
    }
}

impl From<HashMap<String, Param>> for Params {
    fn from(params: HashMap<String, Param>) -> Self {
        Self::Named(params)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let params = Params::positional([Param::scalar(1), Param::list([1, 2, 3])]);
        match params {
            Params::Positional(slots) => {
                assert_eq!(slots[0], Param::Scalar(SqlValue::Int(1)));
                assert_eq!(
                    slots[1],
                    Param::List(vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)])
                );
            }
            other => panic!("unexpected {other:?}"),
        }

        let params = Params::named([("name", Param::scalar("x"))]);
        assert!(matches!(params, Params::Named(ref map) if map.contains_key("name")));
    }

    #[test]
    fn test_is_empty() {
        assert!(Params::positional(Vec::<Param>::new()).is_empty());
        assert!(Params::named(Vec::<(String, Param)>::new()).is_empty());
        assert!(!Params::scalar(SqlValue::Null).is_empty());
    }
}
