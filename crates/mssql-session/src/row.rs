//! Rows and column descriptions of a result set.
//!
//! A [`Row`] holds the decoded values of one row together with a shared
//! reference to the column descriptions of its result set, so rows of the
//! same result never duplicate metadata.
//!
//! Values are addressed by 0-based ordinal, or by column name when the
//! column has one. Expressions without an alias (`select 'test', 20`)
//! produce unnamed columns that are only reachable by ordinal.

use std::sync::Arc;

use mssql_types::{ApiType, FromSql, SqlValue, TypeError};
use tds_protocol::{RowKind, TypeId};

/// Description of one result column.
///
/// This struct is marked `#[non_exhaustive]`. Use [`Column::new()`] and the
/// builder methods to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Column {
    /// Column name; empty for unnamed expressions.
    pub name: String,
    /// Column ordinal (0-based).
    pub ordinal: usize,
    /// Wire type code.
    pub type_code: u8,
    /// DB-API category of the wire type.
    pub api_type: ApiType,
    /// Declared precision for numeric types.
    pub precision: u8,
    /// Declared scale for numeric types.
    pub scale: u8,
}

impl Column {
    /// Create a column description.
    pub fn new(name: impl Into<String>, ordinal: usize, type_code: u8) -> Self {
        Self {
            name: name.into(),
            ordinal,
            type_code,
            api_type: ApiType::from_type_code(type_code),
            precision: 0,
            scale: 0,
        }
    }

    /// Set precision and scale for numeric types.
    #[must_use]
    pub fn with_precision_scale(mut self, precision: u8, scale: u8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// The wire type, if the code is a known one.
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        TypeId::from_u8(self.type_code)
    }

    /// Check if the column has a name.
    #[must_use]
    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

/// One row of a result set.
#[derive(Clone, PartialEq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<SqlValue>,
    kind: RowKind,
}

impl Row {
    /// Create a row from its column descriptions and decoded values.
    pub fn new(columns: Arc<[Column]>, values: Vec<SqlValue>) -> Self {
        Self {
            columns,
            values,
            kind: RowKind::Regular,
        }
    }

    /// Mark the row as a compute row.
    #[must_use]
    pub fn with_kind(mut self, kind: RowKind) -> Self {
        self.kind = kind;
        self
    }

    // ========================================================================
    // Type-Converting Access (FromSql trait)
    // ========================================================================

    /// Get a value by ordinal with type conversion.
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T, TypeError> {
        self.values
            .get(index)
            .ok_or_else(|| TypeError::TypeMismatch {
                expected: "valid column index",
                actual: format!("index {index} out of bounds"),
            })
            .and_then(T::from_sql)
    }

    /// Get a value by column name with type conversion.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T, TypeError> {
        let index = self.find(name).ok_or_else(|| TypeError::TypeMismatch {
            expected: "valid column name",
            actual: format!("column '{name}' not found"),
        })?;
        self.get(index)
    }

    /// Try to get a value by ordinal, returning None if NULL, missing or
    /// not convertible.
    pub fn try_get<T: FromSql>(&self, index: usize) -> Option<T> {
        self.values
            .get(index)
            .and_then(|v| T::from_sql_nullable(v).ok().flatten())
    }

    /// Try to get a value by column name, returning None if NULL, missing or
    /// not convertible.
    pub fn try_get_by_name<T: FromSql>(&self, name: &str) -> Option<T> {
        self.try_get(self.find(name)?)
    }

    // ========================================================================
    // Raw Value Access
    // ========================================================================

    /// Get the decoded value by ordinal.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Get the decoded value by column name.
    #[must_use]
    pub fn value_by_name(&self, name: &str) -> Option<&SqlValue> {
        self.find(name).and_then(|i| self.values.get(i))
    }

    /// All values in column order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Take the values out of the row.
    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    /// Name/value pairs of the named columns, in column order.
    pub fn named_values(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .zip(&self.values)
            .filter(|(column, _)| column.is_named())
            .map(|(column, value)| (column.name.as_str(), value))
    }

    // ========================================================================
    // Metadata Access
    // ========================================================================

    /// Get the number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the column descriptions.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Whether this is a regular or a compute row.
    #[must_use]
    pub fn kind(&self) -> RowKind {
        self.kind
    }

    /// Check if a column value is NULL. Missing columns count as NULL.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.values.get(index).is_none_or(SqlValue::is_null)
    }

    // Later columns shadow earlier ones with the same name.
    fn find(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.columns.iter().rposition(|c| c.name == name)
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("columns", &self.columns.len())
            .field("values", &self.values)
            .field("kind", &self.kind)
            .finish()
    }
}

impl std::ops::Index<usize> for Row {
    type Output = SqlValue;

    fn index(&self, index: usize) -> &SqlValue {
        &self.values[index]
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a SqlValue;
    type IntoIter = std::slice::Iter<'a, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tds_protocol::codes::{SYBINT4, SYBMONEY, SYBVARCHAR};

    fn row(names: &[&str], values: Vec<SqlValue>) -> Row {
        let columns: Arc<[Column]> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Column::new(*name, i, SYBINT4))
            .collect();
        Row::new(columns, values)
    }

    #[test]
    fn test_column_classification() {
        assert_eq!(Column::new("a", 0, SYBVARCHAR).api_type, ApiType::String);
        assert_eq!(Column::new("m", 1, SYBMONEY).api_type, ApiType::Decimal);
        assert_eq!(Column::new("x", 2, 0x01).api_type, ApiType::Binary);
        assert!(Column::new("x", 2, 0x01).type_id().is_none());
    }

    #[test]
    fn test_access_by_ordinal_and_name() {
        let row = row(
            &["", "n"],
            vec![SqlValue::String("test".into()), SqlValue::Int(20)],
        );

        assert_eq!(row.get::<String>(0).unwrap(), "test");
        assert_eq!(row.get::<i32>(1).unwrap(), 20);
        assert_eq!(row.get_by_name::<i32>("n").unwrap(), 20);
        assert_eq!(row[1], SqlValue::Int(20));
        assert!(row.value_by_name("").is_none());
        assert!(row.get_by_name::<i32>("missing").is_err());
        assert!(row.get::<i32>(2).is_err());
    }

    #[test]
    fn test_named_values_skip_unnamed() {
        let row = row(
            &["", "id", ""],
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)],
        );
        let named: Vec<_> = row.named_values().collect();
        assert_eq!(named, vec![("id", &SqlValue::Int(2))]);
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let row = row(&["v", "v"], vec![SqlValue::Int(1), SqlValue::Int(2)]);
        assert_eq!(row.get_by_name::<i32>("v").unwrap(), 2);
    }

    #[test]
    fn test_try_get_null() {
        let row = row(&["a", "b"], vec![SqlValue::Null, SqlValue::Int(7)]);
        assert_eq!(row.try_get::<i32>(0), None);
        assert_eq!(row.try_get::<i32>(1), Some(7));
        assert!(row.is_null(0));
        assert!(row.is_null(5));
        assert!(matches!(row.get::<i32>(0), Err(TypeError::UnexpectedNull)));
    }

    #[test]
    fn test_iteration() {
        let row = row(&["a", "b"], vec![SqlValue::Int(1), SqlValue::Int(2)]);
        let collected: Vec<_> = (&row).into_iter().cloned().collect();
        assert_eq!(collected, vec![SqlValue::Int(1), SqlValue::Int(2)]);
        assert_eq!(row.kind(), RowKind::Regular);
        assert_eq!(row.with_kind(RowKind::Compute(1)).kind(), RowKind::Compute(1));
    }
}
