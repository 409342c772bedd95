//! Data types for bulk-load operations.
//!
//! This module defines the dataset handed to the pipeline, validated SQL
//! identifiers, the target table reference and the ordered column type
//! mapping used for provisioning.

use std::fmt;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;

use crate::error::ConfigError;
use crate::type_map::NativeType;

/// Longest identifier Redshift accepts, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 127;

/// A schema, table or column name that is safe to interpolate into SQL.
///
/// Accepted names start with an ASCII letter or `_` and continue with ASCII
/// letters, digits, `_` or `$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validates `value` as an identifier of the given `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequired`] for an empty value and
    /// [`ConfigError::InvalidIdentifier`] for anything outside the safe set.
    pub fn parse(kind: &'static str, value: &str) -> Result<Self, ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::MissingRequired {
                option: kind.to_string(),
            });
        }

        let invalid = |reason| ConfigError::InvalidIdentifier {
            kind,
            value: value.to_string(),
            reason,
        };

        if value.len() > MAX_IDENTIFIER_LEN {
            return Err(invalid("longer than 127 bytes"));
        }

        let mut chars = value.chars();
        if let Some(first) = chars.next()
            && !(first.is_ascii_alphabetic() || first == '_')
        {
            return Err(invalid("must start with a letter or '_'"));
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            return Err(invalid("only letters, digits, '_' and '$' are allowed"));
        }

        Ok(Self(value.to_string()))
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified target table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    schema: Identifier,
    table: Identifier,
}

impl TableRef {
    /// Validates and pairs a schema and table name.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if either name is empty or unsafe.
    pub fn new(schema: &str, table: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            schema: Identifier::parse("schema", schema)?,
            table: Identifier::parse("table", table)?,
        })
    }

    /// Schema name
    #[must_use]
    pub fn schema(&self) -> &Identifier {
        &self.schema
    }

    /// Table name
    #[must_use]
    pub fn table(&self) -> &Identifier {
        &self.table
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Ordered mapping from column name to warehouse type declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTypes {
    columns: Vec<(String, String)>,
}

impl ColumnTypes {
    /// Create an empty mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, or replace the declaration of an existing one in place
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, declaration: impl Into<String>) -> Self {
        self.insert(column, declaration);
        self
    }

    /// Append a column, or replace the declaration of an existing one in place
    pub fn insert(&mut self, column: impl Into<String>, declaration: impl Into<String>) {
        let column = column.into();
        let declaration = declaration.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = declaration,
            None => self.columns.push((column, declaration)),
        }
    }

    /// Declaration for `column`, if present
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, declaration)| declaration.as_str())
    }

    /// Iterate over `(column, declaration)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(|(name, declaration)| (name.as_str(), declaration.as_str()))
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the mapping has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks every column name and type declaration before they reach SQL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] for an unsafe or repeated
    /// column name and [`ConfigError::InvalidTypeDeclaration`] for an unsafe
    /// declaration. Names are compared case-insensitively, as Redshift folds them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (position, (column, declaration)) in self.iter().enumerate() {
            Identifier::parse("column", column)?;
            if self.columns[..position]
                .iter()
                .any(|(earlier, _)| earlier.eq_ignore_ascii_case(column))
            {
                return Err(ConfigError::InvalidIdentifier {
                    kind: "column",
                    value: column.to_string(),
                    reason: "appears more than once",
                });
            }
            let safe = !declaration.trim().is_empty()
                && declaration
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '(' | ')' | ',' | '_'));
            if !safe {
                return Err(ConfigError::InvalidTypeDeclaration {
                    column: column.to_string(),
                    declaration: declaration.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for ColumnTypes
where
    K: Into<String>,
    V: Into<String>,
{
    /// Keeps every pair, repeated names included; [`ColumnTypes::validate`]
    /// rejects those.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(column, declaration)| (column.into(), declaration.into()))
                .collect(),
        }
    }
}

/// An immutable tabular dataset: one Arrow schema and its record batches.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Dataset {
    /// Creates a dataset, checking that every batch carries `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDataset`] if two columns share a name or
    /// a batch has different fields.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self, ConfigError> {
        let fields = schema.fields();
        for (position, field) in fields.iter().enumerate() {
            if fields[..position]
                .iter()
                .any(|earlier| earlier.name().eq_ignore_ascii_case(field.name()))
            {
                return Err(ConfigError::InvalidDataset {
                    message: format!("column '{}' appears more than once", field.name()),
                });
            }
        }
        if let Some(position) = batches
            .iter()
            .position(|batch| batch.schema().fields() != schema.fields())
        {
            return Err(ConfigError::InvalidDataset {
                message: format!("batch {position} does not match the dataset schema"),
            });
        }
        Ok(Self { schema, batches })
    }

    /// Creates a dataset from a single record batch.
    ///
    /// Column names are not checked here; table creation rejects repeated ones.
    #[must_use]
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
        }
    }

    /// Dataset schema
    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Record batches in row order
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Column names in order
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect()
    }

    /// Native type of every column, in order
    #[must_use]
    pub fn column_types(&self) -> Vec<(String, NativeType)> {
        self.schema
            .fields()
            .iter()
            .map(|field| (field.name().clone(), NativeType::from(field.data_type())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{ArrayRef, Int64Array, StringArray};
    use arrow_schema::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_identifier_accepts_safe_names() {
        for name in ["orders", "_staging", "Sales2024", "col$1"] {
            assert_eq!(Identifier::parse("table", name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_identifier_rejects_injection() {
        let err = Identifier::parse("table", "orders; DROP TABLE users").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidIdentifier { kind: "table", .. }
        ));

        assert!(Identifier::parse("column", "first name").is_err());
        assert!(Identifier::parse("column", "\"quoted\"").is_err());
        assert!(Identifier::parse("schema", "1st").is_err());
        assert!(Identifier::parse("schema", "público").is_err());
    }

    #[test]
    fn test_identifier_length_limit() {
        let longest = "a".repeat(MAX_IDENTIFIER_LEN);
        assert!(Identifier::parse("table", &longest).is_ok());
        assert!(Identifier::parse("table", &format!("{longest}a")).is_err());
    }

    #[test]
    fn test_table_ref_missing_names() {
        let err = TableRef::new("", "orders").unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref option } if option == "schema"));
        let err = TableRef::new("sales", "").unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref option } if option == "table"));
    }

    #[test]
    fn test_table_ref_display() {
        assert_eq!(TableRef::new("sales", "orders").unwrap().to_string(), "sales.orders");
    }

    #[test]
    fn test_column_types_preserve_order() {
        let types = ColumnTypes::new()
            .with("z", "INTEGER")
            .with("a", "BOOLEAN")
            .with("z", "BIGINT");

        let pairs: Vec<_> = types.iter().collect();
        assert_eq!(pairs, vec![("z", "BIGINT"), ("a", "BOOLEAN")]);
        assert_eq!(types.get("a"), Some("BOOLEAN"));
        assert_eq!(types.get("missing"), None);
    }

    #[test]
    fn test_column_types_validation() {
        let ok: ColumnTypes = [("id", "INTEGER"), ("price", "DECIMAL(10, 2)")]
            .into_iter()
            .collect();
        assert!(ok.validate().is_ok());

        let bad = ColumnTypes::new().with("id", "INTEGER); DROP TABLE users; --");
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidTypeDeclaration { .. })
        ));

        let bad = ColumnTypes::new().with("id", "  ");
        assert!(bad.validate().is_err());

        let bad = ColumnTypes::new().with("user id", "INTEGER");
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidIdentifier { kind: "column", .. })
        ));
    }

    #[test]
    fn test_column_types_collect_keeps_repeated_names() {
        let types: ColumnTypes = [("id", "INTEGER"), ("ID", "BIGINT")].into_iter().collect();
        assert_eq!(types.len(), 2);
        assert!(matches!(
            types.validate(),
            Err(ConfigError::InvalidIdentifier { kind: "column", ref value, .. }) if value == "ID"
        ));
    }

    #[test]
    fn test_dataset_rejects_repeated_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int64, false),
            Field::new("a", DataType::Utf8, true),
        ]));
        let err = Dataset::try_new(schema, vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDataset { ref message } if message.contains("'a'")));
    }

    #[test]
    fn test_dataset_rejects_foreign_batch() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
        let other = Arc::new(Schema::new(vec![Field::new("name", DataType::Utf8, false)]));
        let batch = RecordBatch::try_new(
            other,
            vec![Arc::new(StringArray::from(vec!["a"])) as ArrayRef],
        )
        .unwrap();

        let err = Dataset::try_new(schema, vec![batch]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDataset { .. }));
    }

    #[test]
    fn test_dataset_accessors() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
                Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
            ],
        )
        .unwrap();

        let dataset = Dataset::try_new(schema, vec![batch.clone(), batch]).unwrap();
        assert_eq!(dataset.num_rows(), 4);
        assert_eq!(dataset.column_names(), vec!["id", "name"]);
        assert_eq!(
            dataset.column_types(),
            vec![
                ("id".to_string(), NativeType::Int64),
                ("name".to_string(), NativeType::Object),
            ]
        );
    }
}
