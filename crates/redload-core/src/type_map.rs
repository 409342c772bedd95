//! Mapping from dataset column types to Redshift column declarations.
//!
//! Column types are first reduced to a [`NativeType`] tag, either from an
//! Arrow [`DataType`] or from a textual tag, and each tag resolves to a
//! fixed declaration. Anything the table does not know becomes
//! [`DEFAULT_TEXT_TYPE`], so mapping never fails.
//!
//! # Examples
//!
//! ```
//! use arrow_schema::DataType;
//! use redload_core::type_map::{NativeType, map_types};
//!
//! let types = map_types([
//!     ("id", NativeType::from(&DataType::Int64)),
//!     ("flags", NativeType::from("uint8")),
//! ]);
//! assert_eq!(types.get("id"), Some("BIGINT"));
//! assert_eq!(types.get("flags"), Some("VARCHAR(MAX)"));
//! ```

use arrow_schema::DataType;

use crate::types::{ColumnTypes, Dataset};

/// Declaration used for free-form text and for every unrecognized type.
pub const DEFAULT_TEXT_TYPE: &str = "VARCHAR(MAX)";

/// Semantic column type of a dataset column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeType {
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Boolean
    Bool,
    /// Timestamp without timezone
    Timestamp,
    /// Timestamp with timezone
    TimestampTz,
    /// Duration or calendar interval
    Interval,
    /// Free-form text
    Object,
    /// Categorical (dictionary encoded) text
    Category,
    /// Anything else, kept by name
    Other(String),
}

impl NativeType {
    /// Redshift declaration for this type.
    #[must_use]
    pub fn warehouse_type(&self) -> &'static str {
        match self {
            Self::Int32 => "INTEGER",
            Self::Int64 => "BIGINT",
            Self::Float32 => "REAL",
            Self::Float64 => "DOUBLE PRECISION",
            Self::Bool => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
            Self::TimestampTz => "TIMESTAMPTZ",
            Self::Interval => "INTERVAL",
            Self::Object | Self::Category | Self::Other(_) => DEFAULT_TEXT_TYPE,
        }
    }

    /// Canonical textual tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Timestamp => "datetime64[ns]",
            Self::TimestampTz => "datetime64[ns, UTC]",
            Self::Interval => "timedelta[ns]",
            Self::Object => "object",
            Self::Category => "category",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for NativeType {
    fn from(tag: &str) -> Self {
        match tag {
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "bool" => Self::Bool,
            "datetime64[ns]" => Self::Timestamp,
            "datetime64[ns, UTC]" => Self::TimestampTz,
            "timedelta[ns]" | "timedelta64[ns]" => Self::Interval,
            "object" => Self::Object,
            "category" => Self::Category,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&DataType> for NativeType {
    fn from(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int32 => Self::Int32,
            DataType::Int64 => Self::Int64,
            DataType::Float32 => Self::Float32,
            DataType::Float64 => Self::Float64,
            DataType::Boolean => Self::Bool,
            DataType::Timestamp(_, None) => Self::Timestamp,
            DataType::Timestamp(_, Some(_)) => Self::TimestampTz,
            DataType::Duration(_) | DataType::Interval(_) => Self::Interval,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Self::Object,
            DataType::Dictionary(_, value)
                if matches!(
                    value.as_ref(),
                    DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
                ) =>
            {
                Self::Category
            },
            other => Self::Other(other.to_string()),
        }
    }
}

/// Maps `(column, native type)` pairs to warehouse declarations, keeping order.
pub fn map_types<I, S>(columns: I) -> ColumnTypes
where
    I: IntoIterator<Item = (S, NativeType)>,
    S: Into<String>,
{
    columns
        .into_iter()
        .map(|(column, native)| (column.into(), native.warehouse_type()))
        .collect()
}

/// Infers the declarations for every column of `dataset`.
#[must_use]
pub fn infer_column_types(dataset: &Dataset) -> ColumnTypes {
    map_types(dataset.column_types())
}
