//! Column descriptors.
//!
//! A [`ColumnSpec`] describes one column of the ideal schema: a
//! dialect-independent semantic type plus the options that should hold for
//! the column. Options left unset mean "no constraint asserted" and are
//! never compared against the live schema; an explicit value always is.

use serde::{Deserialize, Serialize};

/// Semantic column types.
///
/// These are dialect-independent tags; the dialect adapter maps them to
/// native SQL types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Auto-incrementing integer identity column.
    PrimaryKey,
    /// Variable-length string with an optional limit.
    String,
    /// Unbounded text.
    Text,
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Floating point.
    Float,
    /// Decimal with optional precision and scale.
    Decimal,
    /// Date and time.
    DateTime,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Boolean.
    Boolean,
    /// Binary blob.
    Binary,
}

impl ColumnType {
    /// Returns the lowercase tag used when comparing against introspected
    /// column metadata.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryKey => "primary_key",
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::Boolean => "boolean",
            Self::Binary => "binary",
        }
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    Text(String),
    /// SQL expression (e.g., "CURRENT_TIMESTAMP").
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL literal for this default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

/// Per-column options.
///
/// `None` means the option was not specified and asserts nothing about the
/// live column; it is distinct from an explicit `false` or `0`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnOptions {
    /// Whether the column allows NULL values.
    pub null: Option<bool>,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// Maximum length for string/binary types.
    pub limit: Option<u32>,
    /// Precision for decimal types.
    pub precision: Option<u8>,
    /// Scale for decimal types.
    pub scale: Option<u8>,
    /// Whether the column carries a UNIQUE constraint.
    pub unique: Option<bool>,
}

impl ColumnOptions {
    /// Returns true if no option is specified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.null.is_none()
            && self.default.is_none()
            && self.limit.is_none()
            && self.precision.is_none()
            && self.scale.is_none()
            && self.unique.is_none()
    }
}

/// Describes one column of the ideal schema.
///
/// Identity is the column name: two specs describe the same column exactly
/// when their names are equal, regardless of how the descriptor values were
/// constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name, unique within a schema model.
    pub name: String,
    /// Semantic type tag.
    pub column_type: ColumnType,
    /// Options to assert on the column.
    pub options: ColumnOptions,
}

impl ColumnSpec {
    /// Creates a new column spec with no options set.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            options: ColumnOptions::default(),
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.options.null = Some(false);
        self
    }

    /// Marks the column as explicitly nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.options.null = Some(true);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.options.default = Some(value);
        self
    }

    /// Sets the length limit.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Sets the decimal precision.
    #[must_use]
    pub fn precision(mut self, precision: u8) -> Self {
        self.options.precision = Some(precision);
        self
    }

    /// Sets the decimal scale.
    #[must_use]
    pub fn scale(mut self, scale: u8) -> Self {
        self.options.scale = Some(scale);
        self
    }

    /// Adds a UNIQUE constraint.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.options.unique = Some(true);
        self
    }
}
