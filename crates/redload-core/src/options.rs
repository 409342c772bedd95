//! Load options and insert flags.
//!
//! [`LoadOptions`] are the COPY clauses appended verbatim after the `FROM`
//! line. The defaults describe the payload written by the object stager; a
//! caller that wants different parsing passes a replacement list.

use redload_csv::CsvWriterOptions;

use crate::error::ConfigError;
use crate::types::ColumnTypes;

/// COPY clauses matching the staged CSV payload.
pub const DEFAULT_COPY_OPTIONS: [&str; 7] = [
    "IGNOREHEADER 1",
    "FORMAT AS CSV",
    "DELIMITER ','",
    "EMPTYASNULL",
    "ACCEPTANYDATE",
    "DATEFORMAT 'auto'",
    "TIMEFORMAT 'auto'",
];

/// Ordered list of opaque COPY clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    clauses: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new(DEFAULT_COPY_OPTIONS)
    }
}

impl LoadOptions {
    /// Replaces the default clauses with `clauses`.
    pub fn new<I, S>(clauses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clauses: clauses.into_iter().map(Into::into).collect(),
        }
    }

    /// The default clauses adjusted to the header, delimiter and null marker
    /// of `dialect`.
    ///
    /// `LoadOptions::for_csv(&CsvWriterOptions::default())` equals the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] for a delimiter that is not a
    /// tab or printable ASCII, a quote or backslash delimiter, and a null
    /// marker containing quotes or control characters or ending in a backslash.
    pub fn for_csv(dialect: &CsvWriterOptions) -> Result<Self, ConfigError> {
        let delimiter = match dialect.delimiter() {
            b'\t' => "\\t".to_string(),
            b'\'' | b'"' | b'\\' => return Err(invalid_delimiter(dialect.delimiter())),
            byte if byte.is_ascii_graphic() => char::from(byte).to_string(),
            byte => return Err(invalid_delimiter(byte)),
        };

        let null_value = dialect.null_value();
        if null_value.contains(|c: char| c == '\'' || c.is_control()) || null_value.ends_with('\\')
        {
            return Err(ConfigError::InvalidIdentifier {
                kind: "null marker",
                value: null_value.to_string(),
                reason: "must not contain quotes or control characters or end in a backslash",
            });
        }

        let clauses = DEFAULT_COPY_OPTIONS.iter().filter_map(|clause| match *clause {
            "IGNOREHEADER 1" => dialect.has_header().then(|| clause.to_string()),
            "DELIMITER ','" => Some(format!("DELIMITER '{delimiter}'")),
            "EMPTYASNULL" if !null_value.is_empty() => Some(format!("NULL AS '{null_value}'")),
            other => Some(other.to_string()),
        });
        Ok(Self::new(clauses))
    }

    /// No clauses at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Appends a clause.
    #[must_use]
    pub fn with_clause(mut self, clause: impl Into<String>) -> Self {
        self.clauses.push(clause.into());
        self
    }

    /// Clauses in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().map(String::as_str)
    }

    /// Whether there are no clauses
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

fn invalid_delimiter(byte: u8) -> ConfigError {
    ConfigError::InvalidIdentifier {
        kind: "csv delimiter",
        value: char::from(byte).escape_default().to_string(),
        reason: "must be a tab or printable ASCII other than quotes and backslash",
    }
}

/// Flags controlling [`crate::loader::insert`].
#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    /// Truncate the target table before loading (default: false)
    pub truncate: bool,
    /// Create the target table when it does not exist (default: false)
    pub ensure_exists: bool,
    /// Explicit declarations for table creation; inferred when `None`
    pub column_types: Option<ColumnTypes>,
    /// COPY clauses (default: [`DEFAULT_COPY_OPTIONS`])
    pub load_options: LoadOptions,
    /// Delete the staged object when COPY fails (default: false)
    pub cleanup_on_failure: bool,
}

impl InsertOptions {
    /// Create new insert options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to truncate before loading
    #[must_use]
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Set whether to create a missing table
    #[must_use]
    pub fn with_ensure_exists(mut self, ensure_exists: bool) -> Self {
        self.ensure_exists = ensure_exists;
        self
    }

    /// Set explicit column declarations
    #[must_use]
    pub fn with_column_types(mut self, column_types: ColumnTypes) -> Self {
        self.column_types = Some(column_types);
        self
    }

    /// Set COPY clauses
    #[must_use]
    pub fn with_load_options(mut self, load_options: LoadOptions) -> Self {
        self.load_options = load_options;
        self
    }

    /// Set whether to delete the staged object after a failed COPY
    #[must_use]
    pub fn with_cleanup_on_failure(mut self, cleanup_on_failure: bool) -> Self {
        self.cleanup_on_failure = cleanup_on_failure;
        self
    }
}
