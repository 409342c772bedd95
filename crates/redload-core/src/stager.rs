//! Object stager: writes a dataset to object storage for the warehouse to read.
//!
//! A staged object is the whole dataset serialized as CSV in memory and
//! uploaded with a single `put`, so the warehouse never sees a partial
//! payload. Keys carry a random suffix, which keeps concurrent loads of the
//! same table apart.

use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use redload_csv::{CsvWriterOptions, write_csv_to_bytes};
use uuid::Uuid;

use crate::error::{ConfigError, StorageError};
use crate::types::Dataset;

/// Bucket identity and optional key prefix for staged objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    bucket: String,
    root: Option<String>,
}

impl StorageConfig {
    /// Creates a configuration for `bucket` with no key prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequired`] if `bucket` is empty and
    /// [`ConfigError::InvalidIdentifier`] if it is not a plain bucket name.
    pub fn new(bucket: impl Into<String>) -> Result<Self, ConfigError> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(ConfigError::MissingRequired {
                option: "bucket".to_string(),
            });
        }
        if !bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(ConfigError::InvalidIdentifier {
                kind: "bucket",
                value: bucket,
                reason: "only letters, digits, '.', '-' and '_' are allowed",
            });
        }
        Ok(Self { bucket, root: None })
    }

    /// Puts every staged key under `root`. Surrounding slashes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidIdentifier`] if `root` contains quotes,
    /// backslashes or control characters, or is not a valid object path
    /// (empty segments, `.` or `..`).
    pub fn with_root(mut self, root: impl Into<String>) -> Result<Self, ConfigError> {
        let root = root.into();
        if root
            .chars()
            .any(|c| c == '\'' || c == '\\' || c.is_control())
        {
            return Err(ConfigError::InvalidIdentifier {
                kind: "key prefix",
                value: root,
                reason: "quotes, backslashes and control characters are not allowed",
            });
        }
        let trimmed = root.trim_matches('/');
        if !trimmed.is_empty() && Path::parse(trimmed).is_err() {
            return Err(ConfigError::InvalidIdentifier {
                kind: "key prefix",
                value: root,
                reason: "must be '/'-separated segments without '.', '..' or empty parts",
            });
        }
        self.root = (!trimmed.is_empty()).then(|| trimmed.to_string());
        Ok(self)
    }

    /// Bucket name
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key prefix, if any
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }
}

/// An object written by [`ObjectStager::stage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    bucket: String,
    location: Path,
}

impl StagedObject {
    /// Refers to an existing object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if `key` is not a valid object path.
    pub fn new(bucket: impl Into<String>, key: &str) -> Result<Self, StorageError> {
        let location = Path::parse(key).map_err(|source| StorageError::InvalidKey {
            key: key.to_string(),
            source,
        })?;
        Ok(Self {
            bucket: bucket.into(),
            location,
        })
    }

    /// Bucket holding the object
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key
    #[must_use]
    pub fn key(&self) -> &str {
        self.location.as_ref()
    }

    /// Object path within the store
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// URI the COPY statement reads from.
    #[must_use]
    pub fn source_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.location)
    }
}

impl fmt::Display for StagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source_uri())
    }
}

/// Stages datasets in an object store bound to one bucket.
#[derive(Debug, Clone)]
pub struct ObjectStager {
    store: Arc<dyn ObjectStore>,
    config: StorageConfig,
    csv_options: CsvWriterOptions,
}

impl ObjectStager {
    /// Creates a stager writing to `store`, which must address `config.bucket()`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, config: StorageConfig) -> Self {
        Self {
            store,
            config,
            csv_options: CsvWriterOptions::default(),
        }
    }

    /// Overrides the CSV dialect of the staged payload.
    ///
    /// The COPY load options have to describe the same dialect.
    #[must_use]
    pub fn with_csv_options(mut self, csv_options: CsvWriterOptions) -> Self {
        self.csv_options = csv_options;
        self
    }

    /// Storage configuration
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Generates a fresh key `[root/]table-<suffix>`.
    #[must_use]
    pub fn object_key(&self, table_name: &str) -> String {
        let name = format!("{table_name}-{}", Uuid::new_v4().simple());
        match self.config.root() {
            Some(root) => format!("{root}/{name}"),
            None => name,
        }
    }

    /// Serializes `dataset` and uploads it under a new key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialize`] if the dataset cannot be written
    /// as CSV and [`StorageError::Upload`] if the store rejects the upload.
    pub async fn stage(
        &self,
        dataset: &Dataset,
        table_name: &str,
    ) -> Result<StagedObject, StorageError> {
        let bytes = write_csv_to_bytes(dataset.schema(), dataset.batches(), &self.csv_options)
            .map_err(|source| StorageError::Serialize {
                table: table_name.to_string(),
                source,
            })?;

        let staged = StagedObject::new(self.config.bucket(), &self.object_key(table_name))?;
        debug!(
            "Uploading {} bytes ({} rows) to {staged}",
            bytes.len(),
            dataset.num_rows()
        );

        self.store
            .put(staged.location(), PutPayload::from(bytes))
            .await
            .map_err(|source| StorageError::Upload {
                bucket: staged.bucket().to_string(),
                key: staged.key().to_string(),
                source,
            })?;

        info!("Staged {} rows at {staged}", dataset.num_rows());
        Ok(staged)
    }

    /// Deletes a staged object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the store rejects the deletion.
    pub async fn unstage(&self, staged: &StagedObject) -> Result<(), StorageError> {
        self.store
            .delete(staged.location())
            .await
            .map_err(|source| StorageError::Delete {
                bucket: staged.bucket().to_string(),
                key: staged.key().to_string(),
                source,
            })?;

        info!("Deleted staged object {staged}");
        Ok(())
    }
}
