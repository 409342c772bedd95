//! Credential sources for the warehouse COPY statement.
//!
//! Redshift reads the staged object itself, so the COPY text has to carry
//! credentials for the bucket. Providers hand those out as [`CopyCredentials`],
//! whose secret parts stay wrapped in [`SecretString`] until the statement is
//! rendered.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Environment variable holding the access key id.
pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key.
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding an optional session token.
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

const REDACTED: &str = "****";

/// Errors produced while obtaining credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A required credential was not provided
    #[error("Missing credential: {name}")]
    Missing {
        /// Name of the credential (or the variable it was read from)
        name: String,
    },

    /// A credential contains characters that cannot be embedded in SQL text
    #[error("Invalid credential {name}: {reason}")]
    Invalid {
        /// Name of the credential
        name: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Credentials the warehouse uses to read the staged object.
#[derive(Debug)]
pub enum CopyCredentials {
    /// Static key pair, optionally with a session token.
    AccessKey {
        /// Access key id
        access_key_id: String,
        /// Secret access key
        secret_access_key: SecretString,
        /// Temporary session token
        session_token: Option<SecretString>,
    },
    /// IAM role attached to the cluster.
    IamRole {
        /// Role ARN
        role_arn: String,
    },
}

impl CopyCredentials {
    /// Creates key pair credentials.
    #[must_use]
    pub fn access_key(access_key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::AccessKey {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret.into()),
            session_token: None,
        }
    }

    /// Adds a session token to key pair credentials. No-op for IAM roles.
    #[must_use]
    pub fn with_session_token(self, token: impl Into<String>) -> Self {
        match self {
            Self::AccessKey {
                access_key_id,
                secret_access_key,
                ..
            } => Self::AccessKey {
                access_key_id,
                secret_access_key,
                session_token: Some(SecretString::from(token.into())),
            },
            role @ Self::IamRole { .. } => role,
        }
    }

    /// Creates IAM role credentials.
    #[must_use]
    pub fn iam_role(role_arn: impl Into<String>) -> Self {
        Self::IamRole {
            role_arn: role_arn.into(),
        }
    }

    /// Checks that every part can be embedded in a single-quoted SQL literal.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Missing`] for empty values and
    /// [`CredentialError::Invalid`] for values containing quotes, backslashes
    /// or line breaks.
    pub fn validate(&self) -> Result<(), CredentialError> {
        match self {
            Self::AccessKey {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                check_literal("ACCESS_KEY_ID", access_key_id)?;
                check_literal("SECRET_ACCESS_KEY", secret_access_key.expose_secret())?;
                if let Some(token) = session_token {
                    check_literal("SESSION_TOKEN", token.expose_secret())?;
                }
                Ok(())
            },
            Self::IamRole { role_arn } => check_literal("IAM_ROLE", role_arn),
        }
    }

    /// Renders the authorization clauses of a COPY statement.
    ///
    /// The returned lines contain secrets and must not be logged.
    #[must_use]
    pub fn copy_clauses(&self) -> Vec<String> {
        self.clauses(false)
    }

    /// Renders the authorization clauses with secrets masked.
    #[must_use]
    pub fn redacted_clauses(&self) -> Vec<String> {
        self.clauses(true)
    }

    fn clauses(&self, redact: bool) -> Vec<String> {
        let show = |secret: &SecretString| {
            if redact {
                REDACTED.to_string()
            } else {
                secret.expose_secret().to_string()
            }
        };

        match self {
            Self::AccessKey {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                let mut lines = vec![
                    format!("ACCESS_KEY_ID '{access_key_id}'"),
                    format!("SECRET_ACCESS_KEY '{}'", show(secret_access_key)),
                ];
                if let Some(token) = session_token {
                    lines.push(format!("SESSION_TOKEN '{}'", show(token)));
                }
                lines
            },
            Self::IamRole { role_arn } => vec![format!("IAM_ROLE '{role_arn}'")],
        }
    }
}

fn check_literal(name: &str, value: &str) -> Result<(), CredentialError> {
    if value.is_empty() {
        return Err(CredentialError::Missing {
            name: name.to_string(),
        });
    }
    if value
        .chars()
        .any(|c| matches!(c, '\'' | '\\' | '\n' | '\r'))
    {
        return Err(CredentialError::Invalid {
            name: name.to_string(),
            reason: "contains a quote, backslash or line break".to_string(),
        });
    }
    Ok(())
}

/// Source of [`CopyCredentials`].
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns the credentials to embed in the next COPY statement.
    async fn copy_credentials(&self) -> Result<CopyCredentials, CredentialError>;
}

/// Provider that always hands out the same credentials.
#[derive(Debug)]
pub struct StaticCredentials {
    credentials: CopyCredentials,
}

impl StaticCredentials {
    /// Wraps fixed credentials.
    #[must_use]
    pub fn new(credentials: CopyCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn copy_credentials(&self) -> Result<CopyCredentials, CredentialError> {
        let copy = match &self.credentials {
            CopyCredentials::AccessKey {
                access_key_id,
                secret_access_key,
                session_token,
            } => CopyCredentials::AccessKey {
                access_key_id: access_key_id.clone(),
                secret_access_key: SecretString::from(secret_access_key.expose_secret().to_owned()),
                session_token: session_token
                    .as_ref()
                    .map(|t| SecretString::from(t.expose_secret().to_owned())),
            },
            CopyCredentials::IamRole { role_arn } => CopyCredentials::IamRole {
                role_arn: role_arn.clone(),
            },
        };
        copy.validate()?;
        Ok(copy)
    }
}

/// Provider reading the standard AWS key pair variables on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn copy_credentials(&self) -> Result<CopyCredentials, CredentialError> {
        let read = |name: &str| {
            std::env::var(name).map_err(|_| CredentialError::Missing {
                name: name.to_string(),
            })
        };

        let mut credentials =
            CopyCredentials::access_key(read(ACCESS_KEY_ID_VAR)?, read(SECRET_ACCESS_KEY_VAR)?);
        if let Ok(token) = std::env::var(SESSION_TOKEN_VAR) {
            credentials = credentials.with_session_token(token);
        }
        credentials.validate()?;
        Ok(credentials)
    }
}
