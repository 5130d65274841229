//! Error handling for bundle publishing
//!
//! `ServiceError` is what the external collaborators fail with.
//! `PublishError` is what the orchestrator surfaces to its caller, one
//! variant per workflow step so the failing step is never ambiguous.

use crate::core::traits::VersionCode;
use serde::Deserialize;
use thiserror::Error;

/// Failure reported by a build-service client or a binary stager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// HTTP failure; `content` is the raw response body
    #[error("HTTP error{}: {}", fmt_status(.status), String::from_utf8_lossy(.content))]
    Http {
        status: Option<u16>,
        content: Vec<u8>,
    },

    #[error("{0}")]
    Other(String),
}

/// Structured error payload embedded in a Google API error body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorPayload {
    pub code: u16,
    pub message: String,
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" {}", s)).unwrap_or_default()
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorPayload,
}

impl ServiceError {
    /// Build an HTTP error from a status and body
    pub fn http(status: Option<u16>, content: impl Into<Vec<u8>>) -> Self {
        Self::Http {
            status,
            content: content.into(),
        }
    }

    /// Build a generic error from any displayable cause
    pub fn other(message: impl std::fmt::Display) -> Self {
        Self::Other(message.to_string())
    }

    /// Parse the `{"error": {"code": .., "message": ..}}` payload, if any.
    ///
    /// Empty bodies, non-JSON bodies, and JSON bodies missing either field
    /// all yield `None`.
    pub fn api_error(&self) -> Option<ApiErrorPayload> {
        match self {
            Self::Http { content, .. } => serde_json::from_slice::<ApiErrorBody>(content)
                .ok()
                .map(|body| body.error),
            Self::Other(_) => None,
        }
    }
}

/// Main error type for bundle publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("[{package}] invalid publish request: {message}")]
    InvalidRequest { package: String, message: String },

    #[error("[{package}] failed to stage bundles")]
    Staging {
        package: String,
        #[source]
        source: ServiceError,
    },

    #[error("[{package}] failed to connect to the build service")]
    Connection {
        package: String,
        #[source]
        source: ServiceError,
    },

    #[error("[{package}] failed to create edit")]
    EditCreation {
        package: String,
        #[source]
        source: ServiceError,
    },

    #[error("[{package}] bundle upload failed")]
    Upload {
        package: String,
        #[source]
        source: ServiceError,
    },

    #[error("[{package}] deobfuscation file upload failed for version {version_code}")]
    DeobfuscationUpload {
        package: String,
        version_code: VersionCode,
        #[source]
        source: ServiceError,
    },

    #[error("[{package}] promotion to track '{track}' failed")]
    Promotion {
        package: String,
        track: String,
        #[source]
        source: ServiceError,
    },

    #[error("[{package}] edit validation failed")]
    EditValidation {
        package: String,
        #[source]
        source: ServiceError,
    },

    #[error("[{package}] edit commit failed")]
    Commit {
        package: String,
        #[source]
        source: ServiceError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl PublishError {
    /// Get the package name associated with this error
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::InvalidRequest { package, .. }
            | Self::Staging { package, .. }
            | Self::Connection { package, .. }
            | Self::EditCreation { package, .. }
            | Self::Upload { package, .. }
            | Self::DeobfuscationUpload { package, .. }
            | Self::Promotion { package, .. }
            | Self::EditValidation { package, .. }
            | Self::Commit { package, .. } => Some(package),
            Self::Config(_) => None,
        }
    }

    /// The collaborator failure behind this error, if any
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Staging { source, .. }
            | Self::Connection { source, .. }
            | Self::EditCreation { source, .. }
            | Self::Upload { source, .. }
            | Self::DeobfuscationUpload { source, .. }
            | Self::Promotion { source, .. }
            | Self::EditValidation { source, .. }
            | Self::Commit { source, .. } => Some(source),
            Self::InvalidRequest { .. } | Self::Config(_) => None,
        }
    }

    /// Check if running the same request again could succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidRequest { .. } | Self::Config(_))
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidRequest { .. } => vec![
                "Provide a non-empty package name",
                "Provide at least one non-empty track name",
            ],
            Self::Staging { .. } => vec![
                "Check that the bundle payloads are readable",
                "Check free space in the temporary directory",
            ],
            Self::Connection { .. } => vec![
                "Check the service account credentials",
                "Check that the package exists in the Play Console",
            ],
            Self::EditCreation { .. } => {
                vec!["Check that the service account has release permissions"]
            }
            Self::Upload { .. } => vec![
                "Inspect the service response body",
                "Bump the version code if it was already used",
            ],
            Self::DeobfuscationUpload { .. } => {
                vec!["Check that the mapping file matches the uploaded bundle"]
            }
            Self::Promotion { .. } => vec![
                "Check that the track name exists for this package",
                "Check the release configuration of the track",
            ],
            Self::EditValidation { .. } => {
                vec!["Inspect the validation message from the service"]
            }
            Self::Commit { .. } => vec![
                "Retry the publish; uncommitted edits expire on their own",
            ],
            Self::Config(_) => vec!["Run `bundle-publisher check` to validate the configuration"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::Staging { .. } => "STAGING_FAILED",
            Self::Connection { .. } => "CONNECTION_FAILED",
            Self::EditCreation { .. } => "EDIT_CREATION_FAILED",
            Self::Upload { .. } => "UPLOAD_FAILED",
            Self::DeobfuscationUpload { .. } => "DEOBFUSCATION_UPLOAD_FAILED",
            Self::Promotion { .. } => "PROMOTION_FAILED",
            Self::EditValidation { .. } => "EDIT_VALIDATION_FAILED",
            Self::Commit { .. } => "COMMIT_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}
