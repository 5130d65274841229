//! Core traits and types for bundle publishing
//!
//! This module defines the data model shared by the orchestrator and the
//! two external collaborators it drives: the package-scoped build service
//! and the binary stager.

use crate::core::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Identifiers
// ============================================================================

/// Version code assigned by the build service to an uploaded bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionCode(pub i64);

impl fmt::Display for VersionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an in-progress, uncommitted edit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditId(pub String);

impl EditId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for EditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Bundles
// ============================================================================

/// A bundle to publish, as handed in by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Opaque payload reference understood by the stager
    pub media_body: String,

    /// Optional deobfuscation (mapping) file reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deobfuscation_file: Option<String>,
}

impl Bundle {
    pub fn new(media_body: impl Into<String>) -> Self {
        Self {
            media_body: media_body.into(),
            deobfuscation_file: None,
        }
    }

    pub fn with_deobfuscation_file(mut self, file: impl Into<String>) -> Self {
        self.deobfuscation_file = Some(file.into());
        self
    }
}

/// A bundle after it has been written to the temporary directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedBinary {
    pub binary_path: PathBuf,
    #[serde(default)]
    pub deobfuscation_path: Option<PathBuf>,
}

impl StagedBinary {
    /// Deobfuscation file to upload, treating an empty path as absent
    pub fn deobfuscation_path(&self) -> Option<&Path> {
        self.deobfuscation_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

/// Result of uploading a single bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(VersionCode),
    /// The service already holds a bundle with this version code
    DuplicateVersion,
}

impl UploadOutcome {
    pub fn version_code(&self) -> Option<VersionCode> {
        match self {
            Self::Uploaded(code) => Some(*code),
            Self::DuplicateVersion => None,
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Everything needed to publish a set of bundles for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub package_name: String,
    pub tracks: Vec<String>,
    pub bundles: Vec<Bundle>,
    #[serde(default)]
    pub dry_run: bool,
}

impl PublishRequest {
    /// Check the request shape; returns a description of the first problem
    pub fn validate(&self) -> Result<(), String> {
        if self.package_name.trim().is_empty() {
            return Err("package name is empty".to_string());
        }
        if self.tracks.is_empty() {
            return Err("at least one track is required".to_string());
        }
        if let Some(index) = self.tracks.iter().position(|t| t.trim().is_empty()) {
            return Err(format!("track #{} is empty", index + 1));
        }
        Ok(())
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Stages bundles as files in a temporary directory
#[async_trait]
pub trait BinaryStager: Send + Sync {
    async fn create_temporary_directory(&self) -> Result<PathBuf, ServiceError>;

    /// Write `bundles` into `dir`, returning one staged binary per bundle in
    /// input order
    async fn store_binaries_to_directory(
        &self,
        dir: &Path,
        bundles: &[Bundle],
    ) -> Result<Vec<StagedBinary>, ServiceError>;

    async fn delete_temporary_dir(&self, dir: &Path) -> Result<(), ServiceError>;
}

/// Build-service client scoped to a single package
///
/// Every mutating call operates on an edit created by [`create_edit`]. The
/// edit has no effect on the store until [`commit_edit`] succeeds; expiry of
/// abandoned edits is up to the service.
///
/// [`create_edit`]: BuildService::create_edit
/// [`commit_edit`]: BuildService::commit_edit
#[async_trait]
pub trait BuildService: Send + Sync {
    async fn create_edit(&self) -> Result<EditId, ServiceError>;

    async fn upload_bundle(
        &self,
        edit: &EditId,
        binary_path: &Path,
    ) -> Result<VersionCode, ServiceError>;

    async fn upload_deobfuscation_file(
        &self,
        edit: &EditId,
        version_code: VersionCode,
        path: &Path,
    ) -> Result<(), ServiceError>;

    async fn promote_to_track(
        &self,
        edit: &EditId,
        version_codes: &[VersionCode],
        track: &str,
    ) -> Result<(), ServiceError>;

    async fn validate_edit(&self, edit: &EditId) -> Result<(), ServiceError>;

    async fn commit_edit(&self, edit: &EditId) -> Result<(), ServiceError>;
}

/// Produces a [`BuildService`] for a given package
#[async_trait]
pub trait BuildServiceConnector: Send + Sync {
    type Service: BuildService;

    async fn connect(&self, package_name: &str) -> Result<Self::Service, ServiceError>;
}
