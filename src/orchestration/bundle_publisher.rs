//! Bundle Publisher - Orchestrates publishing bundles to release tracks
//!
//! Drives a single edit through its lifecycle:
//! - Stage bundles into a temporary directory
//! - Upload each bundle (skipping duplicate version codes)
//! - Upload deobfuscation files
//! - Promote the uploaded versions to every requested track
//! - Validate and commit the edit (unless dry-run)
//!
//! The temporary directory is deleted on every exit path once acquired.

use crate::core::config::PublisherConfig;
use crate::core::duplicate::DuplicateVersionRule;
use crate::core::error::{PublishError, ServiceError};
use crate::core::traits::{
    BinaryStager, Bundle, BuildService, BuildServiceConnector, EditId, PublishRequest,
    StagedBinary, UploadOutcome, VersionCode,
};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Instant;

/// Publishing report returned after a publish operation
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub package_name: String,
    pub tracks: Vec<String>,
    /// Uploaded version codes in bundle order, duplicates excluded
    pub version_codes: Vec<VersionCode>,
    pub skipped_duplicates: usize,
    pub dry_run: bool,
    pub committed: bool,
    pub committed_at: Option<DateTime<Utc>>,
    /// Elapsed time in milliseconds
    pub duration: u64,
}

/// Main bundle publishing orchestrator
pub struct BundlePublisher<C, S> {
    connector: C,
    stager: S,
    duplicate_rule: DuplicateVersionRule,
}

impl<C, S> BundlePublisher<C, S>
where
    C: BuildServiceConnector,
    S: BinaryStager,
{
    /// Create a new BundlePublisher with the default duplicate version rule
    pub fn new(connector: C, stager: S) -> Self {
        Self {
            connector,
            stager,
            duplicate_rule: DuplicateVersionRule::default(),
        }
    }

    /// Create a BundlePublisher using the duplicate version rule from `config`
    pub fn from_config(connector: C, stager: S, config: &PublisherConfig) -> Self {
        Self::new(connector, stager).with_duplicate_rule(config.duplicate_rule())
    }

    pub fn with_duplicate_rule(mut self, rule: DuplicateVersionRule) -> Self {
        self.duplicate_rule = rule;
        self
    }

    pub fn duplicate_rule(&self) -> &DuplicateVersionRule {
        &self.duplicate_rule
    }

    /// Upload `bundles` for `package_name` and promote them to `tracks`
    ///
    /// Returns the version codes that were uploaded, in bundle order.
    /// Bundles rejected as duplicate versions are left out without failing
    /// the run.
    pub async fn upload_bundles(
        &self,
        package_name: &str,
        tracks: &[String],
        bundles: &[Bundle],
        dry_run: bool,
    ) -> Result<Vec<VersionCode>, PublishError> {
        let request = PublishRequest {
            package_name: package_name.to_string(),
            tracks: tracks.to_vec(),
            bundles: bundles.to_vec(),
            dry_run,
        };

        self.publish(&request)
            .await
            .map(|report| report.version_codes)
    }

    /// Publish a request and report what happened
    #[tracing::instrument(
        skip(self, request),
        fields(package = %request.package_name, dry_run = request.dry_run)
    )]
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishReport, PublishError> {
        let start_time = Instant::now();
        let package = request.package_name.as_str();

        request
            .validate()
            .map_err(|message| PublishError::InvalidRequest {
                package: package.to_string(),
                message,
            })?;

        let temp_dir = self
            .stager
            .create_temporary_directory()
            .await
            .map_err(|source| PublishError::Staging {
                package: package.to_string(),
                source,
            })?;
        tracing::debug!(dir = %temp_dir.display(), "created temporary directory");

        let result = self.publish_in(&temp_dir, request).await;

        if let Err(e) = self.stager.delete_temporary_dir(&temp_dir).await {
            tracing::warn!(
                dir = %temp_dir.display(),
                error = %e,
                "failed to delete temporary directory"
            );
        }

        let mut report = result?;
        report.duration = start_time.elapsed().as_millis() as u64;

        tracing::info!(
            uploaded = report.version_codes.len(),
            skipped = report.skipped_duplicates,
            committed = report.committed,
            "publish finished"
        );

        Ok(report)
    }

    /// Everything that happens while the temporary directory exists
    async fn publish_in(
        &self,
        temp_dir: &Path,
        request: &PublishRequest,
    ) -> Result<PublishReport, PublishError> {
        let package = request.package_name.as_str();
        let staging_error = |source: ServiceError| PublishError::Staging {
            package: package.to_string(),
            source,
        };

        let staged = self
            .stager
            .store_binaries_to_directory(temp_dir, &request.bundles)
            .await
            .map_err(staging_error)?;

        if staged.len() != request.bundles.len() {
            return Err(staging_error(ServiceError::other(format!(
                "staged {} binaries for {} bundles",
                staged.len(),
                request.bundles.len()
            ))));
        }

        let service = self
            .connector
            .connect(package)
            .await
            .map_err(|source| PublishError::Connection {
                package: package.to_string(),
                source,
            })?;

        let edit = service
            .create_edit()
            .await
            .map_err(|source| PublishError::EditCreation {
                package: package.to_string(),
                source,
            })?;
        tracing::info!(edit = %edit, bundles = staged.len(), "created edit");

        let mut report = PublishReport {
            package_name: package.to_string(),
            tracks: request.tracks.clone(),
            version_codes: Vec::with_capacity(staged.len()),
            skipped_duplicates: 0,
            dry_run: request.dry_run,
            committed: false,
            committed_at: None,
            duration: 0,
        };

        for binary in &staged {
            let outcome = self.upload_binary(&service, &edit, package, binary).await?;
            match outcome.version_code() {
                Some(version_code) => report.version_codes.push(version_code),
                None => report.skipped_duplicates += 1,
            }
        }

        if report.version_codes.is_empty() {
            tracing::info!("no new versions uploaded, leaving edit uncommitted");
            return Ok(report);
        }

        for track in &request.tracks {
            tracing::debug!(track = %track, versions = ?report.version_codes, "promoting");
            service
                .promote_to_track(&edit, &report.version_codes, track)
                .await
                .map_err(|source| PublishError::Promotion {
                    package: package.to_string(),
                    track: track.clone(),
                    source,
                })?;
        }

        if request.dry_run {
            tracing::info!(edit = %edit, "dry run, skipping validation and commit");
            return Ok(report);
        }

        service
            .validate_edit(&edit)
            .await
            .map_err(|source| PublishError::EditValidation {
                package: package.to_string(),
                source,
            })?;

        service
            .commit_edit(&edit)
            .await
            .map_err(|source| PublishError::Commit {
                package: package.to_string(),
                source,
            })?;
        tracing::info!(edit = %edit, "edit committed");

        report.committed = true;
        report.committed_at = Some(Utc::now());

        Ok(report)
    }

    /// Upload one staged binary and its deobfuscation file
    async fn upload_binary(
        &self,
        service: &C::Service,
        edit: &EditId,
        package: &str,
        binary: &StagedBinary,
    ) -> Result<UploadOutcome, PublishError> {
        let version_code = match service.upload_bundle(edit, &binary.binary_path).await {
            Ok(version_code) => version_code,
            Err(e) if self.duplicate_rule.matches(&e) => {
                tracing::warn!(
                    path = %binary.binary_path.display(),
                    "version code already used, skipping bundle"
                );
                return Ok(UploadOutcome::DuplicateVersion);
            }
            Err(source) => {
                return Err(PublishError::Upload {
                    package: package.to_string(),
                    source,
                });
            }
        };
        tracing::debug!(version_code = %version_code, "bundle uploaded");

        if let Some(path) = binary.deobfuscation_path() {
            service
                .upload_deobfuscation_file(edit, version_code, path)
                .await
                .map_err(|source| PublishError::DeobfuscationUpload {
                    package: package.to_string(),
                    version_code,
                    source,
                })?;
        }

        Ok(UploadOutcome::Uploaded(version_code))
    }
}
