//! Configuration structures and types for bundle-publisher
//!
//! This module provides type-safe configuration management with serde support.

use crate::core::duplicate::{
    DEFAULT_DUPLICATE_MESSAGE_FRAGMENT, DEFAULT_DUPLICATE_STATUS_CODE, DuplicateVersionRule,
};
use serde::{Deserialize, Serialize};

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublisherConfig {
    /// Schema version (required)
    pub version: String,

    /// Extend from base configuration file (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Package to publish (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageConfig>,

    /// Publish options (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishOptionsConfig>,

    /// Duplicate version detection (optional)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "duplicateVersion"
    )]
    pub duplicate_version: Option<DuplicateVersionConfig>,

    /// Environment variable expansion (optional)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "envVarExpansion"
    )]
    pub env_var_expansion: Option<EnvVarExpansionConfig>,
}

/// Package information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PackageConfig {
    /// Application id, e.g. com.example.app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tracks to promote to when none are given on the command line
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "defaultTracks"
    )]
    pub default_tracks: Option<Vec<String>>,
}

/// Publish options configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PublishOptionsConfig {
    /// Promote without validating or committing the edit (default: false)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "dryRun")]
    pub dry_run: Option<bool>,
}

/// Duplicate version detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuplicateVersionConfig {
    /// Status code carried in the error payload (default: 403)
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "statusCode")]
    pub status_code: Option<u16>,

    /// Substring the error message must contain
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "messageFragment"
    )]
    pub message_fragment: Option<String>,
}

/// Environment variable expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvVarExpansionConfig {
    /// Enable environment variable expansion (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Allowed environment variable prefixes (default: all)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "allowedPrefixes"
    )]
    pub allowed_prefixes: Option<Vec<String>>,
}

impl PublisherConfig {
    /// Configured package name, if any
    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().and_then(|p| p.name.as_deref())
    }

    /// Tracks to promote to by default
    pub fn default_tracks(&self) -> &[String] {
        self.package
            .as_ref()
            .and_then(|p| p.default_tracks.as_deref())
            .unwrap_or(&[])
    }

    /// Effective dry-run flag
    pub fn dry_run(&self) -> bool {
        self.publish
            .as_ref()
            .and_then(|p| p.dry_run)
            .unwrap_or(false)
    }

    /// Build the duplicate version rule, filling gaps with the defaults
    pub fn duplicate_rule(&self) -> DuplicateVersionRule {
        let config = self.duplicate_version.as_ref();
        DuplicateVersionRule {
            status_code: config
                .and_then(|d| d.status_code)
                .unwrap_or(DEFAULT_DUPLICATE_STATUS_CODE),
            message_fragment: config
                .and_then(|d| d.message_fragment.clone())
                .unwrap_or_else(|| DEFAULT_DUPLICATE_MESSAGE_FRAGMENT.to_string()),
        }
    }
}

/// Default configuration values
impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            extends: None,
            package: None,
            publish: Some(PublishOptionsConfig {
                dry_run: Some(false),
            }),
            duplicate_version: Some(DuplicateVersionConfig::default()),
            env_var_expansion: Some(EnvVarExpansionConfig {
                enabled: Some(true),
                allowed_prefixes: None,
            }),
        }
    }
}

impl Default for DuplicateVersionConfig {
    fn default() -> Self {
        Self {
            status_code: Some(DEFAULT_DUPLICATE_STATUS_CODE),
            message_fragment: Some(DEFAULT_DUPLICATE_MESSAGE_FRAGMENT.to_string()),
        }
    }
}
