//! Configuration file loader for bundle-publisher
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tokio::fs;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".bundle-publisher.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Directory holding the global config (default: $HOME)
    pub home_dir: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PublisherConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "package.defaultTracks[0]")
    pub field: String,

    /// Error message
    pub message: String,

    /// Expected type/value
    pub expected: Option<String>,

    /// Actual type/value
    pub actual: Option<String>,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.bundle-publisher.yaml)
    /// 4. Global config (~/.bundle-publisher.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublisherConfig, PublishError> {
        let mut configs: Vec<PublisherConfig> = Vec::new();

        configs.push(PublisherConfig::default());

        let home_dir = options
            .home_dir
            .clone()
            .or_else(|| env::var_os("HOME").map(PathBuf::from));
        if let Some(home_dir) = home_dir
            && let Some(global_config) =
                Self::load_config_file(home_dir.join(CONFIG_FILENAME), Vec::new()).await?
        {
            configs.push(global_config);
        }

        if let Some(project_config) =
            Self::load_config_file(options.project_path.join(CONFIG_FILENAME), Vec::new()).await?
        {
            configs.push(project_config);
        }

        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged_config = Self::merge_configs(configs);

        Ok(Self::expand_env_vars(merged_config, &options.env))
    }

    /// Load configuration from YAML file
    ///
    /// `visited` holds the canonical paths of the files that extend this one;
    /// reaching one of them again is a circular `extends` chain.
    fn load_config_file(
        file_path: PathBuf,
        mut visited: Vec<PathBuf>,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Option<PublisherConfig>, PublishError>>
                + Send,
        >,
    > {
        Box::pin(async move {
            let exists = fs::try_exists(&file_path).await.map_err(|e| {
                PublishError::Config(format!(
                    "Failed to access config file {}: {}",
                    file_path.display(),
                    e
                ))
            })?;
            if !exists {
                return Ok(None);
            }

            let canonical = fs::canonicalize(&file_path).await.map_err(|e| {
                PublishError::Config(format!(
                    "Failed to resolve config file {}: {}",
                    file_path.display(),
                    e
                ))
            })?;
            if visited.contains(&canonical) {
                let chain: Vec<String> = visited
                    .iter()
                    .chain(std::iter::once(&canonical))
                    .map(|p| p.display().to_string())
                    .collect();
                return Err(PublishError::Config(format!(
                    "circular extends: {}",
                    chain.join(" -> ")
                )));
            }

            tracing::debug!(path = %file_path.display(), "loading configuration file");

            let content = fs::read_to_string(&file_path).await.map_err(|e| {
                PublishError::Config(format!(
                    "Failed to read config file {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            let config: PublisherConfig = serde_yaml::from_str(&content).map_err(|e| {
                PublishError::Config(format!(
                    "Failed to parse YAML config {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            if let Some(extends_path) = &config.extends {
                let base_path = canonical
                    .parent()
                    .ok_or_else(|| PublishError::Config("Invalid config file path".to_string()))?
                    .join(extends_path);
                visited.push(canonical);

                match Self::load_config_file(base_path.clone(), visited).await? {
                    Some(base_config) => {
                        return Ok(Some(Self::merge_configs(vec![base_config, config])));
                    }
                    None => {
                        tracing::warn!(
                            path = %base_path.display(),
                            "extended configuration file not found"
                        );
                    }
                }
            }

            Ok(Some(config))
        })
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<PublisherConfig> {
        let mut package = PackageConfig::default();
        let mut publish = None;

        // PUBLISH_PACKAGE_NAME -> package.name
        if let Some(name) = env.get("PUBLISH_PACKAGE_NAME") {
            package.name = Some(name.clone());
        }

        // PUBLISH_TRACKS -> package.defaultTracks
        if let Some(tracks) = env.get("PUBLISH_TRACKS") {
            let tracks: Vec<String> = tracks
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !tracks.is_empty() {
                package.default_tracks = Some(tracks);
            }
        }

        // PUBLISH_DRY_RUN -> publish.dryRun
        if let Some(dry_run) = env.get("PUBLISH_DRY_RUN") {
            match dry_run.to_ascii_lowercase().as_str() {
                "true" | "1" => publish = Some(PublishOptionsConfig { dry_run: Some(true) }),
                "false" | "0" => publish = Some(PublishOptionsConfig { dry_run: Some(false) }),
                other => tracing::warn!(value = other, "ignoring unrecognised PUBLISH_DRY_RUN"),
            }
        }

        let has_package = package != PackageConfig::default();
        if !has_package && publish.is_none() {
            return None;
        }

        Some(PublisherConfig {
            package: has_package.then_some(package),
            publish,
            duplicate_version: None,
            env_var_expansion: None,
            ..PublisherConfig::default()
        })
    }

    /// Merge multiple configurations with priority
    pub fn merge_configs(configs: Vec<PublisherConfig>) -> PublisherConfig {
        let mut result = PublisherConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut PublisherConfig, source: PublisherConfig) {
        if !source.version.is_empty() {
            target.version = source.version;
        }

        if source.extends.is_some() {
            target.extends = source.extends;
        }

        if let Some(source_package) = source.package {
            let target_package = target.package.get_or_insert_with(PackageConfig::default);
            if source_package.name.is_some() {
                target_package.name = source_package.name;
            }
            if source_package.default_tracks.is_some() {
                target_package.default_tracks = source_package.default_tracks;
            }
        }

        if let Some(source_publish) = source.publish {
            let target_publish = target.publish.get_or_insert_with(PublishOptionsConfig::default);
            if source_publish.dry_run.is_some() {
                target_publish.dry_run = source_publish.dry_run;
            }
        }

        if let Some(source_duplicate) = source.duplicate_version {
            let target_duplicate = target
                .duplicate_version
                .get_or_insert_with(DuplicateVersionConfig::default);
            if source_duplicate.status_code.is_some() {
                target_duplicate.status_code = source_duplicate.status_code;
            }
            if source_duplicate.message_fragment.is_some() {
                target_duplicate.message_fragment = source_duplicate.message_fragment;
            }
        }

        if source.env_var_expansion.is_some() {
            target.env_var_expansion = source.env_var_expansion;
        }
    }

    /// Expand environment variables in configuration
    ///
    /// Only `package.name` is expanded. Variables outside `allowedPrefixes`
    /// are left untouched.
    fn expand_env_vars(
        mut config: PublisherConfig,
        env: &HashMap<String, String>,
    ) -> PublisherConfig {
        let expansion = config.env_var_expansion.as_ref();
        if !expansion.and_then(|e| e.enabled).unwrap_or(true) {
            return config;
        }
        let allowed_prefixes = expansion.and_then(|e| e.allowed_prefixes.clone());

        if let Some(package) = &mut config.package
            && let Some(name) = &package.name
        {
            package.name = Some(Self::expand_string(name, env, &allowed_prefixes));
        }

        config
    }

    /// Expand environment variables in a single string
    fn expand_string(
        input: &str,
        env: &HashMap<String, String>,
        allowed_prefixes: &Option<Vec<String>>,
    ) -> String {
        let Ok(env_var_regex) = Regex::new(ENV_VAR_PATTERN) else {
            return input.to_string();
        };

        let mut result = input.to_string();
        for cap in env_var_regex.captures_iter(input) {
            let var_name = &cap[1];

            if let Some(prefixes) = allowed_prefixes
                && !prefixes.iter().any(|prefix| var_name.starts_with(prefix))
            {
                tracing::warn!(
                    variable = var_name,
                    "environment variable not allowed by prefix whitelist, skipping"
                );
                continue;
            }

            match env.get(var_name) {
                Some(value) => result = result.replace(&format!("${{{}}}", var_name), value),
                None => tracing::warn!(variable = var_name, "environment variable not found"),
            }
        }

        result
    }

    /// Validate configuration
    pub fn validate(config: &PublisherConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if config.version.is_empty() {
            errors.push(ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
                expected: Some("string (e.g., \"1.0\")".to_string()),
                actual: Some("empty".to_string()),
            });
        } else if config.version != "1.0" {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("Unknown version: {}", config.version),
                suggestion: Some("Currently supported version is \"1.0\" only".to_string()),
            });
        }

        if let Some(package) = &config.package {
            Self::validate_package(package, &mut errors, &mut warnings);
        }

        if let Some(duplicate) = &config.duplicate_version {
            Self::validate_duplicate_version(duplicate, &mut errors);
        }

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn validate_package(
        package: &PackageConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        if let Some(name) = &package.name
            && name.trim().is_empty()
        {
            errors.push(ConfigValidationError {
                field: "package.name".to_string(),
                message: "package name must not be empty".to_string(),
                expected: Some("application id (e.g., com.example.app)".to_string()),
                actual: Some("empty".to_string()),
            });
        }

        match &package.default_tracks {
            Some(tracks) if tracks.is_empty() => warnings.push(ConfigValidationWarning {
                field: "package.defaultTracks".to_string(),
                message: "no default tracks configured".to_string(),
                suggestion: Some("Add at least one track, e.g. [internal]".to_string()),
            }),
            Some(tracks) => {
                for (i, track) in tracks.iter().enumerate() {
                    if track.trim().is_empty() {
                        errors.push(ConfigValidationError {
                            field: format!("package.defaultTracks[{}]", i),
                            message: "track name must not be empty".to_string(),
                            expected: Some("non-empty string".to_string()),
                            actual: Some("empty".to_string()),
                        });
                    }
                }
            }
            None => {}
        }
    }

    fn validate_duplicate_version(
        duplicate: &DuplicateVersionConfig,
        errors: &mut Vec<ConfigValidationError>,
    ) {
        if let Some(code) = duplicate.status_code
            && !(400..600).contains(&code)
        {
            errors.push(ConfigValidationError {
                field: "duplicateVersion.statusCode".to_string(),
                message: "status code must be an HTTP error status".to_string(),
                expected: Some("400-599".to_string()),
                actual: Some(code.to_string()),
            });
        }

        if let Some(fragment) = &duplicate.message_fragment
            && fragment.is_empty()
        {
            errors.push(ConfigValidationError {
                field: "duplicateVersion.messageFragment".to_string(),
                message: "an empty fragment would match every error message".to_string(),
                expected: Some("non-empty string".to_string()),
                actual: Some("empty".to_string()),
            });
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
                if let (Some(expected), Some(actual)) = (&error.expected, &error.actual) {
                    lines.push(format!("    Expected: {}", expected));
                    lines.push(format!("    Actual: {}", actual));
                }
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}
