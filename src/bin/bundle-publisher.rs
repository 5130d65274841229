//! Bundle Publisher CLI
//!
//! Inspects and validates bundle-publisher configuration

use anyhow::{Context, Result};
use bundle_publisher::{ConfigLoadOptions, ConfigLoader, PublisherConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Google Play bundle publishing assistant
#[derive(Parser)]
#[command(name = "bundle-publisher")]
#[command(version)]
#[command(about = "Google Play bundle publishing assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the effective configuration
    Check {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Override the package name
        #[arg(short, long)]
        package: Option<String>,

        /// Comma-separated tracks to promote to
        #[arg(short, long, value_delimiter = ',')]
        tracks: Vec<String>,

        /// Promote without validating or committing (`--dry-run=false` turns it off)
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        dry_run: Option<bool>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { project_path } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            check_command(path).await
        }
        Commands::Config {
            project_path,
            package,
            tracks,
            dry_run,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            config_command(path, cli_overrides(package, tracks, dry_run)).await
        }
    }
}

/// Build the highest-priority config layer from command line flags
fn cli_overrides(
    package: Option<String>,
    tracks: Vec<String>,
    dry_run: Option<bool>,
) -> Option<PublisherConfig> {
    if package.is_none() && tracks.is_empty() && dry_run.is_none() {
        return None;
    }

    Some(PublisherConfig {
        package: Some(bundle_publisher::PackageConfig {
            name: package,
            default_tracks: (!tracks.is_empty()).then_some(tracks),
        }),
        publish: dry_run.map(|dry_run| bundle_publisher::PublishOptionsConfig {
            dry_run: Some(dry_run),
        }),
        duplicate_version: None,
        env_var_expansion: None,
        ..PublisherConfig::default()
    })
}

async fn load(
    project_path: PathBuf,
    cli_args: Option<PublisherConfig>,
) -> Result<PublisherConfig> {
    let options = ConfigLoadOptions {
        project_path,
        home_dir: None,
        cli_args,
        env: std::env::vars().collect(),
    };

    ConfigLoader::load(options)
        .await
        .context("failed to load configuration")
}

async fn check_command(project_path: PathBuf) -> Result<i32> {
    println!("\n🔍 Configuration Check\n");

    let config = load(project_path, None).await?;
    let result = ConfigLoader::validate(&config);

    println!("{}", ConfigLoader::format_validation_result(&result));

    if result.valid {
        let rule = config.duplicate_rule();
        println!();
        println!(
            "  Package: {}",
            config.package_name().unwrap_or("(not configured)")
        );
        println!("  Tracks: {}", config.default_tracks().join(", "));
        println!("  Dry run: {}", config.dry_run());
        println!(
            "  Duplicate version: status {} with \"{}\"",
            rule.status_code, rule.message_fragment
        );
        println!();
        Ok(0)
    } else {
        Ok(1)
    }
}

async fn config_command(
    project_path: PathBuf,
    cli_args: Option<PublisherConfig>,
) -> Result<i32> {
    let config = load(project_path, cli_args).await?;
    let yaml = serde_yaml::to_string(&config).context("failed to render configuration")?;

    print!("{}", yaml);
    Ok(0)
}
