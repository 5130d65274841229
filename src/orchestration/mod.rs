//! Orchestration layer for bundle publishing
//!
//! This module provides the high-level workflow that drives a build-service
//! edit from creation to commit.

pub mod bundle_publisher;

pub use bundle_publisher::{BundlePublisher, PublishReport};
