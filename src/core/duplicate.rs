//! Recognition of "version code already used" upload rejections
//!
//! The build service rejects a bundle whose version code it has already
//! seen. That rejection is expected when re-running a release and is not
//! fatal: the bundle is skipped and the rest of the release goes on.

use crate::core::error::ServiceError;
use serde::{Deserialize, Serialize};

/// Status code the Play Developer API uses for a reused version code
pub const DEFAULT_DUPLICATE_STATUS_CODE: u16 = 403;

/// Message fragment the Play Developer API uses for a reused version code
pub const DEFAULT_DUPLICATE_MESSAGE_FRAGMENT: &str =
    "specifies a version code that has already been used";

/// Predicate deciding whether an upload failure is a duplicate version
///
/// Both the status code and the message must match. The status code is
/// compared exactly, so a 404 carrying the same message is not a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateVersionRule {
    pub status_code: u16,
    pub message_fragment: String,
}

impl Default for DuplicateVersionRule {
    fn default() -> Self {
        Self {
            status_code: DEFAULT_DUPLICATE_STATUS_CODE,
            message_fragment: DEFAULT_DUPLICATE_MESSAGE_FRAGMENT.to_string(),
        }
    }
}

impl DuplicateVersionRule {
    pub fn new(status_code: u16, message_fragment: impl Into<String>) -> Self {
        Self {
            status_code,
            message_fragment: message_fragment.into(),
        }
    }

    /// Check whether `error` is a duplicate-version rejection
    pub fn matches(&self, error: &ServiceError) -> bool {
        error.api_error().is_some_and(|payload| {
            payload.code == self.status_code && payload.message.contains(&self.message_fragment)
        })
    }
}
