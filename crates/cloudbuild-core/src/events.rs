//! Build event filter for notifications posted by the build service.
//!
//! The build service integration posts one embed per finished build. Only
//! successful builds are re-published, and the direct artifact link is
//! stripped before they are.

use tracing::debug;

use crate::platform::FieldSet;

/// Field marking a successful build.
pub const BUILD_SUCCESS_FIELD: &str = "Build success";

/// Field carrying the artifact download link.
pub const DOWNLOAD_FIELD: &str = "Download";

/// Decides which build notifications get forwarded.
#[derive(Debug, Clone)]
pub struct BuildEventFilter {
    producer: String,
}

impl BuildEventFilter {
    /// Create a filter accepting notifications authored by `producer`.
    pub fn new(producer: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
        }
    }

    /// Return the field set to forward, or `None` to drop the notification.
    ///
    /// Only the first field set is inspected.
    pub fn filter(&self, author: &str, field_sets: &[FieldSet]) -> Option<FieldSet> {
        if author != self.producer {
            return None;
        }
        let first = field_sets.first()?;
        if !first.has_field(BUILD_SUCCESS_FIELD) {
            debug!(author, "Dropping build notification without success field");
            return None;
        }

        let mut forwarded = first.clone();
        let removed = forwarded.remove_field(DOWNLOAD_FIELD);
        debug!(removed, "Forwarding successful build notification");
        Some(forwarded)
    }
}
