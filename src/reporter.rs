//! Error reporting collaborator.
//!
//! The cookie store hands non-fatal integrity failures to an
//! [`ErrorReporter`] and carries on with the request. Reporters are shared
//! across concurrent requests, so implementations must be `Send + Sync`.

use std::sync::{Arc, Mutex};

use crate::error::SignerError;

/// Receives non-fatal failures. Must never panic or block the request.
pub trait ErrorReporter: Send + Sync {
    /// Called once for each corrupted cookie that was discarded.
    fn report_integrity_failure(&self, cookie_name: &str, error: &SignerError);
}

/// Shared handle to a type-erased reporter.
pub type ErrorReporterHandle = Arc<dyn ErrorReporter>;

/// Default reporter: emits a `warn` event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report_integrity_failure(&self, cookie_name: &str, error: &SignerError) {
        tracing::warn!(cookie = cookie_name, error = %error, "discarding corrupted cookie");
    }
}

/// Keeps every report in memory. Useful in tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the reports so far, formatted as `"<cookie>: <error>"`.
    pub fn reports(&self) -> Vec<String> {
        match self.reports.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.reports().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorReporter for RecordingReporter {
    fn report_integrity_failure(&self, cookie_name: &str, error: &SignerError) {
        let entry = format!("{}: {}", cookie_name, error);
        match self.reports.lock() {
            Ok(mut guard) => guard.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_reporter_collects_in_order() {
        let reporter = RecordingReporter::new();
        assert!(reporter.is_empty());

        reporter.report_integrity_failure("a", &SignerError::Integrity);
        reporter.report_integrity_failure("b", &SignerError::Malformed("short".into()));

        let reports = reporter.reports();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].starts_with("a: "));
        assert!(reports[1].contains("short"));
    }

    #[test]
    fn test_reporter_handle_is_shareable() {
        let recorder = Arc::new(RecordingReporter::new());
        let handle: ErrorReporterHandle = recorder.clone();
        handle.report_integrity_failure("visitor", &SignerError::Integrity);
        assert_eq!(recorder.len(), 1);
    }
}
