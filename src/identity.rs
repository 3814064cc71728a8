//! Durable visitor identity backed by a signed cookie.

use uuid::Uuid;

use crate::cookies::{CookieExpiry, CookieStore, DEFAULT_PATH};
use crate::error::CookieError;

/// Resolves the visitor id for one request.
///
/// The id lives in the cookie `<site>_visitor_id`. An existing, validly
/// signed id is returned untouched (no rewrite, no expiry refresh). When the
/// cookie is absent or corrupted a fresh UUID is minted and written once.
/// The resolved id is cached, so repeated calls in a request agree.
#[derive(Debug, Clone)]
pub struct VisitorIdentity {
    cookie_name: String,
    resolved: Option<String>,
}

impl VisitorIdentity {
    pub fn new(site_shortname: &str) -> Self {
        Self {
            cookie_name: cookie_name_for(site_shortname),
            resolved: None,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Returns the visitor id, creating and persisting one if needed.
    pub fn get_or_create(&mut self, store: &mut CookieStore) -> Result<String, CookieError> {
        if let Some(id) = &self.resolved {
            return Ok(id.clone());
        }

        let id = match store.read::<String>(&self.cookie_name) {
            Ok(id) => id,
            Err(_) => {
                let id = Uuid::new_v4().to_string();
                store.write(&self.cookie_name, &id, CookieExpiry::Default, DEFAULT_PATH)?;
                tracing::debug!(cookie = %self.cookie_name, visitor = %id, "issued new visitor id");
                id
            }
        };

        self.resolved = Some(id.clone());
        Ok(id)
    }
}

/// Cookie name holding the visitor id for `site_shortname`.
///
/// Configuration only accepts shortnames for which this is a cookie token
/// (see [`is_cookie_token`](crate::cookies::is_cookie_token)).
pub fn cookie_name_for(site_shortname: &str) -> String {
    format!("{}_visitor_id", site_shortname)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::DELETION_SENTINEL;
    use crate::reporter::RecordingReporter;
    use crate::signer;
    use chrono::Duration;
    use std::sync::Arc;

    const SALT: &str = "identity-salt";

    fn store(header: Option<&str>) -> (CookieStore, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::new());
        let store = CookieStore::new(SALT, Duration::days(90), reporter.clone(), header);
        (store, reporter)
    }

    #[test]
    fn test_cookie_name() {
        assert_eq!(VisitorIdentity::new("acme").cookie_name(), "acme_visitor_id");
    }

    #[test]
    fn test_existing_id_returned_without_rewrite() {
        let token = signer::sign("abc123", SALT).unwrap();
        let header = format!("acme_visitor_id={}", token);
        let (mut store, _) = store(Some(&header));
        let mut identity = VisitorIdentity::new("acme");

        assert_eq!(identity.get_or_create(&mut store).unwrap(), "abc123");
        assert!(store.pending().is_empty());
    }

    #[test]
    fn test_new_id_written_once_and_stable() {
        let (mut store, _) = store(None);
        let mut identity = VisitorIdentity::new("acme");

        let first = identity.get_or_create(&mut store).unwrap();
        let second = identity.get_or_create(&mut store).unwrap();
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());

        let pending = store.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "acme_visitor_id");
        let persisted: String = signer::verify(&pending[0].value, SALT).unwrap();
        assert_eq!(persisted, first);
    }

    #[test]
    fn test_corrupted_cookie_replaced() {
        let (mut store, reporter) = store(Some("acme_visitor_id=tampered.0000"));
        let mut identity = VisitorIdentity::new("acme");

        let id = identity.get_or_create(&mut store).unwrap();
        assert_eq!(reporter.len(), 1);

        // The deletion record is superseded by the fresh identity on the same path.
        let pending = store.pending();
        assert_eq!(pending.len(), 1);
        assert_ne!(pending[0].value, DELETION_SENTINEL);
        let persisted: String = signer::verify(&pending[0].value, SALT).unwrap();
        assert_eq!(persisted, id);
    }

    #[test]
    fn test_distinct_visitors_get_distinct_ids() {
        let (mut a_store, _) = store(None);
        let (mut b_store, _) = store(None);
        let a = VisitorIdentity::new("acme").get_or_create(&mut a_store).unwrap();
        let b = VisitorIdentity::new("acme").get_or_create(&mut b_store).unwrap();
        assert_ne!(a, b);
    }
}
