//! Request-scoped store of signed cookies.
//!
//! A [`CookieStore`] is built once per request from the inbound `Cookie`
//! header. Reads verify the signed token and transparently discard anything
//! that fails verification; writes and deletes queue [`CookieRecord`]s that
//! the caller turns into `Set-Cookie` headers on the response.
//!
//! # Corruption handling
//!
//! A cookie whose token does not verify is treated exactly like a missing
//! one: the store queues an expiring `Set-Cookie` for it, drops it from the
//! inbound view, reports the failure to the [`ErrorReporter`](crate::reporter::ErrorReporter),
//! and returns [`CookieError::NotFound`]. The deletion sentinels `"0"` and
//! `""` are discarded the same way but never reported.
//!
//! # Deletion
//!
//! Deleting sets the value to `0` (some browsers store the literal
//! `deleted` for empty values) and the expiry 25 hours in the past, which
//! covers browsers that evaluate expiry in local time in any timezone.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CookieError;
use crate::models::CookieRecord;
use crate::reporter::ErrorReporterHandle;
use crate::signer;

/// Path used when the caller does not scope a cookie.
pub const DEFAULT_PATH: &str = "/";

/// Default cookie lifetime in days.
pub const DEFAULT_LIFETIME_DAYS: i64 = 90;

/// Value written when deleting a cookie.
pub const DELETION_SENTINEL: &str = "0";

/// How far in the past a deleted cookie's expiry is placed.
pub const DELETION_BACKDATE_HOURS: i64 = 25;

/// When a written cookie should expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CookieExpiry {
    /// The store's configured lifetime from now.
    #[default]
    Default,
    /// An absolute point in time.
    At(DateTime<Utc>),
    /// A duration from now.
    In(Duration),
}

/// Signed cookies for a single request.
///
/// Holds the inbound cookies sent by the client and the records queued for
/// the response. Never shared between requests.
pub struct CookieStore {
    /// Secret used to sign and verify tokens.
    salt: String,
    /// Lifetime applied by [`CookieExpiry::Default`].
    lifetime: Duration,
    /// Receives integrity failures found while reading.
    reporter: ErrorReporterHandle,
    /// Raw inbound values by name; deleted names are removed.
    inbound: HashMap<String, String>,
    /// Records to emit as `Set-Cookie` headers.
    outbound: Vec<CookieRecord>,
}

impl CookieStore {
    /// Creates a store for one request.
    ///
    /// `cookie_header` is the raw inbound `Cookie` header, if the client sent one.
    pub fn new(
        salt: impl Into<String>,
        lifetime: Duration,
        reporter: ErrorReporterHandle,
        cookie_header: Option<&str>,
    ) -> Self {
        Self {
            salt: salt.into(),
            lifetime,
            reporter,
            inbound: cookie_header.map(parse_cookie_header).unwrap_or_default(),
            outbound: Vec::new(),
        }
    }

    /// Whether the client sent a cookie called `name`. Does not verify it.
    pub fn contains(&self, name: &str) -> bool {
        self.inbound.contains_key(name)
    }

    /// Reads and verifies the cookie `name`.
    ///
    /// Corrupted cookies are deleted and reported, then surface as
    /// [`CookieError::NotFound`]; callers never see a signature failure.
    pub fn read<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, CookieError> {
        let raw = self
            .inbound
            .get(name)
            .cloned()
            .ok_or_else(|| CookieError::NotFound(name.to_string()))?;

        match signer::verify(&raw, &self.salt) {
            Ok(value) => Ok(value),
            Err(err) => {
                if !is_deletion_sentinel(&raw) {
                    self.reporter.report_integrity_failure(name, &err);
                }
                self.delete(name, DEFAULT_PATH);
                Err(CookieError::NotFound(name.to_string()))
            }
        }
    }

    /// Signs `value` and queues a `Set-Cookie` for it.
    ///
    /// Writing the same name and path again replaces the queued record.
    /// An expiry outside chrono's representable range is rejected with
    /// [`CookieError::ExpiryOutOfRange`].
    pub fn write<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
        expiry: CookieExpiry,
        path: &str,
    ) -> Result<(), CookieError> {
        let token = signer::sign(value, &self.salt)?;
        let expires = match expiry {
            CookieExpiry::Default => Utc::now().checked_add_signed(self.lifetime),
            CookieExpiry::At(at) => Some(at),
            CookieExpiry::In(delta) => Utc::now().checked_add_signed(delta),
        }
        .ok_or_else(|| CookieError::ExpiryOutOfRange(name.to_string()))?;

        self.queue(CookieRecord {
            name: name.to_string(),
            value: token,
            expires,
            path: path.to_string(),
        });
        Ok(())
    }

    /// Queues an expiring `Set-Cookie` for `name` and forgets the inbound value.
    pub fn delete(&mut self, name: &str, path: &str) {
        self.queue(CookieRecord {
            name: name.to_string(),
            value: DELETION_SENTINEL.to_string(),
            expires: Utc::now() - Duration::hours(DELETION_BACKDATE_HOURS),
            path: path.to_string(),
        });
        self.inbound.remove(name);
    }

    /// Records queued for the response, in first-write order.
    pub fn pending(&self) -> &[CookieRecord] {
        &self.outbound
    }

    /// `Set-Cookie` header values for every queued record.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.outbound.iter().map(format_set_cookie).collect()
    }

    fn queue(&mut self, record: CookieRecord) {
        if let Some(existing) = self
            .outbound
            .iter_mut()
            .find(|c| c.name == record.name && c.path == record.path)
        {
            *existing = record;
        } else {
            self.outbound.push(record);
        }
    }
}

/// Values browsers are left holding after a deletion. Not worth reporting.
fn is_deletion_sentinel(raw: &str) -> bool {
    raw.is_empty() || raw == DELETION_SENTINEL
}

/// Whether `name` is a valid cookie name: an RFC 6265 / RFC 2616 token of
/// visible ASCII without separators.
pub fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')'
                        | b'<'
                        | b'>'
                        | b'@'
                        | b','
                        | b';'
                        | b':'
                        | b'\\'
                        | b'"'
                        | b'/'
                        | b'['
                        | b']'
                        | b'?'
                        | b'='
                        | b'{'
                        | b'}'
                )
        })
}

/// Parses a `Cookie` request header into name/value pairs.
///
/// Pairs are separated by `;`. Surrounding whitespace is trimmed, fragments
/// without `=` are skipped, and the first occurrence of a name wins.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        if let Some((name, value)) = pair.split_once('=') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            cookies
                .entry(name.to_string())
                .or_insert_with(|| value.trim().trim_matches('"').to_string());
        }
    }
    cookies
}

/// Renders `record` as a `Set-Cookie` header value.
pub fn format_set_cookie(record: &CookieRecord) -> String {
    format!(
        "{}={}; Expires={}; Path={}",
        record.name,
        record.value,
        record.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
        record.path
    )
}
