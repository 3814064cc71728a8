//! Per-request wiring of the beacon components.
//!
//! [`Tracker`] is the entry point for request handlers: build one per
//! request from the shared [`BeaconSettings`](crate::config::BeaconSettings),
//! an error reporter, and the inbound [`RequestContext`]; record
//! conversions; render the pixel; copy the `Set-Cookie` headers onto the
//! response. Nothing in a `Tracker` outlives its request.

use axum::http::{header, HeaderMap};

use crate::beacon::BeaconBuilder;
use crate::config::SharedSettings;
use crate::cookies::CookieStore;
use crate::error::CookieError;
use crate::identity::VisitorIdentity;
use crate::ledger::ConversionLedger;
use crate::models::BeaconRequest;
use crate::reporter::ErrorReporterHandle;

/// What the subsystem needs from the inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// `Referer` header, if present and non-empty.
    pub referrer: Option<String>,
    /// Raw `Cookie` header value.
    pub cookie_header: Option<String>,
}

impl RequestContext {
    pub fn new(referrer: Option<String>, cookie_header: Option<String>) -> Self {
        Self {
            referrer,
            cookie_header,
        }
    }

    /// Extracts `Referer` and `Cookie` from request headers.
    ///
    /// Multiple `Cookie` headers (as sent over HTTP/2) are joined with `"; "`.
    /// An empty `Referer` counts as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let referrer = headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let cookies: Vec<&str> = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let cookie_header = if cookies.is_empty() {
            None
        } else {
            Some(cookies.join("; "))
        };

        Self::new(referrer, cookie_header)
    }
}

/// Request-scoped façade over identity, conversions, and the beacon.
///
/// Build one per request; it owns the request's [`CookieStore`] and
/// [`ConversionLedger`] and shares only the immutable settings.
pub struct Tracker {
    /// Process-wide settings (read-only).
    settings: SharedSettings,
    /// Referrer forwarded into the beacon.
    referrer: Option<String>,
    cookies: CookieStore,
    identity: VisitorIdentity,
    ledger: ConversionLedger,
    builder: BeaconBuilder,
    /// Set once the pixel markup has been handed out.
    rendered: bool,
}

impl Tracker {
    pub fn new(
        settings: SharedSettings,
        reporter: ErrorReporterHandle,
        request: RequestContext,
    ) -> Self {
        let cookies = CookieStore::new(
            settings.salt.clone(),
            settings.cookie_lifetime,
            reporter,
            request.cookie_header.as_deref(),
        );
        let identity = VisitorIdentity::new(&settings.site_shortname);
        let builder = BeaconBuilder::new(settings.endpoint.clone());

        Self {
            settings,
            referrer: request.referrer,
            cookies,
            identity,
            ledger: ConversionLedger::new(),
            builder,
            rendered: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn add_conversion(&mut self, sku: impl Into<String>, value: impl Into<String>) {
        self.ledger.record(sku, value);
    }

    pub fn ledger(&self) -> &ConversionLedger {
        &self.ledger
    }

    /// The visitor id, or `None` when tracking is disabled.
    pub fn visitor_id(&mut self) -> Result<Option<String>, CookieError> {
        if !self.settings.enabled {
            return Ok(None);
        }
        self.identity.get_or_create(&mut self.cookies).map(Some)
    }

    /// Builds the beacon for the conversions recorded so far.
    ///
    /// Disabled trackers return `None` without touching cookies.
    pub fn beacon(&mut self) -> Result<Option<BeaconRequest>, CookieError> {
        let Some(visitor_id) = self.visitor_id()? else {
            return Ok(None);
        };

        Ok(self.builder.build(
            self.settings.enabled,
            &self.settings.site_shortname,
            &visitor_id,
            self.referrer.as_deref(),
            self.ledger.all(),
        ))
    }

    /// Pixel markup for this request.
    ///
    /// Only the first call yields markup; rendering twice would fire the
    /// beacon twice.
    pub fn display_pixel(&mut self) -> Result<Option<String>, CookieError> {
        if self.rendered {
            tracing::debug!("pixel already rendered for this request");
            return Ok(None);
        }

        let markup = self.beacon()?.map(|request| request.render());
        if markup.is_some() {
            self.rendered = true;
        }
        Ok(markup)
    }

    /// `Set-Cookie` values to attach to the response.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.cookies.set_cookie_headers()
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }
}
