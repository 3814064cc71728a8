//! Beacon URL assembly and pixel markup.
//!
//! # Wire format
//!
//! ```text
//! <endpoint>/<site>?uid=<id>[&referer=<referrer>][&sku<i>=<sku>&conversionvalue<i>=<value>]*
//! ```
//!
//! Every user-controlled field is form-urlencoded. Conversions keep their
//! recording order; `i` counts from 0.

use url::form_urlencoded;

use crate::models::{BeaconRequest, ConversionEvent};

/// Analytics host the pixel points at unless configured otherwise.
pub const DEFAULT_ENDPOINT: &str = "https://www.whitechipmunk.com";

/// Builds beacons against a fixed endpoint.
#[derive(Debug, Clone)]
pub struct BeaconBuilder {
    /// Endpoint base URL without trailing slash.
    endpoint: String,
}

impl Default for BeaconBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl BeaconBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Assembles a beacon, or `None` when tracking is disabled.
    pub fn build(
        &self,
        enabled: bool,
        site_id: &str,
        visitor_id: &str,
        referrer: Option<&str>,
        conversions: &[ConversionEvent],
    ) -> Option<BeaconRequest> {
        if !enabled {
            return None;
        }

        Some(BeaconRequest {
            endpoint: self.endpoint.clone(),
            site_id: site_id.to_string(),
            visitor_id: visitor_id.to_string(),
            referrer: referrer.map(str::to_string),
            conversions: conversions.to_vec(),
        })
    }
}

impl BeaconRequest {
    /// The full beacon URL.
    pub fn url(&self) -> String {
        let mut url = format!(
            "{}/{}?uid={}",
            self.endpoint,
            encode(&self.site_id),
            encode(&self.visitor_id)
        );

        if let Some(referrer) = &self.referrer {
            url.push_str("&referer=");
            url.push_str(&encode(referrer));
        }

        for (i, conversion) in self.conversions.iter().enumerate() {
            url.push_str(&format!(
                "&sku{i}={}&conversionvalue{i}={}",
                encode(&conversion.sku),
                encode(&conversion.value)
            ));
        }

        url
    }

    /// Hidden 1x1 image markup pointing at [`url`](Self::url).
    pub fn render(&self) -> String {
        format!(
            "<div style=\"display: none;\">\
             <img height=\"1\" width=\"1\" border=\"0\" src=\"{}\" /></div>",
            escape_html(&self.url())
        )
    }
}

fn encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Escapes text for HTML element content and quoted attribute values.
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
