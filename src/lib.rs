//! # Visitor Beacon
//!
//! Tamper-evident visitor identification and conversion beacons for
//! tracking pixels.
//!
//! A visitor id is kept in an HMAC-signed cookie. Tampered or corrupted
//! cookies are detected, deleted, reported, and replaced with a fresh id
//! without the visitor noticing. Conversions recorded during a request are
//! encoded, together with the id and referrer, into a single beacon URL
//! rendered as a hidden 1x1 image.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ VisitorIdentity │──▶│   CookieStore    │──▶│  Signer  │
//! └────────┬────────┘   └──────────────────┘   └──────────┘
//!          │ id
//!          ▼
//! ┌─────────────────┐   ┌──────────────────┐
//! │  BeaconBuilder  │◀──│ ConversionLedger │
//! └────────┬────────┘   └──────────────────┘
//!          ▼
//!    <img src="https://endpoint/site?uid=…">
//! ```
//!
//! [`context::Tracker`] wires these together for one request.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`signer`] | HMAC-signed token encoding |
//! | [`cookies`] | Request-scoped signed cookie store |
//! | [`identity`] | Get-or-create visitor id |
//! | [`ledger`] | Per-request conversion list |
//! | [`beacon`] | Beacon URL and pixel markup |
//! | [`context`] | Inbound request context and per-request tracker |
//! | [`reporter`] | Non-fatal error reporting |
//! | [`config`] | TOML configuration parsing |
//! | [`server`] | HTTP server |
//! | [`models`] | Core data types |
//! | [`error`] | Error types |

pub mod beacon;
pub mod config;
pub mod context;
pub mod cookies;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod reporter;
pub mod server;
pub mod signer;
