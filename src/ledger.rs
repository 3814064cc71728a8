//! Per-request list of conversions.

use crate::models::ConversionEvent;

/// Append-only, insertion-ordered conversions for a single beacon.
///
/// Values are opaque: no validation, no deduplication.
#[derive(Debug, Clone, Default)]
pub struct ConversionLedger {
    events: Vec<ConversionEvent>,
}

impl ConversionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sku: impl Into<String>, value: impl Into<String>) {
        self.events.push(ConversionEvent {
            sku: sku.into(),
            value: value.into(),
        });
    }

    pub fn all(&self) -> &[ConversionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
