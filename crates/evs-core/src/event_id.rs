//! Composite event identifier.

use std::fmt;

/// Identifies one collision event across independently produced datasets.
///
/// Ordering is lexicographic over `(run, lumi, event, sample_id)`, which the
/// derived `Ord` gives by field declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId {
    /// Run number.
    pub run: u64,
    /// Luminosity block.
    pub lumi: u64,
    /// Event number.
    pub event: u64,
    /// Sample id, [`EventId::UNDEF`] when the dataset does not provide one.
    pub sample_id: u64,
}

impl EventId {
    /// Sentinel value for an undefined component.
    pub const UNDEF: u64 = u64::MAX;

    /// Fully undefined identifier (placeholder / not-found marker).
    pub const UNDEFINED: EventId =
        EventId { run: Self::UNDEF, lumi: Self::UNDEF, event: Self::UNDEF, sample_id: Self::UNDEF };

    /// Identifier without a sample id.
    pub fn new(run: u64, lumi: u64, event: u64) -> Self {
        Self { run, lumi, event, sample_id: Self::UNDEF }
    }

    /// Identifier with an explicit sample id.
    pub fn with_sample(run: u64, lumi: u64, event: u64, sample_id: u64) -> Self {
        Self { run, lumi, event, sample_id }
    }

    /// Whether the sample id component is set.
    pub fn has_sample_id(&self) -> bool {
        self.sample_id != Self::UNDEF
    }

    /// Field legend matching the [`Display`](fmt::Display) layout.
    pub fn legend(&self) -> &'static str {
        if self.has_sample_id() { "run:lumi:evt:sample" } else { "run:lumi:evt" }
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.run, self.lumi, self.event)?;
        if self.has_sample_id() {
            write!(f, ":{}", self.sample_id)?;
        }
        Ok(())
    }
}
