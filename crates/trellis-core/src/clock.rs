use chrono::{DateTime, Utc};

/// Source of "now" for publish timestamps and validity checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    #[must_use]
    pub const fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }

    /// Clock advanced by `delta`, saturating at the representable range.
    #[must_use]
    pub fn advanced(self, delta: chrono::Duration) -> Self {
        Self {
            at: self.at.checked_add_signed(delta).unwrap_or(self.at),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }
}
