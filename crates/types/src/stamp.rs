use chrono::{DateTime, Duration, Utc};
use std::fmt;
use uuid::Uuid;

/// A time-ordered stamp attached to every operator action.
///
/// Format when displayed:
/// `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`
///
/// Stamps order actions by when they were *issued*, not by when their network responses
/// arrive. A response for an action whose stamp is older than the latest stamp on the same
/// counter is stale and must not overwrite local state.
///
/// # Monotonicity
///
/// When [`ActionStamp::generate`] is given the previous stamp, the new timestamp is strictly
/// greater (bumped by 1 ms if the clock has not advanced or went backwards).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionStamp {
    issued_at: DateTime<Utc>,
    nonce: Uuid,
}

impl ActionStamp {
    /// Generate a stamp strictly after `last`, if given.
    pub fn generate(last: Option<&ActionStamp>) -> Self {
        let now = Utc::now();

        let issued_at = match last {
            Some(prev) if now <= prev.issued_at => prev.issued_at + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            issued_at,
            nonce: Uuid::new_v4(),
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// True when `self` was issued after `other`.
    pub fn is_newer_than(&self, other: &ActionStamp) -> bool {
        self > other
    }
}

impl fmt::Display for ActionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.issued_at.format("%Y%m%dT%H%M%S%.3fZ"),
            self.nonce.simple()
        )
    }
}
