use crate::{IdError, IdResult};
use std::fmt;

/// Ticket number shown to the patient and called out at the counter.
///
/// Numbers are positive and unique within a facility-day; zero is never issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueNumber(u32);

impl QueueNumber {
    /// The first number issued each facility-day.
    pub const FIRST: QueueNumber = QueueNumber(1);

    /// Creates a queue number, rejecting zero.
    pub fn new(value: u32) -> IdResult<Self> {
        if value == 0 {
            return Err(IdError::InvalidInput(
                "queue number must be greater than zero".into(),
            ));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Returns the number that follows this one, saturating at `u32::MAX`.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for QueueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(QueueNumber::new(0).is_err());
        assert_eq!(QueueNumber::new(7).expect("positive").get(), 7);
    }

    #[test]
    fn next_increments() {
        assert_eq!(QueueNumber::FIRST.next().get(), 2);
        let max = QueueNumber::new(u32::MAX).expect("positive");
        assert_eq!(max.next(), max);
    }
}
