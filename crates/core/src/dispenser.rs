use chrono::{NaiveDate, Utc};
use queue_types::QueueNumber;

/// Issues queue numbers at check-in.
///
/// Numbers start at 1 each facility-day and increase by one per ticket, so a number is unique
/// within the day it was issued. The day is the UTC calendar date.
#[derive(Clone, Debug)]
pub struct TicketDispenser {
    day: NaiveDate,
    next: QueueNumber,
}

impl TicketDispenser {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            day: today,
            next: QueueNumber::FIRST,
        }
    }

    pub fn starting_today() -> Self {
        Self::new(Utc::now().date_naive())
    }

    /// Issues the next number for `today`, resetting to 1 when the day has changed.
    pub fn issue(&mut self, today: NaiveDate) -> QueueNumber {
        if today != self.day {
            self.day = today;
            self.next = QueueNumber::FIRST;
        }
        let issued = self.next;
        self.next = issued.next();
        issued
    }

    pub fn issue_now(&mut self) -> QueueNumber {
        self.issue(Utc::now().date_naive())
    }

    /// The number the next ticket will carry, without issuing it.
    pub fn peek(&self) -> QueueNumber {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).expect("valid date")
    }

    #[test]
    fn numbers_are_sequential_within_a_day() {
        let mut dispenser = TicketDispenser::new(day(1));
        let issued: Vec<u32> = (0..4).map(|_| dispenser.issue(day(1)).get()).collect();
        assert_eq!(issued, vec![1, 2, 3, 4]);
        assert_eq!(dispenser.peek().get(), 5);
    }

    #[test]
    fn new_day_restarts_at_one() {
        let mut dispenser = TicketDispenser::new(day(1));
        dispenser.issue(day(1));
        dispenser.issue(day(1));
        assert_eq!(dispenser.issue(day(2)).get(), 1);
        assert_eq!(dispenser.issue(day(2)).get(), 2);
    }
}
