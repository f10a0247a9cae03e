//! "Now serving" board projection.
//!
//! A pure read over [`ServingController`]: nothing here can mutate queue state. Missing data
//! renders as a placeholder rather than an error, so a waiting-room screen keeps showing the
//! counters it can while one is misconfigured or still loading.

use crate::constants::DISPLAY_PLACEHOLDER;
use crate::controller::ServingController;
use queue_types::{CounterId, QueueNumber};
use std::fmt;

/// Title shown for a counter the board was asked about but does not know.
pub const UNKNOWN_COUNTER_TITLE: &str = "Counter unavailable";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NowServing {
    Number(QueueNumber),
    Placeholder,
}

impl fmt::Display for NowServing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NowServing::Number(n) => write!(f, "{n}"),
            NowServing::Placeholder => f.write_str(DISPLAY_PLACEHOLDER),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterDisplay {
    pub counter_id: CounterId,
    pub counter_number: Option<u32>,
    pub title: String,
    pub now_serving: NowServing,
    pub last_called: Option<QueueNumber>,
    pub waiting_count: usize,
    pub is_active: bool,
    pub next_up: Vec<QueueNumber>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NowServingBoard {
    pub counters: Vec<CounterDisplay>,
}

impl NowServingBoard {
    /// Plain-text rendering, one line per counter.
    pub fn render_text(&self) -> String {
        if self.counters.is_empty() {
            return "No counters configured.\n".to_string();
        }

        let mut out = String::new();
        for counter in &self.counters {
            let label = match counter.counter_number {
                Some(n) => format!("Counter {n}"),
                None => "Counter ?".to_string(),
            };
            let state = if counter.is_active { "" } else { " (closed)" };
            let next: Vec<String> = counter.next_up.iter().map(|n| n.to_string()).collect();
            out.push_str(&format!(
                "{label:<10} {title:<20} now serving {now:>5}  waiting {waiting:>3}",
                title = counter.title,
                now = counter.now_serving.to_string(),
                waiting = counter.waiting_count,
            ));
            if !next.is_empty() {
                out.push_str(&format!("  next {}", next.join(", ")));
            }
            out.push_str(state);
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for NowServingBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DisplayProjection {
    next_up: usize,
}

impl DisplayProjection {
    /// `next_up` is how many upcoming queue numbers to list per counter.
    pub fn new(next_up: usize) -> Self {
        Self { next_up }
    }

    /// Every known counter, ordered by counter number.
    pub fn board(&self, controller: &ServingController) -> NowServingBoard {
        let counters = controller
            .counters()
            .into_iter()
            .map(|c| self.counter(controller, c.id()))
            .collect();
        NowServingBoard { counters }
    }

    /// The requested counters in the requested order; unknown ids become placeholder rows.
    pub fn board_for(&self, controller: &ServingController, ids: &[CounterId]) -> NowServingBoard {
        NowServingBoard {
            counters: ids.iter().map(|id| self.counter(controller, *id)).collect(),
        }
    }

    pub fn counter(&self, controller: &ServingController, counter_id: CounterId) -> CounterDisplay {
        let Ok(counter) = controller.counter(counter_id) else {
            return CounterDisplay {
                counter_id,
                counter_number: None,
                title: UNKNOWN_COUNTER_TITLE.to_string(),
                now_serving: NowServing::Placeholder,
                last_called: None,
                waiting_count: 0,
                is_active: false,
                next_up: Vec::new(),
            };
        };

        let waiting = controller.store().list(counter_id);
        CounterDisplay {
            counter_id,
            counter_number: Some(counter.counter_number()),
            title: counter.title().to_string(),
            now_serving: counter
                .current_number()
                .map(NowServing::Number)
                .unwrap_or(NowServing::Placeholder),
            last_called: counter.last_called(),
            waiting_count: waiting.len(),
            is_active: counter.is_active(),
            next_up: waiting
                .iter()
                .take(self.next_up)
                .map(|e| e.queue_number)
                .collect(),
        }
    }
}
