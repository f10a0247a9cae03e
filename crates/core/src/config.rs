//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into services. Request
//! handling never reads process environment variables; the `*_from_env_value` helpers take the
//! raw value so binaries own the environment lookup and tests stay hermetic.

use crate::constants::{DEFAULT_DISPLAY_NEXT_UP, MAX_DISPLAY_NEXT_UP};
use crate::{QueueError, QueueResult};
use queue_types::NonEmptyText;
use std::fmt;
use std::str::FromStr;

/// What `serve_next`/`recall_patient` do when the counter is already serving an entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlreadyServingPolicy {
    /// Fail with [`QueueError::AlreadyServing`]; the operator must skip or complete first.
    #[default]
    Reject,
    /// Complete the current entry, then serve the next one, as one transition.
    AutoComplete,
}

impl AlreadyServingPolicy {
    /// Canonical spelling, accepted back by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::AutoComplete => "auto-complete",
        }
    }
}

impl fmt::Display for AlreadyServingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlreadyServingPolicy {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "auto-complete" | "auto_complete" | "autocomplete" => Ok(Self::AutoComplete),
            other => Err(QueueError::InvalidInput(format!(
                "unknown already-serving policy '{other}' (expected 'reject' or 'auto-complete')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    already_serving: AlreadyServingPolicy,
    display_next_up: usize,
    seed_counters: Vec<NonEmptyText>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidInput`] if `display_next_up` exceeds
    /// [`MAX_DISPLAY_NEXT_UP`] or two seed counters share a title.
    pub fn new(
        already_serving: AlreadyServingPolicy,
        display_next_up: usize,
        seed_counters: Vec<NonEmptyText>,
    ) -> QueueResult<Self> {
        if display_next_up > MAX_DISPLAY_NEXT_UP {
            return Err(QueueError::InvalidInput(format!(
                "display_next_up must be at most {MAX_DISPLAY_NEXT_UP}, got {display_next_up}"
            )));
        }

        for (i, title) in seed_counters.iter().enumerate() {
            if seed_counters[..i].contains(title) {
                return Err(QueueError::InvalidInput(format!(
                    "duplicate seed counter title: {title}"
                )));
            }
        }

        Ok(Self {
            already_serving,
            display_next_up,
            seed_counters,
        })
    }

    pub fn already_serving(&self) -> AlreadyServingPolicy {
        self.already_serving
    }

    pub fn display_next_up(&self) -> usize {
        self.display_next_up
    }

    /// Counter titles created when the server starts, numbered from 1 in order.
    pub fn seed_counters(&self) -> &[NonEmptyText] {
        &self.seed_counters
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            already_serving: AlreadyServingPolicy::default(),
            display_next_up: DEFAULT_DISPLAY_NEXT_UP,
            seed_counters: Vec::new(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the already-serving policy. Missing or blank values give the default (`Reject`).
pub fn already_serving_policy_from_env_value(
    value: Option<String>,
) -> QueueResult<AlreadyServingPolicy> {
    Ok(non_blank(value)
        .map(|v| v.parse::<AlreadyServingPolicy>())
        .transpose()?
        .unwrap_or_default())
}

/// Parse the number of upcoming entries shown per counter on the display board.
pub fn display_next_up_from_env_value(value: Option<String>) -> QueueResult<usize> {
    non_blank(value)
        .map(|v| {
            v.parse::<usize>().map_err(|e| {
                QueueError::InvalidInput(format!("invalid display next-up count '{v}': {e}"))
            })
        })
        .transpose()
        .map(|n| n.unwrap_or(DEFAULT_DISPLAY_NEXT_UP))
}

/// Parse a comma-separated list of counter titles. Empty segments are ignored.
pub fn seed_counters_from_env_value(value: Option<String>) -> QueueResult<Vec<NonEmptyText>> {
    let Some(value) = non_blank(value) else {
        return Ok(Vec::new());
    };

    Ok(value
        .split(',')
        .filter_map(|title| NonEmptyText::new(title).ok())
        .collect())
}
