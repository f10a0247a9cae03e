//! "Now serving" board wire models.
//!
//! `now_serving` is the queue number or absent; `now_serving_text` is what a screen shows,
//! including the placeholder for an idle or unknown counter.

use crate::{parse_counter_id, parse_number, WireResult};
use queue_core::{CounterDisplay, NowServing, NowServingBoard};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CounterDisplayWire {
    pub counter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_number: Option<u32>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now_serving: Option<u32>,
    pub now_serving_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_called: Option<u32>,
    pub waiting_count: usize,
    pub is_active: bool,
    pub next_up: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BoardWire {
    pub counters: Vec<CounterDisplayWire>,
}

pub fn board_to_wire(board: &NowServingBoard) -> BoardWire {
    BoardWire {
        counters: board.counters.iter().map(counter_display_to_wire).collect(),
    }
}

fn counter_display_to_wire(row: &CounterDisplay) -> CounterDisplayWire {
    CounterDisplayWire {
        counter_id: row.counter_id.to_string(),
        counter_number: row.counter_number,
        title: row.title.clone(),
        now_serving: match row.now_serving {
            NowServing::Number(n) => Some(n.get()),
            NowServing::Placeholder => None,
        },
        now_serving_text: row.now_serving.to_string(),
        last_called: row.last_called.map(|n| n.get()),
        waiting_count: row.waiting_count,
        is_active: row.is_active,
        next_up: row.next_up.iter().map(|n| n.get()).collect(),
    }
}

/// Convert a wire board back into a [`NowServingBoard`], e.g. for rendering in the CLI.
pub fn board_from_wire(wire: BoardWire) -> WireResult<NowServingBoard> {
    let counters = wire
        .counters
        .into_iter()
        .map(counter_display_from_wire)
        .collect::<WireResult<Vec<_>>>()?;
    Ok(NowServingBoard { counters })
}

fn counter_display_from_wire(wire: CounterDisplayWire) -> WireResult<CounterDisplay> {
    Ok(CounterDisplay {
        counter_id: parse_counter_id("counter_id", &wire.counter_id)?,
        counter_number: wire.counter_number,
        title: wire.title,
        now_serving: match wire.now_serving {
            Some(n) => NowServing::Number(parse_number("now_serving", n)?),
            None => NowServing::Placeholder,
        },
        last_called: wire
            .last_called
            .map(|n| parse_number("last_called", n))
            .transpose()?,
        waiting_count: wire.waiting_count,
        is_active: wire.is_active,
        next_up: wire
            .next_up
            .into_iter()
            .map(|n| parse_number("next_up", n))
            .collect::<WireResult<Vec<_>>>()?,
    })
}
