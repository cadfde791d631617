//! The n-back match rule.

use crate::engine::History;
use crate::error::{Error, Result};

/// Compare the cell shown in `box_index` on turn `current` with the one shown
/// in the same box on turn `current - n`.
///
/// Refused with [`Error::QueryOutOfRange`] while fewer than `n` earlier turns
/// exist (including before the first turn, `current == None`), and with
/// [`Error::BoxOutOfRange`] for a box the frames do not have. Both are
/// refusals, not failures.
pub fn check(box_index: usize, current: Option<u64>, n: u32, history: &History) -> Result<bool> {
    let out_of_range = || Error::QueryOutOfRange { turn: current, n };

    let turn = current.ok_or_else(out_of_range)?;
    let past_turn = turn.checked_sub(u64::from(n)).ok_or_else(out_of_range)?;

    let now = history.get(turn).ok_or_else(out_of_range)?;
    let past = history.get(past_turn).ok_or_else(out_of_range)?;

    let box_out_of_range = || Error::BoxOutOfRange {
        box_index,
        box_count: now.box_count(),
    };
    let now_cell = now.cell(box_index).ok_or_else(box_out_of_range)?;
    let past_cell = past.cell(box_index).ok_or_else(box_out_of_range)?;

    Ok(now_cell == past_cell)
}
