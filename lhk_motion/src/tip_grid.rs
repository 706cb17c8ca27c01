//! Tip inventory grid of a wash station.
//!
//! 16 rows × 4 columns of tip slots. Slot world positions derive from the
//! owning stage's calibrated center: a fixed column offset table in X and
//! a 9 mm row pitch in Y, rows centered on the stage.
//!
//! Reservation is the grid's own atomic check-and-set; every other state
//! change is driven by the caller.

use crate::error::{MotionError, MotionResult};
use parking_lot::Mutex;
use std::fmt;
use tracing::trace;

/// Number of rows.
pub const TIP_ROWS: usize = 16;

/// Number of columns.
pub const TIP_COLS: usize = 4;

/// Row pitch [mm].
pub const ROW_PITCH_MM: f64 = 9.0;

/// X offset of each column from the stage center [mm].
pub const COLUMN_OFFSETS_MM: [f64; TIP_COLS] = [-25.5, -10.5, 10.5, 25.5];

/// Lifecycle of one tip slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotState {
    /// No tip.
    #[default]
    Empty,
    /// Washed tip ready for pickup.
    Clean,
    /// Reserved by an arm.
    InUse,
    /// Used tip waiting for a wash.
    Dirty,
}

/// Position of a slot in the grid (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex {
    /// Row.
    pub row: usize,
    /// Column.
    pub col: usize,
}

impl SlotIndex {
    /// Slot at `row`, `col`.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    fn in_range(&self) -> bool {
        self.row < TIP_ROWS && self.col < TIP_COLS
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.row, self.col)
    }
}

/// Grid of tip slots.
#[derive(Debug, Default)]
pub struct TipGrid {
    slots: Mutex<[[SlotState; TIP_COLS]; TIP_ROWS]>,
}

impl TipGrid {
    /// Grid with every slot empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the first clean slot of `row`, marking it in use.
    ///
    /// Returns `None` when the row has no clean slot or does not exist.
    pub fn reserve_tip(&self, row: usize) -> Option<SlotIndex> {
        let mut slots = self.slots.lock();
        let cols = slots.get_mut(row)?;
        let col = cols.iter().position(|s| *s == SlotState::Clean)?;
        cols[col] = SlotState::InUse;
        trace!("Tip slot [{},{}] reserved", row, col);
        Some(SlotIndex { row, col })
    }

    /// State of one slot; `None` when out of range.
    pub fn slot_state(&self, slot: SlotIndex) -> Option<SlotState> {
        if !slot.in_range() {
            return None;
        }
        Some(self.slots.lock()[slot.row][slot.col])
    }

    /// Set the state of one slot.
    pub fn set_slot_state(&self, slot: SlotIndex, state: SlotState) -> MotionResult<()> {
        if !slot.in_range() {
            return Err(MotionError::InvalidArgument(format!(
                "tip slot {slot} outside {TIP_ROWS}x{TIP_COLS} grid"
            )));
        }
        self.slots.lock()[slot.row][slot.col] = state;
        Ok(())
    }

    /// Set every slot to `state`.
    pub fn set_all(&self, state: SlotState) {
        *self.slots.lock() = [[state; TIP_COLS]; TIP_ROWS];
    }

    /// Number of slots in `state`.
    pub fn count_in_state(&self, state: SlotState) -> usize {
        self.slots
            .lock()
            .iter()
            .flatten()
            .filter(|s| **s == state)
            .count()
    }

    /// Number of slots of `row` in `state`; 0 for a row outside the grid.
    pub fn count_in_state_in_row(&self, state: SlotState, row: usize) -> usize {
        self.slots
            .lock()
            .get(row)
            .map_or(0, |cols| cols.iter().filter(|s| **s == state).count())
    }

    /// Whether every slot is dirty.
    pub fn is_all_dirty(&self) -> bool {
        self.count_in_state(SlotState::Dirty) == TIP_ROWS * TIP_COLS
    }

    /// World `(x, y)` of `slot` given the stage center seen by an arm.
    pub fn slot_xy(slot: SlotIndex, center: (f64, f64)) -> MotionResult<(f64, f64)> {
        if !slot.in_range() {
            return Err(MotionError::InvalidArgument(format!(
                "tip slot {slot} outside {TIP_ROWS}x{TIP_COLS} grid"
            )));
        }
        let (cx, cy) = center;
        let half_span = (TIP_ROWS as f64 - 1.0) / 2.0;
        Ok((
            cx + COLUMN_OFFSETS_MM[slot.col],
            cy - (half_span - slot.row as f64) * ROW_PITCH_MM,
        ))
    }
}
