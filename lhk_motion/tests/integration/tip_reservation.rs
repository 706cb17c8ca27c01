//! Integration test: concurrent tip reservation on a wash station grid.

use super::common::machine;
use lhk_motion::arm::HeldSlot;
use lhk_motion::tip_grid::{TIP_COLS, TIP_ROWS};
use lhk_motion::{SlotIndex, SlotState, TipState};
use std::collections::HashSet;
use std::sync::Barrier;
use std::thread;

const THREADS: usize = 12;

#[test]
fn clean_slots_go_to_exactly_that_many_callers() {
    let machine = machine();
    let station = machine.topology().wash_station(2).unwrap();
    let grid = station.tip_grid();
    grid.set_all(SlotState::Dirty);
    for col in [0, 2, 3] {
        grid.set_slot_state(SlotIndex::new(5, col), SlotState::Clean).unwrap();
    }

    let barrier = Barrier::new(THREADS);
    let results: Vec<Option<SlotIndex>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    grid.reserve_tip(5)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let granted: Vec<SlotIndex> = results.iter().flatten().copied().collect();
    assert_eq!(granted.len(), 3);
    assert_eq!(results.iter().filter(|r| r.is_none()).count(), THREADS - 3);
    let distinct: HashSet<SlotIndex> = granted.iter().copied().collect();
    assert_eq!(distinct.len(), 3);
    assert_eq!(grid.count_in_state_in_row(SlotState::InUse, 5), 3);
    assert_eq!(grid.count_in_state(SlotState::Clean), 0);
}

#[test]
fn rows_are_reserved_independently() {
    let machine = machine();
    let grid = machine.topology().wash_station(2).unwrap().tip_grid();
    grid.set_all(SlotState::Clean);

    let results: Vec<Vec<SlotIndex>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..TIP_ROWS)
            .map(|row| {
                scope.spawn(move || {
                    let mut mine = Vec::new();
                    while let Some(slot) = grid.reserve_tip(row) {
                        mine.push(slot);
                    }
                    mine
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (row, slots) in results.iter().enumerate() {
        assert_eq!(slots.len(), TIP_COLS);
        assert!(slots.iter().all(|slot| slot.row == row));
    }
    assert_eq!(grid.count_in_state(SlotState::InUse), TIP_ROWS * TIP_COLS);
}

#[test]
fn reserved_slot_is_located_for_the_arm() {
    let machine = machine();
    let topology = machine.topology();
    let station = topology.wash_station(2).unwrap();
    let arm = topology.arm(1).unwrap();
    station.tip_grid().set_slot_state(SlotIndex::new(0, 1), SlotState::Clean).unwrap();

    let slot = station.tip_grid().reserve_tip(0).unwrap();
    arm.set_held_slot(Some(HeldSlot { station: 2, slot }));
    arm.set_tip_state(TipState::PressingTip);

    // Stage 2 center seen by arm 1 is (320, 130)
    let (x, y) = station.tip_slot_position(slot, 1).unwrap();
    assert_eq!(x, 309.5);
    assert_eq!(y, 62.5);
    assert_eq!(arm.held_slot().unwrap().slot, SlotIndex::new(0, 1));
    assert_eq!(arm.tip_state(), TipState::PressingTip);

    // No calibration of stage 2 for arm 2
    assert!(station.tip_slot_position(slot, 2).is_err());
}
