//! Simulated digital output bank.

use lhk_common::hal::{IoFault, OutputPort};
use parking_lot::Mutex;
use tracing::trace;

#[derive(Debug)]
struct PortState {
    outputs: Vec<bool>,
    writes: Vec<(usize, bool)>,
}

/// In-memory output bank that records every write.
#[derive(Debug)]
pub struct SimOutputPort {
    state: Mutex<PortState>,
}

impl SimOutputPort {
    /// Bank with `count` outputs, all off.
    pub fn new(count: usize) -> Self {
        Self {
            state: Mutex::new(PortState {
                outputs: vec![false; count],
                writes: Vec::new(),
            }),
        }
    }

    /// Current state of `bit`; `None` when out of range.
    pub fn output_state(&self, bit: usize) -> Option<bool> {
        self.state.lock().outputs.get(bit).copied()
    }

    /// Every successful write as `(bit, on)`, oldest first.
    pub fn writes(&self) -> Vec<(usize, bool)> {
        self.state.lock().writes.clone()
    }

    /// Number of outputs.
    pub fn len(&self) -> usize {
        self.state.lock().outputs.len()
    }

    /// Whether the bank has no outputs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputPort for SimOutputPort {
    fn set_output_state(&self, bit: usize, on: bool) -> Result<(), IoFault> {
        let mut state = self.state.lock();
        let count = state.outputs.len();
        let slot = state
            .outputs
            .get_mut(bit)
            .ok_or(IoFault::BitOutOfRange { bit, count })?;
        *slot = on;
        state.writes.push((bit, on));
        trace!("Output {} -> {}", bit, on);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_are_recorded() {
        let port = SimOutputPort::new(8);
        port.set_output_state(3, true).unwrap();
        port.set_output_state(3, false).unwrap();
        port.set_output_state(5, true).unwrap();

        assert_eq!(port.output_state(3), Some(false));
        assert_eq!(port.output_state(5), Some(true));
        assert_eq!(port.writes(), vec![(3, true), (3, false), (5, true)]);
    }

    #[test]
    fn test_out_of_range_bit() {
        let port = SimOutputPort::new(4);
        assert_eq!(
            port.set_output_state(4, true),
            Err(IoFault::BitOutOfRange { bit: 4, count: 4 })
        );
        assert!(port.writes().is_empty());
        assert_eq!(port.output_state(4), None);
    }
}
