//! Bounded transfer of numeric vectors between the engine and node threads.

use parking_lot::Mutex;

use crate::error::{LockstepError, LockstepResult};

/// Upper bound on values carried per direction in one step. Must match the
/// fixed-size staging buffers on the engine side.
pub const MAX_EXCHANGE_VALUES: usize = 1024;

/// Two mailboxes for numeric vectors — `outputs` flows engine→node,
/// `inputs` flows node→engine — plus the node-clock timestamp attached to
/// the most recent input snapshot.
///
/// The buffer itself never truncates: an oversized input snapshot is held
/// intact and rejected wholesale when the engine reads it.
#[derive(Debug, Default)]
pub struct ExchangeBuffer {
    outputs: Mutex<Vec<f64>>,
    inputs: Mutex<Vec<f64>>,
    sim_time: Mutex<f64>,
}

impl ExchangeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine side: stage the output values for the node to publish.
    /// Returns the number of values written.
    pub fn write_outputs(&self, values: &[f64]) -> usize {
        let mut outputs = self.outputs.lock();
        outputs.clear();
        outputs.extend_from_slice(values);
        values.len()
    }

    /// Node side: snapshot the staged outputs for publishing.
    pub fn read_outputs(&self) -> Vec<f64> {
        self.outputs.lock().clone()
    }

    /// Node side: replace the input snapshot. Returns the number of values
    /// written.
    pub fn write_inputs(&self, values: &[f64]) -> usize {
        let mut inputs = self.inputs.lock();
        inputs.clear();
        inputs.extend_from_slice(values);
        values.len()
    }

    /// Engine side: read the input snapshot, up to `max_count` values.
    ///
    /// Refuses partial delivery: if more values are held than `max_count`,
    /// the whole read fails with `BufferOverflow` and nothing is returned.
    pub fn read_inputs(&self, max_count: usize) -> LockstepResult<Vec<f64>> {
        let inputs = self.inputs.lock();
        if inputs.len() > max_count {
            return Err(LockstepError::BufferOverflow {
                held: inputs.len(),
                capacity: max_count,
            });
        }
        Ok(inputs.clone())
    }

    /// Node side: record the simulation timestamp reported by the node's
    /// clock.
    pub fn advance_time(&self, sim_time: f64) {
        *self.sim_time.lock() = sim_time;
    }

    /// Simulation timestamp associated with the most recent input snapshot.
    pub fn current_time(&self) -> f64 {
        *self.sim_time.lock()
    }
}
