//! Transport position: step within the bar, bar within the cycle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportPosition {
    pub step_index: u32,
    pub bar_index: u32,
}

impl TransportPosition {
    /// Move one step forward, carrying into the bar counter.
    pub fn advance(&mut self, steps_per_bar: u32, bars_per_cycle: u32) {
        self.step_index += 1;
        if self.step_index >= steps_per_bar {
            self.step_index = 0;
            self.bar_index = (self.bar_index + 1) % bars_per_cycle.max(1);
        }
    }

    pub fn reset(&mut self) {
        *self = TransportPosition::default();
    }
}
