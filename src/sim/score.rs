//! Score accumulator

use serde::{Deserialize, Serialize};

/// Anything that can be awarded points
pub trait ScoreSink {
    fn add_score(&mut self, amount: i32);
}

/// Session score. Only grows through `add_score`; cleared on restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    value: i32,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }
}

impl ScoreSink for Score {
    fn add_score(&mut self, amount: i32) {
        self.value = self.value.saturating_add(amount);
        log::debug!("Score: {}", self.value);
    }
}
