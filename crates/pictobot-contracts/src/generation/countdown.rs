use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    pub total_seconds: u64,
    pub remaining_seconds: u64,
    pub tick_interval_seconds: u64,
}

impl CountdownState {
    pub fn new(total_seconds: u64, tick_interval_seconds: u64) -> Self {
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            tick_interval_seconds: tick_interval_seconds.max(1),
        }
    }

    /// Remaining time never increases and never drops below zero.
    pub fn tick(&mut self) {
        self.remaining_seconds = self
            .remaining_seconds
            .saturating_sub(self.tick_interval_seconds);
    }

    pub fn is_elapsed(&self) -> bool {
        self.remaining_seconds == 0
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.total_seconds - self.remaining_seconds
    }

    pub fn render(&self, prompt: &str) -> String {
        if self.is_elapsed() {
            return format!("⏳ Generating **{prompt}**: almost there…");
        }
        format!(
            "⏳ Generating **{prompt}**: {}s",
            self.remaining_seconds
        )
    }
}
