#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const RECENT_WINDOW: usize = 50;

/// Tally of answered responses in the current session. In memory only.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionStats {
    /// Responses claiming a match that was real.
    pub correct: u32,
    /// Responses claiming a match that was not.
    pub incorrect: u32,
    pub responses: u32,
    pub recent: Vec<bool>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            recent: Vec::with_capacity(RECENT_WINDOW),
            ..Self::default()
        }
    }

    pub fn record_response(&mut self, is_correct: bool) {
        if is_correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }

        self.recent.push(is_correct);
        if self.recent.len() > RECENT_WINDOW {
            self.recent.remove(0);
        }

        self.responses += 1;
    }

    /// Fraction of correct responses; `None` before the first response.
    pub fn accuracy(&self) -> Option<f32> {
        if self.responses == 0 {
            None
        } else {
            Some(self.correct as f32 / self.responses as f32)
        }
    }

    pub fn recent_rate(&self) -> Option<f32> {
        if self.recent.is_empty() {
            return None;
        }
        let correct_count = self.recent.iter().filter(|&&x| x).count();
        Some(correct_count as f32 / self.recent.len() as f32)
    }
}
