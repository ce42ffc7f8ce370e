use serde::{Deserialize, Serialize};

use crate::types::EventTime;

/// A closed-open interval of event time `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Window {
    /// First instant belonging to the window
    pub start: EventTime,
    /// First instant after the window
    pub end: EventTime,
}

impl Window {
    /// True if `t` falls into this window
    pub fn contains(&self, t: EventTime) -> bool {
        self.start <= t && t < self.end
    }
}

/// Assigns fixed size, non-overlapping windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TumblingWindows {
    size: EventTime,
}

impl TumblingWindows {
    /// Windows of `size` milliseconds.
    ///
    /// **PANIC:** if size is not positive
    pub fn new(size: EventTime) -> Self {
        assert!(size > 0, "window size must be positive");
        Self { size }
    }

    /// Size of the windows in milliseconds
    pub fn size(&self) -> EventTime {
        self.size
    }

    /// The single window `t` belongs to. An instant on a window boundary belongs to the
    /// window starting at that instant.
    pub fn window_for(&self, t: EventTime) -> Window {
        let start = t.div_euclid(self.size).saturating_mul(self.size);
        Window {
            start,
            end: start.saturating_add(self.size),
        }
    }

    /// All windows `t` belongs to, for tumbling windows this is exactly one
    pub fn windows_for(&self, t: EventTime) -> impl Iterator<Item = Window> {
        std::iter::once(self.window_for(t))
    }
}
