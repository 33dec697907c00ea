// Tick schedule - Drift-corrected virtual timeline
// Pure bookkeeping for the tick loop: beat cursor, sequence, target times.
// Targets accumulate from loop start (previous target + interval), so time
// spent emitting a tick never pushes later ticks back.

use std::time::Duration;

use super::timeline::{Tempo, TimeSignature};

/// One metronome pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Ticks emitted before this one in the current run
    pub sequence: u64,
    /// Beat within the bar (0-based, 0 = downbeat)
    pub beat: u32,
    /// Downbeat flag (beat == 0)
    pub accented: bool,
    /// Position on the virtual timeline, measured from loop start
    pub target: Duration,
}

/// Beat cursor and target time for the next tick
#[derive(Debug, Clone, Default)]
pub struct TickSchedule {
    sequence: u64,
    beat: u32,
    target: Duration,
}

impl TickSchedule {
    /// Schedule whose first tick is the downbeat, due at loop start
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick due at the current target
    pub fn current(&self) -> Tick {
        Tick {
            sequence: self.sequence,
            beat: self.beat,
            accented: self.beat == 0,
            target: self.target,
        }
    }

    /// Move to the next tick using the tempo and meter read this iteration.
    /// Returns the interval that was added to the timeline.
    pub fn advance(&mut self, tempo: Tempo, time_signature: TimeSignature) -> Duration {
        let interval = Duration::from_millis(tempo.beat_interval_ms(time_signature.note_value()));

        // beats_per_bar is non-zero by construction
        let beats_per_bar = time_signature.beats_per_bar().max(1) as u32;
        self.beat = (self.beat + 1) % beats_per_bar;
        self.sequence += 1;
        self.target += interval;

        interval
    }

    /// Target time of the next tick, from loop start
    pub fn next_target(&self) -> Duration {
        self.target
    }

    pub fn beat(&self) -> u32 {
        self.beat
    }
}

/// How long to wait from `elapsed` until `target`
/// Zero when the target has already passed; an overdue tick fires at once.
pub fn wait_until(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}
