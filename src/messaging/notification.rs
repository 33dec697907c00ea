// Events from the tick thread to the host

use crate::sequencer::Tick;

/// What the host observes from a running metronome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetronomeEvent {
    /// A loop began; its first tick is the downbeat, sequence 0
    Started,
    /// One tick fired (visual beat plus accent flag)
    Tick(Tick),
    /// The click for `beat` could not be produced; timing is unaffected
    EmissionFailed { beat: u32, message: String },
    /// The loop exited and will emit nothing more.
    /// The event buffer keeps one slot for it, so it arrives even when ticks
    /// were dropped, provided the host drained the previous run's `Stopped`.
    /// `Metronome::state()` is authoritative either way.
    Stopped,
}

impl MetronomeEvent {
    pub fn as_tick(&self) -> Option<&Tick> {
        match self {
            MetronomeEvent::Tick(tick) => Some(tick),
            _ => None,
        }
    }
}
