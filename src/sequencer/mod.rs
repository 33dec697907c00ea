// Sequencer module - Metronome timing core
// Tempo/meter values, beat interval math, drift-corrected tick loop

pub mod interval;
pub mod metronome;
pub mod practice;
pub mod schedule;
pub mod timeline;
pub mod transport;

pub use interval::beat_interval_ms;
pub use metronome::{ClickSink, ClickType, Metronome, MetronomeState};
pub use practice::{PracticeTimer, SessionSummary};
pub use schedule::{Tick, TickSchedule};
pub use timeline::{Tempo, TimeSignature};
pub use transport::SharedTransport;

use thiserror::Error;

/// Metronome engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetronomeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Click emission failed: {0}")]
    EmissionFailure(String),

    #[error("Failed to spawn tick thread: {0}")]
    Spawn(String),
}

pub type MetronomeResult<T> = Result<T, MetronomeError>;
