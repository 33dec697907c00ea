// Practice metronome - Library exports for the CLI, tests and benchmarks

pub mod audio;
pub mod config;
pub mod messaging;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use audio::{AudioClickSink, ClickEngine};
pub use config::{ConfigError, MetronomeConfig};
pub use messaging::{EventConsumer, MetronomeEvent, create_event_channel};
pub use sequencer::{
    ClickSink, ClickType, Metronome, MetronomeError, MetronomeResult, MetronomeState,
    SessionSummary, Tempo, Tick, TickSchedule, TimeSignature, beat_interval_ms,
};
