// Module audio - CPAL click output

pub mod click;
pub mod engine;
pub mod status;

pub use click::{ClickSound, ClickVoice};
pub use engine::{AudioClickSink, AudioError, ClickEngine};
pub use status::{AtomicOutputStatus, OutputStatus};
