// Output stream status shared between the audio callbacks and the click sink

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    Starting = 0,
    Running = 1,
    Failed = 2,
}

impl From<u8> for OutputStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => OutputStatus::Running,
            2 => OutputStatus::Failed,
            _ => OutputStatus::Starting,
        }
    }
}

/// Atomic wrapper pour partager le status entre threads
#[derive(Debug, Clone)]
pub struct AtomicOutputStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicOutputStatus {
    pub fn new(status: OutputStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> OutputStatus {
        OutputStatus::from(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, status: OutputStatus) {
        self.inner.store(status as u8, Ordering::Relaxed);
    }
}
