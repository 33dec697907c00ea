// Practice session bookkeeping
// Running time of the metronome and the tempo reached during a session

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::timeline::{Tempo, TimeSignature};

/// Accumulates time only while the metronome is running
#[derive(Debug, Clone, Default)]
pub struct PracticeTimer {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl PracticeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Total practiced time, including the current stretch
    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map_or(Duration::ZERO, |since| since.elapsed())
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = None;
    }
}

/// What a finished practice session reports back to the practice log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Local>,
    pub starting_bpm: u32,
    pub achieved_bpm: u32,
    pub time_signature: TimeSignature,
    pub elapsed_secs: u64,
}

impl SessionSummary {
    /// Tempo to open the next session with: the newest session's achieved
    /// tempo, or the default when there is no history
    pub fn last_achieved_bpm(sessions: &[SessionSummary]) -> u32 {
        sessions
            .iter()
            .max_by_key(|session| session.started_at)
            .map_or(Tempo::DEFAULT_BPM, |session| session.achieved_bpm)
    }

    /// Tempo gained (or lost) over the session
    pub fn bpm_gain(&self) -> i64 {
        self.achieved_bpm as i64 - self.starting_bpm as i64
    }
}
