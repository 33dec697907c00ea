// Timeline - Tempo and time signature values
// Immutable snapshots read by the tick loop once per iteration

use std::fmt;
use std::str::FromStr;

use super::interval::beat_interval_ms;
use super::{MetronomeError, MetronomeResult};

/// Time signature (beats per bar / note value)
/// Example: 6/8 = TimeSignature { beats_per_bar: 6, note_value: 8 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TimeSignature {
    beats_per_bar: u16, // Ticks before the accent repeats
    note_value: u16,    // Subdivision used for the interval (2, 4, 8, 16)
}

impl TimeSignature {
    /// Meters offered by the practice screen
    pub const PRESETS: [TimeSignature; 9] = [
        TimeSignature::from_parts(2, 4),
        TimeSignature::from_parts(3, 4),
        TimeSignature::from_parts(4, 4),
        TimeSignature::from_parts(5, 4),
        TimeSignature::from_parts(7, 4),
        TimeSignature::from_parts(5, 8),
        TimeSignature::from_parts(6, 8),
        TimeSignature::from_parts(7, 8),
        TimeSignature::from_parts(9, 8),
    ];

    /// Creates a new time signature
    ///
    /// Any positive note value is accepted; values outside {2, 4, 8, 16}
    /// are timed as quarter notes.
    pub fn new(beats_per_bar: u16, note_value: u16) -> MetronomeResult<Self> {
        if beats_per_bar == 0 {
            return Err(MetronomeError::InvalidArgument(
                "time signature needs at least one beat per bar".to_string(),
            ));
        }
        if note_value == 0 {
            return Err(MetronomeError::InvalidArgument(
                "time signature note value must be > 0".to_string(),
            ));
        }
        Ok(Self::from_parts(beats_per_bar, note_value))
    }

    const fn from_parts(beats_per_bar: u16, note_value: u16) -> Self {
        Self {
            beats_per_bar,
            note_value,
        }
    }

    /// Common 4/4 time signature
    pub const fn four_four() -> Self {
        Self::from_parts(4, 4)
    }

    /// Common 3/4 time signature (waltz)
    pub const fn three_four() -> Self {
        Self::from_parts(3, 4)
    }

    /// Common 6/8 time signature
    pub const fn six_eight() -> Self {
        Self::from_parts(6, 8)
    }

    pub fn beats_per_bar(&self) -> u16 {
        self.beats_per_bar
    }

    pub fn note_value(&self) -> u16 {
        self.note_value
    }

    /// Re-checks invariants on a value that bypassed `new` (e.g. deserialized)
    pub fn validate(&self) -> MetronomeResult<()> {
        Self::new(self.beats_per_bar, self.note_value).map(|_| ())
    }

    /// Pack into 32 bits for atomic storage
    pub(crate) fn to_bits(self) -> u32 {
        ((self.beats_per_bar as u32) << 16) | self.note_value as u32
    }

    pub(crate) fn from_bits(bits: u32) -> Self {
        Self::from_parts((bits >> 16) as u16, bits as u16)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_bar, self.note_value)
    }
}

impl FromStr for TimeSignature {
    type Err = MetronomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MetronomeError::InvalidArgument(format!("invalid time signature '{}'", s));

        let (beats, note) = s.trim().split_once('/').ok_or_else(invalid)?;
        let beats = beats.trim().parse::<u16>().map_err(|_| invalid())?;
        let note = note.trim().parse::<u16>().map_err(|_| invalid())?;

        Self::new(beats, note)
    }
}

/// Tempo in whole BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tempo {
    bpm: u32,
}

impl Tempo {
    /// Lowest tempo offered by the practice controls
    pub const MIN_BPM: u32 = 30;
    /// Highest tempo offered by the practice controls
    pub const MAX_BPM: u32 = 250;
    /// Starting tempo when no previous session exists
    pub const DEFAULT_BPM: u32 = 100;

    /// Creates a new tempo
    /// The engine only rejects zero; UI bounds are applied by `clamped`
    pub fn new(bpm: u32) -> MetronomeResult<Self> {
        if bpm == 0 {
            return Err(MetronomeError::InvalidArgument(
                "tempo must be > 0 BPM".to_string(),
            ));
        }
        Ok(Self { bpm })
    }

    /// Tempo held within the practice control bounds [30, 250]
    pub fn clamped(bpm: u32) -> Self {
        Self::clamped_to(bpm, Self::MIN_BPM, Self::MAX_BPM)
    }

    /// Tempo held within custom bounds (`min` is raised to 1 if zero)
    pub fn clamped_to(bpm: u32, min: u32, max: u32) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            bpm: bpm.clamp(min, max),
        }
    }

    /// Step the tempo up or down, staying within the practice bounds
    pub fn nudged(&self, delta: i32) -> Self {
        let bpm = (self.bpm as i64 + delta as i64).clamp(0, u32::MAX as i64) as u32;
        Self::clamped(bpm)
    }

    /// Get BPM value
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Duration between ticks for the given note value, in whole milliseconds
    pub fn beat_interval_ms(&self, note_value: u16) -> u64 {
        // bpm is non-zero by construction
        beat_interval_ms(self.bpm, note_value as u32).unwrap_or(0)
    }

    pub(crate) fn from_bits(bpm: u32) -> Self {
        Self { bpm }
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            bpm: Self::DEFAULT_BPM,
        }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}
