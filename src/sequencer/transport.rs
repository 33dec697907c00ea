// Transport - Live tempo/meter state shared with the tick thread
// Written by the host, read by the loop once per iteration

use super::timeline::{Tempo, TimeSignature};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Shared transport state
/// Tempo and time signature live in a single atomic word so every read is a
/// consistent (tempo, meter) pair.
#[derive(Debug)]
pub struct SharedTransport {
    tempo_and_meter: AtomicU64,
    current_beat: AtomicU32,
}

impl SharedTransport {
    /// Create new shared transport state
    pub fn new(tempo: Tempo, time_signature: TimeSignature) -> Arc<Self> {
        Arc::new(Self {
            tempo_and_meter: AtomicU64::new(Self::pack(tempo, time_signature)),
            current_beat: AtomicU32::new(0),
        })
    }

    fn pack(tempo: Tempo, time_signature: TimeSignature) -> u64 {
        ((tempo.bpm() as u64) << 32) | time_signature.to_bits() as u64
    }

    fn unpack(bits: u64) -> (Tempo, TimeSignature) {
        (
            Tempo::from_bits((bits >> 32) as u32),
            TimeSignature::from_bits(bits as u32),
        )
    }

    /// Tempo and meter as one snapshot
    pub fn snapshot(&self) -> (Tempo, TimeSignature) {
        Self::unpack(self.tempo_and_meter.load(Ordering::Acquire))
    }

    pub fn tempo(&self) -> Tempo {
        self.snapshot().0
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.snapshot().1
    }

    /// Replace both values at once
    pub fn store(&self, tempo: Tempo, time_signature: TimeSignature) {
        self.tempo_and_meter
            .store(Self::pack(tempo, time_signature), Ordering::Release);
    }

    pub fn set_tempo(&self, tempo: Tempo) {
        self.update(|_, ts| (tempo, ts));
    }

    pub fn set_time_signature(&self, time_signature: TimeSignature) {
        self.update(|tempo, _| (tempo, time_signature));
    }

    fn update(&self, f: impl Fn(Tempo, TimeSignature) -> (Tempo, TimeSignature)) {
        // fetch_update only fails when the closure returns None
        let _ = self
            .tempo_and_meter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let (tempo, ts) = Self::unpack(bits);
                let (tempo, ts) = f(tempo, ts);
                Some(Self::pack(tempo, ts))
            });
    }

    /// Beat of the most recently emitted tick (for visual beat display)
    pub fn current_beat(&self) -> u32 {
        self.current_beat.load(Ordering::Relaxed)
    }

    pub fn set_current_beat(&self, beat: u32) {
        self.current_beat.store(beat, Ordering::Relaxed);
    }
}

impl Default for SharedTransport {
    fn default() -> Self {
        Self {
            tempo_and_meter: AtomicU64::new(Self::pack(Tempo::default(), TimeSignature::default())),
            current_beat: AtomicU32::new(0),
        }
    }
}
