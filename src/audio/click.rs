// Click sounds - Pre-rendered accent/regular clicks and their playback voice

use std::f32::consts::PI;

use crate::sequencer::ClickType;

/// Metronome click sound generator
/// Pre-generates short click samples so the audio callback only copies
#[derive(Debug, Clone)]
pub struct ClickSound {
    accent_samples: Vec<f32>,
    regular_samples: Vec<f32>,
}

impl ClickSound {
    /// Duration of click in milliseconds
    const CLICK_DURATION_MS: f32 = 10.0;

    pub fn new(sample_rate: f32) -> Self {
        let click_samples = ((Self::CLICK_DURATION_MS / 1000.0) * sample_rate) as usize;

        Self {
            accent_samples: Self::generate_click(sample_rate, click_samples, 1200.0, 0.6),
            regular_samples: Self::generate_click(sample_rate, click_samples, 800.0, 0.4),
        }
    }

    /// Sine burst with a fast exponential decay
    /// Higher frequency and amplitude for accent clicks
    fn generate_click(
        sample_rate: f32,
        num_samples: usize,
        frequency: f32,
        amplitude: f32,
    ) -> Vec<f32> {
        let phase_increment = 2.0 * PI * frequency / sample_rate;

        (0..num_samples)
            .map(|i| {
                let t = i as f32 / num_samples as f32;
                let envelope = (-t * 8.0).exp();
                (i as f32 * phase_increment).sin() * envelope * amplitude
            })
            .collect()
    }

    pub fn samples(&self, click_type: ClickType) -> &[f32] {
        match click_type {
            ClickType::Accent => &self.accent_samples,
            ClickType::Regular => &self.regular_samples,
        }
    }
}

/// Plays one click at a time; a new click restarts from the top
#[derive(Debug, Clone)]
pub struct ClickVoice {
    sound: ClickSound,
    playing: Option<(ClickType, usize)>,
}

impl ClickVoice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sound: ClickSound::new(sample_rate),
            playing: None,
        }
    }

    pub fn trigger(&mut self, click_type: ClickType) {
        self.playing = Some((click_type, 0));
    }

    pub fn silence(&mut self) {
        self.playing = None;
    }

    pub fn is_active(&self) -> bool {
        self.playing.is_some()
    }

    /// Next output sample (0.0 when idle)
    pub fn next_sample(&mut self) -> f32 {
        let Some((click_type, position)) = self.playing.as_mut() else {
            return 0.0;
        };

        match self.sound.samples(*click_type).get(*position) {
            Some(&sample) => {
                *position += 1;
                sample
            }
            None => {
                self.playing = None;
                0.0
            }
        }
    }
}
