// Beat interval - BPM and note value to per-tick delay

use super::{MetronomeError, MetronomeResult};

const MS_PER_MINUTE: u64 = 60_000;

/// Milliseconds between ticks at `bpm` for a meter whose beat is `note_value`.
///
/// Truncates at every division, so odd tempos give the same whole-millisecond
/// values as nested integer division (e.g. 7 BPM in 8ths: 8571 / 2 = 4285).
/// Note values other than 2, 4, 8 and 16 are timed as quarter notes.
pub fn beat_interval_ms(bpm: u32, note_value: u32) -> MetronomeResult<u64> {
    if bpm == 0 {
        return Err(MetronomeError::InvalidArgument(
            "cannot compute a beat interval at 0 BPM".to_string(),
        ));
    }

    let quarter_note_ms = MS_PER_MINUTE / bpm as u64;

    let interval = match note_value {
        4 => quarter_note_ms,
        8 => quarter_note_ms / 2,
        2 => quarter_note_ms * 2,
        16 => quarter_note_ms / 4,
        _ => quarter_note_ms,
    };

    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_notes() {
        // 60 BPM = one click per second
        assert_eq!(beat_interval_ms(60, 4), Ok(1000));
        assert_eq!(beat_interval_ms(120, 4), Ok(500));
        assert_eq!(beat_interval_ms(30, 4), Ok(2000));
    }

    #[test]
    fn test_eighth_notes() {
        // 60 BPM in 8ths clicks like 120 BPM in 4ths
        assert_eq!(beat_interval_ms(60, 8), Ok(500));
        assert_eq!(beat_interval_ms(120, 8), Ok(250));
    }

    #[test]
    fn test_half_and_sixteenth_notes() {
        assert_eq!(beat_interval_ms(60, 2), Ok(2000));
        assert_eq!(beat_interval_ms(60, 16), Ok(250));
        assert_eq!(beat_interval_ms(250, 16), Ok(60));
    }

    #[test]
    fn test_truncates_at_each_step() {
        // 60000 / 7 = 8571, then 8571 / 2 = 4285 (not round(60000 / 14) = 4286)
        assert_eq!(beat_interval_ms(7, 8), Ok(4285));
        // 60000 / 7 = 8571, then 8571 / 4 = 2142
        assert_eq!(beat_interval_ms(7, 16), Ok(2142));
        // 60000 / 7 = 8571, then * 2 = 17142
        assert_eq!(beat_interval_ms(7, 2), Ok(17142));
    }

    #[test]
    fn test_interval_laws_over_tempo_range() {
        for bpm in 1..=2000u32 {
            let quarter = 60_000 / bpm as u64;
            assert_eq!(beat_interval_ms(bpm, 4), Ok(quarter), "bpm {}", bpm);
            assert_eq!(beat_interval_ms(bpm, 8), Ok(quarter / 2), "bpm {}", bpm);
            assert_eq!(beat_interval_ms(bpm, 2), Ok(quarter * 2), "bpm {}", bpm);
            assert_eq!(beat_interval_ms(bpm, 16), Ok(quarter / 4), "bpm {}", bpm);
        }
    }

    #[test]
    fn test_unknown_note_values_fall_back_to_quarter() {
        for bpm in [1u32, 30, 97, 120, 250, 999] {
            let quarter = beat_interval_ms(bpm, 4).unwrap();
            for note_value in [0u32, 1, 3, 5, 6, 7, 12, 32, 64, u32::MAX] {
                assert_eq!(beat_interval_ms(bpm, note_value), Ok(quarter));
            }
        }
    }

    #[test]
    fn test_zero_bpm_is_rejected() {
        assert!(matches!(
            beat_interval_ms(0, 4),
            Err(MetronomeError::InvalidArgument(_))
        ));
    }
}
