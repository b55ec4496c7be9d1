//! Loudness measurement for smart volume balancing.
//!
//! The media backend decodes a mono PCM WAV chunk of each source; this
//! module measures RMS loudness and derives gain factors that move both
//! sources toward a shared reference level.

use std::path::Path;

use narramix_common::error::{NarramixError, NarramixResult};
use serde::{Deserialize, Serialize};

/// Reference loudness both sources are balanced toward.
pub const TARGET_LOUDNESS_DBFS: f64 = -20.0;

/// Anything quieter than this is treated as silence.
pub const SILENCE_FLOOR_DBFS: f64 = -70.0;

/// Measured loudness of one decoded chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Loudness {
    pub rms_dbfs: f64,
    pub peak_dbfs: f64,
    pub sample_count: usize,
}

/// Multiplicative gain corrections for narration and original audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceFactors {
    pub voice: f64,
    pub original: f64,
}

/// Read all samples of a WAV file as normalised `f32` in `[-1, 1]`.
///
/// Multi-channel files are interleaved; loudness does not care.
pub fn read_wav_samples(path: &Path) -> NarramixResult<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| NarramixError::audio(format!("failed to open WAV {}: {e}", path.display())))?;
    let spec = reader.spec();

    let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect()
        }
    };

    samples.map_err(|e| NarramixError::audio(format!("WAV sample error in {}: {e}", path.display())))
}

/// Measure RMS and peak loudness. Errors on empty or silent input.
pub fn measure(samples: &[f32]) -> NarramixResult<Loudness> {
    if samples.is_empty() {
        return Err(NarramixError::audio("no samples to analyse"));
    }

    let sum_sq: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    let rms = (sum_sq / samples.len() as f64).sqrt();
    let peak = samples
        .iter()
        .map(|s| f64::from(s.abs()))
        .fold(0.0f64, f64::max);

    let rms_dbfs = to_dbfs(rms);
    if rms_dbfs <= SILENCE_FLOOR_DBFS {
        return Err(NarramixError::audio(format!(
            "signal is silent ({rms_dbfs:.1} dBFS)"
        )));
    }

    Ok(Loudness {
        rms_dbfs,
        peak_dbfs: to_dbfs(peak),
        sample_count: samples.len(),
    })
}

fn to_dbfs(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * amplitude.log10()
    }
}

fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Derives balance factors from two measured sources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessAnalyzer {
    pub target_dbfs: f64,
    /// Bounds on each factor before it reaches the volume policy.
    pub factor_range: (f64, f64),
}

impl Default for LoudnessAnalyzer {
    fn default() -> Self {
        Self {
            target_dbfs: TARGET_LOUDNESS_DBFS,
            factor_range: (0.1, 4.0),
        }
    }
}

impl LoudnessAnalyzer {
    /// Factors moving each source's RMS to the target level.
    pub fn balance(&self, voice: &Loudness, original: &Loudness) -> BalanceFactors {
        let (lo, hi) = self.factor_range;
        let factor = |l: &Loudness| db_to_gain(self.target_dbfs - l.rms_dbfs).clamp(lo, hi);
        BalanceFactors {
            voice: factor(voice),
            original: factor(original),
        }
    }

    /// Measure two decoded WAV chunks and derive balance factors.
    pub fn analyze_files(&self, voice_wav: &Path, original_wav: &Path) -> NarramixResult<BalanceFactors> {
        let voice = measure(&read_wav_samples(voice_wav)?)
            .map_err(|e| NarramixError::audio(format!("narration: {e}")))?;
        let original = measure(&read_wav_samples(original_wav)?)
            .map_err(|e| NarramixError::audio(format!("original audio: {e}")))?;

        let factors = self.balance(&voice, &original);
        tracing::info!(
            voice_dbfs = voice.rms_dbfs,
            original_dbfs = original.rms_dbfs,
            voice_factor = factors.voice,
            original_factor = factors.original,
            "Loudness analysed"
        );
        Ok(factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sine(amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (i as f32 * 0.05).sin())
            .collect()
    }

    fn write_wav(path: &Path, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_measure_full_scale_square() {
        let samples = vec![1.0f32, -1.0, 1.0, -1.0];
        let loudness = measure(&samples).unwrap();
        assert!(loudness.rms_dbfs.abs() < 1e-9);
        assert!(loudness.peak_dbfs.abs() < 1e-9);
    }

    #[test]
    fn test_measure_rejects_empty_and_silent() {
        assert!(measure(&[]).is_err());
        assert!(measure(&vec![0.0f32; 1000]).is_err());
    }

    #[test]
    fn test_balance_moves_toward_target() {
        let analyzer = LoudnessAnalyzer::default();
        let quiet = Loudness {
            rms_dbfs: -26.0,
            peak_dbfs: -10.0,
            sample_count: 1,
        };
        let loud = Loudness {
            rms_dbfs: -14.0,
            peak_dbfs: -1.0,
            sample_count: 1,
        };
        let factors = analyzer.balance(&quiet, &loud);
        assert!(factors.voice > 1.0);
        assert!(factors.original < 1.0);
        assert!((factors.voice - db_to_gain(6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_analyze_files_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let voice = dir.path().join("voice.wav");
        let original = dir.path().join("original.wav");
        write_wav(&voice, &sine(0.05, 16_000));
        write_wav(&original, &sine(0.5, 16_000));

        let factors = LoudnessAnalyzer::default()
            .analyze_files(&voice, &original)
            .unwrap();
        assert!(factors.voice > factors.original);
    }

    #[test]
    fn test_analyze_files_silent_original_fails() {
        let dir = tempfile::tempdir().unwrap();
        let voice = dir.path().join("voice.wav");
        let original = dir.path().join("original.wav");
        write_wav(&voice, &sine(0.3, 8_000));
        write_wav(&original, &vec![0.0; 8_000]);

        let err = LoudnessAnalyzer::default()
            .analyze_files(&voice, &original)
            .unwrap_err();
        assert!(err.to_string().contains("original audio"));
    }

    #[test]
    fn test_missing_wav_is_audio_error() {
        let err = read_wav_samples(Path::new("/no/such/file.wav")).unwrap_err();
        assert!(matches!(err, NarramixError::Audio { .. }));
    }

    proptest! {
        #[test]
        fn prop_factors_stay_in_range(voice_db in -69.0f64..0.0, original_db in -69.0f64..0.0) {
            let analyzer = LoudnessAnalyzer::default();
            let l = |db| Loudness { rms_dbfs: db, peak_dbfs: 0.0, sample_count: 1 };
            let factors = analyzer.balance(&l(voice_db), &l(original_db));
            for f in [factors.voice, factors.original] {
                prop_assert!((0.1..=4.0).contains(&f));
            }
        }
    }
}
