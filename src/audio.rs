use std::path::Path;

use hound::WavReader;

use crate::error::{Context, Result};

pub fn wav_duration_seconds(path: &Path) -> Result<f64> {
    let reader = WavReader::open(path)
        .with_context(|| format!("reading WAV header of {}", path.display()))?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    let duration = frames / spec.sample_rate as f64;
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..(8000 * 2 * 3 / 2) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let secs = wav_duration_seconds(&path).unwrap();
        assert!((secs - 1.5).abs() < 1e-9);
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not.wav");
        std::fs::write(&path, b"definitely not RIFF").unwrap();
        assert!(wav_duration_seconds(&path).is_err());
    }
}
