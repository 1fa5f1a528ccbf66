//! Clip duration probing.
//!
//! Durations are probed once when a clip is loaded. The header duration is
//! used when the container reports one; otherwise the stream is decoded and
//! its samples counted. Probe failures are logged and yield `0.0` so asset
//! loading can carry on.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use cadence_common::{AudioError, AudioResult};
use rodio::{Decoder, Source};
use tracing::{trace, warn};

/// Duration in seconds of the audio file at `path`, or `0.0` on failure.
pub fn probe_file(path: impl AsRef<Path>) -> f32 {
    let path = path.as_ref();
    match try_probe_file(path) {
        Ok(duration) => duration,
        Err(e) => {
            warn!("Could not probe duration of {:?}: {}", path, e);
            0.0
        },
    }
}

/// Duration in seconds of encoded audio held in memory, or `0.0` on failure.
pub fn probe_bytes(bytes: &[u8]) -> f32 {
    match try_probe_bytes(bytes) {
        Ok(duration) => duration,
        Err(e) => {
            warn!("Could not probe duration of in-memory clip: {}", e);
            0.0
        },
    }
}

/// Duration in seconds of the audio file at `path`.
pub fn try_probe_file(path: impl AsRef<Path>) -> AudioResult<f32> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| AudioError::LoadFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    probe_reader(BufReader::new(file))
}

/// Duration in seconds of encoded audio held in memory.
pub fn try_probe_bytes(bytes: &[u8]) -> AudioResult<f32> {
    probe_reader(Cursor::new(bytes.to_vec()))
}

fn probe_reader<R>(reader: R) -> AudioResult<f32>
where
    R: Read + Seek + Send + Sync + 'static,
{
    let decoder = Decoder::new(reader).map_err(|e| AudioError::DecodeFailed(e.to_string()))?;

    if let Some(duration) = decoder.total_duration() {
        trace!("Probed header duration {:?}", duration);
        return Ok(duration.as_secs_f32());
    }

    let channels = u64::from(decoder.channels().max(1));
    let sample_rate = u64::from(decoder.sample_rate());
    if sample_rate == 0 {
        return Err(AudioError::DecodeFailed("zero sample rate".to_string()));
    }

    let samples = decoder.count() as u64;
    let frames = samples / channels;
    // Whole seconds plus remainder keeps long tracks exact in f64.
    let seconds = (frames / sample_rate) as f64 + (frames % sample_rate) as f64 / sample_rate as f64;
    trace!("Probed {} frames at {} Hz", frames, sample_rate);
    Ok(seconds as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::wav_bytes;

    #[test]
    fn test_probe_wav_bytes() {
        let bytes = wav_bytes(8_000, 1, 4_000);
        assert!((probe_bytes(&bytes) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_probe_stereo_wav() {
        let bytes = wav_bytes(22_050, 2, 44_100);
        assert!((probe_bytes(&bytes) - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_probe_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, wav_bytes(16_000, 1, 4_000)).expect("write");

        assert!((probe_file(&path) - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_probe_failures_yield_zero() {
        assert!(probe_bytes(b"definitely not audio").abs() < f32::EPSILON);
        assert!(probe_file("/nonexistent/clip.wav").abs() < f32::EPSILON);
        assert!(matches!(
            try_probe_file("/nonexistent/clip.wav"),
            Err(AudioError::LoadFailed { .. })
        ));
    }
}
