//! In-memory sample source with live controls.
//!
//! Clips are decoded once into [`SampleData`]. Every playback wraps the
//! shared samples in a [`ControlledSource`] whose pan, loop flag and read
//! cursor are driven through an `Arc<SourceControls>` while rodio pulls
//! samples on the audio thread. Volume, speed and pause stay on the rodio
//! `Sink`.

use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cadence_common::{AudioError, AudioResult};
use rodio::{Decoder, Source};

use crate::volume::clamp_pan;

const NO_SEEK: usize = usize::MAX;

/// Decoded interleaved samples of one clip.
#[derive(Clone)]
pub struct SampleData {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
}

impl fmt::Debug for SampleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleData")
            .field("samples", &self.samples.len())
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl SampleData {
    /// Wrap already decoded interleaved samples.
    #[must_use]
    pub fn from_samples(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Decode encoded audio held in memory.
    pub fn decode_bytes(bytes: &[u8]) -> AudioResult<Self> {
        Self::decode(Cursor::new(bytes.to_vec()))
    }

    /// Decode a whole stream into memory.
    pub fn decode<R>(reader: R) -> AudioResult<Self>
    where
        R: Read + Seek + Send + Sync + 'static,
    {
        let decoder = Decoder::new(reader).map_err(|e| AudioError::DecodeFailed(e.to_string()))?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        if sample_rate == 0 {
            return Err(AudioError::DecodeFailed("zero sample rate".to_string()));
        }

        let samples: Vec<f32> = decoder.convert_samples().collect();
        Ok(Self::from_samples(samples, channels, sample_rate))
    }

    /// Interleaved channel count.
    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames per second.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of whole frames.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Length in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Frame index closest to `seconds`, clamped to the clip.
    #[must_use]
    pub fn frame_at(&self, seconds: f32) -> usize {
        if seconds.is_nan() || seconds <= 0.0 {
            return 0;
        }
        let frame = (f64::from(seconds) * f64::from(self.sample_rate)) as usize;
        frame.min(self.frames())
    }
}

/// Controls shared between a playback owner and its [`ControlledSource`].
#[derive(Debug)]
pub struct SourceControls {
    pan_bits: AtomicU32,
    looping: AtomicBool,
    frame: AtomicUsize,
    seek_to: AtomicUsize,
    completions: AtomicUsize,
    ended: AtomicBool,
}

impl SourceControls {
    /// Fresh controls at frame 0.
    #[must_use]
    pub fn new(pan: f32, looping: bool) -> Arc<Self> {
        Arc::new(Self {
            pan_bits: AtomicU32::new(clamp_pan(pan).to_bits()),
            looping: AtomicBool::new(looping),
            frame: AtomicUsize::new(0),
            seek_to: AtomicUsize::new(NO_SEEK),
            completions: AtomicUsize::new(0),
            ended: AtomicBool::new(false),
        })
    }

    /// Set stereo pan in `[-1, 1]`.
    pub fn set_pan(&self, pan: f32) {
        self.pan_bits.store(clamp_pan(pan).to_bits(), Ordering::Relaxed);
    }

    /// Current pan.
    pub fn pan(&self) -> f32 {
        f32::from_bits(self.pan_bits.load(Ordering::Relaxed))
    }

    /// Toggle looping. Takes effect at the next end of clip.
    pub fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::Relaxed);
    }

    /// Whether the source wraps at the end of the clip.
    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    /// Jump to `frame` before the next output frame.
    pub fn seek_frame(&self, frame: usize) {
        self.frame.store(frame, Ordering::Relaxed);
        self.seek_to.store(frame, Ordering::Release);
    }

    /// Frame most recently read.
    pub fn frame(&self) -> usize {
        self.frame.load(Ordering::Relaxed)
    }

    /// Number of times the end of the clip was reached since the last call.
    pub fn take_completions(&self) -> usize {
        self.completions.swap(0, Ordering::AcqRel)
    }

    /// Whether a one-shot source ran out of samples.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Clear the end state and rewind, for re-queueing a fresh source.
    pub fn rewind(&self) {
        self.ended.store(false, Ordering::Release);
        self.seek_frame(0);
    }
}

/// Rodio source over [`SampleData`] following a [`SourceControls`].
///
/// Mono clips are upmixed to stereo so they can be panned. Stereo clips are
/// balanced with the same gains. Clips with more channels ignore pan.
pub struct ControlledSource {
    data: SampleData,
    controls: Arc<SourceControls>,
    frame: usize,
    channel: u16,
    out_channels: u16,
    gains: [f32; 2],
}

impl fmt::Debug for ControlledSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlledSource")
            .field("data", &self.data)
            .field("frame", &self.frame)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl ControlledSource {
    /// Play `data` under `controls`.
    #[must_use]
    pub fn new(data: SampleData, controls: Arc<SourceControls>) -> Self {
        let out_channels = if data.channels == 1 { 2 } else { data.channels };
        let frame = controls.frame().min(data.frames());
        Self {
            data,
            controls,
            frame,
            channel: 0,
            out_channels,
            gains: [1.0, 1.0],
        }
    }

    /// Left and right gains for `pan`.
    #[must_use]
    pub fn pan_gains(pan: f32) -> [f32; 2] {
        let pan = clamp_pan(pan);
        [(1.0 - pan).min(1.0), (1.0 + pan).min(1.0)]
    }

    fn begin_frame(&mut self) -> bool {
        let seek = self.controls.seek_to.swap(NO_SEEK, Ordering::AcqRel);
        if seek != NO_SEEK {
            self.frame = seek.min(self.data.frames());
        }

        if self.frame >= self.data.frames() {
            self.controls.completions.fetch_add(1, Ordering::AcqRel);
            if self.controls.is_looping() && self.data.frames() > 0 {
                self.frame = 0;
            } else {
                self.controls.frame.store(self.frame, Ordering::Relaxed);
                self.controls.ended.store(true, Ordering::Release);
                return false;
            }
        }

        self.controls.frame.store(self.frame, Ordering::Relaxed);
        self.gains = Self::pan_gains(self.controls.pan());
        true
    }
}

impl Iterator for ControlledSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.controls.is_ended() {
            return None;
        }
        if self.channel == 0 && !self.begin_frame() {
            return None;
        }

        let channels = usize::from(self.data.channels);
        let out = usize::from(self.channel);
        let sample = match self.data.channels {
            1 => self.data.samples[self.frame] * self.gains[out],
            2 => self.data.samples[self.frame * 2 + out] * self.gains[out],
            _ => self.data.samples[self.frame * channels + out],
        };

        self.channel += 1;
        if self.channel == self.out_channels {
            self.channel = 0;
            self.frame += 1;
        }
        Some(sample)
    }
}

impl Source for ControlledSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.out_channels
    }

    fn sample_rate(&self) -> u32 {
        self.data.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
