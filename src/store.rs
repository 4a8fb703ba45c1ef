// src/store.rs

use std::sync::Arc;

/// One decoded channel. Immutable once built; cloning only bumps a refcount,
/// so handing it to a render context never copies the samples.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Zero-length buffer used before any audio has been decoded.
    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Amplitude at `index`, 0.0 outside the buffer.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.samples.get(index).copied().unwrap_or(0.0)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::empty(44100)
    }
}

/// Output of an external decode step: one vector per channel.
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self { channels, sample_rate }
    }

    /// Splits interleaved frames into per-channel vectors.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        if channels == 0 {
            return Self::new(Vec::new(), sample_rate);
        }
        let frames = samples.len() / channels;
        let mut planar = vec![Vec::with_capacity(frames); channels];
        for frame in samples.chunks_exact(channels) {
            for (ch, &s) in frame.iter().enumerate() {
                planar[ch].push(s);
            }
        }
        Self::new(planar, sample_rate)
    }

    pub fn duration_secs(&self) -> f64 {
        match self.channels.first() {
            Some(ch) if self.sample_rate > 0 => ch.len() as f64 / self.sample_rate as f64,
            _ => 0.0,
        }
    }
}

/// Holds every decoded channel and hands out the selected one.
#[derive(Debug, Default)]
pub struct SampleStore {
    channels: Vec<SampleBuffer>,
    sample_rate: u32,
    selected: usize,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the store contents wholesale.
    pub fn replace(&mut self, audio: DecodedAudio) {
        let sample_rate = audio.sample_rate;
        self.channels = audio
            .channels
            .into_iter()
            .map(|ch| SampleBuffer::new(ch, sample_rate))
            .collect();
        self.sample_rate = sample_rate;
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.sample_rate = 0;
    }

    pub fn is_loaded(&self) -> bool {
        !self.channels.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn select(&mut self, channel: usize) {
        self.selected = channel;
    }

    /// The selected channel; a zero-length buffer when the channel is absent.
    pub fn current(&self) -> SampleBuffer {
        match self.channels.get(self.selected) {
            Some(buf) => buf.clone(),
            None => SampleBuffer::empty(if self.sample_rate > 0 { self.sample_rate } else { 44100 }),
        }
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.channels.first().map(SampleBuffer::duration_secs)
    }
}
