//! Decoded PCM held in memory, plus the level measurements the processors use.
//!
//! Samples are interleaved `f32` normalised to ±1.0 full scale. Durations are
//! in whole milliseconds, rounded the same way everywhere so that slicing by
//! milliseconds and reporting the length agree with each other.

/// Interleaved audio with its signal layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl AudioBuffer {
    /// # Panics
    /// Panics if `channels` or `sample_rate` is zero.
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        assert!(channels > 0, "channels could not be zero");
        assert!(sample_rate > 0, "sample rate could not be zero");
        let usable = samples.len() - samples.len() % channels;
        let mut samples = samples;
        samples.truncate(usable);
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Length in milliseconds, rounded to nearest.
    pub fn duration_ms(&self) -> u64 {
        let frames = self.frames() as f64;
        (frames * 1000.0 / self.sample_rate as f64).round() as u64
    }

    /// Frame index at `ms`, clamped to the buffer length.
    pub fn frame_at_ms(&self, ms: u64) -> usize {
        let frame = ms as u128 * self.sample_rate as u128 / 1000;
        frame.min(self.frames() as u128) as usize
    }

    /// Copy of the `[start_ms, end_ms)` window.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> AudioBuffer {
        let start = self.frame_at_ms(start_ms);
        let end = self.frame_at_ms(end_ms).max(start);
        AudioBuffer {
            samples: self.samples[start * self.channels..end * self.channels].to_vec(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Average level (RMS over every sample) in dBFS, `-inf` for silence.
    pub fn dbfs(&self) -> f64 {
        if self.samples.is_empty() {
            return f64::NEG_INFINITY;
        }
        let sum_of_squares: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        ratio_to_db((sum_of_squares / self.samples.len() as f64).sqrt())
    }

    /// Highest absolute sample in dBFS, `-inf` for silence.
    pub fn max_dbfs(&self) -> f64 {
        let peak = self.samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        ratio_to_db(peak as f64)
    }

    /// Scale every sample by `gain_db` decibels. Samples are not clipped.
    pub fn apply_gain(&mut self, gain_db: f64) {
        let linear = db_to_ratio(gain_db) as f32;
        for sample in &mut self.samples {
            *sample *= linear;
        }
    }

    /// Scale one frame in place.
    pub(crate) fn scale_frame(&mut self, frame: usize, linear: f32) {
        let start = frame * self.channels;
        for sample in &mut self.samples[start..start + self.channels] {
            *sample *= linear;
        }
    }

    /// Running sums of squared samples, one entry per frame boundary.
    pub(crate) fn energy_index(&self) -> EnergyIndex {
        let mut prefix = Vec::with_capacity(self.frames() + 1);
        let mut total = 0.0_f64;
        prefix.push(total);
        for frame in self.samples.chunks_exact(self.channels) {
            total += frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
            prefix.push(total);
        }
        EnergyIndex {
            prefix,
            channels: self.channels,
        }
    }
}

/// O(1) RMS of any frame range.
pub(crate) struct EnergyIndex {
    prefix: Vec<f64>,
    channels: usize,
}

impl EnergyIndex {
    /// RMS of frames `[start, end)` as a linear ratio; 0 for an empty range.
    pub(crate) fn rms(&self, start: usize, end: usize) -> f64 {
        let last = self.prefix.len() - 1;
        let start = start.min(last);
        let end = end.min(last);
        if end <= start {
            return 0.0;
        }
        let sum = (self.prefix[end] - self.prefix[start]).max(0.0);
        (sum / ((end - start) * self.channels) as f64).sqrt()
    }
}

#[inline]
pub fn db_to_ratio(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Linear ratio to decibels; `-inf` for zero or negative input.
#[inline]
pub fn ratio_to_db(ratio: f64) -> f64 {
    if ratio <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * ratio.log10()
    }
}
