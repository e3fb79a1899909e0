//! Leading and trailing silence removal.

use std::path::Path;

use log::debug;

use crate::audio::{AudioBuffer, db_to_ratio};
use crate::backend::Backend;
use crate::error::ProcessError;
use crate::format::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimParameters {
    /// Windows whose RMS is at or below this level count as silence.
    pub threshold_dbfs: f64,
    /// Shortest run of silence that counts as a gap. Negative values mean 0.
    pub min_silence_ms: i64,
    /// Silence kept on both sides of the detected content. Negative values mean 0.
    pub padding_ms: i64,
}

impl Default for TrimParameters {
    fn default() -> Self {
        TrimParameters {
            threshold_dbfs: -50.0,
            min_silence_ms: 500,
            padding_ms: 0,
        }
    }
}

/// Silent `[start, end)` ranges in milliseconds.
///
/// Every window of `min_silence_ms` starting on a whole millisecond is tested;
/// overlapping or touching silent windows are merged into one range.
pub fn detect_silence(
    audio: &AudioBuffer,
    min_silence_ms: u64,
    threshold_dbfs: f64,
) -> Vec<(u64, u64)> {
    let length = audio.duration_ms();
    if length < min_silence_ms {
        return Vec::new();
    }

    let threshold = db_to_ratio(threshold_dbfs);
    let energy = audio.energy_index();
    let is_silent = |start: u64| {
        let first = audio.frame_at_ms(start);
        let last = audio.frame_at_ms(start + min_silence_ms);
        energy.rms(first, last) <= threshold
    };

    let mut ranges = Vec::new();
    let mut current: Option<(u64, u64)> = None;
    for start in (0..=length - min_silence_ms).filter(|&start| is_silent(start)) {
        current = match current {
            None => Some((start, start)),
            Some((range_start, previous)) => {
                let continuous = start == previous + 1;
                let has_gap = start > previous + min_silence_ms;
                if !continuous && has_gap {
                    ranges.push((range_start, previous + min_silence_ms));
                    Some((start, start))
                } else {
                    Some((range_start, start))
                }
            }
        };
    }
    if let Some((range_start, previous)) = current {
        ranges.push((range_start, previous + min_silence_ms));
    }
    ranges
}

/// Complement of [`detect_silence`]: the `[start, end)` ranges holding content.
pub fn detect_nonsilent(
    audio: &AudioBuffer,
    min_silence_ms: u64,
    threshold_dbfs: f64,
) -> Vec<(u64, u64)> {
    let length = audio.duration_ms();
    let silent = detect_silence(audio, min_silence_ms, threshold_dbfs);
    if silent.is_empty() {
        return vec![(0, length)];
    }
    if silent[0] == (0, length) {
        return Vec::new();
    }

    let mut ranges = Vec::with_capacity(silent.len() + 1);
    let mut previous_end = 0;
    for &(start, end) in &silent {
        ranges.push((previous_end, start));
        previous_end = end;
    }
    if previous_end != length {
        ranges.push((previous_end, length));
    }
    if ranges.first() == Some(&(0, 0)) {
        ranges.remove(0);
    }
    ranges
}

/// Drop silence before the first and after the last non-silent range.
///
/// Returns `audio` untouched when nothing would be removed, when no content is
/// found, or when the padded window is empty.
pub fn trim_silence(audio: AudioBuffer, parameters: &TrimParameters) -> AudioBuffer {
    let min_silence_ms = parameters.min_silence_ms.max(0) as u64;
    let padding_ms = parameters.padding_ms.max(0) as u64;
    let length = audio.duration_ms();

    let ranges = detect_nonsilent(&audio, min_silence_ms, parameters.threshold_dbfs);
    let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
        debug!("  -> No content above {:.1} dBFS, keeping original", parameters.threshold_dbfs);
        return audio;
    };

    let start = first.0.saturating_sub(padding_ms);
    let end = length.min(last.1.saturating_add(padding_ms));
    if end <= start || (start == 0 && end == length) {
        return audio;
    }

    debug!("  -> Keeping {}ms..{}ms of {}ms", start, end, length);
    let trimmed = audio.slice_ms(start, end);
    if trimmed.frames() == 0 { audio } else { trimmed }
}

/// Trim leading and trailing silence from one file
///
/// # Arguments
/// * `backend` - Decoder and encoder for the file
/// * `input` - Source audio file; its extension picks the export format
/// * `output` - Destination path
/// * `parameters` - Silence threshold, minimum silence length and padding
///
/// # Returns
/// Result indicating success or the ProcessError of the failing step
pub fn trim_one<B: Backend>(
    backend: &B,
    input: &Path,
    output: &Path,
    parameters: &TrimParameters,
) -> Result<(), ProcessError> {
    let audio = backend.decode(input)?;
    let trimmed = trim_silence(audio, parameters);
    backend.export(&trimmed, output, &OutputFormat::from_extension(input))
}
