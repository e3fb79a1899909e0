use std::path::Path;

use crate::audio::AudioBuffer;
use crate::error::ProcessError;

/// Saves audio as a 32-bit float WAV file
///
/// Float samples keep any headroom above full scale produced by gain stages;
/// the encoder decides how to handle it for the final format.
///
/// # Arguments
/// * `path` - Output file path
/// * `audio` - Interleaved samples with their channel count and sample rate
///
/// # Returns
/// Result indicating success or a ProcessError
pub fn save_as_wav(path: &Path, audio: &AudioBuffer) -> Result<(), ProcessError> {
    let spec = hound::WavSpec {
        channels: audio.channels() as u16,
        sample_rate: audio.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in audio.samples() {
        writer.write_sample(sample)?;
    }
    Ok(writer.finalize()?)
}
