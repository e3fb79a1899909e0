//! Automatic mastering: compression, level matching, peak limiting, output gain.
//!
//! The level match targets a value named in LUFS but measures the plain RMS
//! level of the signal, which is only an approximation of ITU-R BS.1770
//! integrated loudness. The real integrated loudness is logged at debug level
//! so the difference can be inspected.

use std::path::Path;

use ebur128::{EbuR128, Mode};
use log::{debug, log_enabled};

use crate::audio::{AudioBuffer, db_to_ratio, ratio_to_db};
use crate::backend::Backend;
use crate::error::ProcessError;
use crate::format::OutputFormat;

pub const DEFAULT_PRESET: &str = "Music";

pub const COMPRESSOR_THRESHOLD_DB: f64 = -20.0;
pub const COMPRESSOR_RATIO: f64 = 4.0;
pub const COMPRESSOR_ATTACK_MS: f64 = 5.0;
pub const COMPRESSOR_RELEASE_MS: f64 = 100.0;
/// Ceiling the limiter pulls peaks down to.
pub const LIMITER_HEADROOM_DB: f64 = -1.0;

/// User-adjustable mastering settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteringParameters {
    /// Target average level (RMS proxy, see module docs).
    pub target_lufs: f64,
    pub apply_compression: bool,
    pub apply_limiter: bool,
    /// Gain in dB applied after everything else.
    pub output_gain: f64,
}

impl Default for MasteringParameters {
    fn default() -> Self {
        MasteringParameters {
            target_lufs: -14.0,
            apply_compression: true,
            apply_limiter: true,
            output_gain: 0.0,
        }
    }
}

/// Presets shipped by default, in display order.
pub const PRESETS: [(&str, MasteringParameters); 3] = [
    (
        "Music",
        MasteringParameters {
            target_lufs: -12.0,
            apply_compression: true,
            apply_limiter: true,
            output_gain: 0.0,
        },
    ),
    (
        "Podcast",
        MasteringParameters {
            target_lufs: -16.0,
            apply_compression: true,
            apply_limiter: true,
            output_gain: 1.5,
        },
    ),
    (
        "Voice-over",
        MasteringParameters {
            target_lufs: -18.0,
            apply_compression: true,
            apply_limiter: true,
            output_gain: 0.5,
        },
    ),
];

/// Parameters of a preset, matched case-insensitively.
pub fn preset(name: &str) -> Option<MasteringParameters> {
    PRESETS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
        .map(|(_, parameters)| *parameters)
}

/// Feed-forward RMS compressor.
///
/// The detector looks at the RMS of the `attack_ms` window preceding each
/// frame. Above the threshold, attenuation ramps linearly towards
/// `(1 - 1/ratio)` of the overshoot within the attack time; otherwise the
/// held attenuation decays over the release time.
///
/// Unlike pydub's compressor, release steps are sized from the held
/// attenuation as well, so a level that drops far below the threshold
/// recovers within `release_ms` instead of staying attenuated.
pub fn compress_dynamic_range(
    audio: &mut AudioBuffer,
    threshold_db: f64,
    ratio: f64,
    attack_ms: f64,
    release_ms: f64,
) {
    let threshold = db_to_ratio(threshold_db);
    let rate = audio.sample_rate() as f64;
    let look_frames = (attack_ms * rate / 1000.0) as usize;
    let attack_frames = (attack_ms * rate / 1000.0).max(1.0);
    let release_frames = (release_ms * rate / 1000.0).max(1.0);
    let reduction = 1.0 - 1.0 / ratio;

    let energy = audio.energy_index();
    let mut attenuation = 0.0_f64;
    for frame in 0..audio.frames() {
        let rms_now = energy.rms(frame.saturating_sub(look_frames), frame);
        let over_db = if rms_now == 0.0 {
            0.0
        } else {
            ratio_to_db(rms_now / threshold).max(0.0)
        };
        let max_attenuation = reduction * over_db;

        if rms_now > threshold && attenuation <= max_attenuation {
            attenuation = (attenuation + max_attenuation / attack_frames).min(max_attenuation);
        } else {
            let step = attenuation.max(max_attenuation) / release_frames;
            attenuation = (attenuation - step).max(0.0);
        }

        if attenuation != 0.0 {
            audio.scale_frame(frame, db_to_ratio(-attenuation) as f32);
        }
    }
}

/// Run the mastering chain in place.
pub fn apply_mastering(audio: &mut AudioBuffer, parameters: &MasteringParameters) {
    if parameters.apply_compression {
        compress_dynamic_range(
            audio,
            COMPRESSOR_THRESHOLD_DB,
            COMPRESSOR_RATIO,
            COMPRESSOR_ATTACK_MS,
            COMPRESSOR_RELEASE_MS,
        );
    }

    if parameters.target_lufs.is_finite() {
        let current_level = audio.dbfs();
        if current_level.is_finite() {
            let gain = parameters.target_lufs - current_level;
            debug!(
                "  -> Level {:.2} dBFS, target {:.2}, gain {:.2} dB",
                current_level, parameters.target_lufs, gain
            );
            audio.apply_gain(gain);
        }
    }

    if parameters.apply_limiter {
        let peak = audio.max_dbfs();
        if peak.is_finite() && peak > LIMITER_HEADROOM_DB {
            debug!(
                "  -> Peak {:.2} dBFS above {:.1}, limiting by {:.2} dB",
                peak,
                LIMITER_HEADROOM_DB,
                LIMITER_HEADROOM_DB - peak
            );
            audio.apply_gain(LIMITER_HEADROOM_DB - peak);
        }
    }

    if parameters.output_gain != 0.0 {
        audio.apply_gain(parameters.output_gain);
    }
}

/// EBU R128 integrated loudness of `audio` in LUFS.
pub fn integrated_loudness(audio: &AudioBuffer) -> Result<f64, ebur128::Error> {
    let mut meter = EbuR128::new(audio.channels() as u32, audio.sample_rate(), Mode::I)?;
    meter.add_frames_f32(audio.samples())?;
    meter.loudness_global()
}

/// Master one file
///
/// Decodes `input`, runs [`apply_mastering`] on the samples and exports the
/// result. The export format follows the destination's extension.
///
/// # Arguments
/// * `backend` - Decoder and encoder for the file
/// * `input` - Source audio file
/// * `output` - Destination path
/// * `parameters` - Mastering chain settings, usually a resolved preset
///
/// # Returns
/// Result indicating success or the ProcessError of the failing step
pub fn master_one<B: Backend>(
    backend: &B,
    input: &Path,
    output: &Path,
    parameters: &MasteringParameters,
) -> Result<(), ProcessError> {
    let mut audio = backend.decode(input)?;

    if log_enabled!(log::Level::Debug) {
        match integrated_loudness(&audio) {
            Ok(lufs) => debug!(
                "{:?}: RMS level {:.2} dBFS, integrated loudness {:.2} LUFS",
                input.file_name().unwrap_or_default(),
                audio.dbfs(),
                lufs
            ),
            Err(e) => debug!(
                "{:?}: integrated loudness unavailable: {}",
                input.file_name().unwrap_or_default(),
                e
            ),
        }
    }

    apply_mastering(&mut audio, parameters);
    backend.export(&audio, output, &OutputFormat::from_extension(output))
}
