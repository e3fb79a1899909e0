//! In-process decoding through symphonia.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use symphonia::core::audio::AudioBufferRef;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::AudioBuffer;
use crate::error::ProcessError;

/// Decode the first audio track of `path` into interleaved `f32`.
pub fn decode_file(path: impl AsRef<Path>) -> Result<AudioBuffer, ProcessError> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ProcessError::NoTrack(path.to_path_buf()))?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(ProcessError::MissingSampleRate)?;
    let mut channel_count = track.codec_params.channels.map(|c| c.count());

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;

    let mut planes: Vec<Vec<f32>> = Vec::new();
    let mut packet_count = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }
        packet_count += 1;

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let current = convert_buffer_to_planar_f32(&decoded)?;
                let channels = *channel_count.get_or_insert(current.len());
                if planes.is_empty() {
                    planes = vec![Vec::new(); channels];
                }
                for (plane, samples) in planes.iter_mut().zip(current) {
                    plane.extend(samples);
                }
            }
            Err(SymphoniaError::DecodeError(e)) => warn!(
                "Decode error in {:?}: {}. Skipping packet.",
                path.file_name().unwrap_or_default(),
                e
            ),
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let channels = channel_count.ok_or(ProcessError::MissingChannelSpec)?;
    if channels == 0 {
        return Err(ProcessError::MissingChannelSpec);
    }
    debug!(
        "Decoded {:?}: {} packets, {} channels at {} Hz",
        path.file_name().unwrap_or_default(),
        packet_count,
        channels,
        sample_rate
    );

    if planes.is_empty() {
        planes = vec![Vec::new(); channels];
    }
    Ok(AudioBuffer::new(interleave_planar_f32(&planes), channels, sample_rate))
}

/// Any symphonia sample format as one `f32` vector per channel.
fn convert_buffer_to_planar_f32(
    decoded: &AudioBufferRef<'_>,
) -> Result<Vec<Vec<f32>>, ProcessError> {
    let num_channels = decoded.spec().channels.count();
    let mut planar_output: Vec<Vec<f32>> = Vec::with_capacity(num_channels);

    match decoded {
        AudioBufferRef::F32(buf) => {
            for plane in buf.planes().planes() {
                planar_output.push(plane.to_vec());
            }
        }
        AudioBufferRef::F64(buf) => {
            for plane in buf.planes().planes() {
                planar_output.push(plane.iter().map(|&s| s as f32).collect());
            }
        }
        AudioBufferRef::S32(buf) => {
            for plane in buf.planes().planes() {
                planar_output.push(plane.iter().map(|&s| (s as f32) / (i32::MAX as f32)).collect());
            }
        }
        AudioBufferRef::S24(buf) => {
            for plane in buf.planes().planes() {
                // 2^23 - 1
                let max_value = 8388607.0;
                planar_output.push(plane.iter().map(|&s| s.inner() as f32 / max_value).collect());
            }
        }
        AudioBufferRef::S16(buf) => {
            for plane in buf.planes().planes() {
                planar_output.push(plane.iter().map(|&s| (s as f32) / (i16::MAX as f32)).collect());
            }
        }
        AudioBufferRef::U8(buf) => {
            for plane in buf.planes().planes() {
                planar_output.push(
                    plane
                        .iter()
                        .map(|&s| ((s as i16 - 128) as f32) / 128.0)
                        .collect(),
                );
            }
        }
        _ => return Err(ProcessError::UnsupportedFormat),
    }
    Ok(planar_output)
}

fn interleave_planar_f32(planar_samples: &[Vec<f32>]) -> Vec<f32> {
    let num_channels = planar_samples.len();
    let num_frames = planar_samples.iter().map(Vec::len).min().unwrap_or(0);
    if planar_samples.iter().any(|p| p.len() != num_frames) {
        warn!("Planar sample planes have different lengths, truncating to {num_frames} frames");
    }

    let mut interleaved = Vec::with_capacity(num_frames * num_channels);
    for frame_idx in 0..num_frames {
        for plane in planar_samples {
            interleaved.push(plane[frame_idx]);
        }
    }
    interleaved
}
