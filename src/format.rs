//! Output format names and the encoder settings used for each of them.

use std::fmt;
use std::path::Path;

use strum_macros::Display;

/// Formats offered for conversion, in the order they are presented.
pub const SUPPORTED_FORMATS: &[&str] = &["mp3", "wav", "ogg", "flac", "aac", "wma", "m4a", "opus"];

/// Formats with an explicit codec table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum KnownFormat {
    Mp3,
    Aac,
    M4a,
    Wav,
    Flac,
    Ogg,
    Opus,
    Wma,
}

/// Arguments handed to the encoder for one output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecProfile {
    pub codec: &'static str,
    pub bitrate: Option<&'static str>,
    pub container: &'static str,
}

impl KnownFormat {
    #[inline]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "mp3" => Self::Mp3,
            "aac" => Self::Aac,
            "m4a" => Self::M4a,
            "wav" => Self::Wav,
            "flac" => Self::Flac,
            "ogg" => Self::Ogg,
            "opus" => Self::Opus,
            "wma" => Self::Wma,
            _ => return None,
        })
    }

    pub fn profile(self) -> CodecProfile {
        let (codec, bitrate, container) = match self {
            Self::Mp3 => ("libmp3lame", Some("192k"), "mp3"),
            Self::Aac => ("aac", Some("192k"), "adts"),
            Self::M4a => ("aac", Some("192k"), "ipod"),
            Self::Wav => ("pcm_s16le", None, "wav"),
            Self::Flac => ("flac", None, "flac"),
            Self::Ogg => ("libvorbis", Some("192k"), "ogg"),
            Self::Opus => ("libopus", Some("128k"), "opus"),
            Self::Wma => ("wmav2", Some("192k"), "asf"),
        };
        CodecProfile {
            codec,
            bitrate,
            container,
        }
    }
}

/// A lower-cased target format name such as `"mp3"`.
///
/// Names outside the codec table are still accepted; the encoder is then
/// asked for that container by name and picks its default codec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputFormat(String);

impl OutputFormat {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().trim_start_matches('.').to_lowercase())
    }

    /// Format implied by a path's extension, `wav` when there is none.
    pub fn from_extension(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension() {
            Some(ext) if !ext.is_empty() => Self::new(ext.to_string_lossy()),
            _ => Self::new("wav"),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn known(&self) -> Option<KnownFormat> {
        KnownFormat::from_name(&self.0)
    }

    /// Encoder arguments (`-c:a`, `-b:a`, `-f`) for this format.
    pub fn encoder_args(&self) -> Vec<String> {
        match self.known() {
            Some(known) => {
                let profile = known.profile();
                let mut args = vec!["-c:a".to_string(), profile.codec.to_string()];
                if let Some(bitrate) = profile.bitrate {
                    args.push("-b:a".to_string());
                    args.push(bitrate.to_string());
                }
                args.push("-f".to_string());
                args.push(profile.container.to_string());
                args
            }
            None => vec!["-f".to_string(), self.0.clone()],
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OutputFormat {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
