use std::path::PathBuf;

use crate::master::DEFAULT_PRESET;

/// Engine-wide defaults that requests are built from.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit encoder binary; takes priority over every other lookup.
    pub ffmpeg_binary: Option<PathBuf>,
    /// Directory holding a bundled `ffmpeg`/`avconv`. If not set, `resources/bin`
    /// next to the running executable is probed.
    pub bundled_binary_dir: Option<PathBuf>,
    /// Conversion target used when a request names none.
    pub default_format: String,
    /// Replace existing files instead of numbering new ones.
    pub overwrite_existing: bool,
    /// Appended to the stem of mastered files.
    pub mastering_suffix: String,
    /// Mastering preset used when a request names none.
    pub default_preset: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ffmpeg_binary: None,
            bundled_binary_dir: None,
            default_format: "mp3".to_string(),
            overwrite_existing: true,
            mastering_suffix: "_mastered".to_string(),
            default_preset: DEFAULT_PRESET.to_string(),
        }
    }
}
