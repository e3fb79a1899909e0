//! The production [`Backend`]: an external `ffmpeg`/`avconv` binary for
//! encoding, symphonia for decoding.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, warn};
use tempfile::Builder;

use crate::audio::AudioBuffer;
use crate::backend::Backend;
use crate::error::ProcessError;
use crate::format::OutputFormat;
use crate::save::save_as_wav;

/// Stderr lines kept for the error message of a failed run.
const STDERR_TAIL_LINES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegBackend {
    binary: PathBuf,
}

impl FfmpegBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    #[inline]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// `-hide_banner -nostdin -loglevel error -y -i <input> -vn <args> <output>`
    fn command_args(input: &Path, output: &Path, codec_args: &[String]) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.push("-vn".into());
        args.extend(codec_args.iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Run the encoder to completion, logging its stderr line by line.
    fn run(&self, input: &Path, output: &Path, codec_args: &[String]) -> Result<(), ProcessError> {
        let args = Self::command_args(input, output, codec_args);
        debug!("Running {:?} {:?}", self.binary, args);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(stderr) = child.stderr.take() {
            let mut reader = BufReader::new(stderr);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Could not read encoder output: {}", e);
                        break;
                    }
                }
                // Paths in encoder messages are not necessarily UTF-8.
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!(target: "ffmpeg", "{}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            }
        }

        let status = child.wait()?;
        if status.success() {
            return Ok(());
        }
        Err(ProcessError::Encoder {
            binary: self.binary.clone(),
            status,
            detail: Vec::from(tail).join("; "),
        })
    }

    #[cfg(feature = "native-decode")]
    fn decode_via_encoder(&self, input: &Path) -> Result<AudioBuffer, ProcessError> {
        let staging = Builder::new()
            .prefix("soundbatch-decode-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();
        let codec_args = ["-c:a", "pcm_f32le", "-f", "wav"].map(String::from);
        self.run(input, &staging, &codec_args)?;
        crate::decode::decode_file(&staging)
    }
}

impl Backend for FfmpegBackend {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: &OutputFormat,
    ) -> Result<(), ProcessError> {
        self.run(input, output, &format.encoder_args())
    }

    #[cfg(feature = "native-decode")]
    fn decode(&self, input: &Path) -> Result<AudioBuffer, ProcessError> {
        match crate::decode::decode_file(input) {
            Err(ProcessError::Symphonia(symphonia::core::errors::Error::Unsupported(what))) => {
                debug!(
                    "{:?}: native decoder does not support {}, decoding through {:?}",
                    input.file_name().unwrap_or_default(),
                    what,
                    self.binary
                );
                self.decode_via_encoder(input)
            }
            other => other,
        }
    }

    #[cfg(not(feature = "native-decode"))]
    fn decode(&self, _input: &Path) -> Result<AudioBuffer, ProcessError> {
        Err(ProcessError::NativeDecoderUnavailable)
    }

    fn export(
        &self,
        audio: &AudioBuffer,
        output: &Path,
        format: &OutputFormat,
    ) -> Result<(), ProcessError> {
        let staging = Builder::new()
            .prefix("soundbatch-export-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();
        save_as_wav(&staging, audio)?;
        self.run(&staging, output, &format.encoder_args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_layout() {
        let args = FfmpegBackend::command_args(
            Path::new("in.wav"),
            Path::new("out.mp3"),
            &OutputFormat::new("mp3").encoder_args(),
        );
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-hide_banner",
                "-nostdin",
                "-loglevel",
                "error",
                "-y",
                "-i",
                "in.wav",
                "-vn",
                "-c:a",
                "libmp3lame",
                "-b:a",
                "192k",
                "-f",
                "mp3",
                "out.mp3"
            ]
        );
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let backend = FfmpegBackend::new("/nonexistent/soundbatch-ffmpeg");
        let err = backend
            .transcode(Path::new("a.wav"), Path::new("b.mp3"), &OutputFormat::new("mp3"))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }), "{err:?}");
        assert!(err.to_string().starts_with("Failed to launch /nonexistent/soundbatch-ffmpeg"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_encoder_reports_stderr_tail() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-ffmpeg");
        fs::write(
            &script,
            "#!/bin/sh\nfor i in 1 2 3 4 5 6; do echo \"line $i\" >&2; done\nexit 3\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let backend = FfmpegBackend::new(&script);
        let err = backend
            .transcode(Path::new("a.wav"), Path::new("b.mp3"), &OutputFormat::new("mp3"))
            .unwrap_err();
        let ProcessError::Encoder { status, detail, .. } = &err else {
            panic!("expected encoder failure, got {err:?}");
        };
        assert_eq!(status.code(), Some(3));
        assert_eq!(detail, "line 3; line 4; line 5; line 6");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_stderr_still_reports_encoder_failure() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-ffmpeg");
        fs::write(
            &script,
            "#!/bin/sh\nprintf 'bad \\377 name: No such file\\n' >&2\nexit 1\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let backend = FfmpegBackend::new(&script);
        let err = backend
            .transcode(Path::new("a.wav"), Path::new("b.mp3"), &OutputFormat::new("mp3"))
            .unwrap_err();
        let ProcessError::Encoder { status, detail, .. } = &err else {
            panic!("expected encoder failure, got {err:?}");
        };
        assert_eq!(status.code(), Some(1));
        assert_eq!(detail, "bad \u{FFFD} name: No such file");
    }

    #[cfg(all(unix, feature = "native-decode"))]
    #[test]
    fn unrecognised_input_is_decoded_through_encoder() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("fixture.wav");
        let expected = AudioBuffer::new(vec![0.5, -0.5, 0.25, -0.25, 0.125, -0.125], 2, 8000);
        save_as_wav(&fixture, &expected).unwrap();

        let input = dir.path().join("clip.xyz");
        // No container marker anywhere, so probing fails as unsupported.
        fs::write(&input, " ".repeat(256)).unwrap();

        // Writes the fixture to the last argument.
        let script = dir.path().join("fake-ffmpeg");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\nfor last; do :; done\ncp '{}' \"$last\"\n",
                fixture.display()
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let decoded = FfmpegBackend::new(&script).decode(&input).unwrap();
        assert_eq!(decoded.channels(), 2);
        assert_eq!(decoded.sample_rate(), 8000);
        assert_eq!(decoded.samples(), expected.samples());
    }

    #[cfg(unix)]
    #[test]
    fn export_hands_float_wav_to_encoder() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-ffmpeg");
        // Copies the `-i` argument to the last argument.
        fs::write(
            &script,
            "#!/bin/sh\nwhile [ \"$1\" != \"-i\" ]; do shift; done\nin=\"$2\"\nfor last; do :; done\ncp \"$in\" \"$last\"\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let output = dir.path().join("copy.wav");
        let backend = FfmpegBackend::new(&script);
        let audio = AudioBuffer::new(vec![0.5, -0.5, 0.25, -0.25], 2, 8000);
        backend.export(&audio, &output, &OutputFormat::new("wav")).unwrap();

        let reader = hound::WavReader::open(&output).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 8000);
    }
}
