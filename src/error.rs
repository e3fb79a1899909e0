use std::path::PathBuf;
use std::process::ExitStatus;

#[cfg(feature = "native-decode")]
use symphonia::core::errors::Error as SymphoniaError;

/// Failure of a single file's decode, transform or export step.
///
/// This is the "inner" error carried by [`BatchError::ExportFailure`]; its
/// `Display` text is shown verbatim to the user when the batch had one input.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[cfg(feature = "native-decode")]
    #[error("{0}")]
    Symphonia(#[from] SymphoniaError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Wav(#[from] hound::Error),
    #[error("Failed to launch {binary}: {source}", binary = .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{binary} exited with {status}: {detail}", binary = .binary.display())]
    Encoder {
        binary: PathBuf,
        status: ExitStatus,
        detail: String,
    },
    #[error("No compatible audio track found in {}", .0.display())]
    NoTrack(PathBuf),
    #[error("Input stream does not advertise a sample rate")]
    MissingSampleRate,
    #[error("Input stream does not advertise a channel layout")]
    MissingChannelSpec,
    #[error("Unsupported sample format")]
    UnsupportedFormat,
    #[error("Native audio decoding is not available in this build")]
    NativeDecoderUnavailable,
    /// Free-form failure reported by a [`crate::backend::Backend`] implementation.
    #[error("{0}")]
    Message(String),
}

/// Everything that can abort a batch. Each variant renders to exactly one
/// user-facing sentence via [`crate::message::failure_message`].
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("no input files were provided")]
    NoInput,
    #[error("missing input files: {0:?}")]
    MissingInputFiles(Vec<PathBuf>),
    #[error("missing dependency: {0}")]
    MissingDependency(String),
    #[error("neither ffmpeg nor avconv could be located")]
    MissingEncoder,
    #[error("could not create output directory {}: {source}", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("export failed for {}: {error}", .source_path.display())]
    ExportFailure {
        source_path: PathBuf,
        #[source]
        error: ProcessError,
        total_inputs: usize,
    },
    #[error("no output was produced")]
    NoOutputProduced,
}
