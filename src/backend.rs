//! The seam between the batch engine and whatever decodes and encodes audio.

use std::path::Path;

use crate::audio::AudioBuffer;
use crate::error::{BatchError, ProcessError};
use crate::format::OutputFormat;
use crate::request::OperationRequest;

/// A resolved decode/encode backend, valid for the batch it was resolved for.
pub trait Backend {
    /// Re-encode `input` into `output` without touching samples.
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: &OutputFormat,
    ) -> Result<(), ProcessError>;

    /// Decode any supported container into memory.
    fn decode(&self, input: &Path) -> Result<AudioBuffer, ProcessError>;

    /// Encode `audio` to `output` in `format`.
    fn export(
        &self,
        audio: &AudioBuffer,
        output: &Path,
        format: &OutputFormat,
    ) -> Result<(), ProcessError>;
}

/// Produces a [`Backend`] for one batch, or explains why none is available.
///
/// Called at the start of every batch; implementations must not cache the
/// outcome across calls.
pub trait Environment {
    type Backend: Backend;

    fn resolve(&self, request: &OperationRequest) -> Result<Self::Backend, BatchError>;
}
