//! Format conversion: a straight re-encode, no sample processing.

use std::fs;
use std::path::Path;

use log::debug;
use tempfile::Builder;

use crate::backend::Backend;
use crate::error::ProcessError;
use crate::format::OutputFormat;

/// Re-encode `input` into `output` as `format`.
///
/// When `output` is the same file as `input` the result is written to a
/// temporary file in the same directory first and then moved over the source.
///
/// # Arguments
/// * `backend` - Encoder used for the re-encode
/// * `input` - Source audio file
/// * `output` - Destination path, usually from the batch's allocator
/// * `format` - Target container and codec
///
/// # Returns
/// `Ok(())` once `output` holds the converted audio, or the ProcessError of
/// the failing step
pub fn convert_one<B: Backend>(
    backend: &B,
    input: &Path,
    output: &Path,
    format: &OutputFormat,
) -> Result<(), ProcessError> {
    if !is_same_file(input, output) {
        return backend.transcode(input, output, format);
    }

    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = Builder::new()
        .prefix(".soundbatch-")
        .suffix(&format!(".{format}"))
        .tempfile_in(parent)?
        .into_temp_path();
    debug!("  -> Converting in place via {:?}", staging);

    backend.transcode(input, &staging, format)?;
    staging.persist(output).map_err(|e| ProcessError::Io(e.error))?;
    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
