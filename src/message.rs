//! One human-readable sentence per batch outcome.

use std::path::{Path, PathBuf};

use crate::error::BatchError;
use crate::request::{Operation, OperationKind, OperationRequest};

/// Sentence reported after every file of `request` was written to `outputs`.
pub fn success_message(request: &OperationRequest, outputs: &[PathBuf]) -> String {
    if let [only] = outputs {
        return match request.operation() {
            Operation::Master { preset, .. } => format!(
                "'{}' mastered successfully using the '{}' preset.",
                only.file_name().unwrap_or_default().to_string_lossy(),
                preset
            ),
            _ => format!("Saved file to {}", only.display()),
        };
    }

    let count = outputs.len();
    match request.operation() {
        Operation::Convert { .. } => format!(
            "Converted {} files into {}",
            count,
            destination_text(request, outputs).display()
        ),
        Operation::Trim(_) => format!(
            "Trimmed silence from {} files into {}",
            count,
            destination_text(request, outputs).display()
        ),
        Operation::Master { preset, .. } => {
            format!("{count} files mastered successfully using the '{preset}' preset.")
        }
    }
}

/// The requested output directory, or where the first file went if none was given.
fn destination_text<'a>(request: &'a OperationRequest, outputs: &'a [PathBuf]) -> &'a Path {
    let requested = request.output_directory();
    if !requested.as_os_str().is_empty() {
        return requested;
    }
    outputs
        .first()
        .and_then(|p| p.parent())
        .unwrap_or(requested)
}

/// Sentence reported when `error` aborted a batch of `kind`.
pub fn failure_message(kind: OperationKind, error: &BatchError) -> String {
    match error {
        BatchError::NoInput => "No audio files were selected.".to_string(),
        BatchError::MissingInputFiles(missing) => match missing.as_slice() {
            [only] => format!("The file '{}' could not be found.", only.display()),
            _ => {
                let joined = missing
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("The following files are missing: {joined}")
            }
        },
        BatchError::MissingDependency(name) if name == "symphonia" => {
            "This build does not include the native audio decoder ('symphonia') needed for \
             sample-level processing. Rebuild with the `native-decode` feature enabled."
                .to_string()
        }
        BatchError::MissingDependency(name) => {
            format!("The dependency '{name}' is missing. Please install it and try again.")
        }
        BatchError::MissingEncoder => "Neither 'ffmpeg' nor 'avconv' could be located. Install \
             FFmpeg and ensure it is discoverable via the PATH environment variable."
            .to_string(),
        BatchError::OutputDirectory { path, source } => format!(
            "Could not create the output directory '{}': {}",
            path.display(),
            source
        ),
        BatchError::ExportFailure {
            source_path,
            error,
            total_inputs,
        } => {
            if *total_inputs == 1 {
                error.to_string()
            } else {
                format!(
                    "Could not {} '{}': {}",
                    kind.verb(),
                    source_path.file_name().unwrap_or_default().to_string_lossy(),
                    error
                )
            }
        }
        BatchError::NoOutputProduced => format!(
            "None of the selected files could be {}.",
            kind.past_participle()
        ),
    }
}
