//! Runs one request from validation to the final message.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use serde::Serialize;
use strum_macros::Display;

use crate::backend::{Backend, Environment};
use crate::config::EngineConfig;
use crate::convert::convert_one;
use crate::environment::EnvironmentResolver;
use crate::error::{BatchError, ProcessError};
use crate::master::master_one;
use crate::message::{failure_message, success_message};
use crate::request::{Operation, OperationRequest};
use crate::trim::trim_one;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Processing,
    Completed,
}

/// Emitted before and after each file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    /// 1-based position of the file in the batch.
    pub index: usize,
    pub total: usize,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Outcome of a batch as handed back to callers. Never an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    /// Written files, in input order. Empty when the batch failed.
    pub outputs: Vec<PathBuf>,
}

impl OperationResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            outputs: Vec::new(),
        }
    }
}

/// Inputs from `request` that are not on disk.
pub fn validate_inputs(request: &OperationRequest) -> Result<(), BatchError> {
    if request.input_paths().is_empty() {
        return Err(BatchError::NoInput);
    }
    let missing: Vec<PathBuf> = request
        .input_paths()
        .iter()
        .filter(|p| !p.exists())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(BatchError::MissingInputFiles(missing));
    }
    Ok(())
}

fn process_one<B: Backend>(
    backend: &B,
    operation: &Operation,
    input: &Path,
    output: &Path,
) -> Result<(), ProcessError> {
    match operation {
        Operation::Convert { format } => convert_one(backend, input, output, format),
        Operation::Master { parameters, .. } => master_one(backend, input, output, parameters),
        Operation::Trim(parameters) => trim_one(backend, input, output, parameters),
    }
}

/// Sequential batch engine over an [`Environment`].
pub struct BatchRunner<E> {
    environment: E,
}

impl BatchRunner<EnvironmentResolver> {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(EnvironmentResolver::new(config))
    }
}

impl<E: Environment> BatchRunner<E> {
    pub fn new(environment: E) -> Self {
        Self { environment }
    }

    /// Validate, resolve, then process every file in input order, stopping
    /// at the first failure. Files written before a failure stay on disk.
    pub fn execute(
        &self,
        request: &OperationRequest,
        mut on_progress: impl FnMut(&ProgressEvent),
    ) -> Result<Vec<PathBuf>, BatchError> {
        validate_inputs(request)?;
        let backend = self.environment.resolve(request)?;

        let output_directory = request.output_directory();
        if !output_directory.as_os_str().is_empty() {
            fs::create_dir_all(output_directory).map_err(|source| BatchError::OutputDirectory {
                path: output_directory.to_path_buf(),
                source,
            })?;
        }

        let total = request.input_paths().len();
        let mut outputs = Vec::with_capacity(total);
        for (position, (input, output)) in request.outputs().enumerate() {
            let mut event = ProgressEvent {
                status: ProgressStatus::Processing,
                index: position + 1,
                total,
                source: input.to_path_buf(),
                destination: output.clone(),
            };
            on_progress(&event);
            debug!("[{}/{}] {:?} -> {:?}", event.index, total, input, output);

            process_one(&backend, request.operation(), input, &output).map_err(|error| {
                BatchError::ExportFailure {
                    source_path: input.to_path_buf(),
                    error,
                    total_inputs: total,
                }
            })?;

            event.status = ProgressStatus::Completed;
            on_progress(&event);
            outputs.push(output);
        }

        if outputs.is_empty() {
            return Err(BatchError::NoOutputProduced);
        }
        Ok(outputs)
    }

    pub fn run(&self, request: &OperationRequest) -> OperationResult {
        self.run_with_progress(request, |_| {})
    }

    pub fn run_with_progress(
        &self,
        request: &OperationRequest,
        on_progress: impl FnMut(&ProgressEvent),
    ) -> OperationResult {
        let kind = request.kind();
        match self.execute(request, on_progress) {
            Ok(outputs) => {
                let message = success_message(request, &outputs);
                info!("{}", message);
                OperationResult {
                    success: true,
                    message,
                    outputs,
                }
            }
            Err(e) => {
                error!("{} failed: {}", kind, e);
                OperationResult::failure(failure_message(kind, &e))
            }
        }
    }
}

/// Run `request` against the real encoder environment described by `config`.
pub fn run(request: &OperationRequest, config: &EngineConfig) -> OperationResult {
    BatchRunner::from_config(config).run(request)
}
