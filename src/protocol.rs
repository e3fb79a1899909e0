//! Line-delimited JSON front end.
//!
//! One request object is read from the input stream. Progress and the final
//! outcome are written to the output stream, one JSON object per line:
//!
//! ```text
//! {"event":"progress","status":"processing","index":1,"total":2,"file":"a.wav","destination":"out/a.mp3"}
//! {"event":"progress","status":"completed","index":1,"total":2,"file":"a.wav","destination":"out/a.mp3"}
//! ...
//! {"event":"complete","status":"success","message":"Converted 2 files into out","outputs":["out/a.mp3","out/b.mp3"]}
//! ```
//!
//! Empty input is a health check answered with `{"status":"ready",...}`.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::Environment;
use crate::batch::{BatchRunner, OperationResult, ProgressEvent, ProgressStatus};
use crate::config::EngineConfig;
use crate::master::{self, MasteringParameters};
use crate::request::{Operation, OperationKind, OperationRequest};
use crate::trim::TrimParameters;

/// Mastering fields a request may override; the rest come from the preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParameterOverrides {
    pub target_lufs: Option<f64>,
    pub apply_compression: Option<bool>,
    pub apply_limiter: Option<bool>,
    pub output_gain: Option<f64>,
}

impl ParameterOverrides {
    pub fn apply_to(&self, base: MasteringParameters) -> MasteringParameters {
        MasteringParameters {
            target_lufs: self.target_lufs.unwrap_or(base.target_lufs),
            apply_compression: self.apply_compression.unwrap_or(base.apply_compression),
            apply_limiter: self.apply_limiter.unwrap_or(base.apply_limiter),
            output_gain: self.output_gain.unwrap_or(base.output_gain),
        }
    }
}

/// The request object as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipeRequest {
    pub operation: Option<String>,
    #[serde(alias = "files")]
    pub input_paths: Vec<PathBuf>,
    #[serde(alias = "output")]
    pub output_directory: Option<PathBuf>,
    #[serde(alias = "format")]
    pub output_format: Option<String>,
    pub overwrite_existing: Option<bool>,
    pub ffmpeg_path: Option<PathBuf>,
    pub preset: Option<String>,
    pub parameters: ParameterOverrides,
    pub filename_suffix: Option<String>,
    pub silence_threshold: Option<f64>,
    pub minimum_silence_ms: Option<f64>,
    pub padding_ms: Option<f64>,
}

impl PipeRequest {
    /// Fill in defaults from `config` and build the engine request.
    pub fn into_request(self, config: &EngineConfig) -> Result<OperationRequest, String> {
        let name = self
            .operation
            .filter(|op| !op.trim().is_empty())
            .unwrap_or_else(|| OperationKind::Convert.to_string());
        let kind = OperationKind::from_name(&name)
            .ok_or_else(|| format!("Unknown operation: {name}"))?;

        let operation = match kind {
            OperationKind::Convert => Operation::convert(
                self.output_format
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| config.default_format.clone())
                    .as_str(),
            ),
            OperationKind::Master => {
                let preset = self.preset.unwrap_or_else(|| config.default_preset.clone());
                let base = master::preset(&preset).unwrap_or_default();
                Operation::Master {
                    parameters: self.parameters.apply_to(base),
                    preset,
                    filename_suffix: self
                        .filename_suffix
                        .unwrap_or_else(|| config.mastering_suffix.clone()),
                }
            }
            OperationKind::Trim => {
                let defaults = TrimParameters::default();
                Operation::trim(TrimParameters {
                    threshold_dbfs: self.silence_threshold.unwrap_or(defaults.threshold_dbfs),
                    min_silence_ms: whole_ms(self.minimum_silence_ms)
                        .unwrap_or(defaults.min_silence_ms),
                    padding_ms: whole_ms(self.padding_ms).unwrap_or(defaults.padding_ms),
                })
            }
        };

        let output_directory = self
            .output_directory
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."));
        let overwrite_existing = self.overwrite_existing.unwrap_or(config.overwrite_existing);
        Ok(
            OperationRequest::new(self.input_paths, output_directory, operation, config)
                .with_overwrite_existing(overwrite_existing)
                .with_encoder_override(self.ffmpeg_path),
        )
    }
}

/// Durations may arrive as any JSON number.
fn whole_ms(value: Option<f64>) -> Option<i64> {
    value.filter(|ms| ms.is_finite()).map(|ms| ms.round() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Success,
    Error,
    Fatal,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Event<'a> {
    Progress {
        status: ProgressStatus,
        index: usize,
        total: usize,
        file: String,
        destination: String,
    },
    Complete {
        status: CompletionStatus,
        message: &'a str,
        outputs: Vec<String>,
    },
}

impl<'a> Event<'a> {
    fn progress(event: &ProgressEvent) -> Self {
        Event::Progress {
            status: event.status,
            index: event.index,
            total: event.total,
            file: event.source.display().to_string(),
            destination: event.destination.display().to_string(),
        }
    }

    fn complete(status: CompletionStatus, result: &'a OperationResult) -> Self {
        Event::Complete {
            status,
            message: &result.message,
            outputs: result.outputs.iter().map(|p| p.display().to_string()).collect(),
        }
    }
}

fn write_line(output: &mut impl Write, value: &impl Serialize) -> io::Result<()> {
    serde_json::to_writer(&mut *output, value)?;
    output.write_all(b"\n")?;
    output.flush()
}

/// Serve one request against the real encoder environment.
pub fn serve(input: impl Read, output: impl Write, config: &EngineConfig) -> io::Result<i32> {
    serve_with(input, output, &BatchRunner::from_config(config), config)
}

/// Serve one request, returning the process exit code.
pub fn serve_with<E: Environment>(
    mut input: impl Read,
    mut output: impl Write,
    runner: &BatchRunner<E>,
    config: &EngineConfig,
) -> io::Result<i32> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;
    if raw.trim().is_empty() {
        write_line(&mut output, &json!({"status": "ready", "message": "Backend ready"}))?;
        return Ok(0);
    }

    let request = match serde_json::from_str::<PipeRequest>(&raw)
        .map_err(|e| format!("Invalid JSON input: {e}"))
        .and_then(|parsed| parsed.into_request(config))
    {
        Ok(request) => request,
        Err(message) => {
            error!("{}", message);
            let result = OperationResult::failure(message);
            write_line(&mut output, &Event::complete(CompletionStatus::Fatal, &result))?;
            return Ok(1);
        }
    };
    info!(
        "Received {} request (files={}, output={:?})",
        request.kind(),
        request.input_paths().len(),
        request.output_directory()
    );

    let mut write_error = None;
    let result = runner.run_with_progress(&request, |event| {
        if write_error.is_none() {
            write_error = write_line(&mut output, &Event::progress(event)).err();
        }
    });
    if let Some(e) = write_error {
        return Err(e);
    }

    let status = if result.success {
        CompletionStatus::Success
    } else {
        CompletionStatus::Error
    };
    write_line(&mut output, &Event::complete(status, &result))?;
    Ok(if result.success { 0 } else { 1 })
}
