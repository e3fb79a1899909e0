//! Immutable description of one batch submission.

use std::path::{Path, PathBuf};

use strum_macros::Display;

use crate::allocate::{Allocations, NameRule};
use crate::config::EngineConfig;
use crate::format::OutputFormat;
use crate::master::{self, MasteringParameters};
use crate::trim::TrimParameters;

/// The three batch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Convert,
    Master,
    Trim,
}

impl OperationKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "convert" => Some(Self::Convert),
            "master" => Some(Self::Master),
            "trim" => Some(Self::Trim),
            _ => None,
        }
    }

    /// Verb used in "Could not {verb} ..." messages.
    #[inline]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Convert => "convert",
            Self::Master => "master",
            Self::Trim => "trim",
        }
    }

    #[inline]
    pub fn past_participle(self) -> &'static str {
        match self {
            Self::Convert => "converted",
            Self::Master => "mastered",
            Self::Trim => "trimmed",
        }
    }

    /// Whether the operation works on decoded samples rather than handing
    /// the file straight to the encoder.
    #[inline]
    pub fn needs_samples(self) -> bool {
        !matches!(self, Self::Convert)
    }
}

/// Operation-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Convert {
        format: OutputFormat,
    },
    Master {
        preset: String,
        parameters: MasteringParameters,
        filename_suffix: String,
    },
    Trim(TrimParameters),
}

impl Operation {
    pub fn convert(format: impl Into<OutputFormat>) -> Self {
        Self::Convert {
            format: format.into(),
        }
    }

    /// Mastering with a named preset's parameters (the defaults when the
    /// preset is unknown) and the configured file name suffix.
    pub fn master_preset(preset: impl Into<String>, config: &EngineConfig) -> Self {
        let preset = preset.into();
        let parameters = master::preset(&preset).unwrap_or_default();
        Self::Master {
            preset,
            parameters,
            filename_suffix: config.mastering_suffix.clone(),
        }
    }

    pub fn trim(parameters: TrimParameters) -> Self {
        Self::Trim(parameters)
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Convert { .. } => OperationKind::Convert,
            Self::Master { .. } => OperationKind::Master,
            Self::Trim(_) => OperationKind::Trim,
        }
    }

    pub fn name_rule(&self) -> NameRule {
        match self {
            Self::Convert { format } => NameRule::Convert {
                format: format.clone(),
            },
            Self::Master {
                filename_suffix, ..
            } => NameRule::Master {
                suffix: filename_suffix.clone(),
            },
            Self::Trim(_) => NameRule::Trim,
        }
    }
}

/// One batch: which files, where to, how, and what to do about collisions.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    input_paths: Vec<PathBuf>,
    output_directory: PathBuf,
    overwrite_existing: bool,
    encoder_override: Option<PathBuf>,
    operation: Operation,
}

impl OperationRequest {
    /// Build a request, taking the overwrite policy and encoder override from `config`.
    pub fn new<I, P>(
        input_paths: I,
        output_directory: impl Into<PathBuf>,
        operation: Operation,
        config: &EngineConfig,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            input_paths: input_paths.into_iter().map(Into::into).collect(),
            output_directory: output_directory.into(),
            overwrite_existing: config.overwrite_existing,
            encoder_override: config.ffmpeg_binary.clone(),
            operation,
        }
    }

    pub fn with_overwrite_existing(mut self, overwrite_existing: bool) -> Self {
        self.overwrite_existing = overwrite_existing;
        self
    }

    pub fn with_encoder_override(mut self, binary: Option<PathBuf>) -> Self {
        if binary.is_some() {
            self.encoder_override = binary;
        }
        self
    }

    #[inline]
    pub fn input_paths(&self) -> &[PathBuf] {
        &self.input_paths
    }

    #[inline]
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    #[inline]
    pub fn overwrite_existing(&self) -> bool {
        self.overwrite_existing
    }

    #[inline]
    pub fn encoder_override(&self) -> Option<&Path> {
        self.encoder_override.as_deref()
    }

    #[inline]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    #[inline]
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// Lazily allocated `(input, output)` pairs in input order.
    pub fn outputs(&self) -> Allocations<'_> {
        Allocations::new(
            &self.input_paths,
            &self.output_directory,
            self.operation.name_rule(),
            self.overwrite_existing,
        )
    }
}
