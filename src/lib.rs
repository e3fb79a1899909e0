//! Batch audio conversion, automatic mastering and silence trimming.
//!
//! A batch is described by an [`OperationRequest`] and executed by a
//! [`BatchRunner`], which validates the inputs, resolves an encoder, allocates
//! collision-free destinations and processes files one at a time. The outcome
//! is always an [`OperationResult`] with a single human-readable message.

pub mod allocate;
pub mod audio;
pub mod backend;
pub mod batch;
pub mod config;
pub mod convert;
#[cfg(feature = "native-decode")]
pub mod decode;
pub mod environment;
/// Module for error handling
pub mod error;
pub mod ffmpeg;
pub mod format;
pub mod master;
pub mod message;
pub mod protocol;
pub mod request;
/// Module for saving audio files
pub mod save;
pub mod trim;

pub use audio::AudioBuffer;
pub use backend::{Backend, Environment};
pub use batch::{BatchRunner, OperationResult, ProgressEvent, ProgressStatus, run};
pub use config::EngineConfig;
pub use environment::EnvironmentResolver;
pub use error::{BatchError, ProcessError};
pub use format::{OutputFormat, SUPPORTED_FORMATS};
pub use master::MasteringParameters;
pub use request::{Operation, OperationKind, OperationRequest};
pub use trim::TrimParameters;
