//! Locating the external encoder and checking the build can run an operation.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::backend::Environment;
use crate::config::EngineConfig;
use crate::error::BatchError;
use crate::ffmpeg::FfmpegBackend;
use crate::request::{OperationKind, OperationRequest};

/// Environment variables naming the encoder binary, in priority order.
pub const BINARY_VARS: [&str; 2] = ["FFMPEG_BINARY", "FFMPEG_BIN"];
/// Names searched for on `PATH`, in priority order.
pub const BINARY_NAMES: [&str; 2] = ["ffmpeg", "avconv"];
/// File names probed inside a bundled binary directory.
const BUNDLED_NAMES: [&str; 3] = ["ffmpeg.exe", "ffmpeg", "avconv"];

/// Where environment variables are read from.
#[derive(Debug, Clone, Default)]
pub enum VarSource {
    /// The current process environment.
    #[default]
    Process,
    /// A fixed set of variables; anything not listed is unset.
    Fixed(HashMap<String, OsString>),
}

impl VarSource {
    pub fn get(&self, key: &str) -> Option<OsString> {
        let value = match self {
            Self::Process => std::env::var_os(key),
            Self::Fixed(vars) => vars.get(key).cloned(),
        };
        value.filter(|value| !value.is_empty())
    }
}

/// Fail with `MissingDependency` when this build cannot run `kind`.
pub fn check_dependencies(kind: OperationKind) -> Result<(), BatchError> {
    if kind.needs_samples() && !cfg!(feature = "native-decode") {
        return Err(BatchError::MissingDependency("symphonia".to_string()));
    }
    Ok(())
}

/// Resolves an [`FfmpegBackend`] afresh for every batch.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentResolver {
    bundled_binary_dir: Option<PathBuf>,
    vars: VarSource,
}

impl EnvironmentResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            bundled_binary_dir: config.bundled_binary_dir.clone(),
            vars: VarSource::Process,
        }
    }

    pub fn with_vars(mut self, vars: VarSource) -> Self {
        self.vars = vars;
        self
    }

    /// First usable encoder binary, trying in order: `explicit`, the
    /// `FFMPEG_BINARY`/`FFMPEG_BIN` variables, the bundled directory, then
    /// `ffmpeg` and `avconv` on `PATH`.
    pub fn locate_encoder(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(explicit) = explicit {
            if explicit.is_file() {
                return Some(explicit.to_path_buf());
            }
            warn!("Configured encoder {:?} is not a file, searching elsewhere", explicit);
        }

        for var in BINARY_VARS {
            let Some(value) = self.vars.get(var) else {
                continue;
            };
            let candidate = PathBuf::from(&value);
            if candidate.is_file() {
                debug!("Using encoder from {}: {:?}", var, candidate);
                return Some(candidate);
            }
            if let Some(found) = self.search_path(&value) {
                debug!("Using encoder from {} via PATH: {:?}", var, found);
                return Some(found);
            }
            warn!("{} is set to {:?} but it could not be found", var, value);
        }

        if let Some(dir) = self.bundled_dir() {
            if let Some(found) = BUNDLED_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|p| p.is_file())
            {
                debug!("Using bundled encoder {:?}", found);
                return Some(found);
            }
        }

        BINARY_NAMES.iter().find_map(|name| self.search_path(name))
    }

    fn bundled_dir(&self) -> Option<PathBuf> {
        match &self.bundled_binary_dir {
            Some(dir) => Some(dir.clone()),
            None => {
                let exe = std::env::current_exe().ok()?;
                Some(exe.parent()?.join("resources").join("bin"))
            }
        }
    }

    fn search_path(&self, name: impl AsRef<std::ffi::OsStr>) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(name, self.vars.get("PATH"), cwd).ok()
    }
}

impl Environment for EnvironmentResolver {
    type Backend = FfmpegBackend;

    fn resolve(&self, request: &OperationRequest) -> Result<FfmpegBackend, BatchError> {
        check_dependencies(request.kind())?;
        let binary = self
            .locate_encoder(request.encoder_override())
            .ok_or(BatchError::MissingEncoder)?;
        debug!("Resolved encoder: {:?}", binary);
        Ok(FfmpegBackend::new(binary))
    }
}
