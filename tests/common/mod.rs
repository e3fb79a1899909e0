#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use soundbatch::save::save_as_wav;
use soundbatch::{
    AudioBuffer, Backend, BatchError, Environment, OperationRequest, OutputFormat, ProcessError,
};

/// What the mock backend was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Transcode { input: PathBuf, output: PathBuf, format: String },
    Export { output: PathBuf, format: String, frames: usize },
}

/// Resolves to [`MockBackend`] without looking for any binary.
#[derive(Default)]
pub struct MockEnvironment {
    /// File name whose processing fails with `"boom"`.
    pub fail_on: Option<String>,
    /// Makes `resolve` fail with `MissingEncoder`.
    pub no_encoder: bool,
    pub calls: Rc<RefCell<Vec<Call>>>,
}

impl MockEnvironment {
    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl Environment for MockEnvironment {
    type Backend = MockBackend;

    fn resolve(&self, _request: &OperationRequest) -> Result<MockBackend, BatchError> {
        if self.no_encoder {
            return Err(BatchError::MissingEncoder);
        }
        Ok(MockBackend {
            fail_on: self.fail_on.clone(),
            calls: Rc::clone(&self.calls),
        })
    }
}

/// Transcodes by copying, decodes float WAV through hound, exports float WAV.
pub struct MockBackend {
    fail_on: Option<String>,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl MockBackend {
    fn check(&self, input: &Path) -> Result<(), ProcessError> {
        let name = input.file_name().unwrap_or_default().to_string_lossy();
        if self.fail_on.as_deref() == Some(name.as_ref()) {
            return Err(ProcessError::Message("boom".to_string()));
        }
        Ok(())
    }
}

impl Backend for MockBackend {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: &OutputFormat,
    ) -> Result<(), ProcessError> {
        self.check(input)?;
        fs::copy(input, output)?;
        self.calls.borrow_mut().push(Call::Transcode {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            format: format.to_string(),
        });
        Ok(())
    }

    fn decode(&self, input: &Path) -> Result<AudioBuffer, ProcessError> {
        self.check(input)?;
        let mut reader = hound::WavReader::open(input)?;
        let spec = reader.spec();
        let samples = reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?;
        Ok(AudioBuffer::new(samples, spec.channels as usize, spec.sample_rate))
    }

    fn export(
        &self,
        audio: &AudioBuffer,
        output: &Path,
        format: &OutputFormat,
    ) -> Result<(), ProcessError> {
        save_as_wav(output, audio)?;
        self.calls.borrow_mut().push(Call::Export {
            output: output.to_path_buf(),
            format: format.to_string(),
            frames: audio.frames(),
        });
        Ok(())
    }
}

/// Write a mono float WAV at 1 kHz: `silence_ms` of zeros, `tone_ms` of a
/// half-scale square wave, `silence_ms` of zeros.
pub fn write_padded_tone(path: &Path, silence_ms: usize, tone_ms: usize) {
    let mut samples = vec![0.0; silence_ms];
    samples.extend((0..tone_ms).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }));
    samples.extend(std::iter::repeat_n(0.0, silence_ms));
    save_as_wav(path, &AudioBuffer::new(samples, 1, 1000)).unwrap();
}

/// Write a full-scale 50 Hz sine, one second at 8 kHz.
pub fn write_sine(path: &Path) {
    let samples = (0..8000)
        .map(|n| (n as f32 / 8000.0 * 2.0 * std::f32::consts::PI * 50.0).sin())
        .collect();
    save_as_wav(path, &AudioBuffer::new(samples, 1, 8000)).unwrap();
}

pub fn read_wav(path: &Path) -> AudioBuffer {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<f32>().map(Result::unwrap).collect();
    AudioBuffer::new(samples, spec.channels as usize, spec.sample_rate)
}
