mod common;

use std::fs;
use std::path::PathBuf;

use common::{Call, MockEnvironment, read_wav, write_padded_tone, write_sine};
use soundbatch::{
    BatchRunner, EngineConfig, Operation, OperationRequest, ProgressStatus, TrimParameters,
};
use tempfile::tempdir;

fn convert_request(inputs: &[PathBuf], output: &std::path::Path, format: &str) -> OperationRequest {
    OperationRequest::new(
        inputs.to_vec(),
        output,
        Operation::convert(format),
        &EngineConfig::default(),
    )
}

#[test]
fn empty_selection_reports_no_input() {
    let runner = BatchRunner::new(MockEnvironment::default());
    let request = convert_request(&[], std::path::Path::new("out"), "mp3");
    let result = runner.run(&request);
    assert!(!result.success);
    assert_eq!(result.message, "No audio files were selected.");
    assert!(result.outputs.is_empty());
}

#[test]
fn single_missing_file_is_named() {
    let out = tempdir().unwrap();
    let runner = BatchRunner::new(MockEnvironment::default());
    let request = convert_request(&[PathBuf::from("foo.wav")], out.path(), "mp3");
    let result = runner.run(&request);
    assert!(!result.success);
    assert_eq!(result.message, "The file 'foo.wav' could not be found.");
}

#[test]
fn validation_failure_touches_nothing() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("never-created");
    let env = MockEnvironment {
        no_encoder: true,
        ..MockEnvironment::default()
    };
    let input = dir.path().join("a.wav");
    fs::write(&input, b"pcm").unwrap();

    let result = BatchRunner::new(env).run(&convert_request(&[input], &out, "mp3"));
    assert!(!result.success);
    assert_eq!(
        result.message,
        "Neither 'ffmpeg' nor 'avconv' could be located. Install FFmpeg and ensure it is \
         discoverable via the PATH environment variable."
    );
    assert!(!out.exists());
}

#[test]
fn second_file_failure_aborts_without_rollback() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.wav");
    let second = dir.path().join("second.wav");
    let third = dir.path().join("third.wav");
    for path in [&first, &second, &third] {
        fs::write(path, b"pcm").unwrap();
    }
    let out = dir.path().join("out");

    let env = MockEnvironment::failing_on("second.wav");
    let runner = BatchRunner::new(env);
    let request = convert_request(&[first, second, third], &out, "mp3");
    let result = runner.run(&request);

    assert!(!result.success);
    assert!(result.outputs.is_empty());
    assert_eq!(result.message, "Could not convert 'second.wav': boom");
    assert!(out.join("first.mp3").exists(), "earlier outputs stay on disk");
    assert!(!out.join("third.mp3").exists(), "later files are not attempted");
}

#[test]
fn single_input_failure_shows_raw_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("only.wav");
    fs::write(&input, b"pcm").unwrap();

    let runner = BatchRunner::new(MockEnvironment::failing_on("only.wav"));
    let result = runner.run(&convert_request(&[input], dir.path(), "ogg"));
    assert!(!result.success);
    assert_eq!(result.message, "boom");
}

#[test]
fn single_conversion_reports_destination() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("take.wav");
    fs::write(&input, b"pcm").unwrap();
    let out = dir.path().join("converted");

    let env = MockEnvironment::default();
    let calls = env.calls.clone();
    let result = BatchRunner::new(env).run(&convert_request(&[input.clone()], &out, "ogg"));

    let dest = out.join("take.ogg");
    assert!(result.success, "{}", result.message);
    assert_eq!(result.outputs, [dest.clone()]);
    assert_eq!(result.message, format!("Saved file to {}", dest.display()));
    assert_eq!(
        calls.borrow().as_slice(),
        [Call::Transcode {
            input,
            output: dest,
            format: "ogg".to_string()
        }]
    );
}

#[test]
fn plural_conversion_names_directory() {
    let dir = tempdir().unwrap();
    let inputs: Vec<_> = ["a.wav", "b.flac"].iter().map(|n| dir.path().join(n)).collect();
    for path in &inputs {
        fs::write(path, b"pcm").unwrap();
    }
    let out = dir.path().join("out");
    let runner = BatchRunner::new(MockEnvironment::default());
    let result = runner.run(&convert_request(&inputs, &out, "mp3"));
    assert!(result.success);
    assert_eq!(result.message, format!("Converted 2 files into {}", out.display()));
}

#[test]
fn overwrite_runs_are_idempotent() {
    let dir = tempdir().unwrap();
    let inputs: Vec<_> = ["a.wav", "b.wav"].iter().map(|n| dir.path().join(n)).collect();
    for path in &inputs {
        fs::write(path, b"pcm").unwrap();
    }
    let out = dir.path().join("out");
    let runner = BatchRunner::new(MockEnvironment::default());
    let request = convert_request(&inputs, &out, "mp3");

    let first = runner.run(&request);
    let second = runner.run(&request);
    assert!(first.success && second.success);
    assert_eq!(first.outputs, second.outputs);
    assert_eq!(first.outputs, [out.join("a.mp3"), out.join("b.mp3")]);
}

#[test]
fn shared_stems_are_numbered_without_overwrite() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("x")).unwrap();
    fs::create_dir_all(dir.path().join("y")).unwrap();
    let inputs = vec![dir.path().join("x/song.wav"), dir.path().join("y/song.flac")];
    for path in &inputs {
        fs::write(path, b"pcm").unwrap();
    }
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("song.mp3"), b"old").unwrap();

    let request = convert_request(&inputs, &out, "mp3").with_overwrite_existing(false);
    let result = BatchRunner::new(MockEnvironment::default()).run(&request);

    assert!(result.success);
    assert_eq!(result.outputs, [out.join("song (1).mp3"), out.join("song (2).mp3")]);
    assert_eq!(fs::read(out.join("song.mp3")).unwrap(), b"old");
}

#[test]
fn overwrite_never_reuses_a_destination_within_a_batch() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    let inputs = vec![dir.path().join("a/song.wav"), dir.path().join("b/song.flac")];
    fs::write(&inputs[0], b"first").unwrap();
    fs::write(&inputs[1], b"second").unwrap();
    let out = dir.path().join("out");

    let runner = BatchRunner::new(MockEnvironment::default());
    let result = runner.run(&convert_request(&inputs, &out, "mp3"));

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outputs, [out.join("song.mp3"), out.join("song (1).mp3")]);
    assert_eq!(fs::read(out.join("song.mp3")).unwrap(), b"first");
    assert_eq!(fs::read(out.join("song (1).mp3")).unwrap(), b"second");
}

#[test]
fn progress_events_bracket_each_file() {
    let dir = tempdir().unwrap();
    let inputs: Vec<_> = ["a.wav", "b.wav"].iter().map(|n| dir.path().join(n)).collect();
    for path in &inputs {
        fs::write(path, b"pcm").unwrap();
    }
    let mut seen = Vec::new();
    let runner = BatchRunner::new(MockEnvironment::default());
    let result = runner.run_with_progress(&convert_request(&inputs, dir.path(), "ogg"), |event| {
        seen.push((event.status, event.index, event.total, event.destination.clone()));
    });
    assert!(result.success);
    assert_eq!(
        seen,
        [
            (ProgressStatus::Processing, 1, 2, dir.path().join("a.ogg")),
            (ProgressStatus::Completed, 1, 2, dir.path().join("a.ogg")),
            (ProgressStatus::Processing, 2, 2, dir.path().join("b.ogg")),
            (ProgressStatus::Completed, 2, 2, dir.path().join("b.ogg")),
        ]
    );
}

#[test]
fn unusable_output_directory_is_reported() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("a.wav");
    fs::write(&input, b"pcm").unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"file, not a directory").unwrap();

    let result = BatchRunner::new(MockEnvironment::default())
        .run(&convert_request(&[input], &blocker.join("out"), "mp3"));
    assert!(!result.success);
    assert!(
        result.message.starts_with("Could not create the output directory"),
        "{}",
        result.message
    );
}

#[test]
fn trim_keeps_source_format_and_name() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("voice.wav");
    write_padded_tone(&input, 1000, 1000);
    let out = dir.path().join("trimmed");

    let env = MockEnvironment::default();
    let calls = env.calls.clone();
    let request = OperationRequest::new(
        [&input],
        &out,
        Operation::trim(TrimParameters {
            padding_ms: 100,
            ..TrimParameters::default()
        }),
        &EngineConfig::default(),
    );
    let result = BatchRunner::new(env).run(&request);

    let dest = out.join("voice.wav");
    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, format!("Saved file to {}", dest.display()));
    assert_eq!(read_wav(&dest).duration_ms(), 1200);
    assert_eq!(
        calls.borrow().as_slice(),
        [Call::Export {
            output: dest,
            format: "wav".to_string(),
            frames: 1200
        }]
    );
}

#[test]
fn trim_of_loud_file_keeps_duration() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("loud.wav");
    write_padded_tone(&input, 0, 2000);
    let out = dir.path().join("trimmed");

    let request = OperationRequest::new(
        [&input],
        &out,
        Operation::trim(TrimParameters::default()),
        &EngineConfig::default(),
    );
    let result = BatchRunner::new(MockEnvironment::default()).run(&request);
    assert!(result.success);
    assert_eq!(read_wav(&out.join("loud.wav")).duration_ms(), 2000);
}

#[test]
fn mastering_uses_suffix_and_limits_peak() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("mix.wav");
    write_sine(&input);
    let out = dir.path().join("mastered");

    let config = EngineConfig::default();
    let request = OperationRequest::new(
        [&input],
        &out,
        Operation::master_preset(config.default_preset.clone(), &config),
        &config,
    );
    let result = BatchRunner::new(MockEnvironment::default()).run(&request);

    let dest = out.join("mix_mastered.wav");
    assert!(result.success, "{}", result.message);
    assert_eq!(result.outputs, [dest.clone()]);
    assert_eq!(
        result.message,
        "'mix_mastered.wav' mastered successfully using the 'Music' preset."
    );
    let mastered = read_wav(&dest);
    assert!(mastered.max_dbfs() <= -1.0 + 1e-4, "peak {}", mastered.max_dbfs());
    assert_eq!(mastered.frames(), 8000);
}

#[test]
fn mastering_failure_uses_master_verb() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.wav");
    let b = dir.path().join("b.wav");
    write_sine(&a);
    write_sine(&b);

    let config = EngineConfig::default();
    let request = OperationRequest::new(
        [&a, &b],
        dir.path().join("out"),
        Operation::master_preset("Podcast", &config),
        &config,
    );
    let result = BatchRunner::new(MockEnvironment::failing_on("b.wav")).run(&request);
    assert!(!result.success);
    assert_eq!(result.message, "Could not master 'b.wav': boom");
}
