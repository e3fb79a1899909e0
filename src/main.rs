use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use soundbatch::batch::{BatchRunner, ProgressStatus};
use soundbatch::format::{OutputFormat, SUPPORTED_FORMATS};
use soundbatch::master::{self, PRESETS};
use soundbatch::protocol::{self, ParameterOverrides};
use soundbatch::{EngineConfig, Operation, OperationRequest, TrimParameters};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Batch {
    /// input files; directories are searched recursively for audio files
    inputs: Vec<PathBuf>,

    /// output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// keep existing files and number new ones instead of overwriting
    #[arg(long)]
    no_overwrite: bool,

    /// ffmpeg binary to use, default to searching FFMPEG_BINARY, FFMPEG_BIN and PATH
    #[arg(long)]
    ffmpeg: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// convert audio files to another format
    Convert {
        #[command(flatten)]
        batch: Batch,

        /// target format
        #[arg(short, long, default_value = "mp3")]
        format: String,
    },
    /// compress, level-match and limit audio files
    Master {
        #[command(flatten)]
        batch: Batch,

        /// mastering preset
        #[arg(short, long, default_value = master::DEFAULT_PRESET)]
        preset: String,

        /// target level, default to the preset's
        #[arg(long, allow_negative_numbers = true)]
        target_lufs: Option<f64>,

        /// skip dynamic range compression
        #[arg(long)]
        no_compression: bool,

        /// skip peak limiting
        #[arg(long)]
        no_limiter: bool,

        /// gain in dB applied last, default to the preset's
        #[arg(long, allow_negative_numbers = true)]
        output_gain: Option<f64>,

        /// appended to output file names
        #[arg(long)]
        suffix: Option<String>,
    },
    /// remove leading and trailing silence
    Trim {
        #[command(flatten)]
        batch: Batch,

        /// silence threshold in dBFS
        #[arg(long, default_value_t = -50.0, allow_negative_numbers = true)]
        threshold: f64,

        /// shortest silence in ms that counts as a gap
        #[arg(long, default_value_t = 500)]
        min_silence: i64,

        /// silence in ms kept around the content
        #[arg(long, default_value_t = 0)]
        padding: i64,
    },
    /// read one JSON request from stdin and stream JSON events to stdout
    Pipe,
    /// list output formats and their encoder settings
    Formats,
    /// list mastering presets
    Presets,
}

fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        for entry in WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if is_supported(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|os| os.to_str())
        .map(|s| s.to_lowercase())
        .is_some_and(|ext| SUPPORTED_FORMATS.contains(&ext.as_str()))
}

fn run_batch(config: &EngineConfig, batch: Batch, operation: Operation) -> Result<bool> {
    let inputs = expand_inputs(&batch.inputs);
    let request = OperationRequest::new(inputs, batch.output, operation, config)
        .with_overwrite_existing(!batch.no_overwrite)
        .with_encoder_override(batch.ffmpeg);

    info!("Starting {} with options:", request.kind());
    info!("  Files: {}", request.input_paths().len());
    info!("  Output Directory: {:?}", request.output_directory());
    info!("  Overwrite Existing: {}", request.overwrite_existing());
    match request.operation() {
        Operation::Convert { format } => info!("  Format: {}", format),
        Operation::Master {
            preset,
            parameters,
            filename_suffix,
        } => {
            info!("  Preset: {}", preset);
            info!("  Target Level: {:.1}", parameters.target_lufs);
            info!("  Compression: {}", parameters.apply_compression);
            info!("  Limiter: {}", parameters.apply_limiter);
            info!("  Output Gain: {:.1} dB", parameters.output_gain);
            info!("  Suffix: {:?}", filename_suffix);
        }
        Operation::Trim(parameters) => {
            info!("  Threshold: {:.1} dBFS", parameters.threshold_dbfs);
            info!("  Minimum Silence: {} ms", parameters.min_silence_ms);
            info!("  Padding: {} ms", parameters.padding_ms);
        }
    }
    info!("---");

    let pb = ProgressBar::new(request.input_paths().len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let runner = BatchRunner::from_config(config);
    let result = runner.run_with_progress(&request, |event| match event.status {
        ProgressStatus::Processing => pb.set_message(
            event
                .source
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned(),
        ),
        ProgressStatus::Completed => pb.inc(1),
    });
    pb.finish_and_clear();

    if result.success {
        info!("{}", result.message);
    } else {
        error!("{}", result.message);
    }
    Ok(result.success)
}

fn main() -> Result<()> {
    _ = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .parse_filters("symphonia=error")
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    let config = EngineConfig::default();

    let success = match cli.command {
        Command::Convert { batch, format } => {
            run_batch(&config, batch, Operation::convert(format.as_str()))?
        }
        Command::Master {
            batch,
            preset,
            target_lufs,
            no_compression,
            no_limiter,
            output_gain,
            suffix,
        } => {
            let overrides = ParameterOverrides {
                target_lufs,
                apply_compression: no_compression.then_some(false),
                apply_limiter: no_limiter.then_some(false),
                output_gain,
            };
            let parameters = overrides.apply_to(master::preset(&preset).unwrap_or_default());
            let operation = Operation::Master {
                preset,
                parameters,
                filename_suffix: suffix.unwrap_or_else(|| config.mastering_suffix.clone()),
            };
            run_batch(&config, batch, operation)?
        }
        Command::Trim {
            batch,
            threshold,
            min_silence,
            padding,
        } => {
            let parameters = TrimParameters {
                threshold_dbfs: threshold,
                min_silence_ms: min_silence,
                padding_ms: padding,
            };
            run_batch(&config, batch, Operation::trim(parameters))?
        }
        Command::Pipe => {
            let code = protocol::serve(io::stdin().lock(), io::stdout().lock(), &config)?;
            code == 0
        }
        Command::Formats => {
            for name in SUPPORTED_FORMATS {
                let format = OutputFormat::new(name);
                match format.known() {
                    Some(known) => {
                        let profile = known.profile();
                        println!(
                            "{:<5} {:<10} {:<5} {}",
                            known.to_string(),
                            profile.codec,
                            profile.bitrate.unwrap_or("-"),
                            profile.container
                        );
                    }
                    None => println!("{:<5} (encoder default)", format),
                }
            }
            true
        }
        Command::Presets => {
            for (name, parameters) in PRESETS {
                println!(
                    "{:<11} target {:>6.1}  gain {:>+4.1} dB  compression {}  limiter {}",
                    name,
                    parameters.target_lufs,
                    parameters.output_gain,
                    parameters.apply_compression,
                    parameters.apply_limiter
                );
            }
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
