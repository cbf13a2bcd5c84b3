use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use timbre_detector::audio::{AudioSource, WavAudioSource};
use timbre_detector::display::DisplayRecord;
use timbre_detector::neural::{ClassMapSource, FileClassMapSource, HttpClassMapSource};
use timbre_detector::{AppConfig, BackendStatus, DetectionEngine, DetectionResult, TickOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "timbre_cli",
    about = "Instrument detection harness for WAV files and live input"
)]
struct Cli {
    /// JSON config file (defaults to assets/detection_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Step through a WAV file one tick at a time and print each outcome
    Classify {
        #[arg(long)]
        wav: PathBuf,
        /// Write the full report here instead of JSON lines on stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Audio advanced per tick (defaults to the detection interval)
        #[arg(long)]
        hop_ms: Option<u64>,
    },
    /// Detect from the default input device until Ctrl-C
    #[cfg(feature = "capture")]
    Listen {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
        /// Also print the prompt-feed label
        #[arg(long)]
        prompt: bool,
    },
    /// Fetch a class map and list its instrument classes
    ClassMap {
        /// Local CSV file; the configured URL is used when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the effective configuration
    ShowConfig,
}

fn main() -> ExitCode {
    timbre_detector::init_logging("timbre_detector=info");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start runtime: {err}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Classify {
            wav,
            output,
            hop_ms,
        } => run_classify(config, &wav, output, hop_ms).await,
        #[cfg(feature = "capture")]
        Commands::Listen { seconds, prompt } => run_listen(config, seconds, prompt).await,
        Commands::ClassMap { file } => run_class_map(&config, file).await,
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

/// One line of `classify` output
#[derive(Serialize)]
struct TickReport {
    time_s: f32,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<DisplayRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<DetectionResult>,
}

#[derive(Serialize)]
struct ClassifyReport<'a> {
    wav: &'a Path,
    backend: BackendStatus,
    tick_count: usize,
    published: usize,
    ticks: &'a [TickReport],
}

impl TickReport {
    fn new(time_s: f32, outcome: TickOutcome) -> Self {
        let (outcome, result) = match outcome {
            TickOutcome::Published(result) => ("published", Some(result)),
            TickOutcome::Silent { .. } => ("silent", None),
            TickOutcome::NoAudioSource => ("no_audio_source", None),
            TickOutcome::Empty => ("empty", None),
            TickOutcome::Disabled => ("disabled", None),
        };
        Self {
            time_s,
            outcome,
            display: result.as_ref().map(DisplayRecord::from),
            result,
        }
    }
}

async fn run_classify(
    config: AppConfig,
    wav: &Path,
    output_path: Option<PathBuf>,
    hop_ms: Option<u64>,
) -> Result<ExitCode> {
    let hop_ms = hop_ms.unwrap_or(config.detection.interval_ms);
    let source = Arc::new(
        WavAudioSource::open(wav, &config.audio, hop_ms)
            .with_context(|| format!("opening {}", wav.display()))?,
    );

    let engine = DetectionEngine::from_config(config);
    engine
        .set_audio_source(Some(source.clone() as Arc<dyn AudioSource>))
        .context("attaching WAV source")?;
    engine.start_manual().await.context("starting detection")?;

    let mut ticks = Vec::new();
    while !source.is_exhausted() {
        let time_s = source.position_seconds();
        let report = TickReport::new(time_s, engine.tick().await);
        if output_path.is_none() {
            println!("{}", serde_json::to_string(&report)?);
        }
        ticks.push(report);
    }

    let backend = engine.backend_status();
    engine.shutdown();

    if let Some(path) = output_path {
        let report = ClassifyReport {
            wav,
            backend,
            tick_count: ticks.len(),
            published: ticks.iter().filter(|t| t.result.is_some()).count(),
            ticks: &ticks,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(ExitCode::from(0))
}

#[cfg(feature = "capture")]
async fn run_listen(config: AppConfig, seconds: Option<u64>, prompt: bool) -> Result<ExitCode> {
    use timbre_detector::audio::CaptureAudioSource;

    let (_stream, source) =
        CaptureAudioSource::open(&config.audio).context("opening input device")?;

    let engine = DetectionEngine::from_config(config);
    engine.set_prompt_feed_enabled(prompt);
    engine
        .set_audio_source(Some(Arc::new(source)))
        .context("attaching capture source")?;
    let mut updates = engine
        .subscribe_detection()
        .context("detection channel not initialized")?;
    let feed = engine.prompt_feed();

    if !engine.start().await.context("starting detection")? {
        anyhow::bail!("detection loop did not start");
    }
    eprintln!("Listening ({:?} backend), Ctrl-C to stop", engine.backend_status());

    let deadline = async {
        match seconds {
            Some(secs) => tokio::time::sleep(std::time::Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(Some(result)) => {
                    println!("{}", DisplayRecord::from(&result));
                    if let Some(label) = feed.current_label() {
                        println!("  prompt: {label}");
                    }
                }
                Ok(None) => println!("(no detection)"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut deadline => break,
        }
    }

    engine.shutdown();
    Ok(ExitCode::from(0))
}

async fn run_class_map(config: &AppConfig, file: Option<PathBuf>) -> Result<ExitCode> {
    let source: Box<dyn ClassMapSource> = match (file, &config.model.class_map_url) {
        (Some(path), _) => Box::new(FileClassMapSource::new(path)),
        (None, Some(url)) => Box::new(HttpClassMapSource::new(url.clone())),
        (None, None) => anyhow::bail!("no --file given and no class_map_url configured"),
    };

    let map = source
        .fetch()
        .await
        .with_context(|| format!("loading class map from {}", source.describe()))?;

    let instruments: Vec<_> = map
        .iter()
        .filter(|&(index, name)| timbre_detector::neural::is_instrument_class(index, Some(name)))
        .collect();

    println!("{} classes, {} instrument-relevant", map.len(), instruments.len());
    for (index, name) in instruments {
        println!("{index:>4}  {name}");
    }
    Ok(ExitCode::from(0))
}
