//! CLI tool for turning a slide deck into a narrated video.

use anyhow::{Context, Result};
use clap::Parser;
use narrator_core::{NotesPolicy, PipelineConfig, SpeechEngine, TtsEngineKind};
use narrator_media::{EspeakTts, Ffmpeg, GoogleTts, Pdftoppm};
use narrator_pipeline::Orchestrator;
use narrator_pptx::PptxParser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Narrate a presentation: speak each slide's notes over the slide image and
/// join the slides into one video.
#[derive(Parser, Debug)]
#[command(name = "deck-narrator")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Presentation with speaker notes (.pptx)
    #[arg(long)]
    pptx: PathBuf,

    /// PDF export of the same presentation, one page per slide
    #[arg(long)]
    pdf: PathBuf,

    /// Output video file
    #[arg(short, long)]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of slides processed concurrently
    #[arg(short, long)]
    workers: Option<usize>,

    /// Speech language code (e.g. en, de)
    #[arg(short, long)]
    language: Option<String>,

    /// Slides without notes: "skip" or "silence"
    #[arg(long)]
    notes_policy: Option<String>,

    /// Maximum synthesis attempts per slide
    #[arg(long)]
    retries: Option<u32>,

    /// Wait between synthesis attempts, in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Speech engine: "google" or "espeak"
    #[arg(long)]
    tts: Option<String>,

    /// Path to the ffmpeg binary
    #[arg(long)]
    ffmpeg: Option<String>,

    /// Path to the pdftoppm binary
    #[arg(long)]
    pdftoppm: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_line(&e));
            ExitCode::FAILURE
        }
    }
}

/// Format a failure as `error: <kind>: <message>`.
///
/// Pipeline errors already include their causes in their message, so the
/// chain is cut at the pipeline error.
fn error_line(e: &anyhow::Error) -> String {
    let Some(err) = e.downcast_ref::<narrator_core::Error>() else {
        return format!("error: {:#}", e);
    };

    let mut messages = Vec::new();
    for cause in e.chain() {
        messages.push(cause.to_string());
        if cause.is::<narrator_core::Error>() {
            break;
        }
    }
    format!("error: {}: {}", err.kind(), messages.join(": "))
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    log::debug!("Configuration: {:?}", config);

    let parser = PptxParser::new();
    let rasterizer = Pdftoppm::new(config.tools.pdftoppm.clone()).with_dpi(config.raster_dpi);
    let codec = Ffmpeg::new(config.tools.ffmpeg.clone());
    let speech = speech_engine(&config)?;

    let verbose = args.verbose;
    let result = Orchestrator::new(&parser, &rasterizer, speech.as_ref(), &codec, config)
        .with_observer(move |state| {
            if verbose {
                eprintln!("  {}", state);
            }
        })
        .run(&args.pptx, &args.pdf, &args.output)?;

    eprintln!(
        "Written to: {} ({} slides)",
        result.final_artifact.display(),
        result.included_slides.len()
    );
    Ok(())
}

/// Load the configuration file, if any, and apply command-line overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    if let Some(name) = &args.notes_policy {
        config.notes_policy = NotesPolicy::from_name(name)
            .ok_or_else(|| narrator_core::Error::Config(format!("unknown notes policy '{}'", name)))?;
    }
    if let Some(retries) = args.retries {
        config.retry.max_attempts = retries;
    }
    if let Some(delay) = args.retry_delay_ms {
        config.retry.delay_ms = delay;
    }
    if let Some(name) = &args.tts {
        config.tts.engine = TtsEngineKind::from_name(name)
            .ok_or_else(|| narrator_core::Error::Config(format!("unknown speech engine '{}'", name)))?;
    }
    if let Some(ffmpeg) = &args.ffmpeg {
        config.tools.ffmpeg = ffmpeg.clone();
    }
    if let Some(pdftoppm) = &args.pdftoppm {
        config.tools.pdftoppm = pdftoppm.clone();
    }

    config.validate()?;
    Ok(config)
}

fn speech_engine(config: &PipelineConfig) -> Result<Box<dyn SpeechEngine>> {
    match config.tts.engine {
        TtsEngineKind::Google => {
            let engine = GoogleTts::new(
                config.tts.endpoint.clone(),
                Duration::from_secs(config.tts.timeout_secs),
            )
            .context("Failed to set up speech client")?;
            Ok(Box::new(engine))
        }
        TtsEngineKind::Espeak => Ok(Box::new(EspeakTts::new(config.tools.espeak.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "deck-narrator",
            "--pptx",
            "talk.pptx",
            "--pdf",
            "talk.pdf",
            "-o",
            "talk.mp4",
        ];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = build_config(&parse(&[])).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let config = build_config(&parse(&[
            "--workers",
            "3",
            "--notes-policy",
            "silence",
            "--retries",
            "7",
            "--tts",
            "espeak",
        ]))
        .unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.notes_policy, NotesPolicy::Silence);
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.tts.engine, TtsEngineKind::Espeak);
    }

    #[test]
    fn test_unknown_policy_is_config_error() {
        let err = build_config(&parse(&["--notes-policy", "mute"])).unwrap_err();
        let err = err.downcast_ref::<narrator_core::Error>().unwrap();
        assert_eq!(err.kind(), "ConfigError");
    }

    #[test]
    fn test_error_line_reports_cause_once() {
        let err = anyhow::Error::from(narrator_core::Error::Concat(narrator_core::ToolError::Failed {
            tool: "ffmpeg".into(),
            code: Some(1),
            stderr: "bad".into(),
        }));
        assert_eq!(
            error_line(&err),
            "error: ConcatError: concatenation failed: ffmpeg exited with code 1: bad"
        );
    }

    #[test]
    fn test_error_line_keeps_context() {
        let err = anyhow::Error::from(narrator_core::Error::Config("workers must be at least 1".into()))
            .context("Failed to load deck.toml");
        assert_eq!(
            error_line(&err),
            "error: ConfigError: Failed to load deck.toml: configuration error: workers must be at least 1"
        );
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(build_config(&parse(&["--workers", "0"])).is_err());
    }
}
