//! Fake collaborators for pipeline integration tests.
//!
//! The fake codec writes small text files instead of media: an audio file
//! holds `dur=<seconds>`, a segment holds `<image>;dur=<seconds>`, and the
//! final output holds one segment line per included slide.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use narrator_core::{
    CancelToken, CodecTool, DeckParser, PageRasterizer, PipelineConfig, RetryConfig, SpeechAudio,
    SpeechEngine, SpeechError, ToolError,
};
use parking_lot::Mutex;

pub struct FakeDeck {
    notes: Vec<Option<String>>,
}

impl FakeDeck {
    pub fn new(notes: &[Option<&str>]) -> Self {
        Self {
            notes: notes.iter().map(|n| n.map(str::to_string)).collect(),
        }
    }
}

impl DeckParser for FakeDeck {
    fn parse_deck(&self, _path: &Path) -> narrator_core::Result<Vec<Option<String>>> {
        Ok(self.notes.clone())
    }
}

/// Renders `pages` placeholder images named `page-N.jpg`.
pub struct FakePages {
    pages: usize,
}

impl FakePages {
    pub fn new(pages: usize) -> Self {
        Self { pages }
    }
}

impl PageRasterizer for FakePages {
    fn rasterize(
        &self,
        _document: &Path,
        out_dir: &Path,
        _cancel: &CancelToken,
    ) -> Result<Vec<PathBuf>, ToolError> {
        (1..=self.pages)
            .map(|n| {
                let path = out_dir.join(format!("page-{}.jpg", n));
                std::fs::write(&path, b"jpeg")?;
                Ok::<_, ToolError>(path)
            })
            .collect()
    }
}

/// Speech engine whose audio lasts half a second per word.
#[derive(Default)]
pub struct FakeSpeech {
    failures: HashMap<String, u32>,
    always_fail: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FakeSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `count` attempts for `text`.
    pub fn failing_first(mut self, text: &str, count: u32) -> Self {
        self.failures.insert(text.to_string(), count);
        self
    }

    /// Fail every attempt for `text`.
    pub fn always_failing(mut self, text: &str) -> Self {
        self.always_fail.insert(text.to_string());
        self
    }

    /// Take `delay` before answering for `text`.
    pub fn slow(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    pub fn calls(&self, text: &str) -> u32 {
        self.calls.lock().get(text).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().values().sum()
    }

    pub fn duration_of(text: &str) -> f64 {
        text.split_whitespace().count() as f64 * 0.5
    }
}

impl SpeechEngine for FakeSpeech {
    fn synthesize(
        &self,
        text: &str,
        _language: &str,
        cancel: &CancelToken,
    ) -> Result<SpeechAudio, SpeechError> {
        let attempt = {
            let mut calls = self.calls.lock();
            let count = calls.entry(text.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if let Some(delay) = self.delays.get(text) {
            if !cancel.sleep(*delay) {
                return Err(SpeechError::Cancelled);
            }
        }

        let failures = self.failures.get(text).copied().unwrap_or(0);
        if self.always_fail.contains(text) || attempt <= failures {
            return Err(SpeechError::Transport("connection reset".into()));
        }

        Ok(SpeechAudio {
            bytes: format!("dur={:.3}", Self::duration_of(text)).into_bytes(),
            extension: "mp3",
        })
    }
}

/// Codec producing text artifacts, with optional failures and blocking.
#[derive(Default)]
pub struct FakeCodec {
    fail_mux_for: Option<String>,
    fail_concat: bool,
    block_mux: bool,
    mux_calls: Mutex<Vec<String>>,
    concat_calls: Mutex<u32>,
}

impl FakeCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail stage one for the image with this file name.
    pub fn failing_mux_for(mut self, image: &str) -> Self {
        self.fail_mux_for = Some(image.to_string());
        self
    }

    pub fn failing_concat(mut self) -> Self {
        self.fail_concat = true;
        self
    }

    /// Make stage one hang until the run is cancelled.
    pub fn blocking_mux(mut self) -> Self {
        self.block_mux = true;
        self
    }

    /// Image file names muxed so far, in call order.
    pub fn muxed_images(&self) -> Vec<String> {
        self.mux_calls.lock().clone()
    }

    pub fn concat_calls(&self) -> u32 {
        *self.concat_calls.lock()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl CodecTool for FakeCodec {
    fn mux_still(
        &self,
        image: &Path,
        audio: &Path,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<(), ToolError> {
        let image_name = file_name(image);
        self.mux_calls.lock().push(image_name.clone());

        if self.block_mux {
            cancel.sleep(Duration::from_secs(60));
            return Err(ToolError::Cancelled);
        }
        if self.fail_mux_for.as_deref() == Some(image_name.as_str()) {
            return Err(ToolError::Failed {
                tool: "ffmpeg".into(),
                code: Some(1),
                stderr: "Error while decoding stream".into(),
            });
        }

        let audio = std::fs::read_to_string(audio)?;
        std::fs::write(output, format!("{};{}", image_name, audio.trim()))?;
        Ok(())
    }

    fn remux_to_ts(&self, input: &Path, output: &Path, _cancel: &CancelToken) -> Result<(), ToolError> {
        std::fs::copy(input, output)?;
        Ok(())
    }

    fn concat_ts(
        &self,
        segments: &[PathBuf],
        output: &Path,
        _cancel: &CancelToken,
    ) -> Result<(), ToolError> {
        *self.concat_calls.lock() += 1;
        if self.fail_concat {
            return Err(ToolError::Failed {
                tool: "ffmpeg".into(),
                code: Some(1),
                stderr: "concat: Invalid argument".into(),
            });
        }

        let mut joined = String::new();
        for segment in segments {
            joined.push_str(&std::fs::read_to_string(segment)?);
            joined.push('\n');
        }
        std::fs::write(output, joined)?;
        Ok(())
    }

    fn silent_audio(&self, seconds: f64, output: &Path, _cancel: &CancelToken) -> Result<(), ToolError> {
        std::fs::write(output, format!("dur={:.3}", seconds))?;
        Ok(())
    }
}

/// One line of the fake final output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLine {
    pub image: String,
    pub duration: f64,
}

pub fn read_output(path: &Path) -> Vec<OutputLine> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let (image, dur) = line.split_once(";dur=").unwrap();
            OutputLine {
                image: image.to_string(),
                duration: dur.parse().unwrap(),
            }
        })
        .collect()
}

/// Default configuration with near-zero retry delay.
pub fn fast_config(workers: usize) -> PipelineConfig {
    PipelineConfig {
        workers,
        retry: RetryConfig {
            max_attempts: 5,
            delay_ms: 1,
        },
        ..PipelineConfig::default()
    }
}

/// Number of entries left in a directory.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Cancel `token` after `delay` on a helper thread.
pub fn cancel_after(token: CancelToken, delay: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(delay);
        token.cancel();
    })
}
