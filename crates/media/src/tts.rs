//! Speech engines.
//!
//! [`GoogleTts`] talks to Google Translate's speech endpoint and is the
//! network-backed engine the retry policy exists for. [`EspeakTts`] runs a
//! local espeak-ng process and works offline.

use std::ffi::OsString;
use std::time::Duration;

use narrator_core::{CancelToken, SpeechAudio, SpeechEngine, SpeechError};
use reqwest::blocking::Client;

use crate::process::run_tool;

/// Longest text the Google endpoint accepts in one request.
pub const GOOGLE_MAX_CHARS: usize = 100;

/// Speech engine backed by Google Translate's text-to-speech endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTts {
    client: Client,
    endpoint: String,
}

impl GoogleTts {
    /// Create an engine that sends requests to `endpoint`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("deck-narrator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SpeechError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn fetch_chunk(
        &self,
        chunk: &str,
        language: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>, SpeechError> {
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language),
                ("q", chunk),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .map_err(|e| SpeechError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .map_err(|e| SpeechError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl SpeechEngine for GoogleTts {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
        cancel: &CancelToken,
    ) -> Result<SpeechAudio, SpeechError> {
        let chunks = split_text(text, GOOGLE_MAX_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::Empty);
        }

        // MP3 frames are self-delimiting, so chunk responses can be appended
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(SpeechError::Cancelled);
            }
            let bytes = self.fetch_chunk(chunk, language, idx, chunks.len())?;
            if bytes.is_empty() {
                return Err(SpeechError::Empty);
            }
            audio.extend_from_slice(&bytes);
        }

        Ok(SpeechAudio {
            bytes: audio,
            extension: "mp3",
        })
    }
}

/// Speech engine running a local espeak-ng binary.
#[derive(Debug, Clone)]
pub struct EspeakTts {
    binary: String,
}

impl EspeakTts {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for EspeakTts {
    fn default() -> Self {
        Self::new("espeak-ng")
    }
}

impl SpeechEngine for EspeakTts {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
        cancel: &CancelToken,
    ) -> Result<SpeechAudio, SpeechError> {
        let output = run_tool(&self.binary, &espeak_args(text, language), cancel)?;

        if output.stdout.is_empty() {
            return Err(SpeechError::Empty);
        }

        Ok(SpeechAudio {
            bytes: output.stdout,
            extension: "wav",
        })
    }
}

/// Notes often open with a bullet dash, so the text goes after `--` to keep
/// espeak-ng from parsing it as options.
fn espeak_args(text: &str, language: &str) -> Vec<OsString> {
    vec![
        "-v".into(),
        language.into(),
        "--stdout".into(),
        "--".into(),
        text.into(),
    ]
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Breaks fall on whitespace; a single word longer than the limit is cut at
/// character boundaries.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
