//! Narrow interfaces to the external collaborators of the pipeline.
//!
//! The pipeline only talks to these traits; concrete implementations live in
//! `narrator-pptx` and `narrator-media`, and tests substitute fakes.

use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::{SpeechError, ToolError};
use crate::types::SpeechAudio;
use crate::Result;

/// Reads the ordered speaker notes of a slide deck.
pub trait DeckParser: Send + Sync {
    /// Return one entry per slide, in presentation order.
    fn parse_deck(&self, path: &Path) -> Result<Vec<Option<String>>>;
}

/// Renders every page of a paginated document to an image file.
pub trait PageRasterizer: Send + Sync {
    /// Write one image per page into `out_dir` and return them in page order.
    fn rasterize(
        &self,
        document: &Path,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> std::result::Result<Vec<PathBuf>, ToolError>;
}

/// Text-to-speech engine. Failures are assumed transient.
pub trait SpeechEngine: Send + Sync {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
        cancel: &CancelToken,
    ) -> std::result::Result<SpeechAudio, SpeechError>;
}

/// Video codec tool used for muxing, repackaging and concatenation.
///
/// Each operation either fully produces `output` or fails; failures are
/// treated as deterministic and are not retried.
pub trait CodecTool: Send + Sync {
    /// Mux a still image over an audio track. The video is scaled to even
    /// dimensions and lasts exactly as long as the audio.
    fn mux_still(
        &self,
        image: &Path,
        audio: &Path,
        output: &Path,
        cancel: &CancelToken,
    ) -> std::result::Result<(), ToolError>;

    /// Repackage a muxed file into a stream container that can be joined by
    /// byte-level concatenation.
    fn remux_to_ts(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancelToken,
    ) -> std::result::Result<(), ToolError>;

    /// Join stream segments in the given order without re-encoding.
    fn concat_ts(
        &self,
        segments: &[PathBuf],
        output: &Path,
        cancel: &CancelToken,
    ) -> std::result::Result<(), ToolError>;

    /// Write a silent audio track of the given length.
    fn silent_audio(
        &self,
        seconds: f64,
        output: &Path,
        cancel: &CancelToken,
    ) -> std::result::Result<(), ToolError>;
}
