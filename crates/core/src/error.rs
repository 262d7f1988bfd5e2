//! Error types for the narration pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can terminate a narration run.
///
/// Every variant is fatal: the orchestrator aborts the run, releases the
/// workspace and never writes a partial output file.
#[derive(Error, Debug)]
pub enum Error {
    /// The rendered page count does not match the deck's slide count.
    #[error("deck has {slides} slides but {pages} pages were rendered")]
    Mismatch { slides: usize, pages: usize },

    /// Speech synthesis exhausted its retry budget.
    #[error("slide {}: speech synthesis failed after {attempts} attempts: {source}", .slide + 1)]
    SynthesisFailed {
        slide: usize,
        attempts: u32,
        #[source]
        source: SpeechError,
    },

    /// Muxing or repackaging a slide segment failed.
    #[error("slide {}: segment encoding failed: {source}", .slide + 1)]
    Encode {
        slide: usize,
        #[source]
        source: ToolError,
    },

    /// Joining the segments into the final video failed.
    #[error("concatenation failed: {0}")]
    Concat(#[source] ToolError),

    /// No slide produced a segment, so there is nothing to concatenate.
    #[error("no slide produced a segment (deck has {slides} slides, none with speaker notes)")]
    NothingToNarrate { slides: usize },

    /// The run was cancelled before it could finish.
    #[error("run cancelled")]
    Cancelled,

    /// Failed to parse the PPTX file structure.
    #[error("PPTX parsing error: {0}")]
    PptxParse(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// The page rasterizer failed.
    #[error("page rasterization failed: {0}")]
    Rasterize(#[source] ToolError),

    /// Invalid configuration value or unreadable configuration file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to read or write a file.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an I/O error tagged with the path involved.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable name of the error kind, as reported on the command line.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mismatch { .. } => "MismatchError",
            Self::SynthesisFailed { .. } => "SynthesisFailed",
            Self::Encode { .. } => "EncodeError",
            Self::Concat(_) => "ConcatError",
            Self::NothingToNarrate { .. } => "NothingToNarrate",
            Self::Cancelled => "Cancelled",
            Self::PptxParse(_) | Self::Zip(_) | Self::Xml(_) => "DeckParseError",
            Self::Rasterize(_) => "RasterizeError",
            Self::Config(_) => "ConfigError",
            Self::Io { .. } => "IoError",
        }
    }

    /// Zero-based index of the slide that failed, where one applies.
    pub fn slide(&self) -> Option<usize> {
        match self {
            Self::SynthesisFailed { slide, .. } | Self::Encode { slide, .. } => Some(*slide),
            _ => None,
        }
    }

    /// Whether this error only reports that the run was stopped.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Failure of an external tool invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool binary could not be started.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The tool exited unsuccessfully.
    #[error("{tool} exited with {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| format!("code {c}")))]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool reported success but did not produce what it should have.
    #[error("{tool} produced no output at {}", .path.display())]
    MissingOutput { tool: String, path: PathBuf },

    /// I/O around the tool invocation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The invocation was stopped by the cancellation token.
    #[error("cancelled")]
    Cancelled,
}

/// Failure of a single speech synthesis attempt.
#[derive(Error, Debug)]
pub enum SpeechError {
    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The speech service answered with a non-success status.
    #[error("service returned HTTP {0}")]
    Status(u16),

    /// The engine returned no audio data.
    #[error("engine returned no audio")]
    Empty,

    /// A local speech engine process failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The attempt was interrupted by the cancellation token.
    #[error("cancelled")]
    Cancelled,
}

impl SpeechError {
    /// Whether this failure only reports cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Tool(ToolError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Error::Mismatch { slides: 3, pages: 2 }.kind(), "MismatchError");
        assert_eq!(Error::Concat(ToolError::Cancelled).kind(), "ConcatError");
        assert_eq!(
            Error::Encode {
                slide: 0,
                source: ToolError::Cancelled
            }
            .kind(),
            "EncodeError"
        );
        assert_eq!(
            Error::SynthesisFailed {
                slide: 1,
                attempts: 3,
                source: SpeechError::Empty
            }
            .kind(),
            "SynthesisFailed"
        );
    }

    #[test]
    fn test_slide_index_reported_one_based() {
        let err = Error::SynthesisFailed {
            slide: 1,
            attempts: 3,
            source: SpeechError::Status(503),
        };
        assert_eq!(err.slide(), Some(1));
        assert_eq!(
            err.to_string(),
            "slide 2: speech synthesis failed after 3 attempts: service returned HTTP 503"
        );
        assert_eq!(Error::Cancelled.slide(), None);
    }

    #[test]
    fn test_tool_failure_message() {
        let err = ToolError::Failed {
            tool: "ffmpeg".into(),
            code: Some(1),
            stderr: "No such file".into(),
        };
        assert_eq!(err.to_string(), "ffmpeg exited with code 1: No such file");

        let err = ToolError::Failed {
            tool: "ffmpeg".into(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn test_speech_cancellation_detection() {
        assert!(SpeechError::Cancelled.is_cancelled());
        assert!(SpeechError::Tool(ToolError::Cancelled).is_cancelled());
        assert!(!SpeechError::Status(500).is_cancelled());
    }
}
