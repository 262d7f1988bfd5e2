//! Core domain types, errors, configuration, and the retry and cancellation
//! primitives shared by the narration pipeline.

pub mod backend;
pub mod cancel;
pub mod config;
pub mod error;
pub mod notes;
pub mod retry;
pub mod types;

pub use backend::{CodecTool, DeckParser, PageRasterizer, SpeechEngine};
pub use cancel::CancelToken;
pub use config::{NotesPolicy, PipelineConfig, RetryConfig, ToolsConfig, TtsConfig, TtsEngineKind};
pub use error::{Error, Result, SpeechError, ToolError};
pub use notes::NotesNormalizer;
pub use retry::{Retried, RetryError, RetryPolicy};
pub use types::{AudioArtifact, Deck, PipelineResult, Segment, Slide, SpeechAudio};
