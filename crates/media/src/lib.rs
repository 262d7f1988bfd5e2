//! External media tools behind the pipeline's collaborator interfaces:
//! ffmpeg for muxing and concatenation, pdftoppm for page rendering, and the
//! speech engines.

pub mod ffmpeg;
pub mod pdf;
pub mod process;
pub mod tts;

pub use ffmpeg::Ffmpeg;
pub use pdf::Pdftoppm;
pub use process::{run_tool, ToolOutput};
pub use tts::{EspeakTts, GoogleTts};
