//! The narration pipeline: per-slide speech synthesis and segment encoding
//! on a bounded worker pool, followed by ordered concatenation.

pub mod encoder;
pub mod orchestrator;
pub mod sequencer;
pub mod slide_source;
pub mod synthesizer;
pub mod workspace;

pub use encoder::SegmentEncoder;
pub use orchestrator::{Orchestrator, RunState};
pub use sequencer::{SegmentSequencer, SegmentSlots};
pub use slide_source::SlideSource;
pub use synthesizer::AudioSynthesizer;
pub use workspace::Workspace;
