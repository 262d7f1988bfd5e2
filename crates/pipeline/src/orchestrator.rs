//! Drives a full narration run.

use std::fmt;
use std::path::{Path, PathBuf};

use narrator_core::{
    CancelToken, CodecTool, DeckParser, Error, NotesPolicy, PageRasterizer, PipelineConfig,
    PipelineResult, Result, Segment, Slide, SpeechEngine,
};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::encoder::SegmentEncoder;
use crate::sequencer::{SegmentSequencer, SegmentSlots};
use crate::slide_source::SlideSource;
use crate::synthesizer::AudioSynthesizer;
use crate::workspace::{discard, Workspace};

/// Where a run currently is.
///
/// `PerSlide` is reported once per slide as its work starts; with more than
/// one worker several slides are in flight at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Init,
    Validating,
    PerSlide(usize),
    Concatenating,
    Done,
    /// Terminal failure, with the error kind.
    Failed(&'static str),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Validating => write!(f, "validating"),
            Self::PerSlide(i) => write!(f, "slide {}", i + 1),
            Self::Concatenating => write!(f, "concatenating"),
            Self::Done => write!(f, "done"),
            Self::Failed(kind) => write!(f, "failed ({})", kind),
        }
    }
}

type Observer<'a> = Box<dyn Fn(&RunState) + Send + Sync + 'a>;

/// Runs the pipeline: load and validate the deck, produce one segment per
/// slide on a bounded worker pool, then concatenate in slide order.
///
/// The orchestrator owns the temporary workspace for the duration of
/// [`Orchestrator::run`] and removes it on every exit path. A cancelled
/// token stays cancelled, so an orchestrator serves a single run.
pub struct Orchestrator<'a> {
    parser: &'a dyn DeckParser,
    rasterizer: &'a dyn PageRasterizer,
    speech: &'a dyn SpeechEngine,
    codec: &'a dyn CodecTool,
    config: PipelineConfig,
    cancel: CancelToken,
    observer: Option<Observer<'a>>,
    workspace_root: Option<PathBuf>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        parser: &'a dyn DeckParser,
        rasterizer: &'a dyn PageRasterizer,
        speech: &'a dyn SpeechEngine,
        codec: &'a dyn CodecTool,
        config: PipelineConfig,
    ) -> Self {
        Self {
            parser,
            rasterizer,
            speech,
            codec,
            config,
            cancel: CancelToken::new(),
            observer: None,
            workspace_root: None,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report every state transition to `observer`.
    ///
    /// The observer may be called from worker threads.
    pub fn with_observer(mut self, observer: impl Fn(&RunState) + Send + Sync + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Create the workspace under `root` instead of the system temp dir.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Get a cancellation handle for this run.
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Narrate `deck_path` using the pages of `pages_path`, writing the video
    /// to `output`.
    ///
    /// `output` is only written once every slide has succeeded and the
    /// concatenation is complete.
    pub fn run(&self, deck_path: &Path, pages_path: &Path, output: &Path) -> Result<PipelineResult> {
        self.report(RunState::Init);

        let result = self.run_inner(deck_path, pages_path, output);
        match &result {
            Ok(_) => self.report(RunState::Done),
            Err(e) => self.report(RunState::Failed(e.kind())),
        }
        result
    }

    fn run_inner(&self, deck_path: &Path, pages_path: &Path, output: &Path) -> Result<PipelineResult> {
        self.config.validate()?;

        let workspace = match &self.workspace_root {
            Some(root) => Workspace::create_in(root)?,
            None => Workspace::create()?,
        };

        self.report(RunState::Validating);
        let deck = SlideSource::new(self.parser, self.rasterizer).load(
            deck_path,
            pages_path,
            &workspace,
            &self.cancel,
        )?;

        if deck.narrated_count() == 0 && self.config.notes_policy == NotesPolicy::Skip {
            return Err(Error::NothingToNarrate { slides: deck.len() });
        }
        if deck.is_empty() {
            return Err(Error::NothingToNarrate { slides: 0 });
        }

        let segments = self.produce_segments(deck.slides(), &workspace)?;
        let included_slides: Vec<usize> = segments.iter().map(|s| s.slide_index).collect();

        self.report(RunState::Concatenating);
        let extension = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let staged = workspace.final_path(extension);
        SegmentSequencer::new(self.codec).concatenate(&segments, &staged, &self.cancel)?;

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        publish(&staged, output)?;

        if let Err(e) = workspace.close() {
            log::warn!("Failed to remove workspace: {}", e);
        }

        log::info!(
            "Wrote {} ({} of {} slides narrated)",
            output.display(),
            included_slides.len(),
            deck.len()
        );

        Ok(PipelineResult {
            final_artifact: output.to_path_buf(),
            included_slides,
        })
    }

    /// Run per-slide work on the worker pool and collect segments by index.
    ///
    /// The first real failure cancels the run token so that other workers
    /// stop at their next wait or subprocess poll.
    fn produce_segments(&self, slides: &[Slide], workspace: &Workspace) -> Result<Vec<Segment>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("narrator-worker-{}", i))
            .build()
            .map_err(|e| Error::Config(format!("failed to start worker pool: {}", e)))?;

        let synthesizer = AudioSynthesizer::new(
            self.speech,
            self.config.retry_policy(),
            self.config.language.clone(),
        );
        let encoder = SegmentEncoder::new(self.codec);

        let slots = Mutex::new(SegmentSlots::new(slides.len()));
        let first_error: Mutex<Option<Error>> = Mutex::new(None);

        pool.install(|| {
            slides.par_iter().for_each(|slide| {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.report(RunState::PerSlide(slide.index()));

                match self.process_slide(slide, &synthesizer, &encoder, workspace) {
                    Ok(Some(segment)) => slots.lock().fill(segment),
                    Ok(None) => {}
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => {
                        log::error!("{}", e);
                        first_error.lock().get_or_insert(e);
                        self.cancel.cancel();
                    }
                }
            });
        });

        if let Some(e) = first_error.into_inner() {
            return Err(e);
        }
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let slots = slots.into_inner();
        log::debug!("{} of {} slides produced a segment", slots.filled(), slides.len());
        Ok(slots.into_ordered())
    }

    /// Produce the segment of one slide, if it gets one.
    fn process_slide(
        &self,
        slide: &Slide,
        synthesizer: &AudioSynthesizer<'_>,
        encoder: &SegmentEncoder<'_>,
        workspace: &Workspace,
    ) -> Result<Option<Segment>> {
        let index = slide.index();

        let Some(notes) = slide.notes() else {
            return match self.config.notes_policy {
                NotesPolicy::Skip => {
                    log::info!("Slide {}: no speaker notes, skipped", index + 1);
                    Ok(None)
                }
                NotesPolicy::Silence => {
                    log::info!("Slide {}: no speaker notes, using silence", index + 1);
                    encoder
                        .encode_silent(
                            index,
                            slide.image(),
                            self.config.silence_seconds,
                            workspace,
                            &self.cancel,
                        )
                        .map(Some)
                }
            };
        };

        let audio = synthesizer.synthesize(index, notes, workspace, &self.cancel)?;
        let segment = encoder.encode(slide.image(), &audio, workspace, &self.cancel);
        discard(&audio.path);
        segment.map(Some)
    }

    fn report(&self, state: RunState) {
        log::info!("State: {}", state);
        if let Some(observer) = &self.observer {
            observer(&state);
        }
    }
}

/// Move the finished video to its destination, creating parent directories.
fn publish(staged: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    if std::fs::rename(staged, output).is_err() {
        // Rename fails across filesystems; fall back to copy
        std::fs::copy(staged, output).map_err(|e| {
            discard(output);
            Error::io(output, e)
        })?;
    }
    Ok(())
}
