//! Notes-to-speech with bounded retries.

use narrator_core::{
    AudioArtifact, CancelToken, Error, Result, RetryError, RetryPolicy, SpeechEngine, SpeechError,
};

use crate::workspace::{discard, Workspace};

/// Turns a slide's notes into an audio file in the workspace.
pub struct AudioSynthesizer<'a> {
    engine: &'a dyn SpeechEngine,
    policy: RetryPolicy,
    language: String,
}

impl<'a> AudioSynthesizer<'a> {
    pub fn new(engine: &'a dyn SpeechEngine, policy: RetryPolicy, language: impl Into<String>) -> Self {
        Self {
            engine,
            policy,
            language: language.into(),
        }
    }

    /// Synthesize `text` for slide `slide_index`.
    ///
    /// Failed attempts leave nothing behind: audio reaches the workspace only
    /// after an attempt has returned complete data.
    pub fn synthesize(
        &self,
        slide_index: usize,
        text: &str,
        workspace: &Workspace,
        cancel: &CancelToken,
    ) -> Result<AudioArtifact> {
        let retried = self
            .policy
            .run(cancel, SpeechError::is_cancelled, |attempt| {
                log::debug!("Slide {}: synthesis attempt {}", slide_index + 1, attempt);
                self.engine.synthesize(text, &self.language, cancel)
            })
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => Error::SynthesisFailed {
                    slide: slide_index,
                    attempts,
                    source: last,
                },
                RetryError::Cancelled { .. } => Error::Cancelled,
            })?;

        if retried.retries > 0 {
            log::info!(
                "Slide {}: speech synthesized after {} retries",
                slide_index + 1,
                retried.retries
            );
        }

        let audio = retried.value;
        let path = workspace.audio_path(slide_index, audio.extension);
        if let Err(e) = std::fs::write(&path, &audio.bytes) {
            discard(&path);
            return Err(Error::io(path, e));
        }

        Ok(AudioArtifact {
            slide_index,
            path,
        })
    }
}
