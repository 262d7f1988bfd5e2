//! Domain types for a narration run.

use std::path::{Path, PathBuf};

/// An ordered slide deck paired with its rendered page images.
///
/// Construction goes through [`Deck::from_parts`], which enforces the
/// one-image-per-slide invariant.
#[derive(Debug, Clone)]
pub struct Deck {
    slides: Vec<Slide>,
}

impl Deck {
    /// Pair per-slide notes with rendered page images.
    ///
    /// Fails with [`crate::Error::Mismatch`] when the counts differ.
    pub fn from_parts(notes: Vec<Option<String>>, images: Vec<PathBuf>) -> crate::Result<Self> {
        if notes.len() != images.len() {
            return Err(crate::Error::Mismatch {
                slides: notes.len(),
                pages: images.len(),
            });
        }

        let slides = notes
            .into_iter()
            .zip(images)
            .enumerate()
            .map(|(index, (notes, image))| Slide {
                index,
                image,
                notes,
            })
            .collect();

        Ok(Self { slides })
    }

    /// Slides in presentation order.
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Number of slides.
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Whether the deck has no slides at all.
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Number of slides that carry speaker notes.
    pub fn narrated_count(&self) -> usize {
        self.slides.iter().filter(|s| s.has_notes()).count()
    }
}

/// A single slide: its position, rendered image and speaker notes.
#[derive(Debug, Clone)]
pub struct Slide {
    index: usize,
    image: PathBuf,
    notes: Option<String>,
}

impl Slide {
    /// Zero-based position in the deck.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rendered page image.
    pub fn image(&self) -> &Path {
        &self.image
    }

    /// Speaker notes, if the slide has any.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn has_notes(&self) -> bool {
        self.notes.is_some()
    }
}

/// Synthesized speech for one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub slide_index: usize,
    pub path: PathBuf,
}

/// One slide's streaming-safe video segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub slide_index: usize,
    pub path: PathBuf,
}

/// The successful result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    /// Location of the final video.
    pub final_artifact: PathBuf,

    /// Slide indices that contributed a segment, in output order.
    pub included_slides: Vec<usize>,
}

/// Audio returned by a speech engine.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    /// Encoded audio data.
    pub bytes: Vec<u8>,

    /// File extension matching the encoding (e.g. `mp3`, `wav`).
    pub extension: &'static str,
}
