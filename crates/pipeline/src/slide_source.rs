//! Loads the deck: speaker notes from the deck file, images from the
//! pre-rendered document.

use std::path::Path;

use narrator_core::{CancelToken, Deck, DeckParser, Error, NotesNormalizer, PageRasterizer, Result, ToolError};

use crate::workspace::Workspace;

/// Pairs the deck's slides with rendered page images.
pub struct SlideSource<'a> {
    parser: &'a dyn DeckParser,
    rasterizer: &'a dyn PageRasterizer,
    normalizer: NotesNormalizer,
}

impl<'a> SlideSource<'a> {
    pub fn new(parser: &'a dyn DeckParser, rasterizer: &'a dyn PageRasterizer) -> Self {
        Self {
            parser,
            rasterizer,
            normalizer: NotesNormalizer::new(),
        }
    }

    /// Parse the deck, render its pages into the workspace, and check that
    /// there is exactly one page per slide.
    ///
    /// Notes are normalized here; notes that are blank after normalization
    /// count as absent.
    pub fn load(
        &self,
        deck_path: &Path,
        pages_path: &Path,
        workspace: &Workspace,
        cancel: &CancelToken,
    ) -> Result<Deck> {
        let notes: Vec<Option<String>> = self
            .parser
            .parse_deck(deck_path)?
            .into_iter()
            .map(|n| self.normalizer.normalize_opt(n.as_deref()))
            .collect();

        let pages_dir = workspace.pages_dir()?;
        let images = self
            .rasterizer
            .rasterize(pages_path, &pages_dir, cancel)
            .map_err(|e| match e {
                ToolError::Cancelled => Error::Cancelled,
                other => Error::Rasterize(other),
            })?;

        let deck = Deck::from_parts(notes, images)?;
        log::info!(
            "Loaded {} slides ({} with speaker notes)",
            deck.len(),
            deck.narrated_count()
        );
        Ok(deck)
    }
}
