//! Index-addressed segment collection and ordered concatenation.

use std::path::{Path, PathBuf};

use narrator_core::{CancelToken, CodecTool, Error, Result, Segment, ToolError};

/// One slot per slide; workers fill their own slot in any order.
#[derive(Debug, Clone, Default)]
pub struct SegmentSlots {
    slots: Vec<Option<Segment>>,
}

impl SegmentSlots {
    /// Create `len` empty slots.
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// Store a segment in the slot of its slide.
    ///
    /// # Panics
    /// If the slide index is out of range or the slot is already filled;
    /// each slide produces at most one segment.
    pub fn fill(&mut self, segment: Segment) {
        let index = segment.slide_index;
        let slot = self
            .slots
            .get_mut(index)
            .unwrap_or_else(|| panic!("segment for slide {} has no slot", index));
        assert!(slot.is_none(), "slide {} produced two segments", index);
        *slot = Some(segment);
    }

    /// Number of filled slots.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Filled slots in ascending slide order.
    pub fn into_ordered(self) -> Vec<Segment> {
        self.slots.into_iter().flatten().collect()
    }
}

/// Joins segments into the final video.
pub struct SegmentSequencer<'a> {
    codec: &'a dyn CodecTool,
}

impl<'a> SegmentSequencer<'a> {
    pub fn new(codec: &'a dyn CodecTool) -> Self {
        Self { codec }
    }

    /// Concatenate `segments` in ascending slide order into `output`.
    ///
    /// The input order does not matter; segments are sorted by slide index
    /// before joining.
    pub fn concatenate(
        &self,
        segments: &[Segment],
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let mut ordered: Vec<&Segment> = segments.iter().collect();
        ordered.sort_by_key(|s| s.slide_index);

        let paths: Vec<PathBuf> = ordered.iter().map(|s| s.path.clone()).collect();
        log::info!("Concatenating {} segments into {}", paths.len(), output.display());

        match self.codec.concat_ts(&paths, output, cancel) {
            Ok(()) => Ok(output.to_path_buf()),
            Err(ToolError::Cancelled) => Err(Error::Cancelled),
            Err(e) => Err(Error::Concat(e)),
        }
    }
}
