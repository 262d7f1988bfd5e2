//! Scoped temporary workspace for intermediate artifacts.

use std::path::{Path, PathBuf};

use narrator_core::{Error, Result};
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "deck-narrator-";

/// Temporary directory holding every image, audio and segment file of a run.
///
/// The directory is deleted when the workspace is dropped, so every exit
/// path of the orchestrator releases it.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace in the system temporary directory.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        Ok(Self::from_dir(dir))
    }

    /// Create a workspace inside `root`.
    pub fn create_in(root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)
            .map_err(|e| Error::io(root, e))?;
        Ok(Self::from_dir(dir))
    }

    fn from_dir(dir: TempDir) -> Self {
        log::debug!("Created workspace {}", dir.path().display());
        Self { dir }
    }

    /// Root of the workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory receiving the rendered page images.
    pub fn pages_dir(&self) -> Result<PathBuf> {
        let dir = self.path().join("pages");
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(dir)
    }

    /// Synthesized speech for a slide.
    pub fn audio_path(&self, index: usize, extension: &str) -> PathBuf {
        self.path().join(format!("frame_{}.{}", index, extension))
    }

    /// Silent placeholder track for a slide without notes.
    pub fn silence_path(&self, index: usize) -> PathBuf {
        self.path().join(format!("frame_{}_silence.wav", index))
    }

    /// Stage-one muxed video of a slide.
    pub fn mux_path(&self, index: usize) -> PathBuf {
        self.path().join(format!("frame_{}.mp4", index))
    }

    /// Concatenation-ready stream segment of a slide.
    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.path().join(format!("frame_{}.ts", index))
    }

    /// Final video before it is moved to the output path.
    pub fn final_path(&self, extension: &str) -> PathBuf {
        self.path().join(format!("final.{}", extension))
    }

    /// Remove the workspace now, reporting any error.
    pub fn close(self) -> Result<()> {
        let path = self.path().to_path_buf();
        self.dir.close().map_err(|e| Error::io(path, e))
    }
}

/// Remove an intermediate file, ignoring files that are already gone.
pub(crate) fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
    }
}
