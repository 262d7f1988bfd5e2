//! PDF page rasterization through poppler's `pdftoppm`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use narrator_core::{CancelToken, PageRasterizer, ToolError};

use crate::process::run_tool;

/// File name prefix of rendered pages inside the output directory.
const PAGE_PREFIX: &str = "page";

/// Rasterizer that renders every PDF page to a JPEG file.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    binary: String,
    dpi: u32,
}

impl Pdftoppm {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            dpi: 200,
        }
    }

    /// Set the rendering resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl PageRasterizer for Pdftoppm {
    fn rasterize(
        &self,
        document: &Path,
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<PathBuf>, ToolError> {
        let mut args: Vec<OsString> = vec!["-r".into(), self.dpi.to_string().into(), "-jpeg".into()];
        args.push(document.into());
        args.push(out_dir.join(PAGE_PREFIX).into());

        run_tool(&self.binary, &args, cancel)?;

        let pages = collect_pages(out_dir)?;
        log::info!("Rendered {} pages from {}", pages.len(), document.display());
        Ok(pages)
    }
}

/// List rendered pages in page order.
///
/// pdftoppm zero-pads page numbers to the width of the page count
/// (`page-01.jpg`), so ordering is by the parsed number, not the name.
fn collect_pages(out_dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let mut pages: Vec<(usize, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(out_dir)? {
        let path = entry?.path();
        let number = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_page_number);
        if let Some(number) = number {
            pages.push((number, path));
        }
    }

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Parse the page number out of a name like `page-07.jpg`.
fn parse_page_number(file_name: &str) -> Option<usize> {
    let stem = file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .strip_suffix(".jpg")?;
    stem.parse().ok()
}
