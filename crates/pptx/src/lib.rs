//! PPTX (Office Open XML) speaker-notes reader.
//!
//! Parses .pptx files, which are ZIP archives of XML parts, and returns the
//! notes text of every slide in presentation order.

pub mod parser;

pub use parser::PptxParser;
