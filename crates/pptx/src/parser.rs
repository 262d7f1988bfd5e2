//! PPTX speaker-notes reader.

use narrator_core::{DeckParser, Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";

/// Parser for the speaker notes of PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Read the speaker notes of every slide, in presentation order.
    ///
    /// A slide without a notes page, or whose notes page has no body
    /// placeholder, yields `None`.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Vec<Option<String>>> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;

        let slide_order = self.get_slide_order(&mut archive)?;
        log::debug!("Found {} slides", slide_order.len());

        let mut notes = Vec::with_capacity(slide_order.len());
        for slide_path in &slide_order {
            notes.push(self.parse_slide_notes(&mut archive, slide_path)?);
        }

        Ok(notes)
    }

    /// Get the ordered list of slide part paths.
    ///
    /// The authoritative order is the `sldIdLst` of `presentation.xml`; when it
    /// is missing, slide relationships are ordered by their trailing number.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, PRESENTATION_RELS_PATH)?;
        let relationships = parse_relationships(&rels_content)?;

        let slide_rels: HashMap<&str, &Relationship> = relationships
            .iter()
            .filter(|r| is_slide_relationship(&r.rel_type))
            .map(|r| (r.id.as_str(), r))
            .collect();

        if archive.by_name(PRESENTATION_PATH).is_ok() {
            let presentation = self.read_file_from_archive(archive, PRESENTATION_PATH)?;
            let ids = parse_slide_id_list(&presentation)?;
            if !ids.is_empty() {
                return ids
                    .iter()
                    .map(|id| {
                        slide_rels
                            .get(id.as_str())
                            .map(|rel| resolve_part_path("ppt", &rel.target))
                            .ok_or_else(|| {
                                Error::PptxParse(format!("slide relationship '{}' not found", id))
                            })
                    })
                    .collect();
            }
        }

        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .values()
            .map(|rel| {
                let order_num =
                    extract_slide_number(&rel.target).or_else(|| extract_slide_number(&rel.id));
                (resolve_part_path("ppt", &rel.target), order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Find and read the notes page attached to a slide.
    fn parse_slide_notes<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
    ) -> Result<Option<String>> {
        if archive.by_name(slide_path).is_err() {
            return Err(Error::PptxParse(format!("slide part '{}' is missing", slide_path)));
        }

        let (slide_dir, slide_file) = match slide_path.rsplit_once('/') {
            Some((dir, file)) => (dir, file),
            None => ("", slide_path),
        };
        let rels_path = format!("{}/_rels/{}.rels", slide_dir, slide_file);

        // Slides without any relationships have no notes page
        if archive.by_name(&rels_path).is_err() {
            return Ok(None);
        }

        let rels_content = self.read_file_from_archive(archive, &rels_path)?;
        let notes_rel = parse_relationships(&rels_content)?
            .into_iter()
            .find(|r| r.rel_type.ends_with("/notesSlide"));

        let Some(rel) = notes_rel else {
            return Ok(None);
        };

        let notes_path = resolve_part_path(slide_dir, &rel.target);
        let content = self.read_file_from_archive(archive, &notes_path)?;
        extract_notes_text(&content)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::Zip(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DeckParser for PptxParser {
    fn parse_deck(&self, path: &Path) -> Result<Vec<Option<String>>> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        self.parse(BufReader::new(file))
    }
}

/// A single `<Relationship>` entry.
#[derive(Debug, Clone, Default)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// Parse the `<Relationship>` entries of a `.rels` part.
fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut relationships = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship::default();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }
                relationships.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Check whether a relationship type points at a slide part.
fn is_slide_relationship(rel_type: &str) -> bool {
    rel_type.ends_with("/slide")
}

/// Collect the relationship ids of `<p:sldIdLst>` in document order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut ids = Vec::new();
    let mut in_list = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                in_list = true;
            }
            Ok(Event::End(ref e)) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                in_list = false;
            }
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if in_list && local_name(e.name().as_ref()) == b"sldId" =>
            {
                if let Some(id) = relationship_id(e) {
                    ids.push(id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing presentation: {}", e)));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// The namespaced `r:id` attribute of an element (the bare `id` is numeric).
fn relationship_id(e: &BytesStart<'_>) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        let key = attr.key.as_ref();
        let namespaced = key.contains(&b':');
        (namespaced && local_name(key) == b"id")
            .then(|| String::from_utf8_lossy(&attr.value).to_string())
    })
}

/// Extract the body-placeholder text of a notes page.
///
/// Paragraphs are joined with newlines; `<a:br/>` inside a paragraph also
/// becomes a newline. Returns `None` if the page has no body placeholder.
fn extract_notes_text(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);

    let mut shape_depth = 0usize;
    let mut is_body = false;
    let mut in_text = false;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut body: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => {
                    shape_depth += 1;
                    if shape_depth == 1 {
                        is_body = false;
                        paragraphs.clear();
                    }
                }
                b"ph" if shape_depth > 0 => is_body |= is_body_placeholder(e),
                b"p" if shape_depth > 0 => paragraphs.push(String::new()),
                b"t" if shape_depth > 0 => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"ph" if shape_depth > 0 => is_body |= is_body_placeholder(e),
                b"br" if shape_depth > 0 => {
                    if let Some(p) = paragraphs.last_mut() {
                        p.push('\n');
                    }
                }
                b"p" if shape_depth > 0 => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::Xml(format!("Bad text in notes: {}", e)))?;
                match paragraphs.last_mut() {
                    Some(p) => p.push_str(&text),
                    None => paragraphs.push(text.into_owned()),
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"sp" => {
                    shape_depth = shape_depth.saturating_sub(1);
                    if shape_depth == 0 && is_body && body.is_none() {
                        body = Some(paragraphs.join("\n"));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing notes page: {}", e)));
            }
            _ => {}
        }
    }

    Ok(body)
}

/// Check whether a `<p:ph>` element marks the notes body placeholder.
fn is_body_placeholder(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"type" && attr.value.as_ref() == b"body")
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_part_path(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
