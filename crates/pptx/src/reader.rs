//! PPTX package reader.
//!
//! Resolves the parts a template needs for slide generation (slide order,
//! slide layouts, layout placeholders) and extracts slide text.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sprint_core::{Error, Result};
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Main presentation part.
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Package content types part.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Relationship type of a slide notes part.
const NOTES_SLIDE_REL_SUFFIX: &str = "/notesSlide";

/// A relationship from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// A slide listed in the presentation's `sldIdLst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideEntry {
    /// Numeric `id` attribute.
    pub id: u32,

    /// Relationship id linking the presentation to the slide part.
    pub rel_id: String,

    /// Absolute part name, e.g. `ppt/slides/slide1.xml`.
    pub path: String,
}

/// A placeholder declared on a slide layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Placeholder {
    /// `type` attribute (`title`, `body`, ...). Absent means `obj`.
    pub kind: Option<String>,

    /// `idx` attribute. Absent means 0.
    pub idx: Option<u32>,
}

impl Placeholder {
    /// Title placeholders, including centered titles.
    pub fn is_title(&self) -> bool {
        matches!(self.kind.as_deref(), Some("title") | Some("ctrTitle"))
    }

    pub fn index(&self) -> u32 {
        self.idx.unwrap_or(0)
    }
}

/// A paragraph of slide text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextLine {
    pub text: String,
    pub level: u8,
}

/// Text read back from a slide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideText {
    /// Text of the title placeholder, if the slide has one.
    pub title: Option<String>,

    /// Paragraphs of every other text shape, in document order.
    pub body: Vec<TextLine>,
}

impl SlideText {
    /// Body paragraph texts, flattened.
    pub fn body_lines(&self) -> Vec<&str> {
        self.body.iter().map(|l| l.text.as_str()).collect()
    }
}

/// Reader over a PPTX package.
pub struct TemplateReader<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> TemplateReader<R> {
    /// Open a PPTX package from a reader.
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;
        Ok(Self { archive })
    }

    /// Give back the underlying archive, e.g. to copy its parts.
    pub fn into_archive(self) -> ZipArchive<R> {
        self.archive
    }

    /// Names of all parts, in archive order.
    pub fn part_names(&mut self) -> Result<Vec<String>> {
        (0..self.archive.len())
            .map(|i| {
                self.archive
                    .by_index_raw(i)
                    .map(|f| f.name().to_string())
                    .map_err(|e| Error::Zip(format!("Failed to read entry {}: {}", i, e)))
            })
            .collect()
    }

    pub fn has_part(&mut self, path: &str) -> bool {
        self.archive.by_name(path).is_ok()
    }

    /// Read a part from the archive as text.
    pub fn read_part(&mut self, path: &str) -> Result<String> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|e| Error::Zip(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }

    /// Relationships of a part. A part without a `.rels` file has none.
    pub fn relationships(&mut self, part: &str) -> Result<Vec<Relationship>> {
        let rels_path = rels_path_for(part);
        if !self.has_part(&rels_path) {
            return Ok(Vec::new());
        }
        parse_relationships(&self.read_part(&rels_path)?)
    }

    /// Slides in presentation order.
    pub fn slides(&mut self) -> Result<Vec<SlideEntry>> {
        let presentation = self.read_part(PRESENTATION_PART)?;
        let rels = self.relationships(PRESENTATION_PART)?;

        id_list(&presentation, b"sldId")?
            .into_iter()
            .map(|(id, rel_id)| {
                let target = find_target(&rels, &rel_id, PRESENTATION_PART)?;
                Ok(SlideEntry {
                    id: id.unwrap_or(0),
                    rel_id,
                    path: resolve_target(PRESENTATION_PART, &target),
                })
            })
            .collect()
    }

    /// Layout parts of the first slide master, in the master's order.
    pub fn layouts(&mut self) -> Result<Vec<String>> {
        let presentation = self.read_part(PRESENTATION_PART)?;
        let rels = self.relationships(PRESENTATION_PART)?;

        let (_, master_rel) = id_list(&presentation, b"sldMasterId")?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Template("presentation has no slide master".to_string()))?;
        let master = resolve_target(
            PRESENTATION_PART,
            &find_target(&rels, &master_rel, PRESENTATION_PART)?,
        );
        log::debug!("Using slide master {}", master);

        let master_xml = self.read_part(&master)?;
        let master_rels = self.relationships(&master)?;

        id_list(&master_xml, b"sldLayoutId")?
            .into_iter()
            .map(|(_, rel_id)| {
                let target = find_target(&master_rels, &rel_id, &master)?;
                Ok(resolve_target(&master, &target))
            })
            .collect()
    }

    /// Placeholders declared on a slide or layout part.
    pub fn placeholders(&mut self, part: &str) -> Result<Vec<Placeholder>> {
        parse_placeholders(&self.read_part(part)?)
    }

    /// A slide part plus the parts that only exist for it (its `.rels`,
    /// its notes slide and the notes slide's `.rels`).
    pub fn slide_with_dependents(&mut self, slide: &str) -> Result<Vec<String>> {
        let mut parts = vec![slide.to_string()];

        for rel in self.relationships(slide)? {
            if rel.rel_type.ends_with(NOTES_SLIDE_REL_SUFFIX) {
                let notes = resolve_target(slide, &rel.target);
                let notes_rels = rels_path_for(&notes);
                if self.has_part(&notes_rels) {
                    parts.push(notes_rels);
                }
                parts.push(notes);
            }
        }

        let rels = rels_path_for(slide);
        if self.has_part(&rels) {
            parts.push(rels);
        }

        Ok(parts)
    }

    /// Text of every slide, in presentation order.
    pub fn slide_texts(&mut self) -> Result<Vec<SlideText>> {
        let slides = self.slides()?;
        slides
            .iter()
            .map(|slide| parse_slide_text(&self.read_part(&slide.path)?))
            .collect()
    }
}

/// Parse a `.rels` part.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                };

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }

                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error parsing relationships: {}", e))),
            _ => {}
        }
    }

    Ok(rels)
}

/// `(id, r:id)` pairs of every `element` in document order.
fn id_list(xml: &str, element: &[u8]) -> Result<Vec<(Option<u32>, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut entries = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == element =>
            {
                let (id, rel_id) = id_attributes(e);
                if let Some(rel_id) = rel_id {
                    entries.push((id, rel_id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error parsing id list: {}", e))),
            _ => {}
        }
    }

    Ok(entries)
}

/// The plain `id` and namespaced `r:id` attributes of an element.
pub(crate) fn id_attributes(e: &BytesStart) -> (Option<u32>, Option<String>) {
    let mut id = None;
    let mut rel_id = None;

    for attr in e.attributes().flatten() {
        let key = attr.key.as_ref();
        let value = String::from_utf8_lossy(&attr.value);
        if key == b"id" {
            id = value.parse().ok();
        } else if local_name(key) == b"id" {
            rel_id = Some(value.to_string());
        }
    }

    (id, rel_id)
}

fn find_target(rels: &[Relationship], rel_id: &str, source: &str) -> Result<String> {
    rels.iter()
        .find(|r| r.id == rel_id)
        .map(|r| r.target.clone())
        .ok_or_else(|| Error::Template(format!("{} has no relationship {}", source, rel_id)))
}

fn parse_placeholders(xml: &str) -> Result<Vec<Placeholder>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut placeholders = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"ph" =>
            {
                placeholders.push(placeholder_from(e));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error parsing placeholders: {}", e))),
            _ => {}
        }
    }

    Ok(placeholders)
}

fn placeholder_from(e: &BytesStart) -> Placeholder {
    let mut ph = Placeholder::default();
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.as_ref() {
            b"type" => ph.kind = Some(value),
            b"idx" => ph.idx = value.parse().ok(),
            _ => {}
        }
    }
    ph
}

/// Text collected from one shape while parsing a slide.
#[derive(Debug, Default)]
struct ShapeText {
    placeholder: Option<Placeholder>,
    paragraphs: Vec<TextLine>,
}

/// Extract the title and body paragraphs from slide XML.
fn parse_slide_text(xml: &str) -> Result<SlideText> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut slide = SlideText::default();
    let mut shape: Option<ShapeText> = None;
    let mut paragraph: Option<TextLine> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => shape = Some(ShapeText::default()),
                b"ph" => set_placeholder(&mut shape, e),
                b"p" if shape.is_some() => paragraph = Some(TextLine::default()),
                b"pPr" => set_level(&mut paragraph, e),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"ph" => set_placeholder(&mut shape, e),
                b"pPr" => set_level(&mut paragraph, e),
                b"p" => {
                    if let Some(ref mut s) = shape {
                        s.paragraphs.push(TextLine::default());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_text {
                    if let Some(ref mut p) = paragraph {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Bad slide text: {}", e)))?;
                        p.text.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"p" => {
                    if let (Some(s), Some(p)) = (shape.as_mut(), paragraph.take()) {
                        s.paragraphs.push(p);
                    }
                }
                b"sp" => {
                    if let Some(s) = shape.take() {
                        let is_title = s.placeholder.as_ref().is_some_and(Placeholder::is_title);
                        if is_title {
                            let title: Vec<String> =
                                s.paragraphs.into_iter().map(|p| p.text).collect();
                            slide.title = Some(title.join("\n"));
                        } else {
                            slide.body.extend(s.paragraphs);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error parsing slide: {}", e))),
            _ => {}
        }
    }

    Ok(slide)
}

fn set_placeholder(shape: &mut Option<ShapeText>, e: &BytesStart) {
    if let Some(ref mut s) = shape {
        s.placeholder = Some(placeholder_from(e));
    }
}

fn set_level(paragraph: &mut Option<TextLine>, e: &BytesStart) {
    if let Some(ref mut p) = paragraph {
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() == b"lvl" {
                p.level = String::from_utf8_lossy(&attr.value).parse().unwrap_or(0);
            }
        }
    }
}

/// The `.rels` part holding a part's relationships.
///
/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = source_part.split('/').collect();
    segments.pop();

    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            s => segments.push(s),
        }
    }

    segments.join("/")
}

/// Relationship target for `target_part` as seen from `source_part`.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target: Vec<&str> = target_part.split('/').collect();

    let common = source_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<&str> = vec![".."; source_dir.len() - common];
    segments.extend(&target[common..]);
    segments.join("/")
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a trailing number from a string like "rId2" or "slide3.xml".
pub(crate) fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    // Try to find digits at the end
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
