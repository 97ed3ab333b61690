//! Slide deck writer.
//!
//! Appends generated slides to a copy of a template package. The template's
//! first slide is a placeholder and is dropped from the output together with
//! its notes. Every other part is copied through unchanged.

use crate::reader::{
    extract_slide_number, id_attributes, local_name, parse_relationships, relative_target,
    rels_path_for, Placeholder, Relationship, TemplateReader, CONTENT_TYPES_PART,
    PRESENTATION_PART,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use sprint_core::config::DEFAULT_LAYOUT_INDEX;
use sprint_core::{Deck, Error, Paragraph, Result, SlideContent};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const REL_TYPE_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_TYPE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// Lowest slide id PowerPoint accepts.
const MIN_SLIDE_ID: u32 = 256;

/// Index of the layout's body placeholder (`idx=1`).
const BODY_PLACEHOLDER_IDX: u32 = 1;

/// A slide added to the package.
#[derive(Debug, Clone)]
struct NewSlide {
    id: u32,
    rel_id: String,
    path: String,
}

/// The placeholders generated slides fill, copied from the chosen layout.
#[derive(Debug, Clone)]
struct LayoutSlots {
    title: Placeholder,
    body: Placeholder,
}

impl LayoutSlots {
    fn from_layout(layout: &str, placeholders: &[Placeholder]) -> Result<Self> {
        let title = placeholders
            .iter()
            .find(|p| p.is_title())
            .cloned()
            .ok_or_else(|| Error::Template(format!("no title placeholder in {}", layout)))?;
        let body = placeholders
            .iter()
            .find(|p| !p.is_title() && p.index() == BODY_PLACEHOLDER_IDX)
            .cloned()
            .ok_or_else(|| {
                Error::Template(format!(
                    "layout {} has no body placeholder idx={}",
                    layout, BODY_PLACEHOLDER_IDX
                ))
            })?;
        Ok(Self { title, body })
    }
}

/// Writes a [`Deck`] into a template presentation.
#[derive(Debug, Clone)]
pub struct DeckWriter {
    layout_index: usize,
}

impl Default for DeckWriter {
    fn default() -> Self {
        Self {
            layout_index: DEFAULT_LAYOUT_INDEX,
        }
    }
}

impl DeckWriter {
    /// Create a writer using the default layout slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the layout at `index` in the first slide master.
    pub fn with_layout_index(mut self, index: usize) -> Self {
        self.layout_index = index;
        self
    }

    /// Render the deck into `template` and write the result to `output`.
    ///
    /// Nothing is written unless rendering succeeds.
    pub fn write_file(&self, template: &Path, deck: &Deck, output: &Path) -> Result<()> {
        let file = File::open(template)
            .map_err(|e| Error::Template(format!("cannot open {}: {}", template.display(), e)))?;
        let bytes = self.render(BufReader::new(file), deck)?;
        fs::write(output, bytes)?;
        let path = output.display();
        log::info!("Wrote {} slides to {}", deck.slides.len(), path);
        Ok(())
    }

    /// Render the deck into a template package, returning the new package bytes.
    pub fn render<R: Read + Seek>(&self, template: R, deck: &Deck) -> Result<Vec<u8>> {
        let mut reader = TemplateReader::new(template)?;

        let presentation_rels_path = rels_path_for(PRESENTATION_PART);
        let presentation_xml = reader.read_part(PRESENTATION_PART)?;
        let presentation_rels = reader.read_part(&presentation_rels_path)?;
        let content_types = reader.read_part(CONTENT_TYPES_PART)?;
        let part_names = reader.part_names()?;

        let layouts = reader.layouts()?;
        let layout = layouts.get(self.layout_index).cloned().ok_or_else(|| {
            Error::Template(format!(
                "layout slot {} requested but the template has {} layouts",
                self.layout_index,
                layouts.len()
            ))
        })?;
        let slots = LayoutSlots::from_layout(&layout, &reader.placeholders(&layout)?)?;
        log::debug!("Using layout {} ({:?})", layout, slots);

        let existing = reader.slides()?;
        let (removed_rel, removed_parts) = match existing.first() {
            Some(first) => {
                log::debug!("Removing template slide {}", first.path);
                let parts = reader.slide_with_dependents(&first.path)?;
                (Some(first.rel_id.clone()), parts)
            }
            None => {
                log::warn!("Template has no slides to remove");
                (None, Vec::new())
            }
        };

        let new_slides = allocate_slides(
            deck.slides.len(),
            &existing.iter().map(|s| s.id).collect::<Vec<_>>(),
            &parse_relationships(&presentation_rels)?,
            &part_names,
        );

        let mut added: Vec<(String, Vec<u8>)> = Vec::new();
        for (content, slide) in deck.slides.iter().zip(&new_slides) {
            added.push((slide.path.clone(), slide_xml(content, &slots)?));
            let layout_rel = Relationship {
                id: "rId1".to_string(),
                rel_type: REL_TYPE_LAYOUT.to_string(),
                target: relative_target(&slide.path, &layout),
            };
            let slide_rels = relationships_xml(&[layout_rel])?;
            added.push((rels_path_for(&slide.path), slide_rels));
        }

        let presentation =
            rewrite_presentation(&presentation_xml, removed_rel.as_deref(), &new_slides)?;
        let new_rels: Vec<Relationship> = new_slides
            .iter()
            .map(|s| Relationship {
                id: s.rel_id.clone(),
                rel_type: REL_TYPE_SLIDE.to_string(),
                target: relative_target(PRESENTATION_PART, &s.path),
            })
            .collect();
        let rels = rewrite_relationships(&presentation_rels, removed_rel.as_deref(), &new_rels)?;
        let added_paths: Vec<&str> = new_slides.iter().map(|s| s.path.as_str()).collect();
        let types = rewrite_content_types(&content_types, &removed_parts, &added_paths)?;

        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut archive = reader.into_archive();
        let mut out = ZipWriter::new(Cursor::new(Vec::new()));

        for i in 0..archive.len() {
            let file = archive
                .by_index_raw(i)
                .map_err(|e| Error::Zip(format!("Failed to read entry {}: {}", i, e)))?;
            let name = file.name().to_string();

            if removed_parts.contains(&name) {
                continue;
            }

            let replacement = if name == PRESENTATION_PART {
                Some(&presentation)
            } else if name == presentation_rels_path {
                Some(&rels)
            } else if name == CONTENT_TYPES_PART {
                Some(&types)
            } else {
                None
            };

            match replacement {
                Some(bytes) => {
                    drop(file);
                    write_part(&mut out, &name, bytes, options)?;
                }
                None => out
                    .raw_copy_file(file)
                    .map_err(|e| Error::Zip(format!("Failed to copy '{}': {}", name, e)))?,
            }
        }

        for (name, bytes) in &added {
            write_part(&mut out, name, bytes, options)?;
        }

        let cursor = out
            .finish()
            .map_err(|e| Error::Zip(format!("Failed to finish archive: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

fn write_part<W: Write + Seek>(
    out: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    options: FileOptions,
) -> Result<()> {
    out.start_file(name, options)
        .map_err(|e| Error::Zip(format!("Failed to add '{}': {}", name, e)))?;
    out.write_all(bytes)?;
    Ok(())
}

/// Pick slide ids, relationship ids, and part names that do not collide
/// with anything already in the template.
fn allocate_slides(
    count: usize,
    slide_ids: &[u32],
    rels: &[Relationship],
    part_names: &[String],
) -> Vec<NewSlide> {
    let mut next_id = slide_ids
        .iter()
        .copied()
        .max()
        .map_or(MIN_SLIDE_ID, |id| id + 1)
        .max(MIN_SLIDE_ID);
    let mut next_rel = rels
        .iter()
        .filter_map(|r| extract_slide_number(&r.id))
        .max()
        .unwrap_or(0)
        + 1;
    let mut next_part = part_names
        .iter()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .filter_map(|n| extract_slide_number(n))
        .max()
        .unwrap_or(0)
        + 1;

    (0..count)
        .map(|_| {
            let slide = NewSlide {
                id: next_id,
                rel_id: format!("rId{}", next_rel),
                path: format!("ppt/slides/slide{}.xml", next_part),
            };
            next_id += 1;
            next_rel += 1;
            next_part += 1;
            slide
        })
        .collect()
}

/// Event-level XML writer that maps errors into our error type.
struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn event(&mut self, event: Event) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Xml(format!("Failed to write XML: {}", e)))
    }

    fn decl(&mut self) -> Result<()> {
        let decl = BytesDecl::new("1.0", Some("UTF-8"), Some("yes"));
        self.event(Event::Decl(decl))?;
        self.event(Event::Text(BytesText::from_escaped("\n")))
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.event(Event::Start(start))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let empty = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.event(Event::Empty(empty))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.event(Event::Text(BytesText::new(text)))
    }

    fn into_inner(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Serialize a relationships part.
fn relationships_xml(rels: &[Relationship]) -> Result<Vec<u8>> {
    let mut xml = XmlOut::new();
    xml.decl()?;
    xml.start("Relationships", &[("xmlns", NS_RELS)])?;
    for rel in rels {
        write_relationship(&mut xml, rel)?;
    }
    xml.end("Relationships")?;
    Ok(xml.into_inner())
}

fn write_relationship(xml: &mut XmlOut, rel: &Relationship) -> Result<()> {
    xml.empty(
        "Relationship",
        &[
            ("Id", rel.id.as_str()),
            ("Type", rel.rel_type.as_str()),
            ("Target", rel.target.as_str()),
        ],
    )
}

/// Serialize one slide with a title and a body placeholder.
fn slide_xml(content: &SlideContent, slots: &LayoutSlots) -> Result<Vec<u8>> {
    let mut xml = XmlOut::new();
    xml.decl()?;
    let namespaces = [("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)];
    xml.start("p:sld", &namespaces)?;
    xml.start("p:cSld", &[])?;
    xml.start("p:spTree", &[])?;

    xml.start("p:nvGrpSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", "1"), ("name", "")])?;
    xml.empty("p:cNvGrpSpPr", &[])?;
    xml.empty("p:nvPr", &[])?;
    xml.end("p:nvGrpSpPr")?;
    xml.start("p:grpSpPr", &[])?;
    xml.start("a:xfrm", &[])?;
    xml.empty("a:off", &[("x", "0"), ("y", "0")])?;
    xml.empty("a:ext", &[("cx", "0"), ("cy", "0")])?;
    xml.empty("a:chOff", &[("x", "0"), ("y", "0")])?;
    xml.empty("a:chExt", &[("cx", "0"), ("cy", "0")])?;
    xml.end("a:xfrm")?;
    xml.end("p:grpSpPr")?;

    let title = [Paragraph::new(content.title.as_str())];
    write_shape(&mut xml, 2, "Title 1", &slots.title, &title)?;
    let body = &content.paragraphs;
    write_shape(&mut xml, 3, "Content Placeholder 2", &slots.body, body)?;

    xml.end("p:spTree")?;
    xml.end("p:cSld")?;
    xml.start("p:clrMapOvr", &[])?;
    xml.empty("a:masterClrMapping", &[])?;
    xml.end("p:clrMapOvr")?;
    xml.end("p:sld")?;
    Ok(xml.into_inner())
}

/// Write a placeholder shape that inherits geometry from the layout.
fn write_shape(
    xml: &mut XmlOut,
    id: u32,
    name: &str,
    placeholder: &Placeholder,
    paragraphs: &[Paragraph],
) -> Result<()> {
    let id = id.to_string();
    let idx = placeholder.idx.map(|i| i.to_string());
    let mut ph_attrs: Vec<(&str, &str)> = Vec::new();
    if let Some(kind) = placeholder.kind.as_deref() {
        ph_attrs.push(("type", kind));
    }
    if let Some(idx) = idx.as_deref() {
        ph_attrs.push(("idx", idx));
    }

    xml.start("p:sp", &[])?;
    xml.start("p:nvSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", id.as_str()), ("name", name)])?;
    xml.start("p:cNvSpPr", &[])?;
    xml.empty("a:spLocks", &[("noGrp", "1")])?;
    xml.end("p:cNvSpPr")?;
    xml.start("p:nvPr", &[])?;
    xml.empty("p:ph", &ph_attrs)?;
    xml.end("p:nvPr")?;
    xml.end("p:nvSpPr")?;
    xml.empty("p:spPr", &[])?;

    xml.start("p:txBody", &[])?;
    xml.empty("a:bodyPr", &[])?;
    xml.empty("a:lstStyle", &[])?;
    if paragraphs.is_empty() {
        xml.empty("a:p", &[])?;
    }
    for paragraph in paragraphs {
        write_paragraph(xml, paragraph)?;
    }
    xml.end("p:txBody")?;
    xml.end("p:sp")
}

fn write_paragraph(xml: &mut XmlOut, paragraph: &Paragraph) -> Result<()> {
    let level = paragraph.level.to_string();
    let size = paragraph.size.map(|s| s.hundredths().to_string());
    let mut run_attrs: Vec<(&str, &str)> = vec![("lang", "en-US")];
    if let Some(size) = size.as_deref() {
        run_attrs.push(("sz", size));
    }
    if paragraph.bold {
        run_attrs.push(("b", "1"));
    }
    run_attrs.push(("dirty", "0"));

    xml.start("a:p", &[])?;
    if paragraph.level > 0 {
        xml.empty("a:pPr", &[("lvl", level.as_str())])?;
    }
    if paragraph.is_blank() {
        xml.empty("a:endParaRPr", &run_attrs)?;
    } else {
        xml.start("a:r", &[])?;
        xml.empty("a:rPr", &run_attrs)?;
        xml.start("a:t", &[])?;
        xml.text(&paragraph.text)?;
        xml.end("a:t")?;
        xml.end("a:r")?;
    }
    xml.end("a:p")
}

/// Prefix of a qualified name, e.g. `p` for `p:sldIdLst`.
fn prefix_of(name: &[u8]) -> Option<String> {
    name.iter()
        .position(|&b| b == b':')
        .map(|pos| String::from_utf8_lossy(&name[..pos]).to_string())
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{}:{}", p, local),
        None => local.to_string(),
    }
}

fn write_slide_ids(xml: &mut XmlOut, prefix: Option<&str>, slides: &[NewSlide]) -> Result<()> {
    let name = qualified(prefix, "sldId");
    for slide in slides {
        let id = slide.id.to_string();
        let attrs = [("id", id.as_str()), ("r:id", slide.rel_id.as_str())];
        xml.empty(&name, &attrs)?;
    }
    Ok(())
}

/// Elements that must follow `sldIdLst` in `presentation.xml`.
const AFTER_SLIDE_LIST: &[&[u8]] = &[b"sldSz", b"notesSz"];

/// Drop the removed slide from `sldIdLst` and append the new ones.
fn rewrite_presentation(
    xml: &str,
    removed_rel: Option<&str>,
    slides: &[NewSlide],
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut out = XmlOut::new();
    let mut wrote_list = false;
    let mut skip_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Xml(format!("Error parsing presentation: {}", e)))?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) | Event::Empty(ref e)
                if local_name(e.name().as_ref()) == b"sldId"
                    && removed_rel.is_some()
                    && id_attributes(e).1.as_deref() == removed_rel =>
            {
                if matches!(event, Event::Start(_)) {
                    skip_depth = 1;
                }
            }
            Event::Empty(ref e) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                let prefix = prefix_of(e.name().as_ref());
                let name = qualified(prefix.as_deref(), "sldIdLst");
                out.start(&name, &[])?;
                write_slide_ids(&mut out, prefix.as_deref(), slides)?;
                out.end(&name)?;
                wrote_list = true;
            }
            Event::End(ref e) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                let prefix = prefix_of(e.name().as_ref());
                write_slide_ids(&mut out, prefix.as_deref(), slides)?;
                out.event(event.clone())?;
                wrote_list = true;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if !wrote_list && AFTER_SLIDE_LIST.contains(&local_name(e.name().as_ref())) =>
            {
                let prefix = prefix_of(e.name().as_ref());
                let name = qualified(prefix.as_deref(), "sldIdLst");
                out.start(&name, &[])?;
                write_slide_ids(&mut out, prefix.as_deref(), slides)?;
                out.end(&name)?;
                wrote_list = true;
                out.event(event.clone())?;
            }
            Event::Eof => break,
            other => out.event(other)?,
        }
    }

    if !wrote_list {
        return Err(Error::Template(
            "presentation.xml has no place for a slide list".to_string(),
        ));
    }

    Ok(out.into_inner())
}

/// Drop `removed_id` from a relationships part and append `added`.
fn rewrite_relationships(
    xml: &str,
    removed_id: Option<&str>,
    added: &[Relationship],
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut out = XmlOut::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Xml(format!("Error parsing relationships: {}", e)))?;

        match event {
            Event::Empty(ref e)
                if local_name(e.name().as_ref()) == b"Relationship"
                    && removed_id.is_some()
                    && attribute(e, b"Id").as_deref() == removed_id => {}
            Event::End(ref e) if local_name(e.name().as_ref()) == b"Relationships" => {
                for rel in added {
                    write_relationship(&mut out, rel)?;
                }
                out.event(event.clone())?;
            }
            Event::Eof => break,
            other => out.event(other)?,
        }
    }

    Ok(out.into_inner())
}

/// Drop overrides for removed parts and register the new slides.
fn rewrite_content_types(xml: &str, removed: &[String], added: &[&str]) -> Result<Vec<u8>> {
    let removed: Vec<String> = removed.iter().map(|p| format!("/{}", p)).collect();
    let mut reader = Reader::from_str(xml);
    let mut out = XmlOut::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Xml(format!("Error parsing content types: {}", e)))?;

        match event {
            Event::Empty(ref e)
                if local_name(e.name().as_ref()) == b"Override"
                    && attribute(e, b"PartName").is_some_and(|p| removed.contains(&p)) => {}
            Event::End(ref e) if local_name(e.name().as_ref()) == b"Types" => {
                for part in added {
                    let part_name = format!("/{}", part);
                    let attrs = [("PartName", part_name.as_str()), ("ContentType", CT_SLIDE)];
                    out.empty("Override", &attrs)?;
                }
                out.event(event.clone())?;
            }
            Event::Eof => break,
            other => out.event(other)?,
        }
    }

    Ok(out.into_inner())
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprint_core::FontSize;

    #[test]
    fn test_allocate_slides_after_existing() {
        let rels = vec![
            Relationship {
                id: "rId1".into(),
                rel_type: String::new(),
                target: String::new(),
            },
            Relationship {
                id: "rId7".into(),
                rel_type: String::new(),
                target: String::new(),
            },
        ];
        let parts = vec![
            "ppt/slides/slide1.xml".to_string(),
            "ppt/slides/slide2.xml".to_string(),
            "ppt/slideLayouts/slideLayout12.xml".to_string(),
            "ppt/slides/_rels/slide2.xml.rels".to_string(),
        ];
        let slides = allocate_slides(2, &[256, 300], &rels, &parts);

        assert_eq!(slides[0].id, 301);
        assert_eq!(slides[0].rel_id, "rId8");
        assert_eq!(slides[0].path, "ppt/slides/slide3.xml");
        assert_eq!(slides[1].id, 302);
        assert_eq!(slides[1].path, "ppt/slides/slide4.xml");
    }

    #[test]
    fn test_allocate_slides_empty_template() {
        let slides = allocate_slides(1, &[], &[], &[]);
        assert_eq!(slides[0].id, 256);
        assert_eq!(slides[0].rel_id, "rId1");
        assert_eq!(slides[0].path, "ppt/slides/slide1.xml");
    }

    fn new_slide(id: u32, rel: &str) -> NewSlide {
        NewSlide {
            id,
            rel_id: rel.to_string(),
            path: String::new(),
        }
    }

    #[test]
    fn test_rewrite_presentation_replaces_first_slide() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/></p:sldIdLst><p:sldSz cx="1" cy="1"/></p:presentation>"#;
        let out = rewrite_presentation(xml, Some("rId2"), &[new_slide(258, "rId9")]).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(!out.contains(r#"r:id="rId2""#));
        assert!(out.contains(
            r#"<p:sldIdLst><p:sldId id="257" r:id="rId3"/><p:sldId id="258" r:id="rId9"/></p:sldIdLst>"#
        ));
        let master = r#"<p:sldMasterId id="2147483648" r:id="rId1"/>"#;
        assert!(out.contains(master));
    }

    #[test]
    fn test_rewrite_presentation_creates_missing_list() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldMasterIdLst/><p:sldSz cx="1" cy="1"/></p:presentation>"#;
        let out = rewrite_presentation(xml, None, &[new_slide(256, "rId5")]).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(
            r#"<p:sldIdLst><p:sldId id="256" r:id="rId5"/></p:sldIdLst><p:sldSz"#
        ));
    }

    #[test]
    fn test_rewrite_relationships() {
        let xml = r#"<Relationships xmlns="x"><Relationship Id="rId1" Type="t" Target="a.xml"/><Relationship Id="rId2" Type="t" Target="b.xml"/></Relationships>"#;
        let added = [Relationship {
            id: "rId3".into(),
            rel_type: REL_TYPE_SLIDE.into(),
            target: "slides/slide3.xml".into(),
        }];
        let out = rewrite_relationships(xml, Some("rId1"), &added).unwrap();
        let out = String::from_utf8(out).unwrap();
        let rels = parse_relationships(&out).unwrap();
        let ids: Vec<&str> = rels.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rId2", "rId3"]);
        assert_eq!(rels[1].target, "slides/slide3.xml");
    }

    #[test]
    fn test_rewrite_content_types() {
        let xml = r#"<Types xmlns="x"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/slides/slide1.xml" ContentType="s"/><Override PartName="/ppt/presentation.xml" ContentType="p"/></Types>"#;
        let out = rewrite_content_types(
            xml,
            &["ppt/slides/slide1.xml".to_string()],
            &["ppt/slides/slide2.xml"],
        )
        .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains("/ppt/slides/slide1.xml"));
        assert!(out.contains("/ppt/presentation.xml"));
        let slide_override = format!(
            r#"<Override PartName="/ppt/slides/slide2.xml" ContentType="{}"/>"#,
            CT_SLIDE
        );
        assert!(out.contains(&slide_override));
    }

    #[test]
    fn test_paragraph_markup() {
        let mut xml = XmlOut::new();
        let paragraph = Paragraph::new("Fix <parser> & co")
            .with_level(1)
            .with_size(FontSize::from_points(13.5));
        write_paragraph(&mut xml, &paragraph).unwrap();
        let out = String::from_utf8(xml.into_inner()).unwrap();
        assert_eq!(
            out,
            r#"<a:p><a:pPr lvl="1"/><a:r><a:rPr lang="en-US" sz="1350" dirty="0"/><a:t>Fix &lt;parser&gt; &amp; co</a:t></a:r></a:p>"#
        );
    }

    #[test]
    fn test_blank_paragraph_markup() {
        let mut xml = XmlOut::new();
        write_paragraph(&mut xml, &Paragraph::blank()).unwrap();
        let out = String::from_utf8(xml.into_inner()).unwrap();
        let expected = r#"<a:p><a:endParaRPr lang="en-US" dirty="0"/></a:p>"#;
        assert_eq!(out, expected);
    }

    const CT_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";

    fn layout_xml(with_body: bool) -> String {
        let body = if with_body {
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Content"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#
        } else {
            ""
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>{body}</p:spTree></p:cSld></p:sldLayout>"#
        )
    }

    fn template_slide_xml(text: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        )
    }

    /// A minimal template: one master, two layouts (the second has a body
    /// placeholder), a placeholder slide with notes, and optionally a
    /// second slide that should survive.
    fn template(extra_slide: bool) -> Vec<u8> {
        let mut parts: Vec<(&str, String)> = Vec::new();

        let mut overrides = format!(
            r#"<Override PartName="/ppt/presentation.xml" ContentType="{CT_MAIN}"/><Override PartName="/ppt/slides/slide1.xml" ContentType="{CT_SLIDE}"/><Override PartName="/ppt/notesSlides/notesSlide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml"/>"#
        );
        if extra_slide {
            let slide2 = format!(
                r#"<Override PartName="/ppt/slides/slide2.xml" ContentType="{CT_SLIDE}"/>"#
            );
            overrides.push_str(&slide2);
        }
        parts.push((
            CONTENT_TYPES_PART,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{overrides}</Types>"#
            ),
        ));

        parts.push((
            "_rels/.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{NS_RELS}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
            ),
        ));

        let second_id = if extra_slide {
            r#"<p:sldId id="257" r:id="rId3"/>"#
        } else {
            ""
        };
        parts.push((
            PRESENTATION_PART,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/>{second_id}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
            ),
        ));

        let second_rel = if extra_slide {
            format!(
                r#"<Relationship Id="rId3" Type="{REL_TYPE_SLIDE}" Target="slides/slide2.xml"/>"#
            )
        } else {
            String::new()
        };
        parts.push((
            "ppt/_rels/presentation.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{NS_RELS}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{REL_TYPE_SLIDE}" Target="slides/slide1.xml"/>{second_rel}</Relationships>"#
            ),
        ));

        parts.push((
            "ppt/slideMasters/slideMaster1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree/></p:cSld><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/><p:sldLayoutId id="2147483650" r:id="rId2"/></p:sldLayoutIdLst></p:sldMaster>"#
            ),
        ));
        parts.push((
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{NS_RELS}"><Relationship Id="rId1" Type="{REL_TYPE_LAYOUT}" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{REL_TYPE_LAYOUT}" Target="../slideLayouts/slideLayout2.xml"/></Relationships>"#
            ),
        ));
        parts.push(("ppt/slideLayouts/slideLayout1.xml", layout_xml(false)));
        parts.push(("ppt/slideLayouts/slideLayout2.xml", layout_xml(true)));

        parts.push(("ppt/slides/slide1.xml", template_slide_xml("TEMPLATE")));
        parts.push((
            "ppt/slides/_rels/slide1.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{NS_RELS}"><Relationship Id="rId1" Type="{REL_TYPE_LAYOUT}" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide" Target="../notesSlides/notesSlide1.xml"/></Relationships>"#
            ),
        ));
        parts.push((
            "ppt/notesSlides/notesSlide1.xml",
            format!(r#"<p:notes xmlns:p="{NS_P}"/>"#),
        ));
        parts.push((
            "ppt/notesSlides/_rels/notesSlide1.xml.rels",
            format!(
                r#"<Relationships xmlns="{NS_RELS}"><Relationship Id="rId1" Type="{REL_TYPE_SLIDE}" Target="../slides/slide1.xml"/></Relationships>"#
            ),
        ));

        if extra_slide {
            parts.push(("ppt/slides/slide2.xml", template_slide_xml("Agenda")));
            parts.push((
                "ppt/slides/_rels/slide2.xml.rels",
                format!(
                    r#"<Relationships xmlns="{NS_RELS}"><Relationship Id="rId1" Type="{REL_TYPE_LAYOUT}" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#
                ),
            ));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            zip.start_file(name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn sample_deck() -> Deck {
        let mut work = SlideContent::new("Platform Sprint Work");
        work.push(
            Paragraph::new("Search")
                .with_size(FontSize::from_points(17.5))
                .bold(),
        );
        work.push(
            Paragraph::new("Index docs - Done")
                .with_level(1)
                .with_size(FontSize::from_points(13.5)),
        );
        work.push(Paragraph::blank());

        let mut bugs = SlideContent::new("Bugs");
        bugs.push(Paragraph::new("Bugs (0 closed, 1 open )").bold());
        bugs.push(Paragraph::new("Crash - Open").with_level(1));

        Deck {
            slides: vec![work, bugs],
        }
    }

    fn read_back(bytes: Vec<u8>) -> TemplateReader<Cursor<Vec<u8>>> {
        TemplateReader::new(Cursor::new(bytes)).unwrap()
    }

    /// Render the sample deck onto the layout with a body placeholder.
    fn render_sample(extra_slide: bool) -> TemplateReader<Cursor<Vec<u8>>> {
        let package = Cursor::new(template(extra_slide));
        let bytes = DeckWriter::new()
            .with_layout_index(1)
            .render(package, &sample_deck())
            .unwrap();
        read_back(bytes)
    }

    #[test]
    fn test_render_replaces_template_slide() {
        let mut reader = render_sample(false);

        let slides = reader.slide_texts().unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].title.as_deref(), Some("Platform Sprint Work"));
        assert_eq!(
            slides[0].body_lines(),
            vec!["Search", "Index docs - Done", ""]
        );
        assert_eq!(slides[0].body[1].level, 1);
        assert_eq!(slides[1].title.as_deref(), Some("Bugs"));
        assert_eq!(
            slides[1].body_lines(),
            vec!["Bugs (0 closed, 1 open )", "Crash - Open"]
        );
    }

    #[test]
    fn test_render_drops_template_slide_parts() {
        let mut reader = render_sample(false);

        let names = reader.part_names().unwrap();
        let has = |part: &str| names.iter().any(|n| n == part);
        assert!(!has("ppt/slides/slide1.xml"));
        assert!(!has("ppt/notesSlides/notesSlide1.xml"));
        assert!(has("ppt/slides/slide2.xml"));
        assert!(has("ppt/slides/slide3.xml"));

        let types = reader.read_part(CONTENT_TYPES_PART).unwrap();
        assert!(!types.contains("/ppt/slides/slide1.xml"));
        assert!(!types.contains("notesSlide1"));
        assert!(types.contains("/ppt/slides/slide3.xml"));

        let rels = reader.relationships("ppt/slides/slide2.xml").unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].target, "../slideLayouts/slideLayout2.xml");

        let slides = reader.slides().unwrap();
        let ids: Vec<u32> = slides.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![257, 258]);
    }

    #[test]
    fn test_render_keeps_later_template_slides() {
        let mut reader = render_sample(true);

        let slides = reader.slide_texts().unwrap();
        let titles: Vec<Option<&str>> = slides.iter().map(|s| s.title.as_deref()).collect();
        assert_eq!(
            titles,
            vec![Some("Agenda"), Some("Platform Sprint Work"), Some("Bugs")]
        );

        let slides = reader.slides().unwrap();
        let paths: Vec<&str> = slides.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "ppt/slides/slide2.xml",
                "ppt/slides/slide3.xml",
                "ppt/slides/slide4.xml",
            ]
        );
    }

    #[test]
    fn test_render_uses_layout_placeholders() {
        let mut reader = render_sample(false);

        let phs = reader.placeholders("ppt/slides/slide2.xml").unwrap();
        assert!(phs[0].is_title());
        assert_eq!(phs[1].index(), 1);
    }

    #[test]
    fn test_layout_slot_out_of_range() {
        let writer = DeckWriter::new();
        let err = writer
            .render(Cursor::new(template(false)), &sample_deck())
            .unwrap_err();
        match err {
            Error::Template(msg) => assert!(msg.contains("2 layouts")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_layout_without_body_placeholder() {
        let writer = DeckWriter::new().with_layout_index(0);
        let err = writer
            .render(Cursor::new(template(false)), &sample_deck())
            .unwrap_err();
        match err {
            Error::Template(msg) => assert!(msg.contains("idx=1")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_not_a_zip() {
        let err = DeckWriter::new()
            .render(Cursor::new(b"not a pptx".to_vec()), &sample_deck())
            .unwrap_err();
        assert!(matches!(err, Error::Zip(_)));
    }

    #[test]
    fn test_write_file_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("template.pptx");
        let output = dir.path().join("Sprint.pptx");
        let err = DeckWriter::new()
            .write_file(&missing, &sample_deck(), &output)
            .unwrap_err();
        assert!(matches!(err, Error::Template(_)));
        assert!(!output.exists());
    }
}
