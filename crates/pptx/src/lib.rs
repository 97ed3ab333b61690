//! PPTX (OOXML) backend for sprint deck generation.
//!
//! Reads a template package and writes generated slides into a copy of it.
//! PPTX files are ZIP archives containing XML documents.

pub mod reader;
pub mod writer;

pub use reader::{SlideText, TemplateReader, TextLine};
pub use writer::DeckWriter;
