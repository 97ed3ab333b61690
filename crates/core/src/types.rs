//! Domain types for sprint issues and the slide deck built from them.

use std::fmt;

/// A sprint issue after its status and epic have been resolved to names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Issue summary line.
    pub summary: String,

    /// Human-readable status name.
    pub status: String,

    /// Name of the owning epic. `None` for bugs.
    pub epic: Option<String>,
}

impl Issue {
    /// Create a new issue.
    pub fn new(
        summary: impl Into<String>,
        status: impl Into<String>,
        epic: Option<String>,
    ) -> Self {
        Self {
            summary: summary.into(),
            status: status.into(),
            epic,
        }
    }

    /// An issue with no epic is reported as a bug.
    pub fn is_bug(&self) -> bool {
        self.epic.is_none()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.summary, self.status)
    }
}

/// A named group of issues, in the order they were fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epic {
    pub name: String,
    pub issues: Vec<Issue>,
}

impl Epic {
    /// Create an empty epic.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issues: Vec::new(),
        }
    }

    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Number of issues, used as the ranking and pagination weight.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Sprint issues split into bugs and epics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    /// Issues without an epic, in fetch order.
    pub bugs: Vec<Issue>,

    /// Epics in order of first appearance.
    pub epics: Vec<Epic>,
}

impl Grouping {
    /// Total number of issues across bugs and epics.
    pub fn issue_count(&self) -> usize {
        self.bugs.len() + self.epics.iter().map(Epic::len).sum::<usize>()
    }
}

/// Font size in hundredths of a point, as stored in DrawingML `sz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSize(u32);

impl FontSize {
    /// Font size from a point value such as `17.5`.
    pub fn from_points(points: f64) -> Self {
        Self((points * 100.0).round() as u32)
    }

    /// Hundredths of a point.
    pub fn hundredths(self) -> u32 {
        self.0
    }
}

/// A single paragraph of body text on a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,

    /// Indentation level (0 for top-level).
    pub level: u8,

    /// Explicit font size. `None` inherits from the layout.
    pub size: Option<FontSize>,

    pub bold: bool,
}

impl Paragraph {
    /// Plain top-level paragraph with inherited formatting.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: 0,
            size: None,
            bold: false,
        }
    }

    /// Empty spacer paragraph.
    pub fn blank() -> Self {
        Self::new("")
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn with_size(mut self, size: FontSize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Content for one generated slide: a title and its body paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideContent {
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
}

impl SlideContent {
    /// Create a slide with the given title and no body text.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            paragraphs: Vec::new(),
        }
    }

    pub fn push(&mut self, paragraph: Paragraph) {
        self.paragraphs.push(paragraph);
    }

    /// Body text lines, flattened.
    pub fn lines(&self) -> Vec<&str> {
        self.paragraphs.iter().map(|p| p.text.as_str()).collect()
    }
}

/// The full set of slides to append to the template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    pub slides: Vec<SlideContent>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_slide(&mut self, slide: SlideContent) {
        self.slides.push(slide);
    }
}
