//! Packing ranked epics and bugs into slides.
//!
//! Epics are placed greedily in a single pass. A slide holds at most
//! [`MAX_ISSUES_PER_SLIDE`] issues, and once it already holds more than
//! [`CROWDED_EPIC_COUNT`] epics it only takes another epic while the total
//! stays within [`CROWDED_MAX_ISSUES`]. The first epic on a slide is always
//! accepted, however large. Bugs always get one slide of their own, last.

use crate::normalize::normalize_text;
use crate::{Deck, Epic, FontSize, Issue, Paragraph, SlideContent};

/// Issue capacity of one work slide.
pub const MAX_ISSUES_PER_SLIDE: usize = 10;

/// Epic count above which a slide is considered crowded.
pub const CROWDED_EPIC_COUNT: usize = 2;

/// Issue capacity once a slide is crowded.
pub const CROWDED_MAX_ISSUES: usize = 5;

/// Title of the bugs slide.
pub const BUGS_TITLE: &str = "Bugs";

/// Header paragraph size in points.
const HEADER_POINTS: f64 = 17.5;

/// Issue paragraph size in points.
const ISSUE_POINTS: f64 = 13.5;

/// Builds the slide deck for one sprint.
#[derive(Debug, Clone)]
pub struct DeckBuilder {
    team_name: String,
    exclude_backlog: bool,
    backlog_status: String,
    done_status: String,
}

impl DeckBuilder {
    /// Create a builder for the given team with default status labels.
    pub fn new(team_name: &str) -> Self {
        Self {
            team_name: normalize_text(team_name),
            exclude_backlog: false,
            backlog_status: "Backlog".to_string(),
            done_status: "Done".to_string(),
        }
    }

    /// Hide issues in the backlog status from epic blocks.
    pub fn with_exclude_backlog(mut self, exclude: bool) -> Self {
        self.exclude_backlog = exclude;
        self
    }

    /// Status label treated as backlog.
    pub fn with_backlog_status(mut self, status: impl Into<String>) -> Self {
        self.backlog_status = status.into();
        self
    }

    /// Status label treated as closed when counting bugs.
    pub fn with_done_status(mut self, status: impl Into<String>) -> Self {
        self.done_status = status.into();
        self
    }

    /// Title of every work slide.
    pub fn work_title(&self) -> String {
        format!("{} Sprint Work", self.team_name)
    }

    /// Build the deck from epics already in ranked order, followed by the bugs slide.
    pub fn build(&self, ranked_epics: &[Epic], bugs: &[Issue]) -> Deck {
        let mut deck = Deck::new();
        for group in paginate(ranked_epics) {
            let mut slide = SlideContent::new(self.work_title());
            for epic in group {
                self.push_epic(&mut slide, epic);
            }
            deck.add_slide(slide);
        }
        deck.add_slide(self.bugs_slide(bugs));
        deck
    }

    /// Header, one line per visible issue, then a blank spacer.
    fn push_epic(&self, slide: &mut SlideContent, epic: &Epic) {
        slide.push(header(&epic.name));
        for issue in &epic.issues {
            if self.exclude_backlog && issue.status == self.backlog_status {
                continue;
            }
            slide.push(issue_line(issue));
        }
        slide.push(Paragraph::blank());
    }

    fn bugs_slide(&self, bugs: &[Issue]) -> SlideContent {
        let mut slide = SlideContent::new(BUGS_TITLE);
        slide.push(header(&self.bug_title(bugs)));
        for bug in bugs {
            slide.push(issue_line(bug));
        }
        slide
    }

    /// Number of bugs in the done status.
    pub fn closed_bugs(&self, bugs: &[Issue]) -> usize {
        bugs.iter().filter(|b| b.status == self.done_status).count()
    }

    /// Summary heading for the bugs slide, e.g. `Bugs (3 closed, 2 open )`.
    pub fn bug_title(&self, bugs: &[Issue]) -> String {
        let closed = self.closed_bugs(bugs);
        format!(
            "{} ({} closed, {} open )",
            BUGS_TITLE,
            closed,
            bugs.len() - closed
        )
    }
}

fn header(text: &str) -> Paragraph {
    Paragraph::new(text)
        .with_size(FontSize::from_points(HEADER_POINTS))
        .bold()
}

fn issue_line(issue: &Issue) -> Paragraph {
    Paragraph::new(issue.to_string())
        .with_level(1)
        .with_size(FontSize::from_points(ISSUE_POINTS))
}

/// Whether an epic of `next` issues must start a new slide.
///
/// Never true for an empty slide, so an oversized epic does not leave a
/// blank slide behind it.
fn needs_new_slide(total_issues: usize, total_epics: usize, next: usize) -> bool {
    if total_epics == 0 {
        return false;
    }
    total_issues + next > MAX_ISSUES_PER_SLIDE
        || (total_epics > CROWDED_EPIC_COUNT && total_issues + next > CROWDED_MAX_ISSUES)
}

/// Group ranked epics into slides.
///
/// Always returns at least one (possibly empty) group. Sizing uses each
/// epic's full issue count.
pub fn paginate(ranked_epics: &[Epic]) -> Vec<Vec<&Epic>> {
    let mut slides: Vec<Vec<&Epic>> = vec![Vec::new()];
    let mut total_issues = 0;
    let mut total_epics = 0;

    for epic in ranked_epics {
        if needs_new_slide(total_issues, total_epics, epic.len()) {
            slides.push(Vec::new());
            total_issues = 0;
            total_epics = 0;
        }

        if let Some(current) = slides.last_mut() {
            current.push(epic);
        }
        total_issues += epic.len();
        total_epics += 1;
    }

    slides
}
