//! Sprint issue classification, epic grouping, and ranking.

use crate::board::{BoardData, EntityId};
use crate::normalize::normalize_text;
use crate::{Epic, Grouping, Issue, Result};
use std::collections::{HashMap, HashSet};

/// Split the current sprint's issues into bugs and epics.
///
/// Issues outside the sprint are ignored. Issues without an epic are bugs.
/// Epics appear in the order their first issue was fetched, and each epic
/// keeps its issues in fetch order. A status or epic id that the board data
/// cannot resolve is an error.
pub fn group_issues(board: &BoardData) -> Result<Grouping> {
    let current = board.current_sprint()?;
    if let Some(ref name) = current.name {
        log::info!("Current sprint: {}", name);
    }
    let sprint: HashSet<&EntityId> = current.issues_ids.iter().collect();

    let mut grouping = Grouping::default();
    let mut epic_index: HashMap<String, usize> = HashMap::new();

    for raw in board.issues.iter().filter(|i| sprint.contains(&i.id)) {
        let summary = normalize_text(&raw.summary);
        let status = normalize_text(board.status_name(raw)?);

        let Some(epic_id) = &raw.epic_id else {
            log::debug!("Issue {} is a bug", raw.id);
            grouping.bugs.push(Issue::new(summary, status, None));
            continue;
        };

        let epic_name = normalize_text(board.epic_name(raw, epic_id)?);
        let idx = match epic_index.get(&epic_name) {
            Some(&idx) => idx,
            None => {
                grouping.epics.push(Epic::new(epic_name.clone()));
                epic_index.insert(epic_name.clone(), grouping.epics.len() - 1);
                grouping.epics.len() - 1
            }
        };
        let issue = Issue::new(summary, status, Some(epic_name));
        grouping.epics[idx].add_issue(issue);
    }

    log::debug!(
        "Grouped {} sprint issues into {} epics and {} bugs",
        grouping.issue_count(),
        grouping.epics.len(),
        grouping.bugs.len()
    );

    Ok(grouping)
}

/// Sort epics by descending issue count.
///
/// The sort is stable, so epics of equal size keep their incoming order.
pub fn rank_epics(epics: &mut [Epic]) {
    epics.sort_by_key(|epic| std::cmp::Reverse(epic.len()));
}
