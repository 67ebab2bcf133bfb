//! Derived view over the stored task list.
//!
//! Filter, sort and group are pure functions of the stored records; the
//! stored order is never touched.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" | "done" => Ok(StatusFilter::Completed),
            _ => Err(Error::InvalidArgument(format!(
                "invalid status '{s}' (expected all|active|completed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Due date ascending, undated last
    #[default]
    Date,
    /// High to low
    Priority,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Date => "date",
            SortMode::Priority => "priority",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortMode::Date),
            "priority" => Ok(SortMode::Priority),
            _ => Err(Error::InvalidArgument(format!(
                "invalid sort '{s}' (expected date|priority)"
            ))),
        }
    }
}

/// Roots whose children are shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedSet {
    ids: BTreeSet<TaskId>,
}

impl ExpandedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one root; returns whether it is now expanded.
    pub fn toggle(&mut self, id: TaskId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn insert(&mut self, id: TaskId) {
        self.ids.insert(id);
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<TaskId> for ExpandedSet {
    fn from_iter<I: IntoIterator<Item = TaskId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    pub status: StatusFilter,
    pub search: String,
    pub sort: SortMode,
}

/// One displayed root with its children.
#[derive(Debug, Clone, Serialize)]
pub struct RootRow {
    pub task: Task,
    pub child_count: usize,
    pub expanded: bool,
    /// Empty unless expanded
    pub children: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub roots: Vec<RootRow>,
    /// Incomplete records across the whole store
    pub remaining: usize,
}

fn matches_search(task: &Task, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(needle))
}

/// Root records passing the status filter and search term, in stored order.
pub fn filter_roots<'a>(tasks: &'a [Task], query: &ViewQuery) -> Vec<&'a Task> {
    let needle = query.search.trim().to_lowercase();
    tasks
        .iter()
        .filter(|task| task.is_root())
        .filter(|task| query.status.matches(task))
        .filter(|task| matches_search(task, &needle))
        .collect()
}

fn compare_due(left: &Task, right: &Task) -> Ordering {
    match (left.due_date.as_deref(), right.due_date.as_deref()) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort; ties keep their relative order.
pub fn sort_tasks(tasks: &mut [&Task], mode: SortMode) {
    match mode {
        SortMode::Priority => {
            tasks.sort_by(|left, right| right.priority.weight().cmp(&left.priority.weight()))
        }
        SortMode::Date => tasks.sort_by(|left, right| compare_due(left, right)),
    }
}

/// Run filter, sort and group over the stored list.
pub fn derive_view(tasks: &[Task], query: &ViewQuery, expanded: &ExpandedSet) -> TaskView {
    let mut roots = filter_roots(tasks, query);
    sort_tasks(&mut roots, query.sort);

    let roots = roots
        .into_iter()
        .map(|root| {
            let children: Vec<Task> = tasks
                .iter()
                .filter(|task| task.parent_id == Some(root.id))
                .cloned()
                .collect();
            let is_expanded = expanded.contains(root.id);
            RootRow {
                task: root.clone(),
                child_count: children.len(),
                expanded: is_expanded,
                children: if is_expanded { children } else { Vec::new() },
            }
        })
        .collect();

    TaskView {
        roots,
        remaining: tasks.iter().filter(|task| !task.completed).count(),
    }
}
