//! Task records and the in-memory task list.
//!
//! The list is loaded lazily from a [`TaskRepository`] on first access and the
//! full list is written back after every mutation.

use std::collections::HashSet;
use std::fmt;
use std::iter;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::notify::{Notification, Notifier, Permission};
use crate::splitter::{Expander, SplitMode, SubtaskDraft, TaskSplitter};
use crate::storage::{KeyValueStore, TaskRepository};

/// Unique task identifier, derived from the creation time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| Error::InvalidArgument(format!("invalid task id '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Category {
    #[default]
    Work,
    Study,
    Life,
    Health,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Study,
        Category::Life,
        Category::Health,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Study => "study",
            Category::Life => "life",
            Category::Health => "health",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "invalid category '{s}' (expected work|study|life|health|other)"
                ))
            })
    }
}

// Persisted blobs from older builds may carry categories this build does not
// know about; those read as `Other` instead of poisoning the whole list.
impl From<String> for Category {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(Category::Other)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort weight; higher sorts first.
    pub fn weight(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(Error::InvalidArgument(format!(
                "invalid priority '{s}' (expected high|medium|low)"
            ))),
        }
    }
}

/// One to-do item.
///
/// Every field except `id` and `title` has a default so records written by
/// older builds load with the missing fields filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(alias = "text")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
}

impl Task {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Input for [`TaskList::add`].
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Option<String>,
    pub parent_id: Option<TaskId>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Validate a `YYYY-MM-DD` due date and return it in canonical form.
pub fn normalize_due_date(value: &str) -> Result<String> {
    let trimmed = value.trim();
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|err| {
        Error::InvalidArgument(format!("invalid due date '{value}' (expected YYYY-MM-DD): {err}"))
    })?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Ordered task list bound to a persistence port.
pub struct TaskList<S: KeyValueStore> {
    repository: TaskRepository<S>,
    tasks: Option<Vec<Task>>,
    notifier: Option<Box<dyn Notifier>>,
    permission_requested: bool,
}

impl<S: KeyValueStore> TaskList<S> {
    pub fn new(repository: TaskRepository<S>) -> Self {
        Self {
            repository,
            tasks: None,
            notifier: None,
            permission_requested: false,
        }
    }

    /// Attach a notification port used for high-priority tasks.
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn repository(&self) -> &TaskRepository<S> {
        &self.repository
    }

    /// All records in insertion order, loading them on first access.
    pub fn tasks(&mut self) -> &[Task] {
        self.loaded()
    }

    pub fn get(&mut self, id: TaskId) -> Option<&Task> {
        self.loaded().iter().find(|task| task.id == id)
    }

    /// Direct children of `parent`, in stored order.
    pub fn children_of(&mut self, parent: TaskId) -> Vec<Task> {
        self.loaded()
            .iter()
            .filter(|task| task.parent_id == Some(parent))
            .cloned()
            .collect()
    }

    /// Add a task built from `draft`.
    ///
    /// Blank titles are ignored: returns `Ok(None)` and nothing is written.
    pub fn add(&mut self, draft: TaskDraft) -> Result<Option<Task>> {
        let title = draft.title.trim();
        if title.is_empty() {
            debug!("ignoring task with empty title");
            return Ok(None);
        }

        if let Some(parent_id) = draft.parent_id {
            self.require_root(parent_id)?;
        }

        let due_date = match draft.due_date.as_deref() {
            Some(value) if !value.trim().is_empty() => Some(normalize_due_date(value)?),
            _ => None,
        };
        let description = draft
            .description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let task = Task {
            id: self.next_id(),
            title: title.to_string(),
            description,
            completed: false,
            category: draft.category,
            priority: draft.priority,
            due_date,
            parent_id: draft.parent_id,
        };

        self.loaded_mut().push(task.clone());
        self.persist()?;
        info!(task_id = %task.id, priority = %task.priority, "task added");

        if task.priority == Priority::High {
            self.announce(&task);
        }

        Ok(Some(task))
    }

    /// Flip `completed` on the matching record.
    ///
    /// Returns `false` without writing when the id is absent.
    pub fn toggle_completed(&mut self, id: TaskId) -> Result<bool> {
        let Some(task) = self.loaded_mut().iter_mut().find(|task| task.id == id) else {
            return Ok(false);
        };
        task.completed = !task.completed;
        let completed = task.completed;
        self.persist()?;
        debug!(task_id = %id, completed, "task toggled");
        Ok(true)
    }

    /// Remove a record and its direct children.
    ///
    /// Returns the removed records; empty when the id is absent.
    pub fn delete(&mut self, id: TaskId) -> Result<Vec<Task>> {
        if !self.loaded().iter().any(|task| task.id == id) {
            return Ok(Vec::new());
        }

        let (removed, kept): (Vec<Task>, Vec<Task>) = self
            .loaded_mut()
            .drain(..)
            .partition(|task| task.id == id || task.parent_id == Some(id));
        *self.loaded_mut() = kept;
        self.persist()?;
        info!(task_id = %id, removed = removed.len(), "task deleted");
        Ok(removed)
    }

    /// Records that [`TaskList::clear_completed`] would remove.
    pub fn completed_for_clear(&mut self) -> Vec<Task> {
        let tasks = self.loaded();
        tasks
            .iter()
            .filter(|task| {
                task.completed
                    || task.parent_id.is_some_and(|parent| {
                        tasks.iter().any(|other| other.id == parent && other.completed)
                    })
            })
            .cloned()
            .collect()
    }

    /// Remove every completed record, along with children of removed parents.
    pub fn clear_completed(&mut self) -> Result<Vec<Task>> {
        let doomed: Vec<TaskId> = self
            .completed_for_clear()
            .iter()
            .map(|task| task.id)
            .collect();
        if doomed.is_empty() {
            return Ok(Vec::new());
        }

        let (removed, kept): (Vec<Task>, Vec<Task>) = self
            .loaded_mut()
            .drain(..)
            .partition(|task| doomed.contains(&task.id));
        *self.loaded_mut() = kept;
        self.persist()?;
        info!(removed = removed.len(), "completed tasks cleared");
        Ok(removed)
    }

    /// Number of records not yet completed.
    pub fn remaining(&mut self) -> usize {
        self.loaded().iter().filter(|task| !task.completed).count()
    }

    /// Split a root task into subtasks via the AI collaborator.
    ///
    /// New children are inserted directly after the parent. On an empty or
    /// failed split the list is left untouched and `Ok(vec![])` is returned;
    /// the failure is available from `expander.error()`.
    pub async fn expand_with_ai<T: TaskSplitter>(
        &mut self,
        parent_id: TaskId,
        credential: &str,
        mode: SplitMode,
        expander: &mut Expander<T>,
    ) -> Result<Vec<Task>> {
        let parent = self.require_root(parent_id)?.clone();

        let drafts = expander.run(&parent.title, credential, mode).await;
        if drafts.is_empty() {
            debug!(task_id = %parent_id, "split produced no subtasks");
            return Ok(Vec::new());
        }

        let children = self.build_children(&parent, drafts);
        let tasks = self.loaded_mut();
        let insert_at = tasks
            .iter()
            .position(|task| task.id == parent_id)
            .map(|pos| pos + 1)
            .unwrap_or(tasks.len());
        tasks.splice(insert_at..insert_at, children.iter().cloned());
        self.persist()?;
        info!(task_id = %parent_id, added = children.len(), "task split into subtasks");

        Ok(children)
    }

    fn build_children(&mut self, parent: &Task, drafts: Vec<SubtaskDraft>) -> Vec<Task> {
        let ids: Vec<TaskId> = self.fresh_ids().take(drafts.len()).collect();
        drafts
            .into_iter()
            .zip(ids)
            .map(|(draft, id)| {
                let description = Some(draft.description.trim().to_string())
                    .filter(|value| !value.is_empty());
                Task {
                    id,
                    title: draft.title.trim().to_string(),
                    description,
                    completed: false,
                    category: parent.category,
                    priority: parent.priority,
                    due_date: None,
                    parent_id: Some(parent.id),
                }
            })
            .collect()
    }

    fn require_root(&mut self, id: TaskId) -> Result<&Task> {
        let task = self
            .loaded()
            .iter()
            .find(|task| task.id == id)
            .ok_or(Error::TaskNotFound(id))?;
        if !task.is_root() {
            return Err(Error::InvalidArgument(format!(
                "task {id} is already a subtask; only top-level tasks can have subtasks"
            )));
        }
        Ok(task)
    }

    fn next_id(&mut self) -> TaskId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.fresh_ids().next().unwrap_or(TaskId(now))
    }

    /// Unused ids, ascending from `max(now, largest id + 1)`.
    ///
    /// When the largest id is `u64::MAX` the walk starts at `now` and skips
    /// ids already taken.
    fn fresh_ids(&mut self) -> impl Iterator<Item = TaskId> {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let used: HashSet<u64> = self.loaded().iter().map(|task| task.id.0).collect();
        let start = match used.iter().max() {
            Some(max) => max.checked_add(1).map_or(now, |after| now.max(after)),
            None => now,
        };
        iter::successors(Some(start), |id| Some(id.wrapping_add(1)))
            .filter(move |id| !used.contains(id))
            .map(TaskId)
    }

    fn announce(&mut self, task: &Task) {
        let Some(notifier) = self.notifier.as_mut() else {
            return;
        };

        if !self.permission_requested && notifier.permission() != Permission::Granted {
            self.permission_requested = true;
            let permission = notifier.request_permission();
            debug!(?permission, "notification permission requested");
        }
        if notifier.permission() != Permission::Granted {
            return;
        }

        let notification = Notification::high_priority(task);
        if let Err(err) = notifier.notify(&notification) {
            warn!(task_id = %task.id, "notification failed: {err}");
        }
    }

    fn loaded(&mut self) -> &Vec<Task> {
        self.loaded_mut()
    }

    fn loaded_mut(&mut self) -> &mut Vec<Task> {
        let repository = &self.repository;
        self.tasks.get_or_insert_with(|| repository.load())
    }

    fn persist(&self) -> Result<()> {
        match self.tasks.as_deref() {
            Some(tasks) => self.repository.save(tasks),
            None => Ok(()),
        }
    }
}
