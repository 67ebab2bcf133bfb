//! td command implementations.

use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::config::{default_data_dir, Config};
use crate::error::{Error, Result};
use crate::notify::{notifier_for, EventDestination};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::splitter::{Expander, GeminiSplitter, SplitMode};
use crate::storage::{FileStore, TaskRepository};
use crate::task::{Category, Priority, Task, TaskDraft, TaskId, TaskList};
use crate::view::{derive_view, ExpandedSet, SortMode, StatusFilter, TaskView, ViewQuery};

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub parent: Option<String>,
    pub events: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub expand: Vec<String>,
    pub expand_all: bool,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ToggleOptions {
    pub id: String,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct RmOptions {
    pub id: String,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ClearOptions {
    pub yes: bool,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct SplitOptions {
    pub id: String,
    pub mode: Option<String>,
    pub api_key: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

struct TaskContext {
    list: TaskList<FileStore>,
    config: Config,
    /// Notifications go to stdout, so regular output is suppressed
    events_to_stdout: bool,
}

#[derive(Serialize)]
struct AddOutput {
    added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<Task>,
}

#[derive(Serialize)]
struct ListOutput {
    status: StatusFilter,
    sort: SortMode,
    #[serde(skip_serializing_if = "String::is_empty")]
    search: String,
    #[serde(flatten)]
    view: TaskView,
}

#[derive(Serialize)]
struct ToggleOutput {
    id: TaskId,
    completed: bool,
}

#[derive(Serialize)]
struct RemovedOutput {
    count: usize,
    removed: Vec<TaskId>,
}

#[derive(Serialize)]
struct ClearOutput {
    confirmed: bool,
    count: usize,
    removed: Vec<TaskId>,
}

#[derive(Serialize)]
struct SplitOutput {
    parent: TaskId,
    mode: SplitMode,
    subtasks: Vec<Task>,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config, options.events.as_deref())?;

    let parent_id = options
        .parent
        .as_deref()
        .map(str::parse::<TaskId>)
        .transpose()?;
    let category = match options.category.as_deref() {
        Some(value) => value.parse::<Category>()?,
        None => ctx.config.defaults.category()?,
    };
    let priority = match options.priority.as_deref() {
        Some(value) => value.parse::<Priority>()?,
        None => ctx.config.defaults.priority()?,
    };

    let draft = TaskDraft {
        title: options.title,
        description: options.description,
        category,
        priority,
        due_date: options.due,
        parent_id,
    };
    let added = ctx.list.add(draft)?;

    let mut human = match &added {
        Some(task) => {
            let mut human = HumanOutput::new("Task added");
            human.push_summary("ID", task.id.to_string());
            human.push_summary("Title", task.title.clone());
            human.push_summary("Category", task.category.as_str());
            human.push_summary("Priority", task.priority.as_str());
            if let Some(due) = &task.due_date {
                human.push_summary("Due", due.clone());
            }
            if let Some(parent) = task.parent_id {
                human.push_summary("Parent", parent.to_string());
            } else {
                human.push_next_step(format!("td split {}", task.id));
            }
            human
        }
        None => HumanOutput::new("Nothing added (empty title)"),
    };
    human.push_summary("Remaining", ctx.list.remaining().to_string());

    let output = AddOutput {
        added: added.is_some(),
        task: added,
    };
    emit_success(output_options(&ctx, options.json, options.quiet), "add", &output, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config, None)?;

    let query = ViewQuery {
        status: match options.status.as_deref() {
            Some(value) => value.parse::<StatusFilter>()?,
            None => ctx.config.view.status()?,
        },
        search: options.search.unwrap_or_default(),
        sort: match options.sort.as_deref() {
            Some(value) => value.parse::<SortMode>()?,
            None => ctx.config.view.sort()?,
        },
    };

    let tasks = ctx.list.tasks();
    let expanded: ExpandedSet = if options.expand_all {
        tasks
            .iter()
            .filter(|task| task.is_root())
            .map(|task| task.id)
            .collect()
    } else {
        options
            .expand
            .iter()
            .map(|raw| raw.parse::<TaskId>())
            .collect::<Result<ExpandedSet>>()?
    };

    let view = derive_view(tasks, &query, &expanded);
    let human = render_view(&view, &query);
    let output = ListOutput {
        status: query.status,
        sort: query.sort,
        search: query.search.trim().to_string(),
        view,
    };
    emit_success(output_options(&ctx, options.json, options.quiet), "list", &output, Some(&human))
}

pub fn run_toggle(options: ToggleOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config, None)?;
    let id: TaskId = options.id.parse()?;

    if !ctx.list.toggle_completed(id)? {
        return Err(Error::TaskNotFound(id));
    }
    let completed = ctx.list.get(id).is_some_and(|task| task.completed);

    let mut human = HumanOutput::new(if completed {
        "Task completed"
    } else {
        "Task reopened"
    });
    human.push_summary("ID", id.to_string());
    human.push_summary("Remaining", ctx.list.remaining().to_string());

    let output = ToggleOutput { id, completed };
    emit_success(output_options(&ctx, options.json, options.quiet), "toggle", &output, Some(&human))
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config, None)?;
    let id: TaskId = options.id.parse()?;

    let removed = ctx.list.delete(id)?;
    if removed.is_empty() {
        return Err(Error::TaskNotFound(id));
    }

    let mut human = HumanOutput::new("Task deleted");
    for task in &removed {
        human.push_detail(task_line(task));
    }
    human.push_summary("Removed", removed.len().to_string());

    let output = RemovedOutput {
        count: removed.len(),
        removed: removed.iter().map(|task| task.id).collect(),
    };
    emit_success(output_options(&ctx, options.json, options.quiet), "rm", &output, Some(&human))
}

pub fn run_clear(options: ClearOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config, None)?;
    let pending = ctx.list.completed_for_clear();

    let confirmed = if pending.is_empty() || options.yes {
        true
    } else if options.json {
        return Err(Error::InvalidArgument(
            "clear needs --yes when used with --json".to_string(),
        ));
    } else {
        confirm(&format!("Remove {} completed task(s)?", pending.len()))?
    };

    let removed = if confirmed {
        ctx.list.clear_completed()?
    } else {
        Vec::new()
    };

    let mut human = if !confirmed {
        HumanOutput::new("Cancelled")
    } else if removed.is_empty() {
        HumanOutput::new("No completed tasks")
    } else {
        HumanOutput::new("Completed tasks cleared")
    };
    for task in &removed {
        human.push_detail(task_line(task));
    }
    human.push_summary("Removed", removed.len().to_string());
    human.push_summary("Remaining", ctx.list.remaining().to_string());

    let output = ClearOutput {
        confirmed,
        count: removed.len(),
        removed: removed.iter().map(|task| task.id).collect(),
    };
    emit_success(output_options(&ctx, options.json, options.quiet), "clear", &output, Some(&human))
}

pub fn run_split(options: SplitOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config, None)?;
    let id: TaskId = options.id.parse()?;
    let mode = match options.mode.as_deref() {
        Some(value) => value.parse::<SplitMode>()?,
        None => ctx.config.ai.mode()?,
    };
    let credential = options
        .api_key
        .or_else(|| ctx.config.ai.credential_from_env())
        .unwrap_or_default();

    let mut expander = Expander::new(GeminiSplitter::from_config(&ctx.config.ai));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let subtasks =
        runtime.block_on(ctx.list.expand_with_ai(id, &credential, mode, &mut expander))?;
    if let Some(err) = expander.error() {
        return Err(Error::Split(err));
    }

    let mut human = HumanOutput::new(format!("Split task {id}"));
    human.push_summary("Mode", mode.as_str());
    human.push_summary("Subtasks", subtasks.len().to_string());
    for task in &subtasks {
        human.push_detail(task_line(task));
    }
    if subtasks.is_empty() {
        human.push_warning("the splitter returned no subtasks");
    } else {
        human.push_next_step(format!("td list --expand {id}"));
    }

    let output = SplitOutput {
        parent: id,
        mode,
        subtasks,
    };
    emit_success(output_options(&ctx, options.json, options.quiet), "split", &output, Some(&human))
}

fn load_context(
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    events: Option<&str>,
) -> Result<TaskContext> {
    let config = Config::resolve(config.as_deref())?;
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    debug!(data_dir = %data_dir.display(), "opening task store");

    let events = events
        .map(str::to_string)
        .unwrap_or_else(|| config.notify.events.clone());
    let events_to_stdout =
        EventDestination::parse(Some(events.as_str())) == Some(EventDestination::Stdout);

    let list = TaskList::new(TaskRepository::new(FileStore::new(data_dir)))
        .with_notifier(notifier_for(Some(events.as_str())));

    Ok(TaskContext {
        list,
        config,
        events_to_stdout,
    })
}

fn output_options(ctx: &TaskContext, json: bool, quiet: bool) -> OutputOptions {
    OutputOptions {
        json: json && !ctx.events_to_stdout,
        quiet: quiet || ctx.events_to_stdout,
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!(
        "{mark} {} {} ({}, {}",
        task.id, task.title, task.priority, task.category
    );
    if let Some(due) = &task.due_date {
        line.push_str(&format!(", due {due}"));
    }
    line.push(')');
    line
}

fn render_view(view: &TaskView, query: &ViewQuery) -> HumanOutput {
    let mut human = HumanOutput::new(format!("{} task(s)", view.roots.len()));
    human.push_summary("Status", query.status.as_str());
    human.push_summary("Sort", query.sort.as_str());
    if !query.search.trim().is_empty() {
        human.push_summary("Search", query.search.trim().to_string());
    }
    human.push_summary("Remaining", format!("{} task(s) remaining", view.remaining));

    for row in &view.roots {
        let mut line = task_line(&row.task);
        if row.child_count > 0 {
            let state = if row.expanded { "shown" } else { "hidden" };
            line.push_str(&format!(" [{} subtask(s), {state}]", row.child_count));
        }
        human.push_detail(line);
        if let Some(description) = &row.task.description {
            human.push_detail(format!("      {description}"));
        }
        for child in &row.children {
            human.push_detail(format!("    {}", task_line(child)));
        }
    }

    if view.roots.is_empty() {
        human.push_next_step("td add <title>");
    } else if view.roots.iter().any(|row| row.child_count > 0 && !row.expanded) {
        human.push_next_step("td list --expand-all");
    }
    human
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64, title: &str) -> Task {
        Task {
            id: TaskId(id),
            title: title.to_string(),
            description: None,
            completed: false,
            category: Category::Health,
            priority: Priority::High,
            due_date: None,
            parent_id: None,
        }
    }

    #[test]
    fn task_line_marks_completion_and_due_date() {
        let open = task(1, "Run");
        assert_eq!(task_line(&open), "[ ] 1 Run (high, health)");

        let done = Task {
            completed: true,
            due_date: Some("2024-02-03".to_string()),
            ..task(2, "Swim")
        };
        assert_eq!(task_line(&done), "[x] 2 Swim (high, health, due 2024-02-03)");
    }

    #[test]
    fn render_view_suggests_expand_for_hidden_children() {
        let tasks = vec![
            task(1, "Parent"),
            Task {
                parent_id: Some(TaskId(1)),
                ..task(2, "Child")
            },
        ];
        let query = ViewQuery::default();
        let view = derive_view(&tasks, &query, &ExpandedSet::new());
        let text = crate::output::format_human(&render_view(&view, &query));

        assert!(text.contains("[1 subtask(s), hidden]"));
        assert!(text.contains("2 task(s) remaining"));
        assert!(text.contains("td list --expand-all"));
        assert!(!text.contains("Child"));
    }
}
