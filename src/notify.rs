//! Notification port.
//!
//! The list announces newly created high-priority tasks through a [`Notifier`].
//! [`EventNotifier`] writes each notification as a JSON line to stdout or a
//! file; [`NullNotifier`] drops everything.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::task::{Task, TaskId};

pub const EVENT_SCHEMA_VERSION: &str = "td.event.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Not asked yet
    Default,
    Granted,
    Denied,
}

/// A local notification about a task.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub task_id: TaskId,
}

impl Notification {
    pub fn high_priority(task: &Task) -> Self {
        Self {
            title: "High-priority task added".to_string(),
            body: task.title.clone(),
            task_id: task.id,
        }
    }
}

pub trait Notifier {
    fn permission(&self) -> Permission;

    /// Ask for permission; returns the resulting state.
    fn request_permission(&mut self) -> Permission;

    fn notify(&mut self, notification: &Notification) -> Result<()>;
}

/// Notifier that never shows anything.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Denied
    }

    fn notify(&mut self, _notification: &Notification) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    /// `None` or blank disables events, `-` is stdout, anything else a file.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }
}

#[derive(Debug, Serialize)]
struct Event<'a> {
    schema_version: &'static str,
    event: &'static str,
    timestamp: DateTime<Utc>,
    data: &'a Notification,
}

/// Writes notifications as JSON lines.
///
/// Permission is granted as soon as a destination is configured; the sink is
/// opened on first use.
pub struct EventNotifier {
    destination: EventDestination,
    writer: Option<Box<dyn Write>>,
}

impl EventNotifier {
    pub fn new(destination: EventDestination) -> Self {
        Self {
            destination,
            writer: None,
        }
    }

    fn writer(&mut self) -> Result<&mut Box<dyn Write>> {
        if self.writer.is_none() {
            let writer: Box<dyn Write> = match &self.destination {
                EventDestination::Stdout => Box::new(std::io::stdout()),
                EventDestination::File(path) => Box::new(open_append(path)?),
            };
            self.writer = Some(writer);
        }
        self.writer
            .as_mut()
            .ok_or_else(|| Error::OperationFailed("event sink unavailable".to_string()))
    }
}

fn open_append(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?)
}

impl Notifier for EventNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn notify(&mut self, notification: &Notification) -> Result<()> {
        let event = Event {
            schema_version: EVENT_SCHEMA_VERSION,
            event: "task_notification",
            timestamp: Utc::now(),
            data: notification,
        };
        let serialized = serde_json::to_vec(&event)?;
        let writer = self.writer()?;
        writer.write_all(&serialized)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        debug!(task_id = %notification.task_id, "notification emitted");
        Ok(())
    }
}

/// Build the notifier for an optional destination string.
pub fn notifier_for(raw: Option<&str>) -> Box<dyn Notifier> {
    match EventDestination::parse(raw) {
        Some(destination) => Box::new(EventNotifier::new(destination)),
        None => Box::new(NullNotifier),
    }
}
