//! td - local to-do list library
//!
//! This library provides the core of the `td` CLI: a persisted task list with
//! one level of subtasks, a pure filter/sort/group view, and an AI splitter
//! that proposes subtasks for a task.
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `lock`: File locking and atomic writes
//! - `notify`: Notification port and the JSONL event notifier
//! - `output`: JSON envelopes and human-readable reports
//! - `splitter`: AI task splitter (mock and real modes)
//! - `storage`: Key-value persistence port and the task repository
//! - `task`: Task records and the mutable task list
//! - `view`: Filter, sort, and grouping of the stored list

pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod notify;
pub mod output;
pub mod splitter;
pub mod storage;
pub mod task;
pub mod view;

pub use error::{Error, Result};
