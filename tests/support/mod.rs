#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Isolated data dir + config for one test.
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    /// Fresh home whose config disables the mock splitter delay.
    pub fn new() -> Self {
        let home = Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        };
        home.write_config("[ai]\nmock_delay_ms = 0\n")
            .expect("write config");
        home
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir().join("td-tasks.json")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.config_path();
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_tasks(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.tasks_path();
        fs::create_dir_all(self.data_dir())?;
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_tasks(&self) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(self.tasks_path())?;
        let value: Value = serde_json::from_str(&contents)?;
        Ok(value.as_array().cloned().unwrap_or_default())
    }

    pub fn td(&self) -> Command {
        let mut cmd = td_cmd();
        cmd.env("TD_DATA_DIR", self.data_dir())
            .env("TD_CONFIG", self.config_path());
        cmd
    }

    /// Run with `--json` and return the parsed envelope.
    pub fn td_json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self.td().arg("--json").args(args).output()?;
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Add a task and return its id.
    pub fn add(&self, args: &[&str]) -> Result<u64, Box<dyn std::error::Error>> {
        let mut full = vec!["add"];
        full.extend_from_slice(args);
        let value = self.td_json(&full)?;
        value["data"]["task"]["id"]
            .as_u64()
            .ok_or_else(|| format!("no task id in {value}").into())
    }
}

pub fn td_cmd() -> Command {
    let mut cmd = Command::cargo_bin("td").expect("binary");
    cmd.env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG")
        .env_remove("TD_DATA_DIR")
        .env_remove("TD_CONFIG");
    cmd
}
