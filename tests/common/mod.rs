//! Common test utilities for pargolo integration tests.
//!
//! Provides `TestEnv`, an isolated working directory backed by a JSON file
//! store, so tests never reach a real parameter store or read the user's
//! `config.kdl`.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with its own working directory and store file.
///
/// The `pargolo()` method returns a `Command` that points the file backend
/// at `store.json` inside the temp directory, per invocation, making tests
/// parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
}

impl TestEnv {
    /// Create a new environment with an empty store.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new environment whose store holds `(name, value)` String
    /// parameters.
    pub fn with_store(parameters: &[(&str, &str)]) -> Self {
        let env = Self::new();
        env.seed(parameters);
        env
    }

    /// Replace the store contents.
    pub fn seed(&self, parameters: &[(&str, &str)]) {
        let parameters: Vec<Value> = parameters
            .iter()
            .map(|(name, value)| json!({"name": name, "type": "String", "value": value}))
            .collect();
        let doc = json!({ "parameters": parameters });
        fs::write(self.store_path(), serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    }

    /// Get a Command for the pargolo binary using the file backend.
    pub fn pargolo(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pargolo"));
        cmd.current_dir(self.path());
        cmd.env("PARGOLO_BACKEND", "file");
        cmd.env("PARGOLO_STORE_FILE", self.store_path());
        cmd.env("PARGOLO_CONFIG", self.path().join("no-such-config.kdl"));
        for var in [
            "PARGOLO_REGION",
            "PARGOLO_ENDPOINT",
            "PARGOLO_LOG",
            "AWS_REGION",
            "AWS_ACCESS_KEY_ID",
            "AWS_SECRET_ACCESS_KEY",
            "AWS_SESSION_TOKEN",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Write a file relative to the working directory.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Current store contents as `(name, value)` pairs, sorted by name.
    pub fn stored(&self) -> Vec<(String, String)> {
        let content = match fs::read_to_string(self.store_path()) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        let doc: Value = serde_json::from_str(&content).unwrap();
        let mut pairs: Vec<(String, String)> = doc["parameters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| {
                (
                    p["name"].as_str().unwrap().to_string(),
                    p["value"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        pairs.sort();
        pairs
    }

    /// Value stored under `name`, if any.
    pub fn stored_value(&self, name: &str) -> Option<String> {
        self.stored()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.path().join("store.json")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}
