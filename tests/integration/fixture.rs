use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use serde_json::Value;
use tempfile::TempDir;

/// Assert command succeeded
#[macro_export]
macro_rules! assert_command_success {
    ($output:expr) => {
        assert!(
            $output.success,
            "Command failed with exit code {}\nstdout: {}\nstderr: {}",
            $output.exit_code, $output.stdout, $output.stderr
        );
    };
}

/// Assert a robot-mode error with the given code
#[macro_export]
macro_rules! assert_error_code {
    ($output:expr, $code:expr) => {{
        assert!(!$output.success, "expected failure, got: {}", $output.stdout);
        let json = $output.json();
        assert_eq!(json["status"], "error", "stdout: {}", $output.stdout);
        assert_eq!(json["error"]["code"], $code, "stdout: {}", $output.stdout);
    }};
}

/// Isolated data directory driven through the binary
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    test_name: String,
    start_time: Instant,
}

impl TestFixture {
    pub fn new(test_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        println!("[FIXTURE] Test: {test_name} Root: {root:?}");
        Self {
            temp_dir,
            root,
            test_name: test_name.to_string(),
            start_time: Instant::now(),
        }
    }

    /// Fresh fixture with config, sample catalog and database.
    pub fn initialized(test_name: &str) -> Self {
        let fixture = Self::new(test_name);
        let init = fixture.run(&["--robot", "init"]);
        assert_command_success!(init);
        fixture
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, body).expect("Failed to write fixture file");
        path
    }

    pub fn run(&self, args: &[&str]) -> CommandOutput {
        let start = Instant::now();
        println!("[CMD] skillpay {}", args.join(" "));
        let output = Command::new(env!("CARGO_BIN_EXE_skillpay"))
            .args(args)
            .env("HOME", &self.root)
            .env("XDG_CONFIG_HOME", self.root.join(".config"))
            .env("SKILLPAY_ROOT", &self.root)
            .env_remove("SKILLPAY_CONFIG")
            .env_remove("SKILLPAY_ROBOT")
            .env_remove("RUST_LOG")
            .current_dir(&self.root)
            .output()
            .expect("Failed to execute skillpay");

        let result = CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            elapsed: start.elapsed(),
        };
        println!("[CMD] Exit code: {} ({:?})", result.exit_code, result.elapsed);
        if !result.stdout.is_empty() {
            println!("[STDOUT]\n{}", result.stdout);
        }
        result
    }

    /// Run in robot mode and require success.
    pub fn robot(&self, args: &[&str]) -> Value {
        let mut full = vec!["--robot"];
        full.extend_from_slice(args);
        let output = self.run(&full);
        assert_command_success!(output);
        output.json()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        println!("[FIXTURE] {} finished in {:?}", self.test_name, self.start_time.elapsed());
    }
}

#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout).expect("stdout should be valid JSON")
    }
}
