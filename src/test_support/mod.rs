//! Test utilities and mocks for unit tests.
//!
//! [`MockRunner`] stands in for the external toolchain: it records every
//! command it is asked to run and answers with canned output chosen by
//! pattern. [`MockDownloader`] serves a fixed archive and counts requests.
//!
//! # Example
//!
//! ```rust,ignore
//! let runner = MockRunner::new();
//! runner.expect("xcode-select -print-path", MockProcessOutput::success("/Dev"));
//! runner.expect_prefix("make", MockProcessOutput::success(""));
//!
//! // ... run an operation with &runner ...
//!
//! assert_eq!(runner.calls(), vec!["xcode-select -print-path", "make -j8"]);
//! ```

pub mod fixtures;

use std::io::{self, Write};
use std::sync::Mutex;

use url::Url;

use crate::ops::errors::DownloadError;
use crate::ops::fetch::Downloader;
use crate::util::process::{CommandOutput, CommandRunner, ProcessBuilder};

pub use fixtures::*;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Create an output with both stdout and stderr.
    pub fn with_output(status: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

impl From<MockProcessOutput> for CommandOutput {
    fn from(out: MockProcessOutput) -> Self {
        CommandOutput {
            status: Some(out.status),
            stdout: out.stdout,
            stderr: out.stderr,
        }
    }
}

/// Pattern for matching commands in MockRunner.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone)]
enum Response {
    Output(MockProcessOutput),
    SpawnError(io::ErrorKind),
}

#[derive(Debug)]
struct Expectation {
    pattern: CommandPattern,
    response: Response,
}

#[derive(Debug, Default)]
struct RunnerState {
    expectations: Vec<Expectation>,
    calls: Vec<ProcessBuilder>,
    default_output: Option<MockProcessOutput>,
}

/// Mock command runner.
///
/// Expectations are checked in the order they were added; the first match
/// wins. Commands matching nothing fall back to the default output, or fail
/// to spawn with `NotFound` if none is set.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<RunnerState>,
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        MockRunner::default()
    }

    fn push(&self, pattern: CommandPattern, response: Response) -> &Self {
        self.lock().expectations.push(Expectation { pattern, response });
        self
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&self, cmd: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandPattern::Exact(cmd.to_string()), Response::Output(output))
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, output: MockProcessOutput) -> &Self {
        self.push(
            CommandPattern::StartsWith(prefix.to_string()),
            Response::Output(output),
        )
    }

    /// Add an expectation for a command containing a substring.
    pub fn expect_contains(&self, substring: &str, output: MockProcessOutput) -> &Self {
        self.push(
            CommandPattern::Contains(substring.to_string()),
            Response::Output(output),
        )
    }

    /// Add an expectation for a command matching a regex.
    pub fn expect_regex(&self, pattern: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandPattern::Regex(pattern.to_string()), Response::Output(output))
    }

    /// Make commands starting with `prefix` fail to spawn.
    pub fn fail_spawn(&self, prefix: &str) -> &Self {
        self.push(
            CommandPattern::StartsWith(prefix.to_string()),
            Response::SpawnError(io::ErrorKind::NotFound),
        )
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: MockProcessOutput) -> &Self {
        self.lock().default_output = Some(output);
        self
    }

    /// Commands run so far, rendered with `display_command`.
    pub fn calls(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }

    /// Commands run so far, with their environment and working directory.
    pub fn invocations(&self) -> Vec<ProcessBuilder> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder) -> io::Result<CommandOutput> {
        let mut state = self.lock();
        state.calls.push(cmd.clone());

        let full_cmd = cmd.display_command();
        let response = state
            .expectations
            .iter()
            .find(|exp| exp.pattern.matches(&full_cmd))
            .map(|exp| exp.response.clone())
            .or_else(|| state.default_output.clone().map(Response::Output));

        match response {
            Some(Response::Output(out)) => Ok(out.into()),
            Some(Response::SpawnError(kind)) => Err(io::Error::new(kind, format!("cannot spawn {}", full_cmd))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unexpected command: {}", full_cmd),
            )),
        }
    }
}

/// Mock downloader serving one fixed body.
#[derive(Debug, Default)]
pub struct MockDownloader {
    body: Vec<u8>,
    status: Option<u16>,
    requests: Mutex<Vec<String>>,
}

impl MockDownloader {
    /// Serve `body` for every URL.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        MockDownloader {
            body: body.into(),
            status: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with an HTTP error status.
    pub fn failing(status: u16) -> Self {
        MockDownloader {
            body: Vec::new(),
            status: Some(status),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of downloads attempted.
    pub fn count(&self) -> usize {
        self.urls().len()
    }

    /// URLs requested, in order.
    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Downloader for MockDownloader {
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64, DownloadError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        if let Some(status) = self.status {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        dest.write_all(&self.body).map_err(|e| DownloadError::Transfer {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        Ok(self.body.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_basic() {
        let runner = MockRunner::new();
        runner.expect("xcode-select -print-path", MockProcessOutput::success("/Dev"));
        runner.expect_prefix("make", MockProcessOutput::failure(2, "boom"));

        let out = runner
            .run(&ProcessBuilder::new("xcode-select").arg("-print-path"))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "/Dev");

        let out = runner.run(&ProcessBuilder::new("make").arg("install")).unwrap();
        assert_eq!(out.status, Some(2));

        assert_eq!(runner.calls(), vec!["xcode-select -print-path", "make install"]);
    }

    #[test]
    fn test_mock_runner_unexpected() {
        let runner = MockRunner::new();

        let result = runner.run(&ProcessBuilder::new("unknown"));
        assert!(result.is_err());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_mock_runner_first_match_wins() {
        let runner = MockRunner::new();
        runner.expect_regex(r"^lipo -info .*libevent\.a$", MockProcessOutput::success("first"));
        runner.expect_prefix("lipo", MockProcessOutput::success("second"));

        let out = runner
            .run(&ProcessBuilder::new("lipo").args(["-info", "/out/libevent.a"]))
            .unwrap();
        assert_eq!(out.stdout, "first");
    }

    #[test]
    fn test_mock_downloader_counts() {
        let downloader = MockDownloader::new(b"tarball".to_vec());
        let url = Url::parse("https://example.com/a.tar.gz").unwrap();

        let mut buf = Vec::new();
        assert_eq!(downloader.download(&url, &mut buf).unwrap(), 7);
        assert_eq!(buf, b"tarball");
        assert_eq!(downloader.count(), 1);
    }
}
