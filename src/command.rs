use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};

use crate::benchmarks::commands::StageCommand;

/// Command execution context
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Current working directory
    pub working_dir: Option<String>,
    /// Capture output
    pub capture_output: bool,
    /// Allow command to fail without returning an error
    pub allow_failure: bool,
}

/// Builder for CommandExecutor
pub struct CommandExecutorBuilder {
    context: CommandContext,
}

impl Default for CommandExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutorBuilder {
    /// Create a new CommandExecutorBuilder with default settings
    pub fn new() -> Self {
        Self {
            context: CommandContext::default(),
        }
    }

    /// Set whether to capture command output
    pub fn capture_output(mut self, capture: bool) -> Self {
        self.context.capture_output = capture;
        self
    }

    /// Set the working directory
    pub fn working_dir<P: AsRef<Path>>(mut self, dir: Option<P>) -> Self {
        self.context.working_dir = dir.map(|d| d.as_ref().to_string_lossy().to_string());
        self
    }

    /// Set whether to allow command failures without returning an error
    pub fn allow_failure(mut self, allow: bool) -> Self {
        self.context.allow_failure = allow;
        self
    }

    /// Build the CommandExecutor
    pub fn build(self) -> Result<CommandExecutor> {
        if let Some(dir) = &self.context.working_dir {
            if dir.is_empty() {
                anyhow::bail!("Working directory must not be empty");
            }
        }

        Ok(CommandExecutor {
            context: self.context,
        })
    }
}

/// A unified interface for executing commands
pub struct CommandExecutor {
    context: CommandContext,
}

impl CommandExecutor {
    /// Create a builder for CommandExecutor with fluent configuration
    pub fn builder() -> CommandExecutorBuilder {
        CommandExecutorBuilder::new()
    }

    /// Execute a command with arguments and wait for it to complete, returning the output
    pub fn execute_command_with_args(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let child = self.launch_command(cmd, args)?;

        let output = child.wait_with_output().with_context(|| {
            format!(
                "Failed to wait for command completion: {}",
                self.format_command(cmd, args)
            )
        })?;

        if !output.status.success() && !self.context.allow_failure {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "Command failed with status {}: {}\nStderr: {}",
                output.status.code().unwrap_or(-1),
                self.format_command(cmd, args),
                stderr
            ));
        }

        Ok(output)
    }

    /// Execute a command and launch it, returning the child process handle
    fn launch_command(&self, cmd: &str, args: &[&str]) -> Result<Child> {
        let command_str = self.format_command(cmd, args);
        debug!("Launching command: {}", command_str);

        let mut command = Command::new(cmd);
        command.args(args);

        if let Some(dir) = &self.context.working_dir {
            command.current_dir(dir);
        }

        if self.context.capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let child = command
            .spawn()
            .with_context(|| format!("Failed to spawn command: {}", command_str))?;

        Ok(child)
    }

    /// Format command and arguments for logging
    fn format_command(&self, cmd: &str, args: &[&str]) -> String {
        format!("{} {}", cmd, args.join(" "))
    }
}

/// Result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, -1 when the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Launches stage processes.
///
/// `run` waits for the process and reports a non-zero exit as output rather
/// than as an error; only failing to start the process is an error.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, command: &StageCommand) -> Result<ProcessOutput>;

    /// Start `command` in the background without waiting for it
    fn spawn_detached(&self, command: &StageCommand) -> Result<()>;
}

/// Runs stage commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    /// Stages capture output and report their exit code; background
    /// processes discard output and turn a non-zero exit into an error
    fn executor(command: &StageCommand, foreground: bool) -> Result<CommandExecutor> {
        CommandExecutor::builder()
            .working_dir(command.working_dir.as_deref())
            .capture_output(foreground)
            .allow_failure(foreground)
            .build()
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &StageCommand) -> Result<ProcessOutput> {
        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
        let output = Self::executor(command, true)?
            .execute_command_with_args(&command.program, &args)?;
        Ok(ProcessOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// The background process gets its own thread which is never joined:
    /// it may outlive the stage it was started for, and its output is
    /// discarded so it cannot interleave with the stage's captured output.
    fn spawn_detached(&self, command: &StageCommand) -> Result<()> {
        let executor = Self::executor(command, false)?;
        let program = command.program.clone();
        let args = command.args.clone();
        std::thread::Builder::new()
            .name(format!("background-{program}"))
            .spawn(move || {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                match executor.execute_command_with_args(&program, &args) {
                    Ok(output) => {
                        debug!("Background process {program} exited with {}", output.status)
                    }
                    Err(err) => warn!("Background process {program} failed: {err:#}"),
                }
            })
            .context("Failed to start background process thread")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let executor = CommandExecutor::builder()
            .working_dir(Some("/tmp"))
            .capture_output(true)
            .allow_failure(true)
            .build()
            .unwrap();

        assert_eq!(executor.context.working_dir, Some("/tmp".to_string()));
        assert!(executor.context.capture_output);
        assert!(executor.context.allow_failure);

        assert!(CommandExecutor::builder()
            .working_dir(Some(""))
            .build()
            .is_err());
    }

    #[test]
    fn test_command_failure_handling() {
        let strict_executor = CommandExecutor::builder()
            .capture_output(true)
            .build()
            .unwrap();
        let err = strict_executor
            .execute_command_with_args("sh", &["-c", "echo broken >&2; exit 4"])
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("status 4"));
        assert!(message.contains("sh -c echo broken >&2; exit 4"));
        assert!(message.contains("broken"));

        let lenient_executor = CommandExecutor::builder()
            .capture_output(true)
            .allow_failure(true)
            .build()
            .unwrap();
        let output = lenient_executor
            .execute_command_with_args("sh", &["-c", "exit 4"])
            .unwrap();
        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn test_background_executor_rejects_failure() {
        let command = StageCommand::new("sh").args(["-c", "exit 2"]);
        let executor = SystemProcessRunner::executor(&command, false).unwrap();
        assert!(!executor.context.capture_output);
        assert!(executor.execute_command_with_args("sh", &["-c", "exit 2"]).is_err());
    }

    #[test]
    fn test_system_runner_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemProcessRunner;

        let command = StageCommand::new("sh")
            .args(["-c", "pwd; echo oops >&2"])
            .current_dir(dir.path());
        let ok = runner.run(&command).unwrap();
        assert!(ok.success());
        let dir_name = dir.path().file_name().unwrap().to_str().unwrap();
        assert!(ok.stdout.trim_end().ends_with(dir_name));
        assert_eq!(ok.stderr.trim(), "oops");

        let failed = runner
            .run(&StageCommand::new("sh").args(["-c", "exit 3"]))
            .unwrap();
        assert_eq!(failed.code, 3);
        assert!(!failed.success());

        assert!(runner.run(&StageCommand::new("/nonexistent/binary")).is_err());
    }

    #[test]
    fn test_spawn_detached_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("started");
        let runner = SystemProcessRunner;
        let started = std::time::Instant::now();
        runner
            .spawn_detached(&StageCommand::new("sh").args([
                "-c".to_string(),
                format!("touch {}; sleep 1", marker.display()),
            ]))
            .unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(900));

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !marker.exists() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(marker.exists());
    }
}
