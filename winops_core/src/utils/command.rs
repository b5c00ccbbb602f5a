use std::io;
use std::process::Command;

use log::debug;

/// Captured result of an external tool invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// The most useful text for an error message: stderr if the tool wrote
    /// any, else stdout, else the exit code.
    pub fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Run `program args...` to completion and capture its output.
///
/// Only spawn failures are errors; a non-zero exit is reported through
/// [`CommandOutput::success`].
pub fn run_command(program: &str, args: &[&str]) -> io::Result<CommandOutput> {
    debug!("Running {} {:?}", program, args);
    let output = Command::new(program).args(args).output()?;
    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
