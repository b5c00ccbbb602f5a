use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;
use winops_core::utils::command::run_command;

use super::{
    ServiceBackend, ServiceDefinition, ServiceError, ServiceState, DESCRIPTION, DISPLAY_NAME,
    SERVICE_NAME,
};

/// `sc.exe` reports this when the service does not exist.
const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;
/// How long `start`/`stop` wait for the SCM to settle.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A Windows service registered through `sc.exe`.
///
/// `sc start` and `sc stop` return while the service is still pending, so
/// both wait until `sc query` reports the settled state.
pub struct ScBackend;

impl ScBackend {
    pub fn new() -> Self {
        Self
    }

    fn sc(&self, args: &[&str]) -> Result<String, ServiceError> {
        let output = run_command("sc", args)?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(ServiceError::Backend(format!(
                "sc {}: {}",
                args.join(" "),
                output.failure_text()
            )))
        }
    }

    /// The raw SCM state word (`RUNNING`, `STOP_PENDING`, ...), `None` when
    /// the service does not exist.
    fn query(&self) -> Result<Option<String>, ServiceError> {
        let output = run_command("sc", &["query", SERVICE_NAME])?;
        if output.code == Some(ERROR_SERVICE_DOES_NOT_EXIST) {
            return Ok(None);
        }
        if !output.success {
            return Err(ServiceError::Backend(output.failure_text()));
        }
        parse_sc_state(&output.stdout)
            .map(|state| Some(state.to_string()))
            .ok_or_else(|| ServiceError::Backend("sc query printed no STATE line".into()))
    }

    fn settle(&self, target: &str) -> Result<(), ServiceError> {
        wait_for_state(|| self.query(), target, SETTLE_TIMEOUT, POLL_INTERVAL)
    }
}

impl Default for ScBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// `STATE              : 4  RUNNING` -> `RUNNING`
pub(crate) fn parse_sc_state(stdout: &str) -> Option<&str> {
    stdout.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() != "STATE" {
            return None;
        }
        value.split_whitespace().nth(1)
    })
}

/// Anything but a settled `STOPPED` still occupies the service, so a
/// `STOP_PENDING` service counts as running.
pub(crate) fn state_from_word(word: Option<&str>) -> ServiceState {
    match word {
        None => ServiceState::NotInstalled,
        Some("STOPPED") => ServiceState::Stopped,
        Some(_) => ServiceState::Running,
    }
}

/// Poll `query` until it reports `target`.
pub(crate) fn wait_for_state<Q>(
    mut query: Q,
    target: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServiceError>
where
    Q: FnMut() -> Result<Option<String>, ServiceError>,
{
    let deadline = Instant::now() + timeout;
    loop {
        let current = query()?;
        if current.as_deref() == Some(target) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ServiceError::Backend(format!(
                "service '{SERVICE_NAME}' did not reach {target} within {}s (last state: {})",
                timeout.as_secs(),
                current.as_deref().unwrap_or("missing")
            )));
        }
        debug!(state = ?current, target, "waiting for service state");
        thread::sleep(interval);
    }
}

fn command_line(definition: &ServiceDefinition) -> String {
    let mut line = format!("\"{}\"", definition.executable.display());
    for arg in &definition.args {
        line.push(' ');
        if arg.contains(' ') {
            line.push_str(&format!("\"{arg}\""));
        } else {
            line.push_str(arg);
        }
    }
    line
}

impl ServiceBackend for ScBackend {
    fn state(&self) -> Result<ServiceState, ServiceError> {
        Ok(state_from_word(self.query()?.as_deref()))
    }

    fn install(&self, definition: &ServiceDefinition) -> Result<(), ServiceError> {
        let bin_path = command_line(definition);
        self.sc(&[
            "create",
            SERVICE_NAME,
            "binPath=",
            &bin_path,
            "start=",
            "auto",
            "DisplayName=",
            DISPLAY_NAME,
        ])?;
        self.sc(&["description", SERVICE_NAME, DESCRIPTION])?;
        Ok(())
    }

    fn uninstall(&self) -> Result<(), ServiceError> {
        self.sc(&["delete", SERVICE_NAME]).map(drop)
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.sc(&["start", SERVICE_NAME])?;
        self.settle("RUNNING")
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.sc(&["stop", SERVICE_NAME])?;
        self.settle("STOPPED")
    }
}
