use std::fs;
use std::path::PathBuf;

use tracing::debug;
use winops_core::utils::command::run_command;

use super::{
    ServiceBackend, ServiceError, ServiceDefinition, ServiceState, DESCRIPTION, SERVICE_NAME,
};

const UNIT_DIR: &str = "/etc/systemd/system";

/// A system unit in `/etc/systemd/system`, driven through `systemctl`.
pub struct SystemdBackend {
    unit_path: PathBuf,
}

impl SystemdBackend {
    pub fn new() -> Self {
        Self {
            unit_path: PathBuf::from(UNIT_DIR).join(format!("{SERVICE_NAME}.service")),
        }
    }

    fn systemctl(&self, args: &[&str]) -> Result<String, ServiceError> {
        let output = run_command("systemctl", args)?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(ServiceError::Backend(format!(
                "systemctl {}: {}",
                args.join(" "),
                output.failure_text()
            )))
        }
    }
}

impl Default for SystemdBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn quote(arg: &str) -> String {
    if arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

pub(crate) fn render_unit(definition: &ServiceDefinition) -> String {
    let mut exec = quote(&definition.executable.display().to_string());
    for arg in &definition.args {
        exec.push(' ');
        exec.push_str(&quote(arg));
    }
    format!(
        "[Unit]\n\
         Description={DESCRIPTION}\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart={exec}\n\
         Restart=on-failure\n\
         RestartSec=5\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n"
    )
}

/// `LoadState` + `ActiveState` from `systemctl show`.
pub(crate) fn parse_state(show: &str) -> ServiceState {
    let mut load = "";
    let mut active = "";
    for line in show.lines() {
        if let Some(v) = line.strip_prefix("LoadState=") {
            load = v.trim();
        } else if let Some(v) = line.strip_prefix("ActiveState=") {
            active = v.trim();
        }
    }
    match (load, active) {
        ("not-found", _) | ("", _) => ServiceState::NotInstalled,
        (_, "active") | (_, "activating") | (_, "reloading") => ServiceState::Running,
        _ => ServiceState::Stopped,
    }
}

impl ServiceBackend for SystemdBackend {
    fn state(&self) -> Result<ServiceState, ServiceError> {
        let show = self.systemctl(&[
            "show",
            SERVICE_NAME,
            "--property=LoadState,ActiveState",
        ])?;
        Ok(parse_state(&show))
    }

    fn install(&self, definition: &ServiceDefinition) -> Result<(), ServiceError> {
        fs::write(&self.unit_path, render_unit(definition))?;
        self.systemctl(&["daemon-reload"])?;
        self.systemctl(&["enable", SERVICE_NAME])?;
        Ok(())
    }

    fn uninstall(&self) -> Result<(), ServiceError> {
        // a unit that was never enabled makes `disable` fail; removal still works
        if let Err(e) = self.systemctl(&["disable", SERVICE_NAME]) {
            debug!("systemctl disable {SERVICE_NAME} failed: {e}");
        }
        fs::remove_file(&self.unit_path)?;
        self.systemctl(&["daemon-reload"])?;
        Ok(())
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.systemctl(&["start", SERVICE_NAME]).map(drop)
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.systemctl(&["stop", SERVICE_NAME]).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_from_systemctl_show() {
        assert_eq!(
            parse_state("LoadState=not-found\nActiveState=inactive\n"),
            ServiceState::NotInstalled
        );
        assert_eq!(
            parse_state("LoadState=loaded\nActiveState=active\n"),
            ServiceState::Running
        );
        assert_eq!(
            parse_state("LoadState=loaded\nActiveState=failed\n"),
            ServiceState::Stopped
        );
    }

    #[test]
    fn unit_runs_binary_with_run_flag() {
        let definition = ServiceDefinition {
            executable: PathBuf::from("/opt/win ops/winops-agent"),
            args: vec!["--run".into(), "--port".into(), "8000".into()],
        };
        let unit = render_unit(&definition);
        assert!(unit.contains("ExecStart=\"/opt/win ops/winops-agent\" --run --port 8000\n"));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }
}
