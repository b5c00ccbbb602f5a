//! Running the agent as an OS service.
//!
//! [`ServiceWrapper`] owns the lifecycle rules (what may follow what) and the
//! secret file; a [`ServiceBackend`] only knows how to talk to the service
//! manager of one OS.

#[cfg(windows)]
pub mod scm;
#[cfg(all(unix, not(target_os = "macos")))]
mod systemd;
mod windows;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::secret::{self, SECRET_ENV};

#[cfg(all(unix, not(target_os = "macos")))]
pub use systemd::SystemdBackend;
pub use windows::ScBackend;

pub const SERVICE_NAME: &str = "winops-agent";
pub const DISPLAY_NAME: &str = "WinOps Agent";
pub const DESCRIPTION: &str = "Remote administration agent for winops";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    NotInstalled,
    Stopped,
    Running,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::NotInstalled => write!(f, "not installed"),
            ServiceState::Stopped => write!(f, "installed (stopped)"),
            ServiceState::Running => write!(f, "running"),
        }
    }
}

#[derive(Debug)]
pub enum ServiceError {
    NotInstalled,
    AlreadyInstalled,
    AlreadyRunning,
    NotRunning,
    Unsupported(String),
    Backend(String),
    IoError(io::Error),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotInstalled => {
                write!(f, "Service '{SERVICE_NAME}' is not installed")
            }
            ServiceError::AlreadyInstalled => {
                write!(f, "Service '{SERVICE_NAME}' is already installed")
            }
            ServiceError::AlreadyRunning => write!(f, "Service '{SERVICE_NAME}' is already running"),
            ServiceError::NotRunning => write!(f, "Service '{SERVICE_NAME}' is not running"),
            ServiceError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            ServiceError::Backend(msg) => write!(f, "Service manager error: {}", msg),
            ServiceError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ServiceError {
    fn from(err: io::Error) -> Self {
        ServiceError::IoError(err)
    }
}

/// What the service manager should launch.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDefinition {
    pub executable: PathBuf,
    pub args: Vec<String>,
}

impl ServiceDefinition {
    /// The current binary started with `--run`, forwarding the listen address
    /// and key file so the service sees the same configuration.
    pub fn for_current_exe(bind: &str, port: u16, key_file: &Path) -> io::Result<Self> {
        Ok(Self {
            executable: std::env::current_exe()?,
            args: vec![
                "--run".into(),
                "--bind".into(),
                bind.into(),
                "--port".into(),
                port.to_string(),
                "--key-file".into(),
                key_file.display().to_string(),
            ],
        })
    }
}

/// One OS service manager. Implementations report and act; they do not
/// check whether an action makes sense in the current state.
pub trait ServiceBackend: Send + Sync {
    fn state(&self) -> Result<ServiceState, ServiceError>;
    fn install(&self, definition: &ServiceDefinition) -> Result<(), ServiceError>;
    fn uninstall(&self) -> Result<(), ServiceError>;
    fn start(&self) -> Result<(), ServiceError>;
    fn stop(&self) -> Result<(), ServiceError>;
}

/// The service manager of the running OS.
pub fn native_backend() -> Result<Box<dyn ServiceBackend>, ServiceError> {
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Ok(Box::new(SystemdBackend::new()))
    }
    #[cfg(windows)]
    {
        Ok(Box::new(ScBackend::new()))
    }
    #[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
    {
        Err(ServiceError::Unsupported(
            "no service manager integration for this OS".into(),
        ))
    }
}

/// Lifecycle of the installed agent:
/// `NotInstalled -> Installed(Stopped) <-> Running`.
pub struct ServiceWrapper {
    backend: Box<dyn ServiceBackend>,
    definition: ServiceDefinition,
    key_file: PathBuf,
    env_secret: Option<String>,
}

/// Outcome of [`ServiceWrapper::regenerate_secret`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegeneratedKey {
    pub secret: String,
    /// `WINOPS_API_KEY` is set, so the agent keeps using that value and
    /// ignores the new file contents.
    pub shadowed_by_env: bool,
}

impl ServiceWrapper {
    pub fn new(
        backend: Box<dyn ServiceBackend>,
        definition: ServiceDefinition,
        key_file: PathBuf,
    ) -> Self {
        Self {
            backend,
            definition,
            key_file,
            env_secret: std::env::var(SECRET_ENV).ok(),
        }
    }

    /// Override the `WINOPS_API_KEY` value read at construction.
    pub fn with_env_secret(mut self, env_secret: Option<String>) -> Self {
        self.env_secret = env_secret;
        self
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    pub fn status(&self) -> Result<ServiceState, ServiceError> {
        self.backend.state()
    }

    /// Register the service. A secret file is created if none exists yet.
    pub fn install(&self) -> Result<(), ServiceError> {
        if self.backend.state()? != ServiceState::NotInstalled {
            return Err(ServiceError::AlreadyInstalled);
        }
        secret::ensure_key_file(&self.key_file)?;
        self.backend.install(&self.definition)?;
        info!("Installed service '{}'", SERVICE_NAME);
        Ok(())
    }

    /// Remove the service, stopping it first if it is running.
    pub fn uninstall(&self) -> Result<(), ServiceError> {
        match self.backend.state()? {
            ServiceState::NotInstalled => return Err(ServiceError::NotInstalled),
            ServiceState::Running => self.backend.stop()?,
            ServiceState::Stopped => {}
        }
        self.backend.uninstall()?;
        info!("Uninstalled service '{}'", SERVICE_NAME);
        Ok(())
    }

    pub fn start(&self) -> Result<(), ServiceError> {
        match self.backend.state()? {
            ServiceState::NotInstalled => Err(ServiceError::NotInstalled),
            ServiceState::Running => Err(ServiceError::AlreadyRunning),
            ServiceState::Stopped => {
                self.backend.start()?;
                info!("Started service '{}'", SERVICE_NAME);
                Ok(())
            }
        }
    }

    pub fn stop(&self) -> Result<(), ServiceError> {
        match self.backend.state()? {
            ServiceState::NotInstalled => Err(ServiceError::NotInstalled),
            ServiceState::Stopped => Err(ServiceError::NotRunning),
            ServiceState::Running => {
                self.backend.stop()?;
                info!("Stopped service '{}'", SERVICE_NAME);
                Ok(())
            }
        }
    }

    /// Write a new secret. A running service is restarted so it picks the
    /// new value up.
    pub fn regenerate_secret(&self) -> Result<RegeneratedKey, ServiceError> {
        let secret = secret::regenerate_key_file(&self.key_file)?;
        let shadowed_by_env = self
            .env_secret
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty());
        if shadowed_by_env {
            warn!(
                "{} is set; the agent will keep using it instead of the key in {}",
                SECRET_ENV,
                self.key_file.display()
            );
        }
        if self.backend.state()? == ServiceState::Running {
            info!("Restarting service '{}' to apply the new key", SERVICE_NAME);
            self.backend.stop()?;
            self.backend.start()?;
        }
        Ok(RegeneratedKey {
            secret,
            shadowed_by_env,
        })
    }
}
