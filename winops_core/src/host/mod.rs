//! OS collaborators.
//!
//! One trait per capability. The local managers and the agent server both
//! delegate here; neither knows how the host actually enumerates services or
//! stores environment variables. Calls are blocking and are expected to run
//! on a blocking-capable thread (`tokio::task::spawn_blocking`).

pub mod environment;
pub mod errors;
pub mod processes;
pub mod services;
pub mod system;

use std::sync::Arc;

#[cfg(not(windows))]
use log::warn;

use crate::model::{EnvironmentVariable, ProcessInfo, ServiceAction, ServiceInfo, SystemInfo};

pub use environment::OverlayEnvironment;
pub use errors::HostError;
pub use processes::SysinfoProcesses;
pub use services::NativeServices;
pub use system::SysinfoSystem;

pub type HostResult<T> = Result<T, HostError>;

pub trait ServiceHost: Send + Sync {
    fn list(&self) -> HostResult<Vec<ServiceInfo>>;
    fn get(&self, name: &str) -> HostResult<ServiceInfo>;
    fn control(&self, name: &str, action: ServiceAction) -> HostResult<()>;
}

pub trait ProcessHost: Send + Sync {
    fn list(&self) -> HostResult<Vec<ProcessInfo>>;
    fn get(&self, pid: u32) -> HostResult<ProcessInfo>;
    fn terminate(&self, pid: u32) -> HostResult<()>;
}

pub trait EnvironmentHost: Send + Sync {
    fn list(&self) -> HostResult<Vec<EnvironmentVariable>>;
    fn set(&self, name: &str, value: &str, is_system: bool) -> HostResult<()>;
    fn delete(&self, name: &str, is_system: bool) -> HostResult<()>;
}

pub trait SystemHost: Send + Sync {
    fn info(&self) -> HostResult<SystemInfo>;
}

/// The full set of collaborators for one machine.
#[derive(Clone)]
pub struct HostCollaborators {
    pub services: Arc<dyn ServiceHost>,
    pub processes: Arc<dyn ProcessHost>,
    pub environment: Arc<dyn EnvironmentHost>,
    pub system: Arc<dyn SystemHost>,
}

impl HostCollaborators {
    /// Collaborators backed by the machine this process runs on.
    pub fn native() -> Self {
        Self {
            services: Arc::new(NativeServices::new()),
            processes: Arc::new(SysinfoProcesses::new()),
            #[cfg(windows)]
            environment: Arc::new(environment::RegistryEnvironment::new()),
            #[cfg(not(windows))]
            environment: Arc::new(OverlayEnvironment::persistent().unwrap_or_else(|e| {
                warn!("Environment edits will not be saved: {e}");
                OverlayEnvironment::in_memory()
            })),
            system: Arc::new(SysinfoSystem::new()),
        }
    }
}
