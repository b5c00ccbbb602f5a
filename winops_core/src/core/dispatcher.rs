use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::info;

use crate::core::registry::ConnectionRegistry;
use crate::host::HostCollaborators;
use crate::managers::{
    EnvironmentManager, LocalEnvironmentManager, LocalProcessManager, LocalServiceManager,
    LocalSystemManager, ProcessManager, RemoteEnvironmentManager, RemoteProcessManager,
    RemoteServiceManager, RemoteSystemManager, ServiceManager, SystemManager,
};

/// Where capability calls go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationMode {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationMode::Local => write!(f, "local"),
            OperationMode::Remote => write!(f, "remote"),
        }
    }
}

/// At most one manager per mode, built on first request.
struct ManagerCache<T: ?Sized> {
    built: HashMap<OperationMode, Arc<T>>,
}

impl<T: ?Sized> ManagerCache<T> {
    fn new() -> Self {
        Self {
            built: HashMap::new(),
        }
    }

    fn get_or_build(&mut self, mode: OperationMode, build: impl FnOnce() -> Arc<T>) -> Arc<T> {
        self.built.entry(mode).or_insert_with(build).clone()
    }
}

/// Hands out the capability manager matching the current mode.
///
/// Managers are cached per (capability, mode): asking twice in the same mode
/// yields the same instance, and switching modes back and forth never
/// rebuilds one. Remote managers hold a clone of the registry and so always
/// talk to whichever connection is active at call time.
pub struct OperationDispatcher {
    mode: OperationMode,
    registry: ConnectionRegistry,
    host: HostCollaborators,
    services: ManagerCache<dyn ServiceManager>,
    processes: ManagerCache<dyn ProcessManager>,
    environment: ManagerCache<dyn EnvironmentManager>,
    system: ManagerCache<dyn SystemManager>,
}

impl OperationDispatcher {
    pub fn new(registry: ConnectionRegistry, host: HostCollaborators) -> Self {
        Self {
            mode: OperationMode::default(),
            registry,
            host,
            services: ManagerCache::new(),
            processes: ManagerCache::new(),
            environment: ManagerCache::new(),
            system: ManagerCache::new(),
        }
    }

    pub fn set_mode(&mut self, mode: OperationMode) {
        if self.mode != mode {
            info!("Switched to {} mode", mode);
        }
        self.mode = mode;
    }

    pub fn get_mode(&self) -> OperationMode {
        self.mode
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn get_service_manager(&mut self) -> Arc<dyn ServiceManager> {
        let mode = self.mode;
        let (registry, host) = (&self.registry, &self.host);
        self.services.get_or_build(mode, || -> Arc<dyn ServiceManager> {
            match mode {
                OperationMode::Local => Arc::new(LocalServiceManager::new(host.services.clone())),
                OperationMode::Remote => Arc::new(RemoteServiceManager::new(registry.clone())),
            }
        })
    }

    pub fn get_process_manager(&mut self) -> Arc<dyn ProcessManager> {
        let mode = self.mode;
        let (registry, host) = (&self.registry, &self.host);
        self.processes.get_or_build(mode, || -> Arc<dyn ProcessManager> {
            match mode {
                OperationMode::Local => Arc::new(LocalProcessManager::new(host.processes.clone())),
                OperationMode::Remote => Arc::new(RemoteProcessManager::new(registry.clone())),
            }
        })
    }

    pub fn get_environment_manager(&mut self) -> Arc<dyn EnvironmentManager> {
        let mode = self.mode;
        let (registry, host) = (&self.registry, &self.host);
        self.environment.get_or_build(mode, || -> Arc<dyn EnvironmentManager> {
            match mode {
                OperationMode::Local => {
                    Arc::new(LocalEnvironmentManager::new(host.environment.clone()))
                }
                OperationMode::Remote => {
                    Arc::new(RemoteEnvironmentManager::new(registry.clone()))
                }
            }
        })
    }

    pub fn get_system_manager(&mut self) -> Arc<dyn SystemManager> {
        let mode = self.mode;
        let (registry, host) = (&self.registry, &self.host);
        self.system.get_or_build(mode, || -> Arc<dyn SystemManager> {
            match mode {
                OperationMode::Local => Arc::new(LocalSystemManager::new(host.system.clone())),
                OperationMode::Remote => Arc::new(RemoteSystemManager::new(registry.clone())),
            }
        })
    }
}
