//! Capability managers.
//!
//! One trait per capability, each with a local variant (wrapping a host
//! collaborator) and a remote variant (calling the active agent). Callers get
//! an `Arc<dyn Trait>` from the
//! [`OperationDispatcher`](crate::core::dispatcher::OperationDispatcher) and
//! never see which one they hold.
//!
//! Methods never fail: errors are logged and the capability's empty value
//! (`Vec::new()`, `None`, `false`) is returned instead.

pub mod local;
pub mod remote;

use async_trait::async_trait;

use crate::model::{EnvironmentVariable, ProcessInfo, ServiceAction, ServiceInfo, SystemInfo};

pub use local::{
    LocalEnvironmentManager, LocalProcessManager, LocalServiceManager, LocalSystemManager,
};
pub use remote::{
    RemoteEnvironmentManager, RemoteProcessManager, RemoteServiceManager, RemoteSystemManager,
};

#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn get_services(&self) -> Vec<ServiceInfo>;
    async fn get_service(&self, name: &str) -> Option<ServiceInfo>;
    async fn service_action(&self, name: &str, action: ServiceAction) -> bool;

    async fn start_service(&self, name: &str) -> bool {
        self.service_action(name, ServiceAction::Start).await
    }

    async fn stop_service(&self, name: &str) -> bool {
        self.service_action(name, ServiceAction::Stop).await
    }

    async fn restart_service(&self, name: &str) -> bool {
        self.service_action(name, ServiceAction::Restart).await
    }

    async fn pause_service(&self, name: &str) -> bool {
        self.service_action(name, ServiceAction::Pause).await
    }

    async fn resume_service(&self, name: &str) -> bool {
        self.service_action(name, ServiceAction::Resume).await
    }
}

#[async_trait]
pub trait ProcessManager: Send + Sync {
    async fn get_processes(&self) -> Vec<ProcessInfo>;
    async fn get_process(&self, pid: u32) -> Option<ProcessInfo>;
    async fn terminate_process(&self, pid: u32) -> bool;
}

#[async_trait]
pub trait EnvironmentManager: Send + Sync {
    async fn get_environment_variables(&self) -> Vec<EnvironmentVariable>;
    async fn set_environment_variable(&self, name: &str, value: &str, is_system: bool) -> bool;
    async fn delete_environment_variable(&self, name: &str, is_system: bool) -> bool;
}

#[async_trait]
pub trait SystemManager: Send + Sync {
    /// Host facts, cached after the first successful read until `refresh`.
    async fn get_system_info(&self, refresh: bool) -> Option<SystemInfo>;

    async fn hostname(&self) -> String {
        self.get_system_info(false)
            .await
            .map(|info| info.hostname)
            .unwrap_or_default()
    }

    async fn os_version(&self) -> String {
        self.get_system_info(false)
            .await
            .map(|info| info.os_version)
            .unwrap_or_default()
    }
}
