use std::sync::Mutex;

use async_trait::async_trait;
use log::{debug, error};
use serde::de::DeserializeOwned;

use crate::client::{AgentClient, Envelope};
use crate::core::registry::ConnectionRegistry;
use crate::model::{EnvironmentVariable, ProcessInfo, ServiceAction, ServiceInfo, SystemInfo};

use super::{EnvironmentManager, ProcessManager, ServiceManager, SystemManager};

/// Client of whatever connection is active *now*.
async fn current_client(registry: &ConnectionRegistry) -> Option<AgentClient> {
    if !registry.is_connected().await {
        error!("Not connected to a remote PC");
        return None;
    }
    let client = registry.get_client().await;
    if client.is_none() {
        // disconnected between the two reads
        error!("Not connected to a remote PC");
    }
    client
}

fn payload<T: DeserializeOwned>(what: &str, envelope: Envelope) -> Option<T> {
    if envelope.success {
        debug!("{}: {}", what, envelope.message);
        envelope.data_as()
    } else {
        error!("Failed to {}: {}", what, envelope.message);
        None
    }
}

fn succeeded(what: &str, envelope: Envelope) -> bool {
    if envelope.success {
        debug!("{}: {}", what, envelope.message);
    } else {
        error!("Failed to {}: {}", what, envelope.message);
    }
    envelope.success
}

pub struct RemoteServiceManager {
    registry: ConnectionRegistry,
}

impl RemoteServiceManager {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ServiceManager for RemoteServiceManager {
    async fn get_services(&self) -> Vec<ServiceInfo> {
        let Some(client) = current_client(&self.registry).await else {
            return Vec::new();
        };
        payload("get services", client.get_services().await).unwrap_or_default()
    }

    async fn get_service(&self, name: &str) -> Option<ServiceInfo> {
        let client = current_client(&self.registry).await?;
        payload(&format!("get service {name}"), client.get_service(name).await)
    }

    async fn service_action(&self, name: &str, action: ServiceAction) -> bool {
        let Some(client) = current_client(&self.registry).await else {
            return false;
        };
        succeeded(
            &format!("{action} service {name}"),
            client.service_action(name, action.as_str()).await,
        )
    }
}

pub struct RemoteProcessManager {
    registry: ConnectionRegistry,
}

impl RemoteProcessManager {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ProcessManager for RemoteProcessManager {
    async fn get_processes(&self) -> Vec<ProcessInfo> {
        let Some(client) = current_client(&self.registry).await else {
            return Vec::new();
        };
        payload("get processes", client.get_processes().await).unwrap_or_default()
    }

    async fn get_process(&self, pid: u32) -> Option<ProcessInfo> {
        let client = current_client(&self.registry).await?;
        payload(&format!("get process {pid}"), client.get_process(pid).await)
    }

    async fn terminate_process(&self, pid: u32) -> bool {
        let Some(client) = current_client(&self.registry).await else {
            return false;
        };
        succeeded(
            &format!("terminate process {pid}"),
            client.terminate_process(pid).await,
        )
    }
}

pub struct RemoteEnvironmentManager {
    registry: ConnectionRegistry,
}

impl RemoteEnvironmentManager {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl EnvironmentManager for RemoteEnvironmentManager {
    async fn get_environment_variables(&self) -> Vec<EnvironmentVariable> {
        let Some(client) = current_client(&self.registry).await else {
            return Vec::new();
        };
        payload(
            "get environment variables",
            client.get_environment_variables().await,
        )
        .unwrap_or_default()
    }

    async fn set_environment_variable(&self, name: &str, value: &str, is_system: bool) -> bool {
        let Some(client) = current_client(&self.registry).await else {
            return false;
        };
        succeeded(
            &format!("set environment variable {name}"),
            client.set_environment_variable(name, value, is_system).await,
        )
    }

    async fn delete_environment_variable(&self, name: &str, is_system: bool) -> bool {
        let Some(client) = current_client(&self.registry).await else {
            return false;
        };
        succeeded(
            &format!("delete environment variable {name}"),
            client.delete_environment_variable(name, is_system).await,
        )
    }
}

/// The cache is tied to the connection session the facts came from, so
/// reconnecting (even under the same profile name) never serves stale data.
pub struct RemoteSystemManager {
    registry: ConnectionRegistry,
    cached: Mutex<Option<(u64, SystemInfo)>>,
}

impl RemoteSystemManager {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self {
            registry,
            cached: Mutex::new(None),
        }
    }

    fn cached_for(&self, session: u64) -> Option<SystemInfo> {
        let cached = self.cached.lock().ok()?;
        match cached.as_ref() {
            Some((cached_session, info)) if *cached_session == session => Some(info.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl SystemManager for RemoteSystemManager {
    async fn get_system_info(&self, refresh: bool) -> Option<SystemInfo> {
        let Some(active) = self.registry.get_active_connection().await else {
            error!("Not connected to a remote PC");
            return None;
        };
        let session = active.session();
        if !refresh {
            if let Some(info) = self.cached_for(session) {
                return Some(info);
            }
        }
        let info: SystemInfo = payload("get system info", active.client.get_system_info().await)?;
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some((session, info.clone()));
        }
        Some(info)
    }
}
