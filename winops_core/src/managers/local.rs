use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::error;

use crate::host::{EnvironmentHost, HostResult, ProcessHost, ServiceHost, SystemHost};
use crate::model::{EnvironmentVariable, ProcessInfo, ServiceAction, ServiceInfo, SystemInfo};

use super::{EnvironmentManager, ProcessManager, ServiceManager, SystemManager};

/// Run a blocking collaborator call on the blocking pool; log and swallow
/// failures.
async fn on_host<T, F>(what: String, call: F) -> Option<T>
where
    F: FnOnce() -> HostResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!("Failed to {}: {}", what, e);
            None
        }
        Err(e) => {
            error!("Failed to {}: {}", what, e);
            None
        }
    }
}

pub struct LocalServiceManager {
    host: Arc<dyn ServiceHost>,
}

impl LocalServiceManager {
    pub fn new(host: Arc<dyn ServiceHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl ServiceManager for LocalServiceManager {
    async fn get_services(&self) -> Vec<ServiceInfo> {
        let host = self.host.clone();
        on_host("get services".into(), move || host.list())
            .await
            .unwrap_or_default()
    }

    async fn get_service(&self, name: &str) -> Option<ServiceInfo> {
        let host = self.host.clone();
        let owned = name.to_string();
        on_host(format!("get service {name}"), move || host.get(&owned)).await
    }

    async fn service_action(&self, name: &str, action: ServiceAction) -> bool {
        let host = self.host.clone();
        let owned = name.to_string();
        on_host(format!("{action} service {name}"), move || {
            host.control(&owned, action)
        })
        .await
        .is_some()
    }
}

pub struct LocalProcessManager {
    host: Arc<dyn ProcessHost>,
}

impl LocalProcessManager {
    pub fn new(host: Arc<dyn ProcessHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl ProcessManager for LocalProcessManager {
    async fn get_processes(&self) -> Vec<ProcessInfo> {
        let host = self.host.clone();
        on_host("get processes".into(), move || host.list())
            .await
            .unwrap_or_default()
    }

    async fn get_process(&self, pid: u32) -> Option<ProcessInfo> {
        let host = self.host.clone();
        on_host(format!("get process {pid}"), move || host.get(pid)).await
    }

    async fn terminate_process(&self, pid: u32) -> bool {
        let host = self.host.clone();
        on_host(format!("terminate process {pid}"), move || host.terminate(pid))
            .await
            .is_some()
    }
}

pub struct LocalEnvironmentManager {
    host: Arc<dyn EnvironmentHost>,
}

impl LocalEnvironmentManager {
    pub fn new(host: Arc<dyn EnvironmentHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl EnvironmentManager for LocalEnvironmentManager {
    async fn get_environment_variables(&self) -> Vec<EnvironmentVariable> {
        let host = self.host.clone();
        on_host("get environment variables".into(), move || host.list())
            .await
            .unwrap_or_default()
    }

    async fn set_environment_variable(&self, name: &str, value: &str, is_system: bool) -> bool {
        let host = self.host.clone();
        let (owned_name, owned_value) = (name.to_string(), value.to_string());
        on_host(format!("set environment variable {name}"), move || {
            host.set(&owned_name, &owned_value, is_system)
        })
        .await
        .is_some()
    }

    async fn delete_environment_variable(&self, name: &str, is_system: bool) -> bool {
        let host = self.host.clone();
        let owned = name.to_string();
        on_host(format!("delete environment variable {name}"), move || {
            host.delete(&owned, is_system)
        })
        .await
        .is_some()
    }
}

pub struct LocalSystemManager {
    host: Arc<dyn SystemHost>,
    cached: Mutex<Option<SystemInfo>>,
}

impl LocalSystemManager {
    pub fn new(host: Arc<dyn SystemHost>) -> Self {
        Self {
            host,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SystemManager for LocalSystemManager {
    async fn get_system_info(&self, refresh: bool) -> Option<SystemInfo> {
        if !refresh {
            if let Some(info) = self.cached.lock().ok().and_then(|c| c.clone()) {
                return Some(info);
            }
        }
        let host = self.host.clone();
        let info = on_host("get system info".into(), move || host.info()).await?;
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some(info.clone());
        }
        Some(info)
    }
}
