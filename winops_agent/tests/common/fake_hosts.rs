//! In-memory host collaborators.
//!
//! Deterministic stand-ins for the OS: a fixed service table, a fixed process
//! table and an environment map, so server tests can assert exact payloads
//! and exercise every status code without touching the real machine.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use winops_core::host::{
    EnvironmentHost, HostError, HostResult, ProcessHost, ServiceHost, SystemHost,
};
use winops_core::model::{
    EnvironmentVariable, ProcessInfo, ServiceAction, ServiceInfo, SystemInfo,
};
use winops_core::HostCollaborators;

pub const HOSTNAME: &str = "fake-host";

#[derive(Default)]
pub struct FakeServices {
    /// Every control call that reached the host, for assertions.
    pub calls: Mutex<Vec<(String, ServiceAction)>>,
}

impl ServiceHost for FakeServices {
    fn list(&self) -> HostResult<Vec<ServiceInfo>> {
        Ok(vec![self.get("svc")?])
    }

    fn get(&self, name: &str) -> HostResult<ServiceInfo> {
        if name != "svc" {
            return Err(HostError::NotFound(format!("Service '{name}' not found")));
        }
        Ok(ServiceInfo {
            name: "svc".into(),
            display_name: "Fake Service".into(),
            status: "running".into(),
            start_type: "auto".into(),
            description: None,
        })
    }

    fn control(&self, name: &str, action: ServiceAction) -> HostResult<()> {
        self.get(name)?;
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), action));
        Ok(())
    }
}

pub struct FakeProcesses;

impl ProcessHost for FakeProcesses {
    fn list(&self) -> HostResult<Vec<ProcessInfo>> {
        Ok(vec![self.get(42)?])
    }

    fn get(&self, pid: u32) -> HostResult<ProcessInfo> {
        match pid {
            42 => Ok(ProcessInfo {
                pid: 42,
                name: "fake".into(),
                username: Some("tester".into()),
                cpu_percent: 0.5,
                memory_percent: 1.0,
                status: "running".into(),
                create_time: 0,
            }),
            // a collaborator that blows up, to exercise panic handling
            666 => panic!("process table corrupted"),
            _ => Err(HostError::NotFound(format!(
                "Process with PID {pid} not found"
            ))),
        }
    }

    fn terminate(&self, pid: u32) -> HostResult<()> {
        match pid {
            42 => Ok(()),
            1 => Err(HostError::Other("Access denied".into())),
            _ => Err(HostError::NotFound(format!(
                "Process with PID {pid} not found"
            ))),
        }
    }
}

/// Variables keyed by `(is_system, name)`.
#[derive(Default)]
pub struct FakeEnvironment {
    pub vars: Mutex<BTreeMap<(bool, String), String>>,
}

impl EnvironmentHost for FakeEnvironment {
    fn list(&self) -> HostResult<Vec<EnvironmentVariable>> {
        Ok(self
            .vars
            .lock()
            .unwrap()
            .iter()
            .map(|((is_system, name), value)| EnvironmentVariable {
                name: name.clone(),
                value: value.clone(),
                is_system: *is_system,
            })
            .collect())
    }

    fn set(&self, name: &str, value: &str, is_system: bool) -> HostResult<()> {
        if name.is_empty() {
            return Err(HostError::InvalidInput("empty variable name".into()));
        }
        self.vars
            .lock()
            .unwrap()
            .insert((is_system, name.to_string()), value.to_string());
        Ok(())
    }

    fn delete(&self, name: &str, is_system: bool) -> HostResult<()> {
        self.vars
            .lock()
            .unwrap()
            .remove(&(is_system, name.to_string()))
            .map(drop)
            .ok_or_else(|| HostError::NotFound(format!("Environment variable '{name}' not found")))
    }
}

pub struct FakeSystem;

impl SystemHost for FakeSystem {
    fn info(&self) -> HostResult<SystemInfo> {
        Ok(SystemInfo {
            hostname: HOSTNAME.into(),
            os_name: "FakeOS".into(),
            os_version: "1.0".into(),
            system_type: "64-bit".into(),
            processor: "fake cpu".into(),
            memory_total: 1024,
            memory_available: 512,
            boot_time: 0,
        })
    }
}

pub struct FakeHost {
    pub services: Arc<FakeServices>,
    pub environment: Arc<FakeEnvironment>,
    pub collaborators: HostCollaborators,
}

pub fn fake_host() -> FakeHost {
    let services = Arc::new(FakeServices::default());
    let environment = Arc::new(FakeEnvironment::default());
    let collaborators = HostCollaborators {
        services: services.clone(),
        processes: Arc::new(FakeProcesses),
        environment: environment.clone(),
        system: Arc::new(FakeSystem),
    };
    FakeHost {
        services,
        environment,
        collaborators,
    }
}
