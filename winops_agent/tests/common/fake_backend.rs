//! A service manager that only remembers what it was told.

use std::sync::{Arc, Mutex};

use winops_agent::service::{ServiceBackend, ServiceError, ServiceDefinition, ServiceState};

#[derive(Default)]
pub struct BackendLog {
    pub state: Option<ServiceState>,
    pub installed_with: Option<ServiceDefinition>,
    pub calls: Vec<&'static str>,
}

#[derive(Clone)]
pub struct FakeBackend {
    pub log: Arc<Mutex<BackendLog>>,
}

impl FakeBackend {
    pub fn new(initial: ServiceState) -> Self {
        Self {
            log: Arc::new(Mutex::new(BackendLog {
                state: Some(initial),
                ..BackendLog::default()
            })),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn current(&self) -> ServiceState {
        self.log
            .lock()
            .unwrap()
            .state
            .unwrap_or(ServiceState::NotInstalled)
    }

    fn record(&self, call: &'static str, next: ServiceState) {
        let mut log = self.log.lock().unwrap();
        log.calls.push(call);
        log.state = Some(next);
    }
}

impl ServiceBackend for FakeBackend {
    fn state(&self) -> Result<ServiceState, ServiceError> {
        Ok(self.current())
    }

    fn install(&self, definition: &ServiceDefinition) -> Result<(), ServiceError> {
        self.log.lock().unwrap().installed_with = Some(definition.clone());
        self.record("install", ServiceState::Stopped);
        Ok(())
    }

    fn uninstall(&self) -> Result<(), ServiceError> {
        self.record("uninstall", ServiceState::NotInstalled);
        Ok(())
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.record("start", ServiceState::Running);
        Ok(())
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.record("stop", ServiceState::Stopped);
        Ok(())
    }
}
