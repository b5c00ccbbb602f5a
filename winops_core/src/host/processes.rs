use std::sync::Mutex;

use sysinfo::{Pid, Process, ProcessesToUpdate, Signal, System, Users};

use crate::model::ProcessInfo;

use super::{HostError, HostResult, ProcessHost};

/// Process table backed by `sysinfo`.
///
/// The `System` snapshot is kept between calls so CPU usage is measured
/// against the previous refresh instead of reading zero every time.
pub struct SysinfoProcesses {
    system: Mutex<System>,
}

impl Default for SysinfoProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProcesses {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn refreshed(&self) -> HostResult<std::sync::MutexGuard<'_, System>> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| HostError::Other("process table lock poisoned".into()))?;
        system.refresh_memory();
        system.refresh_processes(ProcessesToUpdate::All, true);
        Ok(system)
    }
}

fn describe(process: &Process, total_memory: u64, users: &Users) -> ProcessInfo {
    let memory_percent = if total_memory == 0 {
        0.0
    } else {
        (process.memory() as f64 / total_memory as f64 * 100.0) as f32
    };
    ProcessInfo {
        pid: process.pid().as_u32(),
        name: process.name().to_string_lossy().into_owned(),
        username: process
            .user_id()
            .and_then(|uid| users.get_user_by_id(uid))
            .map(|user| user.name().to_string()),
        cpu_percent: process.cpu_usage(),
        memory_percent,
        status: process.status().to_string(),
        create_time: process.start_time(),
    }
}

impl ProcessHost for SysinfoProcesses {
    fn list(&self) -> HostResult<Vec<ProcessInfo>> {
        let system = self.refreshed()?;
        let users = Users::new_with_refreshed_list();
        let total = system.total_memory();
        let mut processes: Vec<ProcessInfo> = system
            .processes()
            .values()
            .map(|p| describe(p, total, &users))
            .collect();
        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }

    fn get(&self, pid: u32) -> HostResult<ProcessInfo> {
        let system = self.refreshed()?;
        let users = Users::new_with_refreshed_list();
        system
            .process(Pid::from_u32(pid))
            .map(|p| describe(p, system.total_memory(), &users))
            .ok_or_else(|| HostError::NotFound(format!("Process with PID {pid} not found")))
    }

    fn terminate(&self, pid: u32) -> HostResult<()> {
        let system = self.refreshed()?;
        let process = system
            .process(Pid::from_u32(pid))
            .ok_or_else(|| HostError::NotFound(format!("Process with PID {pid} not found")))?;
        // polite SIGTERM where the platform has one, hard kill otherwise
        let delivered = process
            .kill_with(Signal::Term)
            .unwrap_or_else(|| process.kill());
        if delivered {
            Ok(())
        } else {
            Err(HostError::Other(format!("Failed to terminate process {pid}")))
        }
    }
}
