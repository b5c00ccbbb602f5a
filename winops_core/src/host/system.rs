use sysinfo::System;

use crate::model::SystemInfo;

use super::{HostResult, SystemHost};

/// Host facts from `sysinfo`.
#[derive(Debug, Default, Clone)]
pub struct SysinfoSystem;

impl SysinfoSystem {
    pub fn new() -> Self {
        Self
    }
}

impl SystemHost for SysinfoSystem {
    fn info(&self) -> HostResult<SystemInfo> {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();

        let processor = system
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());

        Ok(SystemInfo {
            hostname: System::host_name().unwrap_or_default(),
            os_name: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: System::os_version().unwrap_or_default(),
            system_type: if cfg!(target_pointer_width = "64") {
                "64-bit".to_string()
            } else {
                "32-bit".to_string()
            },
            processor,
            memory_total: system.total_memory(),
            memory_available: system.available_memory(),
            boot_time: System::boot_time(),
        })
    }
}
