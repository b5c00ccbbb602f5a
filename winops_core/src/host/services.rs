//! Service control through the platform's own tooling: `sc.exe` on Windows,
//! `systemctl` on Linux.

use crate::model::{ServiceAction, ServiceInfo};
use crate::utils::command::run_command;

use super::{HostError, HostResult, ServiceHost};

#[derive(Debug, Default, Clone)]
pub struct NativeServices;

impl NativeServices {
    pub fn new() -> Self {
        Self
    }
}

fn tool(program: &str, args: &[&str]) -> HostResult<String> {
    let output = run_command(program, args)?;
    if output.success {
        Ok(output.stdout)
    } else {
        let text = output.failure_text();
        if looks_missing(&text) {
            Err(HostError::NotFound(text))
        } else {
            Err(HostError::Other(text))
        }
    }
}

fn looks_missing(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    // sc.exe: error 1060; systemctl: "Unit foo.service not found."
    text.contains("1060") || text.contains("does not exist") || text.contains("not found")
}

#[cfg(windows)]
impl ServiceHost for NativeServices {
    fn list(&self) -> HostResult<Vec<ServiceInfo>> {
        let out = tool("sc", &["query", "type=", "service", "state=", "all"])?;
        Ok(parse_sc_query(&out))
    }

    fn get(&self, name: &str) -> HostResult<ServiceInfo> {
        let status = tool("sc", &["query", name])?;
        let mut info = parse_sc_query(&status)
            .into_iter()
            .next()
            .ok_or_else(|| HostError::NotFound(format!("service '{name}'")))?;
        let config = tool("sc", &["qc", name])?;
        apply_sc_qc(&mut info, &config);
        Ok(info)
    }

    fn control(&self, name: &str, action: ServiceAction) -> HostResult<()> {
        match action {
            ServiceAction::Start => tool("sc", &["start", name]).map(drop),
            ServiceAction::Stop => tool("sc", &["stop", name]).map(drop),
            ServiceAction::Pause => tool("sc", &["pause", name]).map(drop),
            ServiceAction::Resume => tool("sc", &["continue", name]).map(drop),
            ServiceAction::Restart => {
                // a stopped service cannot be stopped; just start it
                if let Err(e) = tool("sc", &["stop", name]) {
                    if e.is_not_found() {
                        return Err(e);
                    }
                    log::debug!("Stop before restart of '{}' failed: {}", name, e);
                }
                tool("sc", &["start", name]).map(drop)
            }
        }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
impl ServiceHost for NativeServices {
    fn list(&self) -> HostResult<Vec<ServiceInfo>> {
        let units = tool(
            "systemctl",
            &["list-units", "--type=service", "--all", "--no-legend", "--no-pager", "--plain"],
        )?;
        let files = tool(
            "systemctl",
            &["list-unit-files", "--type=service", "--no-legend", "--no-pager"],
        )?;
        Ok(parse_systemctl_units(&units, &files))
    }

    fn get(&self, name: &str) -> HostResult<ServiceInfo> {
        let unit = unit_name(name);
        let unit = unit.as_str();
        let out = tool(
            "systemctl",
            &[
                "show",
                unit,
                "--no-pager",
                "--property=Id,Description,LoadState,ActiveState,UnitFileState",
            ],
        )?;
        parse_systemctl_show(&out).ok_or_else(|| HostError::NotFound(format!("service '{name}'")))
    }

    fn control(&self, name: &str, action: ServiceAction) -> HostResult<()> {
        let unit = unit_name(name);
        let unit = unit.as_str();
        let args: Vec<&str> = match action {
            ServiceAction::Start => vec!["start", unit],
            ServiceAction::Stop => vec!["stop", unit],
            ServiceAction::Restart => vec!["restart", unit],
            ServiceAction::Pause => vec!["kill", "--signal=SIGSTOP", unit],
            ServiceAction::Resume => vec!["kill", "--signal=SIGCONT", unit],
        };
        tool("systemctl", &args).map(drop)
    }
}

#[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
impl ServiceHost for NativeServices {
    fn list(&self) -> HostResult<Vec<ServiceInfo>> {
        Err(HostError::Unsupported("service control on this platform".into()))
    }

    fn get(&self, _name: &str) -> HostResult<ServiceInfo> {
        Err(HostError::Unsupported("service control on this platform".into()))
    }

    fn control(&self, _name: &str, _action: ServiceAction) -> HostResult<()> {
        Err(HostError::Unsupported("service control on this platform".into()))
    }
}

fn sc_state(code: &str) -> &'static str {
    match code {
        "1" => "Stopped",
        "2" => "Starting",
        "3" => "Stopping",
        "4" => "Running",
        "5" => "Continue Pending",
        "6" => "Pause Pending",
        "7" => "Paused",
        _ => "Unknown",
    }
}

fn sc_start_type(code: &str) -> &'static str {
    match code {
        "0" => "Boot",
        "1" => "System",
        "2" => "Auto",
        "3" => "Manual",
        "4" => "Disabled",
        _ => "Unknown",
    }
}

/// Split `KEY   : value` lines as printed by `sc`.
fn sc_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn parse_sc_query(out: &str) -> Vec<ServiceInfo> {
    let mut services = Vec::new();
    for line in out.lines() {
        let Some((key, value)) = sc_field(line) else {
            continue;
        };
        match key {
            "SERVICE_NAME" => services.push(ServiceInfo {
                name: value.to_string(),
                display_name: value.to_string(),
                status: "Unknown".to_string(),
                start_type: "Unknown".to_string(),
                description: None,
            }),
            "DISPLAY_NAME" => {
                if let Some(current) = services.last_mut() {
                    current.display_name = value.to_string();
                }
            }
            "STATE" => {
                if let Some(current) = services.last_mut() {
                    let code = value.split_whitespace().next().unwrap_or_default();
                    current.status = sc_state(code).to_string();
                }
            }
            _ => {}
        }
    }
    services
}

#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn apply_sc_qc(info: &mut ServiceInfo, out: &str) {
    for line in out.lines() {
        let Some((key, value)) = sc_field(line) else {
            continue;
        };
        match key {
            "START_TYPE" => {
                let code = value.split_whitespace().next().unwrap_or_default();
                info.start_type = sc_start_type(code).to_string();
            }
            "DISPLAY_NAME" => info.display_name = value.to_string(),
            _ => {}
        }
    }
}

#[cfg_attr(windows, allow(dead_code))]
fn unit_name(name: &str) -> String {
    if name.ends_with(".service") {
        name.to_string()
    } else {
        format!("{name}.service")
    }
}

fn systemd_status(active: &str) -> &'static str {
    match active {
        "active" | "reloading" => "Running",
        "inactive" => "Stopped",
        "activating" => "Starting",
        "deactivating" => "Stopping",
        "failed" => "Failed",
        _ => "Unknown",
    }
}

fn systemd_start_type(state: &str) -> &'static str {
    match state {
        "enabled" | "enabled-runtime" | "alias" => "Auto",
        "disabled" | "masked" | "masked-runtime" => "Disabled",
        "static" | "indirect" | "generated" | "transient" => "Manual",
        _ => "Unknown",
    }
}

#[cfg_attr(windows, allow(dead_code))]
pub(crate) fn parse_systemctl_units(units: &str, files: &str) -> Vec<ServiceInfo> {
    let start_types: std::collections::HashMap<&str, &str> = files
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            Some((cols.next()?, cols.next()?))
        })
        .collect();

    units
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let unit = cols.next()?;
            let _load = cols.next()?;
            let active = cols.next()?;
            let _sub = cols.next()?;
            let description = cols.collect::<Vec<_>>().join(" ");
            let name = unit.strip_suffix(".service").unwrap_or(unit);
            Some(ServiceInfo {
                name: name.to_string(),
                display_name: if description.is_empty() {
                    name.to_string()
                } else {
                    description.clone()
                },
                status: systemd_status(active).to_string(),
                start_type: start_types
                    .get(unit)
                    .map(|s| systemd_start_type(s))
                    .unwrap_or("Unknown")
                    .to_string(),
                description: (!description.is_empty()).then_some(description),
            })
        })
        .collect()
}

#[cfg_attr(windows, allow(dead_code))]
pub(crate) fn parse_systemctl_show(out: &str) -> Option<ServiceInfo> {
    let props: std::collections::HashMap<&str, &str> =
        out.lines().filter_map(|line| line.split_once('=')).collect();
    if props.get("LoadState").copied() == Some("not-found") {
        return None;
    }
    let unit = props.get("Id").copied()?;
    let name = unit.strip_suffix(".service").unwrap_or(unit);
    let description = props
        .get("Description")
        .copied()
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    Some(ServiceInfo {
        name: name.to_string(),
        display_name: description.clone().unwrap_or_else(|| name.to_string()),
        status: systemd_status(props.get("ActiveState").copied().unwrap_or_default()).to_string(),
        start_type: systemd_start_type(props.get("UnitFileState").copied().unwrap_or_default())
            .to_string(),
        description,
    })
}
