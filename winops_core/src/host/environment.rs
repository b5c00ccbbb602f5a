//! Environment variables.
//!
//! [`OverlayEnvironment`] serves the user scope from a snapshot of the
//! environment the process started with, plus its own edits. It never
//! mutates the process environment; edits can be persisted to a JSON file so
//! they survive a restart. On Windows, [`RegistryEnvironment`] edits the
//! persistent user (`HKCU\Environment`) and machine-wide hives through
//! `reg.exe`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::{fs, io};

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::model::EnvironmentVariable;

use super::{EnvironmentHost, HostError, HostResult};

fn validate(name: &str, value: Option<&str>) -> HostResult<()> {
    if name.is_empty() || name.contains('=') || name.contains('\0') {
        return Err(HostError::InvalidInput(format!(
            "'{name}' is not a valid variable name"
        )));
    }
    if value.is_some_and(|v| v.contains('\0')) {
        return Err(HostError::InvalidInput(format!(
            "value of '{name}' contains a NUL byte"
        )));
    }
    Ok(())
}

fn system_scope_unsupported() -> HostError {
    HostError::Unsupported("system-scope variables cannot be edited by this host".into())
}

/// Edits layered over the inherited environment.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Overlay {
    #[serde(default)]
    set: BTreeMap<String, String>,
    #[serde(default)]
    removed: BTreeSet<String>,
}

/// User-scope variables: the inherited environment with local edits on top.
#[derive(Debug)]
pub struct OverlayEnvironment {
    base: BTreeMap<String, String>,
    overlay: Mutex<Overlay>,
    file: Option<PathBuf>,
}

impl OverlayEnvironment {
    /// Edits live as long as this value does.
    pub fn in_memory() -> Self {
        Self::with_file(None, Overlay::default())
    }

    /// Edits persisted in `~/.config/winops/environment.json` (or the
    /// platform equivalent).
    pub fn persistent() -> io::Result<Self> {
        let proj = ProjectDirs::from("", "", "winops")
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Unable to locate config dir"))?;
        Self::at(proj.config_dir().join("environment.json"))
    }

    /// Edits persisted in `file`; earlier edits stored there are loaded now.
    pub fn at(file: impl Into<PathBuf>) -> io::Result<Self> {
        let file = file.into();
        let overlay = match fs::read(&file) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring unreadable environment overlay {:?}: {e}", file);
                Overlay::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Overlay::default(),
            Err(e) => return Err(e),
        };
        Ok(Self::with_file(Some(file), overlay))
    }

    fn with_file(file: Option<PathBuf>, overlay: Overlay) -> Self {
        let base = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self {
            base,
            overlay: Mutex::new(overlay),
            file,
        }
    }

    fn lock(&self) -> HostResult<MutexGuard<'_, Overlay>> {
        self.overlay
            .lock()
            .map_err(|_| HostError::Other("environment state is poisoned".into()))
    }

    fn lookup<'a>(&'a self, overlay: &'a Overlay, name: &str) -> Option<&'a str> {
        if let Some(value) = overlay.set.get(name) {
            return Some(value);
        }
        if overlay.removed.contains(name) {
            return None;
        }
        self.base.get(name).map(String::as_str)
    }

    /// Apply `edit` to a copy, persist it, then make it current.
    fn commit(&self, overlay: &mut Overlay, edit: impl FnOnce(&mut Overlay)) -> HostResult<()> {
        let mut next = overlay.clone();
        edit(&mut next);
        if let Some(file) = &self.file {
            if let Some(dir) = file.parent() {
                fs::create_dir_all(dir)?;
            }
            let bytes = serde_json::to_vec_pretty(&next)
                .map_err(|e| HostError::Other(format!("encoding environment overlay: {e}")))?;
            fs::write(file, bytes)?;
            debug!("Saved environment overlay to {:?}", file);
        }
        *overlay = next;
        Ok(())
    }
}

impl EnvironmentHost for OverlayEnvironment {
    fn list(&self) -> HostResult<Vec<EnvironmentVariable>> {
        let overlay = self.lock()?;
        let mut merged: BTreeMap<&str, &str> = self
            .base
            .iter()
            .filter(|(name, _)| !overlay.removed.contains(name.as_str()))
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        for (name, value) in &overlay.set {
            merged.insert(name, value);
        }
        Ok(merged
            .into_iter()
            .map(|(name, value)| EnvironmentVariable {
                name: name.to_string(),
                value: value.to_string(),
                is_system: false,
            })
            .collect())
    }

    fn set(&self, name: &str, value: &str, is_system: bool) -> HostResult<()> {
        if is_system {
            return Err(system_scope_unsupported());
        }
        validate(name, Some(value))?;
        let mut overlay = self.lock()?;
        self.commit(&mut overlay, |o| {
            o.removed.remove(name);
            o.set.insert(name.to_string(), value.to_string());
        })
    }

    fn delete(&self, name: &str, is_system: bool) -> HostResult<()> {
        if is_system {
            return Err(system_scope_unsupported());
        }
        validate(name, None)?;
        let mut overlay = self.lock()?;
        if self.lookup(&overlay, name).is_none() {
            return Err(HostError::NotFound(format!(
                "Environment variable '{name}' not found"
            )));
        }
        let inherited = self.base.contains_key(name);
        self.commit(&mut overlay, |o| {
            o.set.remove(name);
            if inherited {
                o.removed.insert(name.to_string());
            }
        })
    }
}

#[cfg(windows)]
pub use registry::RegistryEnvironment;

#[cfg(windows)]
mod registry {
    use super::*;
    use crate::utils::command::run_command;

    const SYSTEM_KEY: &str =
        r"HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
    const USER_KEY: &str = r"HKCU\Environment";

    fn key(is_system: bool) -> &'static str {
        if is_system {
            SYSTEM_KEY
        } else {
            USER_KEY
        }
    }

    fn reg(args: &[&str]) -> HostResult<String> {
        let output = run_command("reg", args)?;
        if output.success {
            Ok(output.stdout)
        } else {
            let text = output.failure_text();
            if text.to_ascii_lowercase().contains("unable to find") {
                Err(HostError::NotFound(text))
            } else {
                Err(HostError::Other(text))
            }
        }
    }

    /// Persistent variables in the user and machine hives.
    #[derive(Debug, Default, Clone)]
    pub struct RegistryEnvironment;

    impl RegistryEnvironment {
        pub fn new() -> Self {
            Self
        }
    }

    impl EnvironmentHost for RegistryEnvironment {
        fn list(&self) -> HostResult<Vec<EnvironmentVariable>> {
            let mut vars = Vec::new();
            for is_system in [true, false] {
                let out = reg(&["query", key(is_system)])?;
                vars.extend(super::parse_reg_query(&out, is_system));
            }
            Ok(vars)
        }

        fn set(&self, name: &str, value: &str, is_system: bool) -> HostResult<()> {
            validate(name, Some(value))?;
            reg(&["add", key(is_system), "/v", name, "/t", "REG_SZ", "/d", value, "/f"])
                .map(drop)
        }

        fn delete(&self, name: &str, is_system: bool) -> HostResult<()> {
            validate(name, None)?;
            reg(&["delete", key(is_system), "/v", name, "/f"]).map(drop)
        }
    }
}

/// Parse `reg query` output: value lines are `    NAME    REG_TYPE    DATA`.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn parse_reg_query(out: &str, is_system: bool) -> Vec<EnvironmentVariable> {
    out.lines()
        .filter(|line| line.starts_with("    "))
        .filter_map(|line| {
            let mut cols = line.trim_start().splitn(3, "    ");
            let name = cols.next()?;
            let kind = cols.next()?;
            if !kind.starts_with("REG_") {
                return None;
            }
            Some(EnvironmentVariable {
                name: name.to_string(),
                value: cols.next().unwrap_or_default().to_string(),
                is_system,
            })
        })
        .collect()
}
