use std::{fs, io, path::PathBuf};

use directories::ProjectDirs;
use log::warn;
use serde_json::Error as SerdeError;

use super::profile::ConnectionProfile;

/// One JSON file per connection profile.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// `~/.config/winops/connections` on Linux, `%APPDATA%\winops\config\connections` on Windows, etc.
    pub fn new() -> io::Result<Self> {
        let proj = ProjectDirs::from("", "", "winops")
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Unable to locate config dir"))?;
        Self::at(proj.config_dir().join("connections"))
    }

    /// Store rooted at an explicit directory (created if missing).
    pub fn at(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn file_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(name)))
    }

    /// Returns every stored profile (skips malformed files with a warning).
    pub fn list(&self) -> io::Result<Vec<ConnectionProfile>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            match fs::File::open(&path)
                .and_then(|f| serde_json::from_reader(f).map_err(SerdeError::into))
            {
                Ok(profile) => out.push(profile),
                Err(e) => warn!("Could not read {:?}: {e}", path),
            }
        }
        out.sort_by(|a: &ConnectionProfile, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Create or overwrite a profile.
    pub fn save(&self, profile: &ConnectionProfile) -> io::Result<()> {
        let file = fs::File::create(self.file_for(&profile.name))?;
        serde_json::to_writer_pretty(file, profile).map_err(SerdeError::into)
    }

    /// Delete a profile (`Ok(true)` if removed, `Ok(false)` if it didn't exist).
    pub fn delete(&self, name: &str) -> io::Result<bool> {
        match fs::remove_file(self.file_for(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Profile names are free text; escape anything that is not safe in a file
/// name so distinct names never share a file.
fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}
