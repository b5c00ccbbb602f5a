//! The agent's shared secret.
//!
//! Resolved once at startup: `WINOPS_API_KEY` wins, then the key file, and
//! if neither yields a value a fresh UUID v4 is generated and written to the
//! key file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{info, warn};
use uuid::Uuid;

pub const SECRET_ENV: &str = "WINOPS_API_KEY";
const KEY_FILE_NAME: &str = "api_key.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOrigin {
    Environment,
    File,
    Generated,
}

/// `<config dir>/winops/api_key.txt`
pub fn default_key_file() -> io::Result<PathBuf> {
    let proj = ProjectDirs::from("", "", "winops")
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Unable to locate config dir"))?;
    Ok(proj.config_dir().join(KEY_FILE_NAME))
}

pub fn generate_secret() -> String {
    Uuid::new_v4().to_string()
}

/// Resolve the secret from the process environment and `key_file`.
pub fn resolve_secret(key_file: &Path) -> io::Result<(String, SecretOrigin)> {
    resolve_secret_with(std::env::var(SECRET_ENV).ok(), key_file)
}

/// Same as [`resolve_secret`] with the environment value passed in.
pub fn resolve_secret_with(
    env_value: Option<String>,
    key_file: &Path,
) -> io::Result<(String, SecretOrigin)> {
    if let Some(secret) = env_value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        info!("Using API key from {}", SECRET_ENV);
        return Ok((secret, SecretOrigin::Environment));
    }
    if let Some(secret) = read_key_file(key_file)? {
        info!("Using API key from {}", key_file.display());
        return Ok((secret, SecretOrigin::File));
    }
    let secret = generate_secret();
    write_key_file(key_file, &secret)?;
    info!("Generated new API key in {}", key_file.display());
    Ok((secret, SecretOrigin::Generated))
}

/// The persisted secret, generating one if the file is missing or empty.
pub fn ensure_key_file(key_file: &Path) -> io::Result<String> {
    match read_key_file(key_file)? {
        Some(secret) => Ok(secret),
        None => {
            let secret = generate_secret();
            write_key_file(key_file, &secret)?;
            Ok(secret)
        }
    }
}

/// Replace the persisted secret with a fresh one.
pub fn regenerate_key_file(key_file: &Path) -> io::Result<String> {
    let secret = generate_secret();
    write_key_file(key_file, &secret)?;
    info!("Wrote new API key to {}", key_file.display());
    Ok(secret)
}

/// `None` when the file does not exist or holds only whitespace.
pub fn read_key_file(key_file: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(key_file) {
        Ok(text) => {
            let secret = text.trim();
            if secret.is_empty() {
                warn!("Key file {} is empty", key_file.display());
                Ok(None)
            } else {
                Ok(Some(secret.to_string()))
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn write_key_file(key_file: &Path, secret: &str) -> io::Result<()> {
    if let Some(dir) = key_file.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(key_file)?;
    file.write_all(secret.as_bytes())?;
    file.write_all(b"\n")
}
