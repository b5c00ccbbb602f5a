use std::fmt::{self, Display};

/// A central error enum for failures reported by OS collaborators.
#[derive(Debug)]
pub enum HostError {
    /// The named object (service, process, variable) does not exist.
    NotFound(String),
    /// The request itself is unacceptable (bad name, bad action).
    InvalidInput(String),
    /// The host cannot perform this operation at all.
    Unsupported(String),
    IoError(std::io::Error),
    Other(String),
}

impl HostError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostError::NotFound(_))
    }
}

/// Convert from std::io::Error.
impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> HostError {
        HostError::IoError(err)
    }
}

impl Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::NotFound(msg) => write!(f, "Not found: {}", msg),
            HostError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            HostError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            HostError::IoError(e) => write!(f, "IO error: {}", e),
            HostError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HostError::IoError(e) => Some(e),
            _ => None,
        }
    }
}
