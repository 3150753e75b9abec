use serde::{Deserialize, Serialize};

/// Error taxonomy shared by the host, plugins, and embedders.
///
/// Script-visible failures carry a stable [`ErrorKind`] so calling code can
/// branch on the kind without string matching.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("malformed identifier '{raw}': {reason}")]
    MalformedIdentifier { raw: String, reason: String },
    #[error("alias cycle introduced by pattern '{pattern}'")]
    AliasCycle { pattern: String },
    #[error("duplicate registration for module '{id}'")]
    DuplicateRegistration { id: String },
    #[error("registry is sealed; registrations are only accepted during startup")]
    RegistrySealed,
    #[error("extension point '{name}' is already registered")]
    DuplicatePoint { name: String },
    #[error("unknown extension point '{name}'")]
    UnknownPoint { name: String },
    #[error("module not found: '{id}'")]
    ModuleNotFound { id: String },
    #[error("module '{id}' failed to initialize")]
    ModuleInitializationFailed {
        id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("extension '{location}' failed validation: {reason}")]
    ExtensionValidationFailed { location: String, reason: String },
    #[error("extension loading cancelled; {remaining} descriptor(s) not attempted")]
    LoadCancelled { remaining: usize },
}

/// Stable, inspectable discriminant of a [`HostError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MalformedIdentifier,
    AliasCycle,
    DuplicateRegistration,
    RegistrySealed,
    DuplicatePoint,
    UnknownPoint,
    ModuleNotFound,
    ModuleInitializationFailed,
    ExtensionValidationFailed,
    LoadCancelled,
}

impl HostError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HostError::MalformedIdentifier { .. } => ErrorKind::MalformedIdentifier,
            HostError::AliasCycle { .. } => ErrorKind::AliasCycle,
            HostError::DuplicateRegistration { .. } => ErrorKind::DuplicateRegistration,
            HostError::RegistrySealed => ErrorKind::RegistrySealed,
            HostError::DuplicatePoint { .. } => ErrorKind::DuplicatePoint,
            HostError::UnknownPoint { .. } => ErrorKind::UnknownPoint,
            HostError::ModuleNotFound { .. } => ErrorKind::ModuleNotFound,
            HostError::ModuleInitializationFailed { .. } => ErrorKind::ModuleInitializationFailed,
            HostError::ExtensionValidationFailed { .. } => ErrorKind::ExtensionValidationFailed,
            HostError::LoadCancelled { .. } => ErrorKind::LoadCancelled,
        }
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;
