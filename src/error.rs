//! Error types for the API group registry

use thiserror::Error;

use crate::version::{GroupVersion, GroupVersionKind};

/// Result type for installer operations
pub type Result<T, E = InstallError> = std::result::Result<T, E>;

/// GroupVersion parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("unexpected GroupVersion string: {0}")]
    TooManySegments(String),

    #[error("invalid group name {0:?}")]
    InvalidGroup(String),

    #[error("invalid version {0:?}")]
    InvalidVersion(String),
}

/// Shared registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("attempted to enable an unregistered version {0}")]
    UnregisteredVersion(GroupVersion),

    #[error("the group {0:?} has already been registered")]
    GroupAlreadyRegistered(String),
}

/// Scheme errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    #[error("double registration of different types for {gvk}: old={existing}, new={requested}")]
    TypeConflict {
        gvk: GroupVersionKind,
        existing: String,
        requested: String,
    },

    #[error("no kind {kind:?} is registered for version {version:?}")]
    NotRegistered { kind: String, version: String },

    #[error("object has no apiVersion or kind")]
    MissingTypeMeta,

    #[error("invalid apiVersion: {0}")]
    InvalidApiVersion(#[from] VersionParseError),

    #[error("conversion from {from} to {to} failed: {reason}")]
    ConversionFailed {
        from: GroupVersionKind,
        to: GroupVersionKind,
        reason: String,
    },

    #[error("field label not supported: {label} (kind {kind}, version {version})")]
    FieldLabelNotSupported {
        version: GroupVersion,
        kind: String,
        label: String,
    },
}

/// Metadata accessor errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessorError {
    #[error("object is not a JSON object")]
    NotAnObject,

    #[error("field {0} has an unexpected type")]
    InvalidField(&'static str),
}

/// REST mapping and interfaces resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapperError {
    #[error("unsupported storage version: {version} (valid: [{}])", join_versions(.valid))]
    UnsupportedStorageVersion {
        version: GroupVersion,
        valid: Vec<GroupVersion>,
    },

    #[error("no matches for kind {kind:?} in group {group:?}")]
    NoKindMatch { group: String, kind: String },

    #[error("no matches for resource {0}")]
    NoResourceMatch(String),

    #[error("resource {resource} matches multiple kinds: {}", .matches.join(", "))]
    AmbiguousResource {
        resource: String,
        matches: Vec<String>,
    },
}

fn join_versions(versions: &[GroupVersion]) -> String {
    versions
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Group installation errors
///
/// Everything here is fatal at startup: the host process is expected to
/// abort when `install_group` returns one of these.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("scheme error: {0}")]
    Scheme(#[from] SchemeError),

    #[error("no enabled versions supplied for group {0:?}")]
    NoVersions(String),

    #[error("group {group:?} declares version {version} of another group")]
    ForeignVersion { group: String, version: GroupVersion },

    #[error("post-install hook for group {group:?} failed: {source}")]
    Hook {
        group: String,
        #[source]
        source: Box<InstallError>,
    },
}
