//! Crate-wide error taxonomy.
//!
//! One flat, nested `thiserror` enum covering every failure kind the core
//! can surface, per the propagation policy: contention, transient network
//! failures and integrity errors are recovered locally and never reach this
//! type; everything else is surfaced through it. Display strings never end
//! in punctuation and do not capitalize the first word unless it is a
//! proper noun; subjects are single-quoted.

use std::path::PathBuf;

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

/// Lock-specific failure kinds.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Lock could not be acquired before `max_wait` elapsed.
    #[error("timed out waiting for lock on '{0}'")]
    Timeout(PathBuf),

    /// Our lock was reclaimed by another process after we went stale; the
    /// release is still a no-op success, this variant is only surfaced by
    /// operations that actively assert ownership.
    #[error("lock on '{0}' was stolen by another process")]
    Stolen(PathBuf),
}

/// Integrity-validation failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum IntegrityKind {
    /// Path does not exist at all.
    #[error("not_exists")]
    NotExists,
    /// Path exists but is not a repository of the expected shape.
    #[error("not_repo")]
    NotRepo,
    /// Generic corruption signalled by a non-zero subprocess exit.
    #[error("corrupted")]
    Corrupted,
    /// Refs subtree is missing or contains no heads.
    #[error("missing_refs")]
    MissingRefs,
    /// Store has no history at all.
    #[error("empty_repo")]
    EmptyRepo,
    /// Checkout has no alternates file.
    #[error("no_alternates")]
    NoAlternates,
    /// Checkout's alternates file exists but does not point at the
    /// expected store.
    #[error("wrong_alternates")]
    WrongAlternates,
    /// Path is not usable as a filesystem path (e.g. escapes the roots).
    #[error("invalid_path")]
    InvalidPath,
    /// A repair attempt failed and the backup could not be restored.
    #[error("repair_failed")]
    RepairFailed,
}

/// Metadata-store failure kinds.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// No metadata file at the expected sidecar path.
    #[error("no metadata found at '{0}'")]
    NotFound(PathBuf),
    /// Metadata file exists but failed to parse or carried an unknown tag.
    #[error("metadata at '{0}' is corrupt: {1}")]
    Corrupt(PathBuf, String),
    /// I/O failure while reading or writing the metadata file.
    #[error("i/o error on metadata '{0}': {1}")]
    Io(PathBuf, String),
}

/// The crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller passed a malformed argument (bad `RepoId`, bad URL, a clean
    /// target equal to a filesystem root).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded or contained an invalid value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A subprocess or HTTP call failed for network reasons, after
    /// exhausting retries.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem operation failed outside of the metadata/lock subsystems.
    #[error("filesystem error at '{0}': {1}")]
    Filesystem(PathBuf, String),

    /// The version-control subprocess exited non-zero.
    #[error("vcs subprocess failed: {0}")]
    VcsSubprocess(String),

    /// The hosting-provider API reported a failure.
    #[error("provider api error: {0}")]
    ProviderApi(String),

    /// Lock-manager failure.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Integrity-engine failure, carrying the path it was validating.
    #[error("integrity error for '{path}': {kind}")]
    Integrity {
        /// The path under validation.
        path: PathBuf,
        /// The specific taxonomy member.
        kind: IntegrityKind,
    },

    /// Metadata-store failure.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The filesystem reported no space left on the device.
    #[error("out of space writing '{0}'")]
    OutOfSpace(PathBuf),

    /// Anything else — should be rare and is always a bug if seen in
    /// normal operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an [`Error::Integrity`] for `path` with the given `kind`.
    #[must_use]
    pub fn integrity(path: impl Into<PathBuf>, kind: IntegrityKind) -> Self {
        Self::Integrity {
            path: path.into(),
            kind,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::OutOfMemory {
            return Self::Internal(err.to_string());
        }
        if err.raw_os_error() == Some(28) {
            return Self::OutOfSpace(PathBuf::new());
        }
        Self::Filesystem(PathBuf::new(), err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("json error: {err}"))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
