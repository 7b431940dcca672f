//! Error types for the binding.
//!
//! Native failures are reported through two channels that get merged here:
//! the errno readable via `alpm_errno` once a handle exists, and the out-cell
//! passed to `alpm_initialize` for failures before one does. Either way the
//! raw code is classified into an [`ErrorKind`] so callers match on variants
//! instead of integers.

use crate::callback::CallbackKind;
use crate::transaction::TransState;
use palpm_sys as sys;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classification of a libalpm error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("out of memory")]
    Memory,
    #[error("unexpected system error")]
    System,
    #[error("insufficient privileges")]
    Permissions,
    #[error("could not find or read file")]
    NotAFile,
    #[error("could not find or read directory")]
    NotADirectory,
    #[error("wrong or null argument passed")]
    WrongArgs,
    #[error("not enough free disk space")]
    DiskSpace,
    #[error("library not initialized")]
    HandleNull,
    #[error("library already initialized")]
    HandleNotNull,
    #[error("unable to lock database")]
    HandleLock,
    #[error("could not open database")]
    DbOpen,
    #[error("could not create database")]
    DbCreate,
    #[error("database not initialized")]
    DbNull,
    #[error("database already registered")]
    DbNotNull,
    #[error("could not find database")]
    DbNotFound,
    #[error("invalid or corrupted database")]
    DbInvalid,
    #[error("invalid or corrupted database signature")]
    DbInvalidSignature,
    #[error("database is incorrect version")]
    DbVersion,
    #[error("could not update database")]
    DbWrite,
    #[error("could not remove database entry")]
    DbRemove,
    #[error("invalid url for server")]
    ServerBadUrl,
    #[error("no servers configured for repository")]
    ServerNone,
    #[error("transaction already initialized")]
    TransactionAlreadyActive,
    #[error("transaction not initialized")]
    TransactionNotInitialized,
    #[error("duplicate target")]
    TransactionDupTarget,
    #[error("duplicate filename")]
    TransactionDupFilename,
    #[error("transaction not prepared")]
    TransactionNotPrepared,
    #[error("transaction aborted")]
    TransactionAborted,
    #[error("operation not compatible with the transaction type")]
    TransactionWrongType,
    #[error("transaction commit attempted when database is not locked")]
    TransactionNotLocked,
    #[error("failed to run transaction hooks")]
    TransactionHookFailed,
    #[error("could not find or read package")]
    PackageNotFound,
    #[error("operation cancelled due to ignorepkg")]
    PackageIgnored,
    #[error("invalid or corrupted package")]
    PackageInvalid,
    #[error("invalid or corrupted package checksum")]
    PackageInvalidChecksum,
    #[error("invalid or corrupted package signature")]
    PackageInvalidSignature,
    #[error("package missing required signature")]
    PackageMissingSignature,
    #[error("cannot open package file")]
    PackageOpen,
    #[error("cannot remove all files for package")]
    PackageCannotRemove,
    #[error("package name is not valid")]
    PackageInvalidName,
    #[error("package architecture is not valid")]
    PackageInvalidArch,
    #[error("could not find repository for target")]
    PackageRepoNotFound,
    #[error("missing PGP signature")]
    SignatureMissing,
    #[error("invalid PGP signature")]
    SignatureInvalid,
    #[error("could not satisfy dependencies")]
    UnsatisfiedDependencies,
    #[error("conflicting dependencies")]
    ConflictingDependencies,
    #[error("conflicting files")]
    FileConflicts,
    #[error("failed to retrieve some files")]
    Retrieve,
    #[error("invalid regular expression")]
    InvalidRegex,
    #[error("libarchive error")]
    Libarchive,
    #[error("download library error")]
    Libcurl,
    #[error("error invoking external downloader")]
    ExternalDownload,
    #[error("gpgme error")]
    Gpgme,
    #[error("compiled without signature support")]
    MissingSignatureCapability,
    #[error("unrecognized error code {0}")]
    Unknown(i32),
}

impl ErrorKind {
    /// Classifies a raw errno.
    pub fn from_errno(errno: sys::alpm_errno_t) -> Self {
        use sys::alpm_errno_t::*;
        match errno {
            ALPM_ERR_OK => Self::Unknown(0),
            ALPM_ERR_MEMORY => Self::Memory,
            ALPM_ERR_SYSTEM => Self::System,
            ALPM_ERR_BADPERMS => Self::Permissions,
            ALPM_ERR_NOT_A_FILE => Self::NotAFile,
            ALPM_ERR_NOT_A_DIR => Self::NotADirectory,
            ALPM_ERR_WRONG_ARGS => Self::WrongArgs,
            ALPM_ERR_DISK_SPACE => Self::DiskSpace,
            ALPM_ERR_HANDLE_NULL => Self::HandleNull,
            ALPM_ERR_HANDLE_NOT_NULL => Self::HandleNotNull,
            ALPM_ERR_HANDLE_LOCK => Self::HandleLock,
            ALPM_ERR_DB_OPEN => Self::DbOpen,
            ALPM_ERR_DB_CREATE => Self::DbCreate,
            ALPM_ERR_DB_NULL => Self::DbNull,
            ALPM_ERR_DB_NOT_NULL => Self::DbNotNull,
            ALPM_ERR_DB_NOT_FOUND => Self::DbNotFound,
            ALPM_ERR_DB_INVALID => Self::DbInvalid,
            ALPM_ERR_DB_INVALID_SIG => Self::DbInvalidSignature,
            ALPM_ERR_DB_VERSION => Self::DbVersion,
            ALPM_ERR_DB_WRITE => Self::DbWrite,
            ALPM_ERR_DB_REMOVE => Self::DbRemove,
            ALPM_ERR_SERVER_BAD_URL => Self::ServerBadUrl,
            ALPM_ERR_SERVER_NONE => Self::ServerNone,
            ALPM_ERR_TRANS_NOT_NULL => Self::TransactionAlreadyActive,
            ALPM_ERR_TRANS_NULL => Self::TransactionNotInitialized,
            ALPM_ERR_TRANS_DUP_TARGET => Self::TransactionDupTarget,
            ALPM_ERR_TRANS_DUP_FILENAME => Self::TransactionDupFilename,
            ALPM_ERR_TRANS_NOT_INITIALIZED => Self::TransactionNotInitialized,
            ALPM_ERR_TRANS_NOT_PREPARED => Self::TransactionNotPrepared,
            ALPM_ERR_TRANS_ABORT => Self::TransactionAborted,
            ALPM_ERR_TRANS_TYPE => Self::TransactionWrongType,
            ALPM_ERR_TRANS_NOT_LOCKED => Self::TransactionNotLocked,
            ALPM_ERR_TRANS_HOOK_FAILED => Self::TransactionHookFailed,
            ALPM_ERR_PKG_NOT_FOUND => Self::PackageNotFound,
            ALPM_ERR_PKG_IGNORED => Self::PackageIgnored,
            ALPM_ERR_PKG_INVALID => Self::PackageInvalid,
            ALPM_ERR_PKG_INVALID_CHECKSUM => Self::PackageInvalidChecksum,
            ALPM_ERR_PKG_INVALID_SIG => Self::PackageInvalidSignature,
            ALPM_ERR_PKG_MISSING_SIG => Self::PackageMissingSignature,
            ALPM_ERR_PKG_OPEN => Self::PackageOpen,
            ALPM_ERR_PKG_CANT_REMOVE => Self::PackageCannotRemove,
            ALPM_ERR_PKG_INVALID_NAME => Self::PackageInvalidName,
            ALPM_ERR_PKG_INVALID_ARCH => Self::PackageInvalidArch,
            ALPM_ERR_PKG_REPO_NOT_FOUND => Self::PackageRepoNotFound,
            ALPM_ERR_SIG_MISSING => Self::SignatureMissing,
            ALPM_ERR_SIG_INVALID => Self::SignatureInvalid,
            ALPM_ERR_UNSATISFIED_DEPS => Self::UnsatisfiedDependencies,
            ALPM_ERR_CONFLICTING_DEPS => Self::ConflictingDependencies,
            ALPM_ERR_FILE_CONFLICTS => Self::FileConflicts,
            ALPM_ERR_RETRIEVE => Self::Retrieve,
            ALPM_ERR_INVALID_REGEX => Self::InvalidRegex,
            ALPM_ERR_LIBARCHIVE => Self::Libarchive,
            ALPM_ERR_LIBCURL => Self::Libcurl,
            ALPM_ERR_EXTERNAL_DOWNLOAD => Self::ExternalDownload,
            ALPM_ERR_GPGME => Self::Gpgme,
            ALPM_ERR_MISSING_CAPABILITY_SIGNATURES => Self::MissingSignatureCapability,
        }
    }
}

/// Errors surfaced by the binding.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A native call reported failure; the errno classified at the moment
    /// the failure was observed.
    #[error("native error: {0}")]
    Native(ErrorKind),

    /// An operation was invoked on an object whose native resource has
    /// already been released.
    #[error("{0} used after release")]
    UseAfterRelease(&'static str),

    /// An argument could not be passed across the C boundary.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Installing one of the callback slots failed; earlier slots from the
    /// same registration have been rolled back.
    #[error("failed to register {kind} callback")]
    CallbackRegistration {
        kind: CallbackKind,
        #[source]
        source: Box<Error>,
    },

    /// A package-scoped operation failed.
    #[error("operation on package {name:?} failed")]
    Package {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// An operation was invoked in the wrong transaction phase.
    #[error("transaction is {actual}, expected {expected}")]
    TransactionState {
        expected: TransState,
        actual: TransState,
    },

    /// Commit failed; `details` holds the native detail strings, already
    /// drained out of the commit out-list.
    #[error("transaction commit failed: {kind}")]
    Commit { kind: ErrorKind, details: Vec<String> },

    /// A positional list access past the end.
    #[error("list index {index} out of bounds (len {len})")]
    OutOfBounds { index: usize, len: usize },

    /// A cursor read before the first `advance` or after exhaustion.
    #[error("cursor is not positioned on an element")]
    CursorOutOfPosition,
}

impl Error {
    /// Wraps a raw errno as a structured error.
    pub fn from_errno(errno: sys::alpm_errno_t) -> Self {
        Self::Native(ErrorKind::from_errno(errno))
    }

    /// The native error classification behind this error, if any, looking
    /// through the wrapping variants.
    pub fn native_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Native(kind) => Some(*kind),
            Self::Commit { kind, .. } => Some(*kind),
            Self::CallbackRegistration { source, .. } | Self::Package { source, .. } => {
                source.native_kind()
            }
            _ => None,
        }
    }
}
