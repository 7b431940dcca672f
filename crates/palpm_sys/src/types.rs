//! C ABI type definitions for libalpm.

use libc::{c_char, c_int, c_ulong, c_void};

/// Opaque libalpm handle.
#[repr(C)]
pub struct alpm_handle_t {
    _private: [u8; 0],
}

/// Opaque database.
#[repr(C)]
pub struct alpm_db_t {
    _private: [u8; 0],
}

/// Opaque package.
#[repr(C)]
pub struct alpm_pkg_t {
    _private: [u8; 0],
}

/// One spine node of libalpm's linked list.
///
/// The binding treats lists as singly linked: only `data` and `next` are ever
/// read. `prev` exists for ABI fidelity (libalpm keeps lists doubly linked).
#[repr(C)]
pub struct alpm_list_t {
    /// Payload pointer. Its ownership is a property of the list, not the node.
    pub data: *mut c_void,
    /// Previous node (unused by the binding).
    pub prev: *mut alpm_list_t,
    /// Next node, null at the tail.
    pub next: *mut alpm_list_t,
}

/// Free function signature accepted by `alpm_list_free_inner`.
pub type alpm_list_fn_free = unsafe extern "C" fn(*mut c_void);

/// libalpm error codes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum alpm_errno_t {
    ALPM_ERR_OK = 0,
    ALPM_ERR_MEMORY,
    ALPM_ERR_SYSTEM,
    ALPM_ERR_BADPERMS,
    ALPM_ERR_NOT_A_FILE,
    ALPM_ERR_NOT_A_DIR,
    ALPM_ERR_WRONG_ARGS,
    ALPM_ERR_DISK_SPACE,
    ALPM_ERR_HANDLE_NULL,
    ALPM_ERR_HANDLE_NOT_NULL,
    ALPM_ERR_HANDLE_LOCK,
    ALPM_ERR_DB_OPEN,
    ALPM_ERR_DB_CREATE,
    ALPM_ERR_DB_NULL,
    ALPM_ERR_DB_NOT_NULL,
    ALPM_ERR_DB_NOT_FOUND,
    ALPM_ERR_DB_INVALID,
    ALPM_ERR_DB_INVALID_SIG,
    ALPM_ERR_DB_VERSION,
    ALPM_ERR_DB_WRITE,
    ALPM_ERR_DB_REMOVE,
    ALPM_ERR_SERVER_BAD_URL,
    ALPM_ERR_SERVER_NONE,
    ALPM_ERR_TRANS_NOT_NULL,
    ALPM_ERR_TRANS_NULL,
    ALPM_ERR_TRANS_DUP_TARGET,
    ALPM_ERR_TRANS_DUP_FILENAME,
    ALPM_ERR_TRANS_NOT_INITIALIZED,
    ALPM_ERR_TRANS_NOT_PREPARED,
    ALPM_ERR_TRANS_ABORT,
    ALPM_ERR_TRANS_TYPE,
    ALPM_ERR_TRANS_NOT_LOCKED,
    ALPM_ERR_TRANS_HOOK_FAILED,
    ALPM_ERR_PKG_NOT_FOUND,
    ALPM_ERR_PKG_IGNORED,
    ALPM_ERR_PKG_INVALID,
    ALPM_ERR_PKG_INVALID_CHECKSUM,
    ALPM_ERR_PKG_INVALID_SIG,
    ALPM_ERR_PKG_MISSING_SIG,
    ALPM_ERR_PKG_OPEN,
    ALPM_ERR_PKG_CANT_REMOVE,
    ALPM_ERR_PKG_INVALID_NAME,
    ALPM_ERR_PKG_INVALID_ARCH,
    ALPM_ERR_PKG_REPO_NOT_FOUND,
    ALPM_ERR_SIG_MISSING,
    ALPM_ERR_SIG_INVALID,
    ALPM_ERR_UNSATISFIED_DEPS,
    ALPM_ERR_CONFLICTING_DEPS,
    ALPM_ERR_FILE_CONFLICTS,
    ALPM_ERR_RETRIEVE,
    ALPM_ERR_INVALID_REGEX,
    ALPM_ERR_LIBARCHIVE,
    ALPM_ERR_LIBCURL,
    ALPM_ERR_EXTERNAL_DOWNLOAD,
    ALPM_ERR_GPGME,
    ALPM_ERR_MISSING_CAPABILITY_SIGNATURES,
}

/// Dependency version comparison operators.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum alpm_depmod_t {
    ALPM_DEP_MOD_ANY = 1,
    ALPM_DEP_MOD_EQ,
    ALPM_DEP_MOD_GE,
    ALPM_DEP_MOD_LE,
    ALPM_DEP_MOD_GT,
    ALPM_DEP_MOD_LT,
}

/// A dependency specification.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_depend_t {
    pub name: *mut c_char,
    pub version: *mut c_char,
    pub desc: *mut c_char,
    pub name_hash: c_ulong,
    pub mod_: alpm_depmod_t,
}

/// A missing-dependency record produced by `alpm_trans_prepare`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_depmissing_t {
    pub target: *mut c_char,
    pub depend: *mut alpm_depend_t,
    pub causingpkg: *mut c_char,
}

/// A package conflict record.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_conflict_t {
    pub package1_hash: c_ulong,
    pub package2_hash: c_ulong,
    pub package1: *mut c_char,
    pub package2: *mut c_char,
    pub reason: *mut alpm_depend_t,
}

/// Transaction flag bits (`alpm_transflag_t`).
pub const ALPM_TRANS_FLAG_NODEPS: u32 = 1;
pub const ALPM_TRANS_FLAG_NOSAVE: u32 = 1 << 2;
pub const ALPM_TRANS_FLAG_NODEPVERSION: u32 = 1 << 3;
pub const ALPM_TRANS_FLAG_CASCADE: u32 = 1 << 4;
pub const ALPM_TRANS_FLAG_RECURSE: u32 = 1 << 5;
pub const ALPM_TRANS_FLAG_DBONLY: u32 = 1 << 6;
pub const ALPM_TRANS_FLAG_NOHOOKS: u32 = 1 << 7;
pub const ALPM_TRANS_FLAG_ALLDEPS: u32 = 1 << 8;
pub const ALPM_TRANS_FLAG_DOWNLOADONLY: u32 = 1 << 9;
pub const ALPM_TRANS_FLAG_NOSCRIPTLET: u32 = 1 << 10;
pub const ALPM_TRANS_FLAG_NOCONFLICTS: u32 = 1 << 11;
pub const ALPM_TRANS_FLAG_NEEDED: u32 = 1 << 13;
pub const ALPM_TRANS_FLAG_ALLEXPLICIT: u32 = 1 << 14;
pub const ALPM_TRANS_FLAG_UNNEEDED: u32 = 1 << 15;
pub const ALPM_TRANS_FLAG_RECURSEALL: u32 = 1 << 16;
pub const ALPM_TRANS_FLAG_NOLOCK: u32 = 1 << 17;

/// Event discriminants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum alpm_event_type_t {
    ALPM_EVENT_CHECKDEPS_START = 1,
    ALPM_EVENT_CHECKDEPS_DONE,
    ALPM_EVENT_FILECONFLICTS_START,
    ALPM_EVENT_FILECONFLICTS_DONE,
    ALPM_EVENT_RESOLVEDEPS_START,
    ALPM_EVENT_RESOLVEDEPS_DONE,
    ALPM_EVENT_INTERCONFLICTS_START,
    ALPM_EVENT_INTERCONFLICTS_DONE,
    ALPM_EVENT_TRANSACTION_START,
    ALPM_EVENT_TRANSACTION_DONE,
    ALPM_EVENT_PACKAGE_OPERATION_START,
    ALPM_EVENT_PACKAGE_OPERATION_DONE,
    ALPM_EVENT_INTEGRITY_START,
    ALPM_EVENT_INTEGRITY_DONE,
    ALPM_EVENT_LOAD_START,
    ALPM_EVENT_LOAD_DONE,
    ALPM_EVENT_SCRIPTLET_INFO,
    ALPM_EVENT_DB_RETRIEVE_START,
    ALPM_EVENT_DB_RETRIEVE_DONE,
    ALPM_EVENT_DB_RETRIEVE_FAILED,
    ALPM_EVENT_PKG_RETRIEVE_START,
    ALPM_EVENT_PKG_RETRIEVE_DONE,
    ALPM_EVENT_PKG_RETRIEVE_FAILED,
    ALPM_EVENT_DISKSPACE_START,
    ALPM_EVENT_DISKSPACE_DONE,
    ALPM_EVENT_OPTDEP_REMOVAL,
    ALPM_EVENT_DATABASE_MISSING,
    ALPM_EVENT_KEYRING_START,
    ALPM_EVENT_KEYRING_DONE,
    ALPM_EVENT_KEY_DOWNLOAD_START,
    ALPM_EVENT_KEY_DOWNLOAD_DONE,
    ALPM_EVENT_PACNEW_CREATED,
    ALPM_EVENT_PACSAVE_CREATED,
    ALPM_EVENT_HOOK_START,
    ALPM_EVENT_HOOK_DONE,
    ALPM_EVENT_HOOK_RUN_START,
    ALPM_EVENT_HOOK_RUN_DONE,
}

impl alpm_event_type_t {
    /// Every discriminant, in declaration order.
    pub const ALL: [Self; 37] = [
        Self::ALPM_EVENT_CHECKDEPS_START,
        Self::ALPM_EVENT_CHECKDEPS_DONE,
        Self::ALPM_EVENT_FILECONFLICTS_START,
        Self::ALPM_EVENT_FILECONFLICTS_DONE,
        Self::ALPM_EVENT_RESOLVEDEPS_START,
        Self::ALPM_EVENT_RESOLVEDEPS_DONE,
        Self::ALPM_EVENT_INTERCONFLICTS_START,
        Self::ALPM_EVENT_INTERCONFLICTS_DONE,
        Self::ALPM_EVENT_TRANSACTION_START,
        Self::ALPM_EVENT_TRANSACTION_DONE,
        Self::ALPM_EVENT_PACKAGE_OPERATION_START,
        Self::ALPM_EVENT_PACKAGE_OPERATION_DONE,
        Self::ALPM_EVENT_INTEGRITY_START,
        Self::ALPM_EVENT_INTEGRITY_DONE,
        Self::ALPM_EVENT_LOAD_START,
        Self::ALPM_EVENT_LOAD_DONE,
        Self::ALPM_EVENT_SCRIPTLET_INFO,
        Self::ALPM_EVENT_DB_RETRIEVE_START,
        Self::ALPM_EVENT_DB_RETRIEVE_DONE,
        Self::ALPM_EVENT_DB_RETRIEVE_FAILED,
        Self::ALPM_EVENT_PKG_RETRIEVE_START,
        Self::ALPM_EVENT_PKG_RETRIEVE_DONE,
        Self::ALPM_EVENT_PKG_RETRIEVE_FAILED,
        Self::ALPM_EVENT_DISKSPACE_START,
        Self::ALPM_EVENT_DISKSPACE_DONE,
        Self::ALPM_EVENT_OPTDEP_REMOVAL,
        Self::ALPM_EVENT_DATABASE_MISSING,
        Self::ALPM_EVENT_KEYRING_START,
        Self::ALPM_EVENT_KEYRING_DONE,
        Self::ALPM_EVENT_KEY_DOWNLOAD_START,
        Self::ALPM_EVENT_KEY_DOWNLOAD_DONE,
        Self::ALPM_EVENT_PACNEW_CREATED,
        Self::ALPM_EVENT_PACSAVE_CREATED,
        Self::ALPM_EVENT_HOOK_START,
        Self::ALPM_EVENT_HOOK_DONE,
        Self::ALPM_EVENT_HOOK_RUN_START,
        Self::ALPM_EVENT_HOOK_RUN_DONE,
    ];

    /// Looks up the discriminant for a raw event code.
    pub fn from_code(code: c_int) -> Option<Self> {
        Self::ALL.into_iter().find(|v| *v as c_int == code)
    }
}

/// Package operation kinds for `ALPM_EVENT_PACKAGE_OPERATION_*`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum alpm_package_operation_t {
    ALPM_PACKAGE_INSTALL = 1,
    ALPM_PACKAGE_UPGRADE,
    ALPM_PACKAGE_REINSTALL,
    ALPM_PACKAGE_DOWNGRADE,
    ALPM_PACKAGE_REMOVE,
}

/// Hook phases.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum alpm_hook_when_t {
    ALPM_HOOK_PRE_TRANSACTION = 1,
    ALPM_HOOK_POST_TRANSACTION,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_any_t {
    pub type_: alpm_event_type_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_package_operation_t {
    pub type_: alpm_event_type_t,
    pub operation: alpm_package_operation_t,
    pub oldpkg: *mut alpm_pkg_t,
    pub newpkg: *mut alpm_pkg_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_optdep_removal_t {
    pub type_: alpm_event_type_t,
    pub pkg: *mut alpm_pkg_t,
    pub optdep: *mut alpm_depend_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_scriptlet_info_t {
    pub type_: alpm_event_type_t,
    pub line: *const c_char,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_database_missing_t {
    pub type_: alpm_event_type_t,
    pub dbname: *const c_char,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_pkg_retrieve_t {
    pub type_: alpm_event_type_t,
    pub num: usize,
    pub total_size: i64,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_pacnew_created_t {
    pub type_: alpm_event_type_t,
    pub from_noupgrade: c_int,
    pub oldpkg: *mut alpm_pkg_t,
    pub newpkg: *mut alpm_pkg_t,
    pub file: *const c_char,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_pacsave_created_t {
    pub type_: alpm_event_type_t,
    pub oldpkg: *mut alpm_pkg_t,
    pub file: *const c_char,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_hook_t {
    pub type_: alpm_event_type_t,
    pub when: alpm_hook_when_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_event_hook_run_t {
    pub type_: alpm_event_type_t,
    pub name: *const c_char,
    pub desc: *const c_char,
    pub position: usize,
    pub total: usize,
}

/// The event payload union passed to the event callback.
#[repr(C)]
#[derive(Clone, Copy)]
pub union alpm_event_t {
    pub type_: alpm_event_type_t,
    pub any: alpm_event_any_t,
    pub package_operation: alpm_event_package_operation_t,
    pub optdep_removal: alpm_event_optdep_removal_t,
    pub scriptlet_info: alpm_event_scriptlet_info_t,
    pub database_missing: alpm_event_database_missing_t,
    pub pkg_retrieve: alpm_event_pkg_retrieve_t,
    pub pacnew_created: alpm_event_pacnew_created_t,
    pub pacsave_created: alpm_event_pacsave_created_t,
    pub hook: alpm_event_hook_t,
    pub hook_run: alpm_event_hook_run_t,
}

/// Question discriminants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum alpm_question_type_t {
    ALPM_QUESTION_INSTALL_IGNOREPKG = 1,
    ALPM_QUESTION_REPLACE_PKG = 1 << 1,
    ALPM_QUESTION_CONFLICT_PKG = 1 << 2,
    ALPM_QUESTION_CORRUPTED_PKG = 1 << 3,
    ALPM_QUESTION_REMOVE_PKGS = 1 << 4,
    ALPM_QUESTION_SELECT_PROVIDER = 1 << 5,
    ALPM_QUESTION_IMPORT_KEY = 1 << 6,
}

impl alpm_question_type_t {
    /// Every discriminant, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::ALPM_QUESTION_INSTALL_IGNOREPKG,
        Self::ALPM_QUESTION_REPLACE_PKG,
        Self::ALPM_QUESTION_CONFLICT_PKG,
        Self::ALPM_QUESTION_CORRUPTED_PKG,
        Self::ALPM_QUESTION_REMOVE_PKGS,
        Self::ALPM_QUESTION_SELECT_PROVIDER,
        Self::ALPM_QUESTION_IMPORT_KEY,
    ];

    /// Looks up the discriminant for a raw question code.
    pub fn from_code(code: c_int) -> Option<Self> {
        Self::ALL.into_iter().find(|v| *v as c_int == code)
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_question_any_t {
    pub type_: alpm_question_type_t,
    pub answer: c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_question_install_ignorepkg_t {
    pub type_: alpm_question_type_t,
    pub install: c_int,
    pub pkg: *mut c_char,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_question_replace_t {
    pub type_: alpm_question_type_t,
    pub replace: c_int,
    pub oldpkg: *mut c_char,
    pub newpkg: *mut c_char,
    pub newdb: *mut c_char,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_question_conflict_t {
    pub type_: alpm_question_type_t,
    pub remove: c_int,
    pub conflict: *mut alpm_conflict_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_question_corrupted_t {
    pub type_: alpm_question_type_t,
    pub remove: c_int,
    pub filepath: *mut c_char,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_question_remove_pkgs_t {
    pub type_: alpm_question_type_t,
    pub skip: c_int,
    pub packages: *mut alpm_list_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_question_select_provider_t {
    pub type_: alpm_question_type_t,
    pub use_index: c_int,
    pub providers: *mut alpm_list_t,
    pub depend: *mut alpm_depend_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct alpm_question_import_key_t {
    pub type_: alpm_question_type_t,
    pub import: c_int,
    pub uid: *mut c_char,
    pub fingerprint: *mut c_char,
}

/// The question payload union passed to the question callback.
#[repr(C)]
#[derive(Clone, Copy)]
pub union alpm_question_t {
    pub type_: alpm_question_type_t,
    pub any: alpm_question_any_t,
    pub install_ignorepkg: alpm_question_install_ignorepkg_t,
    pub replace: alpm_question_replace_t,
    pub conflict: alpm_question_conflict_t,
    pub corrupted: alpm_question_corrupted_t,
    pub remove_pkgs: alpm_question_remove_pkgs_t,
    pub select_provider: alpm_question_select_provider_t,
    pub import_key: alpm_question_import_key_t,
}

/// Progress callback kinds.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum alpm_progress_t {
    ALPM_PROGRESS_ADD_START = 0,
    ALPM_PROGRESS_UPGRADE_START,
    ALPM_PROGRESS_DOWNGRADE_START,
    ALPM_PROGRESS_REINSTALL_START,
    ALPM_PROGRESS_REMOVE_START,
    ALPM_PROGRESS_CONFLICTS_START,
    ALPM_PROGRESS_DISKSPACE_START,
    ALPM_PROGRESS_INTEGRITY_START,
    ALPM_PROGRESS_LOAD_START,
    ALPM_PROGRESS_KEYRING_START,
}

/// Event callback: `(ctx, event)`.
pub type alpm_cb_event = Option<unsafe extern "C" fn(ctx: *mut c_void, event: *mut alpm_event_t)>;

/// Fetch callback: `(ctx, url, localpath, force) -> c_int`.
///
/// The return value is part of libalpm's retry/skip contract: -1 on error,
/// 0 on success, 1 if the file is already up to date.
pub type alpm_cb_fetch = Option<
    unsafe extern "C" fn(
        ctx: *mut c_void,
        url: *const c_char,
        localpath: *const c_char,
        force: c_int,
    ) -> c_int,
>;

/// Question callback: `(ctx, question)`.
pub type alpm_cb_question =
    Option<unsafe extern "C" fn(ctx: *mut c_void, question: *mut alpm_question_t)>;

/// Progress callback: `(ctx, kind, pkgname, percent, howmany, current)`.
pub type alpm_cb_progress = Option<
    unsafe extern "C" fn(
        ctx: *mut c_void,
        progress: alpm_progress_t,
        pkgname: *const c_char,
        percent: c_int,
        howmany: usize,
        current: usize,
    ),
>;
