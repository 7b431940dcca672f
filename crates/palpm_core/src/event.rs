//! Decoding of the native event union into an owned enum.
//!
//! Events arrive on the native callback stack as a tagged union; the decoder
//! copies everything it needs into owned values so the handler never sees a
//! native pointer. Decoding is a pure read of the payload selected by the
//! discriminant.

use crate::util::{lossy_string, opt_string};
use libc::c_int;
use palpm_sys as sys;

/// What a package operation event is doing to the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageOperation {
    Install,
    Upgrade,
    Reinstall,
    Downgrade,
    Remove,
}

impl PackageOperation {
    fn decode(op: sys::alpm_package_operation_t) -> Self {
        use sys::alpm_package_operation_t::*;
        match op {
            ALPM_PACKAGE_INSTALL => Self::Install,
            ALPM_PACKAGE_UPGRADE => Self::Upgrade,
            ALPM_PACKAGE_REINSTALL => Self::Reinstall,
            ALPM_PACKAGE_DOWNGRADE => Self::Downgrade,
            ALPM_PACKAGE_REMOVE => Self::Remove,
        }
    }
}

/// Which side of the transaction a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookWhen {
    PreTransaction,
    PostTransaction,
}

impl HookWhen {
    fn decode(when: sys::alpm_hook_when_t) -> Self {
        match when {
            sys::alpm_hook_when_t::ALPM_HOOK_PRE_TRANSACTION => Self::PreTransaction,
            sys::alpm_hook_when_t::ALPM_HOOK_POST_TRANSACTION => Self::PostTransaction,
        }
    }
}

/// A decoded libalpm event.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Event {
    CheckDepsStart,
    CheckDepsDone,
    FileConflictsStart,
    FileConflictsDone,
    ResolveDepsStart,
    ResolveDepsDone,
    InterConflictsStart,
    InterConflictsDone,
    TransactionStart,
    TransactionDone,
    PackageOperationStart {
        operation: PackageOperation,
        old_package: Option<String>,
        new_package: Option<String>,
    },
    PackageOperationDone {
        operation: PackageOperation,
        old_package: Option<String>,
        new_package: Option<String>,
    },
    IntegrityStart,
    IntegrityDone,
    LoadStart,
    LoadDone,
    /// A line of scriptlet output, forwarded verbatim.
    ScriptletInfo { line: String },
    DbRetrieveStart,
    DbRetrieveDone,
    DbRetrieveFailed,
    PkgRetrieveStart { num: usize, total_size: i64 },
    PkgRetrieveDone { num: usize, total_size: i64 },
    PkgRetrieveFailed { num: usize, total_size: i64 },
    DiskSpaceStart,
    DiskSpaceDone,
    OptDepRemoval {
        package: Option<String>,
        optdep: String,
    },
    DatabaseMissing { dbname: String },
    KeyringStart,
    KeyringDone,
    KeyDownloadStart,
    KeyDownloadDone,
    PacnewCreated {
        file: String,
        from_noupgrade: bool,
    },
    PacsaveCreated { file: String },
    HookStart { when: HookWhen },
    HookDone { when: HookWhen },
    HookRunStart {
        name: String,
        description: String,
        position: usize,
        total: usize,
    },
    HookRunDone {
        name: String,
        description: String,
        position: usize,
        total: usize,
    },
    /// A discriminant this binding does not know; carries the raw code.
    Unknown(i32),
}

unsafe fn pkg_name(pkg: *mut sys::alpm_pkg_t) -> Option<String> {
    if pkg.is_null() {
        None
    } else {
        opt_string(sys::alpm_pkg_get_name(pkg))
    }
}

impl Event {
    /// Decodes the native union. A null pointer or an unrecognized
    /// discriminant becomes [`Event::Unknown`].
    ///
    /// # Safety
    ///
    /// `ev` must be null or point to a live event union whose payload
    /// matches its discriminant.
    pub(crate) unsafe fn decode(ev: *mut sys::alpm_event_t) -> Self {
        if ev.is_null() {
            return Self::Unknown(0);
        }
        // Read the tag as a raw integer first; an out-of-range value must
        // not pass through the enum type.
        let code = *(ev as *const c_int);
        let Some(kind) = sys::alpm_event_type_t::from_code(code) else {
            return Self::Unknown(code);
        };

        use sys::alpm_event_type_t::*;
        match kind {
            ALPM_EVENT_CHECKDEPS_START => Self::CheckDepsStart,
            ALPM_EVENT_CHECKDEPS_DONE => Self::CheckDepsDone,
            ALPM_EVENT_FILECONFLICTS_START => Self::FileConflictsStart,
            ALPM_EVENT_FILECONFLICTS_DONE => Self::FileConflictsDone,
            ALPM_EVENT_RESOLVEDEPS_START => Self::ResolveDepsStart,
            ALPM_EVENT_RESOLVEDEPS_DONE => Self::ResolveDepsDone,
            ALPM_EVENT_INTERCONFLICTS_START => Self::InterConflictsStart,
            ALPM_EVENT_INTERCONFLICTS_DONE => Self::InterConflictsDone,
            ALPM_EVENT_TRANSACTION_START => Self::TransactionStart,
            ALPM_EVENT_TRANSACTION_DONE => Self::TransactionDone,
            ALPM_EVENT_PACKAGE_OPERATION_START | ALPM_EVENT_PACKAGE_OPERATION_DONE => {
                let payload = (*ev).package_operation;
                let operation = PackageOperation::decode(payload.operation);
                let old_package = pkg_name(payload.oldpkg);
                let new_package = pkg_name(payload.newpkg);
                if kind == ALPM_EVENT_PACKAGE_OPERATION_START {
                    Self::PackageOperationStart {
                        operation,
                        old_package,
                        new_package,
                    }
                } else {
                    Self::PackageOperationDone {
                        operation,
                        old_package,
                        new_package,
                    }
                }
            }
            ALPM_EVENT_INTEGRITY_START => Self::IntegrityStart,
            ALPM_EVENT_INTEGRITY_DONE => Self::IntegrityDone,
            ALPM_EVENT_LOAD_START => Self::LoadStart,
            ALPM_EVENT_LOAD_DONE => Self::LoadDone,
            ALPM_EVENT_SCRIPTLET_INFO => Self::ScriptletInfo {
                line: lossy_string((*ev).scriptlet_info.line),
            },
            ALPM_EVENT_DB_RETRIEVE_START => Self::DbRetrieveStart,
            ALPM_EVENT_DB_RETRIEVE_DONE => Self::DbRetrieveDone,
            ALPM_EVENT_DB_RETRIEVE_FAILED => Self::DbRetrieveFailed,
            ALPM_EVENT_PKG_RETRIEVE_START
            | ALPM_EVENT_PKG_RETRIEVE_DONE
            | ALPM_EVENT_PKG_RETRIEVE_FAILED => {
                let payload = (*ev).pkg_retrieve;
                let num = payload.num;
                let total_size = payload.total_size;
                match kind {
                    ALPM_EVENT_PKG_RETRIEVE_START => Self::PkgRetrieveStart { num, total_size },
                    ALPM_EVENT_PKG_RETRIEVE_DONE => Self::PkgRetrieveDone { num, total_size },
                    _ => Self::PkgRetrieveFailed { num, total_size },
                }
            }
            ALPM_EVENT_DISKSPACE_START => Self::DiskSpaceStart,
            ALPM_EVENT_DISKSPACE_DONE => Self::DiskSpaceDone,
            ALPM_EVENT_OPTDEP_REMOVAL => {
                let payload = (*ev).optdep_removal;
                let optdep = if payload.optdep.is_null() {
                    String::new()
                } else {
                    lossy_string((*payload.optdep).name)
                };
                Self::OptDepRemoval {
                    package: pkg_name(payload.pkg),
                    optdep,
                }
            }
            ALPM_EVENT_DATABASE_MISSING => Self::DatabaseMissing {
                dbname: lossy_string((*ev).database_missing.dbname),
            },
            ALPM_EVENT_KEYRING_START => Self::KeyringStart,
            ALPM_EVENT_KEYRING_DONE => Self::KeyringDone,
            ALPM_EVENT_KEY_DOWNLOAD_START => Self::KeyDownloadStart,
            ALPM_EVENT_KEY_DOWNLOAD_DONE => Self::KeyDownloadDone,
            ALPM_EVENT_PACNEW_CREATED => {
                let payload = (*ev).pacnew_created;
                Self::PacnewCreated {
                    file: lossy_string(payload.file),
                    from_noupgrade: payload.from_noupgrade != 0,
                }
            }
            ALPM_EVENT_PACSAVE_CREATED => Self::PacsaveCreated {
                file: lossy_string((*ev).pacsave_created.file),
            },
            ALPM_EVENT_HOOK_START => Self::HookStart {
                when: HookWhen::decode((*ev).hook.when),
            },
            ALPM_EVENT_HOOK_DONE => Self::HookDone {
                when: HookWhen::decode((*ev).hook.when),
            },
            ALPM_EVENT_HOOK_RUN_START | ALPM_EVENT_HOOK_RUN_DONE => {
                let payload = (*ev).hook_run;
                let name = lossy_string(payload.name);
                let description = lossy_string(payload.desc);
                if kind == ALPM_EVENT_HOOK_RUN_START {
                    Self::HookRunStart {
                        name,
                        description,
                        position: payload.position,
                        total: payload.total,
                    }
                } else {
                    Self::HookRunDone {
                        name,
                        description,
                        position: payload.position,
                        total: payload.total,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn decodes_payload_free_events() {
        let mut ev = sys::alpm_event_t {
            any: sys::alpm_event_any_t {
                type_: sys::alpm_event_type_t::ALPM_EVENT_CHECKDEPS_START,
            },
        };
        assert_eq!(unsafe { Event::decode(&mut ev) }, Event::CheckDepsStart);
    }

    #[test]
    fn decodes_scriptlet_info() {
        let line = CString::new("post_install: done\n").unwrap();
        let mut ev = sys::alpm_event_t {
            scriptlet_info: sys::alpm_event_scriptlet_info_t {
                type_: sys::alpm_event_type_t::ALPM_EVENT_SCRIPTLET_INFO,
                line: line.as_ptr(),
            },
        };
        assert_eq!(
            unsafe { Event::decode(&mut ev) },
            Event::ScriptletInfo {
                line: "post_install: done\n".into()
            }
        );
    }

    #[test]
    fn decodes_hook_run_with_counts() {
        let name = CString::new("30-systemd-update.hook").unwrap();
        let desc = CString::new("Updating manpage index").unwrap();
        let mut ev = sys::alpm_event_t {
            hook_run: sys::alpm_event_hook_run_t {
                type_: sys::alpm_event_type_t::ALPM_EVENT_HOOK_RUN_START,
                name: name.as_ptr(),
                desc: desc.as_ptr(),
                position: 2,
                total: 5,
            },
        };
        match unsafe { Event::decode(&mut ev) } {
            Event::HookRunStart {
                name,
                description,
                position: 2,
                total: 5,
            } => {
                assert_eq!(name, "30-systemd-update.hook");
                assert_eq!(description, "Updating manpage index");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_discriminant_is_preserved() {
        let mut code: c_int = 9999;
        let ev = &mut code as *mut c_int as *mut sys::alpm_event_t;
        assert_eq!(unsafe { Event::decode(ev) }, Event::Unknown(9999));
        assert_eq!(
            unsafe { Event::decode(std::ptr::null_mut()) },
            Event::Unknown(0)
        );
    }
}
