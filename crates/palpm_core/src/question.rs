//! Decoding of the native question union.
//!
//! Questions are how libalpm asks the frontend for a decision mid-operation.
//! The binding decodes the payload into owned values, including the default
//! answer the library arrives with. Handlers observe the question; no answer
//! is written back, so the library proceeds with that default.

use crate::util::{lossy_string, opt_string};
use libc::c_int;
use palpm_sys as sys;

/// A decoded libalpm question.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Question {
    /// Install a package that is on the ignore list?
    InstallIgnorePkg { package: String, install: bool },
    /// Replace an installed package with one from another repository?
    ReplacePkg {
        old_package: String,
        new_package: String,
        new_db: String,
        replace: bool,
    },
    /// Remove a package that conflicts with the one being installed?
    ConflictPkg {
        package1: String,
        package2: String,
        reason: String,
        remove: bool,
    },
    /// Delete a corrupted package file?
    CorruptedPkg { filepath: String, remove: bool },
    /// Skip packages whose dependencies could not be satisfied?
    RemovePkgs { packages: Vec<String>, skip: bool },
    /// Which provider satisfies the dependency?
    SelectProvider {
        providers: Vec<String>,
        dependency: String,
        use_index: i32,
    },
    /// Import a missing PGP key?
    ImportKey {
        uid: String,
        fingerprint: String,
        import: bool,
    },
    /// A discriminant this binding does not know; carries the raw code.
    Unknown(i32),
}

/// Collects package names out of a library-owned `alpm_pkg_t` list.
unsafe fn pkg_names(head: *mut sys::alpm_list_t) -> Vec<String> {
    let mut names = Vec::new();
    let mut node = head;
    while !node.is_null() {
        let pkg = (*node).data as *mut sys::alpm_pkg_t;
        if !pkg.is_null() {
            if let Some(name) = opt_string(sys::alpm_pkg_get_name(pkg)) {
                names.push(name);
            }
        }
        node = sys::alpm_list_next(node);
    }
    names
}

impl Question {
    /// Decodes the native union. A null pointer or an unrecognized
    /// discriminant becomes [`Question::Unknown`].
    ///
    /// # Safety
    ///
    /// `q` must be null or point to a live question union whose payload
    /// matches its discriminant.
    pub(crate) unsafe fn decode(q: *mut sys::alpm_question_t) -> Self {
        if q.is_null() {
            return Self::Unknown(0);
        }
        let code = *(q as *const c_int);
        let Some(kind) = sys::alpm_question_type_t::from_code(code) else {
            return Self::Unknown(code);
        };

        use sys::alpm_question_type_t::*;
        match kind {
            ALPM_QUESTION_INSTALL_IGNOREPKG => {
                let payload = (*q).install_ignorepkg;
                Self::InstallIgnorePkg {
                    package: lossy_string(payload.pkg),
                    install: payload.install != 0,
                }
            }
            ALPM_QUESTION_REPLACE_PKG => {
                let payload = (*q).replace;
                Self::ReplacePkg {
                    old_package: lossy_string(payload.oldpkg),
                    new_package: lossy_string(payload.newpkg),
                    new_db: lossy_string(payload.newdb),
                    replace: payload.replace != 0,
                }
            }
            ALPM_QUESTION_CONFLICT_PKG => {
                let payload = (*q).conflict;
                let (package1, package2, reason) = if payload.conflict.is_null() {
                    (String::new(), String::new(), String::new())
                } else {
                    let conflict = *payload.conflict;
                    let reason = if conflict.reason.is_null() {
                        String::new()
                    } else {
                        lossy_string((*conflict.reason).name)
                    };
                    (
                        lossy_string(conflict.package1),
                        lossy_string(conflict.package2),
                        reason,
                    )
                };
                Self::ConflictPkg {
                    package1,
                    package2,
                    reason,
                    remove: payload.remove != 0,
                }
            }
            ALPM_QUESTION_CORRUPTED_PKG => {
                let payload = (*q).corrupted;
                Self::CorruptedPkg {
                    filepath: lossy_string(payload.filepath),
                    remove: payload.remove != 0,
                }
            }
            ALPM_QUESTION_REMOVE_PKGS => {
                let payload = (*q).remove_pkgs;
                Self::RemovePkgs {
                    packages: pkg_names(payload.packages),
                    skip: payload.skip != 0,
                }
            }
            ALPM_QUESTION_SELECT_PROVIDER => {
                let payload = (*q).select_provider;
                let dependency = if payload.depend.is_null() {
                    String::new()
                } else {
                    lossy_string((*payload.depend).name)
                };
                Self::SelectProvider {
                    providers: pkg_names(payload.providers),
                    dependency,
                    use_index: payload.use_index,
                }
            }
            ALPM_QUESTION_IMPORT_KEY => {
                let payload = (*q).import_key;
                Self::ImportKey {
                    uid: lossy_string(payload.uid),
                    fingerprint: lossy_string(payload.fingerprint),
                    import: payload.import != 0,
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
    fn decodes_install_ignorepkg() {
        let pkg = CString::new("linux-lts").unwrap();
        let mut q = sys::alpm_question_t {
            install_ignorepkg: sys::alpm_question_install_ignorepkg_t {
                type_: sys::alpm_question_type_t::ALPM_QUESTION_INSTALL_IGNOREPKG,
                install: 1,
                pkg: pkg.as_ptr() as *mut _,
            },
        };
        assert_eq!(
            unsafe { Question::decode(&mut q) },
            Question::InstallIgnorePkg {
                package: "linux-lts".into(),
                install: true
            }
        );
    }

    #[test]
    fn decodes_replace_pkg() {
        let oldpkg = CString::new("vi").unwrap();
        let newpkg = CString::new("vim").unwrap();
        let newdb = CString::new("extra").unwrap();
        let mut q = sys::alpm_question_t {
            replace: sys::alpm_question_replace_t {
                type_: sys::alpm_question_type_t::ALPM_QUESTION_REPLACE_PKG,
                replace: 0,
                oldpkg: oldpkg.as_ptr() as *mut _,
                newpkg: newpkg.as_ptr() as *mut _,
                newdb: newdb.as_ptr() as *mut _,
            },
        };
        assert_eq!(
            unsafe { Question::decode(&mut q) },
            Question::ReplacePkg {
                old_package: "vi".into(),
                new_package: "vim".into(),
                new_db: "extra".into(),
                replace: false
            }
        );
    }

    #[test]
    fn decodes_corrupted_pkg() {
        let path = CString::new("/var/cache/pacman/pkg/bad.pkg.tar.zst").unwrap();
        let mut q = sys::alpm_question_t {
            corrupted: sys::alpm_question_corrupted_t {
                type_: sys::alpm_question_type_t::ALPM_QUESTION_CORRUPTED_PKG,
                remove: 1,
                filepath: path.as_ptr() as *mut _,
            },
        };
        match unsafe { Question::decode(&mut q) } {
            Question::CorruptedPkg { filepath, remove } => {
                assert!(filepath.ends_with("bad.pkg.tar.zst"));
                assert!(remove);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_discriminant_is_preserved() {
        let mut code: c_int = 1 << 12;
        let q = &mut code as *mut c_int as *mut sys::alpm_question_t;
        assert_eq!(unsafe { Question::decode(q) }, Question::Unknown(1 << 12));
    }
}
