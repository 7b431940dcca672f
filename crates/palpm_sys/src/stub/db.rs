//! Database and package state of the fake native layer.

use super::{alloc, handle_mut, StubHandle};
use crate::types::*;
use libc::{c_char, c_int, c_void};
use std::ffi::CString;
use std::ptr;

/// A fixture package behind an `alpm_pkg_t` pointer.
pub(crate) struct StubPkg {
    pub name: CString,
    pub version: CString,
    /// Dependency names, mirrored in `depends` as malloc'd records.
    pub deps: Vec<String>,
    /// Library-owned `alpm_depend_t` list handed out by `alpm_pkg_get_depends`.
    pub depends: *mut alpm_list_t,
}

impl Drop for StubPkg {
    fn drop(&mut self) {
        unsafe { alloc::free_dep_list(self.depends) };
    }
}

/// A database behind an `alpm_db_t` pointer.
pub(crate) struct StubDb {
    pub name: CString,
    pub handle: *mut StubHandle,
    pub pkgs: Vec<Box<StubPkg>>,
    pub servers: Vec<CString>,
    /// Library-owned caches, rebuilt on demand.
    pkgcache: *mut alpm_list_t,
    servercache: *mut alpm_list_t,
}

impl StubDb {
    pub fn new(name: &str) -> Self {
        Self {
            name: CString::new(name).expect("db name"),
            handle: ptr::null_mut(),
            pkgs: Vec::new(),
            servers: Vec::new(),
            pkgcache: ptr::null_mut(),
            servercache: ptr::null_mut(),
        }
    }

    pub fn add_pkg(&mut self, name: &str, version: &str, deps: &[&str]) {
        let mut depends = ptr::null_mut();
        for d in deps {
            unsafe {
                let rec = alloc::dep_malloc(d, None, None, alpm_depmod_t::ALPM_DEP_MOD_ANY);
                depends = alloc::list_append(depends, rec as *mut c_void);
            }
        }
        self.pkgs.push(Box::new(StubPkg {
            name: CString::new(name).expect("pkg name"),
            version: CString::new(version).expect("pkg version"),
            deps: deps.iter().map(|d| (*d).to_string()).collect(),
            depends,
        }));
    }

    pub fn find(&mut self, name: &str) -> Option<*mut StubPkg> {
        self.pkgs
            .iter_mut()
            .find(|p| p.name.to_str() == Ok(name))
            .map(|p| &mut **p as *mut StubPkg)
    }
}

impl Drop for StubDb {
    fn drop(&mut self) {
        unsafe {
            alloc::free_nodes(self.pkgcache);
            alloc::free_nodes(self.servercache);
        }
    }
}

pub(crate) unsafe fn db_mut<'a>(db: *mut alpm_db_t) -> &'a mut StubDb {
    &mut *(db as *mut StubDb)
}

pub(crate) unsafe fn pkg_ref<'a>(pkg: *mut alpm_pkg_t) -> &'a StubPkg {
    &*(pkg as *mut StubPkg)
}

pub unsafe extern "C" fn alpm_get_localdb(handle: *mut alpm_handle_t) -> *mut alpm_db_t {
    if handle.is_null() {
        return ptr::null_mut();
    }
    let h = handle_mut(handle);
    &mut *h.localdb as *mut StubDb as *mut alpm_db_t
}

pub unsafe extern "C" fn alpm_register_syncdb(
    handle: *mut alpm_handle_t,
    treename: *const c_char,
    _siglevel: c_int,
) -> *mut alpm_db_t {
    if handle.is_null() || treename.is_null() {
        return ptr::null_mut();
    }
    let h = handle_mut(handle);
    let name = std::ffi::CStr::from_ptr(treename).to_string_lossy().into_owned();
    let mut db = Box::new(StubDb::new(&name));
    db.handle = handle as *mut StubHandle;
    h.syncdbs.push(db);
    let last = h.syncdbs.last_mut().expect("just pushed");
    &mut **last as *mut StubDb as *mut alpm_db_t
}

pub unsafe extern "C" fn alpm_db_get_name(db: *mut alpm_db_t) -> *const c_char {
    if db.is_null() {
        return ptr::null();
    }
    db_mut(db).name.as_ptr()
}

pub unsafe extern "C" fn alpm_db_get_pkg(db: *mut alpm_db_t, name: *const c_char) -> *mut alpm_pkg_t {
    if db.is_null() || name.is_null() {
        return ptr::null_mut();
    }
    let d = db_mut(db);
    let wanted = std::ffi::CStr::from_ptr(name).to_string_lossy().into_owned();
    match d.find(&wanted) {
        Some(p) => p as *mut alpm_pkg_t,
        None => {
            if !d.handle.is_null() {
                (*d.handle).pm_errno = alpm_errno_t::ALPM_ERR_PKG_NOT_FOUND;
            }
            ptr::null_mut()
        }
    }
}

pub unsafe extern "C" fn alpm_db_get_pkgcache(db: *mut alpm_db_t) -> *mut alpm_list_t {
    if db.is_null() {
        return ptr::null_mut();
    }
    let d = db_mut(db);
    alloc::free_nodes(d.pkgcache);
    let mut head = ptr::null_mut();
    for p in &mut d.pkgs {
        head = alloc::list_append(head, &mut **p as *mut StubPkg as *mut c_void);
    }
    d.pkgcache = head;
    head
}

pub unsafe extern "C" fn alpm_db_get_servers(db: *mut alpm_db_t) -> *mut alpm_list_t {
    if db.is_null() {
        return ptr::null_mut();
    }
    let d = db_mut(db);
    alloc::free_nodes(d.servercache);
    let mut head = ptr::null_mut();
    for s in &d.servers {
        head = alloc::list_append(head, s.as_ptr() as *mut c_void);
    }
    d.servercache = head;
    head
}

pub unsafe extern "C" fn alpm_pkg_get_name(pkg: *mut alpm_pkg_t) -> *const c_char {
    if pkg.is_null() {
        return ptr::null();
    }
    pkg_ref(pkg).name.as_ptr()
}

pub unsafe extern "C" fn alpm_pkg_get_version(pkg: *mut alpm_pkg_t) -> *const c_char {
    if pkg.is_null() {
        return ptr::null();
    }
    pkg_ref(pkg).version.as_ptr()
}

pub unsafe extern "C" fn alpm_pkg_get_depends(pkg: *mut alpm_pkg_t) -> *mut alpm_list_t {
    if pkg.is_null() {
        return ptr::null_mut();
    }
    pkg_ref(pkg).depends
}
