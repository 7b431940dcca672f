//! Seeding and fault-injection helpers for tests built on the stub.
//!
//! These are safe wrappers over the fake native layer: they trust the raw
//! handle/db pointers they are given, exactly like the C surface does.

use super::db::db_mut;
use super::{alloc, handle_mut};
use crate::types::*;
use libc::{c_int, c_void};
use std::cell::Cell;
use std::ffi::CString;
use std::ptr;

pub use super::spy::{reset_spy, spy, CbRegistration, CbSlot, Spy};

thread_local! {
    static REG_FAIL_AT: Cell<Option<usize>> = const { Cell::new(None) };
    static REG_COUNT: Cell<usize> = const { Cell::new(0) };
}

/// Makes the `n`-th (0-based) callback registration from now on fail with
/// `ALPM_ERR_WRONG_ARGS`. One-shot.
pub fn fail_cb_registration_at(n: usize) {
    REG_FAIL_AT.with(|c| c.set(Some(n)));
    REG_COUNT.with(|c| c.set(0));
}

pub(crate) fn consume_registration_failure() -> bool {
    let idx = REG_COUNT.with(|c| {
        let i = c.get();
        c.set(i + 1);
        i
    });
    REG_FAIL_AT.with(|c| {
        if c.get() == Some(idx) {
            c.set(None);
            true
        } else {
            false
        }
    })
}

/// Registers a fixture package in the handle's local db.
pub fn register_local_pkg(handle: *mut alpm_handle_t, name: &str, version: &str, deps: &[&str]) {
    assert!(!handle.is_null());
    unsafe {
        handle_mut(handle).localdb.add_pkg(name, version, deps);
    }
}

/// Registers a fixture package in a sync db, visible to `alpm_sync_sysupgrade`.
pub fn register_sync_pkg(db: *mut alpm_db_t, name: &str, version: &str, deps: &[&str]) {
    assert!(!db.is_null());
    unsafe {
        db_mut(db).add_pkg(name, version, deps);
    }
}

/// Adds a server URL to a db, visible through `alpm_db_get_servers`.
pub fn add_server(db: *mut alpm_db_t, url: &str) {
    assert!(!db.is_null());
    unsafe {
        db_mut(db).servers.push(CString::new(url).expect("server url"));
    }
}

/// Whether a package name was marked installed by a committed transaction.
pub fn installed(handle: *mut alpm_handle_t, name: &str) -> bool {
    assert!(!handle.is_null());
    unsafe { handle_mut(handle).installed.contains(name) }
}

/// Builds a malloc'd string list: malloc'd spine nodes carrying malloc'd
/// payload strings, the shape libalpm result lists come in.
pub fn malloc_string_list(items: &[&str]) -> *mut alpm_list_t {
    let mut head = ptr::null_mut();
    for item in items {
        unsafe {
            head = alloc::list_append(head, alloc::cstr_malloc(item) as *mut c_void);
        }
    }
    head
}

/// Builds a malloc'd spine whose nodes carry null payloads.
pub fn malloc_null_list(len: usize) -> *mut alpm_list_t {
    let mut head = ptr::null_mut();
    for _ in 0..len {
        unsafe {
            head = alloc::list_append(head, ptr::null_mut());
        }
    }
    head
}

/// Builds a malloc'd list of malloc'd dependency records.
pub fn malloc_dep_list(names: &[&str]) -> *mut alpm_list_t {
    let mut head = ptr::null_mut();
    for name in names {
        unsafe {
            let dep = alloc::dep_malloc(name, None, None, alpm_depmod_t::ALPM_DEP_MOD_ANY);
            head = alloc::list_append(head, dep as *mut c_void);
        }
    }
    head
}

/// Fires the registered fetch callback; records and returns its result.
/// `None` when no fetch callback is registered.
pub fn invoke_fetch(
    handle: *mut alpm_handle_t,
    url: &str,
    localpath: &str,
    force: bool,
) -> Option<i32> {
    assert!(!handle.is_null());
    let cbs = unsafe { handle_mut(handle).cbs };
    let cb = cbs.fetch?;
    let url = CString::new(url).expect("url");
    let localpath = CString::new(localpath).expect("localpath");
    let ret = unsafe {
        cb(
            cbs.fetch_ctx,
            url.as_ptr(),
            localpath.as_ptr(),
            c_int::from(force),
        )
    };
    super::spy::with(|s| s.fetch_returns.push(ret));
    Some(ret)
}

/// Fires the registered event callback with a payload-free event.
pub fn invoke_event(handle: *mut alpm_handle_t, type_: alpm_event_type_t) {
    assert!(!handle.is_null());
    let cbs = unsafe { handle_mut(handle).cbs };
    if let Some(cb) = cbs.event {
        let mut ev = alpm_event_t {
            any: alpm_event_any_t { type_ },
        };
        unsafe { cb(cbs.event_ctx, &mut ev) };
    }
}

/// Fires the registered event callback with a scriptlet-info event.
pub fn invoke_event_scriptlet_info(handle: *mut alpm_handle_t, line: &str) {
    assert!(!handle.is_null());
    let cbs = unsafe { handle_mut(handle).cbs };
    if let Some(cb) = cbs.event {
        let line = CString::new(line).expect("scriptlet line");
        let mut ev = alpm_event_t {
            scriptlet_info: alpm_event_scriptlet_info_t {
                type_: alpm_event_type_t::ALPM_EVENT_SCRIPTLET_INFO,
                line: line.as_ptr(),
            },
        };
        unsafe { cb(cbs.event_ctx, &mut ev) };
    }
}

/// Fires the registered question callback with an install-ignorepkg question.
pub fn invoke_question_install_ignorepkg(handle: *mut alpm_handle_t, pkg: &str, install: i32) {
    assert!(!handle.is_null());
    let cbs = unsafe { handle_mut(handle).cbs };
    if let Some(cb) = cbs.question {
        let pkg = CString::new(pkg).expect("pkg name");
        let mut q = alpm_question_t {
            install_ignorepkg: alpm_question_install_ignorepkg_t {
                type_: alpm_question_type_t::ALPM_QUESTION_INSTALL_IGNOREPKG,
                install,
                pkg: pkg.as_ptr() as *mut _,
            },
        };
        unsafe { cb(cbs.question_ctx, &mut q) };
    }
}

/// Fires the registered progress callback.
pub fn invoke_progress(
    handle: *mut alpm_handle_t,
    kind: alpm_progress_t,
    pkg: &str,
    percent: i32,
    howmany: usize,
    current: usize,
) {
    assert!(!handle.is_null());
    let cbs = unsafe { handle_mut(handle).cbs };
    if let Some(cb) = cbs.progress {
        let pkg = CString::new(pkg).expect("pkg name");
        unsafe {
            cb(
                cbs.progress_ctx,
                kind,
                pkg.as_ptr(),
                percent,
                howmany,
                current,
            )
        };
    }
}
