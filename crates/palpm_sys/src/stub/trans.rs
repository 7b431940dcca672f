//! Transaction state machine of the fake native layer.
//!
//! Mirrors libalpm's own rules: one transaction per handle, prepare resolves
//! dependency names against the local db and pending targets, commit refuses
//! to run before a successful prepare and fires the registered event and
//! progress callbacks synchronously on the caller's stack.

use super::db::StubPkg;
use super::{alloc, handle_mut, spy};
use crate::types::*;
use libc::{c_char, c_int, c_void};
use std::ptr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StubTransState {
    Initialized,
    Prepared,
    Committed,
}

pub(crate) struct StubTrans {
    pub flags: u32,
    pub add: Vec<*mut StubPkg>,
    pub remove: Vec<*mut StubPkg>,
    pub state: StubTransState,
    pub interrupted: bool,
    add_cache: *mut alpm_list_t,
    remove_cache: *mut alpm_list_t,
}

impl Drop for StubTrans {
    fn drop(&mut self) {
        unsafe {
            alloc::free_nodes(self.add_cache);
            alloc::free_nodes(self.remove_cache);
        }
    }
}

pub unsafe extern "C" fn alpm_trans_init(handle: *mut alpm_handle_t, flags: c_int) -> c_int {
    if handle.is_null() {
        return -1;
    }
    let h = handle_mut(handle);
    if h.trans.is_some() {
        h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NOT_NULL;
        return -1;
    }
    h.trans = Some(StubTrans {
        flags: flags as u32,
        add: Vec::new(),
        remove: Vec::new(),
        state: StubTransState::Initialized,
        interrupted: false,
        add_cache: ptr::null_mut(),
        remove_cache: ptr::null_mut(),
    });
    0
}

pub unsafe extern "C" fn alpm_trans_get_flags(handle: *mut alpm_handle_t) -> c_int {
    if handle.is_null() {
        return -1;
    }
    match handle_mut(handle).trans.as_ref() {
        Some(t) => t.flags as c_int,
        None => -1,
    }
}

unsafe fn trans_target(
    handle: *mut alpm_handle_t,
    pkg: *mut alpm_pkg_t,
    removal: bool,
) -> c_int {
    if handle.is_null() {
        return -1;
    }
    let h = handle_mut(handle);
    if pkg.is_null() {
        h.pm_errno = alpm_errno_t::ALPM_ERR_WRONG_ARGS;
        return -1;
    }
    let Some(t) = h.trans.as_mut() else {
        h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NULL;
        return -1;
    };
    if t.state != StubTransState::Initialized {
        h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NOT_INITIALIZED;
        return -1;
    }
    let target = pkg as *mut StubPkg;
    let set = if removal { &mut t.remove } else { &mut t.add };
    if set.contains(&target) {
        h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_DUP_TARGET;
        return -1;
    }
    set.push(target);
    0
}

pub unsafe extern "C" fn alpm_add_pkg(handle: *mut alpm_handle_t, pkg: *mut alpm_pkg_t) -> c_int {
    trans_target(handle, pkg, false)
}

pub unsafe extern "C" fn alpm_remove_pkg(handle: *mut alpm_handle_t, pkg: *mut alpm_pkg_t) -> c_int {
    trans_target(handle, pkg, true)
}

pub unsafe extern "C" fn alpm_sync_sysupgrade(
    handle: *mut alpm_handle_t,
    enable_downgrade: c_int,
) -> c_int {
    if handle.is_null() {
        return -1;
    }
    let h = handle_mut(handle);
    let Some(t) = h.trans.as_mut() else {
        h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NULL;
        return -1;
    };
    if t.state != StubTransState::Initialized {
        h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NOT_INITIALIZED;
        return -1;
    }
    for db in &h.syncdbs {
        for pkg in &db.pkgs {
            let Some(local) = h.localdb.pkgs.iter().find(|l| l.name == pkg.name) else {
                continue;
            };
            // Byte comparison stands in for the library's version compare;
            // fixture versions are chosen so the two orders agree.
            let newer = pkg.version.as_bytes() > local.version.as_bytes();
            let older = pkg.version.as_bytes() < local.version.as_bytes();
            if newer || (older && enable_downgrade != 0) {
                let candidate = &**pkg as *const StubPkg as *mut StubPkg;
                if !t.add.contains(&candidate) {
                    t.add.push(candidate);
                }
            }
        }
    }
    0
}

pub unsafe extern "C" fn alpm_trans_prepare(
    handle: *mut alpm_handle_t,
    data: *mut *mut alpm_list_t,
) -> c_int {
    if handle.is_null() {
        return -1;
    }
    let h = handle_mut(handle);
    let Some(t) = h.trans.as_mut() else {
        h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NULL;
        return -1;
    };

    if t.flags & ALPM_TRANS_FLAG_NODEPS == 0 {
        // A dependency is satisfied by any known package or pending target.
        let mut missing = ptr::null_mut();
        for target in &t.add {
            let target = &**target;
            for dep in &target.deps {
                let satisfied = h.localdb.pkgs.iter().any(|p| p.name.to_str() == Ok(dep))
                    || t.add.iter().any(|a| (**a).name.to_str() == Ok(dep));
                if !satisfied {
                    let rec = alloc::dep_malloc(dep, None, None, alpm_depmod_t::ALPM_DEP_MOD_ANY);
                    let target_name = target.name.to_string_lossy().into_owned();
                    let miss = alloc::depmissing_malloc(&target_name, rec, None);
                    missing = alloc::list_append(missing, miss as *mut c_void);
                }
            }
        }
        if !missing.is_null() {
            if !data.is_null() {
                *data = missing;
            } else {
                // No out-list to take ownership; reclaim to avoid leaking.
                let mut node = missing;
                while !node.is_null() {
                    alloc::depmissing_free_raw((*node).data as *mut alpm_depmissing_t);
                    node = (*node).next;
                }
                alloc::free_nodes(missing);
            }
            h.pm_errno = alpm_errno_t::ALPM_ERR_UNSATISFIED_DEPS;
            return -1;
        }
    }

    t.state = StubTransState::Prepared;
    0
}

pub unsafe extern "C" fn alpm_trans_commit(
    handle: *mut alpm_handle_t,
    _data: *mut *mut alpm_list_t,
) -> c_int {
    if handle.is_null() {
        return -1;
    }

    // Gather everything needed before dropping the exclusive borrow; the
    // callbacks run user code that may re-enter the handle.
    let (cbs, names): (super::CallbackSlots, Vec<*const c_char>) = {
        let h = handle_mut(handle);
        let Some(t) = h.trans.as_mut() else {
            h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NULL;
            return -1;
        };
        if t.state != StubTransState::Prepared {
            h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NOT_PREPARED;
            return -1;
        }
        (h.cbs, t.add.iter().map(|p| (**p).name.as_ptr()).collect())
    };

    if let Some(cb) = cbs.event {
        let mut ev = alpm_event_t {
            any: alpm_event_any_t {
                type_: alpm_event_type_t::ALPM_EVENT_TRANSACTION_START,
            },
        };
        cb(cbs.event_ctx, &mut ev);
    }
    let total = names.len();
    for (i, name) in names.iter().enumerate() {
        if let Some(cb) = cbs.progress {
            cb(
                cbs.progress_ctx,
                alpm_progress_t::ALPM_PROGRESS_ADD_START,
                *name,
                100,
                total,
                i + 1,
            );
        }
    }
    if let Some(cb) = cbs.event {
        let mut ev = alpm_event_t {
            any: alpm_event_any_t {
                type_: alpm_event_type_t::ALPM_EVENT_TRANSACTION_DONE,
            },
        };
        cb(cbs.event_ctx, &mut ev);
    }

    let h = handle_mut(handle);
    let t = h.trans.as_mut().expect("transaction checked above");
    t.state = StubTransState::Committed;
    let added: Vec<String> = t
        .add
        .iter()
        .map(|p| (**p).name.to_string_lossy().into_owned())
        .collect();
    let removed: Vec<String> = t
        .remove
        .iter()
        .map(|p| (**p).name.to_string_lossy().into_owned())
        .collect();
    for name in added {
        h.installed.insert(name);
    }
    for name in removed {
        h.installed.remove(&name);
    }
    0
}

pub unsafe extern "C" fn alpm_trans_interrupt(handle: *mut alpm_handle_t) -> c_int {
    if handle.is_null() {
        return -1;
    }
    let h = handle_mut(handle);
    let Some(t) = h.trans.as_mut() else {
        h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NULL;
        return -1;
    };
    t.interrupted = true;
    0
}

pub unsafe extern "C" fn alpm_trans_release(handle: *mut alpm_handle_t) -> c_int {
    spy::with(|s| {
        s.trans_release += 1;
        s.ops.push("trans_release");
    });
    if handle.is_null() {
        return -1;
    }
    let h = handle_mut(handle);
    if h.trans.take().is_none() {
        h.pm_errno = alpm_errno_t::ALPM_ERR_TRANS_NULL;
        return -1;
    }
    0
}

pub unsafe extern "C" fn alpm_trans_get_add(handle: *mut alpm_handle_t) -> *mut alpm_list_t {
    if handle.is_null() {
        return ptr::null_mut();
    }
    let h = handle_mut(handle);
    let Some(t) = h.trans.as_mut() else {
        return ptr::null_mut();
    };
    alloc::free_nodes(t.add_cache);
    let mut head = ptr::null_mut();
    for p in &t.add {
        head = alloc::list_append(head, *p as *mut c_void);
    }
    t.add_cache = head;
    head
}

pub unsafe extern "C" fn alpm_trans_get_remove(handle: *mut alpm_handle_t) -> *mut alpm_list_t {
    if handle.is_null() {
        return ptr::null_mut();
    }
    let h = handle_mut(handle);
    let Some(t) = h.trans.as_mut() else {
        return ptr::null_mut();
    };
    alloc::free_nodes(t.remove_cache);
    let mut head = ptr::null_mut();
    for p in &t.remove {
        head = alloc::list_append(head, *p as *mut c_void);
    }
    t.remove_cache = head;
    head
}
