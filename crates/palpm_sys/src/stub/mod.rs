//! In-process fake of libalpm for tests.
//!
//! Provides the same function surface as the extern declarations, backed by
//! heap state behind the opaque handle pointer. Everything handed across the
//! fake boundary (strings, dependency records, list nodes) is allocated with
//! the C allocator, so the binding's allocator-matched free paths run against
//! real `malloc`/`free` memory.
//!
//! The [`spy`] module records calls to the free/release primitives; the
//! [`testing`] module seeds fixture packages and fires registered callbacks.

mod alloc;
mod db;
mod list;
pub mod spy;
pub mod testing;
mod trans;

pub use db::*;
pub use list::*;
pub use trans::*;

use crate::types::*;
use db::StubDb;
use libc::{c_char, c_int, c_void};
use std::collections::HashSet;
use std::ptr;
use trans::StubTrans;

/// Registered callback slots, as raw function pointer + context pairs.
#[derive(Clone, Copy)]
pub(crate) struct CallbackSlots {
    pub event: alpm_cb_event,
    pub event_ctx: *mut c_void,
    pub fetch: alpm_cb_fetch,
    pub fetch_ctx: *mut c_void,
    pub question: alpm_cb_question,
    pub question_ctx: *mut c_void,
    pub progress: alpm_cb_progress,
    pub progress_ctx: *mut c_void,
}

impl Default for CallbackSlots {
    fn default() -> Self {
        Self {
            event: None,
            event_ctx: ptr::null_mut(),
            fetch: None,
            fetch_ctx: ptr::null_mut(),
            question: None,
            question_ctx: ptr::null_mut(),
            progress: None,
            progress_ctx: ptr::null_mut(),
        }
    }
}

/// The state behind an `alpm_handle_t` pointer.
pub(crate) struct StubHandle {
    pub pm_errno: alpm_errno_t,
    pub localdb: Box<StubDb>,
    pub syncdbs: Vec<Box<StubDb>>,
    pub trans: Option<StubTrans>,
    pub cbs: CallbackSlots,
    pub installed: HashSet<String>,
}

pub(crate) unsafe fn handle_mut<'a>(handle: *mut alpm_handle_t) -> &'a mut StubHandle {
    &mut *(handle as *mut StubHandle)
}

pub unsafe extern "C" fn alpm_initialize(
    root: *const c_char,
    dbpath: *const c_char,
    err: *mut alpm_errno_t,
) -> *mut alpm_handle_t {
    if root.is_null() || dbpath.is_null() {
        if !err.is_null() {
            *err = alpm_errno_t::ALPM_ERR_WRONG_ARGS;
        }
        return ptr::null_mut();
    }

    let handle = Box::new(StubHandle {
        pm_errno: alpm_errno_t::ALPM_ERR_OK,
        localdb: Box::new(StubDb::new("local")),
        syncdbs: Vec::new(),
        trans: None,
        cbs: CallbackSlots::default(),
        installed: HashSet::new(),
    });
    let raw = Box::into_raw(handle);
    // The dbs report errors through the owning handle.
    (*raw).localdb.handle = raw;
    raw as *mut alpm_handle_t
}

pub unsafe extern "C" fn alpm_release(handle: *mut alpm_handle_t) -> c_int {
    spy::with(|s| {
        s.handle_release += 1;
        s.ops.push("handle_release");
    });
    if handle.is_null() {
        return -1;
    }
    drop(Box::from_raw(handle as *mut StubHandle));
    0
}

pub unsafe extern "C" fn alpm_errno(handle: *mut alpm_handle_t) -> alpm_errno_t {
    if handle.is_null() {
        return alpm_errno_t::ALPM_ERR_HANDLE_NULL;
    }
    handle_mut(handle).pm_errno
}

pub unsafe extern "C" fn alpm_strerror(err: alpm_errno_t) -> *const c_char {
    let s: &'static [u8] = match err {
        alpm_errno_t::ALPM_ERR_OK => b"expected to find a valid error code\0",
        alpm_errno_t::ALPM_ERR_MEMORY => b"out of memory!\0",
        alpm_errno_t::ALPM_ERR_SYSTEM => b"unexpected system error\0",
        alpm_errno_t::ALPM_ERR_BADPERMS => b"permission denied\0",
        alpm_errno_t::ALPM_ERR_WRONG_ARGS => b"wrong or NULL argument passed\0",
        alpm_errno_t::ALPM_ERR_HANDLE_NULL => b"library not initialized\0",
        alpm_errno_t::ALPM_ERR_TRANS_NOT_NULL => b"a transaction is already initialized\0",
        alpm_errno_t::ALPM_ERR_TRANS_NULL => b"a transaction has not been initialized\0",
        alpm_errno_t::ALPM_ERR_TRANS_DUP_TARGET => b"duplicate target\0",
        alpm_errno_t::ALPM_ERR_TRANS_NOT_PREPARED => b"transaction not prepared\0",
        alpm_errno_t::ALPM_ERR_PKG_NOT_FOUND => b"could not find or read package\0",
        alpm_errno_t::ALPM_ERR_UNSATISFIED_DEPS => b"could not satisfy dependencies\0",
        alpm_errno_t::ALPM_ERR_CONFLICTING_DEPS => b"conflicting dependencies\0",
        _ => b"unexpected error\0",
    };
    s.as_ptr() as *const c_char
}

pub unsafe extern "C" fn alpm_dep_free(dep: *mut alpm_depend_t) {
    spy::with(|s| {
        s.dep_free += 1;
        s.ops.push("dep_free");
    });
    alloc::dep_free_raw(dep);
}

pub unsafe extern "C" fn alpm_depmissing_free(miss: *mut alpm_depmissing_t) {
    spy::with(|s| {
        s.depmissing_free += 1;
        s.ops.push("depmissing_free");
    });
    alloc::depmissing_free_raw(miss);
}

fn record_registration(slot: spy::CbSlot, installed: bool, accepted: bool) {
    spy::with(|s| {
        s.cb_registrations.push(spy::CbRegistration {
            slot,
            installed,
            accepted,
        });
    });
}

fn registration_should_fail() -> bool {
    testing::consume_registration_failure()
}

macro_rules! set_cb {
    ($fn_name:ident, $slot:ident, $ctx:ident, $cb_ty:ty, $spy_slot:expr) => {
        pub unsafe extern "C" fn $fn_name(
            handle: *mut alpm_handle_t,
            cb: $cb_ty,
            ctx: *mut c_void,
        ) -> c_int {
            if handle.is_null() {
                return -1;
            }
            if registration_should_fail() {
                handle_mut(handle).pm_errno = alpm_errno_t::ALPM_ERR_WRONG_ARGS;
                record_registration($spy_slot, cb.is_some(), false);
                return -1;
            }
            let h = handle_mut(handle);
            h.cbs.$slot = cb;
            h.cbs.$ctx = ctx;
            record_registration($spy_slot, cb.is_some(), true);
            0
        }
    };
}

set_cb!(
    alpm_option_set_eventcb,
    event,
    event_ctx,
    alpm_cb_event,
    spy::CbSlot::Event
);
set_cb!(
    alpm_option_set_fetchcb,
    fetch,
    fetch_ctx,
    alpm_cb_fetch,
    spy::CbSlot::Fetch
);
set_cb!(
    alpm_option_set_questioncb,
    question,
    question_ctx,
    alpm_cb_question,
    spy::CbSlot::Question
);
set_cb!(
    alpm_option_set_progresscb,
    progress,
    progress_ctx,
    alpm_cb_progress,
    spy::CbSlot::Progress
);
