//! extern declarations for the libalpm primitives the binding calls.

use crate::types::*;
use libc::{c_char, c_int, c_void};

extern "C" {
    // handle lifecycle
    pub fn alpm_initialize(
        root: *const c_char,
        dbpath: *const c_char,
        err: *mut alpm_errno_t,
    ) -> *mut alpm_handle_t;
    pub fn alpm_release(handle: *mut alpm_handle_t) -> c_int;
    pub fn alpm_errno(handle: *mut alpm_handle_t) -> alpm_errno_t;
    pub fn alpm_strerror(err: alpm_errno_t) -> *const c_char;

    // list primitives
    pub fn alpm_list_next(node: *mut alpm_list_t) -> *mut alpm_list_t;
    pub fn alpm_list_count(list: *mut alpm_list_t) -> usize;
    pub fn alpm_list_nth(list: *mut alpm_list_t, n: usize) -> *mut alpm_list_t;
    pub fn alpm_list_add(list: *mut alpm_list_t, data: *mut c_void) -> *mut alpm_list_t;
    pub fn alpm_list_free(list: *mut alpm_list_t);
    pub fn alpm_list_free_inner(list: *mut alpm_list_t, fn_: alpm_list_fn_free);

    // dependency records
    pub fn alpm_dep_free(dep: *mut alpm_depend_t);
    pub fn alpm_depmissing_free(miss: *mut alpm_depmissing_t);

    // databases and packages
    pub fn alpm_get_localdb(handle: *mut alpm_handle_t) -> *mut alpm_db_t;
    pub fn alpm_register_syncdb(
        handle: *mut alpm_handle_t,
        treename: *const c_char,
        siglevel: c_int,
    ) -> *mut alpm_db_t;
    pub fn alpm_db_get_name(db: *mut alpm_db_t) -> *const c_char;
    pub fn alpm_db_get_pkg(db: *mut alpm_db_t, name: *const c_char) -> *mut alpm_pkg_t;
    pub fn alpm_db_get_pkgcache(db: *mut alpm_db_t) -> *mut alpm_list_t;
    pub fn alpm_db_get_servers(db: *mut alpm_db_t) -> *mut alpm_list_t;
    pub fn alpm_pkg_get_name(pkg: *mut alpm_pkg_t) -> *const c_char;
    pub fn alpm_pkg_get_version(pkg: *mut alpm_pkg_t) -> *const c_char;
    pub fn alpm_pkg_get_depends(pkg: *mut alpm_pkg_t) -> *mut alpm_list_t;

    // transactions
    pub fn alpm_trans_init(handle: *mut alpm_handle_t, flags: c_int) -> c_int;
    pub fn alpm_trans_get_flags(handle: *mut alpm_handle_t) -> c_int;
    pub fn alpm_add_pkg(handle: *mut alpm_handle_t, pkg: *mut alpm_pkg_t) -> c_int;
    pub fn alpm_remove_pkg(handle: *mut alpm_handle_t, pkg: *mut alpm_pkg_t) -> c_int;
    pub fn alpm_sync_sysupgrade(handle: *mut alpm_handle_t, enable_downgrade: c_int) -> c_int;
    pub fn alpm_trans_prepare(handle: *mut alpm_handle_t, data: *mut *mut alpm_list_t) -> c_int;
    pub fn alpm_trans_commit(handle: *mut alpm_handle_t, data: *mut *mut alpm_list_t) -> c_int;
    pub fn alpm_trans_interrupt(handle: *mut alpm_handle_t) -> c_int;
    pub fn alpm_trans_release(handle: *mut alpm_handle_t) -> c_int;
    pub fn alpm_trans_get_add(handle: *mut alpm_handle_t) -> *mut alpm_list_t;
    pub fn alpm_trans_get_remove(handle: *mut alpm_handle_t) -> *mut alpm_list_t;

    // callback registration
    pub fn alpm_option_set_eventcb(
        handle: *mut alpm_handle_t,
        cb: alpm_cb_event,
        ctx: *mut c_void,
    ) -> c_int;
    pub fn alpm_option_set_fetchcb(
        handle: *mut alpm_handle_t,
        cb: alpm_cb_fetch,
        ctx: *mut c_void,
    ) -> c_int;
    pub fn alpm_option_set_questioncb(
        handle: *mut alpm_handle_t,
        cb: alpm_cb_question,
        ctx: *mut c_void,
    ) -> c_int;
    pub fn alpm_option_set_progresscb(
        handle: *mut alpm_handle_t,
        cb: alpm_cb_progress,
        ctx: *mut c_void,
    ) -> c_int;
}
