//! List primitives of the fake native layer.

use super::{alloc, spy};
use crate::types::*;
use libc::c_void;
use std::ptr;

pub unsafe extern "C" fn alpm_list_next(node: *mut alpm_list_t) -> *mut alpm_list_t {
    if node.is_null() {
        ptr::null_mut()
    } else {
        (*node).next
    }
}

pub unsafe extern "C" fn alpm_list_count(list: *mut alpm_list_t) -> usize {
    let mut n = 0;
    let mut node = list;
    while !node.is_null() {
        n += 1;
        node = (*node).next;
    }
    n
}

pub unsafe extern "C" fn alpm_list_nth(list: *mut alpm_list_t, n: usize) -> *mut alpm_list_t {
    let mut node = list;
    let mut i = n;
    while i > 0 && !node.is_null() {
        node = (*node).next;
        i -= 1;
    }
    node
}

pub unsafe extern "C" fn alpm_list_add(list: *mut alpm_list_t, data: *mut c_void) -> *mut alpm_list_t {
    alloc::list_append(list, data)
}

pub unsafe extern "C" fn alpm_list_free(list: *mut alpm_list_t) {
    spy::with(|s| {
        s.list_free += 1;
        s.ops.push("list_free");
    });
    alloc::free_nodes(list);
}

pub unsafe extern "C" fn alpm_list_free_inner(list: *mut alpm_list_t, fn_: alpm_list_fn_free) {
    spy::with(|s| {
        s.list_free_inner += 1;
        s.inner_free_fns.push(fn_ as usize);
        s.ops.push("list_free_inner");
    });
    let mut node = list;
    while !node.is_null() {
        if !(*node).data.is_null() {
            fn_((*node).data);
        }
        node = (*node).next;
    }
}
