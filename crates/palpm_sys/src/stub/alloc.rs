//! C-allocator helpers for the stub.
//!
//! Everything that crosses the fake boundary is `malloc`ed here so the
//! binding's `libc::free`-based release paths operate on real C heap memory.
//! The `*_free_raw` helpers deliberately bypass the spy; the public
//! `alpm_*_free` entry points count and then delegate.

use crate::types::*;
use libc::{c_char, c_void, free, malloc};
use std::mem::size_of;
use std::ptr;

pub(crate) unsafe fn cstr_malloc(s: &str) -> *mut c_char {
    let bytes = s.as_bytes();
    let p = malloc(bytes.len() + 1) as *mut u8;
    assert!(!p.is_null(), "stub allocation failed");
    ptr::copy_nonoverlapping(bytes.as_ptr(), p, bytes.len());
    *p.add(bytes.len()) = 0;
    p as *mut c_char
}

pub(crate) unsafe fn node_malloc(data: *mut c_void) -> *mut alpm_list_t {
    let node = malloc(size_of::<alpm_list_t>()) as *mut alpm_list_t;
    assert!(!node.is_null(), "stub allocation failed");
    (*node).data = data;
    (*node).prev = ptr::null_mut();
    (*node).next = ptr::null_mut();
    node
}

/// Frees spine nodes only; payloads are untouched.
pub(crate) unsafe fn free_nodes(mut list: *mut alpm_list_t) {
    while !list.is_null() {
        let next = (*list).next;
        free(list as *mut c_void);
        list = next;
    }
}

/// Appends a freshly allocated node, returning the (possibly new) head.
pub(crate) unsafe fn list_append(head: *mut alpm_list_t, data: *mut c_void) -> *mut alpm_list_t {
    let node = node_malloc(data);
    if head.is_null() {
        return node;
    }
    let mut tail = head;
    while !(*tail).next.is_null() {
        tail = (*tail).next;
    }
    (*tail).next = node;
    (*node).prev = tail;
    head
}

pub(crate) unsafe fn dep_malloc(
    name: &str,
    version: Option<&str>,
    desc: Option<&str>,
    mod_: alpm_depmod_t,
) -> *mut alpm_depend_t {
    let dep = malloc(size_of::<alpm_depend_t>()) as *mut alpm_depend_t;
    assert!(!dep.is_null(), "stub allocation failed");
    (*dep).name = cstr_malloc(name);
    (*dep).version = version.map_or(ptr::null_mut(), |v| cstr_malloc(v));
    (*dep).desc = desc.map_or(ptr::null_mut(), |d| cstr_malloc(d));
    (*dep).name_hash = 0;
    (*dep).mod_ = mod_;
    dep
}

pub(crate) unsafe fn dep_free_raw(dep: *mut alpm_depend_t) {
    if dep.is_null() {
        return;
    }
    free((*dep).name as *mut c_void);
    free((*dep).version as *mut c_void);
    free((*dep).desc as *mut c_void);
    free(dep as *mut c_void);
}

pub(crate) unsafe fn depmissing_malloc(
    target: &str,
    dep: *mut alpm_depend_t,
    causingpkg: Option<&str>,
) -> *mut alpm_depmissing_t {
    let miss = malloc(size_of::<alpm_depmissing_t>()) as *mut alpm_depmissing_t;
    assert!(!miss.is_null(), "stub allocation failed");
    (*miss).target = cstr_malloc(target);
    (*miss).depend = dep;
    (*miss).causingpkg = causingpkg.map_or(ptr::null_mut(), |c| cstr_malloc(c));
    miss
}

pub(crate) unsafe fn depmissing_free_raw(miss: *mut alpm_depmissing_t) {
    if miss.is_null() {
        return;
    }
    free((*miss).target as *mut c_void);
    dep_free_raw((*miss).depend);
    free((*miss).causingpkg as *mut c_void);
    free(miss as *mut c_void);
}

/// Frees a dependency list owned by the stub (nodes and records).
pub(crate) unsafe fn free_dep_list(list: *mut alpm_list_t) {
    let mut node = list;
    while !node.is_null() {
        dep_free_raw((*node).data as *mut alpm_depend_t);
        node = (*node).next;
    }
    free_nodes(list);
}
