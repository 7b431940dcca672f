//! String list adapter with allocator-matched payload release.

use super::{Cursor, ForeignList, FromRaw, Iter, Ownership};
use crate::error::Result;
use crate::util::cstring;
use libc::{c_char, c_void};
use palpm_sys as sys;
use std::ffi::{CStr, CString};
use std::ptr;

impl FromRaw for String {
    unsafe fn from_raw(data: *mut c_void) -> Self {
        if data.is_null() {
            String::new()
        } else {
            CStr::from_ptr(data as *const c_char)
                .to_string_lossy()
                .into_owned()
        }
    }
}

/// Frees a payload string the binding allocated via `CString::into_raw`.
/// Passed to `alpm_list_free_inner` for binding-owned lists; never valid
/// for memory from the C allocator.
pub(crate) unsafe extern "C" fn binding_string_free(ptr: *mut c_void) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

/// A list of C strings with the payload free function tied to the
/// ownership mode.
///
/// Library-owned payloads came from the C allocator and are handed to
/// `free`; binding-owned payloads were produced by `CString::into_raw` and
/// must go back through [`CString::from_raw`]. Mixing the two corrupts one
/// heap or the other, so the choice is made once, at construction, and the
/// release path never takes a free function from the caller.
#[derive(Debug)]
pub struct StringList<'h> {
    inner: ForeignList<'h, String>,
}

impl<'h> StringList<'h> {
    pub(crate) fn from_ptr(head: *mut sys::alpm_list_t, mode: Ownership) -> Self {
        Self {
            inner: ForeignList::from_ptr(head, mode),
        }
    }

    /// Builds a binding-owned list from managed strings: the spine grows
    /// through the library's list-add primitive starting from a null head,
    /// the payloads are allocated by the binding.
    pub fn from_strings<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut head = ptr::null_mut();
        for item in items {
            let payload = match cstring(item.as_ref()) {
                Ok(payload) => payload,
                Err(err) => {
                    // Reclaim what was already built before reporting.
                    Self::from_ptr(head, Ownership::SpineAndBindingPayload).release();
                    return Err(err);
                }
            };
            head = unsafe { sys::alpm_list_add(head, payload.into_raw() as *mut c_void) };
        }
        Ok(Self::from_ptr(head, Ownership::SpineAndBindingPayload))
    }

    pub fn ownership(&self) -> Ownership {
        self.inner.ownership()
    }

    pub fn count(&self) -> Result<usize> {
        self.inner.count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.inner.is_empty()
    }

    pub fn nth(&self, index: usize) -> Result<String> {
        self.inner.nth(index)
    }

    pub fn cursor(&self) -> Result<Cursor<'_, String>> {
        self.inner.cursor()
    }

    pub fn iter(&self) -> Result<Iter<'_, String>> {
        self.inner.iter()
    }

    /// Drains the list into owned strings, then releases it.
    pub fn into_vec(mut self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        {
            let mut cursor = self.inner.cursor()?;
            while cursor.advance() {
                out.push(cursor.current()?);
            }
        }
        self.release();
        Ok(out)
    }

    /// Frees payloads with the allocator-matched free function, then the
    /// spine. Idempotent.
    pub fn release(&mut self) {
        if self.inner.raw.is_released() {
            return;
        }
        match self.inner.raw.mode() {
            Ownership::SpineAndLibraryPayload => unsafe {
                sys::alpm_list_free_inner(self.inner.raw.head(), libc::free);
            },
            Ownership::SpineAndBindingPayload => unsafe {
                sys::alpm_list_free_inner(self.inner.raw.head(), binding_string_free);
            },
            Ownership::Unowned | Ownership::Spine => {}
        }
        self.inner.release();
    }
}

impl Drop for StringList<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use palpm_sys::testing;
    use proptest::prelude::*;

    #[test]
    fn library_payloads_go_to_libc_free() {
        testing::reset_spy();
        let head = testing::malloc_string_list(&["core", "extra"]);
        let mut list = StringList::from_ptr(head, Ownership::SpineAndLibraryPayload);
        assert_eq!(list.count().unwrap(), 2);
        list.release();

        let spy = testing::spy();
        assert_eq!(spy.list_free_inner, 1);
        assert_eq!(spy.inner_free_fns, vec![libc::free as usize]);
        assert_eq!(spy.list_free, 1);
    }

    #[test]
    fn binding_payloads_go_back_through_cstring() {
        testing::reset_spy();
        let mut list = StringList::from_strings(["one", "two", "three"]).unwrap();
        assert_eq!(list.count().unwrap(), 3);
        list.release();

        let spy = testing::spy();
        assert_eq!(spy.list_free_inner, 1);
        assert_eq!(spy.inner_free_fns, vec![binding_string_free as usize]);
        assert_eq!(spy.list_free, 1);
    }

    #[test]
    fn payloads_are_freed_before_the_spine() {
        testing::reset_spy();
        let mut list = StringList::from_strings(["a"]).unwrap();
        list.release();
        assert_eq!(testing::spy().ops, vec!["list_free_inner", "list_free"]);
    }

    #[test]
    fn spine_only_mode_never_touches_payloads() {
        testing::reset_spy();
        let head = testing::malloc_string_list(&["keep"]);
        let payload = unsafe { (*head).data };
        let mut list = StringList::from_ptr(head, Ownership::Spine);
        assert_eq!(list.nth(0).unwrap(), "keep");
        list.release();

        let spy = testing::spy();
        assert_eq!(spy.list_free, 1);
        assert_eq!(spy.list_free_inner, 0);
        // The payload survived the release; reclaim it by hand.
        unsafe { libc::free(payload) };
    }

    #[test]
    fn from_strings_roundtrips_content() {
        let list = StringList::from_strings(["alpha", "beta", ""]).unwrap();
        assert_eq!(list.nth(0).unwrap(), "alpha");
        assert_eq!(list.nth(2).unwrap(), "");
        let collected: Vec<String> = list.iter().unwrap().collect();
        assert_eq!(collected, ["alpha", "beta", ""]);
    }

    #[test]
    fn into_vec_drains_and_releases() {
        testing::reset_spy();
        let head = testing::malloc_string_list(&["x", "y"]);
        let list = StringList::from_ptr(head, Ownership::SpineAndLibraryPayload);
        let values = list.into_vec().unwrap();
        assert_eq!(values, ["x", "y"]);

        let spy = testing::spy();
        assert_eq!(spy.list_free, 1);
        assert_eq!(spy.list_free_inner, 1);
    }

    #[test]
    fn from_strings_rejects_embedded_nul_without_leaking_spine() {
        testing::reset_spy();
        let result = StringList::from_strings(["fine", "bad\0value"]);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        // The partial list built before the failure was reclaimed.
        let spy = testing::spy();
        assert_eq!(spy.list_free, 1);
        assert_eq!(spy.inner_free_fns, vec![binding_string_free as usize]);
    }

    #[test]
    fn double_release_is_a_no_op() {
        testing::reset_spy();
        let mut list = StringList::from_strings(["once"]).unwrap();
        list.release();
        list.release();
        drop(list);
        let spy = testing::spy();
        assert_eq!(spy.list_free, 1);
        assert_eq!(spy.list_free_inner, 1);
    }

    proptest! {
        #[test]
        fn arbitrary_strings_survive_the_boundary(
            items in proptest::collection::vec("[^\\x00]{0,32}", 0..8)
        ) {
            let list = StringList::from_strings(&items).unwrap();
            prop_assert_eq!(list.count().unwrap(), items.len());
            let back: Vec<String> = list.iter().unwrap().collect();
            prop_assert_eq!(back, items);
        }
    }
}
