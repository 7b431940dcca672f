//! Conversions between C strings and owned Rust strings.

use crate::error::{Error, Result};
use libc::c_char;
use std::ffi::{CStr, CString};

/// Builds a `CString`, rejecting embedded NUL bytes instead of panicking.
pub(crate) fn cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InvalidArgument(format!("embedded NUL in {s:?}")))
}

/// Reads a C string into an owned `String`; null becomes the empty string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives
/// the call.
pub(crate) unsafe fn lossy_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Reads a C string into `Option<String>`, null mapping to `None`.
///
/// # Safety
///
/// Same contract as [`lossy_string`].
pub(crate) unsafe fn opt_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cstring_rejects_embedded_nul() {
        assert!(matches!(
            cstring("bad\0arg"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn lossy_string_maps_null_to_empty() {
        assert_eq!(unsafe { lossy_string(std::ptr::null()) }, "");
        assert_eq!(unsafe { opt_string(std::ptr::null()) }, None);
    }
}
