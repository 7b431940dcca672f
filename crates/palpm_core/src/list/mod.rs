//! Ownership-aware adapters over libalpm's linked lists.
//!
//! Every list crossing the C boundary comes with an ownership contract that
//! the C API leaves implicit: sometimes the library keeps the memory,
//! sometimes the caller must free the spine, sometimes the spine and the
//! payloads. The adapters here make that contract an explicit [`Ownership`]
//! value fixed at construction, so the release path is decided by the code
//! that knows where the list came from, not by the code that happens to drop
//! it last.

mod owning;
mod string;

pub use owning::{OwningList, ReleaseNative};
pub use string::StringList;

use crate::error::{Error, Result};
use crate::handle::Handle;
use libc::c_void;
use palpm_sys as sys;
use std::marker::PhantomData;
use std::ptr;

/// Which parts of a native list the binding is responsible for freeing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The library retains the whole list; release frees nothing.
    Unowned,
    /// The binding frees the spine nodes; payloads stay library-owned.
    Spine,
    /// The binding frees the spine and the payloads, which were allocated
    /// by the library's C allocator.
    SpineAndLibraryPayload,
    /// The binding frees the spine and the payloads, which the binding
    /// itself allocated when building the list.
    SpineAndBindingPayload,
}

/// Decodes one spine node's payload pointer into a value.
///
/// Implementations are read-only projections of the native memory: decoding
/// must not mutate it, and decoding the same pointer twice yields equivalent
/// values.
pub trait FromRaw {
    /// # Safety
    ///
    /// `data` must be the payload pointer of a live node from a list whose
    /// elements have the implementing type.
    unsafe fn from_raw(data: *mut c_void) -> Self;
}

/// Poison value installed in place of the head after release, so a bug that
/// bypasses the released flag faults loudly instead of walking freed memory.
fn released_sentinel() -> *mut sys::alpm_list_t {
    usize::MAX as *mut sys::alpm_list_t
}

/// Head pointer, ownership mode and release flag shared by every adapter.
#[derive(Debug)]
pub(crate) struct RawList {
    head: *mut sys::alpm_list_t,
    mode: Ownership,
    released: bool,
}

impl RawList {
    fn new(head: *mut sys::alpm_list_t, mode: Ownership) -> Self {
        Self {
            head,
            mode,
            released: false,
        }
    }

    pub(crate) fn head(&self) -> *mut sys::alpm_list_t {
        self.head
    }

    pub(crate) fn mode(&self) -> Ownership {
        self.mode
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released
    }

    fn guard(&self) -> Result<*mut sys::alpm_list_t> {
        if self.released {
            Err(Error::UseAfterRelease("list"))
        } else {
            Ok(self.head)
        }
    }

    fn count(&self) -> Result<usize> {
        Ok(unsafe { sys::alpm_list_count(self.guard()?) })
    }

    fn nth_node(&self, index: usize) -> Result<*mut sys::alpm_list_t> {
        let head = self.guard()?;
        let node = unsafe { sys::alpm_list_nth(head, index) };
        if node.is_null() {
            Err(Error::OutOfBounds {
                index,
                len: unsafe { sys::alpm_list_count(head) },
            })
        } else {
            Ok(node)
        }
    }

    /// Frees the spine per the ownership mode, at most once. The head is
    /// poisoned afterwards so every later entry point fails the guard.
    fn release(&mut self) {
        if self.released {
            return;
        }
        if self.mode != Ownership::Unowned {
            unsafe { sys::alpm_list_free(self.head) };
        }
        self.head = released_sentinel();
        self.released = true;
    }
}

/// A generic adapter over a native list whose payloads decode to `T`.
///
/// The `'h` lifetime ties the adapter to the [`Handle`] the list came from,
/// so the list cannot outlive the session that owns the underlying memory.
#[derive(Debug)]
pub struct ForeignList<'h, T: FromRaw> {
    pub(crate) raw: RawList,
    _handle: PhantomData<&'h Handle>,
    _item: PhantomData<fn() -> T>,
}

impl<'h, T: FromRaw> ForeignList<'h, T> {
    pub(crate) fn from_ptr(head: *mut sys::alpm_list_t, mode: Ownership) -> Self {
        Self {
            raw: RawList::new(head, mode),
            _handle: PhantomData,
            _item: PhantomData,
        }
    }

    /// The ownership contract this adapter was constructed with.
    pub fn ownership(&self) -> Ownership {
        self.raw.mode()
    }

    /// Number of elements. Walks the list; O(n).
    pub fn count(&self) -> Result<usize> {
        self.raw.count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// Decodes the element at `index`.
    pub fn nth(&self, index: usize) -> Result<T> {
        let node = self.raw.nth_node(index)?;
        Ok(unsafe { T::from_raw((*node).data) })
    }

    /// A resettable cursor borrowing this adapter.
    pub fn cursor(&self) -> Result<Cursor<'_, T>> {
        Ok(Cursor::new(self.raw.guard()?))
    }

    /// A borrowing iterator over decoded elements.
    pub fn iter(&self) -> Result<Iter<'_, T>> {
        Ok(Iter {
            cursor: Cursor::new(self.raw.guard()?),
        })
    }

    /// Converts the adapter into a single-pass cursor that releases the
    /// list when closed or dropped.
    pub fn into_cursor(self) -> Result<ConsumingCursor<'h, T>> {
        self.raw.guard()?;
        Ok(ConsumingCursor {
            node: ptr::null_mut(),
            started: false,
            list: self,
        })
    }

    /// Releases the native memory this adapter owns. Idempotent; all later
    /// operations fail with `UseAfterRelease`.
    pub fn release(&mut self) {
        self.raw.release();
    }
}

impl<T: FromRaw> Drop for ForeignList<'_, T> {
    fn drop(&mut self) {
        self.raw.release();
    }
}

/// A resettable read cursor over a list adapter.
///
/// Starts positioned before the first element; [`Cursor::advance`] moves it
/// and reports whether it landed on one.
pub struct Cursor<'a, T: FromRaw> {
    head: *mut sys::alpm_list_t,
    node: *mut sys::alpm_list_t,
    started: bool,
    _borrow: PhantomData<&'a ()>,
    _item: PhantomData<fn() -> T>,
}

impl<T: FromRaw> Cursor<'_, T> {
    fn new(head: *mut sys::alpm_list_t) -> Self {
        Self {
            head,
            node: ptr::null_mut(),
            started: false,
            _borrow: PhantomData,
            _item: PhantomData,
        }
    }

    /// Moves to the next element; `false` once the end is passed.
    pub fn advance(&mut self) -> bool {
        if !self.started {
            self.node = self.head;
            self.started = true;
        } else if !self.node.is_null() {
            self.node = unsafe { sys::alpm_list_next(self.node) };
        }
        !self.node.is_null()
    }

    /// Decodes the element under the cursor.
    pub fn current(&self) -> Result<T> {
        if !self.started || self.node.is_null() {
            return Err(Error::CursorOutOfPosition);
        }
        Ok(unsafe { T::from_raw((*self.node).data) })
    }

    /// Rewinds to before the first element.
    pub fn reset(&mut self) {
        self.node = ptr::null_mut();
        self.started = false;
    }
}

/// Borrowing iterator over a list adapter.
pub struct Iter<'a, T: FromRaw> {
    cursor: Cursor<'a, T>,
}

impl<T: FromRaw> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.cursor.advance() {
            self.cursor.current().ok()
        } else {
            None
        }
    }
}

/// A single-pass cursor that owns its adapter.
///
/// Closing it, or dropping it at any point, releases the underlying list.
pub struct ConsumingCursor<'h, T: FromRaw> {
    list: ForeignList<'h, T>,
    node: *mut sys::alpm_list_t,
    started: bool,
}

impl<T: FromRaw> ConsumingCursor<'_, T> {
    /// Moves to the next element; `false` once the end is passed.
    pub fn advance(&mut self) -> bool {
        if !self.started {
            self.node = self.list.raw.head();
            self.started = true;
        } else if !self.node.is_null() {
            self.node = unsafe { sys::alpm_list_next(self.node) };
        }
        !self.node.is_null()
    }

    /// Decodes the element under the cursor.
    pub fn current(&self) -> Result<T> {
        if !self.started || self.node.is_null() {
            return Err(Error::CursorOutOfPosition);
        }
        Ok(unsafe { T::from_raw((*self.node).data) })
    }

    /// Releases the underlying list. Dropping without calling this does the
    /// same; `close` just makes the point of release explicit.
    pub fn close(mut self) {
        self.list.release();
    }
}

impl<T: FromRaw> Iterator for ConsumingCursor<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.advance() {
            self.current().ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palpm_sys::testing;

    /// Payload-free marker element for spine-only tests.
    #[derive(Debug)]
    struct Unit;

    impl FromRaw for Unit {
        unsafe fn from_raw(_data: *mut c_void) -> Self {
            Unit
        }
    }

    #[test]
    fn unowned_release_frees_nothing() {
        testing::reset_spy();
        let head = testing::malloc_null_list(3);
        {
            let mut list = ForeignList::<Unit>::from_ptr(head, Ownership::Unowned);
            assert_eq!(list.count().unwrap(), 3);
            list.release();
        }
        let spy = testing::spy();
        assert_eq!(spy.list_free, 0);
        assert_eq!(spy.list_free_inner, 0);
        // Reclaim the fixture spine now that the adapter is gone.
        ForeignList::<Unit>::from_ptr(head, Ownership::Spine).release();
    }

    #[test]
    fn spine_release_frees_spine_exactly_once() {
        testing::reset_spy();
        let head = testing::malloc_null_list(2);
        let mut list = ForeignList::<Unit>::from_ptr(head, Ownership::Spine);
        list.release();
        list.release();
        drop(list);
        assert_eq!(testing::spy().list_free, 1);
    }

    #[test]
    fn drop_is_the_fallback_release_path() {
        testing::reset_spy();
        let head = testing::malloc_null_list(1);
        drop(ForeignList::<Unit>::from_ptr(head, Ownership::Spine));
        assert_eq!(testing::spy().list_free, 1);
    }

    #[test]
    fn released_list_rejects_every_operation() {
        let head = testing::malloc_null_list(2);
        let mut list = ForeignList::<Unit>::from_ptr(head, Ownership::Spine);
        list.release();
        assert!(matches!(list.count(), Err(Error::UseAfterRelease("list"))));
        assert!(matches!(list.nth(0), Err(Error::UseAfterRelease("list"))));
        assert!(matches!(
            list.cursor().err(),
            Some(Error::UseAfterRelease("list"))
        ));
        assert!(matches!(
            list.into_cursor().err(),
            Some(Error::UseAfterRelease("list"))
        ));
    }

    #[test]
    fn nth_out_of_bounds_reports_len() {
        let head = testing::malloc_null_list(2);
        let list = ForeignList::<Unit>::from_ptr(head, Ownership::Spine);
        match list.nth(5) {
            Err(Error::OutOfBounds { index: 5, len: 2 }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_list_counts_zero() {
        let list = ForeignList::<Unit>::from_ptr(std::ptr::null_mut(), Ownership::Unowned);
        assert_eq!(list.count().unwrap(), 0);
        assert!(list.is_empty().unwrap());
        let mut cursor = list.cursor().unwrap();
        assert!(!cursor.advance());
    }

    #[test]
    fn cursor_positions_and_resets() {
        let head = testing::malloc_null_list(2);
        let list = ForeignList::<Unit>::from_ptr(head, Ownership::Spine);
        let mut cursor = list.cursor().unwrap();

        // Before the first advance there is no current element.
        assert!(matches!(cursor.current(), Err(Error::CursorOutOfPosition)));

        assert!(cursor.advance());
        assert!(cursor.current().is_ok());
        assert!(cursor.advance());
        assert!(!cursor.advance());
        assert!(matches!(cursor.current(), Err(Error::CursorOutOfPosition)));
        // Past the end it stays put.
        assert!(!cursor.advance());

        cursor.reset();
        assert!(cursor.advance());
        assert!(cursor.current().is_ok());
    }

    #[test]
    fn consuming_cursor_releases_on_close() {
        testing::reset_spy();
        let head = testing::malloc_null_list(3);
        let list = ForeignList::<Unit>::from_ptr(head, Ownership::Spine);
        let mut cursor = list.into_cursor().unwrap();
        let mut seen = 0;
        while cursor.advance() {
            cursor.current().unwrap();
            seen += 1;
        }
        assert_eq!(seen, 3);
        assert_eq!(testing::spy().list_free, 0);
        cursor.close();
        assert_eq!(testing::spy().list_free, 1);
    }

    #[test]
    fn consuming_cursor_releases_on_drop() {
        testing::reset_spy();
        let head = testing::malloc_null_list(1);
        let list = ForeignList::<Unit>::from_ptr(head, Ownership::Spine);
        drop(list.into_cursor().unwrap());
        assert_eq!(testing::spy().list_free, 1);
    }
}
