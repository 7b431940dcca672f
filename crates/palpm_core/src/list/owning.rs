//! List adapter that cascades release into its elements.

use super::{Cursor, ForeignList, FromRaw, Iter, Ownership};
use crate::error::Result;
use palpm_sys as sys;

/// An element backed by a native resource that must be freed exactly once.
pub trait ReleaseNative {
    /// Frees the native resource behind this element. Called once per
    /// element by the owning adapter during release.
    fn release_native(&mut self) -> Result<()>;
}

/// A list adapter that owns its elements' native resources.
///
/// Release runs in two phases: every element's [`ReleaseNative`] first, the
/// spine after. Element release routines may still need to read through the
/// spine, so the order is load-bearing. Dropping without an explicit release
/// performs the same cascade.
pub struct OwningList<'h, T: FromRaw + ReleaseNative> {
    inner: ForeignList<'h, T>,
}

impl<'h, T: FromRaw + ReleaseNative> OwningList<'h, T> {
    pub(crate) fn from_ptr(head: *mut sys::alpm_list_t, mode: Ownership) -> Self {
        Self {
            inner: ForeignList::from_ptr(head, mode),
        }
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

    pub fn nth(&self, index: usize) -> Result<T> {
        self.inner.nth(index)
    }

    pub fn cursor(&self) -> Result<Cursor<'_, T>> {
        self.inner.cursor()
    }

    pub fn iter(&self) -> Result<Iter<'_, T>> {
        self.inner.iter()
    }

    /// Releases every element, then the spine. Best effort: one element
    /// failing does not stop the pass, and the first error is reported only
    /// after the whole cascade ran. Idempotent.
    pub fn release(&mut self) -> Result<()> {
        if self.inner.raw.is_released() {
            return Ok(());
        }
        let mut first_err = None;
        let mut node = self.inner.raw.head();
        while !node.is_null() {
            let mut item = unsafe { T::from_raw((*node).data) };
            if let Err(err) = item.release_native() {
                first_err.get_or_insert(err);
            }
            node = unsafe { sys::alpm_list_next(node) };
        }
        self.inner.release();
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<T: FromRaw + ReleaseNative> Drop for OwningList<'_, T> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dep::Depend;
    use crate::error::Error;
    use palpm_sys::testing;

    #[test]
    fn release_frees_elements_before_spine() {
        testing::reset_spy();
        let head = testing::malloc_dep_list(&["glibc", "zlib", "openssl"]);
        let mut list = OwningList::<Depend>::from_ptr(head, Ownership::Spine);
        assert_eq!(list.count().unwrap(), 3);
        list.release().unwrap();

        let spy = testing::spy();
        assert_eq!(spy.dep_free, 3);
        assert_eq!(spy.list_free, 1);
        assert_eq!(
            spy.ops,
            vec!["dep_free", "dep_free", "dep_free", "list_free"]
        );
    }

    #[test]
    fn release_cascade_runs_exactly_once() {
        testing::reset_spy();
        let head = testing::malloc_dep_list(&["glibc"]);
        let mut list = OwningList::<Depend>::from_ptr(head, Ownership::Spine);
        list.release().unwrap();
        list.release().unwrap();
        drop(list);

        let spy = testing::spy();
        assert_eq!(spy.dep_free, 1);
        assert_eq!(spy.list_free, 1);
    }

    #[test]
    fn drop_cascades_like_release() {
        testing::reset_spy();
        let head = testing::malloc_dep_list(&["glibc", "zlib"]);
        drop(OwningList::<Depend>::from_ptr(head, Ownership::Spine));

        let spy = testing::spy();
        assert_eq!(spy.dep_free, 2);
        assert_eq!(spy.list_free, 1);
    }

    #[test]
    fn elements_decode_before_release() {
        let head = testing::malloc_dep_list(&["glibc", "zlib"]);
        let list = OwningList::<Depend>::from_ptr(head, Ownership::Spine);
        let names: Vec<String> = list.iter().unwrap().map(|d| d.name()).collect();
        assert_eq!(names, ["glibc", "zlib"]);
    }

    #[test]
    fn released_adapter_rejects_reads() {
        let head = testing::malloc_dep_list(&["glibc"]);
        let mut list = OwningList::<Depend>::from_ptr(head, Ownership::Spine);
        list.release().unwrap();
        assert!(matches!(list.count(), Err(Error::UseAfterRelease("list"))));
    }
}
