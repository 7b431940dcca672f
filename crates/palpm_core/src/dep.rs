//! Dependency records.

use crate::error::Result;
use crate::handle::Handle;
use crate::list::{FromRaw, ReleaseNative};
use crate::util::{lossy_string, opt_string};
use libc::c_void;
use palpm_sys as sys;
use std::marker::PhantomData;

/// A dependency specification (`alpm_depend_t`).
///
/// Produced either as a library-owned view (package dependency lists) or as
/// an element of an owning list that frees it through [`ReleaseNative`].
pub struct Depend<'h> {
    ptr: *mut sys::alpm_depend_t,
    _handle: PhantomData<&'h Handle>,
}

impl FromRaw for Depend<'_> {
    unsafe fn from_raw(data: *mut c_void) -> Self {
        Self {
            ptr: data as *mut sys::alpm_depend_t,
            _handle: PhantomData,
        }
    }
}

impl Depend<'_> {
    pub fn name(&self) -> String {
        unsafe { lossy_string((*self.ptr).name) }
    }

    pub fn version(&self) -> Option<String> {
        unsafe { opt_string((*self.ptr).version) }
    }

    pub fn description(&self) -> Option<String> {
        unsafe { opt_string((*self.ptr).desc) }
    }

    /// The version comparison operator of this dependency.
    pub fn depmod(&self) -> sys::alpm_depmod_t {
        unsafe { (*self.ptr).mod_ }
    }
}

impl ReleaseNative for Depend<'_> {
    fn release_native(&mut self) -> Result<()> {
        unsafe { sys::alpm_dep_free(self.ptr) };
        Ok(())
    }
}

/// A missing-dependency record (`alpm_depmissing_t`) reported by a failed
/// transaction preparation.
pub struct DepMissing<'h> {
    ptr: *mut sys::alpm_depmissing_t,
    _handle: PhantomData<&'h Handle>,
}

impl FromRaw for DepMissing<'_> {
    unsafe fn from_raw(data: *mut c_void) -> Self {
        Self {
            ptr: data as *mut sys::alpm_depmissing_t,
            _handle: PhantomData,
        }
    }
}

impl<'h> DepMissing<'h> {
    /// The target whose dependency could not be satisfied.
    pub fn target(&self) -> String {
        unsafe { lossy_string((*self.ptr).target) }
    }

    /// The package responsible for the breakage, when known.
    pub fn causing_pkg(&self) -> Option<String> {
        unsafe { opt_string((*self.ptr).causingpkg) }
    }

    /// A view of the unsatisfied dependency itself. Do not release it; the
    /// record owns it and frees it together with itself.
    pub fn depend(&self) -> Depend<'h> {
        Depend {
            ptr: unsafe { (*self.ptr).depend },
            _handle: PhantomData,
        }
    }

    /// Name of the unsatisfied dependency.
    pub fn name(&self) -> String {
        self.depend().name()
    }
}

impl ReleaseNative for DepMissing<'_> {
    fn release_native(&mut self) -> Result<()> {
        unsafe { sys::alpm_depmissing_free(self.ptr) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::{Ownership, OwningList};
    use palpm_sys::testing;

    #[test]
    fn depend_exposes_record_fields() {
        let head = testing::malloc_dep_list(&["ncurses"]);
        let list = OwningList::<Depend>::from_ptr(head, Ownership::Spine);
        let dep = list.nth(0).unwrap();
        assert_eq!(dep.name(), "ncurses");
        assert_eq!(dep.version(), None);
        assert_eq!(dep.depmod(), sys::alpm_depmod_t::ALPM_DEP_MOD_ANY);
    }

    #[test]
    fn owning_depmissing_list_frees_records() {
        testing::reset_spy();
        let handle = Handle::open("/", "/db").unwrap();
        testing::register_local_pkg(handle.as_raw(), "app", "1.0", &["missing-lib"]);

        let db = handle.localdb().unwrap();
        let mut trans = handle.transaction(crate::TransFlags::empty()).unwrap();
        trans.add(&db.pkg("app").unwrap()).unwrap();
        let mut missing = trans.prepare().unwrap();
        assert_eq!(missing.count().unwrap(), 1);
        let record = missing.nth(0).unwrap();
        assert_eq!(record.name(), "missing-lib");
        assert_eq!(record.target(), "app");

        missing.release().unwrap();
        let spy = testing::spy();
        assert_eq!(spy.depmissing_free, 1);
        assert_eq!(spy.list_free, 1);
    }
}
