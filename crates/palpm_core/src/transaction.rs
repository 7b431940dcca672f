//! The transaction state machine.

use crate::dep::DepMissing;
use crate::error::{Error, ErrorKind, Result};
use crate::handle::Handle;
use crate::list::{ForeignList, Ownership, OwningList, StringList};
use crate::package::Package;
use bitflags::bitflags;
use libc::c_int;
use palpm_sys as sys;
use std::fmt;
use std::ptr;
use tracing::debug;

bitflags! {
    /// Transaction behavior flags (`alpm_transflag_t`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransFlags: u32 {
        /// Ignore dependency checks.
        const NODEPS = sys::ALPM_TRANS_FLAG_NODEPS;
        /// Delete files even if they are tagged as backup.
        const NOSAVE = sys::ALPM_TRANS_FLAG_NOSAVE;
        /// Ignore version numbers when checking dependencies.
        const NODEPVERSION = sys::ALPM_TRANS_FLAG_NODEPVERSION;
        /// Remove also any packages depending on a package being removed.
        const CASCADE = sys::ALPM_TRANS_FLAG_CASCADE;
        /// Remove packages and their unneeded deps (not explicitly installed).
        const RECURSE = sys::ALPM_TRANS_FLAG_RECURSE;
        /// Modify database but do not commit changes to the filesystem.
        const DBONLY = sys::ALPM_TRANS_FLAG_DBONLY;
        /// Do not run hooks during the transaction.
        const NOHOOKS = sys::ALPM_TRANS_FLAG_NOHOOKS;
        /// Mark all installed packages as dependencies.
        const ALLDEPS = sys::ALPM_TRANS_FLAG_ALLDEPS;
        /// Only download packages and do not actually install.
        const DOWNLOADONLY = sys::ALPM_TRANS_FLAG_DOWNLOADONLY;
        /// Do not execute install scriptlets.
        const NOSCRIPTLET = sys::ALPM_TRANS_FLAG_NOSCRIPTLET;
        /// Ignore dependency conflicts.
        const NOCONFLICTS = sys::ALPM_TRANS_FLAG_NOCONFLICTS;
        /// Do not install a package if it is already installed and up to date.
        const NEEDED = sys::ALPM_TRANS_FLAG_NEEDED;
        /// Mark all installed packages as explicitly requested.
        const ALLEXPLICIT = sys::ALPM_TRANS_FLAG_ALLEXPLICIT;
        /// Do not remove a package if it is needed by another one.
        const UNNEEDED = sys::ALPM_TRANS_FLAG_UNNEEDED;
        /// Remove also explicitly installed unneeded deps.
        const RECURSEALL = sys::ALPM_TRANS_FLAG_RECURSEALL;
        /// Do not lock the database during the operation.
        const NOLOCK = sys::ALPM_TRANS_FLAG_NOLOCK;
    }
}

/// Phases of a transaction's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransState {
    /// Natively initialized; accepting targets.
    Initialized,
    /// Dependency resolution succeeded; ready to commit.
    Prepared,
    /// Changes applied.
    Committed,
    /// Native transaction released; the object is inert.
    Released,
}

impl fmt::Display for TransState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialized => "initialized",
            Self::Prepared => "prepared",
            Self::Committed => "committed",
            Self::Released => "released",
        };
        f.write_str(name)
    }
}

/// An active transaction on a handle.
///
/// libalpm permits one transaction per handle at a time; the native layer
/// enforces that and a second [`Handle::transaction`] call fails until the
/// first transaction is released. The phases run strictly forward:
/// initialized, prepared, committed, released. Out-of-order calls fail with
/// [`Error::TransactionState`] before touching the native layer.
#[derive(Debug)]
pub struct Transaction<'h> {
    handle: &'h Handle,
    state: TransState,
}

impl<'h> Transaction<'h> {
    pub(crate) fn begin(handle: &'h Handle, flags: TransFlags) -> Result<Self> {
        let ptr = handle.raw()?;
        if unsafe { sys::alpm_trans_init(ptr, flags.bits() as c_int) } != 0 {
            return Err(handle.error());
        }
        debug!(?flags, "transaction initialized");
        Ok(Self {
            handle,
            state: TransState::Initialized,
        })
    }

    /// Current phase.
    pub fn state(&self) -> TransState {
        self.state
    }

    /// Guard for operations valid in exactly one phase.
    fn raw_in(&self, expected: TransState) -> Result<*mut sys::alpm_handle_t> {
        if self.state == TransState::Released {
            return Err(Error::UseAfterRelease("transaction"));
        }
        if self.state != expected {
            return Err(Error::TransactionState {
                expected,
                actual: self.state,
            });
        }
        self.handle.raw()
    }

    /// Guard for operations valid in any phase before release.
    fn raw_active(&self) -> Result<*mut sys::alpm_handle_t> {
        if self.state == TransState::Released {
            return Err(Error::UseAfterRelease("transaction"));
        }
        self.handle.raw()
    }

    /// Flags the native transaction was initialized with.
    pub fn flags(&self) -> Result<TransFlags> {
        let ptr = self.raw_active()?;
        let bits = unsafe { sys::alpm_trans_get_flags(ptr) };
        if bits < 0 {
            Err(self.handle.error())
        } else {
            Ok(TransFlags::from_bits_truncate(bits as u32))
        }
    }

    /// Queues a package for installation.
    pub fn add(&mut self, pkg: &Package<'h>) -> Result<()> {
        self.target(pkg, false)
    }

    /// Queues a package for removal.
    pub fn remove(&mut self, pkg: &Package<'h>) -> Result<()> {
        self.target(pkg, true)
    }

    fn target(&mut self, pkg: &Package<'h>, removal: bool) -> Result<()> {
        let ptr = self.raw_in(TransState::Initialized)?;
        let status = unsafe {
            if removal {
                sys::alpm_remove_pkg(ptr, pkg.as_ptr())
            } else {
                sys::alpm_add_pkg(ptr, pkg.as_ptr())
            }
        };
        if status != 0 {
            let source = Box::new(self.handle.error());
            return Err(Error::Package {
                name: pkg.name(),
                source,
            });
        }
        debug!(pkg = %pkg.name(), removal, "queued transaction target");
        Ok(())
    }

    /// Queues an upgrade for every installed package that a sync database
    /// carries a newer version of.
    ///
    /// Candidates land on the add list as if passed to [`Transaction::add`];
    /// prepare and commit then treat them like any other target. With
    /// `enable_downgrade` set, sync packages older than the installed
    /// version are queued as well.
    pub fn sysupgrade(&mut self, enable_downgrade: bool) -> Result<()> {
        let ptr = self.raw_in(TransState::Initialized)?;
        if unsafe { sys::alpm_sync_sysupgrade(ptr, c_int::from(enable_downgrade)) } != 0 {
            return Err(self.handle.error());
        }
        debug!(enable_downgrade, "queued system upgrade targets");
        Ok(())
    }

    /// Resolves dependencies for the queued targets.
    ///
    /// On success the transaction moves to prepared and the returned list is
    /// empty. When the only problem is unsatisfied dependencies, the records
    /// come back as a non-empty owning list, the transaction stays
    /// initialized, and no error is raised: missing dependencies are a
    /// result to inspect, not a failure of the call. Any other native
    /// failure is returned as an error.
    pub fn prepare(&mut self) -> Result<OwningList<'h, DepMissing<'h>>> {
        let ptr = self.raw_in(TransState::Initialized)?;
        let mut data: *mut sys::alpm_list_t = ptr::null_mut();
        let status = unsafe { sys::alpm_trans_prepare(ptr, &mut data) };
        if status == 0 {
            self.state = TransState::Prepared;
            debug!("transaction prepared");
            return Ok(OwningList::from_ptr(data, Ownership::Spine));
        }

        let err = self.handle.error();
        let missing = OwningList::from_ptr(data, Ownership::Spine);
        if err.native_kind() == Some(ErrorKind::UnsatisfiedDependencies)
            && matches!(missing.is_empty(), Ok(false))
        {
            debug!("transaction preparation found unsatisfied dependencies");
            return Ok(missing);
        }
        // `missing` drops here and reclaims whatever the native layer
        // populated before failing.
        Err(err)
    }

    /// Applies the prepared transaction.
    ///
    /// On success the out-list of detail strings comes back as a string
    /// list (normally empty). On failure the details are drained into the
    /// error and the transaction stays prepared.
    pub fn commit(&mut self) -> Result<StringList<'h>> {
        let ptr = self.raw_in(TransState::Prepared)?;
        let mut data: *mut sys::alpm_list_t = ptr::null_mut();
        let status = unsafe { sys::alpm_trans_commit(ptr, &mut data) };
        if status == 0 {
            self.state = TransState::Committed;
            debug!("transaction committed");
            return Ok(StringList::from_ptr(data, Ownership::SpineAndLibraryPayload));
        }

        let err = self.handle.error();
        let kind = err.native_kind().unwrap_or(ErrorKind::Unknown(-1));
        let details = StringList::from_ptr(data, Ownership::SpineAndLibraryPayload)
            .into_vec()
            .unwrap_or_default();
        Err(Error::Commit { kind, details })
    }

    /// Requests interruption of a running commit. Safe to call from a
    /// callback handler.
    pub fn interrupt(&self) -> Result<()> {
        let ptr = self.raw_active()?;
        if unsafe { sys::alpm_trans_interrupt(ptr) } != 0 {
            Err(self.handle.error())
        } else {
            Ok(())
        }
    }

    /// Packages queued for installation. Library-owned list.
    pub fn added(&self) -> Result<ForeignList<'h, Package<'h>>> {
        let ptr = self.raw_active()?;
        let head = unsafe { sys::alpm_trans_get_add(ptr) };
        Ok(ForeignList::from_ptr(head, Ownership::Unowned))
    }

    /// Packages queued for removal. Library-owned list.
    pub fn removed(&self) -> Result<ForeignList<'h, Package<'h>>> {
        let ptr = self.raw_active()?;
        let head = unsafe { sys::alpm_trans_get_remove(ptr) };
        Ok(ForeignList::from_ptr(head, Ownership::Unowned))
    }

    /// Releases the native transaction. Idempotent; runs from any phase.
    pub fn release(&mut self) {
        if self.state == TransState::Released {
            return;
        }
        if let Ok(ptr) = self.handle.raw() {
            // Failure is swallowed: there is no caller context left to act
            // on it and the object must become inert either way.
            let _ = unsafe { sys::alpm_trans_release(ptr) };
        }
        self.state = TransState::Released;
        debug!("transaction released");
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palpm_sys::testing;

    fn open_seeded() -> Handle {
        let handle = Handle::open("/", "/db").unwrap();
        testing::register_local_pkg(handle.as_raw(), "glibc", "2.39-1", &[]);
        testing::register_local_pkg(handle.as_raw(), "vim", "9.1.0-1", &["glibc"]);
        handle
    }

    #[test]
    fn one_transaction_per_handle() {
        let handle = open_seeded();
        let first = handle.transaction(TransFlags::empty()).unwrap();
        let second = handle.transaction(TransFlags::empty());
        assert_eq!(
            second.unwrap_err().native_kind(),
            Some(ErrorKind::TransactionAlreadyActive)
        );
        drop(first);
        // Releasing the first makes room for another.
        handle.transaction(TransFlags::empty()).unwrap();
    }

    #[test]
    fn flags_roundtrip_through_the_native_layer() {
        let handle = open_seeded();
        let flags = TransFlags::NODEPS | TransFlags::DBONLY;
        let trans = handle.transaction(flags).unwrap();
        assert_eq!(trans.flags().unwrap(), flags);
    }

    #[test]
    fn prepare_then_commit_walks_the_phases() {
        let handle = open_seeded();
        let db = handle.localdb().unwrap();
        let mut trans = handle.transaction(TransFlags::empty()).unwrap();
        assert_eq!(trans.state(), TransState::Initialized);

        trans.add(&db.pkg("vim").unwrap()).unwrap();
        let added: Vec<String> = trans.added().unwrap().iter().unwrap().map(|p| p.name()).collect();
        assert_eq!(added, ["vim"]);

        let missing = trans.prepare().unwrap();
        assert!(missing.is_empty().unwrap());
        assert_eq!(trans.state(), TransState::Prepared);

        let details = trans.commit().unwrap();
        assert!(details.is_empty().unwrap());
        assert_eq!(trans.state(), TransState::Committed);
        assert!(testing::installed(handle.as_raw(), "vim"));
    }

    #[test]
    fn commit_before_prepare_is_rejected_locally() {
        let handle = open_seeded();
        let mut trans = handle.transaction(TransFlags::empty()).unwrap();
        match trans.commit() {
            Err(Error::TransactionState {
                expected: TransState::Prepared,
                actual: TransState::Initialized,
            }) => {}
            other => panic!("unexpected: {other:?}"),
        }
        // The failed call did not advance the phase.
        assert_eq!(trans.state(), TransState::Initialized);
    }

    #[test]
    fn add_after_prepare_is_rejected() {
        let handle = open_seeded();
        let db = handle.localdb().unwrap();
        let mut trans = handle.transaction(TransFlags::empty()).unwrap();
        trans.add(&db.pkg("glibc").unwrap()).unwrap();
        trans.prepare().unwrap();
        match trans.add(&db.pkg("vim").unwrap()) {
            Err(Error::TransactionState {
                expected: TransState::Initialized,
                actual: TransState::Prepared,
            }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn duplicate_target_reports_package_scope() {
        let handle = open_seeded();
        let db = handle.localdb().unwrap();
        let mut trans = handle.transaction(TransFlags::empty()).unwrap();
        let pkg = db.pkg("vim").unwrap();
        trans.add(&pkg).unwrap();
        match trans.add(&pkg) {
            Err(Error::Package { name, source }) => {
                assert_eq!(name, "vim");
                assert_eq!(source.native_kind(), Some(ErrorKind::TransactionDupTarget));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unsatisfied_deps_return_records_without_advancing() {
        let handle = Handle::open("/", "/db").unwrap();
        testing::register_local_pkg(handle.as_raw(), "app", "1.0-1", &["libmissing"]);
        let db = handle.localdb().unwrap();
        let mut trans = handle.transaction(TransFlags::empty()).unwrap();
        trans.add(&db.pkg("app").unwrap()).unwrap();

        let missing = trans.prepare().unwrap();
        assert_eq!(missing.count().unwrap(), 1);
        assert_eq!(missing.nth(0).unwrap().name(), "libmissing");
        assert_eq!(trans.state(), TransState::Initialized);

        // Commit stays unreachable while the records are unresolved.
        assert!(matches!(
            trans.commit(),
            Err(Error::TransactionState { .. })
        ));
    }

    #[test]
    fn nodeps_skips_dependency_resolution() {
        let handle = Handle::open("/", "/db").unwrap();
        testing::register_local_pkg(handle.as_raw(), "app", "1.0-1", &["libmissing"]);
        let db = handle.localdb().unwrap();
        let mut trans = handle.transaction(TransFlags::NODEPS).unwrap();
        trans.add(&db.pkg("app").unwrap()).unwrap();
        let missing = trans.prepare().unwrap();
        assert!(missing.is_empty().unwrap());
        assert_eq!(trans.state(), TransState::Prepared);
    }

    fn open_with_syncdb() -> Handle {
        let handle = Handle::open("/", "/db").unwrap();
        testing::register_local_pkg(handle.as_raw(), "vim", "9.0.0-1", &[]);
        testing::register_local_pkg(handle.as_raw(), "bash", "5.2-1", &[]);
        let core = handle.register_syncdb("core", 0).unwrap();
        testing::register_sync_pkg(core.as_raw(), "vim", "9.1.0-1", &[]);
        testing::register_sync_pkg(core.as_raw(), "bash", "5.1-1", &[]);
        testing::register_sync_pkg(core.as_raw(), "new-tool", "1.0-1", &[]);
        handle
    }

    #[test]
    fn sysupgrade_queues_newer_sync_packages() {
        let handle = open_with_syncdb();
        let mut trans = handle.transaction(TransFlags::empty()).unwrap();
        trans.sysupgrade(false).unwrap();

        // Only the package with a newer sync version is queued; the older
        // sync version and the never-installed package are skipped.
        let added: Vec<String> = trans.added().unwrap().iter().unwrap().map(|p| p.name()).collect();
        assert_eq!(added, ["vim"]);

        trans.prepare().unwrap();
        trans.commit().unwrap();
        assert!(testing::installed(handle.as_raw(), "vim"));
    }

    #[test]
    fn sysupgrade_with_downgrade_queues_older_sync_packages() {
        let handle = open_with_syncdb();
        let mut trans = handle.transaction(TransFlags::empty()).unwrap();
        trans.sysupgrade(true).unwrap();
        let added: Vec<String> = trans.added().unwrap().iter().unwrap().map(|p| p.name()).collect();
        assert_eq!(added, ["vim", "bash"]);
    }

    #[test]
    fn sysupgrade_after_prepare_is_rejected() {
        let handle = open_with_syncdb();
        let mut trans = handle.transaction(TransFlags::empty()).unwrap();
        trans.prepare().unwrap();
        match trans.sysupgrade(false) {
            Err(Error::TransactionState {
                expected: TransState::Initialized,
                actual: TransState::Prepared,
            }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn release_is_idempotent_and_invalidates() {
        testing::reset_spy();
        let handle = open_seeded();
        let mut trans = handle.transaction(TransFlags::empty()).unwrap();
        trans.release();
        trans.release();
        assert_eq!(testing::spy().trans_release, 1);

        assert!(matches!(
            trans.prepare(),
            Err(Error::UseAfterRelease("transaction"))
        ));
        assert!(matches!(
            trans.added(),
            Err(Error::UseAfterRelease("transaction"))
        ));
        assert!(matches!(
            trans.flags(),
            Err(Error::UseAfterRelease("transaction"))
        ));
    }

    #[test]
    fn drop_releases_the_native_transaction() {
        testing::reset_spy();
        let handle = open_seeded();
        drop(handle.transaction(TransFlags::empty()).unwrap());
        assert_eq!(testing::spy().trans_release, 1);
    }

    #[test]
    fn interrupt_flags_a_running_transaction() {
        let handle = open_seeded();
        let trans = handle.transaction(TransFlags::empty()).unwrap();
        trans.interrupt().unwrap();
    }
}
