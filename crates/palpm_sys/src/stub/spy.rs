//! Call-count spy over the fake native layer.
//!
//! Thread-local, matching the one-thread-per-test harness: counts recorded by
//! one test are invisible to the others.

use std::cell::RefCell;

/// Which callback slot a registration touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbSlot {
    Event,
    Fetch,
    Question,
    Progress,
}

/// One observed `alpm_option_set_*cb` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbRegistration {
    /// The slot that was set.
    pub slot: CbSlot,
    /// Whether a non-null callback was installed (false = reset to null).
    pub installed: bool,
    /// Whether the native layer accepted the registration.
    pub accepted: bool,
}

/// Snapshot of every native call the tests care about.
#[derive(Debug, Default, Clone)]
pub struct Spy {
    /// `alpm_release` calls.
    pub handle_release: usize,
    /// `alpm_trans_release` calls.
    pub trans_release: usize,
    /// `alpm_list_free` calls.
    pub list_free: usize,
    /// `alpm_list_free_inner` calls.
    pub list_free_inner: usize,
    /// The free-function pointers handed to `alpm_list_free_inner`, in order.
    pub inner_free_fns: Vec<usize>,
    /// `alpm_dep_free` calls.
    pub dep_free: usize,
    /// `alpm_depmissing_free` calls.
    pub depmissing_free: usize,
    /// Values returned through the fetch callback, in order.
    pub fetch_returns: Vec<i32>,
    /// Callback registration history.
    pub cb_registrations: Vec<CbRegistration>,
    /// Free/release primitive names in call order, for ordering assertions.
    pub ops: Vec<&'static str>,
}

thread_local! {
    static SPY: RefCell<Spy> = RefCell::new(Spy::default());
}

pub(crate) fn with<R>(f: impl FnOnce(&mut Spy) -> R) -> R {
    SPY.with(|s| f(&mut s.borrow_mut()))
}

/// Returns a snapshot of the current thread's spy.
pub fn spy() -> Spy {
    with(|s| s.clone())
}

/// Clears the current thread's spy.
pub fn reset_spy() {
    with(|s| *s = Spy::default());
}
