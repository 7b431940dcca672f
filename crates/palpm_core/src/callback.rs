//! Callback bridge between libalpm and Rust handlers.
//!
//! Native callbacks carry a `ctx` pointer. Passing a Rust object's address
//! through it would hand the C side a pointer it can outlive, so the bridge
//! passes an opaque token instead: a counter value that a process-wide
//! registry maps back to the live bridge state. Once a bridge is revoked the
//! token resolves to nothing and a late native call is simply dropped.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::handle::Handle;
use crate::question::Question;
use crate::util::lossy_string;
use libc::{c_char, c_int, c_void};
use palpm_sys as sys;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// The four native callback slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Event,
    Fetch,
    Question,
    Progress,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Event => "event",
            Self::Fetch => "fetch",
            Self::Question => "question",
            Self::Progress => "progress",
        };
        f.write_str(name)
    }
}

/// What a progress report is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    AddStart,
    UpgradeStart,
    DowngradeStart,
    ReinstallStart,
    RemoveStart,
    ConflictsStart,
    DiskSpaceStart,
    IntegrityStart,
    LoadStart,
    KeyringStart,
}

impl ProgressKind {
    fn decode(kind: sys::alpm_progress_t) -> Self {
        use sys::alpm_progress_t::*;
        match kind {
            ALPM_PROGRESS_ADD_START => Self::AddStart,
            ALPM_PROGRESS_UPGRADE_START => Self::UpgradeStart,
            ALPM_PROGRESS_DOWNGRADE_START => Self::DowngradeStart,
            ALPM_PROGRESS_REINSTALL_START => Self::ReinstallStart,
            ALPM_PROGRESS_REMOVE_START => Self::RemoveStart,
            ALPM_PROGRESS_CONFLICTS_START => Self::ConflictsStart,
            ALPM_PROGRESS_DISKSPACE_START => Self::DiskSpaceStart,
            ALPM_PROGRESS_INTEGRITY_START => Self::IntegrityStart,
            ALPM_PROGRESS_LOAD_START => Self::LoadStart,
            ALPM_PROGRESS_KEYRING_START => Self::KeyringStart,
        }
    }
}

/// A decoded progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub kind: ProgressKind,
    pub package: String,
    pub percent: i32,
    /// Total number of targets in the operation.
    pub total: usize,
    /// 1-based position of the current target.
    pub current: usize,
}

type EventHandler = Box<dyn FnMut(Event) + Send>;
type FetchHandler = Box<dyn FnMut(&str, &str, bool) -> i32 + Send>;
type QuestionHandler = Box<dyn FnMut(Question) + Send>;
type ProgressHandler = Box<dyn FnMut(Progress) + Send>;

#[derive(Default)]
struct Slots {
    event: Option<EventHandler>,
    fetch: Option<FetchHandler>,
    question: Option<QuestionHandler>,
    progress: Option<ProgressHandler>,
}

struct BridgeShared {
    slots: Mutex<Slots>,
}

static REGISTRY: Mutex<BTreeMap<u64, Arc<BridgeShared>>> = Mutex::new(BTreeMap::new());
// Which token currently holds the native slots of each handle. A later
// registration supersedes the earlier one, and only the superseding bridge
// may reset the slots on revoke.
static HANDLE_OWNERS: Mutex<BTreeMap<usize, u64>> = Mutex::new(BTreeMap::new());
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn lookup(ctx: *mut c_void) -> Option<Arc<BridgeShared>> {
    REGISTRY.lock().get(&(ctx as usize as u64)).cloned()
}

// The trampolines take the handler out of its slot for the duration of the
// call and put it back afterwards. A handler replaced mid-call wins over the
// one being restored; a handler that re-enters its own slot sees it empty
// rather than deadlocking on the mutex.

unsafe extern "C" fn event_trampoline(ctx: *mut c_void, ev: *mut sys::alpm_event_t) {
    let Some(shared) = lookup(ctx) else { return };
    let event = Event::decode(ev);
    let taken = shared.slots.lock().event.take();
    if let Some(mut handler) = taken {
        handler(event);
        shared.slots.lock().event.get_or_insert(handler);
    }
}

unsafe extern "C" fn fetch_trampoline(
    ctx: *mut c_void,
    url: *const c_char,
    localpath: *const c_char,
    force: c_int,
) -> c_int {
    let Some(shared) = lookup(ctx) else { return 0 };
    let url = lossy_string(url);
    let localpath = lossy_string(localpath);
    let taken = shared.slots.lock().fetch.take();
    match taken {
        Some(mut handler) => {
            // Forwarded verbatim; -1/0/1 is libalpm's retry contract.
            let ret = handler(&url, &localpath, force != 0);
            shared.slots.lock().fetch.get_or_insert(handler);
            ret
        }
        None => 0,
    }
}

unsafe extern "C" fn question_trampoline(ctx: *mut c_void, q: *mut sys::alpm_question_t) {
    let Some(shared) = lookup(ctx) else { return };
    let question = Question::decode(q);
    let taken = shared.slots.lock().question.take();
    if let Some(mut handler) = taken {
        handler(question);
        shared.slots.lock().question.get_or_insert(handler);
    }
}

unsafe extern "C" fn progress_trampoline(
    ctx: *mut c_void,
    kind: sys::alpm_progress_t,
    pkgname: *const c_char,
    percent: c_int,
    howmany: usize,
    current: usize,
) {
    let Some(shared) = lookup(ctx) else { return };
    let progress = Progress {
        kind: ProgressKind::decode(kind),
        package: lossy_string(pkgname),
        percent,
        total: howmany,
        current,
    };
    let taken = shared.slots.lock().progress.take();
    if let Some(mut handler) = taken {
        handler(progress);
        shared.slots.lock().progress.get_or_insert(handler);
    }
}

/// Registered callback slots on a handle.
///
/// Registering installs all four trampolines at once; handlers are attached
/// and swapped afterwards without touching the native registrations. The
/// bridge revokes itself on drop.
///
/// Registering a second bridge on the same handle supersedes the first, the
/// same way setting a native callback replaces the previous one: the
/// superseded bridge's handlers stop firing, and revoking or dropping it
/// later does not disturb the live bridge's registrations.
pub struct CallbackBridge<'h> {
    handle: &'h Handle,
    token: u64,
    shared: Arc<BridgeShared>,
    revoked: bool,
}

impl fmt::Debug for CallbackBridge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackBridge")
            .field("token", &self.token)
            .field("revoked", &self.revoked)
            .finish_non_exhaustive()
    }
}

impl<'h> CallbackBridge<'h> {
    /// Installs the four trampolines on the handle.
    ///
    /// Registration is all-or-nothing: if any slot is refused, the slots
    /// installed before it are reset and the whole registration fails.
    pub fn register(handle: &'h Handle) -> Result<Self> {
        let ptr = handle.raw()?;
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(BridgeShared {
            slots: Mutex::new(Slots::default()),
        });
        REGISTRY.lock().insert(token, shared.clone());
        let ctx = token as usize as *mut c_void;

        unsafe {
            if sys::alpm_option_set_eventcb(ptr, Some(event_trampoline), ctx) != 0 {
                return Err(Self::registration_failed(handle, ptr, token, 0, CallbackKind::Event));
            }
            if sys::alpm_option_set_fetchcb(ptr, Some(fetch_trampoline), ctx) != 0 {
                return Err(Self::registration_failed(handle, ptr, token, 1, CallbackKind::Fetch));
            }
            if sys::alpm_option_set_questioncb(ptr, Some(question_trampoline), ctx) != 0 {
                return Err(Self::registration_failed(
                    handle,
                    ptr,
                    token,
                    2,
                    CallbackKind::Question,
                ));
            }
            if sys::alpm_option_set_progresscb(ptr, Some(progress_trampoline), ctx) != 0 {
                return Err(Self::registration_failed(
                    handle,
                    ptr,
                    token,
                    3,
                    CallbackKind::Progress,
                ));
            }
        }

        HANDLE_OWNERS.lock().insert(ptr as usize, token);
        debug!(token, "registered callback bridge");
        Ok(Self {
            handle,
            token,
            shared,
            revoked: false,
        })
    }

    /// Builds the registration error and unwinds the slots already
    /// installed, in installation order.
    fn registration_failed(
        handle: &Handle,
        ptr: *mut sys::alpm_handle_t,
        token: u64,
        installed: usize,
        kind: CallbackKind,
    ) -> Error {
        // Capture the errno before the resets below overwrite it.
        let source = Box::new(handle.error());
        REGISTRY.lock().remove(&token);
        unsafe {
            if installed >= 1 {
                let _ = sys::alpm_option_set_eventcb(ptr, None, ptr::null_mut());
            }
            if installed >= 2 {
                let _ = sys::alpm_option_set_fetchcb(ptr, None, ptr::null_mut());
            }
            if installed >= 3 {
                let _ = sys::alpm_option_set_questioncb(ptr, None, ptr::null_mut());
            }
        }
        debug!(token, %kind, "callback registration rolled back");
        Error::CallbackRegistration { kind, source }
    }

    /// The registry token identifying this bridge.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Attaches (or replaces) the event handler.
    pub fn on_event(&self, handler: impl FnMut(Event) + Send + 'static) {
        self.shared.slots.lock().event = Some(Box::new(handler));
    }

    /// Attaches (or replaces) the fetch handler. The handler's return value
    /// is forwarded to libalpm unchanged: -1 error, 0 success, 1 file
    /// already up to date.
    pub fn on_fetch(&self, handler: impl FnMut(&str, &str, bool) -> i32 + Send + 'static) {
        self.shared.slots.lock().fetch = Some(Box::new(handler));
    }

    /// Attaches (or replaces) the question handler.
    pub fn on_question(&self, handler: impl FnMut(Question) + Send + 'static) {
        self.shared.slots.lock().question = Some(Box::new(handler));
    }

    /// Attaches (or replaces) the progress handler.
    pub fn on_progress(&self, handler: impl FnMut(Progress) + Send + 'static) {
        self.shared.slots.lock().progress = Some(Box::new(handler));
    }

    /// Removes the token from the registry and resets the native slots.
    /// Idempotent. A native call still in flight with the stale token
    /// resolves to nothing and is dropped by the trampoline.
    ///
    /// The native slots are only reset while this bridge still holds them.
    /// A bridge superseded by a later registration leaves the live bridge's
    /// slots alone and just retires its own token.
    pub fn revoke(&mut self) {
        if self.revoked {
            return;
        }
        REGISTRY.lock().remove(&self.token);
        if let Ok(ptr) = self.handle.raw() {
            let mut owners = HANDLE_OWNERS.lock();
            if owners.get(&(ptr as usize)) == Some(&self.token) {
                owners.remove(&(ptr as usize));
                drop(owners);
                unsafe {
                    let _ = sys::alpm_option_set_eventcb(ptr, None, ptr::null_mut());
                    let _ = sys::alpm_option_set_fetchcb(ptr, None, ptr::null_mut());
                    let _ = sys::alpm_option_set_questioncb(ptr, None, ptr::null_mut());
                    let _ = sys::alpm_option_set_progresscb(ptr, None, ptr::null_mut());
                }
            }
        }
        self.revoked = true;
        debug!(token = self.token, "revoked callback bridge");
    }
}

impl Drop for CallbackBridge<'_> {
    fn drop(&mut self) {
        self.revoke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use palpm_sys::testing::{self, CbSlot};

    fn open() -> Handle {
        Handle::open("/", "/db").unwrap()
    }

    #[test]
    fn fetch_return_value_is_forwarded_verbatim() {
        testing::reset_spy();
        let handle = open();
        let bridge = CallbackBridge::register(&handle).unwrap();
        bridge.on_fetch(|url, _localpath, _force| if url.ends_with(".sig") { 1 } else { -1 });

        let raw = handle.as_raw();
        assert_eq!(testing::invoke_fetch(raw, "https://m/x.sig", "/cache", false), Some(1));
        assert_eq!(testing::invoke_fetch(raw, "https://m/x.pkg", "/cache", true), Some(-1));
        assert_eq!(testing::spy().fetch_returns, vec![1, -1]);
    }

    #[test]
    fn missing_fetch_handler_reports_success() {
        let handle = open();
        let _bridge = CallbackBridge::register(&handle).unwrap();
        assert_eq!(
            testing::invoke_fetch(handle.as_raw(), "https://m/a", "/cache", false),
            Some(0)
        );
    }

    #[test]
    fn event_handler_receives_decoded_events() {
        let handle = open();
        let bridge = CallbackBridge::register(&handle).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bridge.on_event(move |event| sink.lock().push(event));

        testing::invoke_event(
            handle.as_raw(),
            sys::alpm_event_type_t::ALPM_EVENT_TRANSACTION_START,
        );
        testing::invoke_event_scriptlet_info(handle.as_raw(), "echo done");

        let seen = seen.lock();
        assert_eq!(seen[0], Event::TransactionStart);
        assert_eq!(
            seen[1],
            Event::ScriptletInfo {
                line: "echo done".into()
            }
        );
    }

    #[test]
    fn question_handler_receives_decoded_questions() {
        let handle = open();
        let bridge = CallbackBridge::register(&handle).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bridge.on_question(move |question| sink.lock().push(question));

        testing::invoke_question_install_ignorepkg(handle.as_raw(), "linux-lts", 1);
        assert_eq!(
            seen.lock()[0],
            Question::InstallIgnorePkg {
                package: "linux-lts".into(),
                install: true
            }
        );
    }

    #[test]
    fn progress_handler_receives_decoded_reports() {
        let handle = open();
        let bridge = CallbackBridge::register(&handle).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bridge.on_progress(move |progress| sink.lock().push(progress));

        testing::invoke_progress(
            handle.as_raw(),
            sys::alpm_progress_t::ALPM_PROGRESS_ADD_START,
            "vim",
            40,
            3,
            1,
        );
        assert_eq!(
            seen.lock()[0],
            Progress {
                kind: ProgressKind::AddStart,
                package: "vim".into(),
                percent: 40,
                total: 3,
                current: 1,
            }
        );
    }

    #[test]
    fn replacing_a_handler_takes_effect_immediately() {
        let handle = open();
        let bridge = CallbackBridge::register(&handle).unwrap();
        bridge.on_fetch(|_, _, _| -1);
        bridge.on_fetch(|_, _, _| 1);
        assert_eq!(
            testing::invoke_fetch(handle.as_raw(), "https://m/a", "/c", false),
            Some(1)
        );
    }

    #[test]
    fn revoke_resets_native_slots_and_is_idempotent() {
        let handle = open();
        let mut bridge = CallbackBridge::register(&handle).unwrap();
        bridge.on_fetch(|_, _, _| 1);
        bridge.revoke();
        bridge.revoke();
        // The native slot is empty again, so there is nothing to invoke.
        assert_eq!(
            testing::invoke_fetch(handle.as_raw(), "https://m/a", "/c", false),
            None
        );
    }

    #[test]
    fn stale_token_turns_trampolines_into_no_ops() {
        let handle = open();
        let mut bridge = CallbackBridge::register(&handle).unwrap();
        let fired = Arc::new(Mutex::new(false));
        let sink = fired.clone();
        bridge.on_event(move |_| *sink.lock() = true);
        let token = bridge.token();
        bridge.revoke();

        // Simulate a native call still holding the revoked token.
        let ctx = token as usize as *mut c_void;
        let mut ev = sys::alpm_event_t {
            any: sys::alpm_event_any_t {
                type_: sys::alpm_event_type_t::ALPM_EVENT_TRANSACTION_START,
            },
        };
        unsafe { event_trampoline(ctx, &mut ev) };
        assert_eq!(
            unsafe { fetch_trampoline(ctx, ptr::null(), ptr::null(), 0) },
            0
        );
        assert!(!*fired.lock());
    }

    #[test]
    fn failed_registration_rolls_back_installed_slots() {
        testing::reset_spy();
        let handle = open();
        // Third registration (the question slot) is refused.
        testing::fail_cb_registration_at(2);
        let err = CallbackBridge::register(&handle).unwrap_err();
        match &err {
            Error::CallbackRegistration { kind, .. } => assert_eq!(*kind, CallbackKind::Question),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(err.native_kind(), Some(ErrorKind::WrongArgs));

        let regs = testing::spy().cb_registrations;
        let summary: Vec<(CbSlot, bool, bool)> = regs
            .iter()
            .map(|r| (r.slot, r.installed, r.accepted))
            .collect();
        assert_eq!(
            summary,
            vec![
                (CbSlot::Event, true, true),
                (CbSlot::Fetch, true, true),
                (CbSlot::Question, true, false),
                // Rollback resets the two slots that had been installed.
                (CbSlot::Event, false, true),
                (CbSlot::Fetch, false, true),
            ]
        );

        // The handle is clean; a fresh registration succeeds.
        let bridge = CallbackBridge::register(&handle).unwrap();
        drop(bridge);
    }

    #[test]
    fn second_bridge_supersedes_the_first() {
        let handle = open();
        let first = CallbackBridge::register(&handle).unwrap();
        first.on_fetch(|_, _, _| -1);
        let second = CallbackBridge::register(&handle).unwrap();
        second.on_fetch(|_, _, _| 1);
        // The native slots now route to the second bridge.
        assert_eq!(
            testing::invoke_fetch(handle.as_raw(), "https://m/a", "/c", false),
            Some(1)
        );
    }

    #[test]
    fn dropping_a_superseded_bridge_leaves_the_live_bridge_registered() {
        let handle = open();
        let first = CallbackBridge::register(&handle).unwrap();
        let second = CallbackBridge::register(&handle).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        second.on_event(move |event| sink.lock().push(event));
        second.on_fetch(|_, _, _| 1);

        drop(first);

        testing::invoke_event(
            handle.as_raw(),
            sys::alpm_event_type_t::ALPM_EVENT_TRANSACTION_START,
        );
        assert_eq!(seen.lock().as_slice(), [Event::TransactionStart]);
        assert_eq!(
            testing::invoke_fetch(handle.as_raw(), "https://m/a", "/c", false),
            Some(1)
        );
    }

    #[test]
    fn tokens_are_unique_per_registration() {
        let handle = open();
        let first = CallbackBridge::register(&handle).unwrap();
        let first_token = first.token();
        drop(first);
        let second = CallbackBridge::register(&handle).unwrap();
        assert_ne!(first_token, second.token());
    }
}
