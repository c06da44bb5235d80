#![forbid(unsafe_code)]

//! Exception hook for failures raised by user code.
//!
//! Event handlers, binding transforms, lifecycle hooks and background tasks
//! run on behalf of the application. Their errors are caught where they are
//! invoked and handed to [`report`], which forwards them to the hook installed
//! for the current runtime thread, or logs them at `ERROR` level when no hook
//! is installed. Reporting never interrupts the caller.

use std::cell::RefCell;
use std::error::Error as StdError;
use std::rc::Rc;

type Hook = Rc<dyn Fn(&str, &(dyn StdError + 'static))>;

thread_local! {
    static HOOK: RefCell<Option<Hook>> = const { RefCell::new(None) };
}

/// Install `hook` for the current thread, replacing any previous one.
///
/// The hook receives the origin (e.g. `"event handler"`) and the error.
pub fn set_exception_hook(hook: impl Fn(&str, &(dyn StdError + 'static)) + 'static) {
    HOOK.with(|slot| *slot.borrow_mut() = Some(Rc::new(hook)));
}

/// Remove the hook of the current thread; reports fall back to logging.
pub fn clear_exception_hook() {
    HOOK.with(|slot| slot.borrow_mut().take());
}

/// Report a failure raised by user code.
pub fn report(origin: &str, error: &(dyn StdError + 'static)) {
    // Clone out so a hook that reports again does not re-borrow.
    let hook = HOOK.with(|slot| slot.borrow().clone());
    match hook {
        Some(hook) => hook(origin, error),
        None => tracing::error!(origin, error = %error, "unhandled exception in user code"),
    }
}
