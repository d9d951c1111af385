//! Named failure checkpoints.
//!
//! Code that needs to be abortable at a precise point calls
//! [`check`] with a checkpoint name. Tests enable a checkpoint to force an
//! artificial error the next time execution reaches it, which is how the
//! sort's rollback guarantees are exercised. When nothing is enabled the
//! check is a single relaxed atomic load.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rowexec_error::{Result, RowexecError};

static ANY_ENABLED: AtomicBool = AtomicBool::new(false);
static ENABLED: LazyLock<Mutex<HashSet<&'static str>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

pub fn enable(name: &'static str) {
    ENABLED.lock().insert(name);
    ANY_ENABLED.store(true, Ordering::Relaxed);
}

pub fn disable(name: &'static str) {
    let mut enabled = ENABLED.lock();
    enabled.remove(name);
    if enabled.is_empty() {
        ANY_ENABLED.store(false, Ordering::Relaxed);
    }
}

pub fn clear_all() {
    ENABLED.lock().clear();
    ANY_ENABLED.store(false, Ordering::Relaxed);
}

/// Error out if the named checkpoint is enabled.
pub fn check(name: &'static str) -> Result<()> {
    if !ANY_ENABLED.load(Ordering::Relaxed) {
        return Ok(());
    }
    if ENABLED.lock().contains(name) {
        return Err(RowexecError::new("Failpoint triggered").with_field("failpoint", name));
    }
    Ok(())
}

/// Enable a checkpoint for the lifetime of the guard.
pub fn enabled(name: &'static str) -> EnabledFailpoint {
    enable(name);
    EnabledFailpoint { name }
}

#[derive(Debug)]
pub struct EnabledFailpoint {
    name: &'static str,
}

impl Drop for EnabledFailpoint {
    fn drop(&mut self) {
        disable(self.name);
    }
}

/// Serialize tests that flip global failpoint state.
#[cfg(test)]
pub(crate) fn exclusive() -> parking_lot::MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_passes_then_triggers() {
        let _lock = exclusive();

        check("util::test_point").unwrap();

        let guard = enabled("util::test_point");
        let err = check("util::test_point").unwrap_err();
        assert!(err.to_string().contains("util::test_point"));

        // Other checkpoints are unaffected.
        check("util::other_point").unwrap();

        drop(guard);
        check("util::test_point").unwrap();
    }
}
