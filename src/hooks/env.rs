//! Environment variable facade.
//!
//! [`EnvView`] delegates every operation to `std::env`; reads,
//! writes, removals, and membership tests record an `EnvAccess`
//! signal carrying the variable name only. Values never enter signal
//! metadata.

use crate::hooks::HookKind;
use crate::monitor::Monitor;
use crate::signal::{SignalMetadata, SignalType};
use std::env::VarError;
use std::ffi::OsString;

/// Value-transparent view over the process environment.
pub struct EnvView {
    monitor: Monitor,
}

impl EnvView {
    pub(crate) fn new(monitor: Monitor) -> Self {
        Self { monitor }
    }

    fn observe(&self, variable: &str) {
        self.monitor.record(
            HookKind::Env,
            SignalType::EnvAccess,
            SignalMetadata::Env {
                variable: variable.to_string(),
            },
        );
    }

    /// Read a variable, exactly as `std::env::var`.
    pub fn var(&self, key: &str) -> Result<String, VarError> {
        self.observe(key);
        std::env::var(key)
    }

    /// Read a variable as an `OsString`, exactly as `std::env::var_os`.
    pub fn var_os(&self, key: &str) -> Option<OsString> {
        self.observe(key);
        std::env::var_os(key)
    }

    /// Set a variable, exactly as `std::env::set_var`.
    pub fn set_var(&self, key: &str, value: impl AsRef<std::ffi::OsStr>) {
        self.observe(key);
        // SAFETY: the monitored host runs single-threaded (env vars
        // are process-global); mutation delegates unchanged.
        unsafe { std::env::set_var(key, value) };
    }

    /// Remove a variable, exactly as `std::env::remove_var`.
    pub fn remove_var(&self, key: &str) {
        self.observe(key);
        // SAFETY: as in set_var.
        unsafe { std::env::remove_var(key) };
    }

    /// Membership test for a variable.
    pub fn contains(&self, key: &str) -> bool {
        self.observe(key);
        std::env::var_os(key).is_some()
    }

    /// Iterate all variables, exactly as `std::env::vars`.
    ///
    /// Iteration is not attributed per key; individual reads are.
    pub fn vars(&self) -> std::env::Vars {
        std::env::vars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Monitor;

    fn view() -> EnvView {
        // An uninstalled monitor: the facade must still delegate.
        EnvView::new(Monitor::new())
    }

    #[test]
    fn test_var_matches_std() {
        // SAFETY: no other test touches this process-global variable.
        unsafe { std::env::set_var("BHEESHMA_TEST_VAR", "value-1") };
        assert_eq!(view().var("BHEESHMA_TEST_VAR").unwrap(), "value-1");
        assert_eq!(
            view().var("BHEESHMA_TEST_MISSING").unwrap_err(),
            std::env::var("BHEESHMA_TEST_MISSING").unwrap_err()
        );
        // SAFETY: as above.
        unsafe { std::env::remove_var("BHEESHMA_TEST_VAR") };
    }

    #[test]
    fn test_set_and_remove_delegate() {
        let view = view();
        view.set_var("BHEESHMA_TEST_SET", "x");
        assert_eq!(std::env::var("BHEESHMA_TEST_SET").unwrap(), "x");
        assert!(view.contains("BHEESHMA_TEST_SET"));
        view.remove_var("BHEESHMA_TEST_SET");
        assert!(!view.contains("BHEESHMA_TEST_SET"));
    }
}
