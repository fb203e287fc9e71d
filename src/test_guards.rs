//! Scoped environment overrides for tests that read `DESKWATCH_*` variables.
//!
//! Mark every test using these `#[serial]`: the environment is shared by the
//! whole test process.

use std::env;
use std::ffi::{OsStr, OsString};

/// Puts a variable back the way it was when the guard drops.
pub struct EnvGuard {
    key: &'static str,
    previous: Option<OsString>,
}

impl EnvGuard {
    /// Set `key` to `value` until the guard drops.
    ///
    /// # Safety
    /// Mutates the process environment; the caller must be `#[serial]`.
    pub unsafe fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
        unsafe { Self::replace(key, Some(value.as_ref())) }
    }

    /// Unset `key` until the guard drops.
    ///
    /// # Safety
    /// Mutates the process environment; the caller must be `#[serial]`.
    pub unsafe fn remove(key: &'static str) -> Self {
        unsafe { Self::replace(key, None) }
    }

    unsafe fn replace(key: &'static str, value: Option<&OsStr>) -> Self {
        let previous = env::var_os(key);
        unsafe { write_var(key, value) };
        EnvGuard { key, previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: guards only live inside #[serial] tests
        unsafe { write_var(self.key, self.previous.as_deref()) };
    }
}

unsafe fn write_var(key: &str, value: Option<&OsStr>) {
    match value {
        Some(value) => unsafe { env::set_var(key, value) },
        None => unsafe { env::remove_var(key) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_override_restores_previous_value() {
        let key = "DESKWATCH_TEST_GUARD_EXISTING";
        let _outer = unsafe { EnvGuard::set(key, "before") };
        {
            let _inner = unsafe { EnvGuard::set(key, "during") };
            assert_eq!(env::var(key).unwrap(), "during");
        }
        assert_eq!(env::var(key).unwrap(), "before");
    }

    #[test]
    #[serial]
    fn test_override_of_absent_var_is_removed_again() {
        let key = "DESKWATCH_TEST_GUARD_ABSENT";
        let _outer = unsafe { EnvGuard::remove(key) };
        {
            let _inner = unsafe { EnvGuard::set(key, "temporary") };
            assert!(env::var(key).is_ok());
        }
        assert!(env::var(key).is_err());
    }
}
