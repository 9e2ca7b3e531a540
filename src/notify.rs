//! Wait object signalled by asynchronous change notification.

use crate::error::{RegistryError, Result};
use std::time::Duration;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows::Win32::System::Threading::{CreateEventW, WaitForSingleObject, INFINITE};

/// An auto-reset OS event, initially unsignalled. Closed on drop.
///
/// Pass it to [`RegistryKey::notify_change_async`](crate::RegistryKey::notify_change_async)
/// and wait on it from whichever thread should observe the change.
#[derive(Debug)]
pub struct ChangeEvent(HANDLE);

// Event handles may be waited on and signalled from any thread.
unsafe impl Send for ChangeEvent {}
unsafe impl Sync for ChangeEvent {}

impl ChangeEvent {
    /// # Errors
    ///
    /// Returns error if the OS cannot create the event
    pub fn new() -> Result<Self> {
        let handle = unsafe { CreateEventW(None, false, false, PCWSTR::null()) }
            .map_err(|e| os_error("CreateEventW", &e))?;
        Ok(Self(handle))
    }

    pub(crate) const fn handle(&self) -> HANDLE {
        self.0
    }

    /// Block until the event is signalled.
    pub fn wait(&self) -> Result {
        self.wait_millis(INFINITE).map(|_| ())
    }

    /// Block for at most `timeout`; `Ok(false)` if it elapsed unsignalled.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(INFINITE - 1);
        self.wait_millis(millis)
    }

    fn wait_millis(&self, millis: u32) -> Result<bool> {
        let outcome = unsafe { WaitForSingleObject(self.0, millis) };
        if outcome == WAIT_OBJECT_0 {
            Ok(true)
        } else if outcome == WAIT_TIMEOUT {
            Ok(false)
        } else {
            Err(os_error(
                "WaitForSingleObject",
                &windows::core::Error::from_thread(),
            ))
        }
    }
}

/// Recover the Win32 status carried in the low word of a `FACILITY_WIN32` HRESULT.
fn os_error(operation: &'static str, err: &windows::core::Error) -> RegistryError {
    RegistryError::from_status(operation, "change event", err.code().0.cast_unsigned() & 0xFFFF)
}

impl Drop for ChangeEvent {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }
}
