//! FFI module - Scoped OS handles and error-code helpers
//!
//! This module provides RAII wrappers for the handles used to query a
//! process so they are released when they go out of scope.

mod handles;

#[cfg(windows)]
pub use handles::ProcessHandle;

#[cfg(target_os = "linux")]
pub use handles::MapsHandle;

/// Recovers the Win32 error code from a `windows` crate error.
///
/// Win32 failures surface as `HRESULT_FROM_WIN32` values (`0x8007xxxx`);
/// anything else is returned as the raw HRESULT bits.
#[cfg(windows)]
pub fn win32_error_code(err: &windows::core::Error) -> u32 {
    let hresult = err.code().0 as u32;
    if hresult & 0xFFFF_0000 == 0x8007_0000 {
        hresult & 0xFFFF
    } else {
        hresult
    }
}
