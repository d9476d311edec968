//! Module enumeration using the Process Status API
//!
//! Opens the target with `PROCESS_QUERY_INFORMATION | PROCESS_VM_READ`,
//! lists its modules with `EnumProcessModules` and resolves each one with
//! `GetModuleFileNameExW`.
//!
//! Only modules matching this tool's bitness are visible: a 64-bit build
//! sees just the native modules of a WOW64 process, and a 32-bit build
//! fails to enumerate a 64-bit process (`ERROR_PARTIAL_COPY`).

use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;

use log::debug;
use windows::Win32::Foundation::{GetLastError, HMODULE, MAX_PATH};
use windows::Win32::System::ProcessStatus::{EnumProcessModules, GetModuleFileNameExW};
use windows::Win32::System::Threading::{PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};

use crate::constants::MAX_MODULE_PATH_CHARS;
use crate::ffi::{win32_error_code, ProcessHandle};

use super::error::{ListError, ListResult};
use super::modules::{size_then_fill, ModuleHandle, ModuleSource, ProcessModules};

const ENUM_API: &str = "EnumProcessModules";

/// Opens processes through the Win32 API.
#[derive(Debug, Default)]
pub struct PsapiSource;

impl ModuleSource for PsapiSource {
    type Process = PsapiProcess;

    fn open_process(&self, pid: u32) -> ListResult<PsapiProcess> {
        let handle = ProcessHandle::open(pid, PROCESS_QUERY_INFORMATION | PROCESS_VM_READ)
            .map_err(|err| {
                let code = win32_error_code(&err);
                debug!("OpenProcess({}) failed: {} ({})", pid, code, err);
                ListError::ProcessOpen { pid, code }
            })?;

        Ok(PsapiProcess { handle })
    }
}

/// A process opened for module queries.
pub struct PsapiProcess {
    handle: ProcessHandle,
}

impl PsapiProcess {
    /// Calls `EnumProcessModules` with `buffer` and returns how many
    /// handles the full module list has.
    fn query(&self, buffer: &mut [HMODULE]) -> ListResult<usize> {
        let mut needed: u32 = 0;
        let data = if buffer.is_empty() {
            ptr::null_mut()
        } else {
            buffer.as_mut_ptr()
        };

        // SAFETY: `data` points at `buffer.len()` writable HMODULEs (or is
        // null with a zero byte count) and the process handle is open.
        unsafe {
            EnumProcessModules(
                self.handle.as_raw(),
                data,
                (buffer.len() * size_of::<HMODULE>()) as u32,
                &mut needed,
            )
        }
        .map_err(|err| ListError::Enumeration {
            api: ENUM_API,
            code: win32_error_code(&err),
        })?;

        Ok(needed as usize / size_of::<HMODULE>())
    }
}

impl ProcessModules for PsapiProcess {
    fn enumerate_modules(&mut self, limit: usize) -> ListResult<Vec<ModuleHandle>> {
        let modules = size_then_fill(limit, HMODULE(ptr::null_mut()), |buffer| {
            self.query(buffer)
        })?;
        debug!("{} returned {} modules", ENUM_API, modules.len());

        Ok(modules
            .into_iter()
            .map(|module| ModuleHandle::from_raw(module.0 as usize))
            .collect())
    }

    fn module_path(&self, module: ModuleHandle) -> Option<String> {
        let hmodule = HMODULE(module.raw() as *mut c_void);
        let mut buffer = vec![0u16; MAX_PATH as usize];

        loop {
            // SAFETY: The process handle is open and `buffer` is a valid
            // writable slice; a stale module handle only makes the call fail.
            let length =
                unsafe { GetModuleFileNameExW(self.handle.as_raw(), hmodule, &mut buffer) }
                    as usize;

            if length == 0 {
                // SAFETY: GetLastError has no preconditions.
                debug!("GetModuleFileNameExW({}) failed: {:?}", module, unsafe {
                    GetLastError()
                });
                return None;
            }

            // A full buffer means the path may have been cut short
            if length < buffer.len() || buffer.len() >= MAX_MODULE_PATH_CHARS {
                buffer.truncate(length);
                return Some(String::from_utf16_lossy(&buffer));
            }

            buffer.resize(buffer.len() * 2, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_current_process() {
        let mut process = PsapiSource
            .open_process(std::process::id())
            .expect("Should open our own process");
        let modules = process.enumerate_modules(1024).expect("Should enumerate");
        assert!(!modules.is_empty(), "Should find at least the main image");

        let main_image = process.module_path(modules[0]);
        assert!(main_image.is_some(), "Should resolve the main image path");
    }

    #[test]
    fn test_enumerate_respects_limit() {
        let mut process = PsapiSource
            .open_process(std::process::id())
            .expect("Should open our own process");
        let modules = process.enumerate_modules(1).expect("Should enumerate");
        assert_eq!(modules.len(), 1);
    }

    #[test]
    fn test_open_nonexistent_process() {
        let result = PsapiSource.open_process(u32::MAX - 3);
        assert!(matches!(result, Err(ListError::ProcessOpen { .. })));
    }
}
