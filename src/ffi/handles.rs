//! Scoped OS handles for the target process
//!
//! These wrappers release the underlying handle when they go out of
//! scope, on the success path and on every early return.

#[cfg(windows)]
pub use self::win32::ProcessHandle;

#[cfg(target_os = "linux")]
pub use self::procfs::MapsHandle;

#[cfg(windows)]
mod win32 {
    use log::debug;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::System::Threading::{OpenProcess, PROCESS_ACCESS_RIGHTS};

    /// A safe wrapper around a Windows process HANDLE.
    /// Automatically closes the handle when dropped.
    pub struct ProcessHandle {
        handle: HANDLE,
        pid: u32,
    }

    impl ProcessHandle {
        /// Opens a process by PID with the specified access rights.
        ///
        /// # Arguments
        /// * `pid` - The process identifier
        /// * `access` - The access rights requested for the process
        ///
        /// # Returns
        /// * `Ok(ProcessHandle)` - A wrapped handle to the process
        /// * `Err` - If the process cannot be opened (access denied, process exited, etc.)
        pub fn open(pid: u32, access: PROCESS_ACCESS_RIGHTS) -> windows::core::Result<Self> {
            // SAFETY: OpenProcess is safe to call with valid parameters.
            // A failed open comes back as Err and leaves nothing to close.
            let handle = unsafe { OpenProcess(access, false, pid)? };
            debug!("Opened process {} ({:?})", pid, handle);
            Ok(Self { handle, pid })
        }

        /// Returns the raw HANDLE for use with Win32 APIs.
        pub fn as_raw(&self) -> HANDLE {
            self.handle
        }
    }

    impl Drop for ProcessHandle {
        fn drop(&mut self) {
            // SAFETY: We own this handle and it's valid (we got it from OpenProcess).
            // CloseHandle is safe to call on a valid handle exactly once.
            unsafe {
                let _ = CloseHandle(self.handle);
            }
            debug!("Released handle for process {}", self.pid);
        }
    }
}

#[cfg(target_os = "linux")]
mod procfs {
    use std::fs::File;
    use std::io::{self, Read, Seek, SeekFrom};

    use log::debug;

    /// An open `/proc/<pid>/maps` descriptor.
    ///
    /// Opening performs the kernel's read-access check against the target,
    /// so a successful open plays the role of an acquired process handle.
    /// The descriptor is closed when dropped.
    pub struct MapsHandle {
        file: File,
        pid: u32,
    }

    impl MapsHandle {
        pub fn open(pid: u32) -> io::Result<Self> {
            let file = File::open(format!("/proc/{}/maps", pid))?;
            debug!("Opened /proc/{}/maps", pid);
            Ok(Self { file, pid })
        }

        /// Reads the whole mapping table as it is at the time of the call.
        pub fn read_maps(&mut self) -> io::Result<String> {
            self.file.seek(SeekFrom::Start(0))?;
            let mut raw = Vec::new();
            self.file.read_to_end(&mut raw)?;
            Ok(String::from_utf8_lossy(&raw).into_owned())
        }

        pub fn pid(&self) -> u32 {
            self.pid
        }
    }

    impl Drop for MapsHandle {
        fn drop(&mut self) {
            debug!("Released /proc/{}/maps", self.pid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(windows)]
    #[test]
    fn test_open_current_process() {
        use windows::Win32::System::Threading::{PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};

        let pid = std::process::id();
        let handle = ProcessHandle::open(pid, PROCESS_QUERY_INFORMATION | PROCESS_VM_READ);
        assert!(handle.is_ok(), "Should open our own process");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_open_current_process() {
        let pid = std::process::id();
        let mut handle = MapsHandle::open(pid).expect("Should open our own maps");
        assert_eq!(handle.pid(), pid);

        let first = handle.read_maps().expect("Should read maps");
        assert!(!first.is_empty(), "Maps should not be empty");

        // Reading again rewinds rather than hitting EOF
        let second = handle.read_maps().expect("Should read maps twice");
        assert!(!second.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_open_nonexistent_process() {
        let err = MapsHandle::open(u32::MAX).err().expect("Should fail for bogus PID");
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
