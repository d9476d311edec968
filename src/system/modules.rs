//! Loaded-module types and the OS query seam
//!
//! A [`ModuleSource`] opens a process; the opened [`ProcessModules`] value
//! owns the OS handle for the rest of the query and releases it when
//! dropped.

use std::fmt;
use std::mem;

use log::debug;

use super::error::ListResult;

/// Opaque reference to one module mapped into the target process.
///
/// On Windows this is the raw `HMODULE` value (the module's load address);
/// on Linux it is the load base of the image's first mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleHandle(usize);

impl ModuleHandle {
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ModuleHandle {
    /// Formats as `0x` followed by uppercase hex zero-padded to pointer width.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = mem::size_of::<usize>() * 2;
        write!(f, "0x{:0width$X}", self.0, width = width)
    }
}

/// A module path paired with its handle, produced only for display.
#[derive(Debug)]
pub struct ModuleRecord<'a> {
    pub path: &'a str,
    pub handle: ModuleHandle,
}

impl fmt::Display for ModuleRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\t{} ({})", self.path, self.handle)
    }
}

/// Opens processes for module queries.
pub trait ModuleSource {
    type Process: ProcessModules;

    /// Acquires a query handle for `pid` with read-query and
    /// read-memory access.
    ///
    /// # Returns
    /// * `Ok(Process)` - An open process, released when dropped
    /// * `Err(ListError::ProcessOpen)` - If the process cannot be opened
    fn open_process(&self, pid: u32) -> ListResult<Self::Process>;
}

/// Module queries against one opened process.
pub trait ProcessModules {
    /// Takes a snapshot of the modules currently mapped into the process.
    ///
    /// `limit` bounds the buffers used for the query; implementations may
    /// return fewer handles but never need to return more.
    fn enumerate_modules(&mut self, limit: usize) -> ListResult<Vec<ModuleHandle>>;

    /// Resolves a module handle to its full file path, or `None` if the
    /// module can no longer be resolved.
    fn module_path(&self, module: ModuleHandle) -> Option<String>;
}

/// Two-call enumeration: one size query with an empty buffer, then one
/// fill into `min(needed, limit)` slots.
///
/// `query` fills the slice it is given and returns how many entries the
/// full list has. Entries the fill could not hold, whether past `limit` or
/// added between the two calls, are left out.
#[cfg_attr(not(windows), allow(dead_code))]
pub fn size_then_fill<T, F>(limit: usize, empty: T, mut query: F) -> ListResult<Vec<T>>
where
    T: Clone,
    F: FnMut(&mut [T]) -> ListResult<usize>,
{
    let needed = query(&mut [])?;

    let mut entries = vec![empty; needed.min(limit)];
    let available = query(&mut entries)?;
    if available > entries.len() {
        debug!("Module list truncated at {} of {}", entries.len(), available);
    }
    entries.truncate(available);

    Ok(entries)
}
