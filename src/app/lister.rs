//! The module listing: acquire, enumerate, resolve and print, release

use std::io::Write;

use log::debug;

use crate::system::error::ListResult;
use crate::system::modules::{ModuleRecord, ModuleSource, ProcessModules};

/// Counts from one completed listing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListSummary {
    /// Module lines written
    pub reported: usize,
    /// Modules whose path could not be resolved
    pub skipped: usize,
}

/// Lists the modules loaded by `pid` to `out`.
///
/// Writes the header line once the process is open, then one line per
/// resolvable module. At most `capacity` modules are considered; any beyond
/// that are silently left out. Modules whose path cannot be resolved are
/// skipped without failing the listing.
///
/// # Returns
/// * `Ok(ListSummary)` - Counts of printed and skipped modules
/// * `Err(ListError::ProcessOpen)` - If the process cannot be opened
/// * `Err(ListError::Enumeration)` - If the module-list query fails
/// * `Err(ListError::Output)` - If writing to `out` fails
pub fn list_modules<S, W>(
    source: &S,
    pid: u32,
    capacity: usize,
    out: &mut W,
) -> ListResult<ListSummary>
where
    S: ModuleSource,
    W: Write,
{
    let mut process = source.open_process(pid)?;

    writeln!(out, "Modules loaded by Process ID: {}", pid)?;

    let modules = process.enumerate_modules(capacity)?;
    if modules.len() > capacity {
        debug!("Dropping {} modules beyond {}", modules.len() - capacity, capacity);
    }

    let mut summary = ListSummary::default();
    for handle in modules.into_iter().take(capacity) {
        match process.module_path(handle) {
            Some(path) => {
                writeln!(out, "{}", ModuleRecord { path: &path, handle })?;
                summary.reported += 1;
            }
            None => {
                debug!("Skipping module {}: path not resolvable", handle);
                summary.skipped += 1;
            }
        }
    }

    drop(process);
    out.flush()?;

    Ok(summary)
}
