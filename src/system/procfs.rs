//! Module enumeration from `/proc/<pid>/maps`
//!
//! Each distinct file-backed image in the mapping table counts as one
//! module. Its handle is the image's load base: the start of its first
//! mapping minus that mapping's file offset.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::ffi::MapsHandle;

use super::error::{ListError, ListResult};
use super::modules::{ModuleHandle, ModuleSource, ProcessModules};

const ENUM_API: &str = "read /proc/<pid>/maps";

/// Marker the kernel appends to images unlinked after being mapped.
const DELETED_SUFFIX: &str = " (deleted)";

/// Opens processes through procfs.
#[derive(Debug, Default)]
pub struct ProcFsSource;

impl ModuleSource for ProcFsSource {
    type Process = ProcFsProcess;

    fn open_process(&self, pid: u32) -> ListResult<ProcFsProcess> {
        let handle = MapsHandle::open(pid).map_err(|err| {
            debug!("Opening /proc/{}/maps failed: {}", pid, err);
            ListError::ProcessOpen {
                pid,
                code: err.raw_os_error().unwrap_or_default() as u32,
            }
        })?;

        Ok(ProcFsProcess {
            handle,
            paths: BTreeMap::new(),
        })
    }
}

/// A process opened for module queries.
pub struct ProcFsProcess {
    handle: MapsHandle,
    /// Paths from the most recent snapshot, keyed by load base
    paths: BTreeMap<ModuleHandle, String>,
}

impl ProcessModules for ProcFsProcess {
    fn enumerate_modules(&mut self, limit: usize) -> ListResult<Vec<ModuleHandle>> {
        let maps = self.handle.read_maps().map_err(|err| ListError::Enumeration {
            api: ENUM_API,
            code: err.raw_os_error().unwrap_or_default() as u32,
        })?;

        let images = collect_images(&maps, limit);
        debug!(
            "/proc/{}/maps lists {} images (limit {})",
            self.handle.pid(),
            images.len(),
            limit
        );

        let handles = images.iter().map(|(handle, _)| *handle).collect();
        self.paths = images.into_iter().collect();
        Ok(handles)
    }

    fn module_path(&self, module: ModuleHandle) -> Option<String> {
        match self.paths.get(&module) {
            Some(path) if path.ends_with(DELETED_SUFFIX) => {
                debug!("{} ({}) is no longer on disk", path, module);
                None
            }
            Some(path) => Some(path.clone()),
            None => {
                debug!("{} is not part of the last snapshot", module);
                None
            }
        }
    }
}

/// One line of a mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MapsEntry<'a> {
    start: usize,
    offset: usize,
    path: Option<&'a str>,
}

/// Parses a `/proc/<pid>/maps` line:
/// `start-end perms offset dev inode [pathname]`.
fn parse_maps_line(line: &str) -> Option<MapsEntry<'_>> {
    let mut fields = line.splitn(6, ' ');
    let range = fields.next()?;
    let _perms = fields.next()?;
    let offset = fields.next()?;
    let _dev = fields.next()?;
    let _inode = fields.next()?;
    let path = fields
        .next()
        .map(str::trim_start)
        .filter(|path| !path.is_empty());

    let (start, _end) = range.split_once('-')?;
    Some(MapsEntry {
        start: usize::from_str_radix(start, 16).ok()?,
        offset: usize::from_str_radix(offset, 16).ok()?,
        path,
    })
}

/// Collects up to `limit` file-backed images in address order, one per
/// distinct path.
fn collect_images(maps: &str, limit: usize) -> Vec<(ModuleHandle, String)> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for line in maps.lines() {
        if images.len() == limit {
            debug!("Image list truncated at {}", limit);
            break;
        }

        let Some(entry) = parse_maps_line(line) else {
            debug!("Skipping malformed maps line: {:?}", line);
            continue;
        };

        // Anonymous, [heap], [stack], [vdso] and friends are not images
        let Some(path) = entry.path.filter(|path| path.starts_with('/')) else {
            continue;
        };

        if seen.insert(path) {
            let base = ModuleHandle::from_raw(entry.start.saturating_sub(entry.offset));
            images.push((base, path.to_string()));
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MAPS: &str = "\
55d0c6a00000-55d0c6a02000 r--p 00000000 08:01 131 /usr/bin/sleep
55d0c6a02000-55d0c6a06000 r-xp 00002000 08:01 131 /usr/bin/sleep
55d0c7e1d000-55d0c7e3e000 rw-p 00000000 00:00 0                          [heap]
7f3a4b600000-7f3a4b628000 r--p 00000000 08:01 2051                       /usr/lib/x86_64-linux-gnu/libc.so.6
7f3a4b628000-7f3a4b7bd000 r-xp 00028000 08:01 2051                       /usr/lib/x86_64-linux-gnu/libc.so.6
7f3a4b900000-7f3a4b901000 rw-p 00000000 00:00 0
7f3a4ba00000-7f3a4ba01000 r--p 00000000 08:01 77                         /tmp/My Plugin.so
7f3a4bb00000-7f3a4bb01000 r--p 00000000 08:01 78                         /tmp/old.so (deleted)
7ffd5c9c7000-7ffd5c9e8000 rw-p 00000000 00:00 0                          [stack]
7ffd5c9fb000-7ffd5c9fd000 r-xp 00000000 00:00 0                          [vdso]
";

    #[test]
    fn test_parse_line_with_path() {
        let entry = parse_maps_line(
            "7f3a4b628000-7f3a4b7bd000 r-xp 00028000 08:01 2051   /usr/lib/libc.so.6",
        )
        .expect("Should parse");
        assert_eq!(entry.start, 0x7f3a_4b62_8000);
        assert_eq!(entry.offset, 0x28000);
        assert_eq!(entry.path, Some("/usr/lib/libc.so.6"));
    }

    #[test]
    fn test_parse_anonymous_line() {
        let entry = parse_maps_line("7f3a4b900000-7f3a4b901000 rw-p 00000000 00:00 0")
            .expect("Should parse");
        assert_eq!(entry.path, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_maps_line("not a maps line").is_none());
        assert!(parse_maps_line("").is_none());
    }

    #[test]
    fn test_collect_one_entry_per_image() {
        let images = collect_images(SAMPLE_MAPS, 1024);
        let paths: Vec<&str> = images.iter().map(|(_, path)| path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/usr/bin/sleep",
                "/usr/lib/x86_64-linux-gnu/libc.so.6",
                "/tmp/My Plugin.so",
                "/tmp/old.so (deleted)",
            ]
        );
        assert_eq!(images[0].0.raw(), 0x55d0_c6a0_0000);
        assert_eq!(images[1].0.raw(), 0x7f3a_4b60_0000);
    }

    #[test]
    fn test_collect_stops_at_limit() {
        let images = collect_images(SAMPLE_MAPS, 2);
        assert_eq!(images.len(), 2);
        assert!(collect_images(SAMPLE_MAPS, 0).is_empty());
    }

    #[test]
    fn test_deleted_image_is_unresolvable() {
        let mut process = ProcFsSource
            .open_process(std::process::id())
            .expect("Should open our own process");
        process.paths = collect_images(SAMPLE_MAPS, 1024).into_iter().collect();

        let deleted = ModuleHandle::from_raw(0x7f3a_4bb0_0000);
        let libc = ModuleHandle::from_raw(0x7f3a_4b60_0000);
        assert_eq!(process.module_path(deleted), None);
        assert_eq!(
            process.module_path(libc).as_deref(),
            Some("/usr/lib/x86_64-linux-gnu/libc.so.6")
        );
        assert_eq!(process.module_path(ModuleHandle::from_raw(1)), None);
    }

    #[test]
    fn test_enumerate_current_process() {
        let mut process = ProcFsSource
            .open_process(std::process::id())
            .expect("Should open our own process");
        let modules = process.enumerate_modules(1024).expect("Should enumerate");
        assert!(!modules.is_empty(), "Should find at least the main image");

        let exe = std::env::current_exe().expect("current exe");
        let found = modules
            .iter()
            .filter_map(|module| process.module_path(*module))
            .any(|path| std::path::Path::new(&path) == exe);
        assert!(found, "Should list the test binary itself");
    }

    #[test]
    fn test_open_nonexistent_process() {
        let result = ProcFsSource.open_process(u32::MAX);
        assert!(matches!(result, Err(ListError::ProcessOpen { .. })));
    }
}
