//! System module - Loaded-module queries against a target process
//!
//! This module provides the error taxonomy, the module types and one
//! backend per supported platform behind the `ModuleSource` trait.

pub mod error;
pub mod modules;

#[cfg(windows)]
mod psapi;

#[cfg(target_os = "linux")]
mod procfs;

#[cfg(not(any(windows, target_os = "linux")))]
compile_error!("module listing is implemented for Windows and Linux only");

/// Module source for the platform this binary was built for.
#[cfg(windows)]
pub type NativeSource = psapi::PsapiSource;

/// Module source for the platform this binary was built for.
#[cfg(target_os = "linux")]
pub type NativeSource = procfs::ProcFsSource;
