//! Loaded Modules CLI
//!
//! Lists the modules (main image and shared libraries) mapped into a
//! running process, with each module's full path and handle value.
//!
//! Usage:
//! - `-p, --process-id <PID>`: process to inspect (required)
//! - `-m, --max-modules <COUNT>`: stop after this many modules [default: 1024]
//! - `-h, --help`: print usage (exits with a failure status)
//!
//! Set `RUST_LOG=debug` to trace the individual OS queries.

mod app;
mod constants;
mod ffi;
mod system;

use std::env;
use std::io::{self, ErrorKind, Write};
use std::process::ExitCode;

use log::{debug, info};

use app::{list_modules, Cli, Invocation};
use system::error::{ListError, ListResult};
use system::NativeSource;

fn main() -> ExitCode {
    env_logger::builder().parse_default_env().init();

    let cli = Cli::new();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => report_error(&err, cli.usage(), &mut io::stderr().lock()),
    }
}

/// Prints `Error: <message>`, a blank line and the usage text.
///
/// A closed stdout (e.g. piped into `head`) is not worth reporting; the run
/// still ends with a failure status.
fn report_error<W: Write>(err: &ListError, usage: &str, stderr: &mut W) -> ExitCode {
    if let ListError::Output(io_err) = err {
        if io_err.kind() == ErrorKind::BrokenPipe {
            debug!("Output closed early: {}", io_err);
            return ExitCode::FAILURE;
        }
    }

    let _ = writeln!(stderr, "Error: {}", err);
    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "{}", usage);
    ExitCode::FAILURE
}

/// Runs one invocation. Every failure propagates here unhandled so it is
/// reported once, together with the usage text.
fn run(cli: &Cli) -> ListResult<ExitCode> {
    match cli.parse_from(env::args_os())? {
        Invocation::Help => {
            println!("{}", cli.usage());
            // Long-standing behavior: --help exits with a failure status
            Ok(ExitCode::FAILURE)
        }
        Invocation::Version(version) => {
            print!("{}", version);
            Ok(ExitCode::SUCCESS)
        }
        Invocation::List(request) => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let summary = list_modules(
                &NativeSource::default(),
                request.process_id,
                request.max_modules,
                &mut out,
            )?;

            info!(
                "Listed {} modules of process {} ({} unresolvable)",
                summary.reported, request.process_id, summary.skipped
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::error::ArgumentError;

    const USAGE: &str = "Usage: loaded_modules_cli [OPTIONS]";

    fn report(err: ListError) -> (ExitCode, String) {
        let mut stderr = Vec::new();
        let code = report_error(&err, USAGE, &mut stderr);
        (code, String::from_utf8(stderr).expect("utf8 stderr"))
    }

    #[test]
    fn test_error_is_reported_with_usage() {
        let (code, text) = report(ArgumentError::MissingProcessId.into());
        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(text, format!("Error: No process ID specified.\n\n{}\n", USAGE));
    }

    #[test]
    fn test_broken_pipe_is_silent() {
        let err = ListError::Output(io::Error::from(ErrorKind::BrokenPipe));
        let (code, text) = report(err);
        assert_eq!(code, ExitCode::FAILURE);
        assert!(text.is_empty(), "Nothing should be printed: {:?}", text);
    }

    #[test]
    fn test_other_write_failures_are_reported() {
        let err = ListError::Output(io::Error::from(ErrorKind::WriteZero));
        let (code, text) = report(err);
        assert_eq!(code, ExitCode::FAILURE);
        assert!(text.starts_with("Error: failed to write module listing"));
        assert!(text.ends_with(&format!("{}\n", USAGE)));
    }
}
