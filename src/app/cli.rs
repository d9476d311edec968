//! Command-line argument parsing

use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};

use crate::constants::{APP_NAME, DEFAULT_MODULE_CAPACITY};
use crate::system::error::ArgumentError;

/// Raw command-line options
#[derive(Parser, Debug)]
#[command(
    name = APP_NAME,
    version,
    about = "Displays all modules loaded by a particular process.",
    disable_help_flag = true
)]
struct Args {
    #[arg(
        short = 'h',
        long = "help",
        action = ArgAction::SetTrue,
        help = "Display usage information."
    )]
    help: bool,

    #[arg(
        short = 'p',
        long = "process-id",
        value_name = "PID",
        help = "The Process ID for which to enumerate loaded modules."
    )]
    process_id: Option<u32>,

    /// Maximum number of modules to report; any beyond it are left out.
    #[arg(
        short = 'm',
        long = "max-modules",
        value_name = "COUNT",
        default_value_t = DEFAULT_MODULE_CAPACITY
    )]
    max_modules: usize,
}

/// A validated request to list one process's modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    pub process_id: u32,
    pub max_modules: usize,
}

/// What the command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `--help`: print usage
    Help,
    /// `--version`: print the rendered version line
    Version(String),
    /// List the modules of a process
    List(ListRequest),
}

/// The option-parser configuration, built once and shared by the help
/// path and the error path.
pub struct Cli {
    command: clap::Command,
    usage: String,
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

impl Cli {
    pub fn new() -> Self {
        let mut command = Args::command();
        let usage = command.render_help().to_string();
        Self { command, usage }
    }

    /// Usage text printed for `--help` and after every error.
    pub fn usage(&self) -> &str {
        self.usage.trim_end()
    }

    /// Decodes a full argument list (program name first).
    ///
    /// `--help` wins over a missing process ID; parser rejections and a
    /// missing process ID come back as [`ArgumentError`].
    pub fn parse_from<I, T>(&self, argv: I) -> Result<Invocation, ArgumentError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.command.clone().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err) if err.kind() == ErrorKind::DisplayVersion => {
                return Ok(Invocation::Version(err.to_string()));
            }
            Err(err) => return Err(ArgumentError::Invalid(parser_message(&err))),
        };
        let args = Args::from_arg_matches(&matches)
            .map_err(|err| ArgumentError::Invalid(parser_message(&err)))?;

        if args.help {
            return Ok(Invocation::Help);
        }

        let process_id = args.process_id.ok_or(ArgumentError::MissingProcessId)?;
        Ok(Invocation::List(ListRequest {
            process_id,
            max_modules: args.max_modules,
        }))
    }
}

/// First line of a clap error without its `error: ` prefix; the usage
/// text is printed separately.
fn parser_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}
