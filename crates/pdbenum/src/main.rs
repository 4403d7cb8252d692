use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pdbenum_core::backend::{BackendVariant, SymbolBackend};
use pdbenum_core::locator::ModuleLocator;
use pdbenum_core::lookup::{self, Target};
use pdbenum_core::output::{write_report, OutputFormat, Report};
use pdbenum_core::report::{BatchSearchResult, SearchResult, SymbolListResult};
use pdbenum_core::types::Address;
use pdbenum_core::{PdbEnumError, PdbEnumResult};
use pdbenum_utils::{debug, init_logging, init_logging_with_level, set_quiet, LogFormat, LogLevel};

/// Environment variable the debugging tools read their symbol path from
const SYMBOL_PATH_ENV: &str = "_NT_SYMBOL_PATH";

/// Find debug symbols for a module loaded in a running Windows process.
#[derive(Parser, Debug)]
#[command(name = "pdbenum")]
#[command(version)]
#[command(
    about = "Find debug symbols for a module loaded in a running Windows process",
    long_about = "Loads the debug information (PDB) of a module loaded in a running process, downloading it from \
                  a symbol server if needed, and searches its symbols. Symbol names are matched \
                  case-insensitively on any part of the name."
)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON
    #[arg(long, global = true, conflicts_with_all = ["xml", "format"])]
    json: bool,

    /// Print results as XML
    #[arg(long, global = true, conflicts_with = "format")]
    xml: bool,

    /// Output format: human, json or xml
    #[arg(long, global = true, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Only print results and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Symbol search path (default: _NT_SYMBOL_PATH, then a local cache in front of the Microsoft symbol server)
    #[arg(long, global = true, value_name = "PATH")]
    symbol_path: Option<String>,

    /// Path to dbghelp.dll (default: runtimes/<arch>/dbghelp.dll next to the executable)
    #[arg(long, global = true, value_name = "PATH")]
    dbghelp: Option<PathBuf>,

    /// Log level: error, warn, info, debug or trace (overrides RUST_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Find the first symbol whose name contains each given string
    Find
    {
        /// Process ID (PID) of the target process
        pid: u32,
        /// Module file name, e.g. ntdll.dll
        module: String,
        /// One or more (partial) symbol names
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Resolve addresses to the symbols starting at them
    Resolve
    {
        /// Process ID (PID) of the target process
        pid: u32,
        /// Module file name, e.g. ntdll.dll
        module: String,
        /// One or more addresses (hex format: 0x7FFB1234 or decimal)
        #[arg(required = true)]
        addresses: Vec<Address>,
    },
    /// List every symbol of a module
    List
    {
        /// Process ID (PID) of the target process
        pid: u32,
        /// Module file name, e.g. ntdll.dll
        module: String,
        /// Symbol name mask, with * and ? wildcards (default: *)
        #[arg(long)]
        mask: Option<String>,
    },
    /// Show module and PDB information without searching
    Info
    {
        /// Process ID (PID) of the target process
        pid: u32,
        /// Module file name, e.g. ntdll.dll
        module: String,
    },
}

impl Cli
{
    fn output_format(&self) -> OutputFormat
    {
        if self.json {
            OutputFormat::Json
        } else if self.xml {
            OutputFormat::Xml
        } else {
            self.format.unwrap_or_default()
        }
    }

    /// `--symbol-path`, then `_NT_SYMBOL_PATH`, then the engine default (`None`)
    fn symbol_path(&self) -> Option<String>
    {
        self.symbol_path
            .clone()
            .or_else(|| env::var(SYMBOL_PATH_ENV).ok())
            .filter(|path| !path.trim().is_empty())
    }

    fn dbghelp_path(&self) -> PdbEnumResult<PathBuf>
    {
        if let Some(path) = &self.dbghelp {
            return Ok(path.clone());
        }
        let executable = env::current_exe()?;
        Ok(BackendVariant::host().library_path(&executable))
    }
}

impl Commands
{
    fn pid(&self) -> u32
    {
        match self {
            Commands::Find { pid, .. }
            | Commands::Resolve { pid, .. }
            | Commands::List { pid, .. }
            | Commands::Info { pid, .. } => *pid,
        }
    }

    fn module(&self) -> &str
    {
        match self {
            Commands::Find { module, .. }
            | Commands::Resolve { module, .. }
            | Commands::List { module, .. }
            | Commands::Info { module, .. } => module,
        }
    }
}

fn main() -> ExitCode
{
    let cli = Cli::parse();
    set_quiet(cli.quiet);

    let logging = match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::from_env()),
        None => init_logging(),
    };
    let logging = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };
    if logging.has_file() {
        debug!("Writing logs to the file named by PDBENUM_LOG_FILE as well");
    }

    let format = cli.output_format();
    let outcome = run(&cli, format).or_else(|err| {
        debug!("Lookup aborted: {err:?}");
        emit_failure(&cli.command, &err, format)
    });

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(windows)]
fn run(cli: &Cli, format: OutputFormat) -> PdbEnumResult<bool>
{
    use pdbenum_core::platform::windows::{DbgHelp, OwnedProcess, PsapiModuleLocator};
    use pdbenum_core::types::ProcessId;
    use pdbenum_utils::info;

    info!("Opening process {}...", cli.command.pid());
    let process = OwnedProcess::open(ProcessId(cli.command.pid()))?;

    let library = cli.dbghelp_path()?;
    debug!("Backend variant: {}", BackendVariant::host());
    let backend = DbgHelp::load(&library)?;

    let search_path = cli.symbol_path();
    if let Some(path) = &search_path {
        info!("Using symbol path: {path}");
    }

    let target = Target {
        process: process.handle(),
        pid: process.pid(),
        module_name: cli.command.module(),
        search_path: search_path.as_deref(),
    };
    execute(&cli.command, backend, &PsapiModuleLocator, &target, format)
}

#[cfg(not(windows))]
fn run(cli: &Cli, _format: OutputFormat) -> PdbEnumResult<bool>
{
    debug!(
        "Would look up module '{}' in process {} with backend variant {}",
        cli.command.module(),
        cli.command.pid(),
        BackendVariant::host()
    );
    debug!("Symbol path: {:?}, dbghelp: {:?}", cli.symbol_path(), cli.dbghelp_path().ok());
    Err(PdbEnumError::UnsupportedPlatform)
}

/// Run `command` through the lookup pipeline and print its result
#[cfg_attr(not(windows), allow(dead_code))]
fn execute<B, L>(command: &Commands, backend: B, locator: &L, target: &Target<'_>, format: OutputFormat)
    -> PdbEnumResult<bool>
where
    B: SymbolBackend,
    L: ModuleLocator,
{
    match command {
        Commands::Find { symbols, .. } => match symbols.as_slice() {
            [symbol] => emit(&lookup::find_symbol(backend, locator, target, symbol), format),
            _ => emit(&lookup::find_symbols(backend, locator, target, symbols), format),
        },
        Commands::Resolve { addresses, .. } => {
            emit(&lookup::resolve_addresses(backend, locator, target, addresses), format)
        }
        Commands::List { mask, .. } => emit(&lookup::list_symbols(backend, locator, target, mask.as_deref()), format),
        Commands::Info { .. } => emit(&lookup::describe_module(backend, locator, target), format),
    }
}

/// Report a failure that happened before the lookup produced a result
///
/// Structured formats still get a result document (`Success` false) on
/// stdout, shaped like the one the command would have produced.
fn emit_failure(command: &Commands, err: &PdbEnumError, format: OutputFormat) -> PdbEnumResult<bool>
{
    let error_message = Some(err.to_string());
    match command {
        Commands::Find { symbols, .. } if symbols.len() > 1 => emit(
            &BatchSearchResult {
                error_message,
                ..BatchSearchResult::default()
            },
            format,
        ),
        Commands::Resolve { .. } => emit(
            &BatchSearchResult {
                error_message,
                ..BatchSearchResult::default()
            },
            format,
        ),
        Commands::List { mask, .. } => emit(
            &SymbolListResult {
                mask: mask.clone().unwrap_or_else(|| pdbenum_core::engine::WILDCARD.to_string()),
                error_message,
                ..SymbolListResult::default()
            },
            format,
        ),
        Commands::Find { .. } | Commands::Info { .. } => emit(
            &SearchResult {
                error_message,
                ..SearchResult::default()
            },
            format,
        ),
    }
}

/// Print `report`; failures in human format go to stderr
fn emit<R: Report>(report: &R, format: OutputFormat) -> PdbEnumResult<bool>
{
    if format == OutputFormat::Human && !report.succeeded() {
        write_report(report, format, &mut io::stderr().lock())?;
    } else {
        write_report(report, format, &mut io::stdout().lock())?;
    }
    Ok(report.succeeded())
}
