//! argparser - typed argument parsing for shell scripts.

use anyhow::{Context, Result};
use argparser::settings::LOG_ENV;
use argparser::{
    decode_args, generate_error, generate_exit_string, generate_help, generate_output,
    parse_args, write_record, ArgDeclaration, ParseOutcome, ParserDescription, Settings,
    SetupDeclaration,
};
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Typed argument parsing for shell scripts.
#[derive(Parser, Debug)]
#[command(name = "argparser", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set the program name, description and epilog of the help message
    Setup(SetupDeclaration),

    /// Declare one argument
    Add(ArgDeclaration),

    /// Read declarations from stdin and parse script arguments
    #[command(disable_help_flag = true)]
    Parse {
        /// Arguments of the target script, forwarded verbatim
        #[arg(last = true, value_parser = clap::value_parser!(OsString))]
        args: Vec<OsString>,
    },

    /// Show how to use argparser from a script
    Help,
}

const GUIDE: &str = r#"argparser: typed argument parsing for shell scripts

Describe the arguments with `setup` and `add`, pipe the declarations into
`parse` along with the script's own arguments, and eval the result:

    #!/bin/bash
    parser() {
        argparser setup --prog "$0" --desc "Process a log file."
        argparser add FILE file --desc "Log file to read"
        argparser add WORKERS -l num-workers -s n -t int --default 8
        argparser add BETA -l experimental --action store_true
        argparser add USER_IDS -l user-ids -s u -t int --nargs '*'
    }
    eval "$(parser | argparser parse "$@")"

    echo "file=$FILE workers=$WORKERS beta=$BETA ids=${USER_IDS[*]}"

Commands:
    setup [--prog P] [--desc D] [--epilog E]
    add VARNAME [POSITION] [-l LONG] [-s SHORT] [--desc D] [-t TYPE]
        [--default V] [--action A] [--nargs N] [--required] [--choices C...]
    parse [ARGS...]
    help

Types: str, int, float, bool
Actions: store, store_true, store_false, append, count
Nargs: N, ?, *, +

On -h/--help or a parse error the output ends with `exit N`, so the
eval stops the script with the right status.
"#;

/// Put `--` right after `parse` so every following argument, including
/// `-h` and `--`, reaches the target script untouched.
fn protect_forwarded_args(mut argv: Vec<OsString>) -> Vec<OsString> {
    if argv.get(1).is_some_and(|arg| arg == "parse") {
        argv.insert(2, OsString::from("--"));
    }
    argv
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    init_logging();

    let cli = Cli::parse_from(protect_forwarded_args(std::env::args_os().collect()));
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Setup(setup) => {
            write_record(&mut out, &setup.to_record()).context("failed to write setup record")?;
        }
        Commands::Add(arg) => {
            write_record(&mut out, &arg.to_record()).context("failed to write arg record")?;
        }
        Commands::Parse { args } => {
            let settings = Settings::from_env();
            let status = run_parse(&mut out, &settings, &args)?;
            return Ok(ExitCode::from(status));
        }
        Commands::Help => {
            out.write_all(GUIDE.as_bytes())
                .context("failed to write usage guide")?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Parse `args` against the declarations on stdin and write the result to `out`.
///
/// Returns the exit status; diagnostics and help go to stderr.
fn run_parse<W: Write>(out: &mut W, settings: &Settings, args: &[OsString]) -> Result<u8> {
    let stdin = io::stdin();
    let desc = match ParserDescription::load(stdin.lock(), &settings.fallback_prog) {
        Ok(desc) => desc,
        Err(err) => {
            tracing::debug!(error = ?err, "failed to load declarations");
            eprintln!("argparser: error: {}", err);
            out.write_all(generate_exit_string(1).as_bytes())
                .context("failed to write exit directive")?;
            return Ok(1);
        }
    };

    match decode_args(args).and_then(|args| parse_args(&desc, &args)) {
        Ok(ParseOutcome::Success(parsed)) => {
            generate_output(out, &parsed).context("failed to write assignments")?;
            Ok(0)
        }
        Ok(ParseOutcome::Help) => {
            eprint!("{}", generate_help(&desc, settings.columns));
            out.write_all(generate_exit_string(0).as_bytes())
                .context("failed to write exit directive")?;
            Ok(0)
        }
        Err(err) => {
            eprint!("{}", generate_error(&desc, settings.columns, &err.to_string()));
            out.write_all(generate_exit_string(1).as_bytes())
                .context("failed to write exit directive")?;
            Ok(1)
        }
    }
}
