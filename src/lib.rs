//! argparser - typed argument parsing for shell scripts.
//!
//! A script describes its arguments as JSON-lines records (built with the
//! `setup` and `add` commands), pipes them to `parse` together with its own
//! arguments, and `eval`s the shell assignments that come back.

pub mod builder;
pub mod help;
pub mod loader;
pub mod output;
pub mod parser;
pub mod record;
pub mod settings;
pub mod value;

pub use builder::{write_record, ArgDeclaration, SetupDeclaration};
pub use help::{generate_error, generate_help, generate_usage};
pub use loader::{Action, Argument, LoadError, Nargs, ParserDescription};
pub use output::{generate_exit_string, generate_output, generate_output_string, quote};
pub use parser::{decode_args, parse_args, ParseError, ParseOutcome, Parsed, ParsedArgs};
pub use record::{read_records, Record, RecordError};
pub use settings::Settings;
pub use value::{strtobool, CoerceError, Value, ValueType};
