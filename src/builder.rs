//! Specification Builder: turns one `setup` or `add` declaration into a record.

use crate::record::{ArgRecord, RawNargs, RawScalar, Record, SetupRecord};
use clap::Args;
use std::io::{self, Write};

/// Header and footer of the generated help message.
#[derive(Debug, Clone, Default, Args)]
pub struct SetupDeclaration {
    /// Program name. Usually $0 should be given.
    #[arg(long)]
    pub prog: Option<String>,

    /// Description.
    #[arg(long)]
    pub desc: Option<String>,

    /// Epilog.
    #[arg(long)]
    pub epilog: Option<String>,
}

impl SetupDeclaration {
    pub fn to_record(&self) -> Record {
        Record::Setup(SetupRecord {
            prog: self.prog.clone(),
            description: self.desc.clone(),
            epilog: self.epilog.clone(),
        })
    }
}

/// One argument declaration.
#[derive(Debug, Clone, Default, Args)]
pub struct ArgDeclaration {
    /// Variable name.
    pub varname: String,

    /// Positional argument.
    pub position: Option<String>,

    /// Long option without prefix hyphens.
    #[arg(long, short = 'l')]
    pub long: Option<String>,

    /// Short option without a prefix hyphen.
    #[arg(long, short = 's')]
    pub short: Option<String>,

    /// Help message.
    #[arg(long)]
    pub desc: Option<String>,

    /// Type of an argument: str, int, float or bool.
    #[arg(long = "type", short = 't')]
    pub type_name: Option<String>,

    /// Default value.
    #[arg(long, allow_negative_numbers = true)]
    pub default: Option<String>,

    /// Action: store, store_true, store_false, append or count.
    #[arg(long)]
    pub action: Option<String>,

    /// Number of arguments. *, ?, + or a count can be specified.
    #[arg(long)]
    pub nargs: Option<String>,

    /// Set the option as required.
    #[arg(long)]
    pub required: bool,

    /// Choice from a restricted set of values.
    #[arg(long, num_args = 1.., allow_negative_numbers = true)]
    pub choices: Vec<String>,
}

impl ArgDeclaration {
    /// Build the `arg` record.
    ///
    /// A `position` makes the argument positional and suppresses `required`;
    /// otherwise the long flag comes first, then the short one, and
    /// `required` is always written. `type` falls back to `str`.
    pub fn to_record(&self) -> Record {
        let (flags, required) = match self.position {
            Some(ref position) => (vec![position.clone()], None),
            None => {
                let mut flags = Vec::new();
                if let Some(ref long) = self.long {
                    flags.push(format!("--{}", long));
                }
                if let Some(ref short) = self.short {
                    flags.push(format!("-{}", short));
                }
                (flags, Some(self.required))
            }
        };

        Record::Arg(ArgRecord {
            varname: self.varname.clone(),
            flags,
            required,
            action: self.action.clone(),
            help: self.desc.clone(),
            type_name: Some(self.type_name.clone().unwrap_or_else(|| "str".to_string())),
            default: self.default.as_deref().map(RawScalar::from),
            nargs: self.nargs.clone().map(RawNargs::Marker),
            choices: if self.choices.is_empty() {
                None
            } else {
                Some(self.choices.iter().map(|c| RawScalar::from(c.as_str())).collect())
            },
        })
    }
}

/// Write one record as a JSON line.
pub fn write_record<W: Write>(writer: &mut W, record: &Record) -> io::Result<()> {
    let line = record.to_json_line()?;
    writeln!(writer, "{}", line)
}
