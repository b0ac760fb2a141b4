//! Specification Loader: resolves records into a ready-to-parse description.

use crate::record::{read_records, ArgRecord, RawNargs, Record, RecordError, SetupRecord};
use crate::value::{CoerceError, Value, ValueType};
use std::collections::HashSet;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Option strings every parser reserves for itself.
pub const HELP_FLAGS: [&str; 2] = ["-h", "--help"];

/// Protocol errors: the specification stream itself is unusable.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("invalid variable name '{0}': must be a shell identifier")]
    InvalidVarname(String),

    #[error("argument {0}: no flags given")]
    EmptyFlags(String),

    #[error("argument {varname}: invalid option string '{flag}': must be -x or --name")]
    InvalidOptionString { varname: String, flag: String },

    #[error("argument {0}: 'required' is an invalid field for positionals")]
    RequiredOnPositional(String),

    #[error("argument {varname}: unknown action '{action}'")]
    UnknownAction { varname: String, action: String },

    #[error("argument {varname}: action '{action}' is not allowed for positionals")]
    FlagActionOnPositional { varname: String, action: Action },

    #[error("argument {varname}: action '{action}' does not accept '{field}'")]
    FieldOnFlagAction {
        varname: String,
        action: Action,
        field: &'static str,
    },

    #[error("argument {varname}: {source}")]
    UnknownType {
        varname: String,
        #[source]
        source: CoerceError,
    },

    #[error("argument {varname}: invalid nargs value '{nargs}'")]
    InvalidNargs { varname: String, nargs: String },

    #[error("argument {varname}: bad default: {source}")]
    InvalidDefault {
        varname: String,
        #[source]
        source: CoerceError,
    },

    #[error("argument {varname}: bad choice: {source}")]
    InvalidChoice {
        varname: String,
        #[source]
        source: CoerceError,
    },

    #[error("argument {0}: 'choices' must have at least one value")]
    EmptyChoices(String),

    #[error("argument {varname}: conflicting option string: {flag}")]
    ConflictingOption { varname: String, flag: String },
}

/// How an argument consumes tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Capture the value(s)
    #[default]
    Store,
    /// No value; `true` when present, `false` otherwise
    StoreTrue,
    /// No value; `false` when present, `true` otherwise
    StoreFalse,
    /// Capture the value(s) of every occurrence
    Append,
    /// No value; number of occurrences
    Count,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::Store => "store",
            Action::StoreTrue => "store_true",
            Action::StoreFalse => "store_false",
            Action::Append => "append",
            Action::Count => "count",
        }
    }

    /// Whether this action consumes value tokens.
    pub fn takes_value(self) -> bool {
        matches!(self, Action::Store | Action::Append)
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "store" => Ok(Action::Store),
            "store_true" => Ok(Action::StoreTrue),
            "store_false" => Ok(Action::StoreFalse),
            "append" => Ok(Action::Append),
            "count" => Ok(Action::Count),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Arity of a value-taking argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nargs {
    /// No marker: exactly one token, scalar result
    #[default]
    Single,
    /// `N`: exactly N tokens, sequence result
    Exactly(usize),
    /// `?`: zero or one token, scalar result
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

impl Nargs {
    /// Minimum and maximum number of tokens (`None` is unbounded).
    pub fn bounds(self) -> (usize, Option<usize>) {
        match self {
            Nargs::Single => (1, Some(1)),
            Nargs::Exactly(n) => (n, Some(n)),
            Nargs::Optional => (0, Some(1)),
            Nargs::ZeroOrMore => (0, None),
            Nargs::OneOrMore => (1, None),
        }
    }

    /// Whether the parsed value is a sequence rather than a scalar.
    pub fn is_list(self) -> bool {
        matches!(self, Nargs::Exactly(_) | Nargs::ZeroOrMore | Nargs::OneOrMore)
    }

    fn from_raw(raw: &RawNargs) -> Option<Nargs> {
        match raw {
            RawNargs::Count(n) => usize::try_from(*n).ok().map(Nargs::Exactly),
            RawNargs::Marker(m) => match m.trim() {
                "?" => Some(Nargs::Optional),
                "*" => Some(Nargs::ZeroOrMore),
                "+" => Some(Nargs::OneOrMore),
                other => other.parse().ok().map(Nargs::Exactly),
            },
        }
    }
}

/// Positional XOR optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    Positional { name: String },
    Optional { flags: Vec<String>, required: bool },
}

/// A fully resolved argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub varname: String,
    pub kind: ArgKind,
    pub action: Action,
    /// `None` for actions that never coerce input
    pub value_type: Option<ValueType>,
    pub nargs: Nargs,
    pub default: Option<Value>,
    pub choices: Option<Vec<Value>>,
    pub help: Option<String>,
}

impl Argument {
    /// Resolve one `arg` record.
    pub fn from_record(record: ArgRecord) -> Result<Argument, LoadError> {
        let ArgRecord {
            varname,
            flags,
            required,
            action,
            help,
            type_name,
            default,
            nargs,
            choices,
        } = record;

        if !is_shell_identifier(&varname) {
            return Err(LoadError::InvalidVarname(varname));
        }

        let kind = classify_flags(&varname, flags, required)?;

        let action = match action {
            None => Action::default(),
            Some(name) => name.parse::<Action>().map_err(|()| LoadError::UnknownAction {
                varname: varname.clone(),
                action: name,
            })?,
        };

        if !action.takes_value() {
            if matches!(kind, ArgKind::Positional { .. }) {
                return Err(LoadError::FlagActionOnPositional { varname, action });
            }
            let rejected = if nargs.is_some() {
                Some("nargs")
            } else if choices.is_some() {
                Some("choices")
            } else {
                None
            };
            if let Some(field) = rejected {
                return Err(LoadError::FieldOnFlagAction {
                    varname,
                    action,
                    field,
                });
            }
        }

        let nargs = match nargs {
            None => Nargs::default(),
            Some(raw) => match Nargs::from_raw(&raw) {
                Some(Nargs::Exactly(0)) | None => {
                    return Err(LoadError::InvalidNargs {
                        varname,
                        nargs: raw.to_string(),
                    })
                }
                Some(n) => n,
            },
        };

        let value_type = if action.takes_value() {
            let name = type_name.as_deref().unwrap_or("str");
            let ty = name.parse::<ValueType>().map_err(|source| LoadError::UnknownType {
                varname: varname.clone(),
                source,
            })?;
            Some(ty)
        } else {
            None
        };

        // Flag actions ignore any declared default except `count`, which reads it as an int.
        let default = match action {
            Action::StoreTrue => Some(Value::Bool(false)),
            Action::StoreFalse => Some(Value::Bool(true)),
            Action::Count => coerce_default(&varname, ValueType::Int, default.as_ref())?,
            Action::Store | Action::Append => {
                let ty = value_type.unwrap_or_default();
                coerce_default(&varname, ty, default.as_ref())?
            }
        };

        let choices = match (choices, value_type) {
            (Some(raw), _) if raw.is_empty() => return Err(LoadError::EmptyChoices(varname)),
            (Some(raw), Some(ty)) => Some(
                raw.iter()
                    .map(|c| ty.coerce(&c.as_text()))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|source| LoadError::InvalidChoice {
                        varname: varname.clone(),
                        source,
                    })?,
            ),
            _ => None,
        };

        // A blank help line keeps the rendered default visible.
        let help = match help {
            Some(h) => Some(h),
            None if !action.takes_value() || default.is_some() => Some(" ".to_string()),
            None => None,
        };

        Ok(Argument {
            varname,
            kind,
            action,
            value_type,
            nargs,
            default,
            choices,
            help,
        })
    }

    /// Option strings, empty for positionals.
    pub fn flags(&self) -> &[String] {
        match &self.kind {
            ArgKind::Positional { .. } => &[],
            ArgKind::Optional { flags, .. } => flags,
        }
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.kind, ArgKind::Positional { .. })
    }

    /// Whether parsing must fail when this argument is not supplied.
    pub fn is_required(&self) -> bool {
        match self.kind {
            ArgKind::Positional { .. } => self.nargs.bounds().0 > 0,
            ArgKind::Optional { required, .. } => required,
        }
    }

    /// Name used in diagnostics: `--long/-s`, or the positional's name.
    pub fn display_name(&self) -> String {
        match &self.kind {
            ArgKind::Positional { name } => name.clone(),
            ArgKind::Optional { flags, .. } => flags.join("/"),
        }
    }

    /// Placeholder for the value in usage and help.
    pub fn metavar(&self) -> String {
        if let Some(ref choices) = self.choices {
            let items: Vec<String> = choices.iter().map(Value::to_string).collect();
            return format!("{{{}}}", items.join(","));
        }
        match &self.kind {
            ArgKind::Positional { name } => name.clone(),
            ArgKind::Optional { .. } => self.value_type.unwrap_or_default().name().to_string(),
        }
    }
}

fn classify_flags(
    varname: &str,
    flags: Vec<String>,
    required: Option<bool>,
) -> Result<ArgKind, LoadError> {
    let invalid = |flag: &str| LoadError::InvalidOptionString {
        varname: varname.to_string(),
        flag: flag.to_string(),
    };

    match flags.as_slice() {
        [] => Err(LoadError::EmptyFlags(varname.to_string())),
        [name] if !name.starts_with('-') => {
            if name.is_empty() {
                return Err(invalid(name));
            }
            if required.is_some() {
                return Err(LoadError::RequiredOnPositional(varname.to_string()));
            }
            Ok(ArgKind::Positional { name: name.clone() })
        }
        _ => {
            if let Some(bad) = flags.iter().find(|f| !is_option_string(f)) {
                return Err(invalid(bad));
            }
            Ok(ArgKind::Optional {
                flags,
                required: required.unwrap_or(false),
            })
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, so the name is safe to write unquoted.
fn is_shell_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `-x` (one character) or `--name`.
fn is_option_string(flag: &str) -> bool {
    if let Some(long) = flag.strip_prefix("--") {
        !long.is_empty() && !long.starts_with('-')
    } else if let Some(short) = flag.strip_prefix('-') {
        short.chars().count() == 1 && short != "-"
    } else {
        false
    }
}

fn coerce_default(
    varname: &str,
    ty: ValueType,
    raw: Option<&crate::record::RawScalar>,
) -> Result<Option<Value>, LoadError> {
    raw.map(|raw| ty.coerce(&raw.as_text()))
        .transpose()
        .map_err(|source| LoadError::InvalidDefault {
            varname: varname.to_string(),
            source,
        })
}

/// Session metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserSpec {
    pub prog: String,
    pub description: Option<String>,
    pub epilog: Option<String>,
}

impl ParserSpec {
    /// Fold one `setup` record in. Each field present replaces the previous value.
    fn apply(&mut self, setup: SetupRecord) {
        if let Some(prog) = setup.prog {
            self.prog = prog;
        }
        if let Some(description) = setup.description {
            self.description = Some(description);
        }
        if let Some(epilog) = setup.epilog {
            self.epilog = Some(epilog);
        }
    }
}

/// Everything the parser needs, with arguments in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserDescription {
    pub spec: ParserSpec,
    pub arguments: Vec<Argument>,
}

impl ParserDescription {
    /// Read and resolve a whole JSON-lines specification stream.
    ///
    /// `fallback_prog` names the program when no `setup` record does.
    pub fn load<R: BufRead>(reader: R, fallback_prog: &str) -> Result<Self, LoadError> {
        let records = read_records(reader)?;
        Self::from_records(records, fallback_prog)
    }

    /// Resolve records in arrival order.
    pub fn from_records<I>(records: I, fallback_prog: &str) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut spec = ParserSpec {
            prog: fallback_prog.to_string(),
            ..Default::default()
        };
        let mut arguments: Vec<Argument> = Vec::new();
        let mut taken: HashSet<String> = HELP_FLAGS.iter().map(|f| f.to_string()).collect();

        for record in records {
            match record {
                Record::Setup(setup) => spec.apply(setup),
                Record::Arg(arg) => {
                    let argument = Argument::from_record(arg)?;
                    for flag in argument.flags() {
                        if !taken.insert(flag.clone()) {
                            return Err(LoadError::ConflictingOption {
                                varname: argument.varname.clone(),
                                flag: flag.clone(),
                            });
                        }
                    }
                    tracing::debug!(
                        varname = %argument.varname,
                        kind = ?argument.kind,
                        action = %argument.action,
                        "registered argument"
                    );
                    arguments.push(argument);
                }
            }
        }

        Ok(ParserDescription { spec, arguments })
    }

    pub fn positionals(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| a.is_positional())
    }

    pub fn optionals(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| !a.is_positional())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawScalar;
    use std::io::Cursor;

    fn arg(varname: &str, flags: &[&str]) -> ArgRecord {
        ArgRecord {
            varname: varname.to_string(),
            flags: flags.iter().map(|f| f.to_string()).collect(),
            required: if flags.iter().any(|f| f.starts_with('-')) {
                Some(false)
            } else {
                None
            },
            type_name: Some("str".to_string()),
            ..Default::default()
        }
    }

    fn resolve(record: ArgRecord) -> Argument {
        Argument::from_record(record).unwrap()
    }

    #[test]
    fn test_positional_vs_optional() {
        let file = resolve(arg("FILE", &["file"]));
        assert_eq!(
            file.kind,
            ArgKind::Positional {
                name: "file".to_string()
            }
        );
        assert!(file.is_required());

        let workers = resolve(arg("WORKERS", &["--num-workers", "-n"]));
        assert_eq!(workers.flags(), ["--num-workers", "-n"]);
        assert!(!workers.is_required());
        assert_eq!(workers.display_name(), "--num-workers/-n");
    }

    #[test]
    fn test_type_defaults_to_str() {
        let mut record = arg("X", &["--x"]);
        record.type_name = None;
        assert_eq!(resolve(record).value_type, Some(ValueType::Str));
    }

    #[test]
    fn test_default_is_coerced() {
        let mut record = arg("WORKERS", &["--num-workers"]);
        record.type_name = Some("int".to_string());
        record.default = Some(RawScalar::from("8"));

        let argument = resolve(record);
        assert_eq!(argument.default, Some(Value::Int(8)));
        assert_eq!(argument.help.as_deref(), Some(" "));
    }

    #[test]
    fn test_explicit_help_is_kept_with_default() {
        let mut record = arg("OUT", &["--out"]);
        record.default = Some(RawScalar::from("a.txt"));
        record.help = Some("Output file".to_string());
        assert_eq!(resolve(record).help.as_deref(), Some("Output file"));
    }

    #[test]
    fn test_store_true_forces_bool_default() {
        let mut record = arg("BETA", &["--experimental"]);
        record.action = Some("store_true".to_string());
        record.default = Some(RawScalar::from("yes"));

        let argument = resolve(record);
        assert_eq!(argument.action, Action::StoreTrue);
        assert_eq!(argument.value_type, None);
        assert_eq!(argument.default, Some(Value::Bool(false)));
        assert_eq!(argument.help.as_deref(), Some(" "));
    }

    #[test]
    fn test_store_false_forces_bool_default() {
        let mut record = arg("COLOR", &["--no-color"]);
        record.action = Some("store_false".to_string());
        let argument = resolve(record);
        assert_eq!(argument.default, Some(Value::Bool(true)));
    }

    #[test]
    fn test_count_default_is_int() {
        let mut record = arg("V", &["-v"]);
        record.action = Some("count".to_string());
        record.default = Some(RawScalar::from("2"));
        assert_eq!(resolve(record).default, Some(Value::Int(2)));
    }

    #[test]
    fn test_bool_type_uses_strtobool() {
        let mut record = arg("DRY", &["--dry-run"]);
        record.type_name = Some("bool".to_string());
        record.default = Some(RawScalar::from("off"));
        assert_eq!(resolve(record).default, Some(Value::Bool(false)));
    }

    #[test]
    fn test_choices_coerced_with_same_type() {
        let mut record = arg("LEVEL", &["--level"]);
        record.type_name = Some("int".to_string());
        record.choices = Some(vec![RawScalar::from("1"), RawScalar::from("02")]);

        let argument = resolve(record);
        assert_eq!(argument.choices, Some(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(argument.metavar(), "{1,2}");
    }

    #[test]
    fn test_nargs_markers() {
        for (raw, expected) in [
            ("?", Nargs::Optional),
            ("*", Nargs::ZeroOrMore),
            ("+", Nargs::OneOrMore),
            ("3", Nargs::Exactly(3)),
        ] {
            let mut record = arg("X", &["--x"]);
            record.nargs = Some(RawNargs::Marker(raw.to_string()));
            assert_eq!(resolve(record).nargs, expected, "{}", raw);
        }
    }

    #[test]
    fn test_error_unknown_type() {
        let mut record = arg("X", &["--x"]);
        record.type_name = Some("eval('1')".to_string());
        let err = Argument::from_record(record).unwrap_err();
        assert!(matches!(err, LoadError::UnknownType { .. }));
    }

    #[test]
    fn test_error_unknown_action() {
        let mut record = arg("X", &["--x"]);
        record.action = Some("store_const".to_string());
        let err = Argument::from_record(record).unwrap_err();
        assert!(matches!(err, LoadError::UnknownAction { action, .. } if action == "store_const"));
    }

    #[test]
    fn test_error_invalid_nargs() {
        for raw in ["0", "many", "-1"] {
            let mut record = arg("X", &["--x"]);
            record.nargs = Some(RawNargs::Marker(raw.to_string()));
            let err = Argument::from_record(record).unwrap_err();
            assert!(matches!(err, LoadError::InvalidNargs { .. }), "{}", raw);
        }
    }

    #[test]
    fn test_error_bad_default() {
        let mut record = arg("N", &["-n"]);
        record.type_name = Some("int".to_string());
        record.default = Some(RawScalar::from("eight"));
        let err = Argument::from_record(record).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument N: bad default: invalid int value: 'eight'"
        );
    }

    #[test]
    fn test_error_bad_choice() {
        let mut record = arg("N", &["-n"]);
        record.type_name = Some("float".to_string());
        record.choices = Some(vec![RawScalar::from("1.0"), RawScalar::from("x")]);
        let err = Argument::from_record(record).unwrap_err();
        assert!(matches!(err, LoadError::InvalidChoice { .. }));
    }

    #[test]
    fn test_error_empty_choices() {
        let mut record = arg("N", &["-n"]);
        record.choices = Some(vec![]);
        let err = Argument::from_record(record).unwrap_err();
        assert!(matches!(err, LoadError::EmptyChoices(_)));
    }

    #[test]
    fn test_error_nargs_on_store_true() {
        let mut record = arg("B", &["-b"]);
        record.action = Some("store_true".to_string());
        record.nargs = Some(RawNargs::Marker("?".to_string()));
        let err = Argument::from_record(record).unwrap_err();
        assert!(matches!(err, LoadError::FieldOnFlagAction { field: "nargs", .. }));
    }

    #[test]
    fn test_error_flag_action_on_positional() {
        let mut record = arg("B", &["b"]);
        record.action = Some("store_true".to_string());
        let err = Argument::from_record(record).unwrap_err();
        assert!(matches!(err, LoadError::FlagActionOnPositional { .. }));
    }

    #[test]
    fn test_error_required_on_positional() {
        let mut record = arg("FILE", &["file"]);
        record.required = Some(true);
        let err = Argument::from_record(record).unwrap_err();
        assert!(matches!(err, LoadError::RequiredOnPositional(_)));
    }

    #[test]
    fn test_error_bad_varname() {
        for varname in ["", "1X", "A-B", "X;rm", "$X", "A B"] {
            let err = Argument::from_record(arg(varname, &["--x"])).unwrap_err();
            assert!(matches!(err, LoadError::InvalidVarname(_)), "{}", varname);
        }
        assert!(Argument::from_record(arg("_private_2", &["--x"])).is_ok());
    }

    #[test]
    fn test_error_bad_flags() {
        assert!(matches!(
            Argument::from_record(arg("X", &[])).unwrap_err(),
            LoadError::EmptyFlags(_)
        ));
        let cases: [&[&str]; 5] = [&["--x", "y"], &["-xy"], &["-"], &["---x"], &["a", "b"]];
        for flags in cases {
            let err = Argument::from_record(arg("X", flags)).unwrap_err();
            assert!(
                matches!(err, LoadError::InvalidOptionString { .. }),
                "{:?}",
                flags
            );
        }
    }

    #[test]
    fn test_load_stream() {
        let stream = concat!(
            r#"{"__metatype":"setup","prog":"test.sh","description":"Test script."}"#,
            "\n",
            r#"{"__metatype":"arg","varname":"FILE","flags":["file"],"type":"str"}"#,
            "\n",
            r#"{"__metatype":"arg","varname":"BETA","flags":["--experimental"],"required":false,"action":"store_true","type":"str"}"#,
            "\n"
        );

        let desc = ParserDescription::load(Cursor::new(stream), "argparser").unwrap();
        assert_eq!(desc.spec.prog, "test.sh");
        assert_eq!(desc.spec.description.as_deref(), Some("Test script."));
        let names: Vec<&str> = desc.arguments.iter().map(|a| a.varname.as_str()).collect();
        assert_eq!(names, ["FILE", "BETA"]);
        assert_eq!(desc.positionals().count(), 1);
        assert_eq!(desc.optionals().count(), 1);
    }

    #[test]
    fn test_prog_falls_back() {
        let desc = ParserDescription::from_records(vec![], "script.sh").unwrap();
        assert_eq!(desc.spec.prog, "script.sh");
        assert!(desc.arguments.is_empty());
    }

    #[test]
    fn test_setup_last_write_wins_per_field() {
        let records = vec![
            Record::Setup(SetupRecord {
                prog: Some("first".to_string()),
                description: Some("desc".to_string()),
                epilog: None,
            }),
            Record::Setup(SetupRecord {
                prog: Some("second".to_string()),
                description: None,
                epilog: Some("bye".to_string()),
            }),
        ];

        let desc = ParserDescription::from_records(records, "x").unwrap();
        assert_eq!(desc.spec.prog, "second");
        assert_eq!(desc.spec.description.as_deref(), Some("desc"));
        assert_eq!(desc.spec.epilog.as_deref(), Some("bye"));
    }

    #[test]
    fn test_error_duplicate_flag() {
        let records = vec![
            Record::Arg(arg("A", &["--name", "-n"])),
            Record::Arg(arg("B", &["-n"])),
        ];
        let err = ParserDescription::from_records(records, "x").unwrap_err();
        assert!(matches!(err, LoadError::ConflictingOption { flag, .. } if flag == "-n"));
    }

    #[test]
    fn test_error_help_flag_is_reserved() {
        let records = vec![Record::Arg(arg("H", &["-h"]))];
        let err = ParserDescription::from_records(records, "x").unwrap_err();
        assert!(matches!(err, LoadError::ConflictingOption { .. }));
    }

    #[test]
    fn test_error_malformed_line_aborts_load() {
        let stream = concat!(
            r#"{"__metatype":"arg","varname":"A","flags":["a"]}"#,
            "\n",
            "not json\n"
        );
        let err = ParserDescription::load(Cursor::new(stream), "x").unwrap_err();
        assert!(matches!(err, LoadError::Record(RecordError::Malformed { line: 2, .. })));
    }
}
