//! JSON-lines specification records exchanged between `add`/`setup` and `parse`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufRead;
use thiserror::Error;

/// Errors that can occur while reading a specification stream.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed specification record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read specification stream: {0}")]
    Io(#[from] std::io::Error),
}

/// One specification record, discriminated by `__metatype`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__metatype", rename_all = "lowercase")]
pub enum Record {
    /// Session metadata for the help header and footer.
    Setup(SetupRecord),
    /// One declared argument.
    Arg(ArgRecord),
}

/// Session metadata. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epilog: Option<String>,
}

/// A declared argument as it travels on the wire.
///
/// Values stay textual here; resolving `type` and coercing `default` and
/// `choices` is the loader's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgRecord {
    /// Shell variable the parsed value is bound to
    pub varname: String,
    /// One bare positional name, or one or more `-x` / `--xx` option strings
    pub flags: Vec<String>,
    /// Only ever present for options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(
        rename = "type",
        alias = "type_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<RawScalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nargs: Option<RawNargs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<RawScalar>>,
}

/// An uncoerced `default` or `choices` entry.
///
/// The builder always writes strings, but hand-written streams may carry
/// JSON numbers or booleans; those are read back as their text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Text(String),
    Bool(bool),
    Number(serde_json::Number),
}

impl RawScalar {
    /// The text handed to the coercion function.
    pub fn as_text(&self) -> String {
        match self {
            RawScalar::Text(s) => s.clone(),
            RawScalar::Bool(b) => b.to_string(),
            RawScalar::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for RawScalar {
    fn from(s: &str) -> Self {
        RawScalar::Text(s.to_string())
    }
}

/// An uncoerced `nargs` marker: `"?"`, `"*"`, `"+"`, `"3"` or `3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNargs {
    Count(u64),
    Marker(String),
}

impl fmt::Display for RawNargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNargs::Count(n) => write!(f, "{}", n),
            RawNargs::Marker(s) => f.write_str(s),
        }
    }
}

impl Record {
    /// Serialize this record as a single JSON line (without the newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a single JSON line into a record.
    pub fn from_json_line(line: &str) -> Result<Record, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

/// Read every record from a JSON-lines stream, in arrival order.
///
/// Blank lines are skipped. The first malformed line aborts the whole read.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<Record>, RecordError> {
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = Record::from_json_line(&line).map_err(|source| RecordError::Malformed {
            line: index + 1,
            source,
        })?;
        tracing::trace!(line = index + 1, ?record, "read specification record");
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_setup_record() {
        let record = Record::from_json_line(
            r#"{"__metatype": "setup", "prog": "test.sh", "description": "A test"}"#,
        )
        .unwrap();

        assert_eq!(
            record,
            Record::Setup(SetupRecord {
                prog: Some("test.sh".to_string()),
                description: Some("A test".to_string()),
                epilog: None,
            })
        );
    }

    #[test]
    fn test_parse_full_arg_record() {
        let json = r#"{
            "__metatype": "arg",
            "varname": "WORKERS",
            "flags": ["--num-workers", "-n"],
            "required": false,
            "help": "Worker count",
            "type": "int",
            "default": "8",
            "nargs": "?",
            "choices": ["1", "8", "16"]
        }"#;

        let Record::Arg(arg) = Record::from_json_line(json).unwrap() else {
            panic!("Expected Arg record");
        };

        assert_eq!(arg.varname, "WORKERS");
        assert_eq!(arg.flags, vec!["--num-workers", "-n"]);
        assert_eq!(arg.required, Some(false));
        assert_eq!(arg.help.as_deref(), Some("Worker count"));
        assert_eq!(arg.type_name.as_deref(), Some("int"));
        assert_eq!(arg.default, Some(RawScalar::from("8")));
        assert_eq!(arg.nargs, Some(RawNargs::Marker("?".to_string())));
        assert_eq!(arg.choices.unwrap().len(), 3);
    }

    #[test]
    fn test_type_name_alias() {
        let json = r#"{"__metatype":"arg","varname":"X","flags":["x"],"type_name":"float"}"#;
        let Record::Arg(arg) = Record::from_json_line(json).unwrap() else {
            panic!("Expected Arg record");
        };
        assert_eq!(arg.type_name.as_deref(), Some("float"));
    }

    #[test]
    fn test_non_string_scalars() {
        let json = r#"{"__metatype":"arg","varname":"N","flags":["-n"],"default":8,"nargs":2,"choices":[true,1.5]}"#;
        let Record::Arg(arg) = Record::from_json_line(json).unwrap() else {
            panic!("Expected Arg record");
        };

        assert_eq!(arg.default.unwrap().as_text(), "8");
        assert_eq!(arg.nargs, Some(RawNargs::Count(2)));
        let choices: Vec<String> = arg.choices.unwrap().iter().map(RawScalar::as_text).collect();
        assert_eq!(choices, vec!["true", "1.5"]);
    }

    #[test]
    fn test_unknown_metatype_is_error() {
        assert!(Record::from_json_line(r#"{"__metatype":"group"}"#).is_err());
        assert!(Record::from_json_line(r#"{"varname":"X","flags":["x"]}"#).is_err());
    }

    #[test]
    fn test_arg_record_key_order() {
        let record = Record::Arg(ArgRecord {
            varname: "WORKERS".to_string(),
            flags: vec!["--num-workers".to_string(), "-n".to_string()],
            required: Some(false),
            type_name: Some("int".to_string()),
            default: Some(RawScalar::from("8")),
            ..Default::default()
        });

        assert_eq!(
            record.to_json_line().unwrap(),
            r#"{"__metatype":"arg","varname":"WORKERS","flags":["--num-workers","-n"],"required":false,"type":"int","default":"8"}"#
        );
    }

    #[test]
    fn test_setup_record_omits_unset_fields() {
        let record = Record::Setup(SetupRecord {
            epilog: Some("bye".to_string()),
            ..Default::default()
        });
        assert_eq!(record.to_json_line().unwrap(), r#"{"__metatype":"setup","epilog":"bye"}"#);
    }

    #[test]
    fn test_read_records_preserves_order_and_skips_blank_lines() {
        let stream = concat!(
            r#"{"__metatype":"setup","prog":"a"}"#,
            "\n\n",
            r#"{"__metatype":"arg","varname":"X","flags":["x"]}"#,
            "\n",
            r#"{"__metatype":"arg","varname":"Y","flags":["--y"],"required":true}"#,
            "\n"
        );

        let records = read_records(Cursor::new(stream)).unwrap();
        assert_eq!(records.len(), 3);
        assert!(matches!(records[0], Record::Setup(_)));
        assert!(matches!(&records[2], Record::Arg(a) if a.varname == "Y"));
    }

    #[test]
    fn test_read_records_reports_line_number() {
        let stream = concat!(r#"{"__metatype":"setup"}"#, "\n", "{not json\n");
        let err = read_records(Cursor::new(stream)).unwrap_err();
        assert!(matches!(err, RecordError::Malformed { line: 2, .. }));
    }
}
