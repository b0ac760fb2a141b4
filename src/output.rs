//! Shell assignment lines and the `exit` directive.

use crate::parser::{Parsed, ParsedArgs};
use crate::value::Value;
use std::io::{self, Write};

/// Quote a string so a POSIX shell reads it back as exactly one word.
///
/// Strings made only of characters that are never special to the shell are
/// left bare; everything else is wrapped in single quotes, with embedded
/// single quotes closed, escaped and reopened.
pub fn quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    if value.chars().all(is_safe_char) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c)
}

/// Right-hand side of one assignment.
fn render_parsed(parsed: &Parsed) -> String {
    match parsed {
        // Bare so `if $FLAG; then` works
        Parsed::Scalar(Value::Bool(b)) => b.to_string(),
        Parsed::Scalar(value) => quote(&value.to_string()),
        Parsed::List(items) => {
            let words: Vec<String> = items.iter().map(|v| quote(&v.to_string())).collect();
            format!("({})", words.join(" "))
        }
    }
}

/// One `NAME=value` line, or `None` when the variable stays unset.
pub fn assignment_line(varname: &str, parsed: Option<&Parsed>) -> Option<String> {
    parsed.map(|p| format!("{}={}", varname, render_parsed(p)))
}

/// Write every assignment, in declaration order.
pub fn generate_output<W: Write>(writer: &mut W, parsed: &ParsedArgs) -> io::Result<()> {
    for (varname, value) in parsed.iter() {
        if let Some(line) = assignment_line(varname, value) {
            writeln!(writer, "{}", line)?;
        }
    }
    Ok(())
}

/// Generate the output content as a string (for testing).
pub fn generate_output_string(parsed: &ParsedArgs) -> String {
    parsed
        .iter()
        .filter_map(|(varname, value)| assignment_line(varname, value))
        .map(|line| line + "\n")
        .collect()
}

/// The line that makes the evaluating script stop with `status`.
pub fn generate_exit_string(status: i32) -> String {
    format!("exit {}\n", status)
}
