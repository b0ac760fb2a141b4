//! Usage and help text generation for target scripts.
//!
//! Layout is computed once from every entry (see [`HelpLayout`]) and each
//! entry is then rendered on its own, so nothing is carried between entries.

use crate::loader::{Action, Argument, Nargs, ParserDescription, HELP_FLAGS};

/// Indentation of entries inside a section.
const INDENT: usize = 2;
/// The help column never starts further right than this.
const MAX_HELP_POSITION: usize = 24;
/// Help text is never wrapped narrower than this.
const MIN_HELP_WIDTH: usize = 11;
const USAGE_PREFIX: &str = "usage: ";
const HELP_ENTRY_TEXT: &str = "show this help message and exit";

/// One row of an argument section.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    invocation: String,
    help: Option<String>,
}

/// Column positions shared by every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpLayout {
    /// Usable text width
    pub width: usize,
    /// Column where help text starts
    pub help_position: usize,
}

impl HelpLayout {
    /// Compute the layout for a set of invocations.
    ///
    /// `columns` is the terminal width; two columns are kept free on the right.
    pub fn compute<'i, I>(columns: usize, invocations: I) -> Self
    where
        I: IntoIterator<Item = &'i str>,
    {
        let width = columns.saturating_sub(2);
        let max_help_position = MAX_HELP_POSITION.min(width.saturating_sub(20).max(INDENT * 2));
        let longest = invocations
            .into_iter()
            .map(|inv| inv.chars().count())
            .max()
            .unwrap_or(0);

        HelpLayout {
            width,
            help_position: (longest + INDENT + 2).min(max_help_position),
        }
    }

    fn help_width(&self) -> usize {
        self.width.saturating_sub(self.help_position).max(MIN_HELP_WIDTH)
    }

    /// Width the invocation may take and still share a line with its help.
    fn invocation_width(&self) -> usize {
        self.help_position.saturating_sub(INDENT + 2)
    }

    fn render(&self, entry: &Entry) -> String {
        let indent = " ".repeat(INDENT);
        let lines = entry
            .help
            .as_deref()
            .map(|help| wrap(help, self.help_width()))
            .unwrap_or_default();

        let Some((first, rest)) = lines.split_first() else {
            return format!("{}{}\n", indent, entry.invocation);
        };

        let mut out = String::new();
        let inv_len = entry.invocation.chars().count();
        if inv_len <= self.invocation_width() {
            let padding = " ".repeat(self.invocation_width() - inv_len);
            out.push_str(&format!("{}{}{}  {}\n", indent, entry.invocation, padding, first));
        } else {
            let help_indent = " ".repeat(self.help_position);
            out.push_str(&format!("{}{}\n{}{}\n", indent, entry.invocation, help_indent, first));
        }

        for line in rest {
            out.push_str(&format!("{}{}\n", " ".repeat(self.help_position), line));
        }
        out
    }
}

/// Collapse whitespace and wrap greedily to `width`.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// `m`, `[m]`, `[m ...]`, `m [m ...]` or `m m`.
fn format_args(metavar: &str, nargs: Nargs) -> String {
    match nargs {
        Nargs::Single => metavar.to_string(),
        Nargs::Optional => format!("[{}]", metavar),
        Nargs::ZeroOrMore => format!("[{} ...]", metavar),
        Nargs::OneOrMore => format!("{} [{} ...]", metavar, metavar),
        Nargs::Exactly(n) => vec![metavar; n].join(" "),
    }
}

/// Text in the left column of the argument's help entry.
fn invocation(argument: &Argument) -> String {
    if argument.is_positional() {
        return argument.metavar();
    }
    if !argument.action.takes_value() {
        return argument.flags().join(", ");
    }

    let args = format_args(&argument.metavar(), argument.nargs);
    argument
        .flags()
        .iter()
        .map(|flag| format!("{} {}", flag, args))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Help text with the default appended where one is worth showing.
fn help_text(argument: &Argument) -> Option<String> {
    let show_default = !argument.is_positional()
        || matches!(argument.nargs, Nargs::Optional | Nargs::ZeroOrMore);

    match (&argument.help, &argument.default) {
        (Some(help), Some(default)) if show_default => {
            Some(format!("{} (default: {})", help, default))
        }
        (help, _) => help.clone(),
    }
}

fn entry(argument: &Argument) -> Entry {
    Entry {
        invocation: invocation(argument),
        help: help_text(argument),
    }
}

fn help_entry() -> Entry {
    Entry {
        invocation: HELP_FLAGS.join(", "),
        help: Some(HELP_ENTRY_TEXT.to_string()),
    }
}

/// The fragment an argument contributes to the usage line.
fn usage_part(argument: &Argument) -> String {
    if argument.is_positional() {
        return format_args(&argument.metavar(), argument.nargs);
    }

    let flag = argument.flags().first().cloned().unwrap_or_default();
    let part = match argument.action {
        Action::Store | Action::Append => {
            format!("{} {}", flag, format_args(&argument.metavar(), argument.nargs))
        }
        Action::StoreTrue | Action::StoreFalse | Action::Count => flag,
    };

    if argument.is_required() {
        part
    } else {
        format!("[{}]", part)
    }
}

/// Break `parts` into lines no wider than `width`, each starting with `indent`.
///
/// With `first_len`, the first line already holds that many characters and is
/// returned without the indent.
fn usage_lines(parts: &[String], indent: usize, width: usize, first_len: Option<usize>) -> Vec<String> {
    let pad = " ".repeat(indent);
    let mut lines: Vec<String> = Vec::new();
    let mut line: Vec<&str> = Vec::new();
    let mut line_len = first_len.unwrap_or(indent).saturating_sub(1);

    for part in parts {
        let part_len = part.chars().count();
        if line_len + 1 + part_len > width && !line.is_empty() {
            lines.push(format!("{}{}", pad, line.join(" ")));
            line.clear();
            line_len = indent.saturating_sub(1);
        }
        line.push(part);
        line_len += part_len + 1;
    }
    if !line.is_empty() {
        lines.push(format!("{}{}", pad, line.join(" ")));
    }

    if first_len.is_some() {
        if let Some(first) = lines.first_mut() {
            *first = first[pad.len()..].to_string();
        }
    }
    lines
}

/// Generate the usage line(s), ending with a newline.
pub fn generate_usage(desc: &ParserDescription, columns: usize) -> String {
    let width = columns.saturating_sub(2);
    let prog = desc.spec.prog.as_str();

    let opt_parts: Vec<String> = std::iter::once(format!("[{}]", HELP_FLAGS[0]))
        .chain(desc.optionals().map(usage_part))
        .collect();
    let pos_parts: Vec<String> = desc.positionals().map(usage_part).collect();

    let single_line = std::iter::once(prog.to_string())
        .chain(opt_parts.iter().cloned())
        .chain(pos_parts.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");

    if USAGE_PREFIX.len() + single_line.chars().count() <= width {
        return format!("{}{}\n", USAGE_PREFIX, single_line);
    }

    let prog_len = prog.chars().count();
    let lines = if (USAGE_PREFIX.len() + prog_len) as f64 <= 0.75 * width as f64 {
        // Wrapped parts line up after the program name
        let indent = USAGE_PREFIX.len() + prog_len + 1;
        let mut head = vec![prog.to_string()];
        head.extend(opt_parts);
        let mut lines = usage_lines(&head, indent, width, Some(USAGE_PREFIX.len()));
        lines.extend(usage_lines(&pos_parts, indent, width, None));
        lines
    } else {
        // Program name alone on the first line
        let indent = USAGE_PREFIX.len();
        let mut lines = vec![prog.to_string()];
        lines.extend(usage_lines(&opt_parts, indent, width, None));
        lines.extend(usage_lines(&pos_parts, indent, width, None));
        lines
    };

    format!("{}{}\n", USAGE_PREFIX, lines.join("\n"))
}

/// Generate the full help text for a script.
pub fn generate_help(desc: &ParserDescription, columns: usize) -> String {
    let positional: Vec<Entry> = desc.positionals().map(entry).collect();
    let optional: Vec<Entry> = std::iter::once(help_entry())
        .chain(desc.optionals().map(entry))
        .collect();

    let layout = HelpLayout::compute(
        columns,
        positional
            .iter()
            .chain(&optional)
            .map(|e| e.invocation.as_str()),
    );

    let mut blocks = vec![generate_usage(desc, columns)];
    if let Some(ref description) = desc.spec.description {
        blocks.push(description.clone());
    }
    if !positional.is_empty() {
        blocks.push(section("positional arguments", &positional, &layout));
    }
    blocks.push(section("options", &optional, &layout));
    if let Some(ref epilog) = desc.spec.epilog {
        blocks.push(epilog.clone());
    }

    let body = blocks
        .iter()
        .map(|b| b.trim_matches('\n'))
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n", body)
}

fn section(title: &str, entries: &[Entry], layout: &HelpLayout) -> String {
    let mut out = format!("{}:\n", title);
    for entry in entries {
        out.push_str(&layout.render(entry));
    }
    out
}

/// Usage followed by `PROG: error: MESSAGE`, as printed on a parse failure.
pub fn generate_error(desc: &ParserDescription, columns: usize, message: &str) -> String {
    format!(
        "{}{}: error: {}\n",
        generate_usage(desc, columns),
        desc.spec.prog,
        message
    )
}
