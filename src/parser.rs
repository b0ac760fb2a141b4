//! Argument parsing for target scripts.

use crate::loader::{Action, ArgKind, Argument, Nargs, ParserDescription, HELP_FLAGS};
use crate::value::{CoerceError, Value};
use std::ffi::OsString;
use std::iter::Peekable;
use std::slice::Iter;
use thiserror::Error;

/// Errors that can occur during argument parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("the following arguments are required: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("argument {name}: expected {expected}")]
    WrongArity { name: String, expected: String },

    #[error("argument {name}: ignored explicit argument '{value}'")]
    UnexpectedValue { name: String, value: String },

    #[error("argument {name}: {source}")]
    InvalidValue {
        name: String,
        #[source]
        source: CoerceError,
    },

    #[error("argument {name}: invalid choice: {} (choose from {})", .value.repr(), join_reprs(.choices))]
    InvalidChoice {
        name: String,
        value: Value,
        choices: Vec<Value>,
    },

    #[error("ambiguous option: {option} could match {}", .candidates.join(", "))]
    AmbiguousOption {
        option: String,
        candidates: Vec<String>,
    },

    #[error("unrecognized arguments: {}", .0.join(" "))]
    Unrecognized(Vec<String>),

    #[error("argument is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

fn join_reprs(values: &[Value]) -> String {
    values.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

/// The value bound to one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// String, number or boolean
    Scalar(Value),
    /// Ordered sequence from `nargs` or `append`
    List(Vec<Value>),
}

/// Parsed values, one entry per declared argument in declaration order.
///
/// `None` means the argument was not supplied and has no default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    entries: Vec<(String, Option<Parsed>)>,
}

impl ParsedArgs {
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Parsed>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    /// Value bound to `varname`, if it was declared and has one.
    pub fn get(&self, varname: &str) -> Option<&Parsed> {
        self.entries
            .iter()
            .find(|(name, _)| name == varname)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of parsing arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Successfully parsed arguments.
    Success(ParsedArgs),
    /// User requested help (-h or --help).
    Help,
}

/// Parse command-line arguments according to the description.
///
/// Tokens are processed left to right; the first `-h`/`--help` short-circuits
/// to `ParseOutcome::Help`, while an error in an earlier token wins.
pub fn parse_args(desc: &ParserDescription, args: &[String]) -> Result<ParseOutcome, ParseError> {
    let outcome = Parser::new(desc).parse(args)?;
    match outcome {
        ParseOutcome::Success(ref parsed) => {
            tracing::debug!(bound = parsed.iter().filter(|(_, v)| v.is_some()).count(), "parsed arguments")
        }
        ParseOutcome::Help => tracing::debug!("help requested"),
    }
    Ok(outcome)
}

/// Decode the forwarded arguments, failing on the first one that is not UTF-8.
pub fn decode_args(args: &[OsString]) -> Result<Vec<String>, ParseError> {
    args.iter()
        .map(|arg| {
            arg.to_str()
                .map(str::to_string)
                .ok_or_else(|| ParseError::InvalidUtf8(arg.to_string_lossy().into_owned()))
        })
        .collect()
}

enum Flow {
    Continue,
    Help,
}

enum LongMatch {
    Help,
    Arg(usize),
}

type Tokens<'t> = Peekable<Iter<'t, String>>;

/// Internal parser state.
struct Parser<'a> {
    desc: &'a ParserDescription,
    values: Vec<Option<Parsed>>,
    seen: Vec<bool>,
    positional_tokens: Vec<String>,
    extras: Vec<String>,
    negative_number_flags: bool,
}

impl<'a> Parser<'a> {
    fn new(desc: &'a ParserDescription) -> Self {
        let values = desc
            .arguments
            .iter()
            .map(|a| a.default.clone().map(Parsed::Scalar))
            .collect();

        Self {
            desc,
            values,
            seen: vec![false; desc.arguments.len()],
            positional_tokens: Vec::new(),
            extras: Vec::new(),
            negative_number_flags: desc
                .optionals()
                .flat_map(|a| a.flags())
                .any(|f| is_negative_number(f)),
        }
    }

    fn parse(mut self, args: &[String]) -> Result<ParseOutcome, ParseError> {
        let mut tokens = args.iter().peekable();
        let mut parsing_options = true;

        while let Some(arg) = tokens.next() {
            if !parsing_options {
                self.positional_tokens.push(arg.clone());
                continue;
            }

            let flow = if arg == "--" {
                // Everything after is positional
                parsing_options = false;
                Flow::Continue
            } else if arg.starts_with("--") {
                self.parse_long_option(arg, &mut tokens)?
            } else if arg.starts_with('-') && !self.is_value_token(arg) {
                self.parse_short_options(arg, &mut tokens)?
            } else {
                self.positional_tokens.push(arg.clone());
                Flow::Continue
            };

            if let Flow::Help = flow {
                return Ok(ParseOutcome::Help);
            }
        }

        self.assign_positionals()?;
        self.validate_required()?;

        if !self.extras.is_empty() {
            return Err(ParseError::Unrecognized(self.extras));
        }

        let entries = self
            .desc
            .arguments
            .iter()
            .zip(self.values)
            .map(|(arg, value)| (arg.varname.clone(), value))
            .collect();
        Ok(ParseOutcome::Success(ParsedArgs { entries }))
    }

    /// Whether a token can be consumed as a value rather than read as a flag.
    fn is_value_token(&self, token: &str) -> bool {
        !token.starts_with('-')
            || token == "-"
            || (!self.negative_number_flags && is_negative_number(token))
    }

    fn parse_long_option(&mut self, arg: &str, tokens: &mut Tokens) -> Result<Flow, ParseError> {
        // Check for --option=value format
        let (flag, inline_value) = match arg.split_once('=') {
            Some((flag, value)) => (flag, Some(value.to_string())),
            None => (arg, None),
        };

        match self.resolve_long(flag)? {
            Some(LongMatch::Help) => Ok(Flow::Help),
            Some(LongMatch::Arg(index)) => {
                let desc = self.desc;
                let argument = &desc.arguments[index];
                if argument.action.takes_value() {
                    self.consume(index, inline_value, tokens)?;
                } else if let Some(value) = inline_value {
                    return Err(ParseError::UnexpectedValue {
                        name: argument.display_name(),
                        value,
                    });
                } else {
                    self.apply_flag(index);
                }
                Ok(Flow::Continue)
            }
            None => {
                self.extras.push(arg.to_string());
                Ok(Flow::Continue)
            }
        }
    }

    /// Exact option string, then a positional addressed by name, then a
    /// unique prefix of a long option.
    fn resolve_long(&self, flag: &str) -> Result<Option<LongMatch>, ParseError> {
        if let Some(index) = self.find_option(flag) {
            return Ok(Some(LongMatch::Arg(index)));
        }
        if flag == HELP_FLAGS[1] {
            return Ok(Some(LongMatch::Help));
        }

        let name = &flag[2..];
        if let Some(index) = self.desc.arguments.iter().position(|a| {
            matches!(&a.kind, ArgKind::Positional { name: n } if n == name)
        }) {
            return Ok(Some(LongMatch::Arg(index)));
        }

        let mut candidates: Vec<&str> = self
            .desc
            .optionals()
            .flat_map(|a| a.flags())
            .map(String::as_str)
            .chain(std::iter::once(HELP_FLAGS[1]))
            .filter(|f| f.starts_with("--") && f.starts_with(flag))
            .collect();

        match candidates.len() {
            0 => Ok(None),
            1 => {
                let chosen = candidates.remove(0);
                if chosen == HELP_FLAGS[1] {
                    Ok(Some(LongMatch::Help))
                } else {
                    Ok(self.find_option(chosen).map(LongMatch::Arg))
                }
            }
            _ => Err(ParseError::AmbiguousOption {
                option: flag.to_string(),
                candidates: candidates.into_iter().map(str::to_string).collect(),
            }),
        }
    }

    fn parse_short_options(&mut self, arg: &str, tokens: &mut Tokens) -> Result<Flow, ParseError> {
        let chars: Vec<char> = arg[1..].chars().collect(); // Strip "-"
        let desc = self.desc;
        let mut previous: Option<&Argument> = None;

        for (i, c) in chars.iter().enumerate() {
            let flag = format!("-{}", c);
            if flag == HELP_FLAGS[0] {
                return Ok(Flow::Help);
            }

            let Some(index) = self.find_option(&flag) else {
                let remaining: String = chars[i..].iter().collect();
                return match previous {
                    // -vx: the flag before an unknown letter cannot take it
                    Some(prev) => Err(ParseError::UnexpectedValue {
                        name: prev.display_name(),
                        value: remaining,
                    }),
                    None => {
                        self.extras.push(arg.to_string());
                        Ok(Flow::Continue)
                    }
                };
            };

            let argument = &desc.arguments[index];
            if argument.action.takes_value() {
                // The value is the rest of this token (-n16, -n=16) or the next token(s)
                let mut remaining: String = chars[i + 1..].iter().collect();
                if i == 0 && remaining.starts_with('=') {
                    remaining.remove(0);
                }
                let inline_value = (!remaining.is_empty()).then_some(remaining);
                self.consume(index, inline_value, tokens)?;
                return Ok(Flow::Continue);
            }

            self.apply_flag(index);
            previous = Some(argument);
        }

        Ok(Flow::Continue)
    }

    fn find_option(&self, flag: &str) -> Option<usize> {
        self.desc
            .arguments
            .iter()
            .position(|a| a.flags().iter().any(|f| f == flag))
    }

    /// Collect the values for a value-taking argument and store them.
    fn consume(
        &mut self,
        index: usize,
        inline_value: Option<String>,
        tokens: &mut Tokens,
    ) -> Result<(), ParseError> {
        let desc = self.desc;
        let argument = &desc.arguments[index];
        let (min, max) = argument.nargs.bounds();

        let raw: Vec<String> = match inline_value {
            Some(value) => {
                if min > 1 {
                    return Err(arity_error(argument));
                }
                vec![value]
            }
            None => {
                let mut raw = Vec::new();
                while max.map_or(true, |m| raw.len() < m) {
                    match tokens.next_if(|t| self.is_value_token(t)) {
                        Some(token) => raw.push(token.clone()),
                        None => break,
                    }
                }
                if raw.len() < min {
                    return Err(arity_error(argument));
                }
                raw
            }
        };

        let values = convert_all(argument, &raw)?;
        self.store(index, values);
        Ok(())
    }

    fn store(&mut self, index: usize, values: Vec<Value>) {
        let desc = self.desc;
        let argument = &desc.arguments[index];
        self.seen[index] = true;

        let parsed = match argument.action {
            Action::Append => {
                // Defaults are always scalars, so a list means an earlier occurrence
                let mut items = match self.values[index].take() {
                    Some(Parsed::List(items)) => items,
                    _ => Vec::new(),
                };
                items.extend(values);
                Some(Parsed::List(items))
            }
            _ if argument.nargs.is_list() => Some(Parsed::List(values)),
            // `?` given without a value binds nothing
            _ => values.into_iter().next().map(Parsed::Scalar),
        };
        self.values[index] = parsed;
    }

    fn apply_flag(&mut self, index: usize) {
        let desc = self.desc;
        let argument = &desc.arguments[index];
        self.seen[index] = true;

        let value = match argument.action {
            Action::StoreFalse => Value::Bool(false),
            Action::Count => match self.values[index] {
                Some(Parsed::Scalar(Value::Int(n))) => Value::Int(n.saturating_add(1)),
                _ => Value::Int(1),
            },
            _ => Value::Bool(true),
        };
        self.values[index] = Some(Parsed::Scalar(value));
    }

    /// Hand the collected positional tokens out left to right. Each
    /// positional takes as many as its arity allows while leaving enough
    /// for the minimum of those after it.
    fn assign_positionals(&mut self) -> Result<(), ParseError> {
        let desc = self.desc;
        let pending: Vec<usize> = desc
            .arguments
            .iter()
            .enumerate()
            .filter(|(i, a)| a.is_positional() && !self.seen[*i])
            .map(|(i, _)| i)
            .collect();

        let tokens = std::mem::take(&mut self.positional_tokens);
        let mut remaining = tokens.as_slice();

        for (k, &index) in pending.iter().enumerate() {
            let argument = &desc.arguments[index];
            let (min, max) = argument.nargs.bounds();
            let reserved: usize = pending[k + 1..]
                .iter()
                .map(|&j| desc.arguments[j].nargs.bounds().0)
                .sum();
            let available = remaining.len().saturating_sub(reserved);
            let take = max.map_or(available, |m| m.min(available));

            if take < min {
                // Left unseen; reported by validate_required
                continue;
            }

            let (chunk, rest) = remaining.split_at(take);
            remaining = rest;

            if chunk.is_empty() {
                if argument.nargs.is_list() && argument.default.is_none() {
                    self.values[index] = Some(Parsed::List(Vec::new()));
                }
                continue;
            }

            let values = convert_all(argument, chunk)?;
            self.store(index, values);
        }

        self.extras.extend(remaining.iter().cloned());
        Ok(())
    }

    fn validate_required(&self) -> Result<(), ParseError> {
        let missing: Vec<String> = self
            .desc
            .arguments
            .iter()
            .zip(&self.seen)
            .filter(|(arg, seen)| arg.is_required() && !**seen)
            .map(|(arg, _)| arg.display_name())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ParseError::MissingRequired(missing))
        }
    }
}

/// Coerce each raw token and check it against the declared choices.
fn convert_all(argument: &Argument, raw: &[String]) -> Result<Vec<Value>, ParseError> {
    let ty = argument.value_type.unwrap_or_default();

    raw.iter()
        .map(|token| {
            let value = ty.coerce(token).map_err(|source| ParseError::InvalidValue {
                name: argument.display_name(),
                source,
            })?;

            if let Some(ref choices) = argument.choices {
                if !choices.contains(&value) {
                    return Err(ParseError::InvalidChoice {
                        name: argument.display_name(),
                        value,
                        choices: choices.clone(),
                    });
                }
            }
            Ok(value)
        })
        .collect()
}

fn arity_error(argument: &Argument) -> ParseError {
    let expected = match argument.nargs {
        Nargs::Single => "one argument".to_string(),
        Nargs::Optional => "at most one argument".to_string(),
        Nargs::OneOrMore | Nargs::ZeroOrMore => "at least one argument".to_string(),
        Nargs::Exactly(1) => "1 argument".to_string(),
        Nargs::Exactly(n) => format!("{} arguments", n),
    };
    ParseError::WrongArity {
        name: argument.display_name(),
        expected,
    }
}

/// `-5`, `-.5`, `-1.25`
fn is_negative_number(token: &str) -> bool {
    let Some(body) = token.strip_prefix('-') else {
        return false;
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match frac_part {
        None => !int_part.is_empty() && all_digits(int_part),
        Some(frac) => !frac.is_empty() && all_digits(int_part) && all_digits(frac),
    }
}
