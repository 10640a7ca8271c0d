//! `printf`-style placeholders in string resources
//!
//! `%s`, `%d` and `%f` consume the next argument, `%2$s` names one by its
//! 1-based position and `%%` is a literal percent sign. Without any
//! arguments the placeholders are left untouched.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn placeholder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"%%|%(?:(\d+)\$)?([dsf])").ok())
        .as_ref()
}

/// One argument for a formatted string.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    Str(String),
    Int(i64),
    Float(f64),
}

impl FormatArg {
    fn kind(&self) -> &'static str {
        match self {
            FormatArg::Str(_) => "a string",
            FormatArg::Int(_) | FormatArg::Float(_) => "a number",
        }
    }

    fn render(&self, conversion: &str) -> Result<String> {
        match (conversion, self) {
            ("s", FormatArg::Str(text)) => Ok(text.clone()),
            ("d", FormatArg::Int(number)) => Ok(number.to_string()),
            // Everything after the decimal point is dropped.
            ("d", FormatArg::Float(number)) => Ok(format!("{}", number.trunc())),
            ("f", FormatArg::Int(number)) => Ok(format!("{number}.000000")),
            ("f", FormatArg::Float(number)) => Ok(format!("{number:.6}")),
            _ => Err(Error::Format(format!(
                "%{conversion} cannot take {}",
                self.kind()
            ))),
        }
    }
}

impl From<&str> for FormatArg {
    fn from(value: &str) -> Self {
        FormatArg::Str(value.to_string())
    }
}

impl From<String> for FormatArg {
    fn from(value: String) -> Self {
        FormatArg::Str(value)
    }
}

impl From<i32> for FormatArg {
    fn from(value: i32) -> Self {
        FormatArg::Int(value.into())
    }
}

impl From<u32> for FormatArg {
    fn from(value: u32) -> Self {
        FormatArg::Int(value.into())
    }
}

impl From<i64> for FormatArg {
    fn from(value: i64) -> Self {
        FormatArg::Int(value)
    }
}

impl From<f64> for FormatArg {
    fn from(value: f64) -> Self {
        FormatArg::Float(value)
    }
}

/// Fill the placeholders of `template` from `args`.
///
/// A placeholder whose argument is missing or of the wrong kind fails the
/// whole call with [`Error::Format`].
pub fn format_string(template: &str, args: &[FormatArg]) -> Result<String> {
    let Some(pattern) = placeholder_pattern() else {
        return Ok(template.to_string());
    };

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    let mut next = 0;
    for captures in pattern.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        let Some(conversion) = captures.get(2) else {
            out.push('%');
            continue;
        };
        if args.is_empty() {
            out.push_str(whole.as_str());
            continue;
        }

        let index = match captures.get(1) {
            Some(position) => position
                .as_str()
                .parse::<usize>()
                .ok()
                .and_then(|position| position.checked_sub(1))
                .ok_or_else(|| {
                    Error::Format(format!("bad placeholder position in '{}'", whole.as_str()))
                })?,
            None => {
                next += 1;
                next - 1
            }
        };
        let arg = args.get(index).ok_or_else(|| {
            Error::Format(format!(
                "'{}' needs argument {} but {} given",
                whole.as_str(),
                index + 1,
                args.len()
            ))
        })?;
        out.push_str(&arg.render(conversion.as_str())?);
    }
    out.push_str(&template[last..]);
    Ok(out)
}
