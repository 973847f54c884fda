//! # Argument Builder
//!
//! File: cli/src/pipeline/args.rs
//!
//! Turns an item's `(parameter, value)` pairs into the argument vector handed
//! to the process runner, substituting the item's output path wherever the
//! placeholder token appears, and renders the command line used for
//! diagnostics (and as the script in shell mode).
//!
//! Every argument token is checked, so several pairs may reference the
//! placeholder. No quoting or escaping is applied.
//!
use super::item::ArgumentPair;
use crate::core::config::SubstitutionStyle;

/// Placeholder token and how it is substituted.
#[derive(Debug, Clone, Copy)]
pub struct Placeholder<'a> {
    pub token: &'a str,
    pub style: SubstitutionStyle,
}

/// Argument vector plus its human-readable command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub args: Vec<String>,
    pub command_line: String,
}

/// Builds the argument vector for `program` from `pairs`.
///
/// Each pair contributes its parameter and then its value, skipping empty
/// fields, so input order is preserved token for token.
pub fn build_arguments(
    program: &str,
    pairs: &[ArgumentPair],
    placeholder: Placeholder<'_>,
    output_path: &str,
) -> BuiltCommand {
    let args: Vec<String> = pairs
        .iter()
        .flat_map(|pair| [pair.parameter.as_deref(), pair.value.as_deref()])
        .flatten()
        .filter(|token| !token.is_empty())
        .map(|token| substitute(token, placeholder, output_path))
        .collect();
    let command_line = render_command_line(program, &args);
    BuiltCommand { args, command_line }
}

fn substitute(token: &str, placeholder: Placeholder<'_>, output_path: &str) -> String {
    if placeholder.token.is_empty() || !token.contains(placeholder.token) {
        return token.to_string();
    }
    match placeholder.style {
        SubstitutionStyle::Token => output_path.to_string(),
        SubstitutionStyle::Substring => token.replace(placeholder.token, output_path),
    }
}

/// `program` followed by `args`, separated by single spaces.
pub fn render_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
