use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{anychar, char, not_line_ending, satisfy, space0},
    combinator::{map, value, verify},
    error::ErrorKind,
    multi::{fold_many0, fold_many1},
    sequence::{delimited, preceded},
};

use crate::error::LaunchError;

// VDF ----------------------------------------------------------------------------------
pub fn parse_between_double_quotes(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"')).parse(input)
}

pub fn parse_not_double_quote(input: &str) -> IResult<&str, &str> {
    take_till(|c| c == '"')(input)
}

/// For `.vdf` and `.acf` files, matches a given key and returns the associated value
pub fn parse_value_vdf<'a>(line: &'a str, key: &'a str) -> IResult<&'a str, String> {
    let (line, _) = preceded(
        parse_not_double_quote,
        verify(parse_between_double_quotes, |k: &str| k == key),
    )
    .parse(line)?;

    let (line, value) = preceded(parse_not_double_quote, parse_between_double_quotes).parse(line)?;

    Ok((line, value.to_string()))
}

// SHELL WORDS --------------------------------------------------------------------------
fn parse_single_quoted(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        String::from,
    )
    .parse(input)
}

/// Inside double quotes a backslash only escapes the characters which are special there
fn parse_double_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((
                map(
                    preceded(
                        char('\\'),
                        satisfy(|c| matches!(c, '\\' | '"' | '$' | '`' | '\n')),
                    ),
                    String::from,
                ),
                value(String::from("\\"), char('\\')),
                map(take_while1(|c| c != '"' && c != '\\'), String::from),
            )),
            String::new,
            |mut acc, piece| {
                acc.push_str(&piece);
                acc
            },
        ),
        char('"'),
    )
    .parse(input)
}

fn parse_escaped_char(input: &str) -> IResult<&str, String> {
    map(preceded(char('\\'), anychar), String::from).parse(input)
}

fn parse_bare(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| !c.is_whitespace() && !matches!(c, '\'' | '"' | '\\')),
        String::from,
    )
    .parse(input)
}

/// A single word, which can be made up of any mix of quoted and unquoted pieces
fn parse_shell_word(input: &str) -> IResult<&str, String> {
    fold_many1(
        alt((
            parse_single_quoted,
            parse_double_quoted,
            parse_escaped_char,
            parse_bare,
        )),
        String::new,
        |mut acc, piece| {
            acc.push_str(&piece);
            acc
        },
    )
    .parse(input)
}

/// Splits a string into words the way a POSIX shell would, without any expansion
pub fn split_shell_words(input: &str) -> Result<Vec<String>, LaunchError> {
    let mut words = Vec::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        let (remaining, word) = parse_shell_word(rest).map_err(|_| LaunchError::ShellSyntax {
            input: input.to_owned(),
            reason: match rest.chars().next() {
                Some('\\') => "no escaped character".to_owned(),
                _ => "no closing quotation".to_owned(),
            },
        })?;

        words.push(word);
        rest = remaining.trim_start();
    }

    Ok(words)
}

// VARIABLE EXPANSION -------------------------------------------------------------------
fn parse_braced_var(input: &str) -> IResult<&str, &str> {
    delimited(tag("${"), take_till(|c| c == '}'), char('}')).parse(input)
}

fn parse_bare_var(input: &str) -> IResult<&str, &str> {
    preceded(
        char('$'),
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
    )
    .parse(input)
}

/// Replaces `$NAME` and `${NAME}` with the value given by `lookup`. Variables which `lookup`
/// does not know about are left untouched.
pub fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut expanded = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(index) = rest.find('$') {
        expanded.push_str(&rest[..index]);
        rest = &rest[index..];

        match alt((parse_braced_var, parse_bare_var)).parse(rest) {
            Ok((remaining, name)) => {
                match lookup(name) {
                    Some(val) => expanded.push_str(&val),
                    None => expanded.push_str(&rest[..rest.len() - remaining.len()]),
                }
                rest = remaining;
            }
            Err(_) => {
                expanded.push('$');
                rest = &rest[1..];
            }
        }
    }

    expanded.push_str(rest);
    expanded
}

// EXPORTED ENVIRONMENT -----------------------------------------------------------------
/// Name and value of an `export NAME="value"` line. The value is everything up to the final
/// double quote of the line.
pub fn parse_export_line(line: &str) -> IResult<&str, (&str, &str)> {
    let (rest, name) = delimited(
        tag("export "),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        tag("=\""),
    )
    .parse(line)?;

    match rest.strip_suffix('"') {
        Some(value) => Ok(("", (name, value))),
        None => Err(nom::Err::Error(nom::error::Error::new(rest, ErrorKind::Char))),
    }
}

// VERSIONS -----------------------------------------------------------------------------
/// Numeric part of a version string, along with whatever came before and after it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedVersion {
    pub numbers: Vec<u64>,
    pub prefix: String,
    pub suffix: String,
}

/// Finds the first dotted number of at least 3 characters, e.g. `7.0` in `lutris-7.0-x86_64`
pub fn parse_version(version: &str) -> ParsedVersion {
    for (start, c) in version.char_indices() {
        if !c.is_ascii_digit() {
            continue;
        }

        let run = &version[start..];
        let run = run
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .map_or(run, |end| &run[..end])
            .trim_end_matches('.');

        if run.len() < 3 {
            continue;
        }

        return ParsedVersion {
            numbers: run.split('.').map(|n| n.parse().unwrap_or(0)).collect(),
            prefix: version[..start].to_owned(),
            suffix: version[start + run.len()..].to_owned(),
        };
    }

    ParsedVersion::default()
}

// VULKANINFO ---------------------------------------------------------------------------
fn parse_device_name_line(line: &str) -> IResult<&str, &str> {
    preceded(
        (space0, tag("deviceName"), space0, char('='), space0),
        not_line_ending,
    )
    .parse(line)
}

/// First `deviceName` from the output of `vulkaninfo --summary`
pub fn parse_vulkaninfo_device_name(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| parse_device_name_line(line).ok())
        .map(|(_, name)| name.trim().to_owned())
}

/// Removes parenthesised parts, along with the whitespace in front of them
pub fn strip_parentheticals(input: &str) -> String {
    let mut stripped = input.to_owned();

    while let Some(open) = stripped.find('(') {
        let Some(close) = stripped[open..].find(')') else {
            break;
        };

        let start = stripped[..open].trim_end().len();
        stripped.replace_range(start..open + close + 1, "");
    }

    stripped
}
