//! Query Builder
//!
//! Queries are assembled from text templates:
//! - argument templates carry `$name` / `${name}` placeholders filled from
//!   caller values (`$$` is a literal dollar)
//! - the outer query template embeds the query name, the argument block and
//!   the field-selection block, re-indented to line up with the braces
//!
//! GraphQL rejects single-quoted strings, so the finished text has every `'`
//! turned into `"`.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Result, SbrError};

const TAB: &str = "    ";

const QUERY_TEMPLATE: &str = "
    query {
        $q_name(
            $q_args
        ) $q_fields
    }
";

/// Strip the common indentation of a multi-line literal
///
/// The first line is left-trimmed on its own; the margin is the smallest
/// count of leading whitespace characters among the remaining non-blank
/// lines. Leading and trailing blank lines are dropped.
pub fn cleandoc(s: &str) -> String {
    let expanded = s.replace('\t', "        ");
    let mut lines: Vec<&str> = expanded.split('\n').collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_width(l))
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    if let Some(first) = lines.first_mut() {
        out.push(first.trim_start().to_string());
    }
    for line in lines.iter().skip(1) {
        let cut = margin.min(indent_width(line));
        let start = line.char_indices().nth(cut).map_or(line.len(), |(i, _)| i);
        out.push(line[start..].to_string());
    }

    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    let lead = out.iter().take_while(|l| l.trim().is_empty()).count();
    out.drain(..lead);
    out.join("\n")
}

/// Leading whitespace, in characters
fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Dedent, indent every non-blank line by `indent` tabs (four spaces each),
/// and optionally strip the first line's indentation so it can follow text
/// already on the enclosing line
pub fn str_format(s: &str, indent: usize, dedent_first: bool) -> String {
    let prefix = TAB.repeat(indent);
    let mut lines: Vec<String> = cleandoc(s)
        .split('\n')
        .map(|l| if l.trim().is_empty() { l.to_string() } else { format!("{}{}", prefix, l) })
        .collect();
    if dedent_first {
        if let Some(first) = lines.first_mut() {
            *first = first.trim_start().to_string();
        }
    }
    lines.join("\n")
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Single-pass placeholder substitution; inserted text is never re-scanned
fn substitute<F>(template: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let name = match chars.peek().copied() {
            Some((_, '$')) => {
                chars.next();
                out.push('$');
                continue;
            }
            Some((_, '{')) => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, ch)) if is_ident_char(ch) => name.push(ch),
                        _ => {
                            return Err(SbrError::Template(format!(
                                "invalid placeholder at offset {}",
                                pos
                            )))
                        }
                    }
                }
                if !name.starts_with(is_ident_start) {
                    return Err(SbrError::Template(format!("invalid placeholder at offset {}", pos)));
                }
                name
            }
            Some((_, ch)) if is_ident_start(ch) => {
                let mut name = String::new();
                while let Some((_, ch)) = chars.peek().copied() {
                    if !is_ident_char(ch) {
                        break;
                    }
                    name.push(ch);
                    chars.next();
                }
                name
            }
            _ => {
                return Err(SbrError::Template(format!("invalid placeholder at offset {}", pos)));
            }
        };

        match lookup(&name) {
            Some(text) => out.push_str(&text),
            None => {
                return Err(SbrError::Template(format!("missing substitution for ${}", name)));
            }
        }
    }

    Ok(out)
}

/// Render a substitution value the way it appears in a GraphQL argument list
///
/// Strings are inserted bare so templates decide on quoting; everything else
/// is written as JSON (`[16]`, `["nfl"]`, `1604016000000`).
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fill an argument template from named values
pub fn build_arguments(template: &str, substitutions: &BTreeMap<String, Value>) -> Result<String> {
    substitute(template, |name| substitutions.get(name).map(render))
}

/// Assemble the full query text
///
/// # Example
/// `build_query("eventsByDateNew", Some("{ events { eid } }"), Some("lid: [16]"))`
/// produces a `query { eventsByDateNew(...) { ... } }` block.
pub fn build_query(name: &str, fields: Option<&str>, args: Option<&str>) -> Result<String> {
    let q_args = args.map(|a| str_format(a, 2, true)).unwrap_or_default();
    let q_fields = fields.map(|f| str_format(f, 1, true)).unwrap_or_default();

    let template = str_format(QUERY_TEMPLATE, 0, false);
    let query = substitute(&template, |key| match key {
        "q_name" => Some(name.to_string()),
        "q_args" => Some(q_args.clone()),
        "q_fields" => Some(q_fields.clone()),
        _ => None,
    })?;

    Ok(query.replace('\'', "\""))
}
