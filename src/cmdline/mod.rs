//! The `:`-command surface: a line typed after `:` is either a handful of
//! multi-letter editor commands (`write`, `quit`, `set`, ...), looked up by
//! unique prefix the way the command-line layer resolves command names, or
//! a single sam command letter, handed whole to the sam layer untouched.

pub mod settings;

use crate::error::{EditorError, SamSyntaxErrorKind};

const SAM_LETTERS: &[char] = &['a', 'c', 'd', 'g', 'i', 'p', 's', 'v', 'x', 'y', 'X', 'Y', '>', '<', '|', '!', 'w', 'r', '{', '}'];

#[derive(Debug, Clone, PartialEq)]
pub enum ExCommand {
    Edit { path: Option<String>, bangs: usize },
    Open { paths: Vec<String> },
    Write { path: Option<String>, bangs: usize },
    Wq { path: Option<String>, bangs: usize },
    Quit { bangs: usize },
    QuitAll { bangs: usize },
    Split { path: Option<String> },
    Vsplit { path: Option<String> },
    NewWindow { path: Option<String> },
    VnewWindow { path: Option<String> },
    ReadFile { path: String },
    Set { name: String, value: Option<String> },
    Map { mode: String, lhs: String, rhs: String },
    Unmap { mode: String, lhs: String },
    Earlier { arg: Option<String> },
    Later { arg: Option<String> },
    Help,
    Cd { path: Option<String> },
    /// Not a recognized editor command: forwarded verbatim to the sam layer.
    Sam(String),
}

struct Spec {
    name: &'static str,
    takes_bang: bool,
}

const TABLE: &[Spec] = &[
    Spec { name: "edit", takes_bang: true },
    Spec { name: "open", takes_bang: false },
    Spec { name: "write", takes_bang: true },
    Spec { name: "wq", takes_bang: true },
    Spec { name: "quit", takes_bang: true },
    Spec { name: "qall", takes_bang: true },
    Spec { name: "split", takes_bang: false },
    Spec { name: "vsplit", takes_bang: false },
    Spec { name: "new", takes_bang: false },
    Spec { name: "vnew", takes_bang: false },
    Spec { name: "read", takes_bang: false },
    Spec { name: "set", takes_bang: false },
    Spec { name: "map", takes_bang: false },
    Spec { name: "unmap", takes_bang: false },
    Spec { name: "earlier", takes_bang: false },
    Spec { name: "later", takes_bang: false },
    Spec { name: "help", takes_bang: false },
    Spec { name: "cd", takes_bang: false },
];

/// Split the leading run of alphabetic characters (the command word) from
/// the rest of the line, stopping at `!`, whitespace, or a sam-style
/// argument delimiter.
fn split_word(line: &str) -> (&str, &str) {
    let end = line.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(line.len());
    (&line[..end], &line[end..])
}

fn unique_match(word: &str) -> Option<&'static Spec> {
    if word.is_empty() {
        return None;
    }
    let mut hit = None;
    for spec in TABLE {
        if spec.name == word {
            return Some(spec);
        }
        if spec.name.starts_with(word) {
            if hit.is_some() {
                return None;
            }
            hit = Some(spec);
        }
    }
    hit
}

fn first_word(rest: &str) -> Option<String> {
    let trimmed = rest.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.split_whitespace().next().unwrap().to_string())
    }
}

/// Parse one line of text following `:` into an [`ExCommand`].
pub fn parse(line: &str) -> Result<ExCommand, EditorError> {
    let line = line.trim_start();
    if line.is_empty() {
        return Err(EditorError::sam_syntax(SamSyntaxErrorKind::UnknownCommand, "empty command"));
    }
    let (word, rest) = split_word(line);

    // A bare sam command letter (not the start of a longer alphabetic word)
    // is forwarded as-is: `w` alone is sam's write-range, but `write` is
    // the editor command above.
    if word.len() <= 1 {
        if let Some(c) = line.chars().next() {
            if SAM_LETTERS.contains(&c) {
                return Ok(ExCommand::Sam(line.to_string()));
            }
        }
    }

    let spec = match unique_match(word) {
        Some(s) => s,
        None => return Ok(ExCommand::Sam(line.to_string())),
    };

    let mut rest = rest;
    let mut bangs = 0;
    while let Some(stripped) = rest.strip_prefix('!') {
        bangs += 1;
        rest = stripped;
    }
    if bangs > 0 && !spec.takes_bang {
        return Err(EditorError::sam_syntax(SamSyntaxErrorKind::UnknownCommand, format!("{} does not take !", spec.name)));
    }
    let arg = first_word(rest).filter(|_| !rest.trim().is_empty());
    let args: Vec<String> = rest.trim().split_whitespace().map(str::to_string).collect();

    Ok(match spec.name {
        "edit" => ExCommand::Edit { path: arg, bangs },
        "open" => ExCommand::Open { paths: args },
        "write" => ExCommand::Write { path: arg, bangs },
        "wq" => ExCommand::Wq { path: arg, bangs },
        "quit" => ExCommand::Quit { bangs },
        "qall" => ExCommand::QuitAll { bangs },
        "split" => ExCommand::Split { path: arg },
        "vsplit" => ExCommand::Vsplit { path: arg },
        "new" => ExCommand::NewWindow { path: arg },
        "vnew" => ExCommand::VnewWindow { path: arg },
        "read" => ExCommand::ReadFile {
            path: arg.ok_or_else(|| EditorError::sam_syntax(SamSyntaxErrorKind::TextExpected, "read needs a path"))?,
        },
        "set" => {
            let name = args.first().cloned().ok_or_else(|| EditorError::sam_syntax(SamSyntaxErrorKind::TextExpected, "set needs a name"))?;
            let value = args.get(1).cloned();
            ExCommand::Set { name, value }
        }
        "map" => {
            if args.len() < 3 {
                return Err(EditorError::sam_syntax(SamSyntaxErrorKind::TextExpected, "map needs mode lhs rhs"));
            }
            ExCommand::Map { mode: args[0].clone(), lhs: args[1].clone(), rhs: args[2..].join(" ") }
        }
        "unmap" => {
            if args.len() < 2 {
                return Err(EditorError::sam_syntax(SamSyntaxErrorKind::TextExpected, "unmap needs mode lhs"));
            }
            ExCommand::Unmap { mode: args[0].clone(), lhs: args[1].clone() }
        }
        "earlier" => ExCommand::Earlier { arg },
        "later" => ExCommand::Later { arg },
        "help" => ExCommand::Help,
        "cd" => ExCommand::Cd { path: arg },
        _ => unreachable!(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_prefix_resolves_to_full_command() {
        assert_eq!(parse("qu").unwrap(), ExCommand::Quit { bangs: 0 });
        assert_eq!(parse("qa").unwrap(), ExCommand::QuitAll { bangs: 0 });
    }

    #[test]
    fn bang_suffix_is_counted() {
        assert_eq!(parse("quit!").unwrap(), ExCommand::Quit { bangs: 1 });
    }

    #[test]
    fn bare_sam_letter_is_forwarded_untouched() {
        assert_eq!(parse("w").unwrap(), ExCommand::Sam("w".to_string()));
        assert_eq!(parse(",x/foo/ d").unwrap(), ExCommand::Sam(",x/foo/ d".to_string()));
    }

    #[test]
    fn write_word_is_distinct_from_sam_w_letter() {
        assert_eq!(parse("write out.txt").unwrap(), ExCommand::Write { path: Some("out.txt".to_string()), bangs: 0 });
    }

    #[test]
    fn set_parses_name_and_value() {
        assert_eq!(parse("set tabwidth 4").unwrap(), ExCommand::Set { name: "tabwidth".to_string(), value: Some("4".to_string()) });
    }
}
