//! Lexing and parsing of sam command text into an address + `Command` tree.
//!
//! One-letter commands become enum variants carrying their operands, and a
//! trailing `!` is tracked as a `bangs` count on the commands that accept
//! one (`Quit`, `Write`, ...).

use crate::error::{EditorError, SamSyntaxErrorKind};

use super::address::{Address, AddressAtom};

#[derive(Debug, Clone, PartialEq)]
pub enum LoopKind {
    /// `x` — for each match of the pattern in range.
    EachMatch,
    /// `y` — for each segment between matches of the pattern in range.
    Between,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CondKind {
    /// `g` — run subcmd if range matches pattern.
    Matches,
    /// `v` — run subcmd if range does not match pattern.
    NotMatches,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterBounds {
    pub lo: Option<i64>,
    pub hi: Option<i64>,
    pub modulus: Option<u64>,
}

impl IterBounds {
    #[must_use]
    pub fn unbounded() -> Self {
        Self { lo: None, hi: None, modulus: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Append { text: Vec<u8> },
    Insert { text: Vec<u8> },
    Change { text: Vec<u8> },
    Delete,
    Print,
    Loop { kind: LoopKind, pattern: String, bounds: IterBounds, body: Box<Command> },
    Cond { kind: CondKind, pattern: String, body: Box<Command> },
    /// `s/pat/repl/` — sugar for `x/pat/ c/repl/` with `&` back-reference.
    Substitute { pattern: String, replacement: String },
    Pipe { argv: String },
    PipeIn { argv: String },
    PipeOut { argv: String },
    Bang { argv: String, bangs: usize },
    Write { path: Option<String>, bangs: usize },
    Read { path: String },
    Edit { path: String, bangs: usize },
    Quit { bangs: usize },
    Group(Vec<Command>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressedCommand {
    pub address: Option<Address>,
    pub command: Command,
}

pub struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self { bytes: src.as_bytes(), pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    fn err(&self, kind: SamSyntaxErrorKind, detail: impl Into<String>) -> EditorError {
        EditorError::sam_syntax(kind, detail.into())
    }

    fn take_number(&mut self) -> Option<i64> {
        let start = self.pos;
        let neg = self.peek() == Some(b'-') && self.bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit);
        if neg {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            self.pos = start;
            return None;
        }
        std::str::from_utf8(&self.bytes[digits_start..self.pos]).ok()?.parse::<i64>().ok().map(|n| if neg { -n } else { n })
    }

    /// Read a `/.../ ` delimited pattern; `delim` repeated closes it. A
    /// backslash escapes the delimiter.
    fn take_delimited(&mut self, delim: u8) -> Result<String, EditorError> {
        if self.peek() != Some(delim) {
            return Err(self.err(SamSyntaxErrorKind::BadAddress, "expected delimiter"));
        }
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.err(SamSyntaxErrorKind::TextExpected, "unterminated pattern")),
                Some(b'\\') => {
                    if let Some(next) = self.bump() {
                        if next != delim {
                            out.push(b'\\');
                        }
                        out.push(next);
                    }
                }
                Some(b) if b == delim => break,
                Some(b) => out.push(b),
            }
        }
        String::from_utf8(out).map_err(|_| self.err(SamSyntaxErrorKind::TextExpected, "pattern is not UTF-8"))
    }

    /// Parse one address atom, or `None` if nothing address-like is here.
    fn take_addr_atom(&mut self) -> Result<Option<AddressAtom>, EditorError> {
        match self.peek() {
            Some(b'#') => {
                self.pos += 1;
                let n = self.take_number().ok_or_else(|| self.err(SamSyntaxErrorKind::BadAddress, "expected number after #"))?;
                Ok(Some(AddressAtom::Byte(n.max(0) as usize)))
            }
            Some(b'\'') => {
                self.pos += 1;
                let c = self.bump().ok_or_else(|| self.err(SamSyntaxErrorKind::InvalidMark, "expected mark name"))?;
                Ok(Some(AddressAtom::Mark(c as char)))
            }
            Some(b'/') => {
                let pat = self.take_delimited(b'/')?;
                Ok(Some(AddressAtom::Forward(pat)))
            }
            Some(b'?') => {
                self.pos += 1;
                let pat = self.take_delimited(b'?')?;
                Ok(Some(AddressAtom::Backward(pat)))
            }
            Some(b'$') => {
                self.pos += 1;
                Ok(Some(AddressAtom::Dollar))
            }
            Some(b'.') => {
                self.pos += 1;
                Ok(Some(AddressAtom::Dot))
            }
            Some(b'+') => {
                self.pos += 1;
                Ok(Some(AddressAtom::Plus))
            }
            Some(b'-') => {
                self.pos += 1;
                Ok(Some(AddressAtom::Minus))
            }
            Some(b'%') => {
                self.pos += 1;
                Ok(Some(AddressAtom::Percent))
            }
            Some(b) if b.is_ascii_digit() => {
                let n = self.take_number().unwrap();
                Ok(Some(AddressAtom::Line(n.max(0) as usize)))
            }
            _ => Ok(None),
        }
    }

    /// Parse a full address chain: atoms joined by `,`/`;`.
    fn take_address(&mut self) -> Result<Option<Address>, EditorError> {
        self.skip_ws();
        let mut left = match self.take_addr_atom()? {
            Some(atom) => Address::Atom(atom),
            None => match self.peek() {
                // A leading `,`/`;` with no left operand defaults to the
                // start of the file, or to dot for `;` — the same default
                // a trailing omitted right operand gets below, mirrored.
                Some(b',') => Address::Atom(AddressAtom::Byte(0)),
                Some(b';') => Address::Atom(AddressAtom::Dot),
                _ => return Ok(None),
            },
        };
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                    let right = match self.take_addr_atom()? {
                        Some(atom) => Address::Atom(atom),
                        None => Address::Atom(AddressAtom::Dollar),
                    };
                    left = Address::Comma(Box::new(left), Box::new(right));
                }
                Some(b';') => {
                    self.pos += 1;
                    self.skip_ws();
                    let right = match self.take_addr_atom()? {
                        Some(atom) => Address::Atom(atom),
                        None => Address::Atom(AddressAtom::Dollar),
                    };
                    left = Address::Semi(Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(Some(left))
    }

    fn take_iter_bounds(&mut self) -> IterBounds {
        self.skip_ws();
        let mut bounds = IterBounds::unbounded();
        if self.peek() == Some(b'%') {
            self.pos += 1;
            if let Some(n) = self.take_number() {
                bounds.modulus = Some(n.unsigned_abs());
            }
            return bounds;
        }
        if let Some(lo) = self.take_number() {
            self.skip_ws();
            if self.peek() == Some(b',') {
                self.pos += 1;
                self.skip_ws();
                let hi = self.take_number();
                bounds.lo = Some(lo);
                bounds.hi = hi;
            } else {
                bounds.lo = Some(lo);
                bounds.hi = Some(lo);
            }
        }
        bounds
    }

    fn take_bangs(&mut self) -> usize {
        let mut n = 0;
        while self.peek() == Some(b'!') {
            n += 1;
            self.pos += 1;
        }
        n
    }

    fn take_argv(&mut self) -> String {
        self.skip_ws();
        let start = self.pos;
        while !matches!(self.peek(), None | Some(b'\n') | Some(b';') | Some(b'}')) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).trim_end().to_string()
    }

    /// Parse one command, including its leading address. Top-level entry
    /// point; also used recursively for `x`/`y`/`g`/`v`/`{` bodies.
    pub fn parse_command(&mut self) -> Result<AddressedCommand, EditorError> {
        let address = self.take_address()?;
        self.skip_ws();
        self.parse_command_body(address)
    }

    fn parse_command_body(&mut self, address: Option<Address>) -> Result<AddressedCommand, EditorError> {
        self.skip_ws();
        let letter = self.bump().ok_or_else(|| self.err(SamSyntaxErrorKind::UnknownCommand, "empty command"))?;
        let command = match letter {
            b'a' => Command::Append { text: self.take_text_block()? },
            b'i' => Command::Insert { text: self.take_text_block()? },
            b'c' => Command::Change { text: self.take_text_block()? },
            b'd' => Command::Delete,
            b'p' => Command::Print,
            b'x' | b'y' => {
                let kind = if letter == b'x' { LoopKind::EachMatch } else { LoopKind::Between };
                self.skip_ws();
                let pattern = self.take_delimited(b'/')?;
                let bounds = self.take_iter_bounds();
                self.skip_ws();
                let inner = self.parse_command()?;
                if inner.address.is_some() {
                    return Err(self.err(SamSyntaxErrorKind::NoAddressAllowed, "subcommand of x/y takes no address"));
                }
                Command::Loop { kind, pattern, bounds, body: Box::new(inner.command) }
            }
            b'g' | b'v' => {
                let kind = if letter == b'g' { CondKind::Matches } else { CondKind::NotMatches };
                self.skip_ws();
                let pattern = self.take_delimited(b'/')?;
                self.skip_ws();
                let inner = self.parse_command()?;
                if inner.address.is_some() {
                    return Err(self.err(SamSyntaxErrorKind::NoAddressAllowed, "subcommand of g/v takes no address"));
                }
                Command::Cond { kind, pattern, body: Box::new(inner.command) }
            }
            b's' => {
                let pattern = self.take_delimited(b'/')?;
                let replacement = self.take_delimited(b'/')?;
                Command::Substitute { pattern, replacement }
            }
            b'>' => Command::PipeOut { argv: self.take_argv() },
            b'<' => Command::PipeIn { argv: self.take_argv() },
            b'|' => Command::Pipe { argv: self.take_argv() },
            b'!' => Command::Bang { argv: self.take_argv(), bangs: 1 },
            b'w' => {
                let bangs = self.take_bangs();
                let arg = self.take_argv();
                Command::Write { path: if arg.is_empty() { None } else { Some(arg) }, bangs }
            }
            b'r' => Command::Read { path: self.take_argv() },
            b'e' => {
                let bangs = self.take_bangs();
                Command::Edit { path: self.take_argv(), bangs }
            }
            b'q' => Command::Quit { bangs: self.take_bangs() },
            b'{' => {
                let mut body = Vec::new();
                loop {
                    self.skip_ws();
                    while matches!(self.peek(), Some(b'\n')) {
                        self.pos += 1;
                    }
                    self.skip_ws();
                    if self.peek() == Some(b'}') {
                        self.pos += 1;
                        break;
                    }
                    if self.peek().is_none() {
                        return Err(self.err(SamSyntaxErrorKind::UnmatchedBrace, "expected }"));
                    }
                    let cmd = self.parse_command()?;
                    body.push(AddressedCommand { address: cmd.address, command: cmd.command });
                }
                Command::Group(body.into_iter().map(|c| c.command).collect())
            }
            other => {
                return Err(self.err(SamSyntaxErrorKind::UnknownCommand, (other as char).to_string()));
            }
        };
        Ok(AddressedCommand { address, command })
    }

    /// Text arguments: `/delimited/` on one line, or a `\n`-led block
    /// terminated by a line containing only `.`.
    fn take_text_block(&mut self) -> Result<Vec<u8>, EditorError> {
        self.skip_ws();
        match self.peek() {
            Some(delim) if delim != b'\n' => {
                let s = self.take_delimited(delim)?;
                Ok(s.into_bytes())
            }
            Some(b'\n') => {
                self.pos += 1;
                let mut out = Vec::new();
                loop {
                    let line_start = self.pos;
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                    let line = &self.bytes[line_start..self.pos];
                    if line == b"." {
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                        break;
                    }
                    out.extend_from_slice(line);
                    if self.peek() == Some(b'\n') {
                        out.push(b'\n');
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Ok(out)
            }
            _ => Err(self.err(SamSyntaxErrorKind::TextExpected, "expected delimited text or block")),
        }
    }
}

/// Parse a single sam command, erroring on anything left over.
pub fn parse(src: &str) -> Result<AddressedCommand, EditorError> {
    let mut parser = Parser::new(src);
    let cmd = parser.parse_command()?;
    parser.skip_ws();
    if parser.peek().is_some() && parser.peek() != Some(b'\n') {
        return Err(parser.err(SamSyntaxErrorKind::UnknownCommand, "trailing input after command"));
    }
    Ok(cmd)
}

/// Parse a whole command line, which may hold several commands (each with
/// its own address) chained by `;` at the top level — e.g. `1,1 d ; 1,3
/// c/Z/` runs both `d` and `c` and stages both into one transcript.
pub fn parse_program(src: &str) -> Result<Vec<AddressedCommand>, EditorError> {
    let mut parser = Parser::new(src);
    let mut out = Vec::new();
    loop {
        parser.skip_ws();
        while matches!(parser.peek(), Some(b'\n')) {
            parser.pos += 1;
            parser.skip_ws();
        }
        if parser.peek().is_none() {
            break;
        }
        out.push(parser.parse_command()?);
        parser.skip_ws();
        match parser.peek() {
            Some(b';') => {
                parser.pos += 1;
            }
            None => break,
            Some(b'\n') => {}
            _ => return Err(parser.err(SamSyntaxErrorKind::UnknownCommand, "expected ';' between commands")),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delete_with_line_range() {
        let parsed = parse("2,3 d").unwrap();
        assert!(matches!(parsed.command, Command::Delete));
        assert!(matches!(
            parsed.address,
            Some(Address::Comma(_, _))
        ));
    }

    #[test]
    fn parses_x_loop_with_change_body() {
        let parsed = parse(",x/foo/ c/FOO/").unwrap();
        match parsed.command {
            Command::Loop { kind: LoopKind::EachMatch, pattern, body, .. } => {
                assert_eq!(pattern, "foo");
                assert!(matches!(*body, Command::Change { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_semicolon_separated_commands() {
        let parsed = parse_program("1,1 d ; 1,3 c/Z/").unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(matches!(parsed[0].command, Command::Delete));
        assert!(matches!(parsed[1].command, Command::Change { .. }));
    }

    #[test]
    fn address_level_semicolon_chains_relative_to_prior_result() {
        let parsed = parse("2;/foo/ d").unwrap();
        assert!(matches!(parsed.address, Some(Address::Semi(_, _))));
    }

    #[test]
    fn rejects_unknown_command_letter() {
        assert!(parse("1 k").is_err());
    }
}
