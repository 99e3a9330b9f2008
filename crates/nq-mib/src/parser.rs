//! SMIv2 subset parser.
//!
//! Understands enough of a MIB module to extract named OID definitions:
//! the `DEFINITIONS ::= BEGIN ... END` frame, plain `OBJECT IDENTIFIER`
//! assignments and the MODULE-IDENTITY, OBJECT-IDENTITY, OBJECT-TYPE,
//! NOTIFICATION-TYPE, OBJECT-GROUP, NOTIFICATION-GROUP and MODULE-COMPLIANCE
//! macros. Type assignments, textual conventions and MACRO bodies are
//! skipped. Parent names are resolved after parsing, so forward references
//! within a module work.

use std::collections::HashMap;
use std::fmt;

use nq_protocol::{EntryKind, Oid, SchemaEntry};

/// Arcs of the SNMPv2-SMI tree roots every module may reference.
static WELL_KNOWN: &[(&str, &[u32])] = &[
    ("ccitt", &[0]),
    ("zeroDotZero", &[0, 0]),
    ("iso", &[1]),
    ("joint-iso-ccitt", &[2]),
    ("org", &[1, 3]),
    ("dod", &[1, 3, 6]),
    ("internet", &[1, 3, 6, 1]),
    ("directory", &[1, 3, 6, 1, 1]),
    ("mgmt", &[1, 3, 6, 1, 2]),
    ("mib-2", &[1, 3, 6, 1, 2, 1]),
    ("transmission", &[1, 3, 6, 1, 2, 1, 10]),
    ("experimental", &[1, 3, 6, 1, 3]),
    ("private", &[1, 3, 6, 1, 4]),
    ("enterprises", &[1, 3, 6, 1, 4, 1]),
    ("security", &[1, 3, 6, 1, 5]),
    ("snmpV2", &[1, 3, 6, 1, 6]),
    ("snmpDomains", &[1, 3, 6, 1, 6, 1]),
    ("snmpProxys", &[1, 3, 6, 1, 6, 2]),
    ("snmpModules", &[1, 3, 6, 1, 6, 3]),
];

/// Clauses that end a SYNTAX clause.
const CLAUSE_KEYWORDS: &[&str] = &[
    "UNITS",
    "MAX-ACCESS",
    "ACCESS",
    "MIN-ACCESS",
    "STATUS",
    "DESCRIPTION",
    "REFERENCE",
    "INDEX",
    "AUGMENTS",
    "DEFVAL",
    "WRITE-SYNTAX",
];

/// Look up a well-known root by name.
pub fn well_known(name: &str) -> Option<Oid> {
    WELL_KNOWN
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, arcs)| Oid::from_slice(arcs))
}

fn macro_kind(keyword: &str) -> Option<EntryKind> {
    match keyword {
        "MODULE-IDENTITY" => Some(EntryKind::ModuleIdentity),
        "OBJECT-IDENTITY" => Some(EntryKind::ObjectIdentity),
        "OBJECT-TYPE" => Some(EntryKind::ObjectType),
        "NOTIFICATION-TYPE" => Some(EntryKind::NotificationType),
        "OBJECT-GROUP" => Some(EntryKind::ObjectGroup),
        "NOTIFICATION-GROUP" => Some(EntryKind::NotificationGroup),
        "MODULE-COMPLIANCE" => Some(EntryKind::ModuleCompliance),
        _ => None,
    }
}

/// Where and why parsing stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// One element of an OID value such as `{ iso org(3) dod(6) 1 }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OidComponent {
    Name(String),
    Number(u32),
    NamedNumber(String, u32),
}

/// A named definition before its OID has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub kind: EntryKind,
    pub description: String,
    pub syntax: String,
    pub value: Vec<OidComponent>,
    pub line: usize,
}

/// Result of parsing one module's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModule {
    pub name: String,
    pub definitions: Vec<Definition>,
}

impl ParsedModule {
    /// Resolve every definition to a [`SchemaEntry`] attributed to `module`.
    ///
    /// Parents are looked up among this module's own definitions, then via
    /// `lookup` (other loaded modules), then among the well-known roots.
    /// Returns the entries plus the names whose parent never resolved.
    pub fn resolve(
        &self,
        module: &str,
        lookup: impl Fn(&str) -> Option<Oid>,
    ) -> (Vec<SchemaEntry>, Vec<String>) {
        let mut local: HashMap<&str, Oid> = HashMap::new();
        let mut entries = Vec::with_capacity(self.definitions.len());
        let mut pending: Vec<&Definition> = self.definitions.iter().collect();

        loop {
            let before = pending.len();
            pending.retain(|&def| {
                let Some(identifier) = resolve_value(&def.value, &local, &lookup) else {
                    return true;
                };
                local.insert(def.name.as_str(), identifier.clone());
                entries.push(SchemaEntry {
                    module: module.to_string(),
                    name: def.name.clone(),
                    identifier,
                    description: def.description.clone(),
                    syntax: def.syntax.clone(),
                    kind: def.kind,
                });
                false
            });
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        let unresolved = pending.iter().map(|def| def.name.clone()).collect();
        (entries, unresolved)
    }
}

fn resolve_value(
    components: &[OidComponent],
    local: &HashMap<&str, Oid>,
    lookup: &impl Fn(&str) -> Option<Oid>,
) -> Option<Oid> {
    let (first, rest) = components.split_first()?;
    let mut arcs = match first {
        OidComponent::Number(n) | OidComponent::NamedNumber(_, n) => vec![*n],
        OidComponent::Name(name) => local
            .get(name.as_str())
            .cloned()
            .or_else(|| lookup(name))
            .or_else(|| well_known(name))?
            .arcs()
            .to_vec(),
    };
    for component in rest {
        match component {
            OidComponent::Number(n) | OidComponent::NamedNumber(_, n) => arcs.push(*n),
            OidComponent::Name(_) => return None,
        }
    }
    Some(Oid::new(arcs))
}

// ── Lexer ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Word(String),
    Number(u64),
    Text(String),
    Assign,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Semi,
    Punct(char),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
    start: usize,
    end: usize,
}

fn lex(text: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;
        match c {
            b'\n' => {
                line += 1;
                pos += 1;
            }
            c if c.is_ascii_whitespace() => pos += 1,
            b'-' if bytes.get(pos + 1) == Some(&b'-') => {
                // Comment runs to end of line or the next `--`.
                pos += 2;
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    if bytes[pos] == b'-' && bytes.get(pos + 1) == Some(&b'-') {
                        pos += 2;
                        break;
                    }
                    pos += 1;
                }
            }
            b'"' => {
                let open_line = line;
                pos += 1;
                let body_start = pos;
                while pos < bytes.len() && bytes[pos] != b'"' {
                    if bytes[pos] == b'\n' {
                        line += 1;
                    }
                    pos += 1;
                }
                if pos >= bytes.len() {
                    return Err(ParseError::new(open_line, "unterminated string"));
                }
                let body = &text[body_start..pos];
                pos += 1;
                tokens.push(Token {
                    tok: Tok::Text(body.to_string()),
                    line: open_line,
                    start,
                    end: pos,
                });
            }
            b'\'' => {
                // 'ff'H / '0101'B literals, kept as opaque words.
                pos += 1;
                while pos < bytes.len() && bytes[pos] != b'\'' {
                    pos += 1;
                }
                if pos >= bytes.len() {
                    return Err(ParseError::new(line, "unterminated quoted literal"));
                }
                pos += 1;
                if pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
                    pos += 1;
                }
                tokens.push(Token {
                    tok: Tok::Word(text[start..pos].to_string()),
                    line,
                    start,
                    end: pos,
                });
            }
            b':' if text[pos..].starts_with("::=") => {
                pos += 3;
                tokens.push(Token {
                    tok: Tok::Assign,
                    line,
                    start,
                    end: pos,
                });
            }
            c if c.is_ascii_digit() => {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                let digits = &text[start..pos];
                let n = digits
                    .parse::<u64>()
                    .map_err(|_| ParseError::new(line, format!("number '{digits}' out of range")))?;
                tokens.push(Token {
                    tok: Tok::Number(n),
                    line,
                    start,
                    end: pos,
                });
            }
            c if c.is_ascii_alphabetic() => {
                while pos < bytes.len() {
                    let b = bytes[pos];
                    let hyphen_ok = b == b'-'
                        && bytes.get(pos + 1).is_some_and(|n| n.is_ascii_alphanumeric());
                    if b.is_ascii_alphanumeric() || b == b'_' || hyphen_ok {
                        pos += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    tok: Tok::Word(text[start..pos].to_string()),
                    line,
                    start,
                    end: pos,
                });
            }
            _ => {
                let tok = match c {
                    b'{' => Tok::LBrace,
                    b'}' => Tok::RBrace,
                    b'(' => Tok::LParen,
                    b')' => Tok::RParen,
                    b';' => Tok::Semi,
                    _ => {
                        // Multi-byte characters only occur in comments and
                        // strings in sane MIBs; skip the whole code point.
                        let ch = text[pos..].chars().next().unwrap_or('?');
                        pos += ch.len_utf8() - 1;
                        Tok::Punct(ch)
                    }
                };
                pos += 1;
                tokens.push(Token {
                    tok,
                    line,
                    start,
                    end: pos,
                });
            }
        }
    }
    Ok(tokens)
}

// ── Parser ──────────────────────────────────────────────────────

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset).map(|t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn is_word(&self, offset: usize, word: &str) -> bool {
        matches!(self.peek_at(offset), Some(Tok::Word(w)) if w == word)
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.is_word(0, word) {
            self.pos += 1;
            Ok(())
        } else {
            Err(ParseError::new(self.line(), format!("expected '{word}'")))
        }
    }

    fn skip_past_semicolon(&mut self) {
        while let Some(token) = self.bump() {
            if token.tok == Tok::Semi {
                break;
            }
        }
    }

    fn skip_macro_definition(&mut self) {
        while let Some(token) = self.bump() {
            if matches!(&token.tok, Tok::Word(w) if w == "END") {
                break;
            }
        }
    }

    fn parse_module(mut self) -> Result<ParsedModule, ParseError> {
        let name = match self.bump() {
            Some(Token {
                tok: Tok::Word(name),
                ..
            }) => name,
            _ => return Err(ParseError::new(1, "expected module name")),
        };
        self.expect_word("DEFINITIONS")?;
        // Optional tag default (`IMPLICIT TAGS`) before the assignment.
        while !matches!(self.peek(), Some(Tok::Assign) | None) {
            self.pos += 1;
        }
        if self.bump().is_none() {
            return Err(ParseError::new(self.line(), "expected '::=' after DEFINITIONS"));
        }
        self.expect_word("BEGIN")?;

        let mut definitions = Vec::new();
        loop {
            let word = match self.peek() {
                None => {
                    return Err(ParseError::new(self.line(), format!("module {name} has no END")));
                }
                Some(Tok::Word(w)) => w.clone(),
                Some(_) => {
                    self.pos += 1;
                    continue;
                }
            };
            match word.as_str() {
                "END" => break,
                "IMPORTS" | "EXPORTS" => self.skip_past_semicolon(),
                _ if self.is_word(1, "MACRO") => self.skip_macro_definition(),
                w if starts_lowercase(w) => {
                    let kind = match self.peek_at(1) {
                        Some(Tok::Word(keyword)) => macro_kind(keyword),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        definitions.push(self.parse_macro(kind)?);
                    } else if self.is_word(1, "OBJECT")
                        && self.is_word(2, "IDENTIFIER")
                        && self.peek_at(3) == Some(&Tok::Assign)
                    {
                        definitions.push(self.parse_oid_assignment()?);
                    } else {
                        self.pos += 1;
                    }
                }
                _ => self.pos += 1,
            }
        }

        Ok(ParsedModule { name, definitions })
    }

    /// `name OBJECT IDENTIFIER ::= { ... }`
    fn parse_oid_assignment(&mut self) -> Result<Definition, ParseError> {
        let line = self.line();
        let name = self.word_text()?;
        self.pos += 3;
        let value = self.parse_oid_value()?;
        Ok(Definition {
            name,
            kind: EntryKind::ObjectIdentifier,
            description: String::new(),
            syntax: String::new(),
            value,
            line,
        })
    }

    /// `name MACRO-KEYWORD clauses... ::= { ... }`
    fn parse_macro(&mut self, kind: EntryKind) -> Result<Definition, ParseError> {
        let line = self.line();
        let name = self.word_text()?;
        self.pos += 1;

        let mut description = None;
        let mut syntax = None;
        let mut depth = 0usize;
        loop {
            let Some(token) = self.bump() else {
                return Err(ParseError::new(line, format!("definition of {name} never assigned")));
            };
            match token.tok {
                Tok::Assign if depth == 0 => break,
                Tok::LBrace => depth += 1,
                Tok::RBrace => depth = depth.saturating_sub(1),
                Tok::Word(w) if depth == 0 && w == "DESCRIPTION" && description.is_none() => {
                    if let Some(Tok::Text(text)) = self.peek() {
                        description = Some(collapse_whitespace(text));
                        self.pos += 1;
                    }
                }
                Tok::Word(w) if depth == 0 && w == "SYNTAX" && syntax.is_none() => {
                    syntax = Some(self.syntax_clause());
                }
                _ => {}
            }
        }

        let value = self.parse_oid_value()?;
        Ok(Definition {
            name,
            kind,
            description: description.unwrap_or_default(),
            syntax: syntax.unwrap_or_default(),
            value,
            line,
        })
    }

    /// Source text of a SYNTAX clause, up to the next clause keyword.
    fn syntax_clause(&mut self) -> String {
        let Some(first) = self.tokens.get(self.pos) else {
            return String::new();
        };
        let start = first.start;
        let mut end = start;
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(self.pos) {
            match &token.tok {
                Tok::Word(w) if depth == 0 && CLAUSE_KEYWORDS.contains(&w.as_str()) => break,
                Tok::Assign if depth == 0 => break,
                Tok::LBrace | Tok::LParen => depth += 1,
                Tok::RBrace | Tok::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            end = token.end;
            self.pos += 1;
        }
        collapse_whitespace(&self.text[start..end])
    }

    fn word_text(&mut self) -> Result<String, ParseError> {
        match self.bump() {
            Some(Token {
                tok: Tok::Word(w), ..
            }) => Ok(w),
            _ => Err(ParseError::new(self.line(), "expected identifier")),
        }
    }

    /// `{ parent 3 }`, `{ iso org(3) dod(6) 1 }`, `{ 1 3 6 1 }`
    fn parse_oid_value(&mut self) -> Result<Vec<OidComponent>, ParseError> {
        let line = self.line();
        if self.bump().map(|t| t.tok) != Some(Tok::LBrace) {
            return Err(ParseError::new(line, "expected '{' to open OID value"));
        }
        let mut components = Vec::new();
        loop {
            let Some(token) = self.bump() else {
                return Err(ParseError::new(line, "unterminated OID value"));
            };
            match token.tok {
                Tok::RBrace => break,
                Tok::Number(n) => components.push(OidComponent::Number(arc(n, token.line)?)),
                Tok::Word(name) => {
                    let named = self.peek() == Some(&Tok::LParen)
                        && matches!(self.peek_at(1), Some(Tok::Number(_)))
                        && self.peek_at(2) == Some(&Tok::RParen);
                    if named {
                        let n = match self.peek_at(1) {
                            Some(Tok::Number(n)) => *n,
                            _ => 0,
                        };
                        self.pos += 3;
                        components.push(OidComponent::NamedNumber(name, arc(n, token.line)?));
                    } else {
                        components.push(OidComponent::Name(name));
                    }
                }
                other => {
                    return Err(ParseError::new(
                        token.line,
                        format!("unexpected {other:?} in OID value"),
                    ));
                }
            }
        }
        if components.is_empty() {
            return Err(ParseError::new(line, "empty OID value"));
        }
        Ok(components)
    }
}

fn arc(n: u64, line: usize) -> Result<u32, ParseError> {
    u32::try_from(n).map_err(|_| ParseError::new(line, format!("arc {n} exceeds 32 bits")))
}

fn starts_lowercase(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_ascii_lowercase())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse MIB module text.
pub fn parse(text: &str) -> Result<ParsedModule, ParseError> {
    let tokens = lex(text)?;
    if tokens.is_empty() {
        return Err(ParseError::new(1, "empty module"));
    }
    Parser {
        text,
        tokens,
        pos: 0,
    }
    .parse_module()
}
