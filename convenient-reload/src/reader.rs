//! Reads the leading form of a source file into a small form tree.
//!
//! Only what is needed to interpret module headers is kept: collections,
//! symbols, keywords, strings and quotes. Metadata, discarded forms and
//! non-matching reader-conditional branches are dropped while reading.

use std::iter::Peekable;

use crate::lexer::{Lexer, Token, TokenKind};

/// A read form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Form {
    /// `( ... )`
    List(Vec<Form>),
    /// `[ ... ]`
    Vector(Vec<Form>),
    /// `{ ... }`
    Map(Vec<Form>),
    /// `#{ ... }`
    Set(Vec<Form>),
    /// A symbol (numbers are read as [`Form::Other`])
    Symbol(String),
    /// A keyword, without the leading colon(s)
    Keyword(String),
    /// A string literal, with escapes left as written
    Str(String),
    /// `'form`
    Quoted(Box<Form>),
    /// Anything else the header does not care about
    Other(String),
}

impl Form {
    /// The symbol text, if this is a symbol.
    #[must_use]
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Form::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// The keyword text (without colon), if this is a keyword.
    #[must_use]
    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            Form::Keyword(name) => Some(name),
            _ => None,
        }
    }
}

/// Failure to read the leading form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadError {
    /// Byte offset of the offending token (or end of input)
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

impl ReadError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Reads forms from source text, resolving reader conditionals against a
/// list of platform features.
pub struct Reader<'a, 'f> {
    tokens: Peekable<Lexer<'a>>,
    features: &'f [String],
    len: usize,
    start: usize,
}

/// What one read step produced.
enum Read {
    Form(Form),
    /// `#?@` contents to splice into the enclosing collection
    Splice(Vec<Form>),
    /// A reader conditional with no matching branch
    Nothing,
}

impl<'a, 'f> Reader<'a, 'f> {
    /// Create a reader over `input`.
    #[must_use]
    pub fn new(input: &'a str, features: &'f [String]) -> Self {
        Self {
            tokens: Lexer::new(input).peekable(),
            features,
            len: input.len(),
            start: 0,
        }
    }

    /// Read the first form of the input.
    ///
    /// Returns `Ok(None)` if the input holds no forms at all.
    ///
    /// # Errors
    ///
    /// Returns a [`ReadError`] if the leading form is malformed.
    pub fn read_leading(&mut self) -> Result<Option<Form>, ReadError> {
        loop {
            match self.tokens.peek() {
                None => return Ok(None),
                Some(token) => self.start = token.span.start,
            }
            match self.read()? {
                Read::Form(form) => return Ok(Some(form)),
                Read::Splice(forms) => {
                    if let Some(first) = forms.into_iter().next() {
                        return Ok(Some(first));
                    }
                }
                Read::Nothing => {}
            }
        }
    }

    /// Byte offset where the last leading form started.
    #[must_use]
    pub fn leading_offset(&self) -> usize {
        self.start
    }

    fn next_token(&mut self) -> Result<Token<'a>, ReadError> {
        self.tokens
            .next()
            .ok_or_else(|| ReadError::new(self.len, "unexpected end of input"))
    }

    /// Read one form that must produce a value (prefix operands).
    fn read_value(&mut self) -> Result<Form, ReadError> {
        loop {
            match self.read()? {
                Read::Form(form) => return Ok(form),
                Read::Splice(_) => {
                    return Err(ReadError::new(self.len, "splice not in a collection"));
                }
                Read::Nothing => {}
            }
        }
    }

    fn read(&mut self) -> Result<Read, ReadError> {
        let token = self.next_token()?;
        let Some(kind) = token.kind else {
            return Err(ReadError::new(
                token.span.start,
                format!("unrecognized input {:?}", token.text),
            ));
        };

        let form = match kind {
            TokenKind::LParen | TokenKind::FnOpen => Form::List(self.read_seq(TokenKind::RParen)?),
            TokenKind::LBracket => Form::Vector(self.read_seq(TokenKind::RBracket)?),
            TokenKind::LBrace => Form::Map(self.read_seq(TokenKind::RBrace)?),
            TokenKind::SetOpen => Form::Set(self.read_seq(TokenKind::RBrace)?),
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                return Err(ReadError::new(
                    token.span.start,
                    format!("unmatched delimiter {}", token.text),
                ));
            }
            TokenKind::Discard => {
                let _ = self.read_value()?;
                return Ok(Read::Nothing);
            }
            TokenKind::Meta => {
                let _ = self.read_value()?;
                self.read_value()?
            }
            TokenKind::Quote => Form::Quoted(Box::new(self.read_value()?)),
            TokenKind::VarQuote
            | TokenKind::SyntaxQuote
            | TokenKind::Unquote
            | TokenKind::UnquoteSplice
            | TokenKind::Deref => {
                let inner = self.read_value()?;
                Form::Other(format!("{}{inner:?}", token.text))
            }
            TokenKind::ReaderCond | TokenKind::ReaderCondSplice => {
                return self.read_conditional(
                    token.span.start,
                    kind == TokenKind::ReaderCondSplice,
                );
            }
            TokenKind::Str => Form::Str(unquote(token.text)),
            TokenKind::Keyword => Form::Keyword(token.text.trim_start_matches(':').to_string()),
            TokenKind::Symbol => {
                if token.text.starts_with(|c: char| c.is_ascii_digit())
                    || (token.text.len() > 1
                        && token.text.starts_with(['+', '-'])
                        && token.text[1..].starts_with(|c: char| c.is_ascii_digit()))
                {
                    Form::Other(token.text.to_string())
                } else {
                    Form::Symbol(token.text.to_string())
                }
            }
            TokenKind::Regex | TokenKind::Char => Form::Other(token.text.to_string()),
        };

        Ok(Read::Form(form))
    }

    fn read_seq(&mut self, close: TokenKind) -> Result<Vec<Form>, ReadError> {
        let mut forms = Vec::new();
        loop {
            match self.tokens.peek().map(|token| token.kind) {
                None => {
                    return Err(ReadError::new(self.len, "unexpected end of input"));
                }
                Some(kind) if kind == Some(close) => {
                    let _ = self.tokens.next();
                    return Ok(forms);
                }
                Some(_) => match self.read()? {
                    Read::Form(form) => forms.push(form),
                    Read::Splice(spliced) => forms.extend(spliced),
                    Read::Nothing => {}
                },
            }
        }
    }

    fn read_conditional(&mut self, offset: usize, splice: bool) -> Result<Read, ReadError> {
        let Form::List(items) = self.read_value()? else {
            return Err(ReadError::new(offset, "reader conditional body must be a list"));
        };
        if items.len() % 2 != 0 {
            return Err(ReadError::new(
                offset,
                "reader conditional requires an even number of forms",
            ));
        }

        let mut default = None;
        let mut chosen = None;
        for pair in items.chunks(2) {
            let Some(feature) = pair[0].as_keyword() else {
                return Err(ReadError::new(offset, "reader conditional keys must be keywords"));
            };
            if chosen.is_none() && self.features.iter().any(|f| f == feature) {
                chosen = Some(pair[1].clone());
            } else if feature == "default" && default.is_none() {
                default = Some(pair[1].clone());
            }
        }

        match (chosen.or(default), splice) {
            (None, _) => Ok(Read::Nothing),
            (Some(form), false) => Ok(Read::Form(form)),
            (Some(Form::List(forms) | Form::Vector(forms)), true) => Ok(Read::Splice(forms)),
            (Some(_), true) => Err(ReadError::new(
                offset,
                "spliced reader conditional branch must be a sequence",
            )),
        }
    }
}

fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(input: &str) -> Result<Option<Form>, ReadError> {
        let features = vec!["clj".to_string()];
        Reader::new(input, &features).read_leading()
    }

    fn sym(s: &str) -> Form {
        Form::Symbol(s.to_string())
    }

    #[test]
    fn test_reads_only_leading_form() {
        let form = read("(ns a.b) (defn broken [ ").unwrap().unwrap();
        assert_eq!(form, Form::List(vec![sym("ns"), sym("a.b")]));
    }

    #[test]
    fn test_shebang_is_a_comment() {
        let form = read("#!/usr/bin/env bb\n(ns a (:require b))").unwrap().unwrap();
        assert_eq!(
            form,
            Form::List(vec![
                sym("ns"),
                sym("a"),
                Form::List(vec![Form::Keyword("require".to_string()), sym("b")]),
            ])
        );
    }

    #[test]
    fn test_empty_and_comment_only() {
        assert_eq!(read("").unwrap(), None);
        assert_eq!(read(";; nothing here\n  \n").unwrap(), None);
    }

    #[test]
    fn test_metadata_and_discard_are_dropped() {
        let form = read("#_(ns ignored) (ns ^{:doc \"x\"} ^:private a #_b c)")
            .unwrap()
            .unwrap();
        assert_eq!(form, Form::List(vec![sym("ns"), sym("a"), sym("c")]));
    }

    #[test]
    fn test_quote_and_numbers() {
        let form = read("(in-ns 'user 42 -1 -main)").unwrap().unwrap();
        assert_eq!(
            form,
            Form::List(vec![
                sym("in-ns"),
                Form::Quoted(Box::new(sym("user"))),
                Form::Other("42".to_string()),
                Form::Other("-1".to_string()),
                sym("-main"),
            ])
        );
    }

    #[test]
    fn test_reader_conditionals() {
        let form = read("[#?(:cljs a :clj b) #?(:cljs c) #?@(:clj [d e] :default [f])]")
            .unwrap()
            .unwrap();
        assert_eq!(form, Form::Vector(vec![sym("b"), sym("d"), sym("e")]));

        let form = read("[#?(:cljs a :default z)]").unwrap().unwrap();
        assert_eq!(form, Form::Vector(vec![sym("z")]));
    }

    #[test]
    fn test_unbalanced_is_error() {
        let err = read("(ns a (:require [b.c)").unwrap_err();
        assert!(err.message.contains("unmatched"));

        let err = read("(ns a\n  (:require b.c)").unwrap_err();
        assert_eq!(err.message, "unexpected end of input");
    }

    #[test]
    fn test_stray_closer_is_error() {
        let err = read(")").unwrap_err();
        assert_eq!(err.offset, 0);
    }
}
