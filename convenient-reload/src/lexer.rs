// Lexer for module headers using logos
// Tokens carry their byte span so the reader can report line numbers

use logos::Logos;
use std::ops::Range;

/// Token kinds of the header language.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f,]+")]
#[logos(skip r";[^\n]*")]
#[logos(skip r"#![^\n]*")]
pub enum TokenKind {
    // Delimiters
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,

    // Dispatch forms
    /// `#{`, set literal
    #[token("#{")]
    SetOpen,
    /// `#(`, anonymous function
    #[token("#(")]
    FnOpen,
    /// `#_`, drops the next form
    #[token("#_")]
    Discard,
    /// `#?`, reader conditional
    #[token("#?")]
    ReaderCond,
    /// `#?@`, splicing reader conditional
    #[token("#?@")]
    ReaderCondSplice,
    /// `#'`
    #[token("#'")]
    VarQuote,
    /// `#"..."` pattern literal
    #[regex(r#"#"([^"\\]|\\.)*""#)]
    Regex,

    // Prefix forms
    /// `'`
    #[token("'")]
    Quote,
    /// `^` metadata prefix
    #[token("^")]
    Meta,
    /// Backquote
    #[token("`")]
    SyntaxQuote,
    /// `~`
    #[token("~")]
    Unquote,
    /// `~@`
    #[token("~@")]
    UnquoteSplice,
    /// `@`
    #[token("@")]
    Deref,

    // Atoms
    /// String literal with escapes
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,
    /// Character literal, e.g. `\a` or `\newline`
    #[regex(r"\\[^ \t\r\n\f]")]
    #[regex(r"\\[a-zA-Z][a-zA-Z0-9]+")]
    Char,
    /// `:name` or `::name`
    #[regex(r#"::?[^ \t\r\n\f,()\[\]{}"';@^`~\\]+"#)]
    Keyword,
    /// Any other bare word, numbers included
    #[regex(r#"[^ \t\r\n\f,()\[\]{}"';@^`~\\#:][^ \t\r\n\f,()\[\]{}"';@^`~\\]*"#)]
    Symbol,
}

/// A token with its source text and byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Kind, or `None` for input the lexer does not recognize
    pub kind: Option<TokenKind>,
    /// Source slice
    pub text: &'a str,
    /// Byte range in the input
    pub span: Range<usize>,
}

/// Lazy token stream; the header reader stops after the leading form, so
/// the rest of the file is never tokenized.
pub struct Lexer<'a> {
    /// Underlying logos lexer
    inner: logos::Lexer<'a, TokenKind>,
}

impl<'a> Lexer<'a> {
    /// Start lexing `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(input),
        }
    }

    /// Tokenize the whole input (used in tests and diagnostics).
    #[must_use]
    pub fn tokenize(input: &'a str) -> Vec<Token<'a>> {
        Self::new(input).collect()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = self.inner.next()?.ok();
        Some(Token {
            kind,
            text: self.inner.slice(),
            span: self.inner.span(),
        })
    }
}

/// 1-based line number of a byte offset.
#[must_use]
pub fn line_of(input: &str, offset: usize) -> usize {
    let end = offset.min(input.len());
    input.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
