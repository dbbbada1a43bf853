//! Lexer for the Opal programming language.

use logos::Logos;

use super::ParseError;

/// Token types for Opal.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
pub enum TokenKind {
    // Keywords
    #[token("as")]
    As,
    #[token("do")]
    Do,
    #[token("else")]
    Else,
    #[token("false")]
    False,
    #[token("fn")]
    Fn,
    #[token("for")]
    For,
    #[token("foreach")]
    Foreach,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("len")]
    Len,
    #[token("let")]
    Let,
    #[token("new")]
    New,
    #[token("return")]
    Return,
    #[token("struct")]
    Struct,
    #[token("true")]
    True,
    #[token("typeof")]
    Typeof,
    #[token("unset")]
    Unset,
    #[token("while")]
    While,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLit(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLit(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        Some(unescape(&s[1..s.len() - 1]))
    })]
    StrLit(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Operators
    #[token("**")]
    StarStar,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
}

impl TokenKind {
    /// Human-readable description for parse error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::FloatLit(v) => format!("float literal {}", v),
            TokenKind::IntLit(v) => format!("integer literal {}", v),
            TokenKind::StrLit(_) => "string literal".to_string(),
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            other => format!("'{}'", symbol(other)),
        }
    }
}

fn symbol(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::As => "as",
        TokenKind::Do => "do",
        TokenKind::Else => "else",
        TokenKind::False => "false",
        TokenKind::Fn => "fn",
        TokenKind::For => "for",
        TokenKind::Foreach => "foreach",
        TokenKind::If => "if",
        TokenKind::In => "in",
        TokenKind::Is => "is",
        TokenKind::Len => "len",
        TokenKind::Let => "let",
        TokenKind::New => "new",
        TokenKind::Return => "return",
        TokenKind::Struct => "struct",
        TokenKind::True => "true",
        TokenKind::Typeof => "typeof",
        TokenKind::Unset => "unset",
        TokenKind::While => "while",
        TokenKind::StarStar => "**",
        TokenKind::PlusPlus => "++",
        TokenKind::MinusMinus => "--",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::EqEq => "==",
        TokenKind::BangEq => "!=",
        TokenKind::LtEq => "<=",
        TokenKind::GtEq => ">=",
        TokenKind::Lt => "<",
        TokenKind::Gt => ">",
        TokenKind::AndAnd => "&&",
        TokenKind::OrOr => "||",
        TokenKind::Bang => "!",
        TokenKind::Eq => "=",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Comma => ",",
        TokenKind::Semi => ";",
        TokenKind::Dot => ".",
        _ => "?",
    }
}

/// Process backslash escapes inside a string literal.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// A token together with the 1-indexed source line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Tokenize a whole source file.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let line = line_of(source, lexer.span().start);
        match result {
            Ok(kind) => tokens.push(Token { kind, line }),
            Err(()) => {
                return Err(ParseError::InvalidToken {
                    text: lexer.slice().to_string(),
                    line,
                })
            }
        }
    }

    Ok(tokens)
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}
