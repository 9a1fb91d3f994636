//! Tokenizer for the exercise language (a strict-mode JavaScript subset).
//!
//! The whole source is tokenized up front. Regular-expression literals are
//! told apart from division by looking at the previous significant token, and
//! template literals carry their embedded expressions as nested token lists.

use std::fmt;
use std::rc::Rc;

use super::error::{ParseError, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Throw,
    Try,
    Catch,
    Finally,
    New,
    Typeof,
    Instanceof,
    In,
    Delete,
    Void,
    True,
    False,
    Null,
    This,
    Switch,
    Case,
    Default,
    // Reserved words the subset rejects
    Class,
    With,
    Yield,
    Async,
    Await,
    Import,
    Export,
    Extends,
    Super,
    Enum,
    Debugger,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Keyword> {
        let kw = match word {
            "var" => Keyword::Var,
            "let" => Keyword::Let,
            "const" => Keyword::Const,
            "function" => Keyword::Function,
            "return" => Keyword::Return,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "for" => Keyword::For,
            "while" => Keyword::While,
            "do" => Keyword::Do,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "throw" => Keyword::Throw,
            "try" => Keyword::Try,
            "catch" => Keyword::Catch,
            "finally" => Keyword::Finally,
            "new" => Keyword::New,
            "typeof" => Keyword::Typeof,
            "instanceof" => Keyword::Instanceof,
            "in" => Keyword::In,
            "delete" => Keyword::Delete,
            "void" => Keyword::Void,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            "this" => Keyword::This,
            "switch" => Keyword::Switch,
            "case" => Keyword::Case,
            "default" => Keyword::Default,
            "class" => Keyword::Class,
            "with" => Keyword::With,
            "yield" => Keyword::Yield,
            "async" => Keyword::Async,
            "await" => Keyword::Await,
            "import" => Keyword::Import,
            "export" => Keyword::Export,
            "extends" => Keyword::Extends,
            "super" => Keyword::Super,
            "enum" => Keyword::Enum,
            "debugger" => Keyword::Debugger,
            _ => return None,
        };
        Some(kw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Var => "var",
            Keyword::Let => "let",
            Keyword::Const => "const",
            Keyword::Function => "function",
            Keyword::Return => "return",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::While => "while",
            Keyword::Do => "do",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Catch => "catch",
            Keyword::Finally => "finally",
            Keyword::New => "new",
            Keyword::Typeof => "typeof",
            Keyword::Instanceof => "instanceof",
            Keyword::In => "in",
            Keyword::Delete => "delete",
            Keyword::Void => "void",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::This => "this",
            Keyword::Switch => "switch",
            Keyword::Case => "case",
            Keyword::Default => "default",
            Keyword::Class => "class",
            Keyword::With => "with",
            Keyword::Yield => "yield",
            Keyword::Async => "async",
            Keyword::Await => "await",
            Keyword::Import => "import",
            Keyword::Export => "export",
            Keyword::Extends => "extends",
            Keyword::Super => "super",
            Keyword::Enum => "enum",
            Keyword::Debugger => "debugger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LBrace,          // {
    RBrace,          // }
    LParen,          // (
    RParen,          // )
    LBracket,        // [
    RBracket,        // ]
    Dot,             // .
    Ellipsis,        // ...
    Semicolon,       // ;
    Comma,           // ,
    Lt,              // <
    Gt,              // >
    Le,              // <=
    Ge,              // >=
    Eq,              // ==
    Ne,              // !=
    StrictEq,        // ===
    StrictNe,        // !==
    Plus,            // +
    Minus,           // -
    Star,            // *
    Slash,           // /
    Percent,         // %
    StarStar,        // **
    PlusPlus,        // ++
    MinusMinus,      // --
    Shl,             // <<
    Shr,             // >>
    UShr,            // >>>
    Amp,             // &
    Pipe,            // |
    Caret,           // ^
    Bang,            // !
    Tilde,           // ~
    AndAnd,          // &&
    OrOr,            // ||
    Nullish,         // ??
    Question,        // ?
    QuestionDot,     // ?.
    Colon,           // :
    Assign,          // =
    PlusAssign,      // +=
    MinusAssign,     // -=
    StarAssign,      // *=
    SlashAssign,     // /=
    PercentAssign,   // %=
    StarStarAssign,  // **=
    ShlAssign,       // <<=
    ShrAssign,       // >>=
    UShrAssign,      // >>>=
    AmpAssign,       // &=
    PipeAssign,      // |=
    CaretAssign,     // ^=
    AndAndAssign,    // &&=
    OrOrAssign,      // ||=
    NullishAssign,   // ??=
    Arrow,           // =>
}

/// Punctuators ordered longest first so the scanner takes the maximal munch.
const PUNCTUATORS: &[(&str, Punct)] = &[
    (">>>=", Punct::UShrAssign),
    ("...", Punct::Ellipsis),
    ("===", Punct::StrictEq),
    ("!==", Punct::StrictNe),
    ("**=", Punct::StarStarAssign),
    ("<<=", Punct::ShlAssign),
    (">>=", Punct::ShrAssign),
    (">>>", Punct::UShr),
    ("&&=", Punct::AndAndAssign),
    ("||=", Punct::OrOrAssign),
    ("??=", Punct::NullishAssign),
    ("<=", Punct::Le),
    (">=", Punct::Ge),
    ("==", Punct::Eq),
    ("!=", Punct::Ne),
    ("**", Punct::StarStar),
    ("++", Punct::PlusPlus),
    ("--", Punct::MinusMinus),
    ("<<", Punct::Shl),
    (">>", Punct::Shr),
    ("&&", Punct::AndAnd),
    ("||", Punct::OrOr),
    ("??", Punct::Nullish),
    ("+=", Punct::PlusAssign),
    ("-=", Punct::MinusAssign),
    ("*=", Punct::StarAssign),
    ("/=", Punct::SlashAssign),
    ("%=", Punct::PercentAssign),
    ("&=", Punct::AmpAssign),
    ("|=", Punct::PipeAssign),
    ("^=", Punct::CaretAssign),
    ("=>", Punct::Arrow),
    ("{", Punct::LBrace),
    ("}", Punct::RBrace),
    ("(", Punct::LParen),
    (")", Punct::RParen),
    ("[", Punct::LBracket),
    ("]", Punct::RBracket),
    (".", Punct::Dot),
    (";", Punct::Semicolon),
    (",", Punct::Comma),
    ("<", Punct::Lt),
    (">", Punct::Gt),
    ("+", Punct::Plus),
    ("-", Punct::Minus),
    ("*", Punct::Star),
    ("/", Punct::Slash),
    ("%", Punct::Percent),
    ("&", Punct::Amp),
    ("|", Punct::Pipe),
    ("^", Punct::Caret),
    ("!", Punct::Bang),
    ("~", Punct::Tilde),
    ("?", Punct::Question),
    (":", Punct::Colon),
    ("=", Punct::Assign),
];

impl Punct {
    pub fn as_str(&self) -> &'static str {
        PUNCTUATORS
            .iter()
            .find(|(_, p)| p == self)
            .map(|(s, _)| *s)
            .unwrap_or("?.")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChunk {
    Text(Rc<str>),
    Expr(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Number(f64),
    Str(Rc<str>),
    Template(Vec<TemplateChunk>),
    Regex { pattern: Rc<str>, flags: Rc<str> },
    Ident(Rc<str>),
    Keyword(Keyword),
    Punct(Punct),
    Eof,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Number(n) => write!(f, "number {}", n),
            Tok::Str(_) => write!(f, "string"),
            Tok::Template(_) => write!(f, "template string"),
            Tok::Regex { .. } => write!(f, "regular expression"),
            Tok::Ident(name) => write!(f, "identifier '{}'", name),
            Tok::Keyword(kw) => write!(f, "token '{}'", kw.as_str()),
            Tok::Punct(p) => write!(f, "token '{}'", p.as_str()),
            Tok::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub pos: Pos,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
    /// Byte range in the source text.
    pub start: usize,
    pub end: usize,
}

pub struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input. The last token is always `Tok::Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = self.lex_sequence(false)?;
        let newline_before = self.skip_trivia()?;
        tokens.push(Token {
            tok: Tok::Eof,
            pos: self.pos(),
            newline_before,
            start: self.offset,
            end: self.offset,
        });
        Ok(tokens)
    }

    /// Lex tokens until end of input, or until the `}` closing a template
    /// substitution when `in_template` is set (the brace is consumed).
    fn lex_sequence(&mut self, in_template: bool) -> Result<Vec<Token>, ParseError> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut depth = 0usize;
        loop {
            let newline_before = self.skip_trivia()?;
            let Some(c) = self.peek() else {
                if in_template {
                    return Err(self.error("Unterminated template literal"));
                }
                return Ok(tokens);
            };
            if in_template && c == '}' && depth == 0 {
                self.bump();
                return Ok(tokens);
            }
            let pos = self.pos();
            let start = self.offset;
            let regex_allowed = regex_allowed_after(tokens.last().map(|t| &t.tok));
            let tok = self.lex_token(c, regex_allowed)?;
            match tok {
                Tok::Punct(Punct::LBrace) => depth += 1,
                Tok::Punct(Punct::RBrace) => depth = depth.saturating_sub(1),
                _ => {}
            }
            tokens.push(Token {
                tok,
                pos,
                newline_before,
                start,
                end: self.offset,
            });
        }
    }

    fn lex_token(&mut self, c: char, regex_allowed: bool) -> Result<Tok, ParseError> {
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            return self.lex_number();
        }
        if c == '"' || c == '\'' {
            return self.lex_string(c);
        }
        if c == '`' {
            return self.lex_template();
        }
        if is_ident_start(c) {
            let word = self.lex_word();
            return Ok(match Keyword::from_word(&word) {
                Some(kw) => Tok::Keyword(kw),
                None => Tok::Ident(word.into()),
            });
        }
        if c == '/' && regex_allowed {
            return self.lex_regex();
        }
        // `?.` followed by a digit is a conditional, not optional chaining.
        if c == '?' && self.peek_at(1) == Some('.') && !self.peek_at(2).is_some_and(|d| d.is_ascii_digit()) {
            self.bump();
            self.bump();
            return Ok(Tok::Punct(Punct::QuestionDot));
        }
        let rest = &self.src[self.offset..];
        for (text, punct) in PUNCTUATORS {
            if rest.starts_with(text) {
                for _ in 0..text.len() {
                    self.bump();
                }
                return Ok(Tok::Punct(*punct));
            }
        }
        Err(self.error("Invalid or unexpected token"))
    }

    fn lex_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        word
    }

    fn lex_number(&mut self) -> Result<Tok, ParseError> {
        let start_pos = self.pos();
        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x') | Some('X') => Some(16),
                Some('b') | Some('B') => Some(2),
                Some('o') | Some('O') => Some(8),
                _ => None,
            };
            if let Some(radix) = radix {
                self.bump();
                self.bump();
                let digits = self.take_digits(|c| c.is_digit(radix));
                if digits.is_empty() {
                    return Err(ParseError::new("Invalid or unexpected token", start_pos));
                }
                let value = digits
                    .chars()
                    .fold(0f64, |acc, d| acc * radix as f64 + d.to_digit(radix).unwrap_or(0) as f64);
                return self.finish_number(value);
            }
            if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                let legacy_octal = self.src[self.offset + 1..]
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .all(|c| c < '8');
                let message = if legacy_octal {
                    "Octal literals are not allowed in strict mode."
                } else {
                    "Decimals with leading zeros are not allowed in strict mode."
                };
                return Err(ParseError::new(message, start_pos));
            }
        }

        let mut text = self.take_digits(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            text.push('.');
            self.bump();
            text.push_str(&self.take_digits(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = self.peek_at(1);
            let has_digits = match sign {
                Some('+') | Some('-') => self.peek_at(2).is_some_and(|d| d.is_ascii_digit()),
                Some(d) => d.is_ascii_digit(),
                None => false,
            };
            if !has_digits {
                return Err(ParseError::new("Invalid or unexpected token", start_pos));
            }
            text.push('e');
            self.bump();
            if let Some(s @ ('+' | '-')) = self.peek() {
                text.push(s);
                self.bump();
            }
            text.push_str(&self.take_digits(|c| c.is_ascii_digit()));
        }
        let value: f64 = text
            .parse()
            .map_err(|_| ParseError::new("Invalid or unexpected token", start_pos))?;
        self.finish_number(value)
    }

    fn finish_number(&mut self, value: f64) -> Result<Tok, ParseError> {
        match self.peek() {
            Some('n') => Err(self.error("BigInt literals are not supported")),
            Some(c) if is_ident_start(c) || c.is_ascii_digit() => {
                Err(self.error("Invalid or unexpected token"))
            }
            _ => Ok(Tok::Number(value)),
        }
    }

    /// Digits with `_` separators removed.
    fn take_digits(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if accept(c) {
                digits.push(c);
                self.bump();
            } else if c == '_' && self.peek_at(1).is_some_and(&accept) && !digits.is_empty() {
                self.bump();
            } else {
                break;
            }
        }
        digits
    }

    fn lex_string(&mut self, quote: char) -> Result<Tok, ParseError> {
        let start_pos = self.pos();
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => {
                    return Err(ParseError::new("Invalid or unexpected token", start_pos));
                }
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(Tok::Str(value.into()));
                }
                Some('\\') => {
                    self.bump();
                    self.lex_escape(&mut value)?;
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }

    fn lex_template(&mut self) -> Result<Tok, ParseError> {
        let start_pos = self.pos();
        self.bump();
        let mut chunks = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::new("Unterminated template literal", start_pos)),
                Some('`') => {
                    self.bump();
                    chunks.push(TemplateChunk::Text(text.into()));
                    return Ok(Tok::Template(chunks));
                }
                Some('\\') => {
                    self.bump();
                    self.lex_escape(&mut text)?;
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    chunks.push(TemplateChunk::Text(std::mem::take(&mut text).into()));
                    let inner = self.lex_sequence(true)?;
                    chunks.push(TemplateChunk::Expr(inner));
                }
                Some('\r') => {
                    // CRLF and CR are normalized to LF inside templates.
                    self.bump();
                    if self.peek() == Some('\n') {
                        self.bump();
                    }
                    text.push('\n');
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    fn lex_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let pos = self.pos();
        let Some(c) = self.peek() else {
            return Err(ParseError::new("Invalid or unexpected token", pos));
        };
        self.bump();
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek().is_some_and(|d| d.is_ascii_digit()) => out.push('\0'),
            '0'..='9' => {
                return Err(ParseError::new(
                    "Octal escape sequences are not allowed in strict mode.",
                    pos,
                ));
            }
            'x' => {
                let code = self.take_hex(2, pos)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let code = self.lex_unicode_escape(pos)?;
                // Join surrogate pairs written as two escapes.
                if (0xD800..0xDC00).contains(&code)
                    && self.peek() == Some('\\')
                    && self.peek_at(1) == Some('u')
                {
                    let checkpoint = (self.offset, self.line, self.column);
                    self.bump();
                    self.bump();
                    let low = self.lex_unicode_escape(pos)?;
                    if (0xDC00..0xE000).contains(&low) {
                        let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                        out.push(char::from_u32(combined).unwrap_or('\u{fffd}'));
                        return Ok(());
                    }
                    (self.offset, self.line, self.column) = checkpoint;
                }
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
        Ok(())
    }

    fn lex_unicode_escape(&mut self, pos: Pos) -> Result<u32, ParseError> {
        if self.peek() == Some('{') {
            self.bump();
            let digits = self.take_digits(|c| c.is_ascii_hexdigit());
            if self.peek() != Some('}') || digits.is_empty() {
                return Err(ParseError::new("Invalid Unicode escape sequence", pos));
            }
            self.bump();
            let code = u32::from_str_radix(&digits, 16)
                .map_err(|_| ParseError::new("Undefined Unicode code-point", pos))?;
            if code > 0x10FFFF {
                return Err(ParseError::new("Undefined Unicode code-point", pos));
            }
            return Ok(code);
        }
        self.take_hex(4, pos)
    }

    fn take_hex(&mut self, count: usize, pos: Pos) -> Result<u32, ParseError> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| ParseError::new("Invalid hexadecimal escape sequence", pos))?;
            code = code * 16 + digit;
            self.bump();
        }
        Ok(code)
    }

    fn lex_regex(&mut self) -> Result<Tok, ParseError> {
        let start_pos = self.pos();
        self.bump();
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => {
                    return Err(ParseError::new(
                        "Invalid regular expression: missing /",
                        start_pos,
                    ));
                }
                Some('\\') => {
                    pattern.push('\\');
                    self.bump();
                    if let Some(c) = self.peek() {
                        pattern.push(c);
                        self.bump();
                    }
                }
                Some('[') => {
                    in_class = true;
                    pattern.push('[');
                    self.bump();
                }
                Some(']') => {
                    in_class = false;
                    pattern.push(']');
                    self.bump();
                }
                Some('/') if !in_class => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    pattern.push(c);
                    self.bump();
                }
            }
        }
        let flags = self.lex_word();
        if let Some(bad) = flags.chars().find(|f| !"dgimsuy".contains(*f)) {
            return Err(ParseError::new(
                format!("Invalid regular expression flags '{}'", bad),
                start_pos,
            ));
        }
        Ok(Tok::Regex {
            pattern: pattern.into(),
            flags: flags.into(),
        })
    }

    /// Skip whitespace and comments; reports whether a line break was seen.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n') | Some('\r') | Some('\u{2028}') | Some('\u{2029}') => {
                    newline = true;
                    self.bump();
                }
                Some(c) if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let pos = self.pos();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => {
                                return Err(ParseError::new("Invalid or unexpected token", pos));
                            }
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(c) => {
                                if c == '\n' || c == '\r' {
                                    newline = true;
                                }
                                self.bump();
                            }
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.offset..].chars().nth(n)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.offset += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::new(message, self.pos())
    }
}

fn regex_allowed_after(prev: Option<&Tok>) -> bool {
    match prev {
        None => true,
        Some(Tok::Number(_))
        | Some(Tok::Str(_))
        | Some(Tok::Template(_))
        | Some(Tok::Regex { .. })
        | Some(Tok::Ident(_)) => false,
        Some(Tok::Keyword(kw)) => !matches!(
            kw,
            Keyword::This | Keyword::True | Keyword::False | Keyword::Null | Keyword::Super
        ),
        Some(Tok::Punct(p)) => !matches!(
            p,
            Punct::RParen | Punct::RBracket | Punct::RBrace | Punct::PlusPlus | Punct::MinusMinus
        ),
        Some(Tok::Eof) => true,
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.tok)
            .collect()
    }

    #[test]
    fn test_punctuators_take_longest_match() {
        assert_eq!(
            toks("a ??= b >>> 1"),
            vec![
                Tok::Ident("a".into()),
                Tok::Punct(Punct::NullishAssign),
                Tok::Ident("b".into()),
                Tok::Punct(Punct::UShr),
                Tok::Number(1.0),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_regex_versus_division() {
        let tokens = toks("x = a / b; y = /ab+c/gi");
        assert!(tokens.contains(&Tok::Punct(Punct::Slash)));
        assert!(tokens.contains(&Tok::Regex {
            pattern: "ab+c".into(),
            flags: "gi".into()
        }));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(toks("0xff")[0], Tok::Number(255.0));
        assert_eq!(toks("0b101")[0], Tok::Number(5.0));
        assert_eq!(toks("1_000")[0], Tok::Number(1000.0));
        assert_eq!(toks(".5e1")[0], Tok::Number(5.0));
    }

    #[test]
    fn test_legacy_octal_rejected() {
        let err = Lexer::new("010").tokenize().unwrap_err();
        assert!(err.message.contains("Octal literals"));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(toks(r#""a\nA\u{1F600}""#)[0], Tok::Str("a\nA😀".into()));
        assert_eq!(toks(r#"'😀'"#)[0], Tok::Str("😀".into()));
    }

    #[test]
    fn test_template_with_nested_braces() {
        let tokens = toks("`a${ {x: 1}.x }b`");
        match &tokens[0] {
            Tok::Template(chunks) => {
                assert_eq!(chunks.len(), 3);
                assert_eq!(chunks[0], TemplateChunk::Text("a".into()));
                assert_eq!(chunks[2], TemplateChunk::Text("b".into()));
            }
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_newline_tracking() {
        let tokens = Lexer::new("a\n/* c\n */ b").tokenize().unwrap();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(Lexer::new("'abc").tokenize().is_err());
    }
}
