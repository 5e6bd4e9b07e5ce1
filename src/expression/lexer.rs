use crate::expression::error::ExprError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    True,
    False,
    Null,
    Undefined,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    EqEq,
    EqEqEq,
    Ne,
    NeEq,
    Lt,
    Le,
    Gt,
    Ge,

    AndAnd,
    OrOr,
    QuestionQuestion,
    Question,
    Colon,

    Eof,
}

/// Punctuation, longest spellings first so `===` wins over `==`.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("===", TokenKind::EqEqEq),
    ("!==", TokenKind::NeEq),
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    ("??", TokenKind::QuestionQuestion),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::Ne),
    ("<=", TokenKind::Le),
    (">=", TokenKind::Ge),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("!", TokenKind::Bang),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
];

/// Split a bind expression into tokens, ending with [`TokenKind::Eof`].
pub(crate) fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut cursor = Cursor { input, pos: 0 };
    let mut out = Vec::new();
    loop {
        cursor.skip_whitespace();
        let start = cursor.pos;
        let Some(c) = cursor.peek() else {
            out.push(Token {
                kind: TokenKind::Eof,
                span: Span { start, end: start },
            });
            return Ok(out);
        };

        let starts_number =
            c.is_ascii_digit() || (c == '.' && cursor.peek_at(1).is_some_and(|d| d.is_ascii_digit()));
        let kind = if starts_number {
            cursor.number()?
        } else if c == '"' || c == '\'' {
            TokenKind::Str(cursor.string(c)?)
        } else if is_ident_start(c) {
            keyword_or_ident(cursor.ident())
        } else {
            cursor.operator()?
        };
        out.push(Token {
            kind,
            span: Span {
                start,
                end: cursor.pos,
            },
        });
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn keyword_or_ident(word: &str) -> TokenKind {
    match word {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "undefined" => TokenKind::Undefined,
        _ => TokenKind::Ident(word.to_owned()),
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&mut pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace);
    }

    fn ident(&mut self) -> &'a str {
        self.eat_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    }

    /// `12`, `1.5`, `.5`, `2e-3`. A trailing `.` is left for member access.
    fn number(&mut self) -> Result<TokenKind, ExprError> {
        let start = self.pos;
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exp = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.eat_while(|c| c.is_ascii_digit()).is_empty() {
                return Err(ExprError::new(exp, "number exponent has no digits"));
            }
        }
        self.input[start..self.pos]
            .parse()
            .map(TokenKind::Number)
            .map_err(|_| ExprError::new(start, "invalid number"))
    }

    fn string(&mut self, quote: char) -> Result<String, ExprError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                c if c == quote => return Ok(out),
                '\\' => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(other) => out.push(other),
                    None => break,
                },
                other => out.push(other),
            }
        }
        Err(ExprError::new(start, "unterminated string literal"))
    }

    fn operator(&mut self) -> Result<TokenKind, ExprError> {
        let rest = self.rest();
        match OPERATORS.iter().find(|(text, _)| rest.starts_with(text)) {
            Some((text, kind)) => {
                self.pos += text.len();
                Ok(kind.clone())
            }
            None => {
                let ch = rest.chars().next().unwrap_or_default();
                Err(ExprError::new(self.pos, format!("unexpected character '{ch}'")))
            }
        }
    }
}
