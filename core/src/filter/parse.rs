//! Lexer and recursive-descent parser for the filter grammar:
//!
//! ```text
//! expr := term (('&&' | '||') term)*
//! term := ident '(' args? ')' | '(' expr ')'
//! args := arg (',' arg)*
//! arg  := integer | string
//! ```

use dpiprobe_common::error::FilterError;

use super::{Arg, Expr, Primitive};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Text(String),
    Int(u32),
    LParen,
    RParen,
    Comma,
    And,
    Or,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("`{s}`"),
            Token::Text(s) => format!("string `{s}`"),
            Token::Int(v) => format!("integer `{v}`"),
            Token::LParen => "`(`".into(),
            Token::RParen => "`)`".into(),
            Token::Comma => "`,`".into(),
            Token::And => "`&&`".into(),
            Token::Or => "`||`".into(),
        }
    }
}

pub(super) fn parse(src: &str) -> Result<Expr, FilterError> {
    let tokens = lex(src)?;
    if tokens.is_empty() {
        return Err(FilterError::Syntax("empty filter expression".into()));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;

    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(FilterError::Syntax(format!(
            "unexpected {} after expression",
            tok.describe()
        ))),
    }
}

fn lex(src: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '&' | '|' => {
                chars.next();
                if chars.next_if_eq(&c).is_none() {
                    return Err(FilterError::Syntax(format!(
                        "single `{c}`; operators are `{c}{c}`"
                    )));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            '"' | '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(q) if q == c => break,
                        Some(ch) => text.push(ch),
                        None => {
                            return Err(FilterError::Syntax("unterminated string".into()));
                        }
                    }
                }
                tokens.push(Token::Text(text));
            }
            '0'..='9' => {
                let mut digits = String::new();
                while let Some(d) = chars.next_if(|ch| ch.is_ascii_digit()) {
                    digits.push(d);
                }
                let value: u32 = digits.parse().map_err(|_| {
                    FilterError::Syntax(format!("integer `{digits}` is out of range"))
                })?;
                tokens.push(Token::Int(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(ch) =
                    chars.next_if(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
                {
                    ident.push(ch);
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(FilterError::Syntax(format!("unexpected character `{other}`")));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), FilterError> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(FilterError::Syntax(format!(
                "expected {}, found {}",
                want.describe(),
                tok.describe()
            ))),
            None => Err(FilterError::Syntax(format!(
                "expected {}, found end of input",
                want.describe()
            ))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_term()?;

        while let Some(op) = self.peek() {
            let make: fn(Box<Expr>, Box<Expr>) -> Expr = match op {
                Token::And => Expr::And,
                Token::Or => Expr::Or,
                _ => break,
            };
            self.next();
            let right = self.parse_term()?;
            left = make(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, FilterError> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let prim = Primitive::from_ident(&name).ok_or_else(|| {
                    FilterError::Syntax(format!("unknown function `{name}`"))
                })?;
                self.expect(Token::LParen)?;
                let args = self.parse_args()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Call { prim, args })
            }
            Some(tok) => Err(FilterError::Syntax(format!(
                "expected a primitive call, found {}",
                tok.describe()
            ))),
            None => Err(FilterError::Syntax(
                "expected a primitive call, found end of input".into(),
            )),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, FilterError> {
        let mut args = Vec::new();

        if matches!(self.peek(), Some(Token::RParen)) {
            return Ok(args);
        }

        loop {
            match self.next() {
                Some(Token::Int(v)) => args.push(Arg::Int(v)),
                Some(Token::Text(s)) => args.push(Arg::Text(s)),
                Some(tok) => {
                    return Err(FilterError::Syntax(format!(
                        "expected an argument, found {}",
                        tok.describe()
                    )));
                }
                None => {
                    return Err(FilterError::Syntax(
                        "expected an argument, found end of input".into(),
                    ));
                }
            }

            if matches!(self.peek(), Some(Token::Comma)) {
                self.next();
            } else {
                break;
            }
        }

        Ok(args)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
