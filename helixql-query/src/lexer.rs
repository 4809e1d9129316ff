use std::iter::Peekable;
use std::str::Chars;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Keywords, recognized in canonical uppercase form only; any other
    // casing stays an identifier so field names like `Count` survive.
    Query,
    Get,
    Where,
    Limit,
    Return,
    Distinct,
    Node,
    Edge,
    Nodes,
    Edges,
    From,
    To,
    Count,
    Json,
    Next,

    // Symbols
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Colon,
    DoubleColon,
    Comma,
    Star,
    Arrow,    // <-
    FatArrow, // =>

    // Literals
    String(String),
    Integer(i64),

    Identifier(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        tokens.push(Token {
            token_type: TokenType::Eof,
            line: self.line,
            column: self.column,
        });
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        if self.chars.peek().is_none() {
            return Ok(None);
        }

        let start_line = self.line;
        let start_column = self.column;
        let char = match self.advance() {
            Some(c) => c,
            None => return Ok(None),
        };

        // Comments
        if char == '/' {
            if let Some(&'/') = self.chars.peek() {
                self.skip_line_comment();
                return self.next_token();
            }
            if let Some(&'*') = self.chars.peek() {
                self.skip_block_comment(start_line, start_column)?;
                return self.next_token();
            }
            return Err(Error::syntax(
                start_line,
                start_column,
                "unexpected character `/`",
            ));
        }

        // String literals
        if char == '\'' || char == '"' {
            return Ok(Some(self.read_string(char, start_line, start_column)?));
        }

        // Integer literals
        if char.is_ascii_digit() {
            return Ok(Some(self.read_number(char, start_line, start_column)?));
        }

        // Identifiers and keywords
        if char.is_alphabetic() || char == '_' {
            return Ok(Some(self.read_identifier(char, start_line, start_column)));
        }

        let token_type = match char {
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            ',' => TokenType::Comma,
            '*' => TokenType::Star,
            ':' => {
                if let Some(&':') = self.chars.peek() {
                    self.advance();
                    TokenType::DoubleColon
                } else {
                    TokenType::Colon
                }
            }
            '<' => {
                if let Some(&'-') = self.chars.peek() {
                    self.advance();
                    TokenType::Arrow
                } else {
                    return Err(Error::syntax(
                        start_line,
                        start_column,
                        "expected `<-`, found a lone `<`",
                    ));
                }
            }
            '=' => {
                if let Some(&'>') = self.chars.peek() {
                    self.advance();
                    TokenType::FatArrow
                } else {
                    return Err(Error::syntax(
                        start_line,
                        start_column,
                        "expected `=>`, found a lone `=`",
                    ));
                }
            }
            other => {
                return Err(Error::syntax(
                    start_line,
                    start_column,
                    format!("unexpected character `{other}`"),
                ));
            }
        };

        Ok(Some(Token {
            token_type,
            line: start_line,
            column: start_column,
        }))
    }

    fn advance(&mut self) -> Option<char> {
        let char = self.chars.next();
        if let Some(c) = char {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        char
    }

    fn skip_whitespace(&mut self) {
        while let Some(&char) = self.chars.peek() {
            if char.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        self.advance(); // consume second '/'
        while let Some(&char) = self.chars.peek() {
            if char == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self, line: usize, column: usize) -> Result<()> {
        self.advance(); // consume '*'
        while let Some(char) = self.advance() {
            if char == '*'
                && let Some(&'/') = self.chars.peek()
            {
                self.advance();
                return Ok(());
            }
        }
        Err(Error::syntax(line, column, "unterminated block comment"))
    }

    fn read_string(&mut self, quote: char, line: usize, column: usize) -> Result<Token> {
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
                None => {
                    return Err(Error::syntax(line, column, "unterminated string literal"));
                }
            }
        }
        Ok(Token {
            token_type: TokenType::String(value),
            line,
            column,
        })
    }

    fn read_number(&mut self, first: char, line: usize, column: usize) -> Result<Token> {
        let mut value = String::new();
        value.push(first);
        while let Some(&char) = self.chars.peek() {
            if char.is_ascii_digit() {
                value.push(char);
                self.advance();
            } else {
                break;
            }
        }
        let number = value
            .parse::<i64>()
            .map_err(|_| Error::syntax(line, column, format!("invalid integer: {value}")))?;
        Ok(Token {
            token_type: TokenType::Integer(number),
            line,
            column,
        })
    }

    fn read_identifier(&mut self, first: char, line: usize, column: usize) -> Token {
        let mut value = String::new();
        value.push(first);
        while let Some(&char) = self.chars.peek() {
            if char.is_alphanumeric() || char == '_' {
                value.push(char);
                self.advance();
            } else {
                break;
            }
        }

        let token_type = match value.as_str() {
            "QUERY" => TokenType::Query,
            "GET" => TokenType::Get,
            "WHERE" => TokenType::Where,
            "LIMIT" => TokenType::Limit,
            "RETURN" => TokenType::Return,
            "DISTINCT" => TokenType::Distinct,
            "NODE" => TokenType::Node,
            "EDGE" => TokenType::Edge,
            "NODES" => TokenType::Nodes,
            "EDGES" => TokenType::Edges,
            "FROM" => TokenType::From,
            "TO" => TokenType::To,
            "COUNT" => TokenType::Count,
            "JSON" => TokenType::Json,
            "NEXT" => TokenType::Next,
            _ => TokenType::Identifier(value),
        };

        Token {
            token_type,
            line,
            column,
        }
    }
}
