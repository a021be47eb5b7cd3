use crate::ast::Position;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    Keyword,
    Ident,
    Number,
    String,
    Minus,
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub typ: TokenType,
    pub value: String,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct LexerError {
    pub message: String,
    pub pos: Position,
}

impl Display for LexerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (line {}, column {})",
            self.message, self.pos.line, self.pos.column
        )
    }
}

impl Error for LexerError {}

pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    keywords: HashSet<&'static str>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            keywords: keyword_set(),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        while !self.at_end() {
            let ch = self.peek();
            if ch == '\u{feff}' || ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
                continue;
            }
            let pos = self.pos();
            if ch == '\n' {
                self.advance();
                tokens.push(Token {
                    typ: TokenType::Newline,
                    value: "\n".to_string(),
                    pos,
                });
                continue;
            }
            if ch == '#' {
                self.skip_comment();
                continue;
            }
            if ch == '"' {
                tokens.push(self.read_string()?);
                continue;
            }
            if ch.is_ascii_digit() || (ch == '.' && self.peek_next().is_ascii_digit()) {
                tokens.push(self.read_number());
                continue;
            }
            if ch.is_alphabetic() || ch == '_' {
                tokens.push(self.read_identifier());
                continue;
            }
            if ch == '-' {
                self.advance();
                tokens.push(Token {
                    typ: TokenType::Minus,
                    value: "-".to_string(),
                    pos,
                });
                continue;
            }
            return Err(LexerError {
                message: format!("Unexpected character {:?}", ch),
                pos,
            });
        }
        tokens.push(Token {
            typ: TokenType::Eof,
            value: String::new(),
            pos: self.pos(),
        });
        Ok(tokens)
    }

    fn read_identifier(&mut self) -> Token {
        let pos = self.pos();
        let mut text = String::new();
        while !self.at_end() {
            let ch = self.peek();
            if ch.is_alphanumeric() || ch == '_' {
                text.push(self.advance());
            } else {
                break;
            }
        }
        let lowered = text.to_lowercase();
        if self.keywords.contains(lowered.as_str()) {
            Token {
                typ: TokenType::Keyword,
                value: lowered,
                pos,
            }
        } else {
            Token {
                typ: TokenType::Ident,
                value: text,
                pos,
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let pos = self.pos();
        let mut text = String::new();
        let mut seen_dot = false;
        while !self.at_end() {
            let ch = self.peek();
            if ch.is_ascii_digit() {
                text.push(self.advance());
                continue;
            }
            if ch == '.' && !seen_dot {
                seen_dot = true;
                text.push(self.advance());
                continue;
            }
            break;
        }
        Token {
            typ: TokenType::Number,
            value: text,
            pos,
        }
    }

    fn read_string(&mut self) -> Result<Token, LexerError> {
        let pos = self.pos();
        self.advance();
        let mut out = String::new();
        while !self.at_end() {
            let ch = self.advance();
            if ch == '"' {
                return Ok(Token {
                    typ: TokenType::String,
                    value: out,
                    pos,
                });
            }
            if ch == '\\' {
                if self.at_end() {
                    break;
                }
                let esc = self.advance();
                out.push(match esc {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                continue;
            }
            if ch == '\n' {
                break;
            }
            out.push(ch);
        }
        Err(LexerError {
            message: "Unterminated string literal".to_string(),
            pos,
        })
    }

    fn skip_comment(&mut self) {
        while !self.at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars.get(self.index).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.index + 1).copied().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.index];
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

fn keyword_set() -> HashSet<&'static str> {
    [
        "clicked", "costume", "degrees", "end", "flag", "move", "right", "say", "show", "sprite",
        "stage", "steps", "turn", "when",
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.typ)
            .collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let tokens = Lexer::new("MOVE 10 Steps").tokenize().unwrap();
        assert_eq!(tokens[0].typ, TokenType::Keyword);
        assert_eq!(tokens[0].value, "move");
        assert_eq!(tokens[1].value, "10");
        assert_eq!(tokens[2].value, "steps");
    }

    #[test]
    fn comments_and_blank_space_are_skipped() {
        assert_eq!(
            types("show # greet\n\n"),
            vec![
                TokenType::Keyword,
                TokenType::Newline,
                TokenType::Newline,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn strings_keep_unicode_and_escapes() {
        let tokens = Lexer::new(r#"say "Привет \"you\"""#).tokenize().unwrap();
        assert_eq!(tokens[1].typ, TokenType::String);
        assert_eq!(tokens[1].value, "Привет \"you\"");
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = Lexer::new("say \"oops\nshow").tokenize().unwrap_err();
        assert_eq!(err.pos, Position::new(1, 5));
        assert!(err.to_string().contains("line 1, column 5"));
    }

    #[test]
    fn negative_numbers_lex_as_minus_then_number() {
        assert_eq!(
            types("-2.5"),
            vec![TokenType::Minus, TokenType::Number, TokenType::Eof]
        );
    }
}
