use crate::ast::{Command, CostumeDecl, Position, Script, Target};
use crate::entity::STAGE_NAME;
use crate::lexer::{Token, TokenType};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub pos: Position,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.pos.line, self.pos.column)
    }
}

impl Error for ParseError {}

/// Parses `sprite NAME ... end` / `stage ... end` sections of commands.
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn parse_script(&mut self) -> Result<Script, ParseError> {
        let mut targets = Vec::new();
        self.skip_newlines();
        while !self.at_end() {
            let pos = self.current().pos;
            if self.match_keyword("sprite") {
                let name = self.parse_name_token()?;
                targets.push(self.parse_target_body(name, false, pos)?);
            } else if self.match_keyword("stage") {
                if self.check_type(TokenType::Ident) || self.check_type(TokenType::String) {
                    return self.error_here(format!("The stage is always named '{}'.", STAGE_NAME));
                }
                targets.push(self.parse_target_body(STAGE_NAME.to_string(), true, pos)?);
            } else {
                return self.error_here("Expected 'sprite' or 'stage'.");
            }
            self.skip_newlines();
        }
        Ok(Script { targets })
    }

    fn parse_target_body(&mut self, name: String, is_stage: bool, pos: Position) -> Result<Target, ParseError> {
        let mut target = Target {
            pos,
            name,
            is_stage,
            costumes: Vec::new(),
            commands: Vec::new(),
        };
        loop {
            self.skip_newlines();
            if self.at_end() {
                return self.error_here(format!(
                    "Unterminated target block for '{}'. Expected 'end'.",
                    target.name
                ));
            }
            if self.match_keyword("end") {
                break;
            }
            if self.match_keyword("costume") {
                let prev = self.previous().pos;
                let path = self.consume_type(TokenType::String, "Expected costume path string.")?;
                target.costumes.push(CostumeDecl {
                    pos: prev,
                    path: path.value,
                });
                continue;
            }
            target.commands.push(self.parse_command(true)?);
        }
        Ok(target)
    }

    fn parse_command(&mut self, allow_event: bool) -> Result<Command, ParseError> {
        let pos = self.current().pos;
        if self.match_keyword("move") {
            let steps = self.parse_number()?;
            self.match_keyword("steps");
            return Ok(Command::Move { pos, steps });
        }
        if self.match_keyword("turn") {
            self.consume_keyword("right", "Expected 'right' after 'turn'.")?;
            let degrees = self.parse_number()?;
            self.match_keyword("degrees");
            return Ok(Command::TurnRight { pos, degrees });
        }
        if self.match_keyword("say") {
            let message = if self.check_type(TokenType::String) {
                self.advance().value
            } else {
                crate::block::format_num(self.parse_number()?)
            };
            return Ok(Command::Say { pos, message });
        }
        if self.match_keyword("show") {
            return Ok(Command::Show { pos });
        }
        if self.match_keyword("when") {
            if !allow_event {
                return Err(ParseError {
                    message: "Event scripts cannot be nested.".to_string(),
                    pos,
                });
            }
            self.consume_keyword("flag", "Expected 'flag' after 'when'.")?;
            self.consume_keyword("clicked", "Expected 'clicked' after 'when flag'.")?;
            let mut body = Vec::new();
            loop {
                self.skip_newlines();
                if self.at_end() {
                    return Err(ParseError {
                        message: "Unterminated 'when flag clicked' script. Expected 'end'.".to_string(),
                        pos,
                    });
                }
                if self.match_keyword("end") {
                    break;
                }
                body.push(self.parse_command(false)?);
            }
            return Ok(Command::WhenFlagClicked { pos, body });
        }
        self.error_here("Expected 'move', 'turn right', 'say', 'show', 'when flag clicked', 'costume', or 'end'.")
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        let negative = self.check_type(TokenType::Minus);
        if negative {
            self.advance();
        }
        let token = self.consume_type(TokenType::Number, "Expected a number.")?;
        let value = token.value.parse::<f64>().map_err(|_| ParseError {
            message: format!("Invalid number '{}'.", token.value),
            pos: token.pos,
        })?;
        Ok(if negative { -value } else { value })
    }

    fn parse_name_token(&mut self) -> Result<String, ParseError> {
        let token = self.current().clone();
        if token.typ == TokenType::Ident || token.typ == TokenType::String {
            self.advance();
            return Ok(token.value);
        }
        self.error_here("Expected name.")
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        let token = self.current();
        token.typ == TokenType::Keyword && token.value == keyword
    }

    fn consume_keyword(&mut self, keyword: &str, message: &str) -> Result<Token, ParseError> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            self.error_here(message)
        }
    }

    fn consume_type(&mut self, typ: TokenType, message: &str) -> Result<Token, ParseError> {
        if self.check_type(typ) {
            Ok(self.advance())
        } else {
            self.error_here(message)
        }
    }

    fn match_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            return true;
        }
        false
    }

    fn check_type(&self, typ: TokenType) -> bool {
        self.current().typ == typ
    }

    fn skip_newlines(&mut self) {
        while self.check_type(TokenType::Newline) {
            self.advance();
        }
    }

    fn at_end(&self) -> bool {
        self.current().typ == TokenType::Eof
    }

    fn current(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.index - 1]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn error_here<T: Into<String>, R>(&self, message: T) -> Result<R, ParseError> {
        Err(ParseError {
            message: message.into(),
            pos: self.current().pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Script, ParseError> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_script()
    }

    #[test]
    fn parses_sprite_commands_in_order() {
        let script = parse(
            "sprite Cat\n  move 100 steps\n  turn right 15 degrees\n  say \"Hello!\"\n  show\nend\n",
        )
        .unwrap();
        assert_eq!(script.targets.len(), 1);
        let cat = &script.targets[0];
        assert_eq!(cat.name, "Cat");
        assert!(!cat.is_stage);
        assert!(matches!(cat.commands[0], Command::Move { steps, .. } if steps == 100.0));
        assert!(matches!(cat.commands[1], Command::TurnRight { degrees, .. } if degrees == 15.0));
        assert!(matches!(&cat.commands[2], Command::Say { message, .. } if message == "Hello!"));
        assert!(matches!(cat.commands[3], Command::Show { .. }));
    }

    #[test]
    fn parses_event_script_body() {
        let script = parse(
            "stage\n  when flag clicked\n    move -10\n    say 3.5\n  end\nend\nsprite \"Big Cat\"\n  costume \"cat.svg\"\nend",
        )
        .unwrap();
        let stage = &script.targets[0];
        assert!(stage.is_stage);
        assert_eq!(stage.name, "Stage");
        let Command::WhenFlagClicked { body, .. } = &stage.commands[0] else {
            panic!("expected event script");
        };
        assert_eq!(body.len(), 2);
        assert!(matches!(body[0], Command::Move { steps, .. } if steps == -10.0));
        assert!(matches!(&body[1], Command::Say { message, .. } if message == "3.5"));
        assert_eq!(script.targets[1].name, "Big Cat");
        assert_eq!(script.targets[1].costumes[0].path, "cat.svg");
    }

    #[test]
    fn nested_event_scripts_are_rejected() {
        let err = parse("sprite A\n when flag clicked\n  when flag clicked\n  end\n end\nend").unwrap_err();
        assert!(err.message.contains("cannot be nested"));
        assert_eq!(err.pos.line, 3);
    }

    #[test]
    fn missing_end_is_reported() {
        let err = parse("sprite A\n  show\n").unwrap_err();
        assert!(err.message.contains("Expected 'end'"));
    }

    #[test]
    fn commands_outside_a_target_are_rejected() {
        let err = parse("move 10").unwrap_err();
        assert_eq!(err.pos, Position::new(1, 1));
    }

    #[test]
    fn stage_names_are_rejected() {
        let err = parse("stage \"Backdrop\"\nend").unwrap_err();
        assert!(err.message.contains("always named 'Stage'"));
        assert_eq!(err.pos, Position::new(1, 7));
    }

    #[test]
    fn documented_example_parses() {
        let source = r#"sprite "Cat"
  costume "cat.svg"
  move 100 steps
  turn right 15 degrees
  say "Hello!"
  show
  when flag clicked
    move 10
  end
end
stage
  when flag clicked
  end
end
"#;
        let script = parse(source).unwrap();
        assert_eq!(script.targets.len(), 2);
        let cat = &script.targets[0];
        assert_eq!(cat.costumes.len(), 1);
        assert_eq!(cat.commands.len(), 5);
        assert!(matches!(&cat.commands[4], Command::WhenFlagClicked { body, .. } if body.len() == 1));
        let stage = &script.targets[1];
        assert!(stage.is_stage);
        assert!(matches!(&stage.commands[0], Command::WhenFlagClicked { body, .. } if body.is_empty()));
    }

    #[test]
    fn empty_source_has_no_targets() {
        assert!(parse("# nothing here\n").unwrap().targets.is_empty());
    }
}
