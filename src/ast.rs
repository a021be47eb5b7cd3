#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move {
        pos: Position,
        steps: f64,
    },
    TurnRight {
        pos: Position,
        degrees: f64,
    },
    Say {
        pos: Position,
        message: String,
    },
    Show {
        pos: Position,
    },
    WhenFlagClicked {
        pos: Position,
        body: Vec<Command>,
    },
}

impl Command {
    pub fn pos(&self) -> Position {
        match self {
            Command::Move { pos, .. }
            | Command::TurnRight { pos, .. }
            | Command::Say { pos, .. }
            | Command::Show { pos }
            | Command::WhenFlagClicked { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostumeDecl {
    pub pos: Position,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub pos: Position,
    pub name: String,
    pub is_stage: bool,
    pub costumes: Vec<CostumeDecl>,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub targets: Vec<Target>,
}
