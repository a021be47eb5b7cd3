use serde_json::{json, Map, Value};
use std::fmt::{Display, Formatter};

/// Scratch's `math_number` shadow kind inside a typed-tuple input.
const VALUE_KIND_NUMBER: u8 = 4;
/// Scratch's `text` shadow kind inside a typed-tuple input.
const VALUE_KIND_TEXT: u8 = 10;
/// Input tuple tag for "shadow only, no obscuring block".
const INPUT_SAME_BLOCK_SHADOW: u8 = 1;

/// Entity-local block identifier. Serialized as its decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u32);

impl BlockId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-disk encoding of operand descriptors. One graph commits to one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `{"name": "100", "block": null, "shadow": null}`
    NamedField,
    /// `[1, [4, "100"]]`, the shape the Scratch 3 VM loads.
    #[default]
    TypedTuple,
}

impl Dialect {
    pub fn label(self) -> &'static str {
        match self {
            Dialect::NamedField => "named-field",
            Dialect::TypedTuple => "typed-tuple",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    /// Literals are always stored as text in the project document.
    pub fn as_text(&self) -> String {
        match self {
            Literal::Number(value) => format_num(*value),
            Literal::Text(value) => value.clone(),
        }
    }

    fn value_kind(&self) -> u8 {
        match self {
            Literal::Number(_) => VALUE_KIND_NUMBER,
            Literal::Text(_) => VALUE_KIND_TEXT,
        }
    }

    pub fn to_input(&self, dialect: Dialect) -> Value {
        match dialect {
            Dialect::NamedField => json!({
                "name": self.as_text(),
                "block": Value::Null,
                "shadow": Value::Null
            }),
            Dialect::TypedTuple => json!([
                INPUT_SAME_BLOCK_SHADOW,
                [self.value_kind(), self.as_text()]
            ]),
        }
    }
}

/// Stack commands. The closed set keeps malformed opcodes out of the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    MoveSteps(f64),
    TurnRight(f64),
    Say(String),
    Show,
}

impl Op {
    pub fn opcode(&self) -> &'static str {
        match self {
            Op::MoveSteps(_) => "motion_movesteps",
            Op::TurnRight(_) => "motion_turnright",
            Op::Say(_) => "looks_say",
            Op::Show => "looks_show",
        }
    }

    pub fn into_inputs(self) -> Vec<(&'static str, Literal)> {
        match self {
            Op::MoveSteps(steps) => vec![("STEPS", Literal::Number(steps))],
            Op::TurnRight(degrees) => vec![("DEGREES", Literal::Number(degrees))],
            Op::Say(message) => vec![("MESSAGE", Literal::Text(message))],
            Op::Show => Vec::new(),
        }
    }
}

/// Event blocks that start a script and own a nested body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hat {
    WhenFlagClicked,
}

impl Hat {
    pub fn opcode(self) -> &'static str {
        match self {
            Hat::WhenFlagClicked => "event_whenflagclicked",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockRecord {
    pub id: BlockId,
    pub opcode: &'static str,
    pub next: Option<BlockId>,
    pub parent: Option<BlockId>,
    pub inputs: Vec<(&'static str, Literal)>,
    /// Workspace coordinates; only set on blocks that start a script.
    pub position: Option<(i32, i32)>,
}

impl BlockRecord {
    pub fn new(id: BlockId, opcode: &'static str, inputs: Vec<(&'static str, Literal)>) -> Self {
        Self {
            id,
            opcode,
            next: None,
            parent: None,
            inputs,
            position: None,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    pub fn literal(&self, slot: &str) -> Option<&Literal> {
        self.inputs
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, literal)| literal)
    }

    pub fn to_json(&self, dialect: Dialect) -> Value {
        let mut inputs = Map::new();
        for (slot, literal) in &self.inputs {
            inputs.insert((*slot).to_string(), literal.to_input(dialect));
        }
        let mut block = json!({
            "opcode": self.opcode,
            "next": self.next.map(|id| id.to_string()),
            "parent": self.parent.map(|id| id.to_string()),
            "inputs": inputs,
            "fields": {},
            "shadow": false,
            "topLevel": self.is_top_level()
        });
        if dialect == Dialect::TypedTuple && self.is_top_level() {
            let (x, y) = self.position.unwrap_or((0, 0));
            if let Value::Object(obj) = &mut block {
                obj.insert("x".to_string(), json!(x));
                obj.insert("y".to_string(), json!(y));
            }
        }
        block
    }
}

/// Whole numbers print without a fraction; magnitudes past `i64` keep every digit.
pub fn format_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        let whole = v.round();
        if whole.abs() < 1e15 {
            format!("{}", whole as i64)
        } else {
            whole.to_string()
        }
    } else {
        let s = format!("{:.6}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
