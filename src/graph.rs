use crate::block::{BlockId, BlockRecord, Dialect, Hat, Op};
use crate::error::{CompileError, CompileResult};
use std::collections::BTreeMap;

/// Vertical gap between consecutive scripts on the workspace.
const SCRIPT_SPACING_Y: i32 = 80;

/// How consecutive top-level commands relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainPolicy {
    /// Every top-level command is its own script.
    #[default]
    Independent,
    /// Each top-level command is appended to the end of the most recent script,
    /// so commands run in emission order.
    Sequential,
}

/// A command sequence waiting to be spliced under an event block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptBody {
    ops: Vec<Op>,
}

impl ScriptBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }

    pub fn move_steps(self, steps: f64) -> Self {
        self.push(Op::MoveSteps(steps))
    }

    pub fn turn_right(self, degrees: f64) -> Self {
        self.push(Op::TurnRight(degrees))
    }

    pub fn say(self, message: impl Into<String>) -> Self {
        self.push(Op::Say(message.into()))
    }

    pub fn show(self) -> Self {
        self.push(Op::Show)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl FromIterator<Op> for ScriptBody {
    fn from_iter<I: IntoIterator<Item = Op>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

/// Blocks of one sprite or the stage, plus the id counter they are drawn from.
#[derive(Debug, Clone)]
pub struct EntityGraph {
    dialect: Dialect,
    chain: ChainPolicy,
    id_counter: u32,
    blocks: BTreeMap<BlockId, BlockRecord>,
    tail: Option<BlockId>,
    layout_y: i32,
}

impl EntityGraph {
    pub fn new(dialect: Dialect, chain: ChainPolicy) -> Self {
        Self {
            dialect,
            chain,
            id_counter: 0,
            blocks: BTreeMap::new(),
            tail: None,
            layout_y: 0,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn chain_policy(&self) -> ChainPolicy {
        self.chain
    }

    pub fn allocate_id(&mut self) -> BlockId {
        self.id_counter += 1;
        BlockId::new(self.id_counter)
    }

    pub fn emit(&mut self, op: Op) -> BlockId {
        let id = self.allocate_id();
        let mut record = BlockRecord::new(id, op.opcode(), op.into_inputs());
        match (self.chain, self.tail) {
            (ChainPolicy::Sequential, Some(prev)) => {
                record.parent = Some(prev);
                self.link_next(prev, id);
            }
            _ => record.position = Some(self.next_position()),
        }
        tracing::debug!(block = %id, opcode = record.opcode, top_level = record.is_top_level(), "emitted block");
        self.blocks.insert(id, record);
        self.tail = Some(id);
        id
    }

    /// Emits an event block and splices `body` under it as a single stack.
    /// Body ids come from this graph's counter, so they never collide with
    /// blocks already present.
    pub fn emit_with_body(&mut self, hat: Hat, body: ScriptBody) -> BlockId {
        let hat_id = self.allocate_id();
        let mut hat_record = BlockRecord::new(hat_id, hat.opcode(), Vec::new());
        hat_record.position = Some(self.next_position());
        self.blocks.insert(hat_id, hat_record);

        let body_len = body.len();
        let mut prev = hat_id;
        for op in body.ops {
            let id = self.allocate_id();
            let mut record = BlockRecord::new(id, op.opcode(), op.into_inputs());
            record.parent = Some(prev);
            self.blocks.insert(id, record);
            self.link_next(prev, id);
            prev = id;
        }
        tracing::debug!(hat = %hat_id, opcode = hat.opcode(), body_len, "spliced script body");
        self.tail = Some(prev);
        hat_id
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockRecord> {
        self.blocks.get(&id)
    }

    /// Records in ascending id order.
    pub fn blocks(&self) -> impl Iterator<Item = &BlockRecord> {
        self.blocks.values()
    }

    pub fn top_level(&self) -> impl Iterator<Item = &BlockRecord> {
        self.blocks.values().filter(|record| record.is_top_level())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Walks the stack starting at `start`, following `next` links.
    pub fn chain_from(&self, start: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            let Some(record) = self.blocks.get(&id) else {
                break;
            };
            out.push(id);
            cursor = record.next;
            if out.len() > self.blocks.len() {
                break;
            }
        }
        out
    }

    /// Checks that every `next`/`parent` link resolves and that links agree
    /// with each other. Construction guarantees this; tests assert it.
    pub fn validate(&self) -> CompileResult<()> {
        for record in self.blocks.values() {
            if let Some(next) = record.next {
                let target = self.blocks.get(&next).ok_or(CompileError::DanglingReference {
                    block: record.id,
                    link: "next",
                    target: next,
                })?;
                if target.parent != Some(record.id) {
                    return Err(CompileError::DanglingReference {
                        block: next,
                        link: "parent",
                        target: record.id,
                    });
                }
            }
            if let Some(parent) = record.parent {
                if !self.blocks.contains_key(&parent) {
                    return Err(CompileError::DanglingReference {
                        block: record.id,
                        link: "parent",
                        target: parent,
                    });
                }
            }
        }
        Ok(())
    }

    fn link_next(&mut self, from: BlockId, to: BlockId) {
        if let Some(record) = self.blocks.get_mut(&from) {
            record.next = Some(to);
        }
    }

    fn next_position(&mut self) -> (i32, i32) {
        let y = self.layout_y;
        self.layout_y += SCRIPT_SPACING_Y;
        (0, y)
    }
}
