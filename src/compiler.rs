//! Compiled templates
//!
//! A [`CompiledTemplate`] is an arena of instruction [`Block`]s. Block 0 is
//! the template root; every other block describes one element and is
//! referenced from its parent by an [`Op::Recurse`]. Compiled templates are
//! immutable except for the fold cell of each `Recurse` op, which the
//! evaluator fills at most once with the element built for a fully static
//! subtree.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::parser::Parser;
use crate::value::Value;

/// Index of a block within its template
pub type BlockId = usize;

/// The root block of every template
pub const ROOT_BLOCK: BlockId = 0;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Where an operation takes its value from
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Baked in at compile time
    Static(Value),
    /// Index into the interpolated values
    Field(usize),
}

impl Operand {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Operand::Field(_))
    }
}

/// One instruction
#[derive(Debug)]
pub enum Op {
    SetTag(Operand),
    /// Shallow-merge the field's map into the props
    SpreadProps(usize),
    SetProp { name: String, value: Operand },
    /// Concatenate onto the string form of an existing prop
    AppendProp { name: String, value: Operand },
    AppendChild(Operand),
    /// Build the child element described by `block`
    Recurse {
        block: BlockId,
        folded: OnceLock<Value>,
    },
}

impl Op {
    pub(crate) fn recurse(block: BlockId) -> Self {
        Op::Recurse {
            block,
            folded: OnceLock::new(),
        }
    }
}

/// The instructions of one element (or of the template root)
#[derive(Debug, Default)]
pub struct Block {
    pub(crate) ops: Vec<Op>,
}

impl Block {
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Debug)]
pub struct CompiledTemplate {
    serial: u64,
    blocks: Vec<Block>,
    field_count: usize,
}

impl CompiledTemplate {
    pub(crate) fn new(blocks: Vec<Block>, field_count: usize) -> Self {
        Self {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            blocks,
            field_count,
        }
    }

    /// Process-unique number of this compilation
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn root(&self) -> Option<&Block> {
        self.block(ROOT_BLOCK)
    }

    /// Number of interpolation sites the template was compiled for
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// Number of subtrees whose element has been folded
    pub fn folded_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|block| block.ops.iter())
            .filter(|op| matches!(op, Op::Recurse { folded, .. } if folded.get().is_some()))
            .count()
    }
}

pub struct Compiler;

impl Compiler {
    /// Compile the static parts of a template
    ///
    /// Never fails: the scanner is permissive, and names are only validated
    /// when the result is rendered.
    #[tracing::instrument(level = "debug", skip_all, fields(parts = parts.len()))]
    pub fn compile(parts: &[&str]) -> Arc<CompiledTemplate> {
        let template = Parser::new(parts).parse_template();
        tracing::debug!(
            serial = template.serial(),
            blocks = template.blocks().len(),
            "compiled template"
        );
        Arc::new(template)
    }
}
