//! Single-pass template scanner
//!
//! The scanner walks the static parts character by character, tracking a
//! small mode machine plus quote state, and appends instructions to the
//! block on top of an explicit stack. Interpolation sites between parts are
//! committed as field operands according to the mode they land in.
//!
//! It accepts anything: a stray closing tag at the top level is ignored,
//! and tags still open at the end of input are closed implicitly.

use std::mem;

use crate::compiler::{Block, BlockId, CompiledTemplate, Op, Operand, ROOT_BLOCK};
use crate::utils::trim_newline_whitespace;
use crate::value::Value;

/// Scanner state; the order matters (`< PropSet` means "not in a value")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Mode {
    /// After a `/`: ignore everything until `>`
    Slash,
    Text,
    /// After a tag name or a prop
    Whitespace,
    TagName,
    Comment,
    PropSet,
    PropAppend,
}

pub struct Parser<'a> {
    parts: &'a [&'a str],
    mode: Mode,
    buffer: String,
    quote: Option<char>,
    prop_name: String,
    blocks: Vec<Block>,
    stack: Vec<BlockId>,
}

impl<'a> Parser<'a> {
    pub fn new(parts: &'a [&'a str]) -> Self {
        Self {
            parts,
            mode: Mode::Text,
            buffer: String::new(),
            quote: None,
            prop_name: String::new(),
            blocks: vec![Block::default()],
            stack: vec![ROOT_BLOCK],
        }
    }

    pub fn parse_template(mut self) -> CompiledTemplate {
        let parts = self.parts;

        for (index, part) in parts.iter().enumerate() {
            if index > 0 {
                if self.mode == Mode::Text {
                    self.commit(None);
                }
                self.commit(Some(index - 1));
            }

            let mut chars = part.chars().peekable();
            while let Some(ch) = chars.next() {
                let next = chars.peek().copied();
                self.step(ch, next);
            }
        }

        self.commit(None);
        while self.stack.len() > 1 {
            self.close_current();
        }

        CompiledTemplate::new(self.blocks, parts.len().saturating_sub(1))
    }

    fn step(&mut self, ch: char, next: Option<char>) {
        match self.mode {
            Mode::Text => {
                if ch == '<' {
                    self.commit(None);
                    self.open_block();
                    self.mode = Mode::TagName;
                } else {
                    self.buffer.push(ch);
                }
            }
            Mode::Comment => {
                // Two characters of lookback, most recent first.
                if self.buffer == "--" && ch == '>' {
                    self.mode = Mode::Text;
                    self.buffer.clear();
                } else {
                    let previous = self.buffer.chars().next();
                    self.buffer.clear();
                    self.buffer.push(ch);
                    self.buffer.extend(previous);
                }
            }
            _ if self.quote.is_some() => {
                if self.quote == Some(ch) {
                    self.quote = None;
                } else {
                    self.buffer.push(ch);
                }
            }
            _ if ch == '"' || ch == '\'' => self.quote = Some(ch),
            _ if ch == '>' => {
                self.commit(None);
                self.mode = Mode::Text;
            }
            Mode::Slash => {}
            _ if ch == '=' => {
                self.mode = Mode::PropSet;
                self.prop_name = mem::take(&mut self.buffer);
            }
            _ if ch == '/' && (self.mode < Mode::PropSet || next == Some('>')) => {
                self.commit(None);
                if self.mode == Mode::TagName {
                    // `</tag>` and `<//>` never named the block opened at `<`
                    self.discard_current();
                }
                self.close_current();
                self.mode = Mode::Slash;
            }
            _ if matches!(ch, ' ' | '\t' | '\n' | '\r') => {
                self.commit(None);
                self.mode = Mode::Whitespace;
            }
            _ => self.buffer.push(ch),
        }

        if self.mode == Mode::TagName && self.buffer == "!--" {
            self.mode = Mode::Comment;
            self.discard_current();
        }
    }

    fn commit(&mut self, field: Option<usize>) {
        let buffer = mem::take(&mut self.buffer);

        match self.mode {
            Mode::Text => match field {
                Some(field) => self.push(Op::AppendChild(Operand::Field(field))),
                None => {
                    let text = trim_newline_whitespace(&buffer);
                    if !text.is_empty() {
                        let text = Value::Str(text.to_string());
                        self.push(Op::AppendChild(Operand::Static(text)));
                    }
                }
            },
            Mode::TagName => {
                if field.is_some() || !buffer.is_empty() {
                    let tag = match field {
                        Some(field) => Operand::Field(field),
                        None => Operand::Static(Value::Str(buffer)),
                    };
                    self.push(Op::SetTag(tag));
                    self.mode = Mode::Whitespace;
                }
            }
            Mode::Whitespace => match field {
                Some(field) if buffer == "..." => self.push(Op::SpreadProps(field)),
                None if !buffer.is_empty() => self.push(Op::SetProp {
                    name: buffer,
                    value: Operand::Static(Value::Bool(true)),
                }),
                _ => {}
            },
            Mode::PropSet | Mode::PropAppend => {
                if !buffer.is_empty() || (field.is_none() && self.mode == Mode::PropSet) {
                    let op = self.prop_op(Operand::Static(Value::Str(buffer)));
                    self.push(op);
                    self.mode = Mode::PropAppend;
                }
                if let Some(field) = field {
                    let op = self.prop_op(Operand::Field(field));
                    self.push(op);
                    self.mode = Mode::PropAppend;
                }
            }
            Mode::Slash | Mode::Comment => {}
        }
    }

    fn prop_op(&self, value: Operand) -> Op {
        let name = self.prop_name.clone();
        if self.mode == Mode::PropSet {
            Op::SetProp { name, value }
        } else {
            Op::AppendProp { name, value }
        }
    }

    fn current(&self) -> BlockId {
        self.stack.last().copied().unwrap_or(ROOT_BLOCK)
    }

    fn push(&mut self, op: Op) {
        let current = self.current();
        self.blocks[current].ops.push(op);
    }

    fn open_block(&mut self) {
        self.blocks.push(Block::default());
        self.stack.push(self.blocks.len() - 1);
    }

    /// Drop the block on top of the stack without referencing it
    fn discard_current(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(id) = self.stack.pop() {
            if id + 1 == self.blocks.len() && self.blocks[id].is_empty() {
                self.blocks.pop();
            }
        }
    }

    /// Pop the block on top of the stack into its parent
    fn close_current(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(child) = self.stack.pop() {
            self.push(Op::recurse(child));
        }
    }
}
