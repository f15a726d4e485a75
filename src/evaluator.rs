//! Template evaluation
//!
//! Replays a [`CompiledTemplate`] against the interpolated values of one
//! call. Every element is handed to an [`ElementFactory`] together with a
//! [`NodeContext`] describing whether the element depends on interpolated
//! values:
//!
//! - bit 0 ([`DYNAMIC_SELF`]): its tag or props came from a field
//! - bit 1 ([`DYNAMIC_CHILDREN`]): a child or descendant did
//!
//! When both bits are clear after the factory returns, the result is stored
//! in the template's fold cell for that element and reused by every later
//! evaluation instead of calling the factory again.

use crate::compiler::{BlockId, CompiledTemplate, Op, Operand, ROOT_BLOCK};
use crate::types::Props;
use crate::value::Value;

/// The element's own tag or props are dynamic
pub const DYNAMIC_SELF: u8 = 1;

/// Some child or descendant of the element is dynamic
pub const DYNAMIC_CHILDREN: u8 = 2;

/// Identity of an element position within a compiled template
///
/// Stable across evaluations of the same compiled template, distinct
/// between positions and between templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub template: u64,
    pub block: BlockId,
}

/// What a factory knows about the element it is building
#[derive(Debug)]
pub struct NodeContext {
    key: NodeKey,
    flags: u8,
}

impl NodeContext {
    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn is_static(&self) -> bool {
        self.flags == 0
    }

    pub fn has_dynamic_self(&self) -> bool {
        self.flags & DYNAMIC_SELF != 0
    }

    pub fn has_dynamic_children(&self) -> bool {
        self.flags & DYNAMIC_CHILDREN != 0
    }

    /// Treat the element as static, so its result gets folded
    pub fn mark_static(&mut self) {
        self.flags &= !(DYNAMIC_SELF | DYNAMIC_CHILDREN);
    }

    /// Treat the element as dynamic, so it is rebuilt on every evaluation
    pub fn mark_dynamic(&mut self) {
        self.flags |= DYNAMIC_SELF;
    }
}

/// Builds the value for one element
///
/// Results for static elements are cached indefinitely, so a factory must
/// return equivalent values for equivalent input.
pub trait ElementFactory: Send + Sync {
    fn create(
        &self,
        node: &mut NodeContext,
        tag: Value,
        props: Option<Props>,
        children: Vec<Value>,
    ) -> Value;
}

impl<F> ElementFactory for F
where
    F: Fn(&mut NodeContext, Value, Option<Props>, Vec<Value>) -> Value + Send + Sync,
{
    fn create(
        &self,
        node: &mut NodeContext,
        tag: Value,
        props: Option<Props>,
        children: Vec<Value>,
    ) -> Value {
        self(node, tag, props, children)
    }
}

struct Accumulator {
    tag: Value,
    props: Option<Props>,
    children: Vec<Value>,
}

impl Accumulator {
    fn root() -> Self {
        Self {
            tag: Value::Undefined,
            props: None,
            children: Vec::new(),
        }
    }

    fn element() -> Self {
        Self {
            tag: Value::Str(String::new()),
            props: None,
            children: Vec::new(),
        }
    }
}

pub struct Evaluator<'a> {
    template: &'a CompiledTemplate,
    factory: &'a dyn ElementFactory,
    fold_static_subtrees: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new(template: &'a CompiledTemplate, factory: &'a dyn ElementFactory) -> Self {
        Self {
            template,
            factory,
            fold_static_subtrees: true,
        }
    }

    pub fn with_static_folding(mut self, enabled: bool) -> Self {
        self.fold_static_subtrees = enabled;
        self
    }

    /// Evaluate the template
    ///
    /// Returns `Undefined` for an empty template, the single root value when
    /// there is exactly one, and a `List` of root values otherwise.
    pub fn evaluate(&self, fields: &[Value]) -> Value {
        let mut root = Accumulator::root();
        self.evaluate_block(ROOT_BLOCK, fields, &mut root);

        let mut results = root.children;
        match results.len() {
            0 => Value::Undefined,
            1 => results.pop().unwrap_or_default(),
            _ => Value::List(results),
        }
    }

    fn evaluate_block(&self, id: BlockId, fields: &[Value], acc: &mut Accumulator) -> u8 {
        let Some(block) = self.template.block(id) else {
            return 0;
        };

        let mut flags = 0;
        for op in block.ops() {
            match op {
                Op::SetTag(operand) => {
                    acc.tag = resolve(operand, fields, DYNAMIC_SELF, &mut flags);
                }
                Op::SpreadProps(field) => {
                    flags |= DYNAMIC_SELF;
                    let props = acc.props.get_or_insert_with(Props::new);
                    spread(props, field_value(fields, *field));
                }
                Op::SetProp { name, value } => {
                    let value = resolve(value, fields, DYNAMIC_SELF, &mut flags);
                    acc.props
                        .get_or_insert_with(Props::new)
                        .insert(name.clone(), value);
                }
                Op::AppendProp { name, value } => {
                    let value = resolve(value, fields, DYNAMIC_SELF, &mut flags);
                    let slot = acc
                        .props
                        .get_or_insert_with(Props::new)
                        .entry(name.clone())
                        .or_insert(Value::Undefined);
                    let mut joined = slot.to_js_string();
                    joined.push_str(&value.to_js_string());
                    *slot = Value::Str(joined);
                }
                Op::AppendChild(operand) => {
                    let value = resolve(operand, fields, DYNAMIC_CHILDREN, &mut flags);
                    acc.children.push(value);
                }
                Op::Recurse { block, folded } => {
                    if let Some(value) = folded.get() {
                        acc.children.push(value.clone());
                        continue;
                    }

                    let mut child = Accumulator::element();
                    let child_flags = self.evaluate_block(*block, fields, &mut child);

                    let mut node = NodeContext {
                        key: NodeKey {
                            template: self.template.serial(),
                            block: *block,
                        },
                        flags: child_flags,
                    };
                    let value = self
                        .factory
                        .create(&mut node, child.tag, child.props, child.children);

                    if !node.is_static() {
                        flags |= DYNAMIC_CHILDREN;
                    } else if self.fold_static_subtrees && folded.set(value.clone()).is_ok() {
                        tracing::trace!(
                            template = self.template.serial(),
                            block = *block,
                            "folded static subtree"
                        );
                    }
                    acc.children.push(value);
                }
            }
        }

        flags
    }
}

fn field_value(fields: &[Value], index: usize) -> Value {
    fields.get(index).cloned().unwrap_or_default()
}

fn resolve(operand: &Operand, fields: &[Value], bit: u8, flags: &mut u8) -> Value {
    match operand {
        Operand::Static(value) => value.clone(),
        Operand::Field(index) => {
            *flags |= bit;
            field_value(fields, *index)
        }
    }
}

fn spread(props: &mut Props, value: Value) {
    match value {
        Value::Object(map) => props.extend(map),
        Value::Undefined | Value::Null => {}
        other => tracing::debug!(value_type = other.type_name(), "ignored spread of a non-map value"),
    }
}

/// Evaluate with folding enabled
pub fn evaluate(template: &CompiledTemplate, factory: &dyn ElementFactory, fields: &[Value]) -> Value {
    Evaluator::new(template, factory).evaluate(fields)
}
