//! Node shapes for the Sea-of-Nodes IR this crate's analyses operate over.
//!
//! This is a tagged variant with payloads rather than the opcode-tag +
//! `is_X`/`get_X_*` accessor pattern the reference IR uses (see §9 "Sum
//! types for node shape"); the oracle's rule ladder becomes a single match
//! cascade over this enum instead of a chain of `is_Add`/`get_Add_left`
//! calls. Shaped after `cranelift_codegen::egraph::Node`, which is the
//! closest real-world analogue in this corpus of a node enum carrying
//! operands by id rather than by pointer.

use crate::ir::entity::EntityId;
use crate::ir::mode::Mode;
use crate::ir::ty::TypeId;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    MayAlias,
    Other,
}

#[derive(Debug, Clone)]
pub enum Node {
    /// The per-graph stack frame. Out-neighbours of kind `Member` select
    /// frame entities (§4.D).
    Frame,
    /// A formal-parameter projection, numbered from zero. The static-link
    /// argument, when present, is argument 0 (§4.D per-graph pass).
    Arg(u32),
    Const(i128),
    /// The symbolic address of a named entity (`is_Address` in the source
    /// IR).
    Address(EntityId),
    Add { left: NodeId, right: NodeId },
    Sub { left: NodeId, right: NodeId },
    /// Field projection; remembers the selected field entity.
    Member { base: NodeId, entity: EntityId },
    /// Array-index projection; the selector conveys no entity information.
    Sel { base: NodeId, index: NodeId },
    Load { ptr: NodeId, mode: Mode },
    Store { ptr: NodeId, value: NodeId, mode: Mode },
    CopyB { dst: NodeId, src: NodeId, ty: TypeId },
    /// `mem` is the memory input; it must never equal `callee` or any
    /// element of `args` (checked as a debug assertion at use sites, per
    /// the `assert(irn != get_Call_mem(succ))` invariant in the source).
    Call { callee: NodeId, args: Vec<NodeId>, mem: NodeId },
    Builtin { kind: BuiltinKind, args: Vec<NodeId> },
    Tuple(Vec<NodeId>),
    Proj { pred: NodeId, index: u32 },
    /// Identity node; out-edges of an `Id` are treated as out-edges of its
    /// operand by the successor classifier (§4.D) and by offset peeling.
    Id(NodeId),
    Phi { preds: Vec<NodeId> },
}

impl Node {
    pub fn mode(&self, pool: &crate::ir::graph::Graph) -> Mode {
        match self {
            Node::Frame | Node::Address(_) => crate::ir::mode::PTR64,
            Node::Arg(_) => crate::ir::mode::PTR64,
            Node::Const(_) => crate::ir::mode::I64,
            Node::Add { left, .. } | Node::Sub { left, .. } => pool.node(*left).mode(pool),
            Node::Member { .. } | Node::Sel { .. } => crate::ir::mode::PTR64,
            Node::Load { mode, .. } => *mode,
            Node::Store { mode, .. } => *mode,
            Node::CopyB { .. } => crate::ir::mode::PTR64,
            Node::Call { .. } => crate::ir::mode::PTR64,
            Node::Builtin { .. } => crate::ir::mode::PTR64,
            Node::Tuple(_) => crate::ir::mode::PTR64,
            Node::Proj { .. } => crate::ir::mode::PTR64,
            Node::Id(inner) => pool.node(*inner).mode(pool),
            Node::Phi { .. } => crate::ir::mode::PTR64,
        }
    }

    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            Node::Frame | Node::Arg(_) | Node::Const(_) | Node::Address(_) => vec![],
            Node::Add { left, right } | Node::Sub { left, right } => vec![*left, *right],
            Node::Member { base, .. } => vec![*base],
            Node::Sel { base, index } => vec![*base, *index],
            Node::Load { ptr, .. } => vec![*ptr],
            Node::Store { ptr, value, .. } => vec![*ptr, *value],
            Node::CopyB { dst, src, .. } => vec![*dst, *src],
            Node::Call { callee, args, mem } => {
                let mut v = vec![*callee];
                v.extend(args.iter().copied());
                v.push(*mem);
                v
            }
            Node::Builtin { args, .. } => args.clone(),
            Node::Tuple(items) => items.clone(),
            Node::Proj { pred, .. } => vec![*pred],
            Node::Id(inner) => vec![*inner],
            Node::Phi { preds } => preds.clone(),
        }
    }
}
