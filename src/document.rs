//! Arena document model.
//!
//! Schema nodes live in one flat `Vec` and address each other by `NodeId`,
//! never by direct reference, so cyclic schemas stay representable without
//! any cyclic-ownership machinery. Resolved reference edges are indices too.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// The parsed root: owns every schema node, plus the declared top-level
/// schemas by name (insertion order preserved for deterministic downstream
/// behavior).
#[derive(Debug, Default, Clone)]
pub struct SpecDocument {
    nodes: Vec<SchemaNode>,
    pub roots: IndexMap<String, NodeId>,
}

impl SpecDocument {
    pub fn alloc(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// The declared name of `id` if it is a top-level schema.
    pub fn root_name_of(&self, id: NodeId) -> Option<&str> {
        self.roots
            .iter()
            .find(|(_, rid)| **rid == id)
            .map(|(name, _)| name.as_str())
    }

    /// Follow reference edges until a non-reference node. Safe once the
    /// resolver has run: alias chains are proven acyclic by then.
    pub fn deref(&self, mut id: NodeId) -> NodeId {
        loop {
            match &self.node(id).kind {
                SchemaKind::Reference { target: Some(t), .. } => id = *t,
                _ => return id,
            }
        }
    }
}

/// One defined schema. `path` is the node's location in the document,
/// kept for diagnostics only.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub path: String,
    pub nullable: bool,
    /// Opaque vendor payload: every `x-…` key, preserved verbatim.
    pub extensions: IndexMap<String, Value>,
    pub kind: SchemaKind,
}

impl SchemaNode {
    pub fn new(path: impl Into<String>, kind: SchemaKind) -> Self {
        SchemaNode {
            path: path.into(),
            nullable: false,
            extensions: IndexMap::new(),
            kind,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SchemaKind {
    Object {
        properties: IndexMap<String, NodeId>,
        required: BTreeSet<String>,
        additional: Additional,
    },
    Array {
        items: Option<NodeId>,
    },
    /// Canonical map container (produced by the normalizer from open
    /// objects with no declared properties).
    Map {
        value: Option<NodeId>,
    },
    Union {
        encoding: UnionEncoding,
        variants: Vec<NodeId>,
        discriminator: Option<Discriminator>,
    },
    Enum {
        values: Vec<String>,
    },
    Primitive {
        prim: Prim,
        format: Option<String>,
        const_value: Option<String>,
    },
    Reference {
        pointer: String,
        /// Filled by the resolver; `Some` for every reference afterwards.
        target: Option<NodeId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionEncoding {
    OneOf,
    AnyOf,
    AllOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prim {
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

/// `additionalProperties` as declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Additional {
    Closed,
    Any,
    Typed(NodeId),
}

/// Standard discriminator: the field whose value selects a union variant.
/// `mapping` is discriminator value → reference pointer; empty means
/// "derive tags from the variants' declared names".
#[derive(Debug, Clone, Default)]
pub struct Discriminator {
    pub property: String,
    pub mapping: IndexMap<String, String>,
}
