//! TypeSynthesizer: canonical schema nodes → target type shapes.
//!
//! Tie-break order per node: enumerated values → Enum; discriminated
//! variant sets → TaggedUnion; pure reference → Alias (collapsed, not
//! wrapped); declared properties → Record; unconstrained element type →
//! Container; otherwise → Primitive. Nullability is a wrapper over the
//! resolved type, never a kind of its own, so nullable and plain records
//! share one synthesis path.
//!
//! Anonymous nested shapes are promoted to named types (owner name +
//! property name), so every record, union and enum ends up a graph vertex
//! addressable by the later stages. Inline recursion is bounded by an
//! explicit depth limit instead of trusting the stack.

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::document::{NodeId, Prim, SchemaKind, SpecDocument};
use crate::error::GenError;

/// Bound on structural nesting while synthesizing inline shapes.
const MAX_INLINE_DEPTH: usize = 64;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Post-normalization type descriptor, independent of spec-document quirks.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalType {
    Record { fields: Vec<Field> },
    TaggedUnion { discriminator: String, variants: Vec<Variant> },
    Enum { values: Vec<String> },
    Alias { target: TyRef },
    Container { kind: ContainerKind, element: TyRef },
    Primitive { prim: Prim },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Wire name, exactly as declared in the spec.
    pub name: String,
    pub ty: TyRef,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// Discriminator value selecting this variant.
    pub tag: String,
    pub ty: TyRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    List,
    Map,
}

/// A leaf type reference inside a canonical type.
#[derive(Debug, Clone, PartialEq)]
pub enum TyRef {
    /// Another vertex of the type graph, by schema-level name.
    Named(String),
    Prim(Prim),
    List(Box<TyRef>),
    Map(Box<TyRef>),
    Optional(Box<TyRef>),
    /// Completely unconstrained value.
    Any,
}

impl TyRef {
    fn optional(self) -> TyRef {
        match self {
            TyRef::Optional(_) => self,
            other => TyRef::Optional(Box::new(other)),
        }
    }

    fn collect_named<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TyRef::Named(n) => out.push(n),
            TyRef::List(t) | TyRef::Map(t) | TyRef::Optional(t) => t.collect_named(out),
            TyRef::Prim(_) | TyRef::Any => {}
        }
    }
}

impl CanonicalType {
    /// Names of every graph vertex this type refers to.
    pub fn named_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            CanonicalType::Record { fields } => {
                for f in fields {
                    f.ty.collect_named(&mut out);
                }
            }
            CanonicalType::TaggedUnion { variants, .. } => {
                for v in variants {
                    v.ty.collect_named(&mut out);
                }
            }
            CanonicalType::Alias { target } => target.collect_named(&mut out),
            CanonicalType::Container { element, .. } => element.collect_named(&mut out),
            CanonicalType::Enum { .. } | CanonicalType::Primitive { .. } => {}
        }
        out
    }
}

/// The synthesized graph: schema-level name → canonical type, in definition
/// order (declared roots first, promoted inline types as encountered).
#[derive(Debug, Default)]
pub struct TypeGraph {
    pub types: IndexMap<String, CanonicalType>,
}

// ————————————————————————————————————————————————————————————————————————————
// SYNTHESIS
// ————————————————————————————————————————————————————————————————————————————

pub fn synthesize(doc: &SpecDocument) -> Result<TypeGraph, GenError> {
    let mut synth = Synthesizer {
        doc,
        graph: TypeGraph::default(),
        origins: IndexMap::new(),
    };
    for (name, id) in &doc.roots {
        synth.define(name.clone(), *id)?;
    }
    tracing::debug!(types = synth.graph.types.len(), "synthesized type graph");
    Ok(synth.graph)
}

struct Synthesizer<'a> {
    doc: &'a SpecDocument,
    graph: TypeGraph,
    /// Which node produced each name, to tell re-entry from collision.
    origins: IndexMap<String, NodeId>,
}

impl<'a> Synthesizer<'a> {
    fn define(&mut self, name: String, id: NodeId) -> Result<(), GenError> {
        if let Some(&prev) = self.origins.get(&name) {
            if prev == id {
                return Ok(());
            }
            return Err(GenError::NameCollision {
                ident: name.clone(),
                first: self.doc.node(prev).path.clone(),
                second: self.doc.node(id).path.clone(),
            });
        }
        self.origins.insert(name.clone(), id);
        let ty = self.canonical_of(&name, id)?;
        self.graph.types.insert(name, ty);
        Ok(())
    }

    fn canonical_of(&mut self, owner: &str, id: NodeId) -> Result<CanonicalType, GenError> {
        let node = self.doc.node(id);
        match &node.kind {
            // (1) explicit enumerated values
            SchemaKind::Enum { values } => Ok(CanonicalType::Enum { values: values.clone() }),

            // (2) mutually exclusive variant sets with a discriminator
            SchemaKind::Union { variants, discriminator: Some(d), .. } => {
                let property = d.property.clone();
                let mapping = d.mapping.clone();
                let mut out = Vec::with_capacity(variants.len());
                let mut tags = BTreeSet::new();
                for &v in variants {
                    let target = self.doc.deref(v);
                    let Some(variant_name) = self.doc.root_name_of(target) else {
                        return Err(GenError::shape(
                            self.doc.node(v).path.clone(),
                            "discriminated union variants must be named schemas",
                        ));
                    };
                    let tag = mapping
                        .iter()
                        .find(|(_, ptr)| ptr.rsplit('/').next() == Some(variant_name))
                        .map(|(value, _)| value.clone())
                        .unwrap_or_else(|| variant_name.to_string());
                    if !tags.insert(tag.clone()) {
                        return Err(GenError::shape(
                            node.path.clone(),
                            format!("duplicate discriminator value `{tag}`"),
                        ));
                    }
                    out.push(Variant { tag, ty: TyRef::Named(variant_name.to_string()) });
                }
                Ok(CanonicalType::TaggedUnion { discriminator: property, variants: out })
            }

            // Undiscriminated unions are never guessed at.
            SchemaKind::Union { discriminator: None, .. } => Err(GenError::shape(
                node.path.clone(),
                "union has no discriminator; refusing to differentiate variants silently",
            )),

            // (3) pure reference → collapsed alias
            SchemaKind::Reference { .. } => {
                let target = self.ty_ref(owner, "Target", id, 0)?;
                Ok(CanonicalType::Alias { target })
            }

            // (4) declared properties → record
            SchemaKind::Object { properties, required, .. } => {
                let mut fields = Vec::with_capacity(properties.len());
                for (prop, &pid) in properties {
                    let required = required.contains(prop);
                    let mut ty = self.ty_ref(owner, prop, pid, 0)?;
                    if !required {
                        ty = ty.optional();
                    }
                    fields.push(Field { name: prop.clone(), ty, required });
                }
                // stable order for deterministic emission
                fields.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(CanonicalType::Record { fields })
            }

            // (5) unconstrained element type → container
            SchemaKind::Array { items } => {
                let element = match items {
                    Some(i) => self.ty_ref(owner, "Item", *i, 0)?,
                    None => TyRef::Any,
                };
                Ok(CanonicalType::Container { kind: ContainerKind::List, element })
            }
            SchemaKind::Map { value } => {
                let element = match value {
                    Some(v) => self.ty_ref(owner, "Value", *v, 0)?,
                    None => TyRef::Any,
                };
                Ok(CanonicalType::Container { kind: ContainerKind::Map, element })
            }

            // (6) primitive
            SchemaKind::Primitive { prim, .. } => {
                if node.nullable {
                    Ok(CanonicalType::Alias {
                        target: TyRef::Prim(*prim).optional(),
                    })
                } else {
                    Ok(CanonicalType::Primitive { prim: *prim })
                }
            }
        }
    }

    /// Resolve the type of a nested position. Named schemas stay edges;
    /// anonymous records, unions and enums are promoted to named vertices.
    fn ty_ref(
        &mut self,
        owner: &str,
        hint: &str,
        id: NodeId,
        depth: usize,
    ) -> Result<TyRef, GenError> {
        let node = self.doc.node(id);
        if depth > MAX_INLINE_DEPTH {
            return Err(GenError::shape(
                node.path.clone(),
                format!("inline nesting exceeds the depth bound ({MAX_INLINE_DEPTH})"),
            ));
        }

        let base = match &node.kind {
            SchemaKind::Reference { target: Some(t), .. } => {
                let target = *t;
                match self.doc.root_name_of(target) {
                    Some(name) => TyRef::Named(name.to_string()),
                    // References resolve to roots today; keep the structural
                    // path anyway so a future pointer form cannot recurse
                    // unbounded.
                    None => self.ty_ref(owner, hint, target, depth + 1)?,
                }
            }
            SchemaKind::Reference { target: None, .. } => {
                return Err(GenError::UnresolvedRef {
                    pointer: node.path.clone(),
                    chain: vec!["reference reached synthesis unresolved".into()],
                });
            }
            SchemaKind::Object { .. } | SchemaKind::Union { .. } | SchemaKind::Enum { .. } => {
                let name = format!("{owner}{}", hint.to_case(Case::Pascal));
                self.define(name.clone(), id)?;
                TyRef::Named(name)
            }
            SchemaKind::Array { items } => match items {
                Some(i) => {
                    let hint = format!("{hint}Item");
                    TyRef::List(Box::new(self.ty_ref(owner, &hint, *i, depth + 1)?))
                }
                None => TyRef::List(Box::new(TyRef::Any)),
            },
            SchemaKind::Map { value } => match value {
                Some(v) => {
                    let hint = format!("{hint}Value");
                    TyRef::Map(Box::new(self.ty_ref(owner, &hint, *v, depth + 1)?))
                }
                None => TyRef::Map(Box::new(TyRef::Any)),
            },
            SchemaKind::Primitive { prim, .. } => TyRef::Prim(*prim),
        };

        if node.nullable {
            Ok(base.optional())
        } else {
            Ok(base)
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
