//! QuirkNormalizer: rewrite vendor-specific constructs into canonical shapes.
//!
//! Runs after reference resolution. Rewrites can unlock each other across
//! reference edges in either declaration order (a union's variants may be
//! `allOf` compositions declared after the union), so the rewrite pass runs
//! to a fixpoint over the arena before anything is validated:
//!
//! 1. an `x-discriminator` extension on a union is promoted to a standard
//!    discriminator field;
//! 2. `anyOf`/`oneOf` with a null member loses the member and gains the
//!    nullability flag (collapsing to an alias when one variant remains);
//! 3. a union whose members are all enumerated or constant primitive leaves
//!    becomes one canonical Enum; all-plain-primitive unions of one kind
//!    collapse to that primitive;
//! 4. `allOf` over object members becomes one merged object;
//! 5. an object with no declared properties and unconstrained (or typed)
//!    `additionalProperties` becomes a canonical map container.
//!
//! Unrecognized `x-…` keys are preserved verbatim and ignored. A union that
//! still cannot be mapped after these rewrites fails with the schema path.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::document::{
    Additional, Discriminator, NodeId, Prim, SchemaKind, SpecDocument, UnionEncoding,
};
use crate::error::GenError;

/// Extension key recognized as a discriminator marker.
const X_DISCRIMINATOR: &str = "x-discriminator";

pub fn normalize(doc: &mut SpecDocument) -> Result<(), GenError> {
    // Every rewrite fires at most once per node (each replaces the matched
    // kind with one no rewrite matches), so the fixpoint is reached in a
    // bounded number of passes.
    loop {
        let mut changed = false;
        for id in doc.ids() {
            changed |= promote_extension_discriminator(doc, id);
            changed |= strip_null_variants(doc, id);
            changed |= rewrite_enumish_union(doc, id);
            changed |= merge_all_of(doc, id);
            changed |= rewrite_open_object(doc, id);
        }
        if !changed {
            break;
        }
    }
    for id in doc.ids() {
        check_union_mappable(doc, id)?;
    }
    tracing::debug!(nodes = doc.len(), "normalized quirks");
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// REWRITES
// ————————————————————————————————————————————————————————————————————————————

fn promote_extension_discriminator(doc: &mut SpecDocument, id: NodeId) -> bool {
    let node = doc.node(id);
    let Some(property) = node.extensions.get(X_DISCRIMINATOR).and_then(|v| v.as_str()) else {
        return false;
    };
    let property = property.to_string();
    if let SchemaKind::Union { discriminator, .. } = &mut doc.node_mut(id).kind {
        if discriminator.is_none() {
            *discriminator = Some(Discriminator {
                property,
                mapping: IndexMap::new(),
            });
            return true;
        }
    }
    false
}

/// `anyOf [T, null]` → nullable T. Applies to `oneOf` too.
fn strip_null_variants(doc: &mut SpecDocument, id: NodeId) -> bool {
    let node = doc.node(id);
    let SchemaKind::Union { encoding, variants, discriminator } = &node.kind else {
        return false;
    };
    if *encoding == UnionEncoding::AllOf {
        return false;
    }
    let kept: Vec<NodeId> = variants
        .iter()
        .copied()
        .filter(|&v| !is_null_leaf(doc, v))
        .collect();
    if kept.len() == variants.len() {
        return false;
    }
    let discriminator = discriminator.clone();
    let encoding = *encoding;

    let new_kind = if kept.is_empty() {
        SchemaKind::Primitive { prim: Prim::Null, format: None, const_value: None }
    } else if kept.len() == 1 {
        alias_to(doc, kept[0])
    } else {
        SchemaKind::Union { encoding, variants: kept, discriminator }
    };
    let node = doc.node_mut(id);
    node.nullable = true;
    node.kind = new_kind;
    true
}

fn is_null_leaf(doc: &SpecDocument, id: NodeId) -> bool {
    let node = doc.node(doc.deref(id));
    matches!(node.kind, SchemaKind::Primitive { prim: Prim::Null, const_value: None, .. })
}

fn alias_to(doc: &SpecDocument, target: NodeId) -> SchemaKind {
    SchemaKind::Reference {
        pointer: doc.node(target).path.clone(),
        target: Some(target),
    }
}

/// Union where every member is an enumerated or constant primitive leaf
/// → one canonical Enum. Union of plain primitives of one kind → that
/// primitive.
fn rewrite_enumish_union(doc: &mut SpecDocument, id: NodeId) -> bool {
    let SchemaKind::Union { encoding, variants, .. } = &doc.node(id).kind else {
        return false;
    };
    if *encoding == UnionEncoding::AllOf {
        return false;
    }

    let mut values: Vec<String> = Vec::new();
    let mut all_enumish = true;
    let mut plain_prim: Option<Prim> = None;
    let mut all_plain = true;

    for &v in variants {
        match &doc.node(doc.deref(v)).kind {
            SchemaKind::Enum { values: vs } => {
                all_plain = false;
                values.extend(vs.iter().cloned());
            }
            SchemaKind::Primitive { const_value: Some(c), .. } => {
                all_plain = false;
                values.push(c.clone());
            }
            SchemaKind::Primitive { prim, const_value: None, .. } => {
                all_enumish = false;
                match plain_prim {
                    None => plain_prim = Some(*prim),
                    Some(p) if p == *prim => {}
                    Some(_) => all_plain = false,
                }
            }
            _ => {
                all_enumish = false;
                all_plain = false;
            }
        }
    }

    if all_enumish {
        let mut seen = BTreeSet::new();
        values.retain(|v| seen.insert(v.clone()));
        doc.node_mut(id).kind = SchemaKind::Enum { values };
        return true;
    }
    if all_plain {
        if let Some(prim) = plain_prim {
            doc.node_mut(id).kind =
                SchemaKind::Primitive { prim, format: None, const_value: None };
            return true;
        }
    }
    false
}

/// `allOf` over object members → one merged object. Later members win on
/// property name; required sets union. Members that are not objects yet
/// (nested `allOf` chains, enum-like unions behind references) defer to a
/// later pass; whatever still cannot merge at the fixpoint is caught by the
/// validation walk.
fn merge_all_of(doc: &mut SpecDocument, id: NodeId) -> bool {
    let SchemaKind::Union { encoding: UnionEncoding::AllOf, variants, .. } = &doc.node(id).kind
    else {
        return false;
    };
    let variants = variants.clone();
    let all_objects = variants
        .iter()
        .all(|&v| matches!(doc.node(doc.deref(v)).kind, SchemaKind::Object { .. }));
    if !all_objects {
        return false;
    }

    let mut properties = IndexMap::new();
    let mut required = BTreeSet::new();
    let mut additional = Additional::Closed;

    for v in &variants {
        let SchemaKind::Object { properties: p, required: r, additional: a } =
            &doc.node(doc.deref(*v)).kind
        else {
            unreachable!("members checked above");
        };
        for (name, sub) in p {
            properties.insert(name.clone(), *sub);
        }
        required.extend(r.iter().cloned());
        if *a != Additional::Closed {
            additional = a.clone();
        }
    }

    doc.node_mut(id).kind = SchemaKind::Object { properties, required, additional };
    true
}

/// Open object with no declared properties → canonical map container.
fn rewrite_open_object(doc: &mut SpecDocument, id: NodeId) -> bool {
    let SchemaKind::Object { properties, additional, .. } = &doc.node(id).kind else {
        return false;
    };
    if !properties.is_empty() {
        return false;
    }
    let value = match additional {
        Additional::Closed => return false,
        Additional::Any => None,
        Additional::Typed(t) => Some(*t),
    };
    doc.node_mut(id).kind = SchemaKind::Map { value };
    true
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION
// ————————————————————————————————————————————————————————————————————————————

/// Whatever union survives the rewrites must be mappable: every variant an
/// object-shaped node. Anything else has no canonical target. An `allOf`
/// still standing at this point has a member the merge could never treat as
/// an object.
fn check_union_mappable(doc: &SpecDocument, id: NodeId) -> Result<(), GenError> {
    let node = doc.node(id);
    let SchemaKind::Union { encoding, variants, .. } = &node.kind else {
        return Ok(());
    };
    for &v in variants {
        let member = doc.node(doc.deref(v));
        if !matches!(member.kind, SchemaKind::Object { .. }) {
            let detail = if *encoding == UnionEncoding::AllOf {
                format!("`allOf` member at {} is not an object", member.path)
            } else {
                format!("union variant at {} is not an object and not enum-like", member.path)
            };
            return Err(GenError::shape(node.path.clone(), detail));
        }
    }
    debug_assert_ne!(*encoding, UnionEncoding::AllOf, "mergeable allOf survived the fixpoint");
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
