//! RefResolver: turn pointer references into direct arena edges.
//!
//! Two passes: first every `$ref` pointer is looked up against the declared
//! roots, then the resolved graph is checked for illegal cycles. A cycle is
//! legal only if it passes through an `Object` (recursive records get
//! indirection at synthesis time); a cycle threaded purely through
//! references, unions, arrays or maps has no place to break and fails with
//! the exact pointer chain.

use std::collections::HashSet;

use crate::document::{NodeId, SchemaKind, SpecDocument};
use crate::error::GenError;

pub fn resolve(doc: &mut SpecDocument) -> Result<(), GenError> {
    link_targets(doc)?;
    check_cycles(doc)?;
    tracing::debug!(nodes = doc.len(), "resolved references");
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// POINTER LINKING
// ————————————————————————————————————————————————————————————————————————————

/// Supported pointer forms. Anything else is a dangling reference.
fn root_name(pointer: &str) -> Option<&str> {
    pointer
        .strip_prefix("#/components/schemas/")
        .or_else(|| pointer.strip_prefix("#/definitions/"))
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

fn link_targets(doc: &mut SpecDocument) -> Result<(), GenError> {
    for id in doc.ids() {
        let SchemaKind::Reference { pointer, target } = &doc.node(id).kind else {
            continue;
        };
        if target.is_some() {
            continue;
        }
        let pointer = pointer.clone();
        let Some(name) = root_name(&pointer) else {
            return Err(GenError::UnresolvedRef {
                pointer,
                chain: vec![doc.node(id).path.clone()],
            });
        };
        let Some(&root) = doc.roots.get(name) else {
            return Err(GenError::UnresolvedRef {
                pointer,
                chain: vec![doc.node(id).path.clone()],
            });
        };
        let SchemaKind::Reference { target, .. } = &mut doc.node_mut(id).kind else {
            unreachable!("kind checked above");
        };
        *target = Some(root);
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// CYCLE DETECTION
// ————————————————————————————————————————————————————————————————————————————

/// Edges followed by the cycle walk. Object properties are deliberately
/// absent: entering an Object is the one legal way to close a cycle.
fn walk_edges(kind: &SchemaKind) -> Vec<NodeId> {
    match kind {
        SchemaKind::Reference { target, .. } => target.iter().copied().collect(),
        SchemaKind::Union { variants, .. } => variants.clone(),
        SchemaKind::Array { items } => items.iter().copied().collect(),
        SchemaKind::Map { value } => value.iter().copied().collect(),
        SchemaKind::Object { .. } | SchemaKind::Enum { .. } | SchemaKind::Primitive { .. } => {
            Vec::new()
        }
    }
}

fn check_cycles(doc: &SpecDocument) -> Result<(), GenError> {
    let mut done = HashSet::new();
    for id in doc.ids() {
        if !done.contains(&id) {
            visit(doc, id, &mut Vec::new(), &mut done)?;
        }
    }
    Ok(())
}

fn visit(
    doc: &SpecDocument,
    id: NodeId,
    stack: &mut Vec<NodeId>,
    done: &mut HashSet<NodeId>,
) -> Result<(), GenError> {
    if let Some(start) = stack.iter().position(|&n| n == id) {
        let chain: Vec<String> = stack[start..]
            .iter()
            .chain(std::iter::once(&id))
            .map(|&n| doc.node(n).path.clone())
            .collect();
        let pointer = stack[start..]
            .iter()
            .find_map(|&n| match &doc.node(n).kind {
                SchemaKind::Reference { pointer, .. } => Some(pointer.clone()),
                _ => None,
            })
            .unwrap_or_else(|| doc.node(id).path.clone());
        return Err(GenError::UnresolvedRef { pointer, chain });
    }
    if done.contains(&id) {
        return Ok(());
    }
    stack.push(id);
    for next in walk_edges(&doc.node(id).kind) {
        visit(doc, next, stack, done)?;
    }
    stack.pop();
    done.insert(id);
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
