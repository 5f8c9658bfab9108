//! IncludeFilter: slice the type graph down to what is actually needed.
//!
//! Traversal starts from each configured root name and follows named edges;
//! exactly the visited set survives. Schemas nobody reaches are dropped
//! silently — that is the point of the allow-list, not an error. An empty
//! allow-list keeps everything.

use std::collections::{HashSet, VecDeque};

use crate::error::GenError;
use crate::synth::TypeGraph;

pub fn filter(graph: TypeGraph, includes: &[String]) -> Result<TypeGraph, GenError> {
    if includes.is_empty() {
        return Ok(graph);
    }

    let mut keep: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    for root in includes {
        if !graph.types.contains_key(root) {
            // The configuration names a schema the document does not define.
            return Err(GenError::UnresolvedRef {
                pointer: root.clone(),
                chain: vec!["includes configuration".into()],
            });
        }
        if keep.insert(root.clone()) {
            queue.push_back(root.clone());
        }
    }

    while let Some(name) = queue.pop_front() {
        let ty = &graph.types[&name];
        for dep in ty.named_refs() {
            if keep.insert(dep.to_string()) {
                queue.push_back(dep.to_string());
            }
        }
    }

    let total = graph.types.len();
    let mut out = TypeGraph::default();
    for (name, ty) in graph.types {
        if keep.contains(&name) {
            out.types.insert(name, ty);
        }
    }
    tracing::debug!(kept = out.types.len(), total, "filtered type graph");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::parse::parse_document;
    use crate::resolve::resolve;
    use crate::synth::synthesize;
    use serde_json::json;

    fn graph_of(v: serde_json::Value) -> TypeGraph {
        let mut doc = parse_document(serde_json::to_string(&v).unwrap().as_bytes()).unwrap();
        resolve(&mut doc).unwrap();
        normalize(&mut doc).unwrap();
        synthesize(&doc).unwrap()
    }

    fn role_permission_guild() -> TypeGraph {
        graph_of(json!({
            "components": { "schemas": {
                "Role": { "type": "object", "properties": {
                    "permission": { "$ref": "#/components/schemas/Permission" }
                }},
                "Permission": { "type": "integer" },
                "Guild": { "type": "object", "properties": {
                    "name": { "type": "string" }
                }}
            }}
        }))
    }

    #[test]
    fn keeps_roots_and_transitive_deps_only() {
        let g = filter(role_permission_guild(), &["Role".to_string()]).unwrap();
        let names: Vec<&String> = g.types.keys().collect();
        assert_eq!(names, ["Role", "Permission"]);
    }

    #[test]
    fn empty_allow_list_keeps_everything() {
        let g = filter(role_permission_guild(), &[]).unwrap();
        assert_eq!(g.types.len(), 3);
    }

    #[test]
    fn unknown_root_is_an_error() {
        let err = filter(role_permission_guild(), &["Nope".to_string()]).unwrap_err();
        let GenError::UnresolvedRef { pointer, .. } = err else {
            panic!("expected UnresolvedRef");
        };
        assert_eq!(pointer, "Nope");
    }

    #[test]
    fn promoted_inline_types_follow_their_owner() {
        let g = graph_of(json!({
            "components": { "schemas": {
                "Role": { "type": "object", "properties": {
                    "tags": { "type": "object", "properties": {
                        "bot_id": { "type": "string" }
                    }}
                }},
                "Guild": { "type": "object" }
            }}
        }));
        let g = filter(g, &["Role".to_string()]).unwrap();
        assert!(g.types.contains_key("RoleTags"));
        assert!(!g.types.contains_key("Guild"));
    }
}
