//! NameResolver: one shared symbol table per run.
//!
//! Every type graph vertex gets a final identifier: declared name plus the
//! configured suffix, normalized to Pascal case. Collisions are explicit
//! failures, never implicit renames — a silently renamed type is a silently
//! wrong downstream API.

use std::collections::HashMap;
use std::collections::HashSet;

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::error::GenError;
use crate::synth::TypeGraph;

/// Rust reserved words plus the identifiers the generated files import.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
        "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
        "true", "type", "union", "unsafe", "use", "where", "while",
        // reserved for future use
        "abstract", "become", "box", "do", "final", "gen", "macro", "override", "priv", "try",
        "typeof", "unsized", "virtual", "yield",
        // would shadow the generated imports
        "Box", "Option", "String", "Vec", "HashMap", "Value", "Serialize", "Deserialize",
    ]
    .into_iter()
    .collect()
});

/// Final identifiers, keyed by schema-level name, in graph order.
#[derive(Debug, Default)]
pub struct ResolvedNames {
    idents: IndexMap<String, String>,
}

impl ResolvedNames {
    /// The name itself is the fallback for anything the table never saw.
    pub fn ident<'a>(&'a self, schema_name: &'a str) -> &'a str {
        self.idents
            .get(schema_name)
            .map(String::as_str)
            .unwrap_or(schema_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.idents.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub fn assign(graph: &TypeGraph, suffix: &str) -> Result<ResolvedNames, GenError> {
    let mut names = ResolvedNames::default();
    let mut taken: HashMap<String, String> = HashMap::new();

    for schema_name in graph.types.keys() {
        let ident = format!("{schema_name}{suffix}").to_case(Case::Pascal);

        if ident.is_empty() || !ident.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            return Err(GenError::NameCollision {
                ident,
                first: schema_name.clone(),
                second: "(not a valid identifier)".into(),
            });
        }
        if RESERVED.contains(ident.as_str()) {
            return Err(GenError::NameCollision {
                ident,
                first: schema_name.clone(),
                second: "(reserved identifier)".into(),
            });
        }
        // the ident also names the generated module file (`Match` →
        // `pub mod match;`), so its snake form must be usable too
        if RESERVED.contains(ident.to_case(Case::Snake).as_str()) {
            return Err(GenError::NameCollision {
                ident,
                first: schema_name.clone(),
                second: "(reserved module name)".into(),
            });
        }
        if let Some(prev) = taken.insert(ident.clone(), schema_name.clone()) {
            return Err(GenError::NameCollision {
                ident,
                first: prev,
                second: schema_name.clone(),
            });
        }
        names.idents.insert(schema_name.clone(), ident);
    }

    tracing::debug!(idents = names.idents.len(), "assigned identifiers");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Prim;
    use crate::synth::CanonicalType;

    fn graph(names: &[&str]) -> TypeGraph {
        let mut g = TypeGraph::default();
        for n in names {
            g.types
                .insert(n.to_string(), CanonicalType::Primitive { prim: Prim::String });
        }
        g
    }

    #[test]
    fn suffix_applies_before_casing() {
        let names = assign(&graph(&["guild_role"]), "Model").unwrap();
        assert_eq!(names.ident("guild_role"), "GuildRoleModel");
    }

    #[test]
    fn unassigned_name_falls_back_to_itself() {
        let names = assign(&graph(&["Role"]), "Model").unwrap();
        assert_eq!(names.ident("Role"), "RoleModel");
        assert_eq!(names.ident("NeverAssigned"), "NeverAssigned");
    }

    #[test]
    fn casing_collision_is_an_error() {
        let err = assign(&graph(&["Foo", "foo"]), "").unwrap_err();
        let GenError::NameCollision { ident, first, second } = err else {
            panic!("expected NameCollision");
        };
        assert_eq!(ident, "Foo");
        assert_eq!((first.as_str(), second.as_str()), ("Foo", "foo"));
    }

    #[test]
    fn reserved_identifier_is_rejected() {
        let err = assign(&graph(&["option"]), "").unwrap_err();
        assert!(matches!(err, GenError::NameCollision { .. }), "{err}");
    }

    #[test]
    fn reserved_module_name_is_rejected() {
        // `Match` is a fine type identifier but its module would be
        // `pub mod match;`
        let err = assign(&graph(&["Match"]), "").unwrap_err();
        let GenError::NameCollision { second, .. } = &err else {
            panic!("expected NameCollision, got {err}");
        };
        assert_eq!(second, "(reserved module name)");
        let names = assign(&graph(&["Match"]), "Model").unwrap();
        assert_eq!(names.ident("Match"), "MatchModel");
    }

    #[test]
    fn suffix_can_disambiguate_reserved_words() {
        let names = assign(&graph(&["option"]), "Model").unwrap();
        assert_eq!(names.ident("option"), "OptionModel");
    }

    #[test]
    fn leading_digit_is_rejected() {
        let err = assign(&graph(&["2fa_method"]), "").unwrap_err();
        assert!(matches!(err, GenError::NameCollision { .. }), "{err}");
    }
}
