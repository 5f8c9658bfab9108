//! CodeEmitter: render the retained type graph into source files.
//!
//! Files are rendered in lexicographic identifier order so output never
//! depends on traversal timing, written to a staging directory first, and
//! moved into the output directory only once every file has rendered. A
//! failed run leaves the output directory exactly as it was.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use convert_case::{Case, Casing};
use once_cell::sync::Lazy;

use crate::document::Prim;
use crate::error::GenError;
use crate::names::ResolvedNames;
use crate::synth::{CanonicalType, ContainerKind, TyRef, TypeGraph};

/// One output artifact per retained canonical type (plus the umbrella
/// module file).
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub ident: String,
    pub file_name: String,
    pub source: String,
}

const HEADER: &str = "// Generated by oas-modelgen. Do not edit.\n";

static FIELD_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
        "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
        "pub", "ref", "return", "static", "struct", "trait", "true", "type", "union", "unsafe",
        "use", "where", "while",
    ]
    .into_iter()
    .collect()
});

/// Keywords that cannot even be raw identifiers.
const UNRAWABLE: [&str; 4] = ["self", "Self", "super", "crate"];

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

pub fn render(graph: &TypeGraph, names: &ResolvedNames) -> Result<Vec<GeneratedFile>, GenError> {
    let mut order: Vec<&str> = graph.types.keys().map(String::as_str).collect();
    order.sort_by(|a, b| names.ident(a).cmp(names.ident(b)));

    let mut files = Vec::with_capacity(order.len() + 1);
    for schema_name in &order {
        let ident = names.ident(schema_name).to_string();
        let ty = &graph.types[*schema_name];
        let source = render_type(schema_name, &ident, ty, names)?;
        files.push(GeneratedFile {
            file_name: format!("{}.rs", ident.to_case(Case::Snake)),
            ident,
            source,
        });
    }
    files.push(umbrella(&files));
    tracing::debug!(files = files.len(), "rendered generated files");
    Ok(files)
}

fn umbrella(files: &[GeneratedFile]) -> GeneratedFile {
    let mut src = String::from(HEADER);
    src.push_str("//! Generated data-binding models.\n\n");
    for f in files {
        let module = f.file_name.trim_end_matches(".rs");
        let _ = writeln!(src, "pub mod {module};");
        let _ = writeln!(src, "pub use {module}::{};", f.ident);
    }
    GeneratedFile { ident: "mod".into(), file_name: "mod.rs".into(), source: src }
}

fn render_type(
    schema_name: &str,
    ident: &str,
    ty: &CanonicalType,
    names: &ResolvedNames,
) -> Result<String, GenError> {
    let mut body = String::new();
    match ty {
        CanonicalType::Record { fields } => {
            let _ = writeln!(body, "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]");
            let _ = writeln!(body, "pub struct {ident} {{");
            for f in fields {
                let field = field_ident(&f.name);
                if field.trim_start_matches("r#") != f.name {
                    let _ = writeln!(body, "    #[serde(rename = {:?})]", f.name);
                }
                let rust = rust_ty(&f.ty, names, schema_name, true);
                let _ = writeln!(body, "    pub {field}: {rust},");
            }
            let _ = writeln!(body, "}}");
        }
        CanonicalType::TaggedUnion { discriminator, variants } => {
            let _ = writeln!(body, "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]");
            let _ = writeln!(body, "#[serde(tag = {discriminator:?})]");
            let _ = writeln!(body, "pub enum {ident} {{");
            let mut seen = HashSet::new();
            for v in variants {
                let variant = variant_ident(&v.tag);
                if !seen.insert(variant.clone()) {
                    return Err(GenError::shape(
                        schema_name,
                        format!("variant tags `{}` collapse to one identifier `{variant}`", v.tag),
                    ));
                }
                if variant != v.tag {
                    let _ = writeln!(body, "    #[serde(rename = {:?})]", v.tag);
                }
                let rust = rust_ty(&v.ty, names, schema_name, true);
                let _ = writeln!(body, "    {variant}({rust}),");
            }
            let _ = writeln!(body, "}}");
        }
        CanonicalType::Enum { values } => {
            let _ = writeln!(body, "#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]");
            let _ = writeln!(body, "pub enum {ident} {{");
            let mut seen = HashSet::new();
            for value in values {
                let variant = variant_ident(value);
                if !seen.insert(variant.clone()) {
                    return Err(GenError::shape(
                        schema_name,
                        format!("enum values `{value}` collapse to one identifier `{variant}`"),
                    ));
                }
                if &variant != value {
                    let _ = writeln!(body, "    #[serde(rename = {value:?})]");
                }
                let _ = writeln!(body, "    {variant},");
            }
            let _ = writeln!(body, "}}");
        }
        CanonicalType::Alias { target } => {
            let rust = rust_ty(target, names, schema_name, true);
            let _ = writeln!(body, "pub type {ident} = {rust};");
        }
        CanonicalType::Container { kind, element } => {
            let elem = rust_ty(element, names, schema_name, false);
            let rust = match kind {
                ContainerKind::List => format!("Vec<{elem}>"),
                ContainerKind::Map => format!("HashMap<String, {elem}>"),
            };
            let _ = writeln!(body, "pub type {ident} = {rust};");
        }
        CanonicalType::Primitive { prim } => {
            let _ = writeln!(body, "pub type {ident} = {};", prim_ty(*prim));
        }
    }

    let mut src = String::from(HEADER);
    let _ = writeln!(src, "//! `{ident}`, generated from the `{schema_name}` schema.");
    src.push('\n');
    if body.contains("HashMap<") {
        src.push_str("use std::collections::HashMap;\n\n");
    }
    let mut imports = Vec::new();
    if matches!(
        ty,
        CanonicalType::Record { .. } | CanonicalType::TaggedUnion { .. } | CanonicalType::Enum { .. }
    ) {
        imports.push("use serde::{Deserialize, Serialize};".to_string());
    }
    if body.contains("Value") {
        imports.push("use serde_json::Value;".to_string());
    }
    if !ty.named_refs().is_empty() {
        imports.push("use super::*;".to_string());
    }
    if !imports.is_empty() {
        for import in imports {
            src.push_str(&import);
            src.push('\n');
        }
        src.push('\n');
    }
    src.push_str(&body);
    Ok(src)
}

// ————————————————————————————————————————————————————————————————————————————
// IDENTIFIERS AND TYPES
// ————————————————————————————————————————————————————————————————————————————

fn rust_ty(ty: &TyRef, names: &ResolvedNames, self_name: &str, direct: bool) -> String {
    match ty {
        TyRef::Named(n) => {
            let ident = names.ident(n);
            // A record naming itself needs indirection; Vec/HashMap already
            // provide it.
            if direct && n == self_name {
                format!("Box<{ident}>")
            } else {
                ident.to_string()
            }
        }
        TyRef::Prim(p) => prim_ty(*p).to_string(),
        TyRef::List(t) => format!("Vec<{}>", rust_ty(t, names, self_name, false)),
        TyRef::Map(t) => format!("HashMap<String, {}>", rust_ty(t, names, self_name, false)),
        TyRef::Optional(t) => format!("Option<{}>", rust_ty(t, names, self_name, direct)),
        TyRef::Any => "Value".to_string(),
    }
}

fn prim_ty(prim: Prim) -> &'static str {
    match prim {
        Prim::String => "String",
        Prim::Integer => "i64",
        Prim::Number => "f64",
        Prim::Boolean => "bool",
        Prim::Null => "()",
    }
}

fn field_ident(wire: &str) -> String {
    let snake = wire.to_case(Case::Snake);
    let snake = if snake.is_empty() || snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("n{snake}")
    } else {
        snake
    };
    if UNRAWABLE.contains(&snake.as_str()) {
        format!("{snake}_")
    } else if FIELD_KEYWORDS.contains(snake.as_str()) {
        format!("r#{snake}")
    } else {
        snake
    }
}

fn variant_ident(value: &str) -> String {
    let pascal = value.to_case(Case::Pascal);
    if pascal.is_empty() {
        "Empty".to_string()
    } else if pascal.starts_with(|c: char| c.is_ascii_digit()) {
        format!("V{pascal}")
    } else {
        pascal
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COMMIT
// ————————————————————————————————————————————————————————————————————————————

/// Write all files to a staging directory beside the output directory, then
/// move them in. The staging directory lives on the same filesystem so the
/// moves are plain renames.
pub fn commit(files: &[GeneratedFile], output_dir: &Path) -> Result<Vec<PathBuf>, GenError> {
    let parent = output_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".oas-modelgen-")
        .tempdir_in(parent)?;
    for f in files {
        fs::write(staging.path().join(&f.file_name), &f.source)?;
    }

    fs::create_dir_all(output_dir)?;
    let mut out = Vec::with_capacity(files.len());
    for f in files {
        let dest = output_dir.join(&f.file_name);
        fs::rename(staging.path().join(&f.file_name), &dest)?;
        out.push(dest);
    }
    tracing::info!(files = out.len(), dir = %output_dir.display(), "committed generated files");
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter;
    use crate::names;
    use crate::normalize::normalize;
    use crate::parse::parse_document;
    use crate::resolve::resolve;
    use crate::synth::synthesize;
    use serde_json::json;

    fn files_of(v: serde_json::Value, suffix: &str) -> Vec<GeneratedFile> {
        let mut doc = parse_document(serde_json::to_string(&v).unwrap().as_bytes()).unwrap();
        resolve(&mut doc).unwrap();
        normalize(&mut doc).unwrap();
        let graph = synthesize(&doc).unwrap();
        let resolved = names::assign(&graph, suffix).unwrap();
        let graph = filter(graph, &[]).unwrap();
        render(&graph, &resolved).unwrap()
    }

    fn role_fixture() -> serde_json::Value {
        json!({
            "components": { "schemas": {
                "Role": {
                    "type": "object",
                    "required": ["id", "type"],
                    "properties": {
                        "id": { "type": "string" },
                        "type": { "type": "integer" },
                        "permission": { "$ref": "#/components/schemas/Permission" }
                    }
                },
                "Permission": { "type": "integer" }
            }}
        })
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = files_of(role_fixture(), "Model");
        let b = files_of(role_fixture(), "Model");
        assert_eq!(a, b);
    }

    #[test]
    fn files_are_ordered_by_identifier() {
        let files = files_of(role_fixture(), "Model");
        let idents: Vec<&str> = files.iter().map(|f| f.ident.as_str()).collect();
        assert_eq!(idents, ["PermissionModel", "RoleModel", "mod"]);
    }

    #[test]
    fn record_renders_renames_and_keywords() {
        let files = files_of(role_fixture(), "Model");
        let role = files.iter().find(|f| f.ident == "RoleModel").unwrap();
        assert!(role.source.contains("pub struct RoleModel"));
        assert!(role.source.contains("pub r#type: i64,"), "{}", role.source);
        assert!(role.source.contains("pub permission: Option<PermissionModel>,"));
        assert!(role.source.contains("use super::*;"));
    }

    #[test]
    fn recursive_record_is_boxed() {
        let files = files_of(
            json!({
                "components": { "schemas": {
                    "Channel": { "type": "object", "required": ["parent"], "properties": {
                        "parent": { "$ref": "#/components/schemas/Channel" }
                    }}
                }}
            }),
            "",
        );
        let channel = files.iter().find(|f| f.ident == "Channel").unwrap();
        assert!(channel.source.contains("pub parent: Box<Channel>,"), "{}", channel.source);
    }

    #[test]
    fn enum_and_union_render() {
        let files = files_of(
            json!({
                "components": { "schemas": {
                    "Status": { "type": "string", "enum": ["online", "do-not-disturb"] },
                    "Event": {
                        "oneOf": [
                            { "$ref": "#/components/schemas/Ping" },
                            { "$ref": "#/components/schemas/Pong" }
                        ],
                        "discriminator": { "propertyName": "op" }
                    },
                    "Ping": { "type": "object" },
                    "Pong": { "type": "object" }
                }}
            }),
            "",
        );
        let status = files.iter().find(|f| f.ident == "Status").unwrap();
        assert!(status.source.contains("#[serde(rename = \"do-not-disturb\")]"));
        assert!(status.source.contains("DoNotDisturb,"));
        let event = files.iter().find(|f| f.ident == "Event").unwrap();
        assert!(event.source.contains("#[serde(tag = \"op\")]"));
        assert!(event.source.contains("Ping(Ping),"));
    }

    #[test]
    fn map_container_imports_hashmap() {
        let files = files_of(
            json!({ "Scores": { "type": "object", "additionalProperties": { "type": "integer" } } }),
            "",
        );
        let scores = files.iter().find(|f| f.ident == "Scores").unwrap();
        assert!(scores.source.contains("use std::collections::HashMap;"));
        assert!(scores.source.contains("pub type Scores = HashMap<String, i64>;"));
    }

    #[test]
    fn umbrella_reexports_every_type() {
        let files = files_of(role_fixture(), "Model");
        let umbrella = files.last().unwrap();
        assert_eq!(umbrella.file_name, "mod.rs");
        assert!(umbrella.source.contains("pub mod role_model;"));
        assert!(umbrella.source.contains("pub use role_model::RoleModel;"));
        assert!(umbrella.source.contains("pub use permission_model::PermissionModel;"));
    }

    #[test]
    fn commit_moves_everything_into_place() {
        let tmp = tempfile::tempdir().unwrap();
        let out_dir = tmp.path().join("models");
        let files = files_of(role_fixture(), "Model");
        let written = commit(&files, &out_dir).unwrap();
        assert_eq!(written.len(), files.len());
        for f in &files {
            let on_disk = std::fs::read_to_string(out_dir.join(&f.file_name)).unwrap();
            assert_eq!(on_disk, f.source);
        }
        // no staging residue
        let residue: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".oas-modelgen-"))
            .collect();
        assert!(residue.is_empty());
    }
}
