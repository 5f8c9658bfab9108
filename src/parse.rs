//! SchemaParser: raw document bytes → `SpecDocument`.
//!
//! Accepts JSON or a YAML superset of OpenAPI 3.x schema-object syntax.
//! JSON failures are reported with the JSON path of the offending value
//! (via `serde_path_to_error`); structural problems are reported with the
//! schema-pointer path. No side effects, no partial documents.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::document::{
    Additional, Discriminator, NodeId, Prim, SchemaKind, SchemaNode, SpecDocument, UnionEncoding,
};
use crate::error::GenError;

/// Parse raw bytes into the arena document. Fails on malformed structure:
/// unbalanced containers, invalid scalar encodings, duplicate top-level names.
pub fn parse_document(bytes: &[u8]) -> Result<SpecDocument, GenError> {
    let value = read_value(bytes)?;
    let root = value
        .as_object()
        .ok_or_else(|| GenError::parse("top-level document must be an object"))?;

    let mut doc = SpecDocument::default();
    for (base, schemas) in schema_maps(root)? {
        for (name, schema) in schemas {
            if doc.roots.contains_key(name.as_str()) {
                return Err(GenError::parse(format!(
                    "duplicate top-level schema name `{name}`"
                )));
            }
            let path = format!("{base}/{name}");
            let id = lower_schema(&mut doc, schema, &path)?;
            doc.roots.insert(name.clone(), id);
        }
    }
    tracing::debug!(schemas = doc.roots.len(), nodes = doc.len(), "parsed spec document");
    Ok(doc)
}

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENT DECODING
// ————————————————————————————————————————————————————————————————————————————

fn read_value(bytes: &[u8]) -> Result<Value, GenError> {
    let first = bytes.iter().copied().find(|b| !b.is_ascii_whitespace());
    match first {
        Some(b'{') | Some(b'[') => from_json_with_path(bytes),
        Some(_) => serde_yaml::from_slice::<Value>(bytes)
            .map_err(|e| GenError::parse(format!("invalid YAML: {e}"))),
        None => Err(GenError::parse("empty document")),
    }
}

/// Deserialize JSON with path context in error messages.
fn from_json_with_path(bytes: &[u8]) -> Result<Value, GenError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, Value>(de).map_err(|err| {
        let path = err.path().to_string();
        GenError::parse(format!("invalid JSON at {path}: {}", err.into_inner()))
    })
}

/// Locate the schema maps: `components/schemas` and/or `definitions` when
/// present, else the top-level object itself is taken as the schema map.
fn schema_maps<'a>(
    root: &'a Map<String, Value>,
) -> Result<Vec<(&'static str, &'a Map<String, Value>)>, GenError> {
    let mut out = Vec::new();
    if let Some(components) = root.get("components") {
        let schemas = components
            .get("schemas")
            .and_then(Value::as_object)
            .ok_or_else(|| GenError::parse("`components.schemas` must be an object"))?;
        out.push(("#/components/schemas", schemas));
    }
    if let Some(defs) = root.get("definitions") {
        let defs = defs
            .as_object()
            .ok_or_else(|| GenError::parse("`definitions` must be an object"))?;
        out.push(("#/definitions", defs));
    }
    if out.is_empty() {
        out.push(("#", root));
    }
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA LOWERING
// ————————————————————————————————————————————————————————————————————————————

fn lower_schema(doc: &mut SpecDocument, value: &Value, path: &str) -> Result<NodeId, GenError> {
    let obj = value.as_object().ok_or_else(|| {
        GenError::parse(format!("schema at {path} must be an object, got {value}"))
    })?;

    let mut node = SchemaNode::new(path, SchemaKind::Primitive {
        prim: Prim::Null,
        format: None,
        const_value: None,
    });
    for (k, v) in obj {
        if k.starts_with("x-") {
            node.extensions.insert(k.clone(), v.clone());
        }
    }

    // `type` may be a scalar or (3.1) an array like ["string", "null"].
    let (declared_type, type_listed_null) = declared_type(obj, path)?;
    node.nullable = type_listed_null
        || obj.get("nullable").and_then(Value::as_bool).unwrap_or(false);

    node.kind = lower_kind(doc, obj, declared_type.as_deref(), path)?;
    Ok(doc.alloc(node))
}

fn declared_type(
    obj: &Map<String, Value>,
    path: &str,
) -> Result<(Option<String>, bool), GenError> {
    match obj.get("type") {
        None => Ok((None, false)),
        Some(Value::String(s)) => Ok((Some(s.clone()), false)),
        Some(Value::Array(items)) => {
            let mut ty = None;
            let mut saw_null = false;
            for item in items {
                match item.as_str() {
                    Some("null") => saw_null = true,
                    Some(s) if ty.is_none() => ty = Some(s.to_string()),
                    Some(s) => {
                        return Err(GenError::parse(format!(
                            "schema at {path}: multiple non-null types (`{}` and `{s}`)",
                            ty.as_deref().unwrap_or("?")
                        )));
                    }
                    None => {
                        return Err(GenError::parse(format!(
                            "schema at {path}: `type` array entries must be strings"
                        )));
                    }
                }
            }
            Ok((ty, saw_null))
        }
        Some(other) => Err(GenError::parse(format!(
            "schema at {path}: `type` must be a string or array, got {other}"
        ))),
    }
}

fn lower_kind(
    doc: &mut SpecDocument,
    obj: &Map<String, Value>,
    declared_type: Option<&str>,
    path: &str,
) -> Result<SchemaKind, GenError> {
    // References first: siblings other than nullability and extensions are
    // ignored, as in OpenAPI 3.0.
    if let Some(r) = obj.get("$ref") {
        let pointer = r
            .as_str()
            .ok_or_else(|| GenError::parse(format!("schema at {path}: `$ref` must be a string")))?;
        return Ok(SchemaKind::Reference { pointer: pointer.to_string(), target: None });
    }

    // Union encodings.
    for (key, encoding) in [
        ("oneOf", UnionEncoding::OneOf),
        ("anyOf", UnionEncoding::AnyOf),
        ("allOf", UnionEncoding::AllOf),
    ] {
        if let Some(list) = obj.get(key) {
            let list = list.as_array().ok_or_else(|| {
                GenError::parse(format!("schema at {path}: `{key}` must be an array"))
            })?;
            if list.is_empty() {
                return Err(GenError::parse(format!("schema at {path}: `{key}` is empty")));
            }
            let mut variants = Vec::with_capacity(list.len());
            for (i, v) in list.iter().enumerate() {
                variants.push(lower_schema(doc, v, &format!("{path}/{key}/{i}"))?);
            }
            let discriminator = lower_discriminator(obj, path)?;
            return Ok(SchemaKind::Union { encoding, variants, discriminator });
        }
    }

    // Enumerated values.
    if let Some(values) = obj.get("enum") {
        let values = values.as_array().ok_or_else(|| {
            GenError::parse(format!("schema at {path}: `enum` must be an array"))
        })?;
        let values = values.iter().map(literal_text).collect::<Vec<_>>();
        return Ok(SchemaKind::Enum { values });
    }

    match declared_type {
        Some("object") => lower_object(doc, obj, path),
        None if obj.contains_key("properties") || obj.contains_key("additionalProperties") => {
            lower_object(doc, obj, path)
        }
        Some("array") => {
            let items = match obj.get("items") {
                Some(items) => Some(lower_schema(doc, items, &format!("{path}/items"))?),
                None => None,
            };
            Ok(SchemaKind::Array { items })
        }
        Some(scalar) => {
            let prim = match scalar {
                "string" => Prim::String,
                "integer" => Prim::Integer,
                "number" => Prim::Number,
                "boolean" => Prim::Boolean,
                "null" => Prim::Null,
                other => {
                    return Err(GenError::parse(format!(
                        "schema at {path}: unknown type `{other}`"
                    )));
                }
            };
            Ok(SchemaKind::Primitive {
                prim,
                format: obj.get("format").and_then(Value::as_str).map(str::to_string),
                const_value: obj.get("const").map(literal_text),
            })
        }
        None => {
            if let Some(c) = obj.get("const") {
                let prim = match c {
                    Value::String(_) => Prim::String,
                    Value::Number(n) if n.is_f64() => Prim::Number,
                    Value::Number(_) => Prim::Integer,
                    Value::Bool(_) => Prim::Boolean,
                    _ => Prim::Null,
                };
                return Ok(SchemaKind::Primitive {
                    prim,
                    format: None,
                    const_value: Some(literal_text(c)),
                });
            }
            // Untyped and unconstrained: an open object. The normalizer
            // rewrites this shape into a canonical map container.
            Ok(SchemaKind::Object {
                properties: IndexMap::new(),
                required: BTreeSet::new(),
                additional: Additional::Any,
            })
        }
    }
}

fn lower_object(
    doc: &mut SpecDocument,
    obj: &Map<String, Value>,
    path: &str,
) -> Result<SchemaKind, GenError> {
    let mut properties = IndexMap::new();
    if let Some(props) = obj.get("properties") {
        let props = props.as_object().ok_or_else(|| {
            GenError::parse(format!("schema at {path}: `properties` must be an object"))
        })?;
        for (name, sub) in props {
            let id = lower_schema(doc, sub, &format!("{path}/properties/{name}"))?;
            properties.insert(name.clone(), id);
        }
    }

    let mut required = BTreeSet::new();
    if let Some(req) = obj.get("required") {
        let req = req.as_array().ok_or_else(|| {
            GenError::parse(format!("schema at {path}: `required` must be an array"))
        })?;
        for entry in req {
            let name = entry.as_str().ok_or_else(|| {
                GenError::parse(format!("schema at {path}: `required` entries must be strings"))
            })?;
            required.insert(name.to_string());
        }
    }

    let additional = match obj.get("additionalProperties") {
        None | Some(Value::Bool(false)) => Additional::Closed,
        Some(Value::Bool(true)) => Additional::Any,
        Some(sub) => {
            let id = lower_schema(doc, sub, &format!("{path}/additionalProperties"))?;
            Additional::Typed(id)
        }
    };

    Ok(SchemaKind::Object { properties, required, additional })
}

fn lower_discriminator(
    obj: &Map<String, Value>,
    path: &str,
) -> Result<Option<Discriminator>, GenError> {
    let Some(disc) = obj.get("discriminator") else {
        return Ok(None);
    };
    let disc = disc.as_object().ok_or_else(|| {
        GenError::parse(format!("schema at {path}: `discriminator` must be an object"))
    })?;
    let property = disc
        .get("propertyName")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GenError::parse(format!(
                "schema at {path}: `discriminator.propertyName` must be a string"
            ))
        })?;
    let mut mapping = IndexMap::new();
    if let Some(map) = disc.get("mapping") {
        let map = map.as_object().ok_or_else(|| {
            GenError::parse(format!("schema at {path}: `discriminator.mapping` must be an object"))
        })?;
        for (value, pointer) in map {
            let pointer = pointer.as_str().ok_or_else(|| {
                GenError::parse(format!(
                    "schema at {path}: `discriminator.mapping` values must be strings"
                ))
            })?;
            mapping.insert(value.clone(), pointer.to_string());
        }
    }
    Ok(Some(Discriminator { property: property.to_string(), mapping }))
}

/// JSON literal text of an enum/const member. String members keep their raw
/// text; everything else uses its compact JSON encoding.
fn literal_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> SpecDocument {
        parse_document(serde_json::to_string(&v).unwrap().as_bytes()).unwrap()
    }

    #[test]
    fn components_schemas_become_roots() {
        let doc = parse(json!({
            "components": { "schemas": {
                "Role": { "type": "object", "properties": { "id": { "type": "string" } } },
                "Flags": { "type": "integer" }
            }}
        }));
        assert_eq!(doc.roots.len(), 2);
        assert!(doc.roots.contains_key("Role"));
        assert!(doc.roots.contains_key("Flags"));
    }

    #[test]
    fn bare_schema_map_is_accepted() {
        let doc = parse(json!({
            "Thing": { "type": "string" }
        }));
        assert_eq!(doc.roots.len(), 1);
        let id = doc.roots["Thing"];
        assert!(matches!(
            doc.node(id).kind,
            SchemaKind::Primitive { prim: Prim::String, .. }
        ));
    }

    #[test]
    fn duplicate_names_across_maps_fail() {
        let v = json!({
            "components": { "schemas": { "Role": { "type": "object" } } },
            "definitions": { "Role": { "type": "object" } }
        });
        let err = parse_document(serde_json::to_string(&v).unwrap().as_bytes()).unwrap_err();
        assert!(matches!(err, GenError::SpecParse { .. }), "{err}");
        assert!(err.to_string().contains("Role"));
    }

    #[test]
    fn yaml_and_json_lower_identically() {
        let yaml = b"
components:
  schemas:
    Role:
      type: object
      required: [id]
      properties:
        id:
          type: string
";
        let json_bytes = serde_json::to_string(&json!({
            "components": { "schemas": { "Role": {
                "type": "object",
                "required": ["id"],
                "properties": { "id": { "type": "string" } }
            }}}
        }))
        .unwrap();
        let a = parse_document(yaml).unwrap();
        let b = parse_document(json_bytes.as_bytes()).unwrap();
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }

    #[test]
    fn vendor_extensions_are_preserved_verbatim() {
        let doc = parse(json!({
            "Role": {
                "type": "object",
                "x-discriminator": "kind",
                "x-unknown-marker": { "anything": [1, 2] }
            }
        }));
        let node = doc.node(doc.roots["Role"]);
        assert_eq!(node.extensions["x-discriminator"], json!("kind"));
        assert_eq!(node.extensions["x-unknown-marker"], json!({ "anything": [1, 2] }));
    }

    #[test]
    fn nullable_forms() {
        let doc = parse(json!({
            "A": { "type": "string", "nullable": true },
            "B": { "type": ["string", "null"] }
        }));
        assert!(doc.node(doc.roots["A"]).nullable);
        assert!(doc.node(doc.roots["B"]).nullable);
    }

    #[test]
    fn union_with_discriminator() {
        let doc = parse(json!({
            "Event": {
                "oneOf": [
                    { "$ref": "#/components/schemas/A" },
                    { "$ref": "#/components/schemas/B" }
                ],
                "discriminator": {
                    "propertyName": "type",
                    "mapping": { "a": "#/components/schemas/A" }
                }
            },
            "A": { "type": "object" },
            "B": { "type": "object" }
        }));
        let node = doc.node(doc.roots["Event"]);
        let SchemaKind::Union { encoding, variants, discriminator } = &node.kind else {
            panic!("expected union, got {:?}", node.kind);
        };
        assert_eq!(*encoding, UnionEncoding::OneOf);
        assert_eq!(variants.len(), 2);
        let disc = discriminator.as_ref().unwrap();
        assert_eq!(disc.property, "type");
        assert_eq!(disc.mapping["a"], "#/components/schemas/A");
    }

    #[test]
    fn malformed_json_reports_path() {
        let err = parse_document(br#"{ "components": { "schemas": 3 } }"#).unwrap_err();
        assert!(err.to_string().contains("components.schemas") || err.to_string().contains("`components.schemas`"), "{err}");
    }

    #[test]
    fn unbalanced_json_fails() {
        let err = parse_document(br#"{ "Role": { "type": "object" "#).unwrap_err();
        assert!(matches!(err, GenError::SpecParse { .. }));
    }

    #[test]
    fn enum_members_keep_literal_text() {
        let doc = parse(json!({
            "Level": { "type": "integer", "enum": [0, 1, 2] },
            "Mode": { "type": "string", "enum": ["on", "off"] }
        }));
        let SchemaKind::Enum { values } = &doc.node(doc.roots["Level"]).kind else {
            panic!("expected enum");
        };
        assert_eq!(values, &["0", "1", "2"]);
        let SchemaKind::Enum { values } = &doc.node(doc.roots["Mode"]).kind else {
            panic!("expected enum");
        };
        assert_eq!(values, &["on", "off"]);
    }
}
