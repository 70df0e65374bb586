//! Schema merging used by reduction.
//!
//! [`merge_schemas`] builds one schema for data that satisfies both inputs.
//! Keywords are combined by what they mean: `required` and `allOf` are
//! concatenated, bounds tighten, `type` and `enum` intersect, sub-schemas
//! merge recursively and `anyOf`/`oneOf` expand into pairwise merged
//! branches. A right-hand constraint that cannot be folded into its left
//! counterpart (two different `pattern`s, say) is kept as an extra `anyOf`
//! branch, so nothing either side requires is dropped. Annotations are taken
//! from the right-hand side.

use crate::keywords::json_equal;
use crate::options::Dialect;
use crate::scope::{join_scope, strip_fragment};
use serde_json::{Map, Value, json};
use std::cmp::Ordering;

/// Keywords whose value is a map from names to sub-schemas
const SCHEMA_MAPS: &[&str] = &[
    "properties",
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

/// Keywords whose value is a single sub-schema applied to the same locations
const SCHEMA_VALUES: &[&str] = &[
    "additionalProperties",
    "unevaluatedProperties",
    "unevaluatedItems",
    "additionalItems",
    "propertyNames",
    "items",
];

/// Keywords that describe a schema without constraining data
const ANNOTATIONS: &[&str] = &[
    "$id",
    "id",
    "$schema",
    "$comment",
    "$anchor",
    "$dynamicAnchor",
    "$recursiveAnchor",
    "$vocabulary",
    "$defs",
    "definitions",
    "title",
    "description",
    "examples",
    "deprecated",
    "readOnly",
    "writeOnly",
];

/// Merged like annotations although they are not listed in [`ANNOTATIONS`]
const RIGHT_WINS: &[&str] = &["default"];

const LOWER_BOUNDS: &[&str] = &["minimum", "minLength", "minItems", "minProperties"];
const UPPER_BOUNDS: &[&str] = &["maximum", "maxLength", "maxItems", "maxProperties"];

/// Keywords that close an object against properties they do not declare
const PROPERTY_CLOSERS: &[&str] = &["additionalProperties", "unevaluatedProperties"];

const CONDITIONAL: &[&str] = &["if", "then", "else"];

const REFERENCES: &[&str] = &["$ref", "$dynamicRef", "$recursiveRef"];

static TRUE: Value = Value::Bool(true);

/// Keywords whose value is instance data rather than a schema
const DATA_KEYWORDS: &[&str] = &["const", "enum", "default", "examples"];

/// Merge schema `b` into schema `a`
pub fn merge_schemas(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Bool(false), _) | (_, Value::Bool(false)) => Value::Bool(false),
        (Value::Bool(true), other) | (other, Value::Bool(true)) => other.clone(),
        (Value::Object(left), Value::Object(right)) if is_reference_pair(left, right) => {
            json!({ "allOf": [a, b] })
        }
        (Value::Object(a), Value::Object(b)) => Value::Object(merge_maps(a, b)),
        (_, b) => b.clone(),
    }
}

/// A reference next to constraints of the other side stays a separate branch;
/// drafts up to 7 would otherwise ignore those constraints.
fn is_reference_pair(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    let referencing = |map: &Map<String, Value>| REFERENCES.iter().any(|key| map.contains_key(*key));
    let constrained = |map: &Map<String, Value>| map.keys().any(|key| !ANNOTATIONS.contains(&key.as_str()));
    (referencing(a) || referencing(b)) && constrained(a) && constrained(b)
}

fn merge_maps(a: &Map<String, Value>, b: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = a.clone();
    let mut right = b.clone();
    let mut conflicts = Map::new();

    split_draft4_bounds(a, &mut right, &mut conflicts);
    split_closed_properties(a, &mut right, &mut conflicts);
    let conditional = merge_conditionals(a, &mut right);

    for (key, value) in right {
        let Some(left) = merged.get(&key) else {
            merged.insert(key, value);
            continue;
        };
        match merge_keyword(&key, left, &value) {
            Some(next) => {
                merged.insert(key, next);
            }
            None => {
                conflicts.insert(key, value);
            }
        }
    }

    if let Some(conditional) = conditional {
        for key in CONDITIONAL {
            merged.remove(*key);
        }
        merged.extend(conditional);
    }
    if !conflicts.is_empty() {
        add_branch(&mut merged, Value::Object(conflicts));
    }
    merged
}

/// Combine one keyword present on both sides, `None` when it cannot be folded
fn merge_keyword(key: &str, left: &Value, right: &Value) -> Option<Value> {
    if json_equal(left, right) {
        return Some(left.clone());
    }
    if SCHEMA_MAPS.contains(&key) {
        return merge_schema_maps(left, right);
    }
    if ANNOTATIONS.contains(&key) || RIGHT_WINS.contains(&key) {
        return Some(right.clone());
    }
    if LOWER_BOUNDS.contains(&key) {
        return tighter(left, right, Ordering::Greater);
    }
    if UPPER_BOUNDS.contains(&key) {
        return tighter(left, right, Ordering::Less);
    }
    match (key, left, right) {
        ("required", Value::Array(left), Value::Array(right)) => Some(Value::Array(union(left, right))),
        ("allOf", Value::Array(left), Value::Array(right)) => {
            Some(Value::Array(left.iter().chain(right).cloned().collect()))
        }
        ("anyOf" | "oneOf", Value::Array(left), Value::Array(right)) => Some(Value::Array(
            left.iter()
                .flat_map(|l| right.iter().map(move |r| merge_schemas(l, r)))
                .collect(),
        )),
        ("not", left, right) => Some(json!({ "anyOf": [left, right] })),
        ("type", left, right) => intersect_types(left, right),
        ("enum", Value::Array(left), Value::Array(right)) => Some(Value::Array(
            left.iter()
                .filter(|item| right.iter().any(|other| json_equal(item, other)))
                .cloned()
                .collect(),
        )),
        ("exclusiveMinimum", Value::Number(_), Value::Number(_)) => tighter(left, right, Ordering::Greater),
        ("exclusiveMaximum", Value::Number(_), Value::Number(_)) => tighter(left, right, Ordering::Less),
        ("uniqueItems", Value::Bool(left), Value::Bool(right)) => Some(Value::Bool(*left || *right)),
        ("items" | "prefixItems", Value::Array(left), Value::Array(right)) if left.len() == right.len() => {
            Some(Value::Array(
                left.iter().zip(right).map(|(l, r)| merge_schemas(l, r)).collect(),
            ))
        }
        ("items", Value::Array(_), _) | ("items", _, Value::Array(_)) => None,
        ("dependentRequired", Value::Object(left), Value::Object(right)) => {
            let mut entries = left.clone();
            for (name, names) in right {
                let entry = match (entries.get(name), names) {
                    (Some(Value::Array(existing)), Value::Array(names)) => Value::Array(union(existing, names)),
                    _ => names.clone(),
                };
                entries.insert(name.clone(), entry);
            }
            Some(Value::Object(entries))
        }
        ("dependencies", Value::Object(left), Value::Object(right)) => {
            let mut entries = left.clone();
            for (name, dependency) in right {
                let entry = match entries.get(name) {
                    Some(existing) => merge_dependency(existing, dependency),
                    None => dependency.clone(),
                };
                entries.insert(name.clone(), entry);
            }
            Some(Value::Object(entries))
        }
        _ if SCHEMA_VALUES.contains(&key) => Some(merge_schemas(left, right)),
        _ => None,
    }
}

fn merge_schema_maps(left: &Value, right: &Value) -> Option<Value> {
    let (Value::Object(left), Value::Object(right)) = (left, right) else {
        return None;
    };
    let mut entries = left.clone();
    for (name, schema) in right {
        let entry = match entries.get(name) {
            Some(existing) => merge_schemas(existing, schema),
            None => schema.clone(),
        };
        entries.insert(name.clone(), entry);
    }
    Some(Value::Object(entries))
}

/// A property list dependency is the schema `{"required": [...]}`
fn merge_dependency(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Array(left), Value::Array(right)) => Value::Array(union(left, right)),
        (Value::Array(names), schema) | (schema, Value::Array(names)) => {
            merge_schemas(schema, &json!({ "required": names }))
        }
        (left, right) => merge_schemas(left, right),
    }
}

fn union(left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut union = left.to_vec();
    for item in right {
        if !union.contains(item) {
            union.push(item.clone());
        }
    }
    union
}

/// The stricter of two numeric bounds; `wanted` is how the stricter compares
fn tighter(left: &Value, right: &Value, wanted: Ordering) -> Option<Value> {
    let ordering = left.as_f64()?.partial_cmp(&right.as_f64()?)?;
    if ordering == wanted || ordering == Ordering::Equal {
        Some(left.clone())
    } else {
        Some(right.clone())
    }
}

/// Intersection of two `type` values; `integer` is a subset of `number`
fn intersect_types(left: &Value, right: &Value) -> Option<Value> {
    fn names(value: &Value) -> Option<Vec<&str>> {
        match value {
            Value::String(name) => Some(vec![name.as_str()]),
            Value::Array(items) => items.iter().map(Value::as_str).collect(),
            _ => None,
        }
    }
    let (left, right) = (names(left)?, names(right)?);
    let mut types = Vec::new();
    for &l in &left {
        for &r in &right {
            let common = match (l, r) {
                (l, r) if l == r => l,
                ("integer", "number") | ("number", "integer") => "integer",
                _ => continue,
            };
            if !types.contains(&common) {
                types.push(common);
            }
        }
    }
    Some(match types.as_slice() {
        [single] => json!(single),
        _ => json!(types),
    })
}

/// Draft 4 bounds take their exclusiveness from a boolean sibling, so a
/// differing pair moves to the extra branch as a whole.
fn split_draft4_bounds(a: &Map<String, Value>, right: &mut Map<String, Value>, conflicts: &mut Map<String, Value>) {
    for (bound, flag) in [("minimum", "exclusiveMinimum"), ("maximum", "exclusiveMaximum")] {
        let left_flagged = a.get(flag).is_some_and(Value::is_boolean);
        let right_flagged = right.get(flag).is_some_and(Value::is_boolean);
        if !(left_flagged || right_flagged) {
            continue;
        }
        if !right.contains_key(bound) {
            if right_flagged {
                right.remove(flag);
            }
            continue;
        }
        if !a.contains_key(bound) || (a.get(bound) == right.get(bound) && a.get(flag) == right.get(flag)) {
            continue;
        }
        for key in [bound, flag] {
            if let Some(value) = right.remove(key) {
                conflicts.insert(key.to_string(), value);
            }
        }
    }
}

/// `additionalProperties` and `unevaluatedProperties` depend on the property
/// names declared next to them. When the two sides declare different names
/// the right-hand object keywords stay together in the extra branch.
fn split_closed_properties(
    a: &Map<String, Value>,
    right: &mut Map<String, Value>,
    conflicts: &mut Map<String, Value>,
) {
    let closes = |map: &Map<String, Value>| {
        PROPERTY_CLOSERS
            .iter()
            .any(|key| map.get(*key).is_some_and(|value| value != &Value::Bool(true)))
    };
    let declares_more = |map: &Map<String, Value>, other: &Map<String, Value>| {
        ["properties", "patternProperties"].iter().any(|key| {
            let theirs = other.get(*key).and_then(Value::as_object);
            map.get(*key)
                .and_then(Value::as_object)
                .is_some_and(|names| names.keys().any(|name| !theirs.is_some_and(|t| t.contains_key(name))))
        })
    };
    let conflicting = {
        let right = &*right;
        (closes(a) && declares_more(right, a)) || (closes(right) && declares_more(a, right))
    };
    if !conflicting {
        return;
    }
    for key in ["properties", "patternProperties", "additionalProperties", "unevaluatedProperties"] {
        if let Some(value) = right.remove(key) {
            conflicts.insert(key.to_string(), value);
        }
    }
}

/// Resolve `if`/`then`/`else` when both sides branch.
///
/// The right-hand conditional is nested into both outcomes of the left one.
/// Returns the replacement keywords, or `None` when the regular per-keyword
/// merge applies.
fn merge_conditionals(a: &Map<String, Value>, right: &mut Map<String, Value>) -> Option<Map<String, Value>> {
    if !right.contains_key("if") {
        for key in ["then", "else"] {
            right.remove(key);
        }
        return None;
    }
    let nested: Map<String, Value> = CONDITIONAL
        .iter()
        .filter_map(|key| right.remove(*key).map(|value| (key.to_string(), value)))
        .collect();
    let Some(condition) = a.get("if") else {
        return Some(nested);
    };
    let nested = Value::Object(nested);
    let mut conditional = Map::new();
    conditional.insert("if".to_string(), condition.clone());
    for key in ["then", "else"] {
        let outcome = a.get(key).unwrap_or(&TRUE);
        conditional.insert(key.to_string(), merge_schemas(outcome, &nested));
    }
    Some(conditional)
}

/// Require `extra` next to the merged keywords without merging it into them
fn add_branch(merged: &mut Map<String, Value>, extra: Value) {
    match merged.get_mut("anyOf") {
        Some(Value::Array(branches)) => {
            for branch in branches.iter_mut() {
                *branch = merge_schemas(branch, &extra);
            }
        }
        _ => {
            merged.insert("anyOf".to_string(), json!([extra]));
        }
    }
}

/// Copy of `schema` without the given keywords
pub fn without_keywords(schema: &Value, keywords: &[&str]) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !keywords.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Check if a schema constrains data beyond annotations
pub fn has_constraints(schema: &Value) -> bool {
    match schema {
        Value::Object(map) => map.keys().any(|key| !ANNOTATIONS.contains(&key.as_str())),
        Value::Bool(value) => !value,
        _ => false,
    }
}

/// Copy of `schema` whose reference tokens no longer depend on where it sits.
///
/// Merged schemas are compiled in place of the node they replace, which may
/// belong to another document. Every `$ref`, `$dynamicRef` and
/// `$recursiveRef` is joined with the scope in effect at its own location,
/// and nested identifiers become absolute. The top-level identifier is
/// dropped; `scope` already includes it.
pub fn with_absolute_references(schema: &Value, scope: &str, dialect: Dialect) -> Value {
    match schema {
        Value::Object(map) => {
            let mut map = map.clone();
            map.remove(dialect.id_keyword());
            absolute_references(&Value::Object(map), scope, dialect)
        }
        other => other.clone(),
    }
}

fn absolute_references(value: &Value, scope: &str, dialect: Dialect) -> Value {
    let map = match value {
        Value::Object(map) => map,
        Value::Array(items) => {
            return Value::Array(
                items
                    .iter()
                    .map(|item| absolute_references(item, scope, dialect))
                    .collect(),
            );
        }
        other => return other.clone(),
    };

    let id_keyword = dialect.id_keyword();
    let declared = map
        .get(id_keyword)
        .and_then(Value::as_str)
        .filter(|_| !(dialect.ref_overrides_siblings() && map.contains_key("$ref")));
    let scope = match declared {
        Some(id) => join_scope(Some(scope), Some(id)),
        None => scope.to_string(),
    };

    let mut rewritten = Map::with_capacity(map.len());
    for (key, item) in map {
        let item = match item {
            Value::String(token) if REFERENCES.contains(&key.as_str()) => {
                Value::String(join_scope(Some(&scope), Some(token)))
            }
            Value::String(token) if key == id_keyword && declared.is_some() && !token.starts_with('#') => {
                Value::String(strip_fragment(&scope).to_string())
            }
            _ if DATA_KEYWORDS.contains(&key.as_str()) => item.clone(),
            _ => absolute_references(item, &scope, dialect),
        };
        rewritten.insert(key.clone(), item);
    }
    Value::Object(rewritten)
}
