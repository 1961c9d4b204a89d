//! JSON front end
//!
//! Objects map to elements, arrays to repeated elements of the same name.
//! Keys starting with `@` become attributes and `#text` becomes element text.
//! Scalars become text: booleans as `true`/`false`, `null` as an empty element.

use super::error::{ParseError, ParseResult};
use super::xml::NodeBudget;
use super::ParseOptions;
use crate::model::ConfigNode;
use serde_json::Value;

const ATTRIBUTE_PREFIX: char = '@';
const TEXT_KEY: &str = "#text";

pub(super) fn parse_json(text: &str, options: &ParseOptions) -> ParseResult<ConfigNode> {
    let value: Value = serde_json::from_str(text).map_err(|err| map_error(err, options))?;

    let Value::Object(top) = value else {
        return Err(ParseError::malformed("top-level JSON value must be an object"));
    };

    let root_name = options
        .root_element
        .as_deref()
        .unwrap_or(crate::config::compile_time::document::EXPECTED_ROOT_ELEMENT);

    let mut budget = NodeBudget::new(options.max_nodes);
    budget.take()?;
    let mut root = ConfigNode::new(root_name);
    match top.get(root_name) {
        // `{"pfsense": {...}, ...}`: sibling keys stay as sections under the root
        Some(Value::Object(inner)) => {
            fill_object(&mut root, inner, 1, options.max_depth, &mut budget)?;
            let siblings = top.iter().filter(|(key, _)| key.as_str() != root_name);
            fill_object(&mut root, siblings, 1, options.max_depth, &mut budget)?;
        }
        _ => fill_object(&mut root, &top, 1, options.max_depth, &mut budget)?,
    }
    Ok(root)
}

fn map_error(err: serde_json::Error, options: &ParseOptions) -> ParseError {
    if err.to_string().contains("recursion limit") {
        return ParseError::depth_exceeded(options.max_depth);
    }
    ParseError::malformed(err.to_string())
}

fn fill_object<'a>(
    node: &mut ConfigNode,
    object: impl IntoIterator<Item = (&'a String, &'a Value)>,
    depth: usize,
    max_depth: usize,
    budget: &mut NodeBudget,
) -> ParseResult<()> {
    for (key, value) in object {
        if key == TEXT_KEY {
            if let Some(text) = scalar_text(value) {
                node.append_text(&text);
            }
            continue;
        }
        if let Some(attribute) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            if let Some(text) = scalar_text(value) {
                node.push_attribute(attribute, &text);
            }
            continue;
        }

        match value {
            Value::Array(items) => {
                for item in items {
                    node.push_child(convert(key, item, depth + 1, max_depth, budget)?);
                }
            }
            other => node.push_child(convert(key, other, depth + 1, max_depth, budget)?),
        }
    }
    Ok(())
}

fn convert(
    name: &str,
    value: &Value,
    depth: usize,
    max_depth: usize,
    budget: &mut NodeBudget,
) -> ParseResult<ConfigNode> {
    if depth > max_depth {
        return Err(ParseError::depth_exceeded(max_depth));
    }
    budget.take()?;

    let mut node = ConfigNode::new(name);
    match value {
        Value::Object(object) => fill_object(&mut node, object, depth, max_depth, budget)?,
        // Nested arrays have no element name of their own; reuse the parent's
        Value::Array(items) => {
            for item in items {
                node.push_child(convert(name, item, depth + 1, max_depth, budget)?);
            }
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                node.append_text(&text);
            }
        }
    }
    Ok(node)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
