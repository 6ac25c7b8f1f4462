use std::collections::BTreeMap;

use crate::error::{PathwireError, Result};
use crate::node::{Payload, WireNode};
use crate::value::{Encodable, EnumMember, Shape, type_doc};

/// Deepest container nesting the encoder walks before giving up.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Docstring every enumeration gets when its author wrote none.
pub const ENUM_PLACEHOLDER_DOC: &str = "An enumeration.";

/// Returns the description of `value` when it differs from the generic
/// description of its type, and `None` otherwise.
pub fn attribute_doc(value: &dyn Encodable) -> Option<String> {
    instance_doc(value.doc(), &value.shape())
}

fn instance_doc(doc: Option<&str>, shape: &Shape<'_>) -> Option<String> {
    if doc == type_doc(shape) {
        None
    } else {
        doc.map(str::to_string)
    }
}

/// Walks native values into [`WireNode`] trees.
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    max_depth: usize,
}

impl Default for Serializer {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn serialize_object(&self, value: &dyn Encodable, access_path: &str) -> Result<WireNode> {
        self.walk(value, access_path, 0)
    }

    fn walk(&self, value: &dyn Encodable, access_path: &str, depth: usize) -> Result<WireNode> {
        if depth > self.max_depth {
            return Err(PathwireError::Serialization(format!(
                "nesting deeper than {} levels at '{}'",
                self.max_depth, access_path
            )));
        }

        let shape = value.shape();
        let doc = instance_doc(value.doc(), &shape);

        let payload = match shape {
            Shape::List(items) => {
                let value = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.walk(item, &format!("{}[{}]", access_path, i), depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                Payload::List { value }
            }
            Shape::Dict(entries) => {
                let value = entries
                    .into_iter()
                    .map(|(key, item)| {
                        let path = format!("{}[\"{}\"]", access_path, key);
                        Ok((key.to_string(), self.walk(item, &path, depth + 1)?))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()?;
                Payload::Dict { value }
            }
            Shape::Quantity(quantity) if !quantity.magnitude().is_finite() => {
                return Err(PathwireError::Serialization(format!(
                    "Could not serialize quantity with non-finite magnitude {} at '{}'.",
                    quantity.magnitude(),
                    access_path
                )));
            }
            Shape::Quantity(quantity) => Payload::Quantity {
                value: quantity.to_dict(),
            },
            Shape::Enum(member) => return Ok(serialize_enum(member, value.doc(), access_path)),
            Shape::None => Payload::NoneType { value: () },
            Shape::Bool(value) => Payload::Bool { value },
            Shape::Int(value) => Payload::Int { value },
            Shape::Float(value) if !value.is_finite() => {
                return Err(PathwireError::Serialization(format!(
                    "Could not serialize non-finite float {} at '{}'.",
                    value, access_path
                )));
            }
            Shape::Float(value) => Payload::Float { value },
            Shape::Str(value) => Payload::Str {
                value: value.to_string(),
            },
            Shape::Unsupported(type_name) => {
                return Err(PathwireError::Serialization(format!(
                    "Could not serialize object of type {}.",
                    type_name
                )));
            }
        };

        Ok(WireNode::new(access_path, doc, payload))
    }
}

fn serialize_enum(member: &EnumMember, doc: Option<&str>, access_path: &str) -> WireNode {
    let doc = doc
        .filter(|d| *d != ENUM_PLACEHOLDER_DOC)
        .map(str::to_string);
    let name = member.name().to_string();
    let value = member.member().to_string();
    let members = member.members().clone();
    let payload = if member.is_coloured() {
        Payload::ColouredEnum {
            name,
            value,
            members,
        }
    } else {
        Payload::Enum {
            name,
            value,
            members,
        }
    };
    WireNode::new(access_path, doc, payload)
}

/// Encodes `value` at `access_path` with the default depth ceiling.
pub fn encode(value: &dyn Encodable, access_path: &str) -> Result<WireNode> {
    Serializer::default().serialize_object(value, access_path)
}

/// Encodes `value` as a root node.
pub fn dump(value: &dyn Encodable) -> Result<WireNode> {
    encode(value, "")
}
