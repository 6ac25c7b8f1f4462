use indexmap::IndexMap;

use crate::error::{PathwireError, Result};
use crate::node::{Payload, WireNode};
use crate::units::convert_to_quantity;
use crate::value::{EnumMember, Value};

/// Rebuilds the native value a [`WireNode`] describes.
pub fn decode(node: &WireNode) -> Result<Value> {
    let value = match &node.payload {
        Payload::Int { value } => Value::Int(*value),
        Payload::Float { value } => Value::Float(*value),
        Payload::Bool { value } => Value::Bool(*value),
        Payload::Str { value } => Value::Str(value.clone()),
        Payload::NoneType { .. } | Payload::None { .. } => Value::None,
        Payload::Enum {
            name,
            value,
            members,
        } => decode_enum(name, value, members, node.doc.as_deref(), false)?,
        Payload::ColouredEnum {
            name,
            value,
            members,
        } => decode_enum(name, value, members, node.doc.as_deref(), true)?,
        Payload::Quantity { value } => {
            let quantity = convert_to_quantity(value.clone(), "").map_err(|e| match e {
                PathwireError::InvalidUnit(msg) => PathwireError::Deserialization(format!(
                    "bad quantity at '{}': {}",
                    node.full_access_path, msg
                )),
                other => other,
            })?;
            Value::Quantity(quantity)
        }
        Payload::List { value } => Value::List(value.iter().map(decode).collect::<Result<_>>()?),
        Payload::Dict { value } => Value::Dict(
            value
                .iter()
                .map(|(k, v)| Ok((k.clone(), decode(v)?)))
                .collect::<Result<_>>()?,
        ),
    };
    Ok(value)
}

fn decode_enum(
    name: &str,
    member: &str,
    members: &IndexMap<String, serde_json::Value>,
    doc: Option<&str>,
    coloured: bool,
) -> Result<Value> {
    if !members.contains_key(member) {
        return Err(PathwireError::Deserialization(format!(
            "enum '{}' has no member '{}'",
            name, member
        )));
    }
    let mut decoded = EnumMember::new(name, member, members.clone())?;
    if let Some(doc) = doc {
        decoded = decoded.with_doc(doc);
    }
    Ok(Value::Enum(if coloured {
        decoded.coloured()
    } else {
        decoded
    }))
}

/// Parses a raw JSON payload as a wire node and decodes it.
pub fn loads(json: serde_json::Value) -> Result<Value> {
    let node: WireNode = serde_json::from_value(json)
        .map_err(|e| PathwireError::Deserialization(e.to_string()))?;
    decode(&node)
}

/// Like [`loads`], but a missing or `null` payload means "no result" and
/// yields [`Value::None`] without touching the decoder.
pub fn loads_optional(json: Option<serde_json::Value>) -> Result<Value> {
    match json {
        None | Some(serde_json::Value::Null) => Ok(Value::None),
        Some(json) => loads(json),
    }
}

/// Parses JSON text holding a wire node and decodes it.
pub fn loads_str(text: &str) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| PathwireError::Deserialization(e.to_string()))?;
    loads_optional(Some(json))
}
