use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::units::QuantityDict;

/// The self-describing unit of the wire format.
///
/// Serializes to an object with `full_access_path`, `doc`, `readonly`, a
/// `type` tag and the tag-specific fields of [`Payload`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireNode {
    #[serde(default)]
    pub full_access_path: String,
    pub doc: Option<String>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(flatten)]
    pub payload: Payload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Payload {
    #[serde(rename = "int")]
    Int { value: i64 },
    #[serde(rename = "float")]
    Float { value: f64 },
    #[serde(rename = "bool")]
    Bool { value: bool },
    #[serde(rename = "str")]
    Str { value: String },
    /// An explicit absence of value.
    NoneType {
        #[serde(default)]
        value: (),
    },
    /// Placeholder for an object that has not been produced yet.
    None {
        #[serde(default)]
        value: (),
    },
    Enum {
        name: String,
        value: String,
        #[serde(rename = "enum")]
        members: IndexMap<String, serde_json::Value>,
    },
    ColouredEnum {
        name: String,
        value: String,
        #[serde(rename = "enum")]
        members: IndexMap<String, serde_json::Value>,
    },
    Quantity { value: QuantityDict },
    #[serde(rename = "list")]
    List { value: Vec<WireNode> },
    #[serde(rename = "dict")]
    Dict { value: BTreeMap<String, WireNode> },
}

impl Payload {
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Int { .. } => "int",
            Payload::Float { .. } => "float",
            Payload::Bool { .. } => "bool",
            Payload::Str { .. } => "str",
            Payload::NoneType { .. } => "NoneType",
            Payload::None { .. } => "None",
            Payload::Enum { .. } => "Enum",
            Payload::ColouredEnum { .. } => "ColouredEnum",
            Payload::Quantity { .. } => "Quantity",
            Payload::List { .. } => "list",
            Payload::Dict { .. } => "dict",
        }
    }
}

impl WireNode {
    pub fn new(full_access_path: impl Into<String>, doc: Option<String>, payload: Payload) -> Self {
        Self {
            full_access_path: full_access_path.into(),
            doc,
            readonly: false,
            payload,
        }
    }

    /// The placeholder node standing in for an object that does not exist yet.
    pub fn empty() -> Self {
        Self::new("", None, Payload::None { value: () })
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }

    /// Child node at list index `index`, if this is a list.
    pub fn item(&self, index: usize) -> Option<&WireNode> {
        match &self.payload {
            Payload::List { value } => value.get(index),
            _ => None,
        }
    }

    /// Child node under `key`, if this is a dict.
    pub fn entry(&self, key: &str) -> Option<&WireNode> {
        match &self.payload {
            Payload::Dict { value } => value.get(key),
            _ => None,
        }
    }
}
