use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

use crate::error::{PathwireError, Result};
use crate::units::{Quantity, QuantityDict};

/// A native value with a wire representation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Enum(EnumMember),
    Quantity(Quantity),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Converts plain JSON into a value: numbers become `Int` when they fit an
    /// `i64` and `Float` otherwise, objects become `Dict`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Dict(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Plain JSON view of the value. Enum members collapse to their name and
    /// quantities to a `{magnitude, unit}` record.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::None => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Enum(member) => serde_json::Value::String(member.member().to_string()),
            Value::Quantity(q) => {
                let QuantityDict { magnitude, unit } = q.to_dict();
                serde_json::json!({ "magnitude": magnitude, "unit": unit })
            }
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Dict(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// A member of an enumeration, carried together with the full member table of
/// its enumeration so the receiving side needs no shared definition.
///
/// Equality ignores the docstring.
#[derive(Debug, Clone)]
pub struct EnumMember {
    name: String,
    member: String,
    members: IndexMap<String, serde_json::Value>,
    doc: Option<String>,
    coloured: bool,
}

impl PartialEq for EnumMember {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.member == other.member
            && self.members == other.members
            && self.coloured == other.coloured
    }
}

impl EnumMember {
    /// Fails if `member` is not a key of `members`.
    pub fn new(
        name: impl Into<String>,
        member: impl Into<String>,
        members: IndexMap<String, serde_json::Value>,
    ) -> Result<Self> {
        let name = name.into();
        let member = member.into();
        if !members.contains_key(&member) {
            return Err(PathwireError::Serialization(format!(
                "'{}' is not a member of enum '{}'",
                member, name
            )));
        }
        Ok(Self {
            name,
            member,
            members,
            doc: None,
            coloured: false,
        })
    }

    /// Builds a member from `(name, value)` pairs in declaration order.
    pub fn from_pairs<I, K, V>(name: &str, member: &str, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        let members = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(name, member, members)
    }

    /// Sets the enumeration's docstring.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Marks the enumeration as one whose members are display colours.
    pub fn coloured(mut self) -> Self {
        self.coloured = true;
        self
    }

    /// Name of the enumeration type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the selected member.
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Value of the selected member.
    pub fn value(&self) -> &serde_json::Value {
        // `new` guarantees the key is present.
        &self.members[self.member.as_str()]
    }

    pub fn members(&self) -> &IndexMap<String, serde_json::Value> {
        &self.members
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn is_coloured(&self) -> bool {
        self.coloured
    }

    /// The sibling member called `member`, sharing this member's table.
    pub fn select(&self, member: &str) -> Result<Self> {
        let mut other = Self::new(self.name.clone(), member, self.members.clone())?;
        other.doc = self.doc.clone();
        other.coloured = self.coloured;
        Ok(other)
    }
}

/// A borrowed view of a native value, as one of the shapes the wire can carry.
pub enum Shape<'a> {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
    Enum(&'a EnumMember),
    Quantity(&'a Quantity),
    List(Vec<&'a dyn Encodable>),
    Dict(Vec<(&'a str, &'a dyn Encodable)>),
    /// No wire mapping; carries the name of the offending type.
    Unsupported(&'static str),
}

impl Shape<'_> {
    /// The wire tag this shape encodes to.
    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::None => "NoneType",
            Shape::Bool(_) => "bool",
            Shape::Int(_) => "int",
            Shape::Float(_) => "float",
            Shape::Str(_) => "str",
            Shape::Enum(e) if e.is_coloured() => "ColouredEnum",
            Shape::Enum(_) => "Enum",
            Shape::Quantity(_) => "Quantity",
            Shape::List(_) => "list",
            Shape::Dict(_) => "dict",
            Shape::Unsupported(name) => *name,
        }
    }
}

/// A native value the encoder can walk.
pub trait Encodable {
    fn shape(&self) -> Shape<'_>;

    /// The description attached to this particular value. Defaults to the
    /// generic description of its shape.
    fn doc(&self) -> Option<&str> {
        type_doc(&self.shape())
    }
}

/// Generic description shared by every value of a shape.
pub fn type_doc(shape: &Shape<'_>) -> Option<&'static str> {
    match shape {
        Shape::None => Some("The type of the None singleton."),
        Shape::Bool(_) => Some("A boolean, either true or false."),
        Shape::Int(_) => Some("A signed 64-bit integer."),
        Shape::Float(_) => Some("A 64-bit floating point number."),
        Shape::Str(_) => Some("A UTF-8 encoded string."),
        Shape::Quantity(_) => Some("A magnitude paired with a physical unit."),
        Shape::List(_) => Some("An ordered sequence of values."),
        Shape::Dict(_) => Some("A mapping from string keys to values."),
        Shape::Enum(_) | Shape::Unsupported(_) => None,
    }
}

/// Attaches an instance description to a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Documented<T> {
    pub value: T,
    pub doc: String,
}

impl<T> Documented<T> {
    pub fn new(value: T, doc: impl Into<String>) -> Self {
        Self {
            value,
            doc: doc.into(),
        }
    }
}

impl<T: Encodable> Encodable for Documented<T> {
    fn shape(&self) -> Shape<'_> {
        self.value.shape()
    }

    fn doc(&self) -> Option<&str> {
        Some(&self.doc)
    }
}

impl Encodable for Value {
    fn shape(&self) -> Shape<'_> {
        match self {
            Value::None => Shape::None,
            Value::Bool(b) => Shape::Bool(*b),
            Value::Int(i) => Shape::Int(*i),
            Value::Float(f) => Shape::Float(*f),
            Value::Str(s) => Shape::Str(s),
            Value::Enum(e) => Shape::Enum(e),
            Value::Quantity(q) => Shape::Quantity(q),
            Value::List(items) => items.shape(),
            Value::Dict(map) => map.shape(),
        }
    }
}

impl Encodable for serde_json::Value {
    fn shape(&self) -> Shape<'_> {
        match self {
            serde_json::Value::Null => Shape::None,
            serde_json::Value::Bool(b) => Shape::Bool(*b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Shape::Int(i),
                (None, Some(f)) if n.is_f64() => Shape::Float(f),
                _ => Shape::Unsupported("serde_json::Number"),
            },
            serde_json::Value::String(s) => Shape::Str(s),
            serde_json::Value::Array(items) => items.shape(),
            serde_json::Value::Object(map) => Shape::Dict(
                map.iter()
                    .map(|(k, v)| (k.as_str(), v as &dyn Encodable))
                    .collect(),
            ),
        }
    }
}

impl Encodable for EnumMember {
    fn shape(&self) -> Shape<'_> {
        Shape::Enum(self)
    }

    fn doc(&self) -> Option<&str> {
        EnumMember::doc(self)
    }
}

impl Encodable for Quantity {
    fn shape(&self) -> Shape<'_> {
        Shape::Quantity(self)
    }
}

impl Encodable for () {
    fn shape(&self) -> Shape<'_> {
        Shape::None
    }
}

impl Encodable for bool {
    fn shape(&self) -> Shape<'_> {
        Shape::Bool(*self)
    }
}

macro_rules! encodable_int {
    ($($t:ty),*) => {
        $(
            impl Encodable for $t {
                fn shape(&self) -> Shape<'_> {
                    i64::try_from(*self).map_or(Shape::Unsupported(stringify!($t)), Shape::Int)
                }
            }
        )*
    };
}

encodable_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Encodable for f32 {
    fn shape(&self) -> Shape<'_> {
        Shape::Float(f64::from(*self))
    }
}

impl Encodable for f64 {
    fn shape(&self) -> Shape<'_> {
        Shape::Float(*self)
    }
}

impl Encodable for str {
    fn shape(&self) -> Shape<'_> {
        Shape::Str(self)
    }
}

impl Encodable for String {
    fn shape(&self) -> Shape<'_> {
        Shape::Str(self)
    }
}

impl<T: Encodable + ?Sized> Encodable for &T {
    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }

    fn doc(&self) -> Option<&str> {
        (**self).doc()
    }
}

impl<T: Encodable + ?Sized> Encodable for Box<T> {
    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }

    fn doc(&self) -> Option<&str> {
        (**self).doc()
    }
}

impl<T: Encodable> Encodable for Option<T> {
    fn shape(&self) -> Shape<'_> {
        match self {
            Some(v) => v.shape(),
            None => Shape::None,
        }
    }

    fn doc(&self) -> Option<&str> {
        match self {
            Some(v) => v.doc(),
            None => type_doc(&Shape::None),
        }
    }
}

impl<T: Encodable> Encodable for [T] {
    fn shape(&self) -> Shape<'_> {
        Shape::List(self.iter().map(|v| v as &dyn Encodable).collect())
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn shape(&self) -> Shape<'_> {
        self.as_slice().shape()
    }
}

impl<T: Encodable, const N: usize> Encodable for [T; N] {
    fn shape(&self) -> Shape<'_> {
        self.as_slice().shape()
    }
}

impl<T: Encodable> Encodable for BTreeMap<String, T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Dict(
            self.iter()
                .map(|(k, v)| (k.as_str(), v as &dyn Encodable))
                .collect(),
        )
    }
}

impl<T: Encodable, S> Encodable for HashMap<String, T, S> {
    fn shape(&self) -> Shape<'_> {
        Shape::Dict(
            self.iter()
                .map(|(k, v)| (k.as_str(), v as &dyn Encodable))
                .collect(),
        )
    }
}

impl<T: Encodable, S> Encodable for IndexMap<String, T, S> {
    fn shape(&self) -> Shape<'_> {
        Shape::Dict(
            self.iter()
                .map(|(k, v)| (k.as_str(), v as &dyn Encodable))
                .collect(),
        )
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<EnumMember> for Value {
    fn from(v: EnumMember) -> Self {
        Value::Enum(v)
    }
}

impl From<Quantity> for Value {
    fn from(v: Quantity) -> Self {
        Value::Quantity(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

impl<T: Into<Value>> FromIterator<(String, T)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Value::Dict(iter.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}
