use std::collections::{BTreeMap, HashMap};

use pathwire::node::{Payload, WireNode};
use pathwire::serializer::ENUM_PLACEHOLDER_DOC;
use pathwire::{
    Documented, Encodable, EnumMember, PathwireError, Shape, Value, decode, dump, encode, loads,
};
use serde_json::json;

fn color(member: &str) -> Result<EnumMember, PathwireError> {
    EnumMember::from_pairs("Color", member, [("RED", 1), ("GREEN", 2)])
}

fn dict<const N: usize>(entries: [(&str, Value); N]) -> Value {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[test]
fn concrete_dict_with_float_and_enum() -> Result<(), Box<dyn std::error::Error>> {
    let value = dict([("x", Value::Float(10.2)), ("y", Value::Enum(color("RED")?))]);

    let node = dump(&value)?;
    let json = serde_json::to_value(&node)?;

    assert_eq!(
        json,
        json!({
            "full_access_path": "",
            "doc": null,
            "readonly": false,
            "type": "dict",
            "value": {
                "x": {
                    "full_access_path": "[\"x\"]",
                    "doc": null,
                    "readonly": false,
                    "type": "float",
                    "value": 10.2,
                },
                "y": {
                    "full_access_path": "[\"y\"]",
                    "doc": null,
                    "readonly": false,
                    "type": "Enum",
                    "name": "Color",
                    "value": "RED",
                    "enum": {"RED": 1, "GREEN": 2},
                },
            },
        })
    );
    Ok(())
}

#[test]
fn round_trip_nested_containers() -> Result<(), Box<dyn std::error::Error>> {
    let value = dict([
        ("count", Value::Int(3)),
        ("enabled", Value::Bool(false)),
        ("label", Value::Str("stage".into())),
        ("nothing", Value::None),
        (
            "matrix",
            Value::List(vec![
                Value::List(vec![Value::Int(1), Value::Float(2.5)]),
                Value::List(vec![dict([("deep", Value::List(vec![Value::Str("x".into())]))])]),
            ]),
        ),
        ("mode", Value::Enum(color("GREEN")?)),
    ]);

    assert_eq!(decode(&dump(&value)?)?, value);
    Ok(())
}

#[test]
fn round_trip_through_json_text() -> Result<(), Box<dyn std::error::Error>> {
    let value = Value::List(vec![Value::Float(1.0), Value::Int(1), Value::Enum(color("RED")?)]);
    let text = serde_json::to_string(&dump(&value)?)?;

    let node: WireNode = serde_json::from_str(&text)?;
    assert_eq!(decode(&node)?, value);
    Ok(())
}

#[test]
fn access_path_of_nested_list_element() -> Result<(), Box<dyn std::error::Error>> {
    let value = dict([("a", Value::List(vec![Value::Int(1), Value::Int(2)]))]);
    let node = encode(&value, "")?;

    let second = node
        .entry("a")
        .and_then(|a| a.item(1))
        .ok_or("missing element")?;
    assert_eq!(second.full_access_path, "[\"a\"][1]");
    assert_eq!(second.payload, Payload::Int { value: 2 });
    Ok(())
}

#[test]
fn access_paths_extend_a_non_root_parent() -> Result<(), Box<dyn std::error::Error>> {
    let mut channels = BTreeMap::new();
    channels.insert("ch1".to_string(), vec![0.5, 0.75]);
    let node = encode(&channels, "device.readings")?;

    let element = node
        .entry("ch1")
        .and_then(|c| c.item(0))
        .ok_or("missing element")?;
    assert_eq!(node.full_access_path, "device.readings");
    assert_eq!(element.full_access_path, "device.readings[\"ch1\"][0]");
    Ok(())
}

#[test]
fn enum_table_lists_every_sibling() -> Result<(), Box<dyn std::error::Error>> {
    let member = EnumMember::from_pairs(
        "Axis",
        "Y",
        [("X", json!("x")), ("Y", json!("y")), ("Z", json!("z"))],
    )?;
    let node = dump(&member)?;

    let Payload::Enum { name, value, members } = &node.payload else {
        return Err(format!("expected Enum, got {}", node.type_name()).into());
    };
    assert_eq!(name, "Axis");
    assert_eq!(value, "Y");
    assert_eq!(members.keys().collect::<Vec<_>>(), ["X", "Y", "Z"]);

    let Value::Enum(back) = decode(&node)? else {
        return Err("expected enum value".into());
    };
    assert_eq!(back.member(), "Y");
    assert_eq!(back.value(), &json!("y"));
    assert_eq!(back.members(), member.members());
    Ok(())
}

#[test]
fn coloured_enum_round_trips_with_its_own_tag() -> Result<(), Box<dyn std::error::Error>> {
    let member = EnumMember::from_pairs("Status", "OK", [("OK", "green"), ("FAIL", "red")])?
        .coloured();
    let node = dump(&member)?;
    assert_eq!(node.type_name(), "ColouredEnum");
    assert_eq!(decode(&node)?, Value::Enum(member));
    Ok(())
}

#[test]
fn doc_suppressed_when_equal_to_type_description() -> Result<(), Box<dyn std::error::Error>> {
    assert_eq!(dump(&1.25)?.doc, None);

    let generic = pathwire::value::type_doc(&Shape::Float(0.0)).ok_or("no float doc")?;
    assert_eq!(dump(&Documented::new(1.25, generic))?.doc, None);

    let custom = Documented::new(1.25, "Exposure time of the camera.");
    assert_eq!(
        dump(&custom)?.doc.as_deref(),
        Some("Exposure time of the camera.")
    );
    Ok(())
}

#[test]
fn doc_of_nested_values_is_preserved_per_node() -> Result<(), Box<dyn std::error::Error>> {
    let mut settings: HashMap<String, Documented<i64>> = HashMap::new();
    settings.insert("gain".into(), Documented::new(4, "Amplifier gain."));
    let node = dump(&settings)?;

    assert_eq!(node.doc, None);
    let gain = node.entry("gain").ok_or("missing gain")?;
    assert_eq!(gain.doc.as_deref(), Some("Amplifier gain."));
    assert_eq!(gain.full_access_path, "[\"gain\"]");
    Ok(())
}

#[test]
fn enum_without_docstring_has_no_doc() -> Result<(), Box<dyn std::error::Error>> {
    let member = color("RED")?.with_doc(ENUM_PLACEHOLDER_DOC);
    assert_eq!(dump(&member)?.doc, None);
    assert_eq!(decode(&dump(&member)?)?, Value::Enum(member));
    Ok(())
}

#[test]
fn enum_docstring_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    let value = Value::Enum(color("RED")?.with_doc("Traffic colours."));
    let back = decode(&dump(&value)?)?;
    assert_eq!(back, value);

    let Value::Enum(member) = back else {
        return Err("expected enum value".into());
    };
    assert_eq!(member.doc(), Some("Traffic colours."));
    Ok(())
}

struct SerialPort {
    _fd: i32,
}

impl Encodable for SerialPort {
    fn shape(&self) -> Shape<'_> {
        Shape::Unsupported(std::any::type_name::<Self>())
    }
}

#[test]
fn unsupported_type_is_rejected() {
    let port = SerialPort { _fd: 3 };
    let err = dump(&port);
    match err {
        Err(PathwireError::Serialization(msg)) => assert!(msg.contains("SerialPort")),
        other => panic!("expected serialization error, got {:?}", other),
    }
}

#[test]
fn unsupported_type_inside_container_fails_whole_encode() {
    let port = SerialPort { _fd: 3 };
    let items: Vec<&dyn Encodable> = vec![&1, &port];
    assert!(matches!(dump(&items), Err(PathwireError::Serialization(_))));
}

#[test]
fn integer_out_of_i64_range_is_rejected() {
    assert!(matches!(dump(&u64::MAX), Err(PathwireError::Serialization(_))));
}

#[test]
fn decode_rejects_mismatched_shapes() {
    let bad = json!({
        "full_access_path": "",
        "doc": null,
        "readonly": false,
        "type": "bool",
        "value": "yes",
    });
    assert!(matches!(loads(bad), Err(PathwireError::Deserialization(_))));
}

#[test]
fn decoding_server_payload_with_missing_metadata() -> Result<(), Box<dyn std::error::Error>> {
    let minimal = json!({"type": "int", "value": 7, "doc": null});
    assert_eq!(loads(minimal)?, Value::Int(7));
    Ok(())
}

#[test]
fn empty_placeholder_is_distinct_from_none_type() -> Result<(), Box<dyn std::error::Error>> {
    let placeholder = WireNode::empty();
    let absent = dump(&Value::None)?;
    assert_eq!(placeholder.type_name(), "None");
    assert_eq!(absent.type_name(), "NoneType");
    assert_ne!(placeholder, absent);
    assert_eq!(decode(&placeholder)?, decode(&absent)?);
    Ok(())
}

#[test]
fn encoding_is_repeatable() -> Result<(), Box<dyn std::error::Error>> {
    let value = dict([("a", Value::Int(1)), ("b", Value::Float(0.5))]);
    assert_eq!(dump(&value)?, dump(&value)?);
    Ok(())
}
