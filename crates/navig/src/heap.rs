use std::fmt;
use std::sync::Arc;

use im::OrdMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ConsistencyError;

/// Opaque heap address. Only meaningful against the heap it was recorded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(pub u64);

// Heap keys arrive as JSON object keys, and buffered content (under
// `#[serde(flatten)]`) keeps them as strings.
impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AddressVisitor;

        impl<'de> Visitor<'de> for AddressVisitor {
            type Value = Address;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a heap address")
            }

            fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Address, E> {
                Ok(Address(value))
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Address, E> {
                value
                    .parse()
                    .map(Address)
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(value), &self))
            }
        }

        deserializer.deserialize_any(AddressVisitor)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    Number(f64),
    /// A constant tag this crate does not know how to display.
    Unrecognized(Arc<serde_json::Value>),
}

/// Interpreter value as recorded in the trace.
///
/// Anything the producer emits that is not a constant, a reference or a
/// closure is kept verbatim as `Unrecognized` and shown with the generic
/// structured rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Constant(Constant),
    Reference(Address),
    Closure(Arc<serde_json::Value>),
    Unrecognized(Arc<serde_json::Value>),
}

impl Value {
    pub fn bool(value: bool) -> Self {
        Value::Constant(Constant::Bool(value))
    }

    pub fn number(value: f64) -> Self {
        Value::Constant(Constant::Number(value))
    }

    pub fn reference(address: u64) -> Self {
        Value::Reference(Address(address))
    }

    pub fn closure() -> Self {
        Value::Closure(Arc::new(serde_json::json!({ "tag": "val_abs" })))
    }

    pub fn unrecognized(json: serde_json::Value) -> Self {
        Value::Unrecognized(Arc::new(json))
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Unrecognized(Arc::new(serde_json::Value::Null))
    }
}

impl From<serde_json::Value> for Constant {
    fn from(json: serde_json::Value) -> Self {
        match json.get("tag").and_then(|tag| tag.as_str()) {
            Some("cst_bool") => {
                if let Some(value) = json.get("bool").and_then(|v| v.as_bool()) {
                    return Constant::Bool(value);
                }
            }
            Some("cst_number") => {
                if let Some(value) = json.get("number").and_then(|v| v.as_f64()) {
                    return Constant::Number(value);
                }
            }
            _ => {}
        }
        Constant::Unrecognized(Arc::new(json))
    }
}

impl From<Constant> for serde_json::Value {
    fn from(constant: Constant) -> Self {
        match constant {
            Constant::Bool(value) => serde_json::json!({ "tag": "cst_bool", "bool": value }),
            // Non-finite numbers have no JSON spelling and come out as null.
            Constant::Number(value) => serde_json::json!({ "tag": "cst_number", "number": value }),
            Constant::Unrecognized(json) => (*json).clone(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json.get("tag").and_then(|tag| tag.as_str()) {
            Some("val_cst") => {
                if let Some(cst) = json.get("cst") {
                    return Value::Constant(Constant::from(cst.clone()));
                }
            }
            Some("val_loc") => {
                if let Some(address) = json.get("loc").and_then(|loc| loc.as_u64()) {
                    return Value::Reference(Address(address));
                }
            }
            Some("val_abs") => return Value::Closure(Arc::new(json)),
            _ => {}
        }
        Value::Unrecognized(Arc::new(json))
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Constant(constant) => {
                serde_json::json!({ "tag": "val_cst", "cst": serde_json::Value::from(constant) })
            }
            Value::Reference(address) => serde_json::json!({ "tag": "val_loc", "loc": address.0 }),
            Value::Closure(json) | Value::Unrecognized(json) => (*json).clone(),
        }
    }
}

/// Heap object: fields in recording order. A `None` field was recorded
/// without a value and counts as non-existent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    fields: Vec<(String, Option<Value>)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.push((name.to_string(), Some(value)));
        self
    }

    pub fn with_absent(mut self, name: &str) -> Self {
        self.fields.push((name.to_string(), None));
        self
    }

    /// Present field by name; absent fields read as missing.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_ref())
    }
}

pub fn fields_of(object: &Object) -> impl Iterator<Item = (&str, &Value)> {
    object
        .fields
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|value| (name.as_str(), value)))
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Object {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ObjectVisitor;

        impl<'de> Visitor<'de> for ObjectVisitor {
            type Value = Object;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Object, A::Error> {
                let mut fields = Vec::new();
                while let Some((name, value)) = access.next_entry::<String, Option<Value>>()? {
                    fields.push((name, value));
                }
                Ok(Object { fields })
            }
        }

        deserializer.deserialize_map(ObjectVisitor)
    }
}

/// Persistent heap snapshot. Events recorded close together share most of
/// their structure.
pub type Heap = OrdMap<Address, Object>;

pub fn lookup(heap: &Heap, address: Address) -> Result<&Object, ConsistencyError> {
    heap.get(&address)
        .ok_or(ConsistencyError::MissingObject(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_of_skips_absent_fields_and_keeps_order() {
        let object = Object::new()
            .with_field("b", Value::number(1.0))
            .with_absent("gone")
            .with_field("a", Value::bool(true));
        let names: Vec<&str> = fields_of(&object).map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(object.field("gone").is_none());
        assert_eq!(object.field("a"), Some(&Value::bool(true)));
    }

    #[test]
    fn lookup_reports_missing_objects() {
        let heap = Heap::new().update(Address(1), Object::new());
        assert!(lookup(&heap, Address(1)).is_ok());
        assert_eq!(
            lookup(&heap, Address(7)),
            Err(ConsistencyError::MissingObject(Address(7)))
        );
    }

    #[test]
    fn addresses_decode_from_numbers_and_strings() {
        let address: Address = serde_json::from_str("12").expect("number");
        assert_eq!(address, Address(12));
        let address: Address = serde_json::from_str("\"5\"").expect("string");
        assert_eq!(address, Address(5));
        assert!(serde_json::from_str::<Address>("\"x\"").is_err());
    }

    #[test]
    fn decodes_tagged_values() {
        let value: Value = serde_json::from_str(
            r#"{"tag":"val_cst","cst":{"tag":"cst_number","number":2.5}}"#,
        )
        .expect("decode");
        assert_eq!(value, Value::number(2.5));

        let value: Value = serde_json::from_str(r#"{"tag":"val_loc","loc":12}"#).expect("decode");
        assert_eq!(value, Value::reference(12));

        let value: Value =
            serde_json::from_str(r#"{"tag":"val_abs","params":["x"]}"#).expect("decode");
        assert!(matches!(value, Value::Closure(_)));

        let value: Value = serde_json::from_str(r#"{"tag":"val_weird"}"#).expect("decode");
        assert!(matches!(value, Value::Unrecognized(_)));

        let value: Value =
            serde_json::from_str(r#"{"tag":"val_cst","cst":{"tag":"cst_string","string":"s"}}"#)
                .expect("decode");
        assert!(matches!(value, Value::Constant(Constant::Unrecognized(_))));
    }

    #[test]
    fn decodes_objects_with_absent_fields_in_document_order() {
        let object: Object = serde_json::from_str(
            r#"{"z":{"tag":"val_cst","cst":{"tag":"cst_bool","bool":false}},"y":null,"a":{"tag":"val_loc","loc":3}}"#,
        )
        .expect("decode");
        let names: Vec<&str> = fields_of(&object).map(|(name, _)| name).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn decodes_heap_with_numeric_keys() {
        let heap: Heap = serde_json::from_str(r#"{"4":{},"2":{"f":null}}"#).expect("decode");
        assert_eq!(heap.len(), 2);
        assert!(lookup(&heap, Address(4)).is_ok());
        assert_eq!(fields_of(lookup(&heap, Address(2)).expect("object")).count(), 0);
    }
}
