//! Tagwire Message
//! The in-memory field container: an ordered, duplicate-tolerant sequence
//! of typed fields, each with an optional name and/or ordinal.

use std::hash::{Hash, Hasher};

use crate::dictionary;
use crate::error::{WireError, WireResult};
use crate::taxonomy::Taxonomy;
use crate::types::WireTypeId;
use crate::value::Value;

/// One (type, value, name?, ordinal?) entry within a message.
///
/// All four name/ordinal combinations are legal. When both are present the
/// ordinal is the authoritative wire identity and the name is advisory.
/// Fields are immutable once constructed; replace the field in its container
/// to change a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: Option<String>,
    ordinal: Option<i16>,
    type_id: u8,
    value: Value,
}

impl Field {
    /// Build a field, inferring the wire type from the value and storing
    /// integers at their smallest exact width.
    pub fn new(name: Option<String>, ordinal: Option<i16>, value: impl Into<Value>) -> Field {
        let value = dictionary::minimize(value.into());
        Field {
            name,
            ordinal,
            type_id: dictionary::best_match(&value),
            value,
        }
    }

    /// Build a field with an explicit wire type. No minimization is applied;
    /// the value shape must be compatible with the declared type.
    pub fn with_type(
        type_id: u8,
        name: Option<String>,
        ordinal: Option<i16>,
        value: Value,
    ) -> WireResult<Field> {
        if !value_matches_type(type_id, &value) {
            return Err(WireError::invalid(format!(
                "value shape {} is not compatible with wire type {}",
                value.shape_name(),
                type_id
            )));
        }
        Ok(Field {
            name,
            ordinal,
            type_id,
            value,
        })
    }

    /// Construct from already-decoded wire data; the codec guarantees the
    /// shape matches the type it decoded.
    pub(crate) fn from_wire(
        name: Option<String>,
        ordinal: Option<i16>,
        type_id: u8,
        value: Value,
    ) -> Field {
        Field {
            name,
            ordinal,
            type_id,
            value,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ordinal(&self) -> Option<i16> {
        self.ordinal
    }

    pub fn type_id(&self) -> u8 {
        self.type_id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Whether a value's runtime shape can be carried by the given wire type.
fn value_matches_type(type_id: u8, value: &Value) -> bool {
    let Some(standard) = WireTypeId::from_u8(type_id) else {
        // Application types carry opaque payloads with a matching id.
        return matches!(value, Value::Opaque { type_id: t, .. } if *t == type_id);
    };
    match standard {
        WireTypeId::Indicator => matches!(value, Value::Indicator),
        WireTypeId::Boolean => matches!(value, Value::Boolean(_)),
        WireTypeId::Int8 => matches!(value, Value::Int8(_)),
        WireTypeId::Int16 => matches!(value, Value::Int16(_)),
        WireTypeId::Int32 => matches!(value, Value::Int32(_)),
        WireTypeId::Int64 => matches!(value, Value::Int64(_)),
        WireTypeId::Float32 => matches!(value, Value::Float32(_)),
        WireTypeId::Float64 => matches!(value, Value::Float64(_)),
        WireTypeId::ByteArray => matches!(value, Value::Bytes(_)),
        WireTypeId::Int16Array => matches!(value, Value::Int16Array(_)),
        WireTypeId::Int32Array => matches!(value, Value::Int32Array(_)),
        WireTypeId::Int64Array => matches!(value, Value::Int64Array(_)),
        WireTypeId::Float32Array => matches!(value, Value::Float32Array(_)),
        WireTypeId::Float64Array => matches!(value, Value::Float64Array(_)),
        WireTypeId::Text => matches!(value, Value::Text(_)),
        WireTypeId::SubMessage => matches!(value, Value::Message(_)),
        WireTypeId::Date => matches!(value, Value::Date(_)),
        WireTypeId::Time => matches!(value, Value::Time(_)),
        WireTypeId::DateTime => matches!(value, Value::DateTime(_)),
        fixed if fixed.is_byte_array() => {
            matches!(value, Value::Bytes(b) if Some(b.len()) == fixed.fixed_size())
        }
        _ => false,
    }
}

/// An ordered field container. Insertion order is preserved through any
/// lossless round-trip, and duplicate names or ordinals are permitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: Vec<Field>,
}

impl Message {
    /// Create a new empty message
    pub fn new() -> Self {
        Message { fields: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Message {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a named field, minimizing integer values to their smallest
    /// exact wire type.
    pub fn add(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.fields
            .push(Field::new(Some(name.to_string()), None, value));
        self
    }

    /// Append an ordinal-addressed field.
    pub fn add_at(&mut self, ordinal: i16, value: impl Into<Value>) -> &mut Self {
        self.fields.push(Field::new(None, Some(ordinal), value));
        self
    }

    /// Append a field carrying both a name and an ordinal.
    pub fn add_named_at(&mut self, name: &str, ordinal: i16, value: impl Into<Value>) -> &mut Self {
        self.fields
            .push(Field::new(Some(name.to_string()), Some(ordinal), value));
        self
    }

    /// Append an anonymous field (no name, no ordinal).
    pub fn add_anonymous(&mut self, value: impl Into<Value>) -> &mut Self {
        self.fields.push(Field::new(None, None, value));
        self
    }

    /// Append a pre-built field (explicit type, decoded data, etc).
    pub fn add_field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// First field with the given name, in insertion order.
    pub fn by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == Some(name))
    }

    /// All fields with the given name, in insertion order.
    pub fn all_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> {
        self.fields.iter().filter(move |f| f.name() == Some(name))
    }

    /// First field with the given ordinal, in insertion order.
    pub fn by_ordinal(&self, ordinal: i16) -> Option<&Field> {
        self.fields.iter().find(|f| f.ordinal() == Some(ordinal))
    }

    /// All fields with the given ordinal, in insertion order.
    pub fn all_by_ordinal(&self, ordinal: i16) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(move |f| f.ordinal() == Some(ordinal))
    }

    /// Remove every field with the given name; returns how many were removed.
    pub fn remove_by_name(&mut self, name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| f.name() != Some(name));
        before - self.fields.len()
    }

    /// Remove every field with the given ordinal; returns how many were removed.
    pub fn remove_by_ordinal(&mut self, ordinal: i16) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| f.ordinal() != Some(ordinal));
        before - self.fields.len()
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Attach taxonomy-derived names to every field that has an ordinal but
    /// no name, recursing into sub-messages. Ordinals are never touched, and
    /// reapplying the same taxonomy is a no-op.
    pub fn apply_taxonomy_names(&mut self, taxonomy: &dyn Taxonomy) {
        for field in &mut self.fields {
            if field.name.is_none() {
                if let Some(ordinal) = field.ordinal {
                    if let Some(name) = taxonomy.name_for(ordinal) {
                        field.name = Some(name.to_string());
                    }
                }
            }
            if let Value::Message(sub) = &mut field.value {
                sub.apply_taxonomy_names(taxonomy);
            }
        }
    }

    // Typed getters. A missing field is NotFound; a present field whose
    // value cannot be converted reports Overflow or Unsupported from the
    // dictionary conversion rules.

    fn field_or_not_found(&self, name: &str) -> WireResult<&Field> {
        self.by_name(name)
            .ok_or_else(|| WireError::NotFound(name.to_string()))
    }

    pub fn get_string(&self, name: &str) -> WireResult<String> {
        dictionary::coerce_string(self.field_or_not_found(name)?.value())
    }

    pub fn get_bool(&self, name: &str) -> WireResult<bool> {
        dictionary::coerce_bool(self.field_or_not_found(name)?.value())
    }

    pub fn get_i8(&self, name: &str) -> WireResult<i8> {
        dictionary::coerce_i8(self.field_or_not_found(name)?.value())
    }

    pub fn get_i16(&self, name: &str) -> WireResult<i16> {
        dictionary::coerce_i16(self.field_or_not_found(name)?.value())
    }

    pub fn get_i32(&self, name: &str) -> WireResult<i32> {
        dictionary::coerce_i32(self.field_or_not_found(name)?.value())
    }

    pub fn get_i64(&self, name: &str) -> WireResult<i64> {
        dictionary::coerce_i64(self.field_or_not_found(name)?.value())
    }

    pub fn get_f32(&self, name: &str) -> WireResult<f32> {
        dictionary::coerce_f32(self.field_or_not_found(name)?.value())
    }

    pub fn get_f64(&self, name: &str) -> WireResult<f64> {
        dictionary::coerce_f64(self.field_or_not_found(name)?.value())
    }

    pub fn get_bytes(&self, name: &str) -> WireResult<Vec<u8>> {
        dictionary::coerce_bytes(self.field_or_not_found(name)?.value())
    }

    pub fn get_message(&self, name: &str) -> WireResult<&Message> {
        match self.field_or_not_found(name)?.value() {
            Value::Message(m) => Ok(m),
            other => Err(WireError::Unsupported {
                from: other.shape_name(),
                to: "message",
            }),
        }
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Hashing is intentionally weak: it covers only the field count, for
/// compatibility with the existing container contract. Messages are not
/// meant to be used as hash-map keys at scale; equality remains full
/// structural comparison.
impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.fields.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_minimizes() {
        let mut msg = Message::new();
        msg.add("small", 17i32);
        msg.add("medium", 1000i64);
        assert_eq!(msg.by_name("small").unwrap().type_id(), 2);
        assert_eq!(msg.by_name("medium").unwrap().type_id(), 3);
    }

    #[test]
    fn test_explicit_type_skips_minimization() {
        let field = Field::with_type(4, Some("n".into()), None, Value::Int32(17)).unwrap();
        assert_eq!(field.type_id(), 4);

        assert!(Field::with_type(4, None, None, Value::Text("x".into())).is_err());
        assert!(Field::with_type(17, None, None, Value::Bytes(vec![0; 4])).is_ok());
        assert!(Field::with_type(17, None, None, Value::Bytes(vec![0; 5])).is_err());
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let mut msg = Message::new();
        msg.add("x", 1i32);
        msg.add("y", 2i32);
        msg.add("x", 3i32);

        assert_eq!(msg.num_fields(), 3);
        assert_eq!(msg.by_name("x").unwrap().value(), &Value::Int8(1));
        let all: Vec<_> = msg.all_by_name("x").map(|f| f.value().clone()).collect();
        assert_eq!(all, vec![Value::Int8(1), Value::Int8(3)]);
    }

    #[test]
    fn test_ordinal_lookup() {
        let mut msg = Message::new();
        msg.add_at(5, "first");
        msg.add_at(5, "second");
        msg.add_named_at("both", 9, 7i32);

        assert_eq!(
            msg.by_ordinal(5).unwrap().value(),
            &Value::Text("first".into())
        );
        assert_eq!(msg.all_by_ordinal(5).count(), 2);
        assert_eq!(msg.by_ordinal(9).unwrap().name(), Some("both"));
    }

    #[test]
    fn test_remove() {
        let mut msg = Message::new();
        msg.add("x", 1i32);
        msg.add("x", 2i32);
        msg.add_at(7, 3i32);

        assert_eq!(msg.remove_by_name("x"), 2);
        assert_eq!(msg.remove_by_ordinal(7), 1);
        assert!(msg.is_empty());
    }

    #[test]
    fn test_structural_equality() {
        let mut a = Message::new();
        a.add("name", "Fred");
        let mut sub = Message::new();
        sub.add("city", "London");
        a.add("address", sub.clone());

        let mut b = Message::new();
        b.add("name", "Fred");
        b.add("address", sub);
        assert_eq!(a, b);

        b.add("extra", 1i32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_weak_hash_is_field_count_only() {
        use std::collections::hash_map::DefaultHasher;

        let mut a = Message::new();
        a.add("x", 1i32);
        let mut b = Message::new();
        b.add("completely different", "value");

        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn test_typed_getters() {
        let mut msg = Message::new();
        msg.add("name", "Fred");
        msg.add("age", 14i32);

        assert_eq!(msg.get_string("name").unwrap(), "Fred");
        assert_eq!(msg.get_i32("age").unwrap(), 14); // stored as i8, widened
        assert!(matches!(
            msg.get_i32("missing"),
            Err(WireError::NotFound(_))
        ));
        assert!(matches!(
            msg.get_bytes("name"),
            Err(WireError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_overflow_vs_unsupported() {
        let mut msg = Message::new();
        msg.add_field(Field::with_type(4, Some("big".into()), None, Value::Int32(40_000)).unwrap());

        assert!(matches!(
            msg.get_i16("big"),
            Err(WireError::Overflow { .. })
        ));
    }

    #[test]
    fn test_apply_taxonomy_names() {
        use crate::taxonomy::MapTaxonomy;

        let tax = MapTaxonomy::new([(1, "name"), (2, "city")]).unwrap();
        let mut sub = Message::new();
        sub.add_at(2, "London");
        let mut msg = Message::new();
        msg.add_at(1, "Fred");
        msg.add_named_at("kept", 2, 0i32); // already named: untouched
        msg.add("address", sub);

        msg.apply_taxonomy_names(&tax);
        assert_eq!(msg.by_ordinal(1).unwrap().name(), Some("name"));
        assert_eq!(msg.by_ordinal(2).unwrap().name(), Some("kept"));
        assert_eq!(
            msg.get_message("address").unwrap().by_ordinal(2).unwrap().name(),
            Some("city")
        );

        // Idempotent: reapplying changes nothing.
        let snapshot = msg.clone();
        msg.apply_taxonomy_names(&tax);
        assert_eq!(msg, snapshot);
    }
}
