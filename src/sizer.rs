//! Tagwire Size Calculator
//! Computes the exact encoded byte count of fields, messages, and envelopes
//! without performing any I/O. The writer needs every (sub)message length
//! before the first byte goes out, and the emitted byte count must equal
//! the figure computed here exactly.

use crate::dictionary::TypeDictionary;
use crate::envelope::Envelope;
use crate::error::{WireError, WireResult};
use crate::message::{Field, Message};
use crate::taxonomy::Taxonomy;
use crate::value::Value;

/// Bytes of envelope header preceding the first field.
pub const ENVELOPE_HEADER_SIZE: usize = 8;

/// Maximum UTF-8 byte length of a field name (1-byte length prefix).
pub const MAX_NAME_LENGTH: usize = 255;

/// Width in bytes of the variable-length field for a payload of this size,
/// and the matching 2-bit prefix selector: 0, 1, 2, or 4 bytes.
pub(crate) fn length_field_width(payload: usize) -> usize {
    if payload == 0 {
        0
    } else if payload <= 0xff {
        1
    } else if payload <= 0xffff {
        2
    } else {
        4
    }
}

pub(crate) fn width_selector(width: usize) -> u8 {
    match width {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => 3,
    }
}

/// The name/ordinal pair a field actually carries on the wire. A name with
/// no explicit ordinal collapses to the taxonomy's ordinal for it; a field
/// the caller gave both a name and an ordinal is written with both, since
/// neither was implied.
pub(crate) fn wire_identity<'a>(
    name: Option<&'a str>,
    ordinal: Option<i16>,
    taxonomy: Option<&dyn Taxonomy>,
) -> (Option<&'a str>, Option<i16>) {
    match (name, ordinal) {
        (Some(name), None) => {
            if let Some(ordinal) = taxonomy.and_then(|t| t.ordinal_for(name)) {
                (None, Some(ordinal))
            } else {
                (Some(name), None)
            }
        }
        other => other,
    }
}

/// Payload byte count of a non-message value.
pub(crate) fn value_payload_size(value: &Value) -> usize {
    match value {
        Value::Indicator => 0,
        Value::Boolean(_) | Value::Int8(_) => 1,
        Value::Int16(_) => 2,
        Value::Int32(_) | Value::Float32(_) => 4,
        Value::Int64(_) | Value::Float64(_) => 8,
        Value::Bytes(b) => b.len(),
        Value::Int16Array(a) => a.len() * 2,
        Value::Int32Array(a) => a.len() * 4,
        Value::Int64Array(a) => a.len() * 8,
        Value::Float32Array(a) => a.len() * 4,
        Value::Float64Array(a) => a.len() * 8,
        Value::Text(s) => s.len(),
        Value::Date(_) => 4,
        Value::Time(_) => 8,
        Value::DateTime(_) => 12,
        Value::Opaque { bytes, .. } => bytes.len(),
        Value::Message(_) => unreachable!("sub-message size is computed recursively"),
    }
}

/// Exact encoded size of one field, including its prefix and header bytes.
pub fn field_size(
    field: &Field,
    taxonomy: Option<&dyn Taxonomy>,
    dictionary: &TypeDictionary,
) -> WireResult<usize> {
    let (name, ordinal) = wire_identity(field.name(), field.ordinal(), taxonomy);

    let mut size = 2; // prefix byte + type id
    if ordinal.is_some() {
        size += 2;
    }
    if let Some(name) = name {
        if name.len() > MAX_NAME_LENGTH {
            return Err(WireError::invalid(format!(
                "field name exceeds {MAX_NAME_LENGTH} bytes: {} bytes",
                name.len()
            )));
        }
        size += 1 + name.len();
    }

    let payload = match field.value() {
        Value::Message(sub) => message_size(sub, taxonomy, dictionary)?,
        other => value_payload_size(other),
    };

    let fixed = dictionary.resolve(field.type_id()).fixed_size;
    match fixed {
        Some(width) => {
            // Fixed-width types carry no length field; the payload must be
            // exactly the declared width.
            if payload != width {
                return Err(WireError::invalid(format!(
                    "fixed-width type {} expects {} bytes, value has {}",
                    field.type_id(),
                    width,
                    payload
                )));
            }
            Ok(size + width)
        }
        None => Ok(size + length_field_width(payload) + payload),
    }
}

/// Exact encoded size of a message's contents (the sum of its fields).
pub fn message_size(
    message: &Message,
    taxonomy: Option<&dyn Taxonomy>,
    dictionary: &TypeDictionary,
) -> WireResult<usize> {
    let mut size = 0;
    for field in message {
        size += field_size(field, taxonomy, dictionary)?;
    }
    Ok(size)
}

/// Exact encoded size of a full envelope, header included.
pub fn envelope_size(
    envelope: &Envelope,
    taxonomy: Option<&dyn Taxonomy>,
    dictionary: &TypeDictionary,
) -> WireResult<usize> {
    Ok(ENVELOPE_HEADER_SIZE + message_size(envelope.message(), taxonomy, dictionary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::MapTaxonomy;

    fn dict() -> &'static TypeDictionary {
        TypeDictionary::standard()
    }

    #[test]
    fn test_length_field_width() {
        assert_eq!(length_field_width(0), 0);
        assert_eq!(length_field_width(1), 1);
        assert_eq!(length_field_width(255), 1);
        assert_eq!(length_field_width(256), 2);
        assert_eq!(length_field_width(65_535), 2);
        assert_eq!(length_field_width(65_536), 4);
    }

    #[test]
    fn test_fixed_field_size() {
        // prefix + type + name(1+3) + 4-byte i32
        let field = Field::with_type(4, Some("age".into()), None, Value::Int32(90_000)).unwrap();
        assert_eq!(field_size(&field, None, dict()).unwrap(), 2 + 4 + 4);
    }

    #[test]
    fn test_variable_field_size() {
        // prefix + type + name(1+4) + len(1) + 4 bytes of text
        let field = Field::new(Some("name".into()), None, "Fred");
        assert_eq!(field_size(&field, None, dict()).unwrap(), 2 + 5 + 1 + 4);

        // Empty text: selector 0, no length field.
        let field = Field::new(None, None, "");
        assert_eq!(field_size(&field, None, dict()).unwrap(), 2);
    }

    #[test]
    fn test_ordinal_field_size() {
        let field = Field::new(None, Some(5), 1i32);
        // prefix + type + ordinal(2) + 1-byte i8
        assert_eq!(field_size(&field, None, dict()).unwrap(), 2 + 2 + 1);
    }

    #[test]
    fn test_taxonomy_collapse_shrinks_name() {
        let tax = MapTaxonomy::new([(5, "name")]).unwrap();
        let field = Field::new(Some("name".into()), None, "Fred");

        let without = field_size(&field, None, dict()).unwrap();
        let with = field_size(&field, Some(&tax), dict()).unwrap();
        // 1+4 name bytes replaced by a 2-byte ordinal.
        assert_eq!(without - with, 3);
    }

    #[test]
    fn test_both_name_and_ordinal_not_collapsed() {
        let tax = MapTaxonomy::new([(5, "name")]).unwrap();
        let field = Field::new(Some("name".into()), Some(5), "Fred");
        let (name, ordinal) = wire_identity(field.name(), field.ordinal(), Some(&tax));
        assert_eq!(name, Some("name"));
        assert_eq!(ordinal, Some(5));
    }

    #[test]
    fn test_envelope_size_is_header_plus_fields() {
        let mut msg = Message::new();
        msg.add("name", "Fred");
        msg.add("age", 14i32);
        let env = Envelope::new(msg);

        let fields: usize = env
            .message()
            .iter()
            .map(|f| field_size(f, None, dict()).unwrap())
            .sum();
        assert_eq!(
            envelope_size(&env, None, dict()).unwrap(),
            ENVELOPE_HEADER_SIZE + fields
        );
    }

    #[test]
    fn test_oversized_name_rejected() {
        let field = Field::new(Some("x".repeat(256)), None, 1i32);
        assert!(matches!(
            field_size(&field, None, dict()),
            Err(WireError::InvalidState(_))
        ));
    }
}
