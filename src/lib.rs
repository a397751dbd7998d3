//! Tagwire - Tagged Binary Message Encoding
//! A self-describing, hierarchical binary encoding. Fields carry an
//! optional name and/or 16-bit ordinal plus an explicit type tag, messages
//! nest as sub-message fields, and a shared taxonomy can collapse names to
//! ordinals on the wire and restore them on decode.

// Core modules
pub mod decoder;
pub mod dictionary;
pub mod encoder;
pub mod envelope;
pub mod error;
pub mod message;
pub mod sizer;
pub mod stream;
pub mod taxonomy;
pub mod types;
pub mod value;

// Re-exports for convenience
pub use decoder::{decode_envelope, decode_envelope_with, WireDecoder};
pub use dictionary::{TypeDictionary, WireType};
pub use encoder::{encode_envelope, encode_envelope_with, WireEncoder};
pub use envelope::Envelope;
pub use error::{WireError, WireResult};
pub use message::{Field, Message};
pub use sizer::{envelope_size, field_size, message_size, ENVELOPE_HEADER_SIZE};
pub use stream::{
    build_message, write_message, Element, ElementReader, ElementWriter, MessageBuilder,
    MultiWriter,
};
pub use taxonomy::{MapResolver, MapTaxonomy, Taxonomy, TaxonomyResolver};
pub use types::WireTypeId;
pub use value::{Date, DateTime, Time, Value};

/// Tagwire encoding version
pub const VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_encoding_decoding() {
        let mut msg = Message::new();
        msg.add("greeting", "Hello");
        msg.add_at(2, 42i32);

        let buffer = Envelope::new(msg).encode().unwrap();
        let decoded = Envelope::decode(&buffer).unwrap();

        assert_eq!(
            decoded.message().get_string("greeting").unwrap(),
            "Hello".to_string()
        );
        assert_eq!(decoded.message().by_ordinal(2).unwrap().value(), &Value::Int8(42));
    }

    #[test]
    fn test_types() {
        assert!(WireTypeId::Int32.is_fixed_size());
        assert!(WireTypeId::Text.is_variable_size());
        assert!(WireTypeId::SubMessage.is_variable_size());
        assert_eq!(WireTypeId::Float64.name(), "FLOAT64");
    }

    #[test]
    fn test_envelope_size_matches_encoding() {
        let mut address = Message::new();
        address.add("line1", "29 Acacia Road");
        address.add("city", "London");

        let mut msg = Message::new();
        msg.add("name", "Fred");
        msg.add("age", 14i32);
        msg.add("address", address);

        let env = Envelope::new(msg);
        let expected = envelope_size(&env, None, TypeDictionary::standard()).unwrap();
        let buffer = env.encode().unwrap();
        assert_eq!(buffer.len(), expected);

        let total = u32::from_be_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]);
        assert_eq!(total as usize, buffer.len());
    }

    #[test]
    fn test_taxonomy_round_trip() {
        let mut resolver = MapResolver::new();
        resolver.insert(
            1,
            MapTaxonomy::new([(1, "name"), (2, "age")]).unwrap(),
        );

        let mut msg = Message::new();
        msg.add("name", "Fred");
        msg.add("age", 14i32);
        let env = Envelope::with_metadata(0, 0, 1, msg);

        let plain = env.encode().unwrap();
        let collapsed = env.encode_with(&resolver).unwrap();
        assert!(collapsed.len() < plain.len());

        let decoded = Envelope::decode_with(&collapsed, &resolver).unwrap();
        assert_eq!(decoded.message().get_string("name").unwrap(), "Fred");
        assert_eq!(decoded.message().get_i32("age").unwrap(), 14);
    }

    #[test]
    fn test_explicit_type_preserved_for_narrowing() {
        // Stored as an i32 on request even though the value fits an i8, so
        // a narrower read must fail rather than silently truncate.
        let mut msg = Message::new();
        msg.add_field(
            Field::with_type(4, Some("count".into()), None, Value::Int32(40_000)).unwrap(),
        );

        let buffer = Envelope::new(msg).encode().unwrap();
        let decoded = Envelope::decode(&buffer).unwrap();

        assert_eq!(decoded.message().get_i32("count").unwrap(), 40_000);
        assert!(matches!(
            decoded.message().get_i16("count"),
            Err(WireError::Overflow { .. })
        ));
    }
}
