//! Tagwire Envelope
//! Top-level wrapper around a message: processing directives, schema
//! version, and the taxonomy identifier used to resolve names for the tree.

use crate::error::WireResult;
use crate::message::Message;
use crate::taxonomy::TaxonomyResolver;
use crate::{decoder, encoder};

/// A top-level message plus its header scalars. Processing directives and
/// schema version are single unsigned bytes on the wire, which the `u8`
/// parameters enforce at construction; the taxonomy identifier is a signed
/// 16-bit value, with 0 meaning "no taxonomy".
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    directives: u8,
    version: u8,
    taxonomy_id: i16,
    message: Message,
}

impl Envelope {
    /// Wrap a message with default header scalars (all zero).
    pub fn new(message: Message) -> Self {
        Envelope {
            directives: 0,
            version: 0,
            taxonomy_id: 0,
            message,
        }
    }

    pub fn with_metadata(directives: u8, version: u8, taxonomy_id: i16, message: Message) -> Self {
        Envelope {
            directives,
            version,
            taxonomy_id,
            message,
        }
    }

    pub fn processing_directives(&self) -> u8 {
        self.directives
    }

    pub fn schema_version(&self) -> u8 {
        self.version
    }

    pub fn taxonomy_id(&self) -> i16 {
        self.taxonomy_id
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    /// Encode without a taxonomy: names are written verbatim.
    pub fn encode(&self) -> WireResult<Vec<u8>> {
        encoder::encode_envelope(self, None)
    }

    /// Encode, collapsing field names to ordinals through the taxonomy the
    /// resolver supplies for this envelope's taxonomy identifier.
    pub fn encode_with(&self, resolver: &dyn TaxonomyResolver) -> WireResult<Vec<u8>> {
        let taxonomy = if self.taxonomy_id != 0 {
            resolver.resolve(self.taxonomy_id)
        } else {
            None
        };
        encoder::encode_envelope(self, taxonomy)
    }

    /// Decode without a taxonomy: ordinal-only fields stay nameless.
    pub fn decode(buffer: &[u8]) -> WireResult<Envelope> {
        decoder::decode_envelope(buffer)
    }

    /// Decode and re-attach taxonomy-derived names to ordinal-only fields.
    pub fn decode_with(buffer: &[u8], resolver: &dyn TaxonomyResolver) -> WireResult<Envelope> {
        decoder::decode_envelope_with(buffer, Some(resolver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_accessors() {
        let env = Envelope::with_metadata(3, 1, 42, Message::new());
        assert_eq!(env.processing_directives(), 3);
        assert_eq!(env.schema_version(), 1);
        assert_eq!(env.taxonomy_id(), 42);
        assert!(env.message().is_empty());
    }
}
