//! Tagwire Binary Decoder
//! Pull-reader over an encoded envelope. Sub-message boundaries carry no
//! end marker: the reader tracks a stack of declared end offsets and emits
//! the matching end elements exactly when consumption reaches them.

use tracing::{trace, warn};

use crate::dictionary::TypeDictionary;
use crate::envelope::Envelope;
use crate::error::{WireError, WireResult};
use crate::message::Field;
use crate::sizer::ENVELOPE_HEADER_SIZE;
use crate::stream::{self, Element, ElementReader};
use crate::taxonomy::TaxonomyResolver;
use crate::types::WireTypeId;
use crate::value::{Date, DateTime, Time, Value};

const PREFIX_FIXED_WIDTH: u8 = 0x20;
const PREFIX_HAS_ORDINAL: u8 = 0x10;
const PREFIX_HAS_NAME: u8 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Header parsed, `MessageStart` not yet emitted.
    Pending,
    Reading,
    Done,
}

/// Streaming binary reader for one envelope.
///
/// Nesting is handled with an explicit stack of absolute end offsets rather
/// than recursion, so arbitrarily deep messages cannot exhaust the call
/// stack, and the reader can be left parked at any element boundary.
pub struct WireDecoder<'a> {
    buf: &'a [u8],
    offset: usize,
    dictionary: &'a TypeDictionary,
    directives: u8,
    version: u8,
    taxonomy_id: i16,
    /// Declared end offsets of the open (sub)messages, innermost last.
    frames: Vec<usize>,
    state: State,
    peeked: Option<Element>,
}

impl<'a> WireDecoder<'a> {
    /// Parse the envelope header and position the reader before the first
    /// element, using the standard dictionary.
    pub fn new(buf: &'a [u8]) -> WireResult<Self> {
        Self::with_dictionary(buf, TypeDictionary::standard())
    }

    pub fn with_dictionary(buf: &'a [u8], dictionary: &'a TypeDictionary) -> WireResult<Self> {
        if buf.len() < ENVELOPE_HEADER_SIZE {
            return Err(WireError::malformed(
                buf.len(),
                format!("truncated envelope header: {} bytes", buf.len()),
            ));
        }
        let directives = buf[0];
        let version = buf[1];
        let taxonomy_id = i16::from_be_bytes([buf[2], buf[3]]);
        let total = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;

        if total < ENVELOPE_HEADER_SIZE {
            return Err(WireError::malformed(
                4,
                format!("declared envelope size {total} is below the header size"),
            ));
        }
        if total > buf.len() {
            return Err(WireError::malformed(
                4,
                format!(
                    "declared envelope size {total} exceeds the {} bytes available",
                    buf.len()
                ),
            ));
        }

        trace!(bytes = total, taxonomy_id, "decoding envelope");
        Ok(WireDecoder {
            buf,
            offset: ENVELOPE_HEADER_SIZE,
            dictionary,
            directives,
            version,
            taxonomy_id,
            frames: vec![total],
            state: State::Pending,
            peeked: None,
        })
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

    /// Total declared envelope size, header included. Bytes past this point
    /// belong to the next envelope in the stream.
    pub fn envelope_size(&self) -> usize {
        // frames[0] survives until MessageEnd; after that the cursor sits there.
        self.frames.first().copied().unwrap_or(self.offset)
    }

    fn frame_end(&self) -> usize {
        *self.frames.last().expect("frame stack never empty while reading")
    }

    /// Consume `n` bytes, bounded by the innermost declared size.
    fn take(&mut self, n: usize) -> WireResult<&'a [u8]> {
        let end = self.frame_end();
        if self.offset + n > end {
            return Err(WireError::malformed(
                self.offset,
                format!(
                    "truncated data: {n} bytes needed, {} remain in the current (sub)message",
                    end - self.offset
                ),
            ));
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> WireResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_length(&mut self, selector: u8) -> WireResult<usize> {
        match selector {
            0 => Ok(0),
            1 => Ok(self.take_u8()? as usize),
            2 => {
                let b = self.take(2)?;
                Ok(u16::from_be_bytes([b[0], b[1]]) as usize)
            }
            _ => {
                let b = self.take(4)?;
                Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize)
            }
        }
    }

    fn read_one(&mut self) -> WireResult<Option<Element>> {
        match self.state {
            State::Pending => {
                self.state = State::Reading;
                return Ok(Some(Element::MessageStart));
            }
            State::Done => return Ok(None),
            State::Reading => {}
        }

        let end = self.frame_end();
        if self.offset == end {
            return if self.frames.len() == 1 {
                self.state = State::Done;
                Ok(Some(Element::MessageEnd))
            } else {
                self.frames.pop();
                Ok(Some(Element::SubmessageEnd))
            };
        }

        let field_offset = self.offset;
        let prefix = self.take_u8()?;
        let type_id = self.take_u8()?;
        let selector = prefix >> 6;
        let fixed_width = prefix & PREFIX_FIXED_WIDTH != 0;

        let ordinal = if prefix & PREFIX_HAS_ORDINAL != 0 {
            let b = self.take(2)?;
            Some(i16::from_be_bytes([b[0], b[1]]))
        } else {
            None
        };

        let name = if prefix & PREFIX_HAS_NAME != 0 {
            let len = self.take_u8()? as usize;
            let name_offset = self.offset;
            let bytes = self.take(len)?;
            Some(
                std::str::from_utf8(bytes)
                    .map_err(|_| WireError::malformed(name_offset, "field name is not valid UTF-8"))?
                    .to_string(),
            )
        } else {
            None
        };

        if type_id == WireTypeId::SubMessage as u8 {
            if fixed_width {
                return Err(WireError::malformed(
                    field_offset,
                    "sub-message field marked fixed-width",
                ));
            }
            let size = self.read_length(selector)?;
            if self.offset + size > self.frame_end() {
                return Err(WireError::malformed(
                    self.offset,
                    format!(
                        "sub-message declares {size} bytes but only {} remain",
                        self.frame_end() - self.offset
                    ),
                ));
            }
            self.frames.push(self.offset + size);
            return Ok(Some(Element::SubmessageStart { name, ordinal }));
        }

        let wire_type = self.dictionary.resolve(type_id);
        let data_size = if fixed_width {
            if selector != 0 {
                return Err(WireError::malformed(
                    field_offset,
                    "fixed-width field carries a length-field selector",
                ));
            }
            match wire_type.fixed_size {
                Some(width) => width,
                None => {
                    // An unrecognized fixed type cannot be bounded and the
                    // rest of the stream cannot be skipped safely.
                    return Err(WireError::UnknownFixedWidth {
                        type_id,
                        offset: field_offset,
                    });
                }
            }
        } else {
            self.read_length(selector)?
        };

        let value_offset = self.offset;
        let bytes = self.take(data_size)?;
        let value = decode_value(type_id, bytes, value_offset)?;
        Ok(Some(Element::Field(Field::from_wire(
            name, ordinal, type_id, value,
        ))))
    }
}

impl ElementReader for WireDecoder<'_> {
    fn has_next(&mut self) -> WireResult<bool> {
        if self.peeked.is_none() {
            self.peeked = self.read_one()?;
        }
        Ok(self.peeked.is_some())
    }

    fn next_element(&mut self) -> WireResult<Option<Element>> {
        match self.peeked.take() {
            Some(element) => Ok(Some(element)),
            None => self.read_one(),
        }
    }
}

/// Decode one value payload. `bytes` is exactly the declared data size.
fn decode_value(type_id: u8, bytes: &[u8], offset: usize) -> WireResult<Value> {
    let Some(standard) = WireTypeId::from_u8(type_id) else {
        warn!(type_id, len = bytes.len(), "preserving unknown type as opaque bytes");
        return Ok(Value::Opaque {
            type_id,
            bytes: bytes.to_vec(),
        });
    };

    let expect = |n: usize| -> WireResult<()> {
        if bytes.len() != n {
            Err(WireError::malformed(
                offset,
                format!(
                    "{} expects {n} bytes, found {}",
                    standard.name(),
                    bytes.len()
                ),
            ))
        } else {
            Ok(())
        }
    };

    let array_of = |elem: usize| -> WireResult<usize> {
        if bytes.len() % elem != 0 {
            Err(WireError::malformed(
                offset,
                format!(
                    "{} payload of {} bytes is not a multiple of {elem}",
                    standard.name(),
                    bytes.len()
                ),
            ))
        } else {
            Ok(bytes.len() / elem)
        }
    };

    match standard {
        WireTypeId::Indicator => {
            expect(0)?;
            Ok(Value::Indicator)
        }
        WireTypeId::Boolean => {
            expect(1)?;
            Ok(Value::Boolean(bytes[0] != 0))
        }
        WireTypeId::Int8 => {
            expect(1)?;
            Ok(Value::Int8(bytes[0] as i8))
        }
        WireTypeId::Int16 => {
            expect(2)?;
            Ok(Value::Int16(i16::from_be_bytes([bytes[0], bytes[1]])))
        }
        WireTypeId::Int32 => {
            expect(4)?;
            Ok(Value::Int32(i32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])))
        }
        WireTypeId::Int64 => {
            expect(8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok(Value::Int64(i64::from_be_bytes(raw)))
        }
        WireTypeId::Float32 => {
            expect(4)?;
            Ok(Value::Float32(f32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])))
        }
        WireTypeId::Float64 => {
            expect(8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok(Value::Float64(f64::from_be_bytes(raw)))
        }
        WireTypeId::Int16Array => {
            let n = array_of(2)?;
            Ok(Value::Int16Array(
                (0..n)
                    .map(|i| i16::from_be_bytes([bytes[2 * i], bytes[2 * i + 1]]))
                    .collect(),
            ))
        }
        WireTypeId::Int32Array => {
            let n = array_of(4)?;
            Ok(Value::Int32Array(
                (0..n)
                    .map(|i| {
                        i32::from_be_bytes([
                            bytes[4 * i],
                            bytes[4 * i + 1],
                            bytes[4 * i + 2],
                            bytes[4 * i + 3],
                        ])
                    })
                    .collect(),
            ))
        }
        WireTypeId::Int64Array => {
            let n = array_of(8)?;
            Ok(Value::Int64Array(
                (0..n)
                    .map(|i| {
                        let mut raw = [0u8; 8];
                        raw.copy_from_slice(&bytes[8 * i..8 * i + 8]);
                        i64::from_be_bytes(raw)
                    })
                    .collect(),
            ))
        }
        WireTypeId::Float32Array => {
            let n = array_of(4)?;
            Ok(Value::Float32Array(
                (0..n)
                    .map(|i| {
                        f32::from_be_bytes([
                            bytes[4 * i],
                            bytes[4 * i + 1],
                            bytes[4 * i + 2],
                            bytes[4 * i + 3],
                        ])
                    })
                    .collect(),
            ))
        }
        WireTypeId::Float64Array => {
            let n = array_of(8)?;
            Ok(Value::Float64Array(
                (0..n)
                    .map(|i| {
                        let mut raw = [0u8; 8];
                        raw.copy_from_slice(&bytes[8 * i..8 * i + 8]);
                        f64::from_be_bytes(raw)
                    })
                    .collect(),
            ))
        }
        WireTypeId::Text => Ok(Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|_| WireError::malformed(offset, "text payload is not valid UTF-8"))?
                .to_string(),
        )),
        WireTypeId::Date => {
            expect(4)?;
            Ok(Value::Date(Date::unpack(u32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))))
        }
        WireTypeId::Time => {
            expect(8)?;
            Ok(Value::Time(Time::unpack(bytes)))
        }
        WireTypeId::DateTime => {
            expect(12)?;
            Ok(Value::DateTime(DateTime::new(
                Date::unpack(u32::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3],
                ])),
                Time::unpack(&bytes[4..12]),
            )))
        }
        WireTypeId::SubMessage => Err(WireError::invalid(
            "sub-messages are framed by the decoder, never read as a value",
        )),
        byte_array => {
            // Variable byte array, or one of the fixed-length array types
            // whose width the caller already bounded.
            debug_assert!(byte_array.is_byte_array());
            if let Some(width) = byte_array.fixed_size() {
                expect(width)?;
            }
            Ok(Value::Bytes(bytes.to_vec()))
        }
    }
}

/// Decode a full envelope with the standard dictionary and no taxonomy.
pub fn decode_envelope(buffer: &[u8]) -> WireResult<Envelope> {
    decode_envelope_with(buffer, None)
}

/// Decode a full envelope, re-attaching taxonomy names when the resolver
/// knows the envelope's taxonomy.
pub fn decode_envelope_with(
    buffer: &[u8],
    resolver: Option<&dyn TaxonomyResolver>,
) -> WireResult<Envelope> {
    decode_envelope_with_dictionary(buffer, resolver, TypeDictionary::standard())
}

pub fn decode_envelope_with_dictionary(
    buffer: &[u8],
    resolver: Option<&dyn TaxonomyResolver>,
    dictionary: &TypeDictionary,
) -> WireResult<Envelope> {
    let mut decoder = WireDecoder::with_dictionary(buffer, dictionary)?;
    let (directives, version, taxonomy_id) = (
        decoder.processing_directives(),
        decoder.schema_version(),
        decoder.taxonomy_id(),
    );

    let mut message = stream::build_message(&mut decoder)?
        .ok_or_else(|| WireError::malformed(0, "empty element stream"))?;

    if taxonomy_id != 0 {
        if let Some(taxonomy) = resolver.and_then(|r| r.resolve(taxonomy_id)) {
            message.apply_taxonomy_names(taxonomy);
        }
    }

    Ok(Envelope::with_metadata(
        directives,
        version,
        taxonomy_id,
        message,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::taxonomy::{MapResolver, MapTaxonomy};

    #[test]
    fn test_header_parsing() {
        let env = Envelope::with_metadata(3, 1, -2, Message::new());
        let bytes = env.encode().unwrap();

        let dec = WireDecoder::new(&bytes).unwrap();
        assert_eq!(dec.processing_directives(), 3);
        assert_eq!(dec.schema_version(), 1);
        assert_eq!(dec.taxonomy_id(), -2);
        assert_eq!(dec.envelope_size(), 8);
    }

    #[test]
    fn test_empty_message_elements() {
        let bytes = Envelope::new(Message::new()).encode().unwrap();
        let mut dec = WireDecoder::new(&bytes).unwrap();

        assert!(dec.has_next().unwrap());
        assert!(dec.has_next().unwrap()); // repeatable, does not consume
        assert_eq!(dec.next_element().unwrap(), Some(Element::MessageStart));
        assert_eq!(dec.next_element().unwrap(), Some(Element::MessageEnd));
        assert!(!dec.has_next().unwrap());
        assert_eq!(dec.next_element().unwrap(), None);
    }

    #[test]
    fn test_element_sequence_with_nesting() {
        let mut sub = Message::new();
        sub.add("city", "London");
        let mut msg = Message::new();
        msg.add("name", "Fred");
        msg.add("address", sub);

        let bytes = Envelope::new(msg).encode().unwrap();
        let mut dec = WireDecoder::new(&bytes).unwrap();

        assert_eq!(dec.next_element().unwrap(), Some(Element::MessageStart));
        match dec.next_element().unwrap() {
            Some(Element::Field(f)) => assert_eq!(f.name(), Some("name")),
            other => panic!("expected simple field, got {other:?}"),
        }
        assert_eq!(
            dec.next_element().unwrap(),
            Some(Element::SubmessageStart {
                name: Some("address".into()),
                ordinal: None
            })
        );
        match dec.next_element().unwrap() {
            Some(Element::Field(f)) => assert_eq!(f.name(), Some("city")),
            other => panic!("expected simple field, got {other:?}"),
        }
        assert_eq!(dec.next_element().unwrap(), Some(Element::SubmessageEnd));
        assert_eq!(dec.next_element().unwrap(), Some(Element::MessageEnd));
        assert_eq!(dec.next_element().unwrap(), None);
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            WireDecoder::new(&[0, 0, 0]),
            Err(WireError::Malformed { .. })
        ));
    }

    #[test]
    fn test_declared_size_beyond_buffer() {
        let mut bytes = Envelope::new(Message::new()).encode().unwrap();
        bytes[7] = 100; // claims more bytes than exist
        assert!(matches!(
            WireDecoder::new(&bytes),
            Err(WireError::Malformed { .. })
        ));
    }

    #[test]
    fn test_truncated_field_data() {
        let mut msg = Message::new();
        msg.add("name", "Fred");
        let mut bytes = Envelope::new(msg).encode().unwrap();

        // Lie about the text length: 200 bytes declared, 4 present.
        let len_index = bytes.len() - 5;
        bytes[len_index] = 200;

        let mut dec = WireDecoder::new(&bytes).unwrap();
        dec.next_element().unwrap();
        assert!(matches!(
            dec.next_element(),
            Err(WireError::Malformed { .. })
        ));
    }

    #[test]
    fn test_submessage_size_beyond_parent() {
        let mut sub = Message::new();
        sub.add("x", 1i32);
        let mut msg = Message::new();
        msg.add("sub", sub);
        let mut bytes = Envelope::new(msg).encode().unwrap();

        // Field layout: prefix, type 15, name len, "sub", 1-byte size.
        let size_index = 8 + 2 + 1 + 3;
        bytes[size_index] = 250;

        let mut dec = WireDecoder::new(&bytes).unwrap();
        dec.next_element().unwrap();
        assert!(matches!(
            dec.next_element(),
            Err(WireError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unknown_fixed_width_is_fatal() {
        // prefix: fixed-width, no name/ordinal; unregistered type 200.
        let body = [PREFIX_FIXED_WIDTH, 200u8];
        let mut bytes = vec![0, 0, 0, 0, 0, 0, 0, 10];
        bytes.extend_from_slice(&body);

        let mut dec = WireDecoder::new(&bytes).unwrap();
        dec.next_element().unwrap();
        assert!(matches!(
            dec.next_element(),
            Err(WireError::UnknownFixedWidth { type_id: 200, .. })
        ));
    }

    #[test]
    fn test_unknown_variable_width_round_trips() {
        // Unregistered variable type 200 with 3 payload bytes.
        let body = [0x40 | PREFIX_HAS_ORDINAL, 200, 0, 9, 3, 0xaa, 0xbb, 0xcc];
        let mut bytes = vec![0, 0, 0, 0, 0, 0, 0, 16];
        bytes.extend_from_slice(&body);

        let env = Envelope::decode(&bytes).unwrap();
        let field = env.message().by_ordinal(9).unwrap();
        assert_eq!(field.type_id(), 200);
        assert_eq!(
            field.value(),
            &Value::Opaque {
                type_id: 200,
                bytes: vec![0xaa, 0xbb, 0xcc]
            }
        );

        // Re-encoding preserves the original bytes.
        assert_eq!(env.encode().unwrap(), bytes);
    }

    #[test]
    fn test_registered_custom_fixed_type() {
        use crate::dictionary::WireType;
        use std::borrow::Cow;

        let mut dict = TypeDictionary::new();
        dict.register(WireType {
            id: 255,
            name: Cow::Borrowed("PAIR"),
            fixed_size: Some(2),
        })
        .unwrap();

        let mut msg = Message::new();
        msg.add_field(
            Field::with_type(
                255,
                Some("p".into()),
                None,
                Value::Opaque {
                    type_id: 255,
                    bytes: vec![1, 2],
                },
            )
            .unwrap(),
        );
        let bytes =
            crate::encoder::encode_envelope_with(&Envelope::new(msg.clone()), None, &dict).unwrap();

        // Fixed flag set, no length field on the wire.
        assert_eq!(bytes[8] & PREFIX_FIXED_WIDTH, PREFIX_FIXED_WIDTH);

        let env = decode_envelope_with_dictionary(&bytes, None, &dict).unwrap();
        assert_eq!(env.message(), &msg);
    }

    #[test]
    fn test_taxonomy_expansion_on_decode() {
        let mut resolver = MapResolver::new();
        resolver.insert(7, MapTaxonomy::new([(5, "Foo")]).unwrap());

        let mut msg = Message::new();
        msg.add("Foo", 14i32);
        let env = Envelope::with_metadata(0, 0, 7, msg);
        let bytes = env.encode_with(&resolver).unwrap();

        // With the taxonomy: name restored alongside the wire ordinal.
        let decoded = Envelope::decode_with(&bytes, &resolver).unwrap();
        let field = decoded.message().by_ordinal(5).unwrap();
        assert_eq!(field.name(), Some("Foo"));
        assert_eq!(field.ordinal(), Some(5));

        // Without it: ordinal only, no name.
        let bare = Envelope::decode(&bytes).unwrap();
        let field = bare.message().by_ordinal(5).unwrap();
        assert_eq!(field.name(), None);
    }

    #[test]
    fn test_all_value_shapes_round_trip() {
        let mut msg = Message::new();
        msg.add_anonymous(Value::Indicator);
        msg.add("flag", true);
        msg.add("text", "héllo");
        msg.add("empty_text", "");
        msg.add("blob", vec![1u8, 2, 3, 4, 5]);
        msg.add("fixed_blob", vec![0xab_u8; 512]);
        msg.add("medium_blob", vec![7u8; 300]);
        msg.add("empty_blob", Vec::<u8>::new());
        msg.add("i16s", vec![i16::MIN, 0, i16::MAX]);
        msg.add("i32s", vec![i32::MIN, -1, i32::MAX]);
        msg.add("i64s", vec![i64::MIN, 0, i64::MAX]);
        msg.add("f32s", vec![-1.5f32, 0.0, f32::MAX]);
        msg.add("f64s", vec![f64::MIN_POSITIVE, 2.5]);
        msg.add("no_i16s", Vec::<i16>::new());
        msg.add("f32", 1.25f32);
        msg.add("f64", -2.5f64);

        let bytes = Envelope::new(msg.clone()).encode().unwrap();
        let decoded = Envelope::decode(&bytes).unwrap();
        assert_eq!(decoded.message(), &msg);

        // 512 bytes hits the largest fixed-width array type; 300 needs a
        // 2-byte length field.
        assert_eq!(decoded.message().by_name("fixed_blob").unwrap().type_id(), 25);
        assert_eq!(decoded.message().by_name("medium_blob").unwrap().type_id(), 6);
    }

    #[test]
    fn test_integer_boundaries_round_trip() {
        let mut msg = Message::new();
        msg.add("zero", 0i64);
        msg.add("i8_min", i8::MIN);
        msg.add("i8_max", i8::MAX);
        msg.add("i16_min", i16::MIN);
        msg.add("needs_i16", i8::MAX as i64 + 1);
        msg.add("i32_min", i32::MIN);
        msg.add("i64_min", i64::MIN);
        msg.add("i64_max", i64::MAX);
        msg.add_field(
            Field::with_type(5, Some("pinned_wide".into()), None, Value::Int64(1)).unwrap(),
        );

        let bytes = Envelope::new(msg.clone()).encode().unwrap();
        let decoded = Envelope::decode(&bytes).unwrap();
        assert_eq!(decoded.message(), &msg);

        // Minimization happened before the wire; the pinned type survives.
        assert_eq!(decoded.message().by_name("zero").unwrap().type_id(), 2);
        assert_eq!(decoded.message().by_name("needs_i16").unwrap().type_id(), 3);
        assert_eq!(decoded.message().by_name("i64_min").unwrap().type_id(), 5);
        assert_eq!(decoded.message().by_name("pinned_wide").unwrap().type_id(), 5);
    }

    #[test]
    fn test_calendar_values_round_trip() {
        let date = Date::new(2020, 5, 15).unwrap();
        let midnight = Time::new(None, 0, 0, 0).unwrap();
        let last_instant = Time::new(Some(4), 15, 86_399, 999_999_999).unwrap();

        let mut msg = Message::new();
        msg.add("date", date);
        msg.add("time", last_instant);
        msg.add("stamp", DateTime::new(Date::new(-1234, 12, 31).unwrap(), midnight));

        let bytes = Envelope::new(msg.clone()).encode().unwrap();
        let decoded = Envelope::decode(&bytes).unwrap();
        assert_eq!(decoded.message(), &msg);

        match decoded.message().by_name("stamp").unwrap().value() {
            Value::DateTime(dt) => {
                assert_eq!(dt.date.year(), -1234);
                assert_eq!(dt.time.timezone_offset(), None);
            }
            other => panic!("expected datetime, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_names_survive_round_trip() {
        let mut msg = Message::new();
        msg.add("x", 1i32);
        msg.add("y", true);
        msg.add("x", "two");

        let bytes = Envelope::new(msg.clone()).encode().unwrap();
        let decoded = Envelope::decode(&bytes).unwrap();
        assert_eq!(decoded.message(), &msg);

        let values: Vec<_> = decoded
            .message()
            .all_by_name("x")
            .map(|f| f.value().clone())
            .collect();
        assert_eq!(values, vec![Value::Int8(1), Value::Text("two".into())]);
    }

    #[test]
    fn test_deep_nesting_without_recursion() {
        let mut msg = Message::new();
        msg.add("leaf", 1i32);
        for _ in 0..500 {
            let mut outer = Message::new();
            outer.add("inner", msg);
            msg = outer;
        }

        let bytes = Envelope::new(msg.clone()).encode().unwrap();
        let mut dec = WireDecoder::new(&bytes).unwrap();

        let mut depth = 0usize;
        let mut max_depth = 0usize;
        let mut starts = 0usize;
        let mut ends = 0usize;
        while let Some(element) = dec.next_element().unwrap() {
            match element {
                Element::SubmessageStart { .. } => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                    starts += 1;
                }
                Element::SubmessageEnd => {
                    depth -= 1;
                    ends += 1;
                }
                _ => {}
            }
        }
        assert_eq!(depth, 0);
        assert_eq!(starts, 500);
        assert_eq!(ends, 500);
        assert_eq!(max_depth, 500);
    }
}
