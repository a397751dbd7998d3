//! Tagwire Binary Encoder
//! Writes the envelope header and field framing described by the wire
//! format: big-endian values, a bit-packed field prefix, and sub-messages
//! framed by a declared content size with no end marker.

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::dictionary::TypeDictionary;
use crate::envelope::Envelope;
use crate::error::{WireError, WireResult};
use crate::message::Field;
use crate::sizer;
use crate::stream::{self, ElementWriter};
use crate::taxonomy::Taxonomy;
use crate::types::WireTypeId;
use crate::value::Value;

// Field prefix bit layout: bits 7-6 variable-length width selector,
// bit 5 fixed-width, bit 4 has-ordinal, bit 3 has-name.
const PREFIX_FIXED_WIDTH: u8 = 0x20;
const PREFIX_HAS_ORDINAL: u8 = 0x10;
const PREFIX_HAS_NAME: u8 = 0x08;

/// Push-style binary writer implementing the streaming element protocol.
///
/// Sub-message contents are buffered per open scope so the minimal length
/// field width can be chosen when the scope closes; the emitted byte count
/// therefore always matches the size calculator exactly.
pub struct WireEncoder<'a> {
    dictionary: &'a TypeDictionary,
    taxonomy: Option<&'a dyn Taxonomy>,
    out: BytesMut,
    frames: Vec<Frame>,
    started: bool,
    finished: bool,
}

struct Frame {
    name: Option<String>,
    ordinal: Option<i16>,
    buf: BytesMut,
}

impl<'a> WireEncoder<'a> {
    /// An encoder over the standard dictionary, without a taxonomy.
    pub fn new() -> Self {
        Self::with_options(TypeDictionary::standard(), None)
    }

    pub fn with_options(
        dictionary: &'a TypeDictionary,
        taxonomy: Option<&'a dyn Taxonomy>,
    ) -> Self {
        WireEncoder {
            dictionary,
            taxonomy,
            out: BytesMut::with_capacity(128),
            frames: Vec::new(),
            started: false,
            finished: false,
        }
    }

    fn current_buf(&mut self) -> &mut BytesMut {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.buf,
            None => &mut self.out,
        }
    }

    fn check_open(&self) -> WireResult<()> {
        if !self.started {
            return Err(WireError::invalid("message not started"));
        }
        if self.finished {
            return Err(WireError::invalid("message already ended"));
        }
        Ok(())
    }

    /// The encoded message contents (no envelope header). Fails unless the
    /// message was properly ended.
    pub fn into_bytes(self) -> WireResult<Vec<u8>> {
        if !self.finished {
            return Err(WireError::invalid("message not ended"));
        }
        Ok(self.out.to_vec())
    }
}

impl Default for WireEncoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementWriter for WireEncoder<'_> {
    fn start_message(&mut self) -> WireResult<()> {
        if self.started {
            return Err(WireError::invalid("message already started"));
        }
        self.started = true;
        Ok(())
    }

    fn start_submessage(&mut self, name: Option<&str>, ordinal: Option<i16>) -> WireResult<()> {
        self.check_open()?;
        self.frames.push(Frame {
            name: name.map(str::to_string),
            ordinal,
            buf: BytesMut::new(),
        });
        Ok(())
    }

    fn write_field(&mut self, field: &Field) -> WireResult<()> {
        self.check_open()?;
        if matches!(field.value(), Value::Message(_)) {
            return Err(WireError::invalid(
                "sub-message values must be written through start_submessage",
            ));
        }
        let dictionary = self.dictionary;
        let taxonomy = self.taxonomy;
        encode_field_into(
            self.current_buf(),
            dictionary,
            taxonomy,
            field.name(),
            field.ordinal(),
            field.type_id(),
            Payload::Value(field.value()),
        )
    }

    fn end_submessage(&mut self) -> WireResult<()> {
        self.check_open()?;
        let Some(frame) = self.frames.pop() else {
            return Err(WireError::invalid("no open sub-message to end"));
        };
        let dictionary = self.dictionary;
        let taxonomy = self.taxonomy;
        encode_field_into(
            self.current_buf(),
            dictionary,
            taxonomy,
            frame.name.as_deref(),
            frame.ordinal,
            WireTypeId::SubMessage as u8,
            Payload::Submessage(&frame.buf),
        )
    }

    fn end_message(&mut self) -> WireResult<()> {
        self.check_open()?;
        if !self.frames.is_empty() {
            return Err(WireError::invalid(
                "message ended while sub-messages remain open",
            ));
        }
        self.finished = true;
        Ok(())
    }
}

enum Payload<'a> {
    Value(&'a Value),
    Submessage(&'a [u8]),
}

fn encode_field_into(
    buf: &mut BytesMut,
    dictionary: &TypeDictionary,
    taxonomy: Option<&dyn Taxonomy>,
    name: Option<&str>,
    ordinal: Option<i16>,
    type_id: u8,
    payload: Payload<'_>,
) -> WireResult<()> {
    let (name, ordinal) = sizer::wire_identity(name, ordinal, taxonomy);
    if let Some(name) = name {
        if name.len() > sizer::MAX_NAME_LENGTH {
            return Err(WireError::invalid(format!(
                "field name exceeds {} bytes: {} bytes",
                sizer::MAX_NAME_LENGTH,
                name.len()
            )));
        }
    }

    let payload_size = match &payload {
        Payload::Value(v) => sizer::value_payload_size(v),
        Payload::Submessage(b) => b.len(),
    };

    let fixed = dictionary.resolve(type_id).fixed_size;
    let (selector, length_width) = match fixed {
        Some(width) => {
            if payload_size != width {
                return Err(WireError::invalid(format!(
                    "fixed-width type {type_id} expects {width} bytes, value has {payload_size}"
                )));
            }
            (0u8, 0usize)
        }
        None => {
            let width = sizer::length_field_width(payload_size);
            (sizer::width_selector(width), width)
        }
    };

    let mut prefix = selector << 6;
    if fixed.is_some() {
        prefix |= PREFIX_FIXED_WIDTH;
    }
    if ordinal.is_some() {
        prefix |= PREFIX_HAS_ORDINAL;
    }
    if name.is_some() {
        prefix |= PREFIX_HAS_NAME;
    }

    buf.put_u8(prefix);
    buf.put_u8(type_id);
    if let Some(ordinal) = ordinal {
        buf.put_i16(ordinal);
    }
    if let Some(name) = name {
        buf.put_u8(name.len() as u8);
        buf.put_slice(name.as_bytes());
    }
    match length_width {
        0 => {}
        1 => buf.put_u8(payload_size as u8),
        2 => buf.put_u16(payload_size as u16),
        _ => buf.put_u32(payload_size as u32),
    }

    match payload {
        Payload::Value(value) => put_value(buf, value),
        Payload::Submessage(contents) => buf.put_slice(contents),
    }
    Ok(())
}

/// Emit the payload bytes of a non-message value, big-endian throughout.
fn put_value(buf: &mut BytesMut, value: &Value) {
    match value {
        Value::Indicator => {}
        Value::Boolean(b) => buf.put_u8(*b as u8),
        Value::Int8(n) => buf.put_i8(*n),
        Value::Int16(n) => buf.put_i16(*n),
        Value::Int32(n) => buf.put_i32(*n),
        Value::Int64(n) => buf.put_i64(*n),
        Value::Float32(f) => buf.put_f32(*f),
        Value::Float64(f) => buf.put_f64(*f),
        Value::Bytes(b) => buf.put_slice(b),
        Value::Int16Array(a) => {
            for n in a {
                buf.put_i16(*n);
            }
        }
        Value::Int32Array(a) => {
            for n in a {
                buf.put_i32(*n);
            }
        }
        Value::Int64Array(a) => {
            for n in a {
                buf.put_i64(*n);
            }
        }
        Value::Float32Array(a) => {
            for f in a {
                buf.put_f32(*f);
            }
        }
        Value::Float64Array(a) => {
            for f in a {
                buf.put_f64(*f);
            }
        }
        Value::Text(s) => buf.put_slice(s.as_bytes()),
        Value::Date(d) => buf.put_u32(d.pack()),
        Value::Time(t) => buf.put_slice(&t.pack()),
        Value::DateTime(dt) => {
            buf.put_u32(dt.date.pack());
            buf.put_slice(&dt.time.pack());
        }
        Value::Opaque { bytes, .. } => buf.put_slice(bytes),
        Value::Message(_) => unreachable!("sub-messages are framed by the encoder"),
    }
}

/// Encode a full envelope using the standard dictionary.
pub fn encode_envelope(envelope: &Envelope, taxonomy: Option<&dyn Taxonomy>) -> WireResult<Vec<u8>> {
    encode_envelope_with(envelope, taxonomy, TypeDictionary::standard())
}

/// Encode a full envelope: 8-byte header, then the message contents. The
/// total size is pre-computed by the size calculator so the header can be
/// written first.
pub fn encode_envelope_with(
    envelope: &Envelope,
    taxonomy: Option<&dyn Taxonomy>,
    dictionary: &TypeDictionary,
) -> WireResult<Vec<u8>> {
    let total = sizer::envelope_size(envelope, taxonomy, dictionary)?;
    if total > u32::MAX as usize {
        return Err(WireError::invalid(format!(
            "envelope size {total} exceeds the 32-bit size field"
        )));
    }

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u8(envelope.processing_directives());
    buf.put_u8(envelope.schema_version());
    buf.put_i16(envelope.taxonomy_id());
    buf.put_u32(total as u32);

    let mut encoder = WireEncoder::with_options(dictionary, taxonomy);
    stream::write_message(envelope.message(), &mut encoder)?;
    let body = encoder.into_bytes()?;
    debug_assert_eq!(body.len(), total - sizer::ENVELOPE_HEADER_SIZE);
    buf.put_slice(&body);

    trace!(bytes = total, taxonomy_id = envelope.taxonomy_id(), "encoded envelope");
    Ok(buf.to_vec())
}
