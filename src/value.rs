//! Tagwire Field Values
//! The closed set of value shapes a field can hold, plus the calendar
//! types with their bit-packed wire layouts.

use crate::error::{WireError, WireResult};
use crate::message::Message;
use crate::types::WireTypeId;

/// A field value. One variant per supported wire shape, plus [`Value::Opaque`]
/// carrying raw bytes for type identifiers the dictionary does not know, so
/// unrecognized data round-trips without interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Indicator,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bytes(Vec<u8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    Float32Array(Vec<f32>),
    Float64Array(Vec<f64>),
    Text(String),
    Message(Message),
    Date(Date),
    Time(Time),
    DateTime(DateTime),
    /// Raw payload of an unrecognized type, kept for lossless round-trip.
    Opaque { type_id: u8, bytes: Vec<u8> },
}

impl Value {
    /// The wire type identifier this value encodes as. Byte arrays pick the
    /// exact-length fixed type where one exists.
    pub fn wire_type(&self) -> u8 {
        match self {
            Value::Indicator => WireTypeId::Indicator as u8,
            Value::Boolean(_) => WireTypeId::Boolean as u8,
            Value::Int8(_) => WireTypeId::Int8 as u8,
            Value::Int16(_) => WireTypeId::Int16 as u8,
            Value::Int32(_) => WireTypeId::Int32 as u8,
            Value::Int64(_) => WireTypeId::Int64 as u8,
            Value::Float32(_) => WireTypeId::Float32 as u8,
            Value::Float64(_) => WireTypeId::Float64 as u8,
            Value::Bytes(b) => WireTypeId::best_match_byte_array(b.len()) as u8,
            Value::Int16Array(_) => WireTypeId::Int16Array as u8,
            Value::Int32Array(_) => WireTypeId::Int32Array as u8,
            Value::Int64Array(_) => WireTypeId::Int64Array as u8,
            Value::Float32Array(_) => WireTypeId::Float32Array as u8,
            Value::Float64Array(_) => WireTypeId::Float64Array as u8,
            Value::Text(_) => WireTypeId::Text as u8,
            Value::Message(_) => WireTypeId::SubMessage as u8,
            Value::Date(_) => WireTypeId::Date as u8,
            Value::Time(_) => WireTypeId::Time as u8,
            Value::DateTime(_) => WireTypeId::DateTime as u8,
            Value::Opaque { type_id, .. } => *type_id,
        }
    }

    /// Short shape name for error reporting.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Value::Indicator => "indicator",
            Value::Boolean(_) => "boolean",
            Value::Int8(_) => "i8",
            Value::Int16(_) => "i16",
            Value::Int32(_) => "i32",
            Value::Int64(_) => "i64",
            Value::Float32(_) => "f32",
            Value::Float64(_) => "f64",
            Value::Bytes(_) => "bytes",
            Value::Int16Array(_) => "i16 array",
            Value::Int32Array(_) => "i32 array",
            Value::Int64Array(_) => "i64 array",
            Value::Float32Array(_) => "f32 array",
            Value::Float64Array(_) => "f64 array",
            Value::Text(_) => "text",
            Value::Message(_) => "message",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Opaque { .. } => "opaque",
        }
    }

    /// Create the smallest exact numeric value for an `f64`, preferring
    /// integers when the value has no fractional part.
    pub fn number(value: f64) -> Self {
        if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
            crate::dictionary::minimize(Value::Int64(value as i64))
        } else {
            Value::Float64(value)
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i8> for Value {
    fn from(n: i8) -> Self {
        Value::Int8(n)
    }
}

impl From<i16> for Value {
    fn from(n: i16) -> Self {
        Value::Int16(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float32(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Value::Bytes(data)
    }
}

impl From<&[u8]> for Value {
    fn from(data: &[u8]) -> Self {
        Value::Bytes(data.to_vec())
    }
}

impl From<Vec<i16>> for Value {
    fn from(data: Vec<i16>) -> Self {
        Value::Int16Array(data)
    }
}

impl From<Vec<i32>> for Value {
    fn from(data: Vec<i32>) -> Self {
        Value::Int32Array(data)
    }
}

impl From<Vec<i64>> for Value {
    fn from(data: Vec<i64>) -> Self {
        Value::Int64Array(data)
    }
}

impl From<Vec<f32>> for Value {
    fn from(data: Vec<f32>) -> Self {
        Value::Float32Array(data)
    }
}

impl From<Vec<f64>> for Value {
    fn from(data: Vec<f64>) -> Self {
        Value::Float64Array(data)
    }
}

impl From<Message> for Value {
    fn from(msg: Message) -> Self {
        Value::Message(msg)
    }
}

impl From<Date> for Value {
    fn from(d: Date) -> Self {
        Value::Date(d)
    }
}

impl From<Time> for Value {
    fn from(t: Time) -> Self {
        Value::Time(t)
    }
}

impl From<DateTime> for Value {
    fn from(dt: DateTime) -> Self {
        Value::DateTime(dt)
    }
}

/// Calendar date, encoded in 4 bytes as `(year << 9) | (month << 5) | day`.
/// Year is a signed 23-bit value; month and day of zero mean "unspecified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    year: i32,
    month: u8,
    day: u8,
}

const YEAR_MIN: i32 = -(1 << 22);
const YEAR_MAX: i32 = (1 << 22) - 1;

impl Date {
    pub fn new(year: i32, month: u8, day: u8) -> WireResult<Self> {
        if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
            return Err(WireError::Overflow {
                value: year.to_string(),
                target: "23-bit year",
            });
        }
        if month > 12 {
            return Err(WireError::invalid(format!("month out of range: {month}")));
        }
        if day > 31 {
            return Err(WireError::invalid(format!("day out of range: {day}")));
        }
        Ok(Date { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub(crate) fn pack(&self) -> u32 {
        ((self.year as u32) << 9) | ((self.month as u32) << 5) | self.day as u32
    }

    pub(crate) fn unpack(raw: u32) -> Self {
        // Arithmetic shift sign-extends the 23-bit year.
        let year = (raw as i32) >> 9;
        Date {
            year,
            month: ((raw >> 5) & 0x0f) as u8,
            day: (raw & 0x1f) as u8,
        }
    }
}

/// Time of day, encoded in 8 bytes: one signed byte of timezone offset in
/// 15-minute units (-128 = no timezone), a 4-bit accuracy code packed with
/// 20 bits of seconds-of-day in the next three bytes, then 4 bytes of
/// nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    timezone_offset: Option<i8>,
    accuracy: u8,
    seconds: u32,
    nanos: u32,
}

impl Time {
    pub fn new(
        timezone_offset: Option<i8>,
        accuracy: u8,
        seconds: u32,
        nanos: u32,
    ) -> WireResult<Self> {
        if accuracy > 0x0f {
            return Err(WireError::invalid(format!(
                "accuracy out of range: {accuracy}"
            )));
        }
        if seconds >= 86_400 {
            return Err(WireError::invalid(format!(
                "seconds-of-day out of range: {seconds}"
            )));
        }
        if nanos >= 1_000_000_000 {
            return Err(WireError::invalid(format!(
                "nanoseconds out of range: {nanos}"
            )));
        }
        Ok(Time {
            timezone_offset,
            accuracy,
            seconds,
            nanos,
        })
    }

    pub fn timezone_offset(&self) -> Option<i8> {
        self.timezone_offset
    }

    pub fn accuracy(&self) -> u8 {
        self.accuracy
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    pub(crate) fn pack(&self) -> [u8; 8] {
        let tz = self.timezone_offset.unwrap_or(-128) as u8;
        let packed = ((self.accuracy as u32) << 20) | self.seconds;
        let mut out = [0u8; 8];
        out[0] = tz;
        out[1] = (packed >> 16) as u8;
        out[2] = (packed >> 8) as u8;
        out[3] = packed as u8;
        out[4..8].copy_from_slice(&self.nanos.to_be_bytes());
        out
    }

    pub(crate) fn unpack(raw: &[u8]) -> Self {
        let tz = raw[0] as i8;
        let packed =
            ((raw[1] as u32) << 16) | ((raw[2] as u32) << 8) | raw[3] as u32;
        let nanos = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        Time {
            timezone_offset: if tz == -128 { None } else { Some(tz) },
            accuracy: ((packed >> 20) & 0x0f) as u8,
            seconds: packed & 0x000f_ffff,
            nanos,
        }
    }
}

/// Combined date and time, 12 bytes on the wire: the date then the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub date: Date,
    pub time: Time,
}

impl DateTime {
    pub fn new(date: Date, time: Time) -> Self {
        DateTime { date, time }
    }
}
