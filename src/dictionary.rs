//! Tagwire Type Dictionary
//! Maps wire type identifiers to type descriptors, picks the best wire type
//! for a host value, and converts between related primitive representations.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{WireError, WireResult};
use crate::types::WireTypeId;
use crate::value::Value;

/// Descriptor for one wire type: its identifier, a display name, and its
/// fixed byte width (`None` for variable-width types).
///
/// Standard descriptors are registered at dictionary construction and never
/// mutated. Registering a *fixed* width for an application type is what
/// allows the decoder to bound that type's values; without it an unknown
/// identifier can only be decoded when the field prefix carries a length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireType {
    pub id: u8,
    pub name: Cow<'static, str>,
    pub fixed_size: Option<usize>,
}

impl WireType {
    pub fn is_variable_size(&self) -> bool {
        self.fixed_size.is_none()
    }

    fn standard(id: WireTypeId) -> Self {
        WireType {
            id: id as u8,
            name: Cow::Borrowed(id.name()),
            fixed_size: id.fixed_size(),
        }
    }
}

/// Registry of wire types for one encoding context.
///
/// Created once and treated as read-mostly: sharing a dictionary across
/// concurrently operating readers and writers is fine as long as no new
/// types are registered while lookups are in flight (callers must serialize
/// registration externally).
#[derive(Debug, Clone)]
pub struct TypeDictionary {
    by_id: HashMap<u8, WireType>,
}

impl TypeDictionary {
    /// A dictionary holding the standard types 0-28.
    pub fn new() -> Self {
        let mut by_id = HashMap::new();
        for id in 0u8..=28 {
            if let Some(t) = WireTypeId::from_u8(id) {
                by_id.insert(id, WireType::standard(t));
            }
        }
        TypeDictionary { by_id }
    }

    /// The process-wide standard dictionary, used by the convenience
    /// encode/decode entry points.
    pub fn standard() -> &'static TypeDictionary {
        static STANDARD: OnceLock<TypeDictionary> = OnceLock::new();
        STANDARD.get_or_init(TypeDictionary::new)
    }

    /// Register an application-defined type. Identifiers must be unique and
    /// outside the standard range; by convention applications allocate from
    /// 255 downward.
    pub fn register(&mut self, wire_type: WireType) -> WireResult<()> {
        if wire_type.id <= 28 {
            return Err(WireError::invalid(format!(
                "type id {} is reserved for standard types",
                wire_type.id
            )));
        }
        if self.by_id.contains_key(&wire_type.id) {
            return Err(WireError::invalid(format!(
                "type id {} already registered",
                wire_type.id
            )));
        }
        self.by_id.insert(wire_type.id, wire_type);
        Ok(())
    }

    /// Look up a registered type.
    pub fn get(&self, id: u8) -> Option<&WireType> {
        self.by_id.get(&id)
    }

    /// Resolve an identifier to a type descriptor, synthesizing a
    /// variable-width unknown type for identifiers this dictionary does not
    /// know. Unknown values stay opaque byte blobs.
    pub fn resolve(&self, id: u8) -> WireType {
        self.by_id.get(&id).cloned().unwrap_or(WireType {
            id,
            name: Cow::Borrowed("UNKNOWN"),
            fixed_size: None,
        })
    }
}

impl Default for TypeDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// The wire type identifier a value encodes as.
pub fn best_match(value: &Value) -> u8 {
    value.wire_type()
}

/// Re-type an integer value to the smallest standard integer type that holds
/// it exactly. Non-integer values pass through unchanged. Deterministic: the
/// result depends only on the numeric value, never on the host variant it
/// arrived in.
pub fn minimize(value: Value) -> Value {
    let n = match value {
        Value::Int8(n) => n as i64,
        Value::Int16(n) => n as i64,
        Value::Int32(n) => n as i64,
        Value::Int64(n) => n,
        other => return other,
    };
    if let Ok(n) = i8::try_from(n) {
        Value::Int8(n)
    } else if let Ok(n) = i16::try_from(n) {
        Value::Int16(n)
    } else if let Ok(n) = i32::try_from(n) {
        Value::Int32(n)
    } else {
        Value::Int64(n)
    }
}

// Conversion rules between primitive representations. Widening always
// succeeds; narrowing range-checks and fails with Overflow; boolean and
// numeric interconvert with zero = false; strings parse/format decimally.
// Everything else is Unsupported, which callers must be able to tell apart
// from Overflow.

fn as_integral(value: &Value) -> Option<i64> {
    match value {
        Value::Boolean(b) => Some(*b as i64),
        Value::Int8(n) => Some(*n as i64),
        Value::Int16(n) => Some(*n as i64),
        Value::Int32(n) => Some(*n as i64),
        Value::Int64(n) => Some(*n),
        _ => None,
    }
}

/// Convert a floating point value to i64 when it is integral and in range.
fn float_to_i64(f: f64) -> WireResult<i64> {
    if f.fract() != 0.0 || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(WireError::Overflow {
            value: f.to_string(),
            target: "i64",
        });
    }
    Ok(f as i64)
}

/// Widen or parse a value into an i64. The single integer path every
/// narrower conversion goes through.
pub fn coerce_i64(value: &Value) -> WireResult<i64> {
    if let Some(n) = as_integral(value) {
        return Ok(n);
    }
    match value {
        Value::Float32(f) => float_to_i64(*f as f64),
        Value::Float64(f) => float_to_i64(*f),
        Value::Text(s) => s.trim().parse::<i64>().map_err(|_| WireError::Unsupported {
            from: "text",
            to: "i64",
        }),
        other => Err(WireError::Unsupported {
            from: other.shape_name(),
            to: "i64",
        }),
    }
}

fn narrow<T>(value: &Value, target: &'static str) -> WireResult<T>
where
    T: TryFrom<i64>,
{
    let wide = coerce_i64(value).map_err(|e| retarget(e, target))?;
    T::try_from(wide).map_err(|_| WireError::Overflow {
        value: wide.to_string(),
        target,
    })
}

// Keep the reported target type accurate when the widening step failed.
fn retarget(err: WireError, target: &'static str) -> WireError {
    match err {
        WireError::Unsupported { from, .. } => WireError::Unsupported { from, to: target },
        WireError::Overflow { value, .. } => WireError::Overflow { value, target },
        other => other,
    }
}

pub fn coerce_i8(value: &Value) -> WireResult<i8> {
    narrow(value, "i8")
}

pub fn coerce_i16(value: &Value) -> WireResult<i16> {
    narrow(value, "i16")
}

pub fn coerce_i32(value: &Value) -> WireResult<i32> {
    narrow(value, "i32")
}

pub fn coerce_f64(value: &Value) -> WireResult<f64> {
    if let Some(n) = as_integral(value) {
        return Ok(n as f64);
    }
    match value {
        Value::Float32(f) => Ok(*f as f64),
        Value::Float64(f) => Ok(*f),
        Value::Text(s) => s.trim().parse::<f64>().map_err(|_| WireError::Unsupported {
            from: "text",
            to: "f64",
        }),
        other => Err(WireError::Unsupported {
            from: other.shape_name(),
            to: "f64",
        }),
    }
}

pub fn coerce_f32(value: &Value) -> WireResult<f32> {
    let wide = coerce_f64(value).map_err(|e| retarget(e, "f32"))?;
    let narrow = wide as f32;
    if narrow.is_infinite() && wide.is_finite() {
        return Err(WireError::Overflow {
            value: wide.to_string(),
            target: "f32",
        });
    }
    Ok(narrow)
}

/// Boolean conversion: zero is false, any nonzero numeric is true.
pub fn coerce_bool(value: &Value) -> WireResult<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Float32(f) => Ok(*f != 0.0),
        Value::Float64(f) => Ok(*f != 0.0),
        _ => match as_integral(value) {
            Some(n) => Ok(n != 0),
            None => Err(WireError::Unsupported {
                from: value.shape_name(),
                to: "bool",
            }),
        },
    }
}

/// Canonical decimal formatting for numerics; text passes through.
pub fn coerce_string(value: &Value) -> WireResult<String> {
    match value {
        Value::Text(s) => Ok(s.clone()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Int8(n) => Ok(n.to_string()),
        Value::Int16(n) => Ok(n.to_string()),
        Value::Int32(n) => Ok(n.to_string()),
        Value::Int64(n) => Ok(n.to_string()),
        Value::Float32(f) => Ok(f.to_string()),
        Value::Float64(f) => Ok(f.to_string()),
        other => Err(WireError::Unsupported {
            from: other.shape_name(),
            to: "string",
        }),
    }
}

pub fn coerce_bytes(value: &Value) -> WireResult<Vec<u8>> {
    match value {
        Value::Bytes(b) => Ok(b.clone()),
        other => Err(WireError::Unsupported {
            from: other.shape_name(),
            to: "bytes",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_dictionary() {
        let dict = TypeDictionary::new();
        assert_eq!(dict.get(4).unwrap().fixed_size, Some(4));
        assert_eq!(dict.get(14).unwrap().fixed_size, None);
        assert!(dict.get(16).is_none());
        assert!(dict.get(200).is_none());
    }

    #[test]
    fn test_resolve_synthesizes_unknown() {
        let dict = TypeDictionary::new();
        let t = dict.resolve(200);
        assert_eq!(t.id, 200);
        assert!(t.is_variable_size());
    }

    #[test]
    fn test_register_custom() {
        let mut dict = TypeDictionary::new();
        dict.register(WireType {
            id: 255,
            name: Cow::Borrowed("UUID_PAIR"),
            fixed_size: Some(32),
        })
        .unwrap();
        assert_eq!(dict.resolve(255).fixed_size, Some(32));

        // Duplicate and reserved ids are rejected.
        assert!(dict
            .register(WireType {
                id: 255,
                name: Cow::Borrowed("DUP"),
                fixed_size: None,
            })
            .is_err());
        assert!(dict
            .register(WireType {
                id: 5,
                name: Cow::Borrowed("CLASH"),
                fixed_size: None,
            })
            .is_err());
    }

    #[test]
    fn test_minimize_determinism() {
        assert_eq!(minimize(Value::Int32(17)), Value::Int8(17));
        assert_eq!(minimize(Value::Int64(17)), Value::Int8(17));
        assert_eq!(minimize(Value::Int64(1000)), Value::Int16(1000));
        assert_eq!(minimize(Value::Int64(100_000)), Value::Int32(100_000));
        assert_eq!(
            minimize(Value::Int64(1 << 40)),
            Value::Int64(1 << 40)
        );
        assert_eq!(minimize(Value::Float64(17.0)), Value::Float64(17.0));
    }

    #[test]
    fn test_widening() {
        assert_eq!(coerce_i32(&Value::Int8(14)).unwrap(), 14);
        assert_eq!(coerce_i64(&Value::Int16(1000)).unwrap(), 1000);
        assert_eq!(coerce_f64(&Value::Int32(7)).unwrap(), 7.0);
    }

    #[test]
    fn test_narrowing_range_check() {
        assert_eq!(coerce_i16(&Value::Int32(1000)).unwrap(), 1000);
        assert!(matches!(
            coerce_i16(&Value::Int32(40_000)),
            Err(WireError::Overflow { .. })
        ));
        assert!(matches!(
            coerce_i8(&Value::Int64(300)),
            Err(WireError::Overflow { .. })
        ));
    }

    #[test]
    fn test_unsupported_distinct_from_overflow() {
        let err = coerce_i32(&Value::Bytes(vec![1, 2])).unwrap_err();
        assert!(matches!(err, WireError::Unsupported { .. }));
    }

    #[test]
    fn test_bool_numeric() {
        assert!(coerce_bool(&Value::Int32(5)).unwrap());
        assert!(!coerce_bool(&Value::Int32(0)).unwrap());
        assert!(coerce_bool(&Value::Float64(0.5)).unwrap());
        assert_eq!(coerce_i32(&Value::Boolean(true)).unwrap(), 1);
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(coerce_string(&Value::Int32(42)).unwrap(), "42");
        assert_eq!(coerce_i32(&Value::Text("123".into())).unwrap(), 123);
        assert_eq!(coerce_f64(&Value::Text("1.5".into())).unwrap(), 1.5);
        assert!(matches!(
            coerce_i32(&Value::Text("not a number".into())),
            Err(WireError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_float_to_int() {
        assert_eq!(coerce_i32(&Value::Float64(12.0)).unwrap(), 12);
        assert!(coerce_i32(&Value::Float64(12.5)).is_err());
    }
}
