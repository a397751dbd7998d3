// Tagwire Wire Type Catalogue
// Standard type identifiers and their width classification

/// Standard wire type identifiers (0-28).
///
/// Identifier 16 is reserved and unused; application-defined types register
/// from 255 downward through the [`TypeDictionary`](crate::TypeDictionary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireTypeId {
    /// Zero-width presence marker.
    Indicator = 0,
    Boolean = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    /// Variable-length byte array.
    ByteArray = 6,
    Int16Array = 7,
    Int32Array = 8,
    Int64Array = 9,
    Float32 = 10,
    Float64 = 11,
    Float32Array = 12,
    Float64Array = 13,
    /// Length-prefixed UTF-8 text.
    Text = 14,
    /// Nested field container; framed by the codec, never read as a value.
    SubMessage = 15,
    ByteArray4 = 17,
    ByteArray8 = 18,
    ByteArray16 = 19,
    ByteArray20 = 20,
    ByteArray32 = 21,
    ByteArray64 = 22,
    ByteArray128 = 23,
    ByteArray256 = 24,
    ByteArray512 = 25,
    Date = 26,
    Time = 27,
    DateTime = 28,
}

impl WireTypeId {
    /// Convert a raw type identifier to a standard type, if it is one.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(WireTypeId::Indicator),
            1 => Some(WireTypeId::Boolean),
            2 => Some(WireTypeId::Int8),
            3 => Some(WireTypeId::Int16),
            4 => Some(WireTypeId::Int32),
            5 => Some(WireTypeId::Int64),
            6 => Some(WireTypeId::ByteArray),
            7 => Some(WireTypeId::Int16Array),
            8 => Some(WireTypeId::Int32Array),
            9 => Some(WireTypeId::Int64Array),
            10 => Some(WireTypeId::Float32),
            11 => Some(WireTypeId::Float64),
            12 => Some(WireTypeId::Float32Array),
            13 => Some(WireTypeId::Float64Array),
            14 => Some(WireTypeId::Text),
            15 => Some(WireTypeId::SubMessage),
            17 => Some(WireTypeId::ByteArray4),
            18 => Some(WireTypeId::ByteArray8),
            19 => Some(WireTypeId::ByteArray16),
            20 => Some(WireTypeId::ByteArray20),
            21 => Some(WireTypeId::ByteArray32),
            22 => Some(WireTypeId::ByteArray64),
            23 => Some(WireTypeId::ByteArray128),
            24 => Some(WireTypeId::ByteArray256),
            25 => Some(WireTypeId::ByteArray512),
            26 => Some(WireTypeId::Date),
            27 => Some(WireTypeId::Time),
            28 => Some(WireTypeId::DateTime),
            _ => None,
        }
    }

    /// Get the name of the type
    pub fn name(&self) -> &'static str {
        match self {
            WireTypeId::Indicator => "INDICATOR",
            WireTypeId::Boolean => "BOOLEAN",
            WireTypeId::Int8 => "INT8",
            WireTypeId::Int16 => "INT16",
            WireTypeId::Int32 => "INT32",
            WireTypeId::Int64 => "INT64",
            WireTypeId::ByteArray => "BYTE_ARRAY",
            WireTypeId::Int16Array => "INT16_ARRAY",
            WireTypeId::Int32Array => "INT32_ARRAY",
            WireTypeId::Int64Array => "INT64_ARRAY",
            WireTypeId::Float32 => "FLOAT32",
            WireTypeId::Float64 => "FLOAT64",
            WireTypeId::Float32Array => "FLOAT32_ARRAY",
            WireTypeId::Float64Array => "FLOAT64_ARRAY",
            WireTypeId::Text => "TEXT",
            WireTypeId::SubMessage => "SUB_MESSAGE",
            WireTypeId::ByteArray4 => "BYTE_ARRAY_4",
            WireTypeId::ByteArray8 => "BYTE_ARRAY_8",
            WireTypeId::ByteArray16 => "BYTE_ARRAY_16",
            WireTypeId::ByteArray20 => "BYTE_ARRAY_20",
            WireTypeId::ByteArray32 => "BYTE_ARRAY_32",
            WireTypeId::ByteArray64 => "BYTE_ARRAY_64",
            WireTypeId::ByteArray128 => "BYTE_ARRAY_128",
            WireTypeId::ByteArray256 => "BYTE_ARRAY_256",
            WireTypeId::ByteArray512 => "BYTE_ARRAY_512",
            WireTypeId::Date => "DATE",
            WireTypeId::Time => "TIME",
            WireTypeId::DateTime => "DATE_TIME",
        }
    }

    /// Get the fixed size in bytes, or `None` for variable-width types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            WireTypeId::Indicator => Some(0),
            WireTypeId::Boolean => Some(1),
            WireTypeId::Int8 => Some(1),
            WireTypeId::Int16 => Some(2),
            WireTypeId::Int32 => Some(4),
            WireTypeId::Int64 => Some(8),
            WireTypeId::Float32 => Some(4),
            WireTypeId::Float64 => Some(8),
            WireTypeId::ByteArray4 => Some(4),
            WireTypeId::ByteArray8 => Some(8),
            WireTypeId::ByteArray16 => Some(16),
            WireTypeId::ByteArray20 => Some(20),
            WireTypeId::ByteArray32 => Some(32),
            WireTypeId::ByteArray64 => Some(64),
            WireTypeId::ByteArray128 => Some(128),
            WireTypeId::ByteArray256 => Some(256),
            WireTypeId::ByteArray512 => Some(512),
            WireTypeId::Date => Some(4),
            WireTypeId::Time => Some(8),
            WireTypeId::DateTime => Some(12),
            _ => None,
        }
    }

    /// Check if this is a fixed-size type
    pub fn is_fixed_size(&self) -> bool {
        self.fixed_size().is_some()
    }

    /// Check if this is a variable-size type
    pub fn is_variable_size(&self) -> bool {
        self.fixed_size().is_none()
    }

    /// Select the best type for a byte array of the given length: the
    /// fixed-width array type of exactly that length where one exists,
    /// the variable-length byte array otherwise. Fixed types exist purely
    /// as a wire-size optimization (no length field is written).
    pub fn best_match_byte_array(length: usize) -> Self {
        match length {
            4 => WireTypeId::ByteArray4,
            8 => WireTypeId::ByteArray8,
            16 => WireTypeId::ByteArray16,
            20 => WireTypeId::ByteArray20,
            32 => WireTypeId::ByteArray32,
            64 => WireTypeId::ByteArray64,
            128 => WireTypeId::ByteArray128,
            256 => WireTypeId::ByteArray256,
            512 => WireTypeId::ByteArray512,
            _ => WireTypeId::ByteArray,
        }
    }

    /// True for the fixed-length and variable-length byte array types.
    pub fn is_byte_array(&self) -> bool {
        matches!(
            self,
            WireTypeId::ByteArray
                | WireTypeId::ByteArray4
                | WireTypeId::ByteArray8
                | WireTypeId::ByteArray16
                | WireTypeId::ByteArray20
                | WireTypeId::ByteArray32
                | WireTypeId::ByteArray64
                | WireTypeId::ByteArray128
                | WireTypeId::ByteArray256
                | WireTypeId::ByteArray512
        )
    }
}

impl From<WireTypeId> for u8 {
    fn from(t: WireTypeId) -> u8 {
        t as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(WireTypeId::Int32.is_fixed_size());
        assert!(WireTypeId::Text.is_variable_size());
        assert!(WireTypeId::SubMessage.is_variable_size());
        assert_eq!(WireTypeId::Indicator.fixed_size(), Some(0));
        assert_eq!(WireTypeId::DateTime.fixed_size(), Some(12));
        assert_eq!(WireTypeId::Float64.name(), "FLOAT64");
    }

    #[test]
    fn test_from_u8_round_trip() {
        for id in 0u8..=28 {
            match WireTypeId::from_u8(id) {
                Some(t) => assert_eq!(u8::from(t), id),
                None => assert_eq!(id, 16), // only gap in the standard range
            }
        }
        assert!(WireTypeId::from_u8(29).is_none());
        assert!(WireTypeId::from_u8(255).is_none());
    }

    #[test]
    fn test_best_match_byte_array() {
        assert_eq!(
            WireTypeId::best_match_byte_array(16),
            WireTypeId::ByteArray16
        );
        assert_eq!(
            WireTypeId::best_match_byte_array(512),
            WireTypeId::ByteArray512
        );
        assert_eq!(WireTypeId::best_match_byte_array(5), WireTypeId::ByteArray);
        assert_eq!(WireTypeId::best_match_byte_array(0), WireTypeId::ByteArray);
    }
}
