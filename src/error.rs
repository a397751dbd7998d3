//! Tagwire error taxonomy
//! Every failure the codec, dictionary, or container can report.

use thiserror::Error;

/// Errors raised while encoding, decoding, or converting tagwire data.
///
/// The variants are deliberately coarse but disjoint: callers must be able
/// to tell a malformed stream from a numeric overflow, an overflow from a
/// conversion that simply has no path, and either of those from a field
/// that is not present at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The byte stream violates the framing rules (truncated data, a
    /// declared size that does not match the nested content, bad UTF-8).
    #[error("malformed stream at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    /// A fixed-width type id the dictionary does not know. Without a
    /// registered width the value cannot be bounded, so the stream cannot
    /// be skipped safely.
    #[error("unknown fixed-width type 0x{type_id:02x} at byte {offset}")]
    UnknownFixedWidth { type_id: u8, offset: usize },

    /// A numeric value does not fit the requested narrower representation.
    #[error("value {value} out of range for {target}")]
    Overflow { value: String, target: &'static str },

    /// No conversion path exists between the stored and requested shapes.
    #[error("no conversion from {from} to {to}")]
    Unsupported { from: &'static str, to: &'static str },

    /// The requested field is not present in the container.
    #[error("field not found: {0}")]
    NotFound(String),

    /// A precondition violation by the caller: unbalanced start/end calls,
    /// writing a sub-message value outside the streaming protocol, names
    /// longer than 255 bytes, duplicate type registration, and the like.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl WireError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        WireError::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        WireError::InvalidState(reason.into())
    }
}

pub type WireResult<T> = Result<T, WireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WireError::malformed(12, "truncated field prefix");
        assert_eq!(
            err.to_string(),
            "malformed stream at byte 12: truncated field prefix"
        );

        let err = WireError::Overflow {
            value: "40000".to_string(),
            target: "i16",
        };
        assert_eq!(err.to_string(), "value 40000 out of range for i16");
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let overflow = WireError::Overflow {
            value: "300".to_string(),
            target: "i8",
        };
        let unsupported = WireError::Unsupported {
            from: "bytes",
            to: "i8",
        };
        assert_ne!(overflow, unsupported);
    }
}
