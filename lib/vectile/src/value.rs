//! The version 1/2 property value message.

use crate::types::value_fields;
use crate::wire::{put_str_field, put_tag, put_varint_field, zigzag64, WIRE_FIXED32, WIRE_FIXED64};

/// A typed property value for version 1/2 layers.
///
/// Values are deduplicated by their encoded byte pattern, so the numeric
/// variants are distinct even when they represent the same number:
/// `Int(19)`, `Uint(19)` and `Double(19.0)` produce three separate table
/// entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue<'a> {
    /// UTF-8 string value.
    String(&'a str),
    /// 32-bit float value.
    Float(f32),
    /// 64-bit float value.
    Double(f64),
    /// Signed integer, plain varint encoding.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Signed integer, zig-zag encoding.
    Sint(i64),
    /// Boolean value.
    Bool(bool),
}

impl PropertyValue<'_> {
    /// Encodes the value message into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        self.encode_into(&mut buf);
        buf
    }

    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        match *self {
            Self::String(s) => put_str_field(buf, value_fields::STRING, s),
            Self::Float(v) => {
                put_tag(buf, value_fields::FLOAT, WIRE_FIXED32);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Self::Double(v) => {
                put_tag(buf, value_fields::DOUBLE, WIRE_FIXED64);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Self::Int(v) => put_varint_field(buf, value_fields::INT, v as u64),
            Self::Uint(v) => put_varint_field(buf, value_fields::UINT, v),
            Self::Sint(v) => put_varint_field(buf, value_fields::SINT, zigzag64(v)),
            Self::Bool(v) => put_varint_field(buf, value_fields::BOOL, u64::from(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_encoding() {
        let encoded = PropertyValue::String("hi").encode();
        assert_eq!(encoded, vec![0x0A, 2, b'h', b'i']);
    }

    #[test]
    fn test_int_encoding() {
        let encoded = PropertyValue::Int(19).encode();
        assert_eq!(encoded, vec![0x20, 19]);
    }

    #[test]
    fn test_negative_int_uses_ten_bytes() {
        let encoded = PropertyValue::Int(-1).encode();
        assert_eq!(encoded.len(), 1 + 10);
    }

    #[test]
    fn test_sint_encoding() {
        let encoded = PropertyValue::Sint(-1).encode();
        assert_eq!(encoded, vec![0x30, 1]);
    }

    #[test]
    fn test_double_encoding() {
        let encoded = PropertyValue::Double(19.0).encode();
        assert_eq!(encoded[0], 0x19);
        assert_eq!(&encoded[1..], &19.0f64.to_le_bytes());
    }

    #[test]
    fn test_same_number_different_types_differ() {
        let int = PropertyValue::Int(19).encode();
        let uint = PropertyValue::Uint(19).encode();
        let double = PropertyValue::Double(19.0).encode();
        assert_ne!(int, uint);
        assert_ne!(int, double);
        assert_ne!(uint, double);
    }
}
