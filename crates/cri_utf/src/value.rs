//! Typed cell values.

use std::fmt::{self, Display};

use derive_more::derive::From;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::Table;
use crate::types::DataType;

/// A single cell, tagged with its [`DataType`]
///
/// Strings and data blobs are owned; the encoder interns them into the
/// table's string and data pools.
///
/// Floats compare by their bit pattern, so a stored NaN equals itself and
/// `0.0` differs from `-0.0`. With the `serde` feature, non-finite floats are
/// written as a hex string of their bits since JSON has no number for them.
#[derive(Debug, Clone, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    UInt8(u8),
    Int8(i8),
    UInt16(u16),
    Int16(i16),
    UInt32(u32),
    Int32(i32),
    UInt64(u64),
    Int64(i64),
    Float32(#[cfg_attr(feature = "serde", serde(with = "float_bits::single"))] f32),
    Float64(#[cfg_attr(feature = "serde", serde(with = "float_bits::double"))] f64),
    String(String),
    Data(Vec<u8>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::UInt8(a), Value::UInt8(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::UInt16(a), Value::UInt16(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::UInt32(a), Value::UInt32(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Data(a), Value::Data(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Data(value.to_vec())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::UInt8(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Data(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl Value {
    /// The type tag of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::UInt8(_) => DataType::UInt8,
            Value::Int8(_) => DataType::Int8,
            Value::UInt16(_) => DataType::UInt16,
            Value::Int16(_) => DataType::Int16,
            Value::UInt32(_) => DataType::UInt32,
            Value::Int32(_) => DataType::Int32,
            Value::UInt64(_) => DataType::UInt64,
            Value::Int64(_) => DataType::Int64,
            Value::Float32(_) => DataType::Float32,
            Value::Float64(_) => DataType::Float64,
            Value::String(_) => DataType::String,
            Value::Data(_) => DataType::Data,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Widens any integer value that is not negative.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt8(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::UInt64(v) => Some(v),
            Value::Int8(v) => u64::try_from(v).ok(),
            Value::Int16(v) => u64::try_from(v).ok(),
            Value::Int32(v) => u64::try_from(v).ok(),
            Value::Int64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Widens any integer value that fits an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::UInt8(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::UInt64(v) => i64::try_from(v).ok(),
            Value::Int8(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float32(v) => Some(v.into()),
            Value::Float64(v) => Some(v),
            _ => None,
        }
    }

    /// Decodes a data cell holding an embedded @UTF table.
    ///
    /// ACB files nest their cue, waveform and track tables inside data
    /// columns of the header table. Returns `None` when the cell is not a data
    /// blob starting with the table magic.
    pub fn nested_table(&self) -> Option<Result<Table>> {
        match self {
            Value::Data(bytes) if bytes.starts_with(crate::MAGIC) => {
                Some(crate::read::decode(bytes, 0))
            }
            _ => None,
        }
    }
}

/// Float fields as JSON numbers, or as `"0x…"` bit strings when not finite
#[cfg(feature = "serde")]
mod float_bits {
    use serde::{de::Error, Deserialize};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Bits(String),
    }

    fn parse_bits<E: Error>(text: &str) -> Result<u64, E> {
        text.strip_prefix("0x")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .ok_or_else(|| E::custom(format!("invalid float bits {text:?}")))
    }

    pub mod single {
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        use super::{parse_bits, Repr};

        pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
            if value.is_finite() {
                serializer.serialize_f32(*value)
            } else {
                serializer.serialize_str(&format!("{:#010x}", value.to_bits()))
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
            match Repr::deserialize(deserializer)? {
                Repr::Number(n) => Ok(n as f32),
                Repr::Bits(text) => {
                    let bits = u32::try_from(parse_bits::<D::Error>(&text)?)
                        .map_err(|_| D::Error::custom(format!("{text:?} is wider than 32 bits")))?;
                    Ok(f32::from_bits(bits))
                }
            }
        }
    }

    pub mod double {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::{parse_bits, Repr};

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            if value.is_finite() {
                serializer.serialize_f64(*value)
            } else {
                serializer.serialize_str(&format!("{:#018x}", value.to_bits()))
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            match Repr::deserialize(deserializer)? {
                Repr::Number(n) => Ok(n),
                Repr::Bits(text) => Ok(f64::from_bits(parse_bits::<D::Error>(&text)?)),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::types::DataType;
    use crate::value::Value;

    #[test]
    fn conversions_pick_matching_variant() {
        assert_eq!(Value::from(7u16).data_type(), DataType::UInt16);
        assert_eq!(Value::from(-1i64).data_type(), DataType::Int64);
        assert_eq!(Value::from(0.5f32).data_type(), DataType::Float32);
        assert_eq!(Value::from("cue_01"), Value::String("cue_01".into()));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Data(vec![1, 2]));
    }

    #[test]
    fn floats_compare_by_bits() {
        assert_eq!(Value::Float32(f32::NAN), Value::Float32(f32::NAN));
        assert_ne!(Value::Float64(0.0), Value::Float64(-0.0));
        assert_ne!(Value::UInt8(1), Value::Int8(1));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn non_finite_floats_survive_json() -> serde_json::Result<()> {
        let values = vec![
            Value::Float32(f32::NAN),
            Value::Float32(f32::NEG_INFINITY),
            Value::Float64(f64::from_bits(0x7FF8_0000_0000_0001)),
            Value::Float64(1.5),
        ];
        let json = serde_json::to_string(&values)?;
        assert!(json.contains(r#"{"Float32":"0x7fc00000"}"#), "{json}");
        assert!(json.contains(r#"{"Float64":1.5}"#), "{json}");
        let back: Vec<Value> = serde_json::from_str(&json)?;
        assert_eq!(back, values);
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn malformed_float_bits_are_rejected() {
        assert!(serde_json::from_str::<Value>(r#"{"Float32":"nan"}"#).is_err());
        assert!(serde_json::from_str::<Value>(r#"{"Float32":"0x7ff8000000000000"}"#).is_err());
    }

    #[test]
    fn integer_widening() {
        assert_eq!(Value::Int16(12).as_u64(), Some(12));
        assert_eq!(Value::Int8(-1).as_u64(), None);
        assert_eq!(Value::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(Value::Float32(1.0).as_i64(), None);
        assert_eq!(Value::String("a".into()).as_str(), Some("a"));
    }

    #[test]
    fn display_quotes_strings_and_sizes_blobs() {
        assert_eq!(Value::Int32(-7).to_string(), "-7");
        assert_eq!(Value::Float32(0.5).to_string(), "0.5");
        assert_eq!(Value::from("se_click").to_string(), "\"se_click\"");
        assert_eq!(Value::Data(vec![0; 3]).to_string(), "<3 bytes>");
    }

    #[test]
    fn plain_data_is_not_a_nested_table() {
        assert!(Value::Data(b"HCA\0".to_vec()).nested_table().is_none());
        assert!(Value::UInt32(0).nested_table().is_none());
        assert!(matches!(
            Value::Data(b"@UTF".to_vec()).nested_table(),
            Some(Err(_))
        ));
    }
}
