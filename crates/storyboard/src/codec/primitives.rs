//! Primitive encoding/decoding for storyboard documents.
//!
//! Two layers: a varint reader/writer for the compressed envelope, and
//! path-tracking accessors for the JSON object tree.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_VARINT_BYTES;
use crate::model::{Id, ResourceId};

// =============================================================================
// ENVELOPE
// =============================================================================

/// Reader over the bytes of the compressed envelope.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the unread bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let Some(byte) = self.data.get(self.pos).copied() else {
            return Err(DecodeError::UnexpectedEof { context });
        };
        self.pos += 1;
        Ok(byte)
    }

    /// Reads an unsigned varint (LEB128).
    pub fn read_varint(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0;

        for _ in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte(context)?;
            let value = (byte & 0x7F) as u64;

            if shift == 63 && value > 1 {
                return Err(DecodeError::VarintOverflow);
            }
            result |= value << shift;

            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }

        Err(DecodeError::VarintTooLong)
    }
}

/// Writer for the compressed envelope.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes an unsigned varint (LEB128).
    pub fn write_varint(&mut self, mut value: u64) {
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf[len] = byte;
            len += 1;
            if value == 0 {
                break;
            }
        }
        self.buf.extend_from_slice(&buf[..len]);
    }
}

// =============================================================================
// JSON DECODING
// =============================================================================

/// Read access to one JSON object, reporting errors against its path.
///
/// `null` is treated the same as an absent key by every `opt_*` accessor.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    object: &'a Map<String, Value>,
    path: &'a str,
}

impl<'a> Fields<'a> {
    pub fn new(object: &'a Map<String, Value>, path: &'a str) -> Self {
        Self { object, path }
    }

    /// Wraps `value`, which must be an object.
    pub fn of(value: &'a Value, path: &'a str) -> Result<Self, DecodeError> {
        value
            .as_object()
            .map(|object| Fields::new(object, path))
            .ok_or_else(|| DecodeError::invalid(path, "object"))
    }

    /// Path of the field `key`.
    pub fn at(&self, key: &str) -> String {
        join(self.path, key)
    }

    pub fn opt(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|v| !v.is_null())
    }

    pub fn required(&self, key: &str) -> Result<&'a Value, DecodeError> {
        self.opt(key).ok_or_else(|| DecodeError::missing(self.at(key)))
    }

    pub fn string(&self, key: &str) -> Result<String, DecodeError> {
        self.opt_string(key)?
            .ok_or_else(|| DecodeError::missing(self.at(key)))
    }

    pub fn opt_string(&self, key: &str) -> Result<Option<String>, DecodeError> {
        self.opt(key)
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| DecodeError::invalid(self.at(key), "string"))
            })
            .transpose()
    }

    pub fn number(&self, key: &str) -> Result<f64, DecodeError> {
        self.opt_number(key)?
            .ok_or_else(|| DecodeError::missing(self.at(key)))
    }

    pub fn opt_number(&self, key: &str) -> Result<Option<f64>, DecodeError> {
        self.opt(key)
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| DecodeError::invalid(self.at(key), "number"))
            })
            .transpose()
    }

    pub fn number_or(&self, key: &str, default: f64) -> Result<f64, DecodeError> {
        Ok(self.opt_number(key)?.unwrap_or(default))
    }

    pub fn opt_u32(&self, key: &str) -> Result<Option<u32>, DecodeError> {
        self.opt(key)
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| DecodeError::invalid(self.at(key), "non-negative integer"))
            })
            .transpose()
    }

    pub fn u32(&self, key: &str) -> Result<u32, DecodeError> {
        self.opt_u32(key)?
            .ok_or_else(|| DecodeError::missing(self.at(key)))
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, DecodeError> {
        match self.opt(key) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| DecodeError::invalid(self.at(key), "boolean")),
        }
    }

    /// Array at `key`; an absent key is an empty array.
    pub fn array(&self, key: &str) -> Result<&'a [Value], DecodeError> {
        match self.opt(key) {
            None => Ok(&[]),
            Some(v) => v
                .as_array()
                .map(Vec::as_slice)
                .ok_or_else(|| DecodeError::invalid(self.at(key), "array")),
        }
    }

    pub fn opt_object(&self, key: &str) -> Result<Option<&'a Map<String, Value>>, DecodeError> {
        self.opt(key)
            .map(|v| {
                v.as_object()
                    .ok_or_else(|| DecodeError::invalid(self.at(key), "object"))
            })
            .transpose()
    }

    /// Enum serialized by serde under its wire name; absent → `Default`.
    pub fn enum_or_default<T: DeserializeOwned + Default>(
        &self,
        key: &str,
        expected: &'static str,
    ) -> Result<T, DecodeError> {
        match self.opt(key) {
            None => Ok(T::default()),
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|_| DecodeError::invalid(self.at(key), expected)),
        }
    }

    pub fn id(&self, key: &str) -> Result<Id, DecodeError> {
        self.string(key).map(Id::new)
    }

    pub fn opt_id(&self, key: &str) -> Result<Option<Id>, DecodeError> {
        Ok(self.opt_string(key)?.map(Id::new))
    }

    pub fn opt_resource_id(&self, key: &str) -> Result<Option<ResourceId>, DecodeError> {
        Ok(self.opt_string(key)?.map(ResourceId::new))
    }

    /// Array of id strings; absent → empty.
    pub fn id_list(&self, key: &str) -> Result<Vec<Id>, DecodeError> {
        self.array(key)?
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str()
                    .map(Id::new)
                    .ok_or_else(|| DecodeError::invalid(index_path(&self.at(key), i), "id string"))
            })
            .collect()
    }
}

pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

pub(crate) fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

// =============================================================================
// JSON ENCODING
// =============================================================================

/// JSON number for `value`, rejecting NaN and infinities.
pub fn finite(path: impl FnOnce() -> String, value: f64) -> Result<Value, EncodeError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| EncodeError::NonFiniteNumber {
            path: path(),
            value,
        })
}

/// Serializes a plain serde type (wire-named enums, annotations).
pub fn to_wire<T: serde::Serialize>(path: impl FnOnce() -> String, value: &T) -> Result<Value, EncodeError> {
    serde_json::to_value(value).map_err(|e| EncodeError::Serialization {
        path: path(),
        message: e.to_string(),
    })
}

/// Builder for an output JSON object whose numbers are checked for
/// finiteness against `path`.
#[derive(Debug)]
pub struct ObjectWriter<'p> {
    object: Map<String, Value>,
    path: &'p str,
}

impl<'p> ObjectWriter<'p> {
    pub fn new(path: &'p str) -> Self {
        Self {
            object: Map::new(),
            path,
        }
    }

    pub fn at(&self, key: &str) -> String {
        join(self.path, key)
    }

    pub fn put(&mut self, key: &str, value: impl Into<Value>) {
        self.object.insert(key.to_string(), value.into());
    }

    pub fn put_opt(&mut self, key: &str, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.put(key, value);
        }
    }

    pub fn number(&mut self, key: &str, value: f64) -> Result<(), EncodeError> {
        let number = finite(|| self.at(key), value)?;
        self.object.insert(key.to_string(), number);
        Ok(())
    }

    pub fn opt_number(&mut self, key: &str, value: Option<f64>) -> Result<(), EncodeError> {
        match value {
            Some(value) => self.number(key, value),
            None => Ok(()),
        }
    }

    pub fn wire<T: serde::Serialize>(&mut self, key: &str, value: &T) -> Result<(), EncodeError> {
        let encoded = to_wire(|| self.at(key), value)?;
        self.object.insert(key.to_string(), encoded);
        Ok(())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        for v in [0u64, 1, 127, 128, 255, 16384, u64::MAX] {
            let mut writer = Writer::default();
            writer.write_varint(v);

            let bytes = writer.into_bytes();
            let mut reader = Reader::new(&bytes);
            assert_eq!(reader.read_varint("test").unwrap(), v, "failed for {v}");
            assert!(reader.remaining().is_empty());
        }
    }

    #[test]
    fn test_varint_too_long() {
        let data = [0x80u8; 11];
        let mut reader = Reader::new(&data);
        assert!(matches!(reader.read_varint("test"), Err(DecodeError::VarintTooLong)));
    }

    #[test]
    fn test_varint_eof() {
        let data = [0x80u8];
        let mut reader = Reader::new(&data);
        assert!(matches!(
            reader.read_varint("size"),
            Err(DecodeError::UnexpectedEof { context: "size" })
        ));
    }

    #[test]
    fn test_fields_report_paths() {
        let value = json!({"name": 3, "list": ["A", 7], "flag": null});
        let fields = Fields::of(&value, "Text X").unwrap();

        assert_eq!(
            fields.string("name"),
            Err(DecodeError::invalid("Text X.name", "string"))
        );
        assert_eq!(fields.string("missing"), Err(DecodeError::missing("Text X.missing")));
        assert_eq!(
            fields.id_list("list"),
            Err(DecodeError::invalid("Text X.list[1]", "id string"))
        );
        assert_eq!(fields.bool_or("flag", true), Ok(true));
        assert!(fields.array("absent").unwrap().is_empty());
    }

    #[test]
    fn test_object_writer_rejects_non_finite() {
        let mut writer = ObjectWriter::new("Stack Y");
        assert!(writer.number("spacing", 8.0).is_ok());
        assert_eq!(
            writer.number("opacity", f64::NAN).unwrap_err().to_string(),
            "Stack Y.opacity is not a finite number: NaN"
        );
        assert_eq!(writer.into_value(), json!({"spacing": 8.0}));
    }
}
