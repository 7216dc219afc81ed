//! Tuple schemas and the fixed-width row codec.
//!
//! A row is the concatenation of its fields in schema order. Every field has a
//! fixed width, so the byte offset of each field is known from the schema
//! alone:
//!
//! ```text
//! +---------+------------+------------------+
//! | INT (4) | DOUBLE (8) | CHAR (CHAR_SIZE) |
//! +---------+------------+------------------+
//! ```
//!
//! Integers and doubles are stored as native-endian raw bytes. Text is stored
//! left-justified in `CHAR_SIZE` bytes and zero-padded; it is read back up to
//! the first zero byte, so text containing a zero byte is rejected.

use crate::access::tuple::Tuple;
use crate::access::value::{CHAR_SIZE, FieldType, Value};
use crate::storage::error::{StorageError, StorageResult};
use byteorder::{ByteOrder, NativeEndian};
use std::collections::HashSet;

/// Ordered, named and typed field list describing a row.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleDesc {
    types: Vec<FieldType>,
    names: Vec<String>,
    // offsets[i] is the start of field i; offsets[len] is the row length
    offsets: Vec<usize>,
}

impl TupleDesc {
    pub fn new<S: Into<String>>(types: Vec<FieldType>, names: Vec<S>) -> StorageResult<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if types.len() != names.len() {
            return Err(StorageError::SchemaLengthMismatch {
                types: types.len(),
                names: names.len(),
            });
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(StorageError::DuplicateFieldName(name.clone()));
            }
        }

        let mut offsets = Vec::with_capacity(types.len() + 1);
        let mut offset = 0;
        for field_type in &types {
            offsets.push(offset);
            offset += field_type.width();
        }
        offsets.push(offset);

        Ok(Self {
            types,
            names,
            offsets,
        })
    }

    /// Concatenate two schemas, `a`'s fields first.
    ///
    /// Field names must stay unique across the result.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> StorageResult<TupleDesc> {
        let types = a.types.iter().chain(&b.types).copied().collect();
        let names = a.names.iter().chain(&b.names).cloned().collect::<Vec<_>>();
        TupleDesc::new(types, names)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Total width of a row in bytes.
    pub fn length(&self) -> usize {
        self.offsets[self.types.len()]
    }

    /// Byte offset of field `index` within a row. `offset_of(len())` is the
    /// row length.
    pub fn offset_of(&self, index: usize) -> StorageResult<usize> {
        self.offsets
            .get(index)
            .copied()
            .ok_or(StorageError::FieldIndexOutOfRange {
                index,
                len: self.types.len(),
            })
    }

    pub fn index_of(&self, name: &str) -> StorageResult<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| StorageError::FieldNotFound(name.to_string()))
    }

    pub fn field_type(&self, index: usize) -> StorageResult<FieldType> {
        self.types
            .get(index)
            .copied()
            .ok_or(StorageError::FieldIndexOutOfRange {
                index,
                len: self.types.len(),
            })
    }

    pub fn field_name(&self, index: usize) -> StorageResult<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .ok_or(StorageError::FieldIndexOutOfRange {
                index,
                len: self.names.len(),
            })
    }

    pub fn types(&self) -> &[FieldType] {
        &self.types
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// True iff the tuple has as many fields as the schema and each value's
    /// type matches the declared type at its position.
    pub fn compatible(&self, tuple: &Tuple) -> bool {
        self.check_compatible(tuple).is_ok()
    }

    fn check_compatible(&self, tuple: &Tuple) -> StorageResult<()> {
        if tuple.len() != self.types.len() {
            return Err(StorageError::IncompatibleTuple {
                expected: self.types.len(),
                found: tuple.len(),
            });
        }
        for (field, (value, expected)) in tuple.values().iter().zip(&self.types).enumerate() {
            if !value.is_compatible_with(*expected) {
                return Err(StorageError::TypeMismatch {
                    field,
                    expected: *expected,
                    found: value.field_type(),
                });
            }
        }
        Ok(())
    }

    /// Encode `tuple` into the first `length()` bytes of `buf`.
    ///
    /// Nothing is written unless the whole tuple can be encoded.
    pub fn serialize(&self, buf: &mut [u8], tuple: &Tuple) -> StorageResult<()> {
        self.check_compatible(tuple)?;
        self.check_buffer(buf.len())?;
        for (field, value) in tuple.values().iter().enumerate() {
            if let Value::Char(s) = value {
                if s.len() > CHAR_SIZE {
                    return Err(StorageError::TextTooLong {
                        len: s.len(),
                        max: CHAR_SIZE,
                    });
                }
                // A zero byte would end the text early on read
                if s.as_bytes().contains(&0) {
                    return Err(StorageError::ZeroByteInText { field });
                }
            }
        }

        for (i, value) in tuple.values().iter().enumerate() {
            let start = self.offsets[i];
            let field = &mut buf[start..self.offsets[i + 1]];
            match value {
                Value::Int(v) => NativeEndian::write_i32(field, *v),
                Value::Double(v) => NativeEndian::write_f64(field, *v),
                Value::Char(s) => {
                    let bytes = s.as_bytes();
                    field[..bytes.len()].copy_from_slice(bytes);
                    field[bytes.len()..].fill(0);
                }
            }
        }

        Ok(())
    }

    /// Decode a tuple from the first `length()` bytes of `buf`.
    pub fn deserialize(&self, buf: &[u8]) -> StorageResult<Tuple> {
        self.check_buffer(buf.len())?;

        let mut values = Vec::with_capacity(self.types.len());
        for (i, field_type) in self.types.iter().enumerate() {
            let field = &buf[self.offsets[i]..self.offsets[i + 1]];
            let value = match field_type {
                FieldType::Int => Value::Int(NativeEndian::read_i32(field)),
                FieldType::Double => Value::Double(NativeEndian::read_f64(field)),
                FieldType::Char => {
                    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
                    let s = std::str::from_utf8(&field[..end])
                        .map_err(|_| StorageError::InvalidText { field: i })?;
                    Value::Char(s.to_string())
                }
            };
            values.push(value);
        }

        Ok(Tuple::new(values))
    }

    /// Encode the schema for storage next to a heap file.
    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        Ok(bincode::serialize(&(&self.types, &self.names))?)
    }

    /// Decode a schema written by [`TupleDesc::encode`], re-validating it.
    pub fn decode(data: &[u8]) -> StorageResult<Self> {
        let (types, names): (Vec<FieldType>, Vec<String>) = bincode::deserialize(data)?;
        TupleDesc::new(types, names)
    }

    fn check_buffer(&self, available: usize) -> StorageResult<()> {
        let required = self.length();
        if available < required {
            return Err(StorageError::BufferTooSmall {
                required,
                available,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn people() -> TupleDesc {
        TupleDesc::new(
            vec![FieldType::Int, FieldType::Char, FieldType::Double],
            vec!["id", "name", "score"],
        )
        .unwrap()
    }

    #[test]
    fn test_construction_errors() {
        let result = TupleDesc::new(vec![FieldType::Int, FieldType::Int], vec!["a"]);
        assert!(matches!(
            result,
            Err(StorageError::SchemaLengthMismatch { types: 2, names: 1 })
        ));

        let result = TupleDesc::new(vec![FieldType::Int, FieldType::Char], vec!["a", "a"]);
        assert!(matches!(result, Err(StorageError::DuplicateFieldName(n)) if n == "a"));

        let empty = TupleDesc::new(Vec::new(), Vec::<String>::new()).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.length(), 0);
    }

    #[test]
    fn test_offsets_and_length() -> Result<()> {
        let td = people();

        assert_eq!(td.len(), 3);
        assert_eq!(td.offset_of(0)?, 0);
        assert_eq!(td.offset_of(1)?, 4);
        assert_eq!(td.offset_of(2)?, 4 + CHAR_SIZE);
        assert_eq!(td.length(), 4 + CHAR_SIZE + 8);
        assert_eq!(td.offset_of(td.len())?, td.length());
        assert!(td.offset_of(4).is_err());

        Ok(())
    }

    #[test]
    fn test_index_of() -> Result<()> {
        let td = people();

        assert_eq!(td.index_of("id")?, 0);
        assert_eq!(td.index_of("score")?, 2);
        assert!(matches!(td.index_of("nope"), Err(StorageError::FieldNotFound(_))));
        assert_eq!(td.field_name(1)?, "name");
        assert_eq!(td.field_type(1)?, FieldType::Char);

        Ok(())
    }

    #[test]
    fn test_compatible() {
        let td = people();

        let good = Tuple::new(vec![Value::Int(1), Value::from("a"), Value::Double(0.5)]);
        let short = Tuple::new(vec![Value::Int(1), Value::from("a")]);
        let swapped = Tuple::new(vec![Value::Int(1), Value::Double(0.5), Value::from("a")]);

        assert!(td.compatible(&good));
        assert!(!td.compatible(&short));
        assert!(!td.compatible(&swapped));
    }

    #[test]
    fn test_serialize_rejects_incompatible() {
        let td = people();
        let mut buf = vec![0u8; td.length()];

        let short = Tuple::new(vec![Value::Int(1)]);
        assert!(matches!(
            td.serialize(&mut buf, &short),
            Err(StorageError::IncompatibleTuple {
                expected: 3,
                found: 1
            })
        ));

        let wrong = Tuple::new(vec![Value::Double(1.0), Value::from("a"), Value::Double(0.5)]);
        assert!(matches!(
            td.serialize(&mut buf, &wrong),
            Err(StorageError::TypeMismatch { field: 0, .. })
        ));
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let td = people();
        let mut buf = vec![0xAAu8; td.length()];

        let tuple = Tuple::new(vec![
            Value::Int(-42),
            Value::from("Alice"),
            Value::Double(3.25),
        ]);
        td.serialize(&mut buf, &tuple)?;
        assert_eq!(td.deserialize(&buf)?, tuple);

        Ok(())
    }

    #[test]
    fn test_native_layout() -> Result<()> {
        let td = TupleDesc::new(vec![FieldType::Int, FieldType::Double], vec!["i", "d"])?;
        let mut buf = vec![0u8; td.length()];

        td.serialize(&mut buf, &Tuple::new(vec![Value::Int(7), Value::Double(-1.5)]))?;
        assert_eq!(&buf[0..4], &7i32.to_ne_bytes());
        assert_eq!(&buf[4..12], &(-1.5f64).to_ne_bytes());

        Ok(())
    }

    #[test]
    fn test_text_boundaries() -> Result<()> {
        let td = TupleDesc::new(vec![FieldType::Char, FieldType::Int], vec!["s", "n"])?;
        let mut buf = vec![0xFFu8; td.length()];

        for len in [0, CHAR_SIZE - 1, CHAR_SIZE] {
            let tuple = Tuple::new(vec![Value::Char("x".repeat(len)), Value::Int(len as i32)]);
            td.serialize(&mut buf, &tuple)?;
            assert_eq!(td.deserialize(&buf)?, tuple, "text of length {}", len);
        }

        // Padding is cleared, not left over from the previous value
        td.serialize(&mut buf, &Tuple::new(vec![Value::from("ab"), Value::Int(0)]))?;
        assert!(buf[2..CHAR_SIZE].iter().all(|&b| b == 0));

        let before = buf.clone();
        let too_long = Tuple::new(vec![Value::Char("x".repeat(CHAR_SIZE + 1)), Value::Int(1)]);
        assert!(matches!(
            td.serialize(&mut buf, &too_long),
            Err(StorageError::TextTooLong { len, max }) if len == CHAR_SIZE + 1 && max == CHAR_SIZE
        ));
        assert_eq!(buf, before);

        let embedded_zero = Tuple::new(vec![Value::from("ab\0cd"), Value::Int(2)]);
        assert!(matches!(
            td.serialize(&mut buf, &embedded_zero),
            Err(StorageError::ZeroByteInText { field: 0 })
        ));
        assert_eq!(buf, before);

        Ok(())
    }

    #[test]
    fn test_buffer_too_small() {
        let td = people();
        let mut buf = vec![0u8; td.length() - 1];
        let tuple = Tuple::new(vec![Value::Int(1), Value::from("a"), Value::Double(0.5)]);

        assert!(matches!(
            td.serialize(&mut buf, &tuple),
            Err(StorageError::BufferTooSmall { .. })
        ));
        assert!(td.deserialize(&buf).is_err());
    }

    #[test]
    fn test_invalid_utf8() {
        let td = TupleDesc::new(vec![FieldType::Char], vec!["s"]).unwrap();
        let mut buf = vec![0u8; td.length()];
        buf[0] = 0xFF;

        assert!(matches!(
            td.deserialize(&buf),
            Err(StorageError::InvalidText { field: 0 })
        ));
    }

    #[test]
    fn test_merge() -> Result<()> {
        let a = TupleDesc::new(vec![FieldType::Int], vec!["id"])?;
        let b = TupleDesc::new(vec![FieldType::Char, FieldType::Double], vec!["name", "x"])?;

        let merged = TupleDesc::merge(&a, &b)?;
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.names(), &["id", "name", "x"]);
        assert_eq!(merged.length(), a.length() + b.length());
        assert_eq!(merged.offset_of(1)?, 4);

        assert!(matches!(
            TupleDesc::merge(&a, &a),
            Err(StorageError::DuplicateFieldName(_))
        ));

        Ok(())
    }

    #[test]
    fn test_encode_decode() -> Result<()> {
        let td = people();
        let decoded = TupleDesc::decode(&td.encode()?)?;
        assert_eq!(decoded, td);

        assert!(TupleDesc::decode(&[1, 2, 3]).is_err());

        Ok(())
    }
}
