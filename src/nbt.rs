//! NBT (Named Binary Tag) decoding of decompressed chunk payloads.
//!
//! The decoder is a trait so the backing library can be swapped; the
//! default one is backed by fastnbt. Decoded trees use the crate's own
//! [`Tag`] type, which serializes to plain JSON.

use std::collections::BTreeMap;

use fastnbt::Value;
use serde::Serialize;

use crate::error::ExtractError;

/// A decoded tag. Compound keys are kept sorted so output is stable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<i8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(Vec<Tag>),
    Compound(BTreeMap<String, Tag>),
}

impl Tag {
    pub fn get(&self, key: &str) -> Option<&Tag> {
        match self {
            Tag::Compound(c) => c.get(key),
            _ => None,
        }
    }

    /// Integer value of any integral tag.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Tag::Byte(v) => Some(v as i64),
            Tag::Short(v) => Some(v as i64),
            Tag::Int(v) => Some(v as i64),
            Tag::Long(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for Tag {
    fn from(value: Value) -> Self {
        match value {
            Value::Compound(c) => {
                Tag::Compound(c.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            Value::List(l) => Tag::List(l.into_iter().map(Tag::from).collect()),
            Value::String(s) => Tag::String(s),
            Value::Byte(b) => Tag::Byte(b),
            Value::Short(s) => Tag::Short(s),
            Value::Int(i) => Tag::Int(i),
            Value::Long(l) => Tag::Long(l),
            Value::Float(f) => Tag::Float(f),
            Value::Double(d) => Tag::Double(d),
            Value::ByteArray(ba) => Tag::ByteArray(ba.iter().copied().collect()),
            Value::IntArray(ia) => Tag::IntArray(ia.iter().copied().collect()),
            Value::LongArray(la) => Tag::LongArray(la.iter().copied().collect()),
        }
    }
}

/// Decodes a complete payload that starts with a root tag.
pub trait TagDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Tag, ExtractError>;

    fn name(&self) -> &'static str {
        "unnamed"
    }
}

/// [`TagDecoder`] backed by fastnbt.
#[derive(Debug, Default, Clone, Copy)]
pub struct FastNbtDecoder;

impl TagDecoder for FastNbtDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Tag, ExtractError> {
        let value: Value =
            fastnbt::from_bytes(bytes).map_err(|e| ExtractError::TagTreeDecode(e.to_string()))?;
        Ok(value.into())
    }

    fn name(&self) -> &'static str {
        "fastnbt"
    }
}

/// Chunk position stored in the tree.
///
/// Modern chunks keep xPos/zPos in the root compound (since 1.18 or so),
/// older ones inside a `Level` compound.
pub fn chunk_position(root: &Tag) -> Option<(i64, i64)> {
    let read = |tag: &Tag| Some((tag.get("xPos")?.as_i64()?, tag.get("zPos")?.as_i64()?));
    read(root).or_else(|| read(root.get("Level")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Level {
        #[serde(rename = "xPos")]
        x_pos: i32,
        #[serde(rename = "zPos")]
        z_pos: i32,
    }

    #[derive(Serialize)]
    struct LegacyChunk {
        #[serde(rename = "DataVersion")]
        data_version: i32,
        #[serde(rename = "Level")]
        level: Level,
        heights: fastnbt::LongArray,
    }

    #[derive(Serialize)]
    struct ModernChunk {
        #[serde(rename = "xPos")]
        x_pos: i32,
        #[serde(rename = "zPos")]
        z_pos: i32,
        #[serde(rename = "Status")]
        status: String,
        light: f32,
    }

    #[test]
    fn test_decode_modern_chunk() {
        let bytes = fastnbt::to_bytes(&ModernChunk {
            x_pos: -4,
            z_pos: 7,
            status: "minecraft:full".to_string(),
            light: f32::NAN,
        })
        .unwrap();

        let tag = FastNbtDecoder.decode(&bytes).unwrap();
        assert_eq!(chunk_position(&tag), Some((-4, 7)));
        assert_eq!(tag.get("Status"), Some(&Tag::String("minecraft:full".to_string())));

        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json["xPos"], -4);
        assert!(json["light"].is_null());
    }

    #[test]
    fn test_decode_legacy_chunk() {
        let bytes = fastnbt::to_bytes(&LegacyChunk {
            data_version: 1343,
            level: Level { x_pos: 1, z_pos: 2 },
            heights: fastnbt::LongArray::new(vec![1, 2, 3]),
        })
        .unwrap();

        let tag = FastNbtDecoder.decode(&bytes).unwrap();
        assert_eq!(chunk_position(&tag), Some((1, 2)));
        assert_eq!(tag.get("heights"), Some(&Tag::LongArray(vec![1, 2, 3])));
        assert_eq!(serde_json::to_value(&tag).unwrap()["heights"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_decode_garbage() {
        let err = FastNbtDecoder.decode(&[0xFF, 0x00, 0x13]).unwrap_err();
        assert_eq!(err.kind(), "TagTreeDecodeError");
    }
}
