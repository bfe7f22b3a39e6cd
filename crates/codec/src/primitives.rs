//! Primitive codec set
//!
//! Leaf codecs for fixed-width integers, floats, text, byte blocks,
//! enumerations and the protocol's small well-known aggregates. None of them
//! call back into the resolver. Registering a codec under a new name is how a
//! new wire primitive is added without touching the builder.

use crate::codec::{Codec, CodecRef};
use crate::context::SerializationContext;
use crate::desc::{IntRepr, TypeDesc};
use crate::stream::{StreamReader, StreamWriter};
use crate::value::Value;
use aoproto_config::CodecConfig;
use aoproto_core::{CodecError, Identity, IdentityType, LengthPrefix, Result, Vector3};
use bytes::Bytes;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Write an element count using `prefix`
pub(crate) fn write_count(writer: &mut StreamWriter, prefix: LengthPrefix, count: usize) -> Result<()> {
    if count > prefix.max_count() {
        return Err(CodecError::InvalidData(format!(
            "{} elements do not fit a {:?} prefix",
            count, prefix
        )));
    }
    match prefix {
        LengthPrefix::U8 => writer.write_u8(count as u8),
        LengthPrefix::U16 => writer.write_u16(count as u16),
        LengthPrefix::U32 => writer.write_u32(count as u32),
        LengthPrefix::X3f1 => writer.write_u32((count as u32 + 1) * LengthPrefix::X3F1_FACTOR),
        LengthPrefix::Fixed(n) => {
            if count != n as usize {
                return Err(CodecError::InvalidData(format!(
                    "expected exactly {} elements, got {}",
                    n, count
                )));
            }
        }
        LengthPrefix::NulTerminated => {
            return Err(CodecError::InvalidData("counts cannot be NUL terminated".into()));
        }
    }
    Ok(())
}

/// Read an element count written with `prefix`
pub(crate) fn read_count(reader: &mut StreamReader, prefix: LengthPrefix) -> Result<usize> {
    Ok(match prefix {
        LengthPrefix::U8 => reader.read_u8()? as usize,
        LengthPrefix::U16 => reader.read_u16()? as usize,
        LengthPrefix::U32 => reader.read_u32()? as usize,
        LengthPrefix::X3f1 => {
            let raw = reader.read_u32()?;
            if raw < LengthPrefix::X3F1_FACTOR {
                return Err(CodecError::InvalidData(format!("invalid X3F1 count {:#x}", raw)));
            }
            (raw / LengthPrefix::X3F1_FACTOR - 1) as usize
        }
        LengthPrefix::Fixed(n) => n as usize,
        LengthPrefix::NulTerminated => {
            return Err(CodecError::InvalidData("counts cannot be NUL terminated".into()));
        }
    })
}

pub(crate) fn check_limit(count: usize, limit: usize, what: &str) -> Result<()> {
    if count > limit {
        return Err(CodecError::InvalidData(format!(
            "{} length {} exceeds limit {}",
            what, count, limit
        )));
    }
    Ok(())
}

/// Fixed-width integer, also used for enumerations
#[derive(Debug)]
pub struct IntCodec {
    name: String,
    repr: IntRepr,
}

impl IntCodec {
    pub fn new(repr: IntRepr) -> Self {
        Self::named(repr.primitive_name(), repr)
    }

    pub fn named(name: impl Into<String>, repr: IntRepr) -> Self {
        Self {
            name: name.into(),
            repr,
        }
    }

    fn out_of_range(&self, raw: i64) -> CodecError {
        CodecError::InvalidData(format!("{} out of range for {}", raw, self.name))
    }
}

impl Codec for IntCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, writer: &mut StreamWriter, _ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        let raw = value.expect_int(&self.name)?;
        match self.repr {
            IntRepr::U8 => writer.write_u8(u8::try_from(raw).map_err(|_| self.out_of_range(raw))?),
            IntRepr::I8 => writer.write_i8(i8::try_from(raw).map_err(|_| self.out_of_range(raw))?),
            IntRepr::U16 => writer.write_u16(u16::try_from(raw).map_err(|_| self.out_of_range(raw))?),
            IntRepr::I16 => writer.write_i16(i16::try_from(raw).map_err(|_| self.out_of_range(raw))?),
            IntRepr::U32 => writer.write_u32(u32::try_from(raw).map_err(|_| self.out_of_range(raw))?),
            IntRepr::I32 => writer.write_i32(i32::try_from(raw).map_err(|_| self.out_of_range(raw))?),
            IntRepr::U64 => writer.write_u64(raw as u64),
            IntRepr::I64 => writer.write_i64(raw),
        }
        Ok(())
    }

    fn decode(&self, reader: &mut StreamReader, _ctx: &mut SerializationContext<'_>) -> Result<Value> {
        let raw = match self.repr {
            IntRepr::U8 => reader.read_u8()? as i64,
            IntRepr::I8 => reader.read_i8()? as i64,
            IntRepr::U16 => reader.read_u16()? as i64,
            IntRepr::I16 => reader.read_i16()? as i64,
            IntRepr::U32 => reader.read_u32()? as i64,
            IntRepr::I32 => reader.read_i32()? as i64,
            IntRepr::U64 => reader.read_u64()? as i64,
            IntRepr::I64 => reader.read_i64()?,
        };
        Ok(Value::Int(raw))
    }
}

#[derive(Debug)]
pub struct BoolCodec;

impl Codec for BoolCodec {
    fn name(&self) -> &str {
        "bool"
    }

    fn encode(&self, writer: &mut StreamWriter, _ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        writer.write_bool(value.expect_int("bool")? != 0);
        Ok(())
    }

    fn decode(&self, reader: &mut StreamReader, _ctx: &mut SerializationContext<'_>) -> Result<Value> {
        Ok(Value::Bool(reader.read_bool()?))
    }
}

#[derive(Debug)]
pub struct F32Codec;

impl Codec for F32Codec {
    fn name(&self) -> &str {
        "f32"
    }

    fn encode(&self, writer: &mut StreamWriter, _ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        match value {
            Value::Float(v) => writer.write_f32(*v),
            other => return Err(CodecError::mismatch("float", other.kind())),
        }
        Ok(())
    }

    fn decode(&self, reader: &mut StreamReader, _ctx: &mut SerializationContext<'_>) -> Result<Value> {
        Ok(Value::Float(reader.read_f32()?))
    }
}

/// Identity as a 32-bit type followed by a 32-bit instance
#[derive(Debug)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn name(&self) -> &str {
        "identity"
    }

    fn encode(&self, writer: &mut StreamWriter, _ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        match value {
            Value::Identity(id) => {
                writer.write_u32(id.kind.get());
                writer.write_i32(id.instance);
            }
            other => return Err(CodecError::mismatch("identity", other.kind())),
        }
        Ok(())
    }

    fn decode(&self, reader: &mut StreamReader, _ctx: &mut SerializationContext<'_>) -> Result<Value> {
        let kind = IdentityType::new(reader.read_u32()?);
        let instance = reader.read_i32()?;
        Ok(Value::Identity(Identity::new(kind, instance)))
    }
}

#[derive(Debug)]
pub struct Vector3Codec;

impl Codec for Vector3Codec {
    fn name(&self) -> &str {
        "vector3"
    }

    fn encode(&self, writer: &mut StreamWriter, _ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        match value {
            Value::Vector3(v) => {
                writer.write_f32(v.x);
                writer.write_f32(v.y);
                writer.write_f32(v.z);
            }
            other => return Err(CodecError::mismatch("vector3", other.kind())),
        }
        Ok(())
    }

    fn decode(&self, reader: &mut StreamReader, _ctx: &mut SerializationContext<'_>) -> Result<Value> {
        let x = reader.read_f32()?;
        let y = reader.read_f32()?;
        let z = reader.read_f32()?;
        Ok(Value::Vector3(Vector3::new(x, y, z)))
    }
}

/// IPv4 address as four octets in network order
#[derive(Debug)]
pub struct Ipv4Codec;

impl Codec for Ipv4Codec {
    fn name(&self) -> &str {
        "ipv4"
    }

    fn encode(&self, writer: &mut StreamWriter, _ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        match value {
            Value::Ipv4(addr) => writer.write_bytes(&addr.octets()),
            Value::Null => writer.write_bytes(&[0; 4]),
            other => return Err(CodecError::mismatch("ipv4", other.kind())),
        }
        Ok(())
    }

    fn decode(&self, reader: &mut StreamReader, _ctx: &mut SerializationContext<'_>) -> Result<Value> {
        let octets = reader.read_bytes(4)?;
        Ok(Value::Ipv4(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3])))
    }
}

/// UTF-8 text; a null value is written as the empty string
#[derive(Debug)]
pub struct TextCodec {
    name: String,
    prefix: LengthPrefix,
    max_len: usize,
}

impl TextCodec {
    pub fn new(prefix: LengthPrefix, max_len: usize) -> Self {
        Self {
            name: TypeDesc::Text(Some(prefix)).name(),
            prefix,
            max_len,
        }
    }
}

impl Codec for TextCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, writer: &mut StreamWriter, _ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        let text = match value {
            Value::Text(s) => s.as_str(),
            Value::Null => "",
            other => return Err(CodecError::mismatch("text", other.kind())),
        };
        let bytes = text.as_bytes();

        match self.prefix {
            LengthPrefix::NulTerminated => {
                if bytes.contains(&0) {
                    return Err(CodecError::InvalidData(
                        "NUL terminated text contains a zero byte".into(),
                    ));
                }
                writer.write_bytes(bytes);
                writer.write_u8(0);
            }
            LengthPrefix::Fixed(n) => {
                let n = n as usize;
                if bytes.len() > n {
                    return Err(CodecError::InvalidData(format!(
                        "text of {} bytes does not fit {} bytes",
                        bytes.len(),
                        n
                    )));
                }
                writer.write_bytes(bytes);
                writer.write_bytes(&vec![0u8; n - bytes.len()]);
            }
            prefix => {
                write_count(writer, prefix, bytes.len())?;
                writer.write_bytes(bytes);
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut StreamReader, _ctx: &mut SerializationContext<'_>) -> Result<Value> {
        let raw = match self.prefix {
            LengthPrefix::NulTerminated => reader.read_until_nul()?,
            LengthPrefix::Fixed(n) => {
                let padded = reader.read_bytes(n as usize)?;
                let end = padded.iter().position(|&b| b == 0).unwrap_or(padded.len());
                padded.slice(..end)
            }
            prefix => {
                let len = read_count(reader, prefix)?;
                check_limit(len, self.max_len, "text")?;
                reader.read_bytes(len)?
            }
        };
        check_limit(raw.len(), self.max_len, "text")?;
        String::from_utf8(raw.to_vec())
            .map(Value::Text)
            .map_err(|e| CodecError::InvalidData(format!("Invalid UTF-8: {}", e)))
    }
}

/// Raw byte block
#[derive(Debug)]
pub struct BytesCodec {
    name: String,
    prefix: LengthPrefix,
    max_len: usize,
}

impl BytesCodec {
    pub fn new(prefix: LengthPrefix, max_len: usize) -> Self {
        Self {
            name: TypeDesc::Bytes(Some(prefix)).name(),
            prefix,
            max_len,
        }
    }
}

impl Codec for BytesCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, writer: &mut StreamWriter, _ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        let empty = Bytes::new();
        let bytes = match value {
            Value::Bytes(b) => b,
            Value::Null => &empty,
            other => return Err(CodecError::mismatch("bytes", other.kind())),
        };
        write_count(writer, self.prefix, bytes.len())?;
        writer.write_bytes(bytes);
        Ok(())
    }

    fn decode(&self, reader: &mut StreamReader, _ctx: &mut SerializationContext<'_>) -> Result<Value> {
        let len = read_count(reader, self.prefix)?;
        check_limit(len, self.max_len, "byte block")?;
        Ok(Value::Bytes(reader.read_bytes(len)?))
    }
}

/// Registry of leaf codecs
#[derive(Debug, Clone, Default)]
pub struct PrimitiveSet {
    codecs: HashMap<&'static str, CodecRef>,
}

impl PrimitiveSet {
    /// An empty set; [`PrimitiveSet::standard`] is what resolvers normally use
    pub fn empty() -> Self {
        Self::default()
    }

    /// Integers, floats, booleans and the protocol's well-known aggregates
    pub fn standard() -> Self {
        let mut set = Self::empty();
        for repr in [
            IntRepr::U8,
            IntRepr::I8,
            IntRepr::U16,
            IntRepr::I16,
            IntRepr::U32,
            IntRepr::I32,
            IntRepr::U64,
            IntRepr::I64,
        ] {
            set.register(repr.primitive_name(), Arc::new(IntCodec::new(repr)));
        }
        set.register("bool", Arc::new(BoolCodec));
        set.register("f32", Arc::new(F32Codec));
        set.register("identity", Arc::new(IdentityCodec));
        set.register("vector3", Arc::new(Vector3Codec));
        set.register("ipv4", Arc::new(Ipv4Codec));
        set
    }

    /// Register a leaf codec, returning the one it replaces
    pub fn register(&mut self, name: &'static str, codec: CodecRef) -> Option<CodecRef> {
        self.codecs.insert(name, codec)
    }

    pub fn get(&self, name: &str) -> Option<CodecRef> {
        self.codecs.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.codecs.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Codec for a leaf type description
    ///
    /// Enumerations, text and byte blocks are parameterised by their
    /// description and the resolver's config, so they are built on demand.
    pub fn resolve(&self, desc: &TypeDesc, config: &CodecConfig) -> Result<CodecRef> {
        match desc {
            TypeDesc::Primitive(name) => self.get(name).ok_or_else(|| {
                CodecError::schema(*name, "no registered primitive codec and not a record type")
            }),
            TypeDesc::Enum { name, repr } => {
                let codec = self.get(repr.primitive_name()).ok_or_else(|| {
                    CodecError::schema(*name, format!("no codec for underlying {}", repr.primitive_name()))
                })?;
                // A replaced integer codec also carries every enum of that width
                Ok(Arc::new(EnumCodec {
                    name: desc.name(),
                    inner: codec,
                }))
            }
            TypeDesc::Text(prefix) => {
                let prefix = prefix.unwrap_or(config.default_text_prefix);
                Ok(Arc::new(TextCodec::new(prefix, config.max_text_len)))
            }
            TypeDesc::Bytes(prefix) => {
                let prefix = prefix.unwrap_or(config.default_list_prefix);
                if prefix == LengthPrefix::NulTerminated {
                    return Err(CodecError::schema(desc.name(), "byte blocks cannot be NUL terminated"));
                }
                Ok(Arc::new(BytesCodec::new(prefix, config.max_collection_len)))
            }
            TypeDesc::List { .. } | TypeDesc::Pair(..) | TypeDesc::Record(_) => Err(CodecError::schema(
                desc.name(),
                "composite types are built by the resolver",
            )),
        }
    }
}

/// Enumeration carried by its underlying integer codec
#[derive(Debug)]
struct EnumCodec {
    name: String,
    inner: CodecRef,
}

impl Codec for EnumCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, writer: &mut StreamWriter, ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        self.inner.encode(writer, ctx, value)
    }

    fn decode(&self, reader: &mut StreamReader, ctx: &mut SerializationContext<'_>) -> Result<Value> {
        self.inner.decode(reader, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::CodecResolver;
    use aoproto_core::ByteOrder;

    fn roundtrip(codec: &dyn Codec, value: &Value) -> (Vec<u8>, Value) {
        let resolver = CodecResolver::new();
        let mut ctx = SerializationContext::new(&resolver);
        let mut writer = StreamWriter::new(ByteOrder::Big);
        codec.encode(&mut writer, &mut ctx, value).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = StreamReader::new(bytes.clone(), ByteOrder::Big);
        let decoded = codec.decode(&mut reader, &mut ctx).unwrap();
        assert!(reader.is_eof());
        (bytes.to_vec(), decoded)
    }

    #[test]
    fn test_identity_layout() {
        let id = Value::Identity(Identity::new(IdentityType::new(5), 12345));
        let (bytes, decoded) = roundtrip(&IdentityCodec, &id);
        assert_eq!(bytes, vec![0, 0, 0, 5, 0, 0, 0x30, 0x39]);
        assert_eq!(decoded, id);
    }

    #[test]
    fn test_int_range_checked() {
        let resolver = CodecResolver::new();
        let mut ctx = SerializationContext::new(&resolver);
        let mut writer = StreamWriter::new(ByteOrder::Big);
        let codec = IntCodec::new(IntRepr::U8);
        assert!(matches!(
            codec.encode(&mut writer, &mut ctx, &Value::Int(256)),
            Err(CodecError::InvalidData(_))
        ));
        assert!(matches!(
            codec.encode(&mut writer, &mut ctx, &Value::Text("x".into())),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_signed_ints() {
        let (bytes, decoded) = roundtrip(&IntCodec::new(IntRepr::I16), &Value::Int(-2));
        assert_eq!(bytes, vec![0xFF, 0xFE]);
        assert_eq!(decoded, Value::Int(-2));
    }

    #[test]
    fn test_text_prefixes() {
        let value = Value::Text("ICC".into());

        let (bytes, decoded) = roundtrip(&TextCodec::new(LengthPrefix::U16, 100), &value);
        assert_eq!(bytes, vec![0, 3, b'I', b'C', b'C']);
        assert_eq!(decoded, value);

        let (bytes, decoded) = roundtrip(&TextCodec::new(LengthPrefix::NulTerminated, 100), &value);
        assert_eq!(bytes, vec![b'I', b'C', b'C', 0]);
        assert_eq!(decoded, value);

        let (bytes, decoded) = roundtrip(&TextCodec::new(LengthPrefix::Fixed(5), 100), &value);
        assert_eq!(bytes, vec![b'I', b'C', b'C', 0, 0]);
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_x3f1_count() {
        let value = Value::Text("ab".into());
        let (bytes, decoded) = roundtrip(&TextCodec::new(LengthPrefix::X3f1, 100), &value);
        // (2 + 1) * 0x3F1 = 0xBD3
        assert_eq!(&bytes[..4], &[0, 0, 0x0B, 0xD3]);
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_null_text_is_empty() {
        let (bytes, decoded) = roundtrip(&TextCodec::new(LengthPrefix::U8, 100), &Value::Null);
        assert_eq!(bytes, vec![0]);
        assert_eq!(decoded, Value::Text(String::new()));
    }

    #[test]
    fn test_text_limit() {
        let resolver = CodecResolver::new();
        let mut ctx = SerializationContext::new(&resolver);
        let mut reader = StreamReader::new(vec![0u8, 9, b'a'], ByteOrder::Big);
        let codec = TextCodec::new(LengthPrefix::U16, 4);
        assert!(matches!(
            codec.decode(&mut reader, &mut ctx),
            Err(CodecError::InvalidData(_))
        ));
    }

    #[test]
    fn test_truncated_text() {
        let resolver = CodecResolver::new();
        let mut ctx = SerializationContext::new(&resolver);
        let mut reader = StreamReader::new(vec![0u8, 9, b'a'], ByteOrder::Big);
        let codec = TextCodec::new(LengthPrefix::U16, 100);
        assert!(matches!(
            codec.decode(&mut reader, &mut ctx),
            Err(CodecError::TruncatedStream { needed: 9, remaining: 1 })
        ));
    }

    #[test]
    fn test_bytes_and_ipv4() {
        let blob = Value::Bytes(Bytes::from_static(&[1, 2, 3]));
        let (bytes, decoded) = roundtrip(&BytesCodec::new(LengthPrefix::U8, 10), &blob);
        assert_eq!(bytes, vec![3, 1, 2, 3]);
        assert_eq!(decoded, blob);

        let addr = Value::Ipv4(Ipv4Addr::LOCALHOST);
        let (bytes, decoded) = roundtrip(&Ipv4Codec, &addr);
        assert_eq!(bytes, vec![127, 0, 0, 1]);
        assert_eq!(decoded, addr);
    }

    #[test]
    fn test_standard_set() {
        let set = PrimitiveSet::standard();
        assert!(set.contains("identity"));
        assert!(set.contains("u64"));
        assert!(!set.contains("string"));

        let config = CodecConfig::default();
        assert!(set.resolve(&TypeDesc::Primitive("nope"), &config).is_err());
        assert!(set.resolve(&TypeDesc::Text(None), &config).is_ok());
        assert!(set
            .resolve(&TypeDesc::Bytes(Some(LengthPrefix::NulTerminated)), &config)
            .is_err());
    }
}
