//! Codec resolver
//!
//! Maps type descriptions to codecs. Lookups of built codecs go straight to a
//! concurrent map. A miss takes the build lock, which is re-entrant so that a
//! record build can resolve its own field types on the same thread; other
//! threads asking for an unbuilt type wait for the lock and then find the
//! finished codec in the cache. Every type is built at most once.

use crate::codec::{Codec, CodecRef};
use crate::context::SerializationContext;
use crate::desc::TypeDesc;
use crate::hex;
use crate::primitives::{check_limit, read_count, write_count, PrimitiveSet};
use crate::stream::{StreamReader, StreamWriter};
use crate::value::{Value, WireType};
use aoproto_config::CodecConfig;
use aoproto_core::{CodecError, LengthPrefix, Result};
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Types currently being built, innermost last
///
/// Each entry records whether it was reached through a list element or a
/// conditional field. A cycle through such an edge can end at run time.
#[derive(Debug, Default)]
struct BuildState {
    stack: Vec<(TypeDesc, bool)>,
}

/// Resolves and caches codecs by type description
pub struct CodecResolver {
    config: CodecConfig,
    primitives: PrimitiveSet,
    cache: DashMap<TypeDesc, CodecRef>,
    build_lock: ReentrantMutex<RefCell<BuildState>>,
    builds: AtomicUsize,
}

impl CodecResolver {
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self::with_primitives(config, PrimitiveSet::standard())
    }

    pub fn with_primitives(config: CodecConfig, primitives: PrimitiveSet) -> Self {
        Self {
            config,
            primitives,
            cache: DashMap::new(),
            build_lock: ReentrantMutex::new(RefCell::new(BuildState::default())),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn primitives(&self) -> &PrimitiveSet {
        &self.primitives
    }

    /// Number of codecs built so far
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Number of codecs in the cache
    pub fn cached_types(&self) -> usize {
        self.cache.len()
    }

    /// Codec for a type, building and caching it on first use
    pub fn get_codec(&self, desc: &TypeDesc) -> Result<CodecRef> {
        self.resolve_field(desc, false)
    }

    pub fn codec_for<T: WireType>(&self) -> Result<CodecRef> {
        self.get_codec(&T::type_desc())
    }

    /// Resolve a codec for a field of a type that may still be under construction
    ///
    /// `guarded` marks fields that are not always on the wire: list elements
    /// and conditional fields. A type that refers back to itself gets a
    /// forward reference only when the cycle passes through such a field.
    pub(crate) fn resolve_field(&self, desc: &TypeDesc, guarded: bool) -> Result<CodecRef> {
        if let Some(codec) = self.cache.get(desc) {
            return Ok(Arc::clone(codec.value()));
        }

        let lock = self.build_lock.lock();
        // Another thread may have finished it while we waited
        if let Some(codec) = self.cache.get(desc) {
            return Ok(Arc::clone(codec.value()));
        }

        if let Some(pos) = lock.borrow().stack.iter().position(|(d, _)| d == desc) {
            let breakable = guarded || lock.borrow().stack[pos + 1..].iter().any(|(_, g)| *g);
            if !breakable {
                return Err(CodecError::UnsupportedRecursiveSchema {
                    type_name: desc.name(),
                });
            }
            trace!("Forward reference to {} while it is being built", desc);
            return Ok(Arc::new(ForwardCodec::new(desc.clone())));
        }

        lock.borrow_mut().stack.push((desc.clone(), guarded));
        let built = self.build(desc);
        lock.borrow_mut().stack.pop();
        let codec = built?;

        let codec = Arc::clone(self.cache.entry(desc.clone()).or_insert(codec).value());
        let count = self.builds.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Built codec {} (build #{})", desc, count);
        Ok(codec)
    }

    fn build(&self, desc: &TypeDesc) -> Result<CodecRef> {
        match desc {
            TypeDesc::Record(record) => record.build(self),
            TypeDesc::List { element, prefix } => {
                let prefix = prefix.unwrap_or(self.config.default_list_prefix);
                if prefix == LengthPrefix::NulTerminated {
                    return Err(CodecError::schema(desc.name(), "lists cannot be NUL terminated"));
                }
                Ok(Arc::new(ListCodec {
                    name: desc.name(),
                    element: self.resolve_field(element, true)?,
                    prefix,
                    max_len: self.config.max_collection_len,
                }))
            }
            TypeDesc::Pair(first, second) => Ok(Arc::new(PairCodec {
                name: desc.name(),
                first: self.resolve_field(first, false)?,
                second: self.resolve_field(second, false)?,
            })),
            leaf => self.primitives.resolve(leaf, &self.config),
        }
    }

    /// Encode a value of type `desc` into a fresh buffer
    pub fn encode_value(&self, desc: &TypeDesc, value: &Value) -> Result<Bytes> {
        let codec = self.get_codec(desc)?;
        let mut writer = StreamWriter::new(self.config.byte_order);
        let mut ctx = SerializationContext::new(self);
        codec.encode(&mut writer, &mut ctx, value)?;

        let bytes = writer.into_bytes();
        trace!("Encoded {} ({} bytes)", desc, bytes.len());
        if self.config.trace_hex {
            trace!("{}", hex::dump(&bytes));
        }
        Ok(bytes)
    }

    /// Decode a value of type `desc` from `data`; trailing bytes are ignored
    pub fn decode_value(&self, desc: &TypeDesc, data: &[u8]) -> Result<Value> {
        let codec = self.get_codec(desc)?;
        let mut reader = StreamReader::new(Bytes::copy_from_slice(data), self.config.byte_order);
        let mut ctx = SerializationContext::new(self);
        let value = codec.decode(&mut reader, &mut ctx)?;

        if !reader.is_eof() {
            trace!("Decoded {} with {} trailing bytes", desc, reader.remaining());
        }
        Ok(value)
    }

    pub fn encode_message<T: WireType>(&self, message: &T) -> Result<Bytes> {
        self.encode_value(&T::type_desc(), &message.to_value())
    }

    pub fn decode_message<T: WireType>(&self, data: &[u8]) -> Result<T> {
        T::from_value(self.decode_value(&T::type_desc(), data)?)
    }
}

impl Default for CodecResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodecResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecResolver")
            .field("config", &self.config)
            .field("cached_types", &self.cache.len())
            .field("builds", &self.build_count())
            .finish()
    }
}

/// Stands in for a record type that was still being built when referenced
#[derive(Debug)]
struct ForwardCodec {
    name: String,
    desc: TypeDesc,
}

impl ForwardCodec {
    fn new(desc: TypeDesc) -> Self {
        Self {
            name: format!("forward<{}>", desc),
            desc,
        }
    }
}

impl Codec for ForwardCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, writer: &mut StreamWriter, ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        let codec = ctx.resolver().get_codec(&self.desc)?;
        codec.encode(writer, ctx, value)
    }

    fn decode(&self, reader: &mut StreamReader, ctx: &mut SerializationContext<'_>) -> Result<Value> {
        let codec = ctx.resolver().get_codec(&self.desc)?;
        codec.decode(reader, ctx)
    }
}

/// Counted sequence of one element type
#[derive(Debug)]
struct ListCodec {
    name: String,
    element: CodecRef,
    prefix: LengthPrefix,
    max_len: usize,
}

impl Codec for ListCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, writer: &mut StreamWriter, ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        let items: &[Value] = match value {
            Value::List(items) => items,
            Value::Null => &[],
            other => return Err(CodecError::mismatch("list", other.kind())),
        };
        check_limit(items.len(), self.max_len, "list")?;
        write_count(writer, self.prefix, items.len())?;
        for item in items {
            self.element.encode(writer, ctx, item)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut StreamReader, ctx: &mut SerializationContext<'_>) -> Result<Value> {
        let count = read_count(reader, self.prefix)?;
        check_limit(count, self.max_len, "list")?;
        let mut items = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            items.push(self.element.decode(reader, ctx)?);
        }
        Ok(Value::List(items))
    }
}

#[derive(Debug)]
struct PairCodec {
    name: String,
    first: CodecRef,
    second: CodecRef,
}

impl Codec for PairCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, writer: &mut StreamWriter, ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        match value {
            Value::Pair(first, second) => {
                self.first.encode(writer, ctx, first)?;
                self.second.encode(writer, ctx, second)
            }
            other => Err(CodecError::mismatch("pair", other.kind())),
        }
    }

    fn decode(&self, reader: &mut StreamReader, ctx: &mut SerializationContext<'_>) -> Result<Value> {
        let first = self.first.decode(reader, ctx)?;
        let second = self.second.decode(reader, ctx)?;
        Ok(Value::Pair(Box::new(first), Box::new(second)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Presence, SchemaBuilder, WireRecord};
    use aoproto_core::{ByteOrder, Identity, IdentityType};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Node {
        id: u16,
        children: Vec<Node>,
    }

    impl WireRecord for Node {
        const NAME: &'static str = "Node";

        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.field(0, "id", |n| &n.id, |n| &mut n.id);
            schema
                .field(1, "children", |n| &n.children, |n| &mut n.children)
                .prefix(LengthPrefix::U8);
        }
    }

    crate::impl_wire_record!(Node);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Loop {
        value: u8,
        inner: LoopInner,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct LoopInner {
        back: Option<Loop>,
    }

    impl WireRecord for Loop {
        const NAME: &'static str = "Loop";

        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.field(0, "value", |l| &l.value, |l| &mut l.value);
            schema.field(1, "inner", |l| &l.inner, |l| &mut l.inner);
        }
    }

    impl WireRecord for LoopInner {
        const NAME: &'static str = "LoopInner";

        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.field(0, "back", |i| &i.back, |i| &mut i.back);
        }
    }

    crate::impl_wire_record!(Loop, LoopInner);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Guarded {
        has_inner: bool,
        inner: Option<GuardedInner>,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct GuardedInner {
        back: Option<Guarded>,
    }

    impl WireRecord for Guarded {
        const NAME: &'static str = "Guarded";

        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.field(0, "has_inner", |g| &g.has_inner, |g| &mut g.has_inner);
            schema
                .field(1, "inner", |g| &g.inner, |g| &mut g.inner)
                .present_when(Presence::field("has_inner").equals_any([1]));
        }
    }

    impl WireRecord for GuardedInner {
        const NAME: &'static str = "GuardedInner";

        fn declare(schema: &mut SchemaBuilder<Self>) {
            schema.field(0, "back", |i| &i.back, |i| &mut i.back);
        }
    }

    crate::impl_wire_record!(Guarded, GuardedInner);

    #[test]
    fn test_identity_scenario() {
        let resolver = CodecResolver::new();
        let id = Identity::new(IdentityType::new(5), 12345);
        let bytes = resolver.encode_message(&id).unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(resolver.decode_message::<Identity>(&bytes).unwrap(), id);
    }

    #[test]
    fn test_build_once() {
        let resolver = CodecResolver::new();
        let first = resolver.codec_for::<Node>().unwrap();
        let builds = resolver.build_count();
        let second = resolver.codec_for::<Node>().unwrap();
        assert_eq!(resolver.build_count(), builds);
        assert!(Arc::ptr_eq(&first, &second));

        let node = Node { id: 3, children: vec![] };
        assert_eq!(
            resolver.encode_message(&node).unwrap(),
            resolver.encode_message(&node).unwrap()
        );
    }

    #[test]
    fn test_recursion_through_list() {
        let resolver = CodecResolver::new();
        let tree = Node {
            id: 1,
            children: vec![
                Node { id: 2, children: vec![] },
                Node {
                    id: 3,
                    children: vec![Node { id: 4, children: vec![] }],
                },
            ],
        };
        let bytes = resolver.encode_message(&tree).unwrap();
        assert_eq!(&bytes[..], &[0, 1, 2, 0, 2, 0, 0, 3, 1, 0, 4, 0]);
        assert_eq!(resolver.decode_message::<Node>(&bytes).unwrap(), tree);
    }

    #[test]
    fn test_unconditional_cycle_rejected() {
        let resolver = CodecResolver::new();
        assert!(matches!(
            resolver.codec_for::<Loop>(),
            Err(CodecError::UnsupportedRecursiveSchema { .. })
        ));
        // The failure does not leave a partial entry behind
        assert!(resolver.codec_for::<Loop>().is_err());
        assert!(resolver.codec_for::<u32>().is_ok());
    }

    #[test]
    fn test_conditional_cycle_allowed() {
        let resolver = CodecResolver::new();
        let value = Guarded {
            has_inner: true,
            inner: Some(GuardedInner {
                back: Some(Guarded {
                    has_inner: false,
                    inner: None,
                }),
            }),
        };
        let bytes = resolver.encode_message(&value).unwrap();
        assert_eq!(&bytes[..], &[1, 0]);
        assert_eq!(resolver.decode_message::<Guarded>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_concurrent_first_use() {
        let resolver = CodecResolver::new();
        let codecs: Vec<CodecRef> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| resolver.codec_for::<Node>().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for codec in &codecs[1..] {
            assert!(Arc::ptr_eq(&codecs[0], codec));
        }
        // Node, list<Node>[U8] and u16
        assert_eq!(resolver.build_count(), 3);
    }

    #[test]
    fn test_lists_and_pairs() {
        let resolver = CodecResolver::new();
        let stats: Vec<(u32, u32)> = vec![(1, 10), (2, 20)];
        let bytes = resolver.encode_message(&stats).unwrap();
        assert_eq!(bytes.len(), 4 + 2 * 8);
        assert_eq!(resolver.decode_message::<Vec<(u32, u32)>>(&bytes).unwrap(), stats);

        let desc = TypeDesc::List {
            element: Box::new(TypeDesc::Primitive("u8")),
            prefix: Some(LengthPrefix::X3f1),
        };
        let value = Value::List(vec![Value::Int(9)]);
        let bytes = resolver.encode_value(&desc, &value).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0x07, 0xE2, 9]);
        assert_eq!(resolver.decode_value(&desc, &bytes).unwrap(), value);
    }

    #[test]
    fn test_collection_limit() {
        let config = CodecConfig {
            max_collection_len: 2,
            ..CodecConfig::default()
        };
        let resolver = CodecResolver::with_config(config);
        let too_many: Vec<u8> = vec![1, 2, 3];
        assert!(matches!(
            resolver.encode_message(&too_many),
            Err(CodecError::InvalidData(_))
        ));
        let bytes = [0u8, 0, 0, 3, 1, 2, 3];
        assert!(resolver.decode_message::<Vec<u8>>(&bytes).is_err());
    }

    #[test]
    fn test_truncated_decode() {
        let resolver = CodecResolver::new();
        let result = resolver.decode_message::<Identity>(&[0, 0, 0, 5, 0]);
        assert!(matches!(
            result,
            Err(CodecError::TruncatedStream { needed: 4, remaining: 1 })
        ));
        // The cached codec still works afterwards
        let id = Identity::new(IdentityType::PLAYFIELD, 1);
        let bytes = resolver.encode_message(&id).unwrap();
        assert_eq!(resolver.decode_message::<Identity>(&bytes).unwrap(), id);
    }

    #[test]
    fn test_little_endian_config() {
        let config = CodecConfig {
            byte_order: ByteOrder::Little,
            ..CodecConfig::default()
        };
        let resolver = CodecResolver::with_config(config);
        let bytes = resolver.encode_message(&0x0102_0304u32).unwrap();
        assert_eq!(&bytes[..], &[4, 3, 2, 1]);
    }

    /// Identity squeezed into a u8 kind and an i16 instance
    #[derive(Debug)]
    struct ShortIdentityCodec;

    impl Codec for ShortIdentityCodec {
        fn name(&self) -> &str {
            "short_identity"
        }

        fn encode(&self, writer: &mut StreamWriter, _ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
            match value {
                Value::Identity(id) => {
                    writer.write_u8(id.kind.get() as u8);
                    writer.write_i16(id.instance as i16);
                    Ok(())
                }
                other => Err(CodecError::mismatch("identity", other.kind())),
            }
        }

        fn decode(&self, reader: &mut StreamReader, _ctx: &mut SerializationContext<'_>) -> Result<Value> {
            let kind = IdentityType::new(reader.read_u8()? as u32);
            let instance = reader.read_i16()? as i32;
            Ok(Value::Identity(Identity::new(kind, instance)))
        }
    }

    #[test]
    fn test_custom_primitive() {
        let mut primitives = PrimitiveSet::standard();
        primitives.register("identity", Arc::new(ShortIdentityCodec));
        let resolver = CodecResolver::with_primitives(CodecConfig::default(), primitives);
        assert_eq!(resolver.codec_for::<Identity>().unwrap().name(), "short_identity");

        let id = Identity::new(IdentityType::new(5), -300);
        let bytes = resolver.encode_message(&id).unwrap();
        assert_eq!(&bytes[..], &[5, 0xFE, 0xD4]);
        assert_eq!(resolver.decode_message::<Identity>(&bytes).unwrap(), id);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_resolver_is_shareable() {
        assert_send_sync::<CodecResolver>();
        assert_send_sync::<Arc<CodecResolver>>();
    }
}
