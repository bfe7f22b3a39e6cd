//! Structural type descriptions
//!
//! A [`TypeDesc`] is the identity of a wire type. The resolver caches codecs by
//! it, field descriptors carry one, and the primitive set uses it to pick a leaf
//! codec. Records are identified by their Rust [`TypeId`].

use crate::builder::build_record;
use crate::codec::CodecRef;
use crate::resolver::CodecResolver;
use crate::schema::WireRecord;
use aoproto_core::{LengthPrefix, Result};
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Width and signedness of a wire integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntRepr {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
}

impl IntRepr {
    pub fn bits(&self) -> u8 {
        match self {
            Self::U8 | Self::I8 => 8,
            Self::U16 | Self::I16 => 16,
            Self::U32 | Self::I32 => 32,
            Self::U64 | Self::I64 => 64,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    /// Name of the primitive codec that carries this width
    pub fn primitive_name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
        }
    }

    pub fn from_primitive_name(name: &str) -> Option<Self> {
        match name {
            "u8" | "bool" => Some(Self::U8),
            "i8" => Some(Self::I8),
            "u16" => Some(Self::U16),
            "i16" => Some(Self::I16),
            "u32" => Some(Self::U32),
            "i32" => Some(Self::I32),
            "u64" => Some(Self::U64),
            "i64" => Some(Self::I64),
            _ => None,
        }
    }

    /// Mask covering every bit of this width
    pub fn mask(&self) -> u64 {
        match self.bits() {
            64 => u64::MAX,
            n => (1u64 << n) - 1,
        }
    }
}

/// Rust integer types that map onto an [`IntRepr`]
pub trait IntPrimitive {
    const REPR: IntRepr;
}

macro_rules! int_primitive {
    ($($ty:ty => $repr:ident),+ $(,)?) => {
        $(impl IntPrimitive for $ty {
            const REPR: IntRepr = IntRepr::$repr;
        })+
    };
}

int_primitive!(u8 => U8, i8 => I8, u16 => U16, i16 => I16, u32 => U32, i32 => I32, u64 => U64, i64 => I64);

/// Identity of a record type together with the function that builds its codec
#[derive(Clone, Copy)]
pub struct RecordDesc {
    id: TypeId,
    name: &'static str,
    build: fn(&CodecResolver) -> Result<CodecRef>,
}

impl RecordDesc {
    pub fn of<T: WireRecord>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::NAME,
            build: build_record::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub(crate) fn build(&self, resolver: &CodecResolver) -> Result<CodecRef> {
        (self.build)(resolver)
    }
}

impl PartialEq for RecordDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordDesc {}

impl Hash for RecordDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for RecordDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordDesc").field(&self.name).finish()
    }
}

/// Structural description of a wire type
///
/// `None` prefixes mean "use the resolver's configured default".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// Leaf served by a registered primitive codec
    Primitive(&'static str),
    /// Enumeration carried as its underlying integer
    Enum { name: &'static str, repr: IntRepr },
    Text(Option<LengthPrefix>),
    Bytes(Option<LengthPrefix>),
    /// Homogeneous sequence
    List {
        element: Box<TypeDesc>,
        prefix: Option<LengthPrefix>,
    },
    Pair(Box<TypeDesc>, Box<TypeDesc>),
    Record(RecordDesc),
}

impl TypeDesc {
    pub fn record<T: WireRecord>() -> Self {
        Self::Record(RecordDesc::of::<T>())
    }

    pub fn list(element: TypeDesc) -> Self {
        Self::List {
            element: Box::new(element),
            prefix: None,
        }
    }

    pub fn pair(first: TypeDesc, second: TypeDesc) -> Self {
        Self::Pair(Box::new(first), Box::new(second))
    }

    /// Integer representation when this type can live in a flags register
    pub fn int_repr(&self) -> Option<IntRepr> {
        match self {
            Self::Primitive(name) => IntRepr::from_primitive_name(name),
            Self::Enum { repr, .. } => Some(*repr),
            _ => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    /// Same type with an explicit length prefix, if the type has one
    pub fn with_prefix(&self, prefix: LengthPrefix) -> Option<Self> {
        match self {
            Self::Text(_) => Some(Self::Text(Some(prefix))),
            Self::Bytes(_) if prefix != LengthPrefix::NulTerminated => Some(Self::Bytes(Some(prefix))),
            Self::List { element, .. } if prefix != LengthPrefix::NulTerminated => Some(Self::List {
                element: element.clone(),
                prefix: Some(prefix),
            }),
            _ => None,
        }
    }

    /// Human readable name used in logs and errors
    pub fn name(&self) -> String {
        match self {
            Self::Primitive(name) => (*name).to_string(),
            Self::Enum { name, repr } => format!("{}({})", name, repr.primitive_name()),
            Self::Text(prefix) => format!("text{}", prefix_suffix(prefix)),
            Self::Bytes(prefix) => format!("bytes{}", prefix_suffix(prefix)),
            Self::List { element, prefix } => {
                format!("list<{}>{}", element.name(), prefix_suffix(prefix))
            }
            Self::Pair(a, b) => format!("({}, {})", a.name(), b.name()),
            Self::Record(record) => record.name().to_string(),
        }
    }
}

fn prefix_suffix(prefix: &Option<LengthPrefix>) -> String {
    match prefix {
        Some(p) => format!("[{:?}]", p),
        None => String::new(),
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
