//! Uniform value representation
//!
//! Every codec reads and writes [`Value`]s. Schema types cross into this
//! representation through [`WireType`], so the generic dispatch layer never
//! has to care whether a field is a primitive, a list or a nested record.

use crate::desc::TypeDesc;
use aoproto_core::{CodecError, Identity, IdentityType, Result, Vector3};
use bytes::Bytes;
use std::any::Any;
use std::fmt;
use std::net::Ipv4Addr;

/// Object-safe view of a record value
pub trait AnyRecord: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_record(&self) -> Box<dyn AnyRecord>;
    fn eq_record(&self, other: &dyn AnyRecord) -> bool;
    fn record_type_name(&self) -> &'static str;
}

impl<T> AnyRecord for T
where
    T: Any + Clone + PartialEq + Send + Sync + fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_record(&self) -> Box<dyn AnyRecord> {
        Box::new(self.clone())
    }

    fn eq_record(&self, other: &dyn AnyRecord) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn record_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A boxed record of any schema type
pub struct RecordValue(Box<dyn AnyRecord>);

impl RecordValue {
    pub fn new<T: AnyRecord>(record: T) -> Self {
        Self(Box::new(record))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn downcast<T: Any>(self) -> std::result::Result<T, Self> {
        if self.0.as_any().is::<T>() {
            match self.0.into_any().downcast::<T>() {
                Ok(record) => Ok(*record),
                Err(_) => unreachable!("type checked above"),
            }
        } else {
            Err(self)
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.0.record_type_name()
    }
}

impl Clone for RecordValue {
    fn clone(&self) -> Self {
        Self(self.0.clone_record())
    }
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_record(other.0.as_ref())
    }
}

impl fmt::Debug for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Any schema-typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value (an empty `Option`, a skipped field)
    #[default]
    Null,
    Bool(bool),
    /// Every integer width and every enumeration
    Int(i64),
    Float(f32),
    Text(String),
    Bytes(Bytes),
    Identity(Identity),
    Vector3(Vector3),
    Ipv4(Ipv4Addr),
    Pair(Box<Value>, Box<Value>),
    List(Vec<Value>),
    Record(RecordValue),
}

impl Value {
    pub fn record<T: AnyRecord>(record: T) -> Self {
        Self::Record(RecordValue::new(record))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Identity(_) => "identity",
            Self::Vector3(_) => "vector3",
            Self::Ipv4(_) => "ipv4",
            Self::Pair(..) => "pair",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view; booleans count as 0 and 1
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Record(record) => record.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn into_record<T: Any>(self) -> Result<T> {
        match self {
            Self::Record(record) => record.downcast::<T>().map_err(|record| {
                CodecError::mismatch(std::any::type_name::<T>(), record.type_name())
            }),
            other => Err(CodecError::mismatch(std::any::type_name::<T>(), other.kind())),
        }
    }

    pub(crate) fn expect_int(&self, expected: &str) -> Result<i64> {
        self.as_int()
            .ok_or_else(|| CodecError::mismatch(expected, self.kind()))
    }
}

/// Rust types that have a wire representation
pub trait WireType: Sized + Send + Sync + 'static {
    fn type_desc() -> TypeDesc;
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! int_wire_type {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(impl WireType for $ty {
            fn type_desc() -> TypeDesc {
                TypeDesc::Primitive($name)
            }

            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }

            fn from_value(value: Value) -> Result<Self> {
                let raw = value.expect_int($name)?;
                <$ty>::try_from(raw).map_err(|_| {
                    CodecError::InvalidData(format!("{} out of range for {}", raw, $name))
                })
            }
        })+
    };
}

int_wire_type!(u8 => "u8", i8 => "i8", u16 => "u16", i16 => "i16", u32 => "u32", i32 => "i32", i64 => "i64");

// u64 travels bit-for-bit through the i64 slot
impl WireType for u64 {
    fn type_desc() -> TypeDesc {
        TypeDesc::Primitive("u64")
    }

    fn to_value(&self) -> Value {
        Value::Int(*self as i64)
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value.expect_int("u64")? as u64)
    }
}

impl WireType for bool {
    fn type_desc() -> TypeDesc {
        TypeDesc::Primitive("bool")
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value.expect_int("bool")? != 0)
    }
}

impl WireType for f32 {
    fn type_desc() -> TypeDesc {
        TypeDesc::Primitive("f32")
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(CodecError::mismatch("float", other.kind())),
        }
    }
}

impl WireType for String {
    fn type_desc() -> TypeDesc {
        TypeDesc::Text(None)
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Err(CodecError::mismatch("text", other.kind())),
        }
    }
}

impl WireType for Bytes {
    fn type_desc() -> TypeDesc {
        TypeDesc::Bytes(None)
    }

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Null => Ok(Bytes::new()),
            other => Err(CodecError::mismatch("bytes", other.kind())),
        }
    }
}

impl WireType for Identity {
    fn type_desc() -> TypeDesc {
        TypeDesc::Primitive("identity")
    }

    fn to_value(&self) -> Value {
        Value::Identity(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Identity(id) => Ok(id),
            other => Err(CodecError::mismatch("identity", other.kind())),
        }
    }
}

// An identity type on its own is just its raw discriminator
impl WireType for IdentityType {
    fn type_desc() -> TypeDesc {
        TypeDesc::Enum {
            name: "IdentityType",
            repr: crate::desc::IntRepr::U32,
        }
    }

    fn to_value(&self) -> Value {
        Value::Int(self.0 as i64)
    }

    fn from_value(value: Value) -> Result<Self> {
        u32::from_value(value).map(IdentityType)
    }
}

impl WireType for Vector3 {
    fn type_desc() -> TypeDesc {
        TypeDesc::Primitive("vector3")
    }

    fn to_value(&self) -> Value {
        Value::Vector3(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Vector3(v) => Ok(v),
            other => Err(CodecError::mismatch("vector3", other.kind())),
        }
    }
}

impl WireType for Ipv4Addr {
    fn type_desc() -> TypeDesc {
        TypeDesc::Primitive("ipv4")
    }

    fn to_value(&self) -> Value {
        Value::Ipv4(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Ipv4(addr) => Ok(addr),
            Value::Null => Ok(Ipv4Addr::UNSPECIFIED),
            other => Err(CodecError::mismatch("ipv4", other.kind())),
        }
    }
}

impl<T: WireType> WireType for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::list(T::type_desc())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(WireType::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(CodecError::mismatch("list", other.kind())),
        }
    }
}

impl<A: WireType, B: WireType> WireType for (A, B) {
    fn type_desc() -> TypeDesc {
        TypeDesc::pair(A::type_desc(), B::type_desc())
    }

    fn to_value(&self) -> Value {
        Value::Pair(Box::new(self.0.to_value()), Box::new(self.1.to_value()))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Pair(a, b) => Ok((A::from_value(*a)?, B::from_value(*b)?)),
            other => Err(CodecError::mismatch("pair", other.kind())),
        }
    }
}

/// Optional values share the wire type of their content; `None` is [`Value::Null`]
impl<T: WireType> WireType for Option<T> {
    fn type_desc() -> TypeDesc {
        T::type_desc()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
