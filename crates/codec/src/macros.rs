//! Declaration macros for wire enumerations and records

/// Declare an enumeration carried on the wire as its underlying integer
///
/// ```rust,ignore
/// wire_enum! {
///     pub enum Gender: u32 {
///         Uni = 0,
///         Male = 1,
///         Female = 2,
///     }
/// }
/// ```
///
/// The first variant is the default. Decoding a value that names no variant
/// fails with [`CodecError::InvalidData`](crate::CodecError::InvalidData).
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr($repr)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            pub const VARIANTS: &'static [$name] = &[$($name::$variant),+];

            pub fn from_raw(raw: $repr) -> Option<Self> {
                match raw {
                    $(x if x == $value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn raw(self) -> $repr {
                self as $repr
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::VARIANTS[0]
            }
        }

        impl $crate::WireType for $name {
            fn type_desc() -> $crate::TypeDesc {
                $crate::TypeDesc::Enum {
                    name: stringify!($name),
                    repr: <$repr as $crate::IntPrimitive>::REPR,
                }
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Int(self.raw() as i64)
            }

            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                let raw = <$repr as $crate::WireType>::from_value(value)?;
                Self::from_raw(raw).ok_or_else(|| {
                    $crate::CodecError::InvalidData(format!(
                        "{} is not a valid {}",
                        raw,
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

/// Give record types their [`WireType`](crate::WireType) implementation
///
/// Records travel as [`Value::Record`](crate::Value::Record); the type must
/// implement [`WireRecord`](crate::WireRecord).
#[macro_export]
macro_rules! impl_wire_record {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::WireType for $ty {
            fn type_desc() -> $crate::TypeDesc {
                $crate::TypeDesc::record::<$ty>()
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::record(::std::clone::Clone::clone(self))
            }

            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                value.into_record::<$ty>()
            }
        })+
    };
}
