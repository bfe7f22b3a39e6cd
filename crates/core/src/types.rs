//! Well-known wire aggregates shared by every message schema

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity type discriminator (32-bit unsigned)
///
/// The game defines several hundred of these; only the ones the message set
/// refers to get a name, everything else round-trips as a raw value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityType(pub u32);

impl IdentityType {
    pub const NONE: Self = Self(0);
    pub const SIMPLE_CHAR: Self = Self(50000);
    pub const CANBE_AFFECTED: Self = Self(50001);
    pub const PLAYFIELD: Self = Self(51100);
    pub const DOOR: Self = Self(51102);
    pub const ORGANIZATION: Self = Self(51043);
    pub const VENDING_MACHINE: Self = Self(51035);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for IdentityType {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Two-part identity: what kind of object, and which one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub kind: IdentityType,
    pub instance: i32,
}

impl Identity {
    pub const NONE: Self = Self {
        kind: IdentityType::NONE,
        instance: 0,
    };

    pub const fn new(kind: IdentityType, instance: i32) -> Self {
        Self { kind, instance }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:#010x}", self.kind.0, self.instance)
    }
}

/// Three-component float vector (positions, headings)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Byte order of fixed-width integers and floats on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Network order, used by the game protocol
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "big" | "be" | "network" => Some(Self::Big),
            "little" | "le" => Some(Self::Little),
            _ => None,
        }
    }
}

/// How the length of a text, byte block or list is carried on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LengthPrefix {
    U8,
    U16,
    #[default]
    U32,
    /// 32-bit word holding `(count + 1) * 0x3F1`
    X3f1,
    /// No prefix, terminated by a zero byte (text only)
    NulTerminated,
    /// No prefix, always exactly this many elements
    Fixed(u16),
}

impl LengthPrefix {
    pub const X3F1_FACTOR: u32 = 0x3F1;

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "u8" => Some(Self::U8),
            "u16" => Some(Self::U16),
            "u32" => Some(Self::U32),
            "x3f1" => Some(Self::X3f1),
            "nul" | "null" => Some(Self::NulTerminated),
            other => other
                .strip_prefix("fixed:")
                .and_then(|n| n.parse().ok())
                .map(Self::Fixed),
        }
    }

    /// Largest count the prefix can carry
    pub fn max_count(&self) -> usize {
        match self {
            Self::U8 => u8::MAX as usize,
            Self::U16 => u16::MAX as usize,
            Self::U32 => u32::MAX as usize,
            Self::X3f1 => (u32::MAX / Self::X3F1_FACTOR) as usize - 1,
            Self::NulTerminated => usize::MAX,
            Self::Fixed(n) => *n as usize,
        }
    }
}
