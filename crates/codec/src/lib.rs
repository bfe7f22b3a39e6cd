//! # AOProto Codec Library
//!
//! Schema-driven binary codecs for the Anarchy Online client/server protocol.
//! Message types declare their wire layout once; this crate derives the encode
//! and decode routines from that declaration, caches them, and runs them.
//!
//! ## Architecture
//!
//! ### 1. Streams ([`stream`])
//! Forward-only [`StreamWriter`] and [`StreamReader`] over `bytes` buffers, in
//! either byte order.
//!
//! ### 2. Values and type descriptions ([`value`], [`desc`])
//! Every field value travels as a [`Value`]. Field types implement
//! [`WireType`], which names their [`TypeDesc`] and converts to and from a
//! `Value`.
//!
//! ### 3. Schemas ([`schema`])
//! Records implement [`WireRecord`] and declare their fields on a
//! [`SchemaBuilder`]: order, flags group role and presence condition.
//! [`SchemaIntrospector`] turns the declaration into an ordered [`TypeSchema`],
//! base type fields first.
//!
//! ### 4. Codecs ([`primitives`], [`builder`], [`resolver`])
//! - [`PrimitiveSet`]: leaf codecs (integers, text, byte blocks, identities)
//! - [`TypeCodecBuilder`]: compiles a schema into record encode/decode routines
//! - [`CodecResolver`]: builds each type's codec once and caches it
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use aoproto_codec::CodecResolver;
//!
//! let resolver = CodecResolver::new();
//! let bytes = resolver.encode_message(&message)?;
//! let decoded: OrgClientMessage = resolver.decode_message(&bytes)?;
//! ```

pub mod builder;
pub mod codec;
pub mod context;
pub mod desc;
pub mod hex;
pub mod primitives;
pub mod resolver;
pub mod schema;
pub mod stream;
pub mod value;
mod macros;

// Re-export commonly used items
pub use aoproto_core::{ByteOrder, CodecError, Identity, IdentityType, LengthPrefix, Result, Vector3};
pub use builder::*;
pub use codec::*;
pub use context::*;
pub use desc::*;
pub use primitives::*;
pub use resolver::*;
pub use schema::*;
pub use stream::*;
pub use value::*;
