//! # AOProto Message Library
//!
//! Concrete Anarchy Online message schemas for the codec in `aoproto-codec`.
//!
//! ## Organization
//!
//! ### 1. Enumerations ([`enums`])
//! Message discriminators and game data (breeds, professions, stats).
//!
//! ### 2. N3 Messages ([`n3`])
//! In-game messages sharing the [`N3Message`] header.
//!
//! ### 3. System Messages ([`system`])
//! Login and zoning messages sharing the [`SystemMessage`] header.
//!
//! ### 4. Lookup ([`registry`])
//! Name to type mapping used by tools that pick a message at run time.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use aoproto_codec::CodecResolver;
//! use aoproto_core::{Identity, IdentityType};
//! use aoproto_messages::{OrgClientCommand, OrgClientMessage};
//!
//! let resolver = CodecResolver::new();
//! let identity = Identity::new(IdentityType::SIMPLE_CHAR, 12345);
//! let mut message = OrgClientMessage::new(identity, OrgClientCommand::Create);
//! message.command_args = "Trollipopz".to_string();
//!
//! let bytes = resolver.encode_message(&message).unwrap();
//! let decoded: OrgClientMessage = resolver.decode_message(&bytes).unwrap();
//! assert_eq!(decoded, message);
//! ```

pub mod enums;
pub mod n3;
pub mod registry;
pub mod system;

// Re-export commonly used items
pub use enums::*;
pub use n3::*;
pub use registry::*;
pub use system::*;
