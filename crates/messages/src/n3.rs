//! # N3 Messages
//!
//! In-game messages. Every one starts with the [`N3Message`] header: message
//! kind, the identity the message is about and one unknown byte.

use crate::enums::*;
use aoproto_codec::{impl_wire_record, BitRange, LengthPrefix, Presence, SchemaBuilder, WireRecord};
use aoproto_core::{Identity, Vector3};

/// Common header of all N3 messages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct N3Message {
    pub message_type: N3MessageType,
    pub identity: Identity,
    pub unknown: u8,
}

impl N3Message {
    pub fn new(message_type: N3MessageType, identity: Identity) -> Self {
        Self {
            message_type,
            identity,
            unknown: 0,
        }
    }
}

impl WireRecord for N3Message {
    const NAME: &'static str = "N3Message";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.field(0, "message_type", |m| &m.message_type, |m| &mut m.message_type);
        schema.field(1, "identity", |m| &m.identity, |m| &mut m.identity);
        schema.field(2, "unknown", |m| &m.unknown, |m| &mut m.unknown);
    }
}

// ============================================================================
// CHARACTER MESSAGES
// ============================================================================

/// Generic character action (casting, trading, team requests)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterActionMessage {
    pub n3: N3Message,
    pub action: CharacterActionType,
    pub unknown1: u8,
    pub target: Identity,
    pub parameter1: i32,
    pub parameter2: i32,
    pub unknown2: i16,
}

impl CharacterActionMessage {
    pub fn new(identity: Identity, action: CharacterActionType) -> Self {
        Self {
            n3: N3Message::new(N3MessageType::CharacterAction, identity),
            action,
            ..Default::default()
        }
    }
}

impl WireRecord for CharacterActionMessage {
    const NAME: &'static str = "CharacterActionMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.n3, |m| &mut m.n3);
        schema.field(0, "action", |m| &m.action, |m| &mut m.action);
        schema.field(1, "unknown1", |m| &m.unknown1, |m| &mut m.unknown1);
        schema.field(2, "target", |m| &m.target, |m| &mut m.target);
        schema.field(3, "parameter1", |m| &m.parameter1, |m| &mut m.parameter1);
        schema.field(4, "parameter2", |m| &m.parameter2, |m| &mut m.parameter2);
        schema.field(5, "unknown2", |m| &m.unknown2, |m| &mut m.unknown2);
    }
}

/// Batch of stat updates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatMessage {
    pub n3: N3Message,
    pub stats: Vec<(CharacterStat, u32)>,
}

impl StatMessage {
    pub fn new(identity: Identity, stats: Vec<(CharacterStat, u32)>) -> Self {
        Self {
            n3: N3Message::new(N3MessageType::Stat, identity),
            stats,
        }
    }
}

impl WireRecord for StatMessage {
    const NAME: &'static str = "StatMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.n3, |m| &mut m.n3);
        schema
            .field(0, "stats", |m| &m.stats, |m| &mut m.stats)
            .prefix(LengthPrefix::X3f1);
    }
}

/// Visible equipment and body shape, packed into one 16-bit word
///
/// Layout of the `appearance` register:
///
/// | bits  | field          |
/// |-------|----------------|
/// | 0-1   | fatness        |
/// | 2     | helmet_visible |
/// | 3-5   | backpack       |
/// | 6-8   | shoulder_pads  |
/// | 9-12  | tint (signed)  |
/// | 13-15 | mesh_set       |
///
/// `helmet_mesh` follows the word only when the helmet is visible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppearanceUpdateMessage {
    pub n3: N3Message,
    pub fatness: Fatness,
    pub helmet_visible: bool,
    pub backpack: u8,
    pub shoulder_pads: u8,
    pub tint: i8,
    pub mesh_set: u16,
    pub helmet_mesh: Option<i32>,
}

impl AppearanceUpdateMessage {
    pub const HELMET_BIT: u8 = 2;
}

impl WireRecord for AppearanceUpdateMessage {
    const NAME: &'static str = "AppearanceUpdateMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.n3, |m| &mut m.n3);
        schema
            .field(0, "fatness", |m| &m.fatness, |m| &mut m.fatness)
            .contributes("appearance", BitRange::new(0, 2));
        schema
            .field(1, "helmet_visible", |m| &m.helmet_visible, |m| &mut m.helmet_visible)
            .contributes("appearance", BitRange::bit(Self::HELMET_BIT));
        schema
            .field(2, "backpack", |m| &m.backpack, |m| &mut m.backpack)
            .contributes("appearance", BitRange::new(3, 3));
        schema
            .field(3, "shoulder_pads", |m| &m.shoulder_pads, |m| &mut m.shoulder_pads)
            .contributes("appearance", BitRange::new(6, 3));
        schema
            .field(4, "tint", |m| &m.tint, |m| &mut m.tint)
            .contributes("appearance", BitRange::new(9, 4));
        schema
            .field(5, "mesh_set", |m| &m.mesh_set, |m| &mut m.mesh_set)
            .carrier_bits("appearance", BitRange::new(13, 3));
        schema
            .field(6, "helmet_mesh", |m| &m.helmet_mesh, |m| &mut m.helmet_mesh)
            .present_when(Presence::group("appearance").bits_set(1 << Self::HELMET_BIT));
    }
}

// ============================================================================
// ORGANIZATION MESSAGES
// ============================================================================

/// Organization command from the client
///
/// `command_args` is only on the wire for commands that take an argument;
/// for the others it decodes empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrgClientMessage {
    pub n3: N3Message,
    pub command: OrgClientCommand,
    pub target: Identity,
    pub unknown1: i32,
    pub command_args: String,
}

impl OrgClientMessage {
    pub fn new(identity: Identity, command: OrgClientCommand) -> Self {
        Self {
            n3: N3Message::new(N3MessageType::OrgClient, identity),
            command,
            ..Default::default()
        }
    }
}

impl WireRecord for OrgClientMessage {
    const NAME: &'static str = "OrgClientMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.n3, |m| &mut m.n3);
        schema.field(0, "command", |m| &m.command, |m| &mut m.command);
        schema.field(1, "target", |m| &m.target, |m| &mut m.target);
        schema.field(2, "unknown1", |m| &m.unknown1, |m| &mut m.unknown1);
        schema
            .field(3, "command_args", |m| &m.command_args, |m| &mut m.command_args)
            .prefix(LengthPrefix::U16)
            .present_when(
                Presence::field("command")
                    .equals_any(OrgClientCommand::WITH_ARGS.iter().map(|c| c.raw() as i64)),
            );
    }
}

/// Organization notification from the server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrgServerMessage {
    pub n3: N3Message,
    pub org_message_type: OrgServerMessageType,
    pub unknown1: i32,
    pub unknown2: i32,
    pub organization: Identity,
    pub organization_name: String,
}

impl WireRecord for OrgServerMessage {
    const NAME: &'static str = "OrgServerMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.n3, |m| &mut m.n3);
        schema.field(0, "org_message_type", |m| &m.org_message_type, |m| &mut m.org_message_type);
        schema.field(1, "unknown1", |m| &m.unknown1, |m| &mut m.unknown1);
        schema.field(2, "unknown2", |m| &m.unknown2, |m| &mut m.unknown2);
        schema.field(3, "organization", |m| &m.organization, |m| &mut m.organization);
        schema
            .field(4, "organization_name", |m| &m.organization_name, |m| &mut m.organization_name)
            .prefix(LengthPrefix::U16);
    }
}

/// Invitation to join an organization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrgInviteMessage {
    pub org: OrgServerMessage,
}

impl OrgInviteMessage {
    pub fn new(identity: Identity, organization: Identity, name: impl Into<String>) -> Self {
        Self {
            org: OrgServerMessage {
                n3: N3Message::new(N3MessageType::OrgServer, identity),
                org_message_type: OrgServerMessageType::Invite,
                organization,
                organization_name: name.into(),
                ..Default::default()
            },
        }
    }
}

impl WireRecord for OrgInviteMessage {
    const NAME: &'static str = "OrgInviteMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.org, |m| &mut m.org);
    }
}

// ============================================================================
// PLAYFIELD MESSAGES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayfieldVendorInfo {
    pub unknown1: i32,
    pub vendor_count: i32,
    pub first_vendor_id: i32,
}

impl WireRecord for PlayfieldVendorInfo {
    const NAME: &'static str = "PlayfieldVendorInfo";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.field(0, "unknown1", |v| &v.unknown1, |v| &mut v.unknown1);
        schema.field(1, "vendor_count", |v| &v.vendor_count, |v| &mut v.vendor_count);
        schema.field(2, "first_vendor_id", |v| &v.first_vendor_id, |v| &mut v.first_vendor_id);
    }
}

/// Playfield description sent when a character enters a zone
///
/// Vendor information follows only when `vendor_flags` is 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayfieldAnarchyFMessage {
    pub n3: N3Message,
    pub character_coordinates: Vector3,
    pub playfield_id1: Identity,
    pub unknown1: i32,
    pub unknown2: i32,
    pub playfield_id2: Identity,
    pub unknown3: i32,
    pub unknown4: i32,
    pub vendor_flags: u32,
    pub vendor_info: Option<PlayfieldVendorInfo>,
    pub playfield_x: i32,
    pub playfield_z: i32,
}

impl PlayfieldAnarchyFMessage {
    /// Attach vendor information and raise the flag that puts it on the wire
    pub fn with_vendor_info(mut self, info: PlayfieldVendorInfo) -> Self {
        self.vendor_flags = 1;
        self.vendor_info = Some(info);
        self
    }
}

impl WireRecord for PlayfieldAnarchyFMessage {
    const NAME: &'static str = "PlayfieldAnarchyFMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.n3, |m| &mut m.n3);
        schema.field(0, "character_coordinates", |m| &m.character_coordinates, |m| {
            &mut m.character_coordinates
        });
        schema.field(1, "playfield_id1", |m| &m.playfield_id1, |m| &mut m.playfield_id1);
        schema.field(2, "unknown1", |m| &m.unknown1, |m| &mut m.unknown1);
        schema.field(3, "unknown2", |m| &m.unknown2, |m| &mut m.unknown2);
        schema.field(4, "playfield_id2", |m| &m.playfield_id2, |m| &mut m.playfield_id2);
        schema.field(5, "unknown3", |m| &m.unknown3, |m| &mut m.unknown3);
        schema.field(6, "unknown4", |m| &m.unknown4, |m| &mut m.unknown4);
        schema
            .field(7, "vendor_flags", |m| &m.vendor_flags, |m| &mut m.vendor_flags)
            .carrier("vendor");
        schema
            .field(8, "vendor_info", |m| &m.vendor_info, |m| &mut m.vendor_info)
            .present_when(Presence::group("vendor").equals_any([1]));
        schema.field(9, "playfield_x", |m| &m.playfield_x, |m| &mut m.playfield_x);
        schema.field(10, "playfield_z", |m| &m.playfield_z, |m| &mut m.playfield_z);
    }
}

impl_wire_record!(
    N3Message,
    CharacterActionMessage,
    StatMessage,
    AppearanceUpdateMessage,
    OrgClientMessage,
    OrgServerMessage,
    OrgInviteMessage,
    PlayfieldVendorInfo,
    PlayfieldAnarchyFMessage,
);
